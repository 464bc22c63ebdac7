//! Splitting slide bodies across several output pages.
//!
//! Two strategies are available: a character budget per page, and fitting
//! measured lines of a real font into a text box. Both keep paragraphs (text
//! separated by a blank line) intact and in order. Every function here is
//! pure, so slides can be paginated independently.

use crate::config::PaginationConfig;
use crate::error::{Error, Result};
use crate::resolve::PARAGRAPH_SEPARATOR;
use crate::types::{PageRecord, ResolvedContent};
use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont};
use std::sync::Arc;

/// Default number of characters per page.
pub const DEFAULT_CHAR_BUDGET: usize = 1100;

/// Default suffix appended to continuation page titles.
pub const DEFAULT_CONTINUATION_SUFFIX: &str = "(CONTD...)";

/// Extra pixels added to each measured line.
const LINE_PADDING_PX: f32 = 2.0;

/// Split a body into trimmed, non-empty paragraphs.
fn paragraphs(body: &str) -> impl Iterator<Item = &str> {
    body.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

/// Split `body` into pages of roughly `char_budget` characters.
///
/// Paragraphs are accumulated greedily. A paragraph that does not fit starts
/// a new page; a paragraph larger than the whole budget gets a page of its
/// own and is never cut. An empty body yields exactly one empty page.
pub fn split_by_budget(body: &str, char_budget: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in paragraphs(body) {
        let len = paragraph.chars().count();
        if !current.is_empty() && current_len + len + 2 > char_budget {
            pages.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str(PARAGRAPH_SEPARATOR);
            current_len += 2;
        }
        current.push_str(paragraph);
        current_len += len;
    }

    if !current.is_empty() {
        pages.push(current);
    }
    if pages.is_empty() {
        pages.push(String::new());
    }
    pages
}

/// Width and height measurements of rendered text.
pub trait TextMeasure {
    /// Rendered width of `text` on a single line, in pixels.
    fn width(&self, text: &str) -> f32;

    /// Height of one line slot, in pixels.
    fn line_height(&self) -> f32;
}

/// Glyph metrics of a font at a fixed pixel size.
pub struct FontMetrics {
    font: FontVec,
    scale: PxScale,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("size_px", &self.scale.y)
            .finish()
    }
}

impl FontMetrics {
    /// Load TrueType/OpenType font data at `size_px`.
    pub fn from_bytes(data: Vec<u8>, size_px: f32) -> Result<Self> {
        if size_px.is_nan() || size_px <= 0.0 {
            return Err(Error::Font(format!("font size must be positive, got {}", size_px)));
        }
        let font = FontVec::try_from_vec(data).map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self {
            font,
            scale: PxScale::from(size_px),
        })
    }

    pub fn ascent(&self) -> f32 {
        self.font.as_scaled(self.scale).ascent()
    }

    /// Descent as a positive distance below the baseline.
    pub fn descent(&self) -> f32 {
        self.font.as_scaled(self.scale).descent().abs()
    }
}

impl TextMeasure for FontMetrics {
    fn width(&self, text: &str) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }

    fn line_height(&self) -> f32 {
        self.ascent() + self.descent() + LINE_PADDING_PX
    }
}

/// Reflow paragraphs into lines no wider than `max_width`.
///
/// Each paragraph is followed by one empty line slot. A single word wider
/// than the box occupies a line of its own.
fn wrap_lines<M: TextMeasure>(body: &str, measure: &M, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in paragraphs(body) {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if measure.width(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines.push(String::new());
    }
    lines
}

/// Fit measured lines into pages of at most `box_height` pixels.
///
/// Blank paragraph slots count towards the height but never open a page.
pub fn fit_lines<M: TextMeasure>(body: &str, measure: &M, box_width: f32, box_height: f32) -> Vec<String> {
    let line_height = measure.line_height();
    let mut pages = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut height = 0.0f32;

    for line in wrap_lines(body, measure, box_width) {
        if current.is_empty() && line.is_empty() {
            continue;
        }
        if !current.is_empty() && height + line_height > box_height {
            pages.push(current.join("\n").trim().to_string());
            current.clear();
            height = 0.0;
            if line.is_empty() {
                continue;
            }
        }
        current.push(line);
        height += line_height;
    }

    if !current.is_empty() {
        pages.push(current.join("\n").trim().to_string());
    }
    if pages.is_empty() {
        pages.push(String::new());
    }
    pages
}

/// Split `body` by measuring it with `font_data` inside a text box.
///
/// Without both box dimensions the split falls back to
/// [`split_by_budget`] with `fallback_budget`.
pub fn split_by_metrics(
    body: &str,
    font_data: &[u8],
    box_width: Option<f32>,
    box_height: Option<f32>,
    font_size_px: f32,
    fallback_budget: usize,
) -> Result<Vec<String>> {
    if body.trim().is_empty() {
        return Ok(vec![String::new()]);
    }
    let (Some(width), Some(height)) = (box_width, box_height) else {
        log::debug!("No measurement box; falling back to character budget");
        return Ok(split_by_budget(body, fallback_budget));
    };

    let metrics = FontMetrics::from_bytes(font_data.to_vec(), font_size_px)?;
    Ok(fit_lines(body, &metrics, width, height))
}

/// How a [`Paginator`] splits bodies.
#[derive(Debug, Clone)]
pub enum Strategy {
    Budget {
        char_budget: usize,
    },
    Metrics {
        metrics: Arc<FontMetrics>,
        box_width: Option<f32>,
        box_height: Option<f32>,
        fallback_budget: usize,
    },
}

/// Turns resolved slide content into ordered page records.
#[derive(Debug, Clone)]
pub struct Paginator {
    strategy: Strategy,
    continuation_suffix: String,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            strategy: Strategy::Budget {
                char_budget: DEFAULT_CHAR_BUDGET,
            },
            continuation_suffix: DEFAULT_CONTINUATION_SUFFIX.to_string(),
        }
    }
}

impl Paginator {
    /// Create a paginator using the default character budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a paginator from configuration, loading the metric font if set.
    pub fn from_config(config: &PaginationConfig) -> Result<Self> {
        let strategy = match &config.metrics {
            Some(metrics) => {
                if metrics.box_width_px.is_none() || metrics.box_height_px.is_none() {
                    log::warn!(
                        "Font metric pagination needs box_width_px and box_height_px; using a {} character budget",
                        config.char_budget
                    );
                }
                let data = std::fs::read(&metrics.font_path).map_err(|e| {
                    Error::Font(format!("cannot read {}: {}", metrics.font_path.display(), e))
                })?;
                Strategy::Metrics {
                    metrics: Arc::new(FontMetrics::from_bytes(data, metrics.font_size_px)?),
                    box_width: metrics.box_width_px,
                    box_height: metrics.box_height_px,
                    fallback_budget: config.char_budget,
                }
            }
            None => Strategy::Budget {
                char_budget: config.char_budget,
            },
        };

        Ok(Self {
            strategy,
            continuation_suffix: config.continuation_suffix.clone(),
        })
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_continuation_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.continuation_suffix = suffix.into();
        self
    }

    /// Split a body into page texts.
    pub fn split(&self, body: &str) -> Vec<String> {
        match &self.strategy {
            Strategy::Budget { char_budget } => split_by_budget(body, *char_budget),
            Strategy::Metrics {
                metrics,
                box_width: Some(width),
                box_height: Some(height),
                ..
            } => fit_lines(body, metrics.as_ref(), *width, *height),
            Strategy::Metrics { fallback_budget, .. } => split_by_budget(body, *fallback_budget),
        }
    }

    /// Title for the page at `ordinal`.
    pub fn page_title(&self, title: &str, ordinal: usize) -> String {
        if ordinal == 0 || self.continuation_suffix.is_empty() {
            title.to_string()
        } else {
            format!("{} {}", title, self.continuation_suffix)
        }
    }

    /// Paginate one slide's content.
    pub fn paginate(&self, source_slide_index: usize, content: &ResolvedContent) -> Vec<PageRecord> {
        self.split(&content.body)
            .into_iter()
            .enumerate()
            .map(|(ordinal, body)| PageRecord {
                title: self.page_title(&content.title, ordinal),
                body,
                source_slide_index,
                continuation_ordinal: ordinal,
            })
            .collect()
    }
}
