//! Pipeline configuration.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! [ocr]
//! enabled = true
//! policy = "always"
//! backend = "local_ocr"
//!
//! [pagination]
//! char_budget = 900
//!
//! [style]
//! title_color = "#2D448D"
//! ```

use crate::error::{Error, Result};
use crate::ocr::{Backend, OcrPolicy};
use crate::paginate::{DEFAULT_CHAR_BUDGET, DEFAULT_CONTINUATION_SUFFIX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Minimum accepted character budget.
pub const MIN_CHAR_BUDGET: usize = 200;

/// Accepted OCR dpi range.
pub const DPI_RANGE: std::ops::RangeInclusive<u32> = 72..=600;

/// Top-level configuration for one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub ocr: OcrConfig,
    pub pagination: PaginationConfig,
    pub style: StyleConfig,
}

impl NormalizeConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check every value against its accepted range.
    pub fn validate(&self) -> Result<()> {
        self.ocr.validate()?;
        self.pagination.validate()?;
        self.style.validate()
    }
}

/// OCR settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub policy: OcrPolicy,
    pub backend: Backend,
    /// Resolution hint passed to the preprocessor.
    pub dpi: u32,
    /// Per-image timeout for a single recognition call.
    pub timeout_secs: u64,
    /// Maximum number of concurrent recognition calls.
    pub concurrency: usize,
    /// Bodies shorter than this many characters count as missing.
    pub min_body_length: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: OcrPolicy::OnlyWhenMissing,
            backend: Backend::CloudVision,
            dpi: 300,
            timeout_secs: 30,
            concurrency: 4,
            min_body_length: crate::ocr::MIN_BODY_LENGTH,
        }
    }
}

impl OcrConfig {
    fn validate(&self) -> Result<()> {
        if !DPI_RANGE.contains(&self.dpi) {
            return Err(Error::InvalidConfig(format!(
                "ocr.dpi must be between {} and {}, got {}",
                DPI_RANGE.start(),
                DPI_RANGE.end(),
                self.dpi
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig("ocr.timeout_secs must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig("ocr.concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

/// Pagination settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub char_budget: usize,
    pub continuation_suffix: String,
    /// Font-metric pagination; character budget is used when absent.
    pub metrics: Option<MetricsConfig>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            char_budget: DEFAULT_CHAR_BUDGET,
            continuation_suffix: DEFAULT_CONTINUATION_SUFFIX.to_string(),
            metrics: None,
        }
    }
}

impl PaginationConfig {
    fn validate(&self) -> Result<()> {
        if self.char_budget < MIN_CHAR_BUDGET {
            return Err(Error::InvalidConfig(format!(
                "pagination.char_budget must be at least {}, got {}",
                MIN_CHAR_BUDGET, self.char_budget
            )));
        }
        if let Some(metrics) = &self.metrics {
            metrics.validate()?;
        }
        Ok(())
    }
}

/// Font and text box used for metric pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub font_path: PathBuf,
    #[serde(default = "default_font_size_px")]
    pub font_size_px: f32,
    #[serde(default)]
    pub box_width_px: Option<f32>,
    #[serde(default)]
    pub box_height_px: Option<f32>,
}

fn default_font_size_px() -> f32 {
    16.0
}

impl MetricsConfig {
    fn validate(&self) -> Result<()> {
        if self.font_size_px.is_nan() || self.font_size_px <= 0.0 {
            return Err(Error::InvalidConfig("pagination.metrics.font_size_px must be positive".into()));
        }
        for (name, value) in [("box_width_px", self.box_width_px), ("box_height_px", self.box_height_px)] {
            if let Some(v) = value {
                if v.is_nan() || v <= 0.0 {
                    return Err(Error::InvalidConfig(format!(
                        "pagination.metrics.{} must be positive, got {}",
                        name, v
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Fonts, sizes and colors applied by the template filler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub title_font: String,
    pub body_font: String,
    /// Title size in points.
    pub title_size: f32,
    /// Body size in points.
    pub body_size: f32,
    pub title_color: RgbColor,
    pub body_color: RgbColor,
}

impl Default for StyleConfig {
    /// Poppins, 20px (15pt) titles in #2D448D and 12px (9pt) black body text.
    fn default() -> Self {
        Self {
            title_font: "Poppins".to_string(),
            body_font: "Poppins".to_string(),
            title_size: 15.0,
            body_size: 9.0,
            title_color: RgbColor::new(0x2d, 0x44, 0x8d),
            body_color: RgbColor::new(0x00, 0x00, 0x00),
        }
    }
}

impl StyleConfig {
    fn validate(&self) -> Result<()> {
        if self.title_font.trim().is_empty() || self.body_font.trim().is_empty() {
            return Err(Error::InvalidConfig("style fonts must not be empty".into()));
        }
        for (name, size) in [("title_size", self.title_size), ("body_size", self.body_size)] {
            if size.is_nan() || size <= 0.0 || size > 400.0 {
                return Err(Error::InvalidConfig(format!(
                    "style.{} must be between 0 and 400 points, got {}",
                    name, size
                )));
            }
        }
        Ok(())
    }
}

/// A 24-bit color, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Uppercase hex without the leading `#`, as OOXML expects.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl FromStr for RgbColor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid color '{}', expected #RRGGBB", s));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for RgbColor {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}
