//! The normalization pipeline: extract, resolve, OCR, paginate, fill.
//!
//! Document I/O is reached through [`DocumentReader`] and
//! [`DocumentWriter`], so the pipeline is independent of the container
//! format. [`Pipeline::prepare`] and [`Pipeline::render`] expose the seam
//! where titles and bodies may be reviewed and edited.

use crate::config::{NormalizeConfig, StyleConfig};
use crate::error::Result;
use crate::extract::ShapeExtractor;
use crate::fill::{plan_slides, PlannedSlide};
use crate::ocr::{self, OcrBackends, OcrGate};
use crate::paginate::Paginator;
use crate::report::{Report, Stage};
use crate::resolve::{resolve, FALLBACK_TITLE};
use crate::sanitize::TextSanitizer;
use crate::shape::SourceDocument;
use crate::types::{PageRecord, PageSize, ResolvedContent, SlideRecord, TableRecord};
use std::sync::Arc;

/// Parses source bytes into a shape tree.
pub trait DocumentReader {
    /// Fails with [`crate::Error::DocumentFormat`] when the bytes are not a
    /// readable presentation.
    fn read(&self, bytes: &[u8]) -> Result<SourceDocument>;
}

/// Serializes planned slides into an output document.
pub trait DocumentWriter {
    /// Write `slides` into `template` (or a blank document).
    ///
    /// Per-shape problems go into `report`; only unrecoverable failures
    /// return an error.
    fn write(
        &self,
        template: Option<&[u8]>,
        slides: &[PlannedSlide],
        style: &StyleConfig,
        page_size: Option<PageSize>,
        report: &mut Report,
    ) -> Result<Vec<u8>>;
}

/// A source slide together with its resolved (and possibly edited) content.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideContent {
    pub record: SlideRecord,
    pub resolved: ResolvedContent,
}

/// Output of [`Pipeline::prepare`].
#[derive(Debug, Clone)]
pub struct Prepared {
    pub slides: Vec<SlideContent>,
    pub page_size: Option<PageSize>,
    pub report: Report,
}

/// Output of a complete run.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub document: Vec<u8>,
    pub pages: Vec<PageRecord>,
    pub report: Report,
}

/// Normalization pipeline over a document reader and writer.
pub struct Pipeline<R, W> {
    reader: R,
    writer: W,
    config: NormalizeConfig,
    ocr: Option<Arc<OcrBackends>>,
}

impl<R: DocumentReader, W: DocumentWriter> Pipeline<R, W> {
    /// Create a pipeline, rejecting invalid configuration up front.
    pub fn new(reader: R, writer: W, config: NormalizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader,
            writer,
            config,
            ocr: None,
        })
    }

    /// Use these OCR backends instead of the process-wide installed ones.
    pub fn with_ocr_backends(mut self, backends: Arc<OcrBackends>) -> Self {
        self.ocr = Some(backends);
        self
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Extract, resolve and (if enabled) OCR every slide of `source`.
    pub fn prepare(&self, source: &[u8]) -> Result<Prepared> {
        let document = self.reader.read(source)?;
        log::debug!("Read {} slide(s)", document.slides.len());

        let (records, mut report) = ShapeExtractor::new().extract(&document);
        let mut resolved: Vec<ResolvedContent> = records.iter().map(resolve).collect();

        if self.config.ocr.enabled {
            match self.ocr.clone().or_else(ocr::installed) {
                Some(backends) => {
                    let gate = OcrGate::new(backends, self.config.ocr.clone());
                    let inputs: Vec<_> = records
                        .iter()
                        .zip(&resolved)
                        .map(|(record, content)| (record.index, content, record.image_runs.as_slice()))
                        .collect();
                    let results = gate.augment_all(&inputs);

                    resolved = results
                        .into_iter()
                        .map(|(content, slide_report)| {
                            report.merge(slide_report);
                            content
                        })
                        .collect();
                }
                None => report.record(Stage::Ocr, None, "OCR is enabled but no backend is installed"),
            }
        }

        let slides = records
            .into_iter()
            .zip(resolved)
            .map(|(record, resolved)| SlideContent { record, resolved })
            .collect();

        Ok(Prepared {
            slides,
            page_size: document.page_size,
            report,
        })
    }

    /// Paginate prepared content and write the output document.
    pub fn render(&self, prepared: &Prepared, template: Option<&[u8]>) -> Result<Normalized> {
        let mut report = prepared.report.clone();
        let paginator = Paginator::from_config(&self.config.pagination)?;
        let sanitizer = TextSanitizer::new();

        let mut pages: Vec<PageRecord> = Vec::new();
        let mut tables: Vec<TableRecord> = Vec::new();
        for slide in &prepared.slides {
            let mut title = sanitizer.sanitize_line(&slide.resolved.title);
            if title.is_empty() {
                title = FALLBACK_TITLE.to_string();
            }
            let content = ResolvedContent {
                title,
                body: sanitizer.sanitize(&slide.resolved.body),
            };

            let slide_pages = paginator.paginate(slide.record.index, &content);
            if slide_pages.len() > 1 {
                log::debug!("Slide {} split into {} pages", slide.record.index + 1, slide_pages.len());
            }
            pages.extend(slide_pages);
            tables.extend(slide.record.tables.iter().cloned());
        }

        let page_size = prepared.page_size;
        let planned = plan_slides(&pages, &tables, page_size.unwrap_or_default());
        let document = self
            .writer
            .write(template, &planned, &self.config.style, page_size, &mut report)?;

        log::debug!("Wrote {} slide(s), {} issue(s)", planned.len(), report.issues.len());
        Ok(Normalized {
            document,
            pages,
            report,
        })
    }

    /// Run the whole pipeline.
    pub fn normalize(&self, source: &[u8], template: Option<&[u8]>) -> Result<Normalized> {
        let prepared = self.prepare(source)?;
        self.render(&prepared, template)
    }
}
