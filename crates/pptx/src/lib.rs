//! PPTX (Office Open XML) backend for slide deck normalization.
//!
//! A .pptx file is a ZIP archive of XML parts. [`PptxReader`] turns one into
//! the format-independent shape tree the core pipeline works on, and
//! [`PptxWriter`] fills a template (or a generated blank deck) with the
//! planned output slides.

mod blank;
pub mod layouts;
pub mod package;
pub mod parser;
mod slide_xml;
pub mod writer;

#[cfg(test)]
mod fixtures;

pub use parser::PptxReader;
pub use writer::PptxWriter;

use deck_core::{DocumentReader, NormalizeConfig, Normalized, Pipeline, Report, Result, ShapeExtractor, SlideRecord};

/// Extract the slide records of a .pptx file.
pub fn extract(source: &[u8]) -> Result<(Vec<SlideRecord>, Report)> {
    let document = PptxReader::new().read(source)?;
    Ok(ShapeExtractor::new().extract(&document))
}

/// Normalize a .pptx file into `template`, or into a blank deck.
///
/// OCR runs only when enabled in `config` and a backend set has been
/// installed with [`deck_core::ocr::install`].
pub fn normalize(source: &[u8], template: Option<&[u8]>, config: NormalizeConfig) -> Result<Normalized> {
    Pipeline::new(PptxReader::new(), PptxWriter::new(), config)?.normalize(source, template)
}
