//! Core content model and algorithms for normalizing slide decks.
//!
//! The pipeline extracts per-slide text, tables and pictures from a parsed
//! shape tree, resolves a title and body per slide, optionally recovers text
//! from pictures through OCR, paginates overflowing bodies and plans the
//! output slides that a document writer renders into a template.

pub mod config;
pub mod error;
pub mod extract;
pub mod fill;
pub mod ocr;
pub mod paginate;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod sanitize;
pub mod shape;
pub mod types;

pub use config::{NormalizeConfig, OcrConfig, PaginationConfig, RgbColor, StyleConfig};
pub use error::{Error, Result};
pub use extract::ShapeExtractor;
pub use fill::{plan_slides, select_layout, LayoutInfo, Paragraph, PlannedSlide, PlannedTable};
pub use ocr::{Backend, OcrBackends, OcrEngine, OcrGate, OcrPolicy, Preprocessor, Recognition};
pub use paginate::{split_by_budget, split_by_metrics, Paginator};
pub use pipeline::{DocumentReader, DocumentWriter, Normalized, Pipeline, Prepared, SlideContent};
pub use report::{Issue, Report, Stage};
pub use resolve::resolve;
pub use sanitize::TextSanitizer;
pub use shape::{Placeholder, PlaceholderKind, Shape, SourceDocument, SourceSlide};
pub use types::{
    BoundingBox, ImageRun, PageRecord, PageSize, ResolvedContent, SlideRecord, TableRecord, TextRun,
};
