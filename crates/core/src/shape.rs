//! Format-independent view of a parsed presentation's shape tree.
//!
//! Document readers translate their container format into these types; the
//! extractor only ever sees this tree.

use crate::types::{BoundingBox, PageSize};

/// The role a placeholder plays on its layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    Title,
    CenterTitle,
    Subtitle,
    Body,
    /// Generic content placeholder (OOXML `obj`, also the implicit default).
    Content,
    Date,
    Footer,
    SlideNumber,
    Picture,
    Table,
    Chart,
    Other(String),
}

impl PlaceholderKind {
    /// Map an OOXML `p:ph/@type` value. A missing attribute means `obj`.
    pub fn from_ooxml(value: Option<&str>) -> Self {
        match value.unwrap_or("obj") {
            "title" => Self::Title,
            "ctrTitle" => Self::CenterTitle,
            "subTitle" => Self::Subtitle,
            "body" => Self::Body,
            "obj" => Self::Content,
            "dt" => Self::Date,
            "ftr" => Self::Footer,
            "sldNum" => Self::SlideNumber,
            "pic" => Self::Picture,
            "tbl" => Self::Table,
            "chart" => Self::Chart,
            other => Self::Other(other.to_string()),
        }
    }

    /// The OOXML `p:ph/@type` value for this kind.
    pub fn as_ooxml(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::CenterTitle => "ctrTitle",
            Self::Subtitle => "subTitle",
            Self::Body => "body",
            Self::Content => "obj",
            Self::Date => "dt",
            Self::Footer => "ftr",
            Self::SlideNumber => "sldNum",
            Self::Picture => "pic",
            Self::Table => "tbl",
            Self::Chart => "chart",
            Self::Other(value) => value,
        }
    }

    pub fn is_title(&self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }

    /// Body-type placeholders that can receive paragraph text.
    pub fn is_body(&self) -> bool {
        matches!(self, Self::Body | Self::Content)
    }

    /// Footer, date and slide-number placeholders never carry content.
    pub fn is_chrome(&self) -> bool {
        matches!(self, Self::Date | Self::Footer | Self::SlideNumber)
    }
}

/// Placeholder marker on a shape: kind plus the layout index it binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub idx: Option<u32>,
}

/// A shape with a text frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub bounding_box: BoundingBox,
    pub placeholder: Option<Placeholder>,
    /// Paragraphs joined with `\n`.
    pub text: String,
}

impl TextShape {
    pub fn placeholder_kind(&self) -> Option<&PlaceholderKind> {
        self.placeholder.as_ref().map(|p| &p.kind)
    }
}

/// A picture shape with its embedded raster payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageShape {
    pub bounding_box: BoundingBox,
    pub image_bytes: Vec<u8>,
    pub content_type: String,
}

/// A shape exposing a grid of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    pub bounding_box: BoundingBox,
    pub cells: Vec<Vec<String>>,
}

/// One positioned element on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Text(TextShape),
    Image(ImageShape),
    Table(TableShape),
    /// Connectors, charts, media and anything else without usable content.
    Other,
}

/// A shape the reader could not decode, kept so the failure is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedShape {
    pub reason: String,
}

/// All shapes of one source slide, in traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSlide {
    pub shapes: Vec<Shape>,
    pub skipped: Vec<SkippedShape>,
}

impl SourceSlide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.skipped.push(SkippedShape {
            reason: reason.into(),
        });
    }
}

/// A parsed source presentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceDocument {
    pub slides: Vec<SourceSlide>,
    pub page_size: Option<PageSize>,
}
