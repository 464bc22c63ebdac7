//! Error types for slide-deck normalization.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while normalizing a presentation.
///
/// Only [`Error::DocumentFormat`], [`Error::DocumentWrite`] and
/// [`Error::InvalidConfig`] abort a whole invocation. The remaining variants
/// describe per-shape or per-image failures that the pipeline records as
/// issues and recovers from.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The source bytes could not be parsed as a slide-deck container.
    #[error("Unreadable presentation: {0}")]
    DocumentFormat(String),

    /// A single shape could not be read; the shape is skipped.
    #[error("Shape could not be read: {0}")]
    ShapeAccess(String),

    /// An OCR backend failed to recognize an image.
    #[error("OCR backend '{backend}' failed: {message}")]
    OcrBackend { backend: String, message: String },

    /// An OCR call did not finish within the configured timeout.
    #[error("OCR backend '{backend}' timed out after {seconds}s")]
    OcrTimeout { backend: String, seconds: u64 },

    /// Image preprocessing failed; the raw image is used instead.
    #[error("Image preprocessing failed: {0}")]
    Preprocess(String),

    /// The output document could not be produced.
    #[error("Failed to write presentation: {0}")]
    DocumentWrite(String),

    /// Configuration values are out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Font data could not be loaded for metric pagination.
    #[error("Font error: {0}")]
    Font(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlError(String),
}

impl Error {
    /// Name of the pipeline stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::IoError(_) => "input",
            Error::DocumentFormat(_) | Error::ZipError(_) | Error::XmlError(_) => "extract",
            Error::ShapeAccess(_) => "extract",
            Error::OcrBackend { .. } | Error::OcrTimeout { .. } => "ocr",
            Error::Preprocess(_) => "preprocess",
            Error::Font(_) => "paginate",
            Error::DocumentWrite(_) => "fill",
            Error::InvalidConfig(_) => "config",
        }
    }

    /// Whether this error aborts the whole invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ShapeAccess(_)
                | Error::OcrBackend { .. }
                | Error::OcrTimeout { .. }
                | Error::Preprocess(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Error::DocumentFormat("bad".into()).stage(), "extract");
        assert_eq!(Error::DocumentWrite("bad".into()).stage(), "fill");
        assert_eq!(
            Error::OcrTimeout {
                backend: "local_ocr".into(),
                seconds: 3
            }
            .stage(),
            "ocr"
        );
    }

    #[test]
    fn test_fatality() {
        assert!(Error::DocumentFormat("x".into()).is_fatal());
        assert!(Error::InvalidConfig("x".into()).is_fatal());
        assert!(!Error::ShapeAccess("x".into()).is_fatal());
        assert!(!Error::Preprocess("x".into()).is_fatal());
    }
}
