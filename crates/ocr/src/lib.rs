//! OCR collaborators for slide deck normalization.
//!
//! [`ImagePreprocessor`] cleans pictures up before recognition. Engines are
//! behind cargo features: `cloud-vision` (HTTPS document text detection,
//! on by default) and `tesseract` (local, via leptess).

mod preprocess;

#[cfg(feature = "cloud-vision")]
pub mod cloud;
#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use preprocess::{estimate_skew, ImagePreprocessor};

#[cfg(feature = "cloud-vision")]
pub use cloud::CloudVisionEngine;
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;

use deck_core::{OcrBackends, OcrConfig};
use std::sync::Arc;

/// Tesseract language used by [`default_backends`].
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Non-empty trimmed lines of recognized text.
pub fn text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Every backend that can be initialized in this build and environment,
/// plus the image preprocessor.
///
/// Backends that fail to initialize are logged and left out; the gate
/// reports images it cannot recognize.
pub fn default_backends(config: &OcrConfig) -> OcrBackends {
    #[allow(unused_mut)]
    let mut backends = OcrBackends::new().with_preprocessor(Arc::new(ImagePreprocessor::new()));

    #[cfg(feature = "cloud-vision")]
    {
        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        match CloudVisionEngine::from_env(timeout) {
            Ok(engine) => backends = backends.with_engine(deck_core::Backend::CloudVision, Arc::new(engine)),
            Err(e) => log::warn!("Cloud vision OCR unavailable: {}", e),
        }
    }

    #[cfg(feature = "tesseract")]
    {
        match TesseractEngine::new(DEFAULT_LANGUAGE) {
            Ok(engine) => backends = backends.with_engine(deck_core::Backend::LocalOcr, Arc::new(engine)),
            Err(e) => log::warn!("Local OCR unavailable: {}", e),
        }
    }

    if !backends.has(config.backend) {
        log::warn!("Configured OCR backend '{}' is not available", config.backend);
    }
    backends
}
