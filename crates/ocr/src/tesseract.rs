//! Local tesseract backend.

use deck_core::{Backend, Error, OcrEngine, Recognition, Result};
use leptess::LepTess;

fn backend_error(message: impl Into<String>) -> Error {
    Error::OcrBackend {
        backend: Backend::LocalOcr.as_str().to_string(),
        message: message.into(),
    }
}

/// Tesseract through leptess. A fresh engine is created per call, so one
/// value can serve concurrent recognitions.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    /// Check that tesseract starts with `language` data installed.
    pub fn new(language: impl Into<String>) -> Result<Self> {
        let language = language.into();
        LepTess::new(None, &language).map_err(|e| {
            backend_error(format!(
                "cannot initialize tesseract with language '{}': {}",
                language, e
            ))
        })?;
        Ok(Self { language })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        let mut tess = LepTess::new(None, &self.language)
            .map_err(|e| backend_error(format!("cannot initialize tesseract: {}", e)))?;
        tess.set_image_from_mem(image)
            .map_err(|e| backend_error(format!("cannot load image: {}", e)))?;
        let text = tess
            .get_utf8_text()
            .map_err(|e| backend_error(format!("recognition failed: {}", e)))?;

        let lines = crate::text_lines(&text);
        Ok(Recognition { text, lines })
    }
}
