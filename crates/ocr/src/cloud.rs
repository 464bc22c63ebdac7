//! Cloud vision backend (`images:annotate` REST endpoint, document text detection).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use deck_core::{Backend, Error, OcrEngine, Recognition, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default annotate endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_VISION_API_KEY";

fn backend_error(message: impl Into<String>) -> Error {
    Error::OcrBackend {
        backend: Backend::CloudVision.as_str().to_string(),
        message: message.into(),
    }
}

/// Document text detection over HTTPS.
#[derive(Clone)]
pub struct CloudVisionEngine {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for CloudVisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudVisionEngine")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl CloudVisionEngine {
    /// Create an engine; `timeout` bounds each HTTP request.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(backend_error("API key is empty"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| backend_error(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Create an engine with the key from `GOOGLE_VISION_API_KEY`.
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| backend_error(format!("{} environment variable not set", API_KEY_ENV)))?;
        Self::new(key, timeout)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl OcrEngine for CloudVisionEngine {
    fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        let request = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .map_err(|e| backend_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(backend_error(format!("HTTP {}: {}", status, body)));
        }

        let parsed: AnnotateResponse = response
            .json()
            .map_err(|e| backend_error(format!("unexpected response: {}", e)))?;
        recognition_from_response(parsed)
    }
}

/// Full text plus one line per detected paragraph.
fn recognition_from_response(response: AnnotateResponse) -> Result<Recognition> {
    let Some(result) = response.responses.into_iter().next() else {
        return Ok(Recognition::default());
    };
    if let Some(error) = result.error {
        if !error.message.is_empty() {
            return Err(backend_error(error.message));
        }
    }

    let Some(annotation) = result.full_text_annotation else {
        return Ok(Recognition::default());
    };

    let lines = annotation
        .pages
        .iter()
        .flat_map(|page| &page.blocks)
        .flat_map(|block| &block.paragraphs)
        .filter_map(|paragraph| {
            let words: Vec<String> = paragraph
                .words
                .iter()
                .map(|word| word.symbols.iter().map(|s| s.text.as_str()).collect())
                .collect();
            if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            }
        })
        .collect();

    Ok(Recognition {
        text: annotation.text,
        lines,
    })
}

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Default)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize, Default)]
struct Status {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Default)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize, Default)]
struct Page {
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Deserialize, Default)]
struct Block {
    #[serde(default)]
    paragraphs: Vec<AnnotatedParagraph>,
}

#[derive(Deserialize, Default)]
struct AnnotatedParagraph {
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Deserialize, Default)]
struct Word {
    #[serde(default)]
    symbols: Vec<Symbol>,
}

#[derive(Deserialize, Default)]
struct Symbol {
    #[serde(default)]
    text: String,
}
