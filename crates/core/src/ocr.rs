//! OCR gating and aggregation.
//!
//! Decides per slide whether text from embedded pictures is needed, runs the
//! configured recognition backend on every picture, and merges the result
//! into the slide body. Recognition and preprocessing are external
//! collaborators reached through [`OcrEngine`] and [`Preprocessor`].

use crate::config::OcrConfig;
use crate::error::{Error, Result};
use crate::report::{Report, Stage};
use crate::resolve::PARAGRAPH_SEPARATOR;
use crate::sanitize::TextSanitizer;
use crate::types::{ImageRun, ResolvedContent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Bodies shorter than this many characters are treated as missing.
pub const MIN_BODY_LENGTH: usize = 20;

/// When OCR runs for a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrPolicy {
    /// Only when the body is empty or shorter than the minimum length.
    OnlyWhenMissing,
    /// For every slide with pictures.
    Always,
}

impl FromStr for OcrPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "only_when_missing" => Ok(Self::OnlyWhenMissing),
            "always" => Ok(Self::Always),
            other => Err(format!("unknown OCR policy '{}'", other)),
        }
    }
}

/// Recognition backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    CloudVision,
    LocalOcr,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::CloudVision => "cloud_vision",
            Backend::LocalOcr => "local_ocr",
        }
    }

    /// Backend tried once when this one fails.
    pub fn fallback(self) -> Option<Backend> {
        match self {
            Backend::CloudVision => Some(Backend::LocalOcr),
            Backend::LocalOcr => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cloud_vision" => Ok(Self::CloudVision),
            "local_ocr" => Ok(Self::LocalOcr),
            other => Err(format!("unknown OCR backend '{}'", other)),
        }
    }
}

/// Text recognized in one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    pub lines: Vec<String>,
}

impl Recognition {
    /// Full text, rebuilt from lines when the backend returned none.
    pub fn full_text(&self) -> String {
        if self.text.trim().is_empty() {
            self.lines.join("\n")
        } else {
            self.text.clone()
        }
    }
}

/// A text recognition backend.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<Recognition>;
}

/// Image cleanup applied before recognition.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, image: &[u8], dpi: u32) -> Result<Vec<u8>>;
}

/// The initialized OCR collaborators, shared read-only across threads.
#[derive(Default, Clone)]
pub struct OcrBackends {
    engines: HashMap<Backend, Arc<dyn OcrEngine>>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
}

impl fmt::Debug for OcrBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrBackends")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .field("preprocessor", &self.preprocessor.is_some())
            .finish()
    }
}

impl OcrBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the engine serving `backend`.
    pub fn with_engine(mut self, backend: Backend, engine: Arc<dyn OcrEngine>) -> Self {
        self.engines.insert(backend, engine);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn has(&self, backend: Backend) -> bool {
        self.engines.contains_key(&backend)
    }

    /// Run the preprocessor, if any.
    pub fn preprocess(&self, image: &[u8], dpi: u32) -> Option<Result<Vec<u8>>> {
        self.preprocessor.as_ref().map(|p| p.preprocess(image, dpi))
    }

    /// Recognize `image` with a single backend, bounded by `timeout`.
    pub fn recognize_once(&self, image: Arc<[u8]>, backend: Backend, timeout: Duration) -> Result<Recognition> {
        let engine = self.engines.get(&backend).cloned().ok_or_else(|| Error::OcrBackend {
            backend: backend.to_string(),
            message: "backend is not initialized".to_string(),
        })?;
        call_with_timeout(engine, image, backend, timeout)
    }

    /// Recognize `image`, falling back once to a local backend when the
    /// primary one is a cloud service and fails.
    ///
    /// When the fallback fails as well, the primary error is returned.
    pub fn recognize(&self, image: Arc<[u8]>, backend: Backend, timeout: Duration) -> Result<Recognition> {
        match self.recognize_once(Arc::clone(&image), backend, timeout) {
            Ok(recognition) => Ok(recognition),
            Err(primary) => {
                let Some(fallback) = backend.fallback().filter(|b| self.has(*b)) else {
                    return Err(primary);
                };
                log::warn!("{}; retrying with {}", primary, fallback);
                self.recognize_once(image, fallback, timeout).map_err(|e| {
                    log::debug!("Fallback backend {} failed too: {}", fallback, e);
                    primary
                })
            }
        }
    }
}

/// Run one recognition call on its own thread and wait at most `timeout`.
///
/// A call that times out keeps running detached; its result is dropped.
fn call_with_timeout(
    engine: Arc<dyn OcrEngine>,
    image: Arc<[u8]>,
    backend: Backend,
    timeout: Duration,
) -> Result<Recognition> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(format!("ocr-{}", backend))
        .spawn(move || {
            let _ = tx.send(engine.recognize(&image));
        })
        .map_err(|e| Error::OcrBackend {
            backend: backend.to_string(),
            message: format!("cannot start worker: {}", e),
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(Error::OcrTimeout {
            backend: backend.to_string(),
            seconds: timeout.as_secs(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(Error::OcrBackend {
            backend: backend.to_string(),
            message: "worker exited without a result".to_string(),
        }),
    }
}

static INSTALLED: RwLock<Option<Arc<OcrBackends>>> = RwLock::new(None);

/// Install the process-wide OCR backends, replacing any previous set.
///
/// Call again after a configuration or credential change.
pub fn install(backends: OcrBackends) -> Arc<OcrBackends> {
    let backends = Arc::new(backends);
    let mut slot = INSTALLED.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(Arc::clone(&backends));
    log::debug!("Installed OCR backends: {:?}", backends);
    backends
}

/// The currently installed backends, if any.
pub fn installed() -> Option<Arc<OcrBackends>> {
    INSTALLED
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Return the installed backends, installing the result of `init` first
/// when none are.
pub fn installed_or_init(init: impl FnOnce() -> OcrBackends) -> Arc<OcrBackends> {
    let mut slot = INSTALLED.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(slot.get_or_insert_with(|| Arc::new(init())))
}

/// Remove the installed backends.
pub fn clear() {
    let mut slot = INSTALLED.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = None;
}

/// Whether `body` counts as missing.
fn body_is_missing(body: &str, min_body_length: usize) -> bool {
    let body = body.trim();
    body.is_empty() || body.chars().count() < min_body_length
}

/// Whether OCR should run for a slide with this body.
pub fn should_run(body: &str, policy: OcrPolicy, min_body_length: usize) -> bool {
    match policy {
        OcrPolicy::Always => true,
        OcrPolicy::OnlyWhenMissing => body_is_missing(body, min_body_length),
    }
}

/// Merge recognized text into a body.
///
/// Recognized text is appended only when the body was missing; an adequate
/// body is returned unchanged and the recognized text is discarded.
pub fn merge_text(body: &str, ocr_text: &str, min_body_length: usize) -> String {
    let ocr_text = ocr_text.trim();
    if ocr_text.is_empty() || !body_is_missing(body, min_body_length) {
        return body.to_string();
    }
    let body = body.trim();
    if body.is_empty() {
        ocr_text.to_string()
    } else {
        format!("{}{}{}", body, PARAGRAPH_SEPARATOR, ocr_text)
            .trim()
            .to_string()
    }
}

/// Runs OCR for slides and merges the results into their bodies.
pub struct OcrGate {
    backends: Arc<OcrBackends>,
    config: OcrConfig,
    pool: Option<rayon::ThreadPool>,
    sanitizer: TextSanitizer,
}

impl fmt::Debug for OcrGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrGate")
            .field("backends", &self.backends)
            .field("config", &self.config)
            .finish()
    }
}

impl OcrGate {
    /// Create a gate running at most `config.concurrency` calls at once.
    pub fn new(backends: Arc<OcrBackends>, config: OcrConfig) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency.max(1))
            .thread_name(|i| format!("ocr-pool-{}", i))
            .build()
            .map_err(|e| log::warn!("OCR worker pool unavailable, running sequentially: {}", e))
            .ok();

        Self {
            backends,
            config,
            pool,
            sanitizer: TextSanitizer::new().with_collapse_whitespace(true),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn run<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Preprocess and recognize one image, recording failures in `report`.
    fn recognize_image(&self, slide_index: usize, image_index: usize, image: &ImageRun) -> (Option<String>, Report) {
        let mut report = Report::new();

        let bytes: Arc<[u8]> = match self.backends.preprocess(&image.image_bytes, self.config.dpi) {
            Some(Ok(processed)) => Arc::from(processed),
            Some(Err(e)) => {
                report.record(
                    Stage::Preprocess,
                    Some(slide_index),
                    format!("image {}: {}; using raw image", image_index + 1, e),
                );
                Arc::from(image.image_bytes.as_slice())
            }
            None => Arc::from(image.image_bytes.as_slice()),
        };

        match self.backends.recognize(bytes, self.config.backend, self.timeout()) {
            Ok(recognition) => {
                let text = self.sanitizer.sanitize(&recognition.full_text());
                (Some(text).filter(|t| !t.is_empty()), report)
            }
            Err(e) => {
                report.record(Stage::Ocr, Some(slide_index), format!("image {}: {}", image_index + 1, e));
                (None, report)
            }
        }
    }

    /// Recognize every image of a slide and merge the text into its body.
    pub fn augment(&self, slide_index: usize, content: &ResolvedContent, images: &[ImageRun]) -> (ResolvedContent, Report) {
        let mut report = Report::new();
        if images.is_empty() || !should_run(&content.body, self.config.policy, self.config.min_body_length) {
            return (content.clone(), report);
        }

        let results: Vec<(Option<String>, Report)> = self.run(|| {
            images
                .par_iter()
                .enumerate()
                .map(|(i, image)| self.recognize_image(slide_index, i, image))
                .collect()
        });

        let mut texts = Vec::new();
        for (text, image_report) in results {
            report.merge(image_report);
            texts.extend(text);
        }
        let ocr_text = texts.join(PARAGRAPH_SEPARATOR);

        let body = merge_text(&content.body, &ocr_text, self.config.min_body_length);
        if body == content.body && !ocr_text.is_empty() {
            log::debug!(
                "Slide {}: body already has content, discarding {} OCR character(s)",
                slide_index + 1,
                ocr_text.chars().count()
            );
        }

        (
            ResolvedContent {
                title: content.title.clone(),
                body,
            },
            report,
        )
    }

    /// Augment many slides, in parallel across slides.
    ///
    /// Results keep the order of `slides`.
    pub fn augment_all(&self, slides: &[(usize, &ResolvedContent, &[ImageRun])]) -> Vec<(ResolvedContent, Report)> {
        self.run(|| {
            slides
                .par_iter()
                .map(|(index, content, images)| self.augment(*index, content, images))
                .collect()
        })
    }
}
