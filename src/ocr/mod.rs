//! OCR backends and per-language routing.
//!
//! Two engines exist: the local tesseract binary and a RapidOCR-style HTTP
//! service. Which one handles a request is decided by the configured set of
//! remote language codes, not by anything hardcoded here.

mod remote;
mod tesseract;

use anyhow::Result;

pub use remote::RapidOcrClient;
pub use tesseract::TesseractEngine;

use crate::settings::Settings;

pub struct OcrRouter {
    tesseract: TesseractEngine,
    remote: RapidOcrClient,
    remote_langs: Vec<String>,
}

impl OcrRouter {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            tesseract: TesseractEngine::new(settings.tesseract_path.clone()),
            remote: RapidOcrClient::new(
                settings.remote_ocr_url.clone(),
                settings.remote_timeout_secs,
            )?,
            remote_langs: settings.remote_langs.clone(),
        })
    }

    /// Recognize text in one PNG-encoded frame. Backend errors propagate
    /// unchanged; an empty string means the engine found no text.
    pub async fn recognize(&self, png_bytes: &[u8], lang: &str) -> Result<String> {
        if self.remote_langs.iter().any(|l| l == lang) {
            self.remote.recognize(png_bytes).await
        } else {
            self.tesseract.recognize(png_bytes, lang).await
        }
    }
}
