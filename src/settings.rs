use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Server configuration, read once at startup from a JSON file. Missing
/// fields (or a missing file) fall back to defaults, so a bare install runs
/// with no config at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Directory uploads are stored under, in per-day subfolders.
    pub upload_dir: PathBuf,
    pub db_path: PathBuf,
    /// Language used when the upload form sends none.
    pub default_lang: String,
    /// Path or name of the tesseract binary.
    pub tesseract_path: String,
    /// Endpoint of the RapidOCR-style HTTP service.
    pub remote_ocr_url: String,
    /// Language codes routed to the remote service instead of tesseract.
    pub remote_langs: Vec<String>,
    /// Per-request timeout for the remote OCR service, in seconds.
    pub remote_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            upload_dir: PathBuf::from("static/uploads"),
            db_path: PathBuf::from("db.sqlite"),
            default_lang: "eng".into(),
            tesseract_path: "tesseract".into(),
            remote_ocr_url: "http://localhost:9005/ocr".into(),
            remote_langs: vec!["chi_sim".into(), "chi_tra".into()],
            remote_timeout_secs: 60,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    pub fn uses_remote_ocr(&self, lang: &str) -> bool {
        self.remote_langs.iter().any(|l| l == lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let parsed: Settings =
            serde_json::from_str(r#"{ "bind_addr": "0.0.0.0:9000" }"#).unwrap();
        assert_eq!(parsed.bind_addr, "0.0.0.0:9000");
        assert_eq!(parsed.default_lang, "eng");
        assert!(parsed.uses_remote_ocr("chi_sim"));
        assert!(!parsed.uses_remote_ocr("eng"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/gifgrep.json")).unwrap();
        assert_eq!(settings.db_path, PathBuf::from("db.sqlite"));
    }
}
