use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored gallery image and its OCR transcript.
///
/// `filename` is relative to the upload directory, e.g. `2025-08-29/cat.gif`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: i64,
    pub filename: String,
    pub ocr_text: String,
    pub lang: String,
    pub uploaded_at: DateTime<Utc>,
}
