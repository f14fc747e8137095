use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::Value;

/// Client for a RapidOCR-style HTTP service.
///
/// The service takes a multipart upload under the `image_file` field and
/// answers with a JSON object keyed by block index, each block carrying a
/// `rec_txt` string.
pub struct RapidOcrClient {
    client: reqwest::Client,
    url: String,
}

impl RapidOcrClient {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build OCR HTTP client")?;
        Ok(Self { client, url })
    }

    pub async fn recognize(&self, png_bytes: &[u8]) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(png_bytes.to_vec())
            .file_name("frame.png")
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new().part("image_file", part);

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("OCR request to {} failed", self.url))?;

        if !resp.status().is_success() {
            bail!(
                "OCR service returned {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            );
        }

        let body: Value = resp.json().await.context("OCR response was not JSON")?;
        let text = collect_rec_texts(&body);
        info!("remote OCR returned {} chars", text.len());
        Ok(text)
    }
}

/// Join the non-empty `rec_txt` entries in block-index order. Keys are string
/// numbers, so they get sorted numerically rather than lexically.
fn collect_rec_texts(body: &Value) -> String {
    let Some(blocks) = body.as_object() else {
        return String::new();
    };

    let mut indexed: Vec<(u64, &str)> = blocks
        .iter()
        .filter_map(|(key, block)| {
            let index = key.parse::<u64>().ok()?;
            let text = block.get("rec_txt")?.as_str()?;
            if text.is_empty() {
                None
            } else {
                Some((index, text))
            }
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    indexed
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocks_join_in_numeric_order() {
        let body = json!({
            "0": { "rec_txt": "first" },
            "2": { "rec_txt": "third" },
            "10": { "rec_txt": "last" },
            "1": { "rec_txt": "second" },
        });
        assert_eq!(collect_rec_texts(&body), "first\nsecond\nthird\nlast");
    }

    #[test]
    fn empty_blocks_are_dropped() {
        let body = json!({
            "0": { "rec_txt": "" },
            "1": { "rec_txt": "kept" },
            "2": { "score": 0.4 },
        });
        assert_eq!(collect_rec_texts(&body), "kept");
    }

    #[test]
    fn non_object_body_yields_empty_text() {
        assert_eq!(collect_rec_texts(&json!([1, 2, 3])), "");
    }
}
