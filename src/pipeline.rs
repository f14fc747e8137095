//! Upload, rescan, and gallery orchestration.
//!
//! The flow for every scan is the same: decode the upload into frames, OCR
//! each frame in playback order, fold the per-frame texts into one transcript,
//! and make sure the file stored on disk is a GIF. Failures before the record
//! is written clean up whatever was saved.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::Instant;

use crate::db::Database;
use crate::media;
use crate::models::ImageRecord;
use crate::ocr::OcrRouter;
use crate::settings::Settings;
use crate::transcript::build_transcript;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// OCR every frame of `bytes` and fold the results into one transcript.
pub async fn scan_bytes(ocr: &OcrRouter, bytes: Vec<u8>, lang: &str) -> Result<String> {
    let decode_start = Instant::now();
    let frames = tokio::task::spawn_blocking(move || media::decode_frames(&bytes))
        .await
        .context("frame decode worker join failed")??;
    let frame_count = frames.len();
    log_info!(
        "decoded {} frame(s) in {}ms",
        frame_count,
        decode_start.elapsed().as_millis()
    );

    let mut texts = Vec::with_capacity(frame_count);
    for frame in frames {
        let png = tokio::task::spawn_blocking(move || media::encode_png(&frame))
            .await
            .context("png encode worker join failed")??;
        texts.push(ocr.recognize(&png, lang).await?);
    }

    let transcript = build_transcript(&texts);
    log_info!(
        "scan complete: {} frame(s) -> {} transcript chars (lang={})",
        frame_count,
        transcript.len(),
        lang
    );
    Ok(transcript)
}

/// Store an upload, OCR it, normalize it to GIF, and insert its record.
/// Returns the stored path relative to the upload directory.
///
/// If scanning or conversion fails, the saved file is removed and no record
/// is written.
pub async fn process_upload(
    db: &Database,
    settings: &Settings,
    ocr: &OcrRouter,
    original_name: &str,
    bytes: Vec<u8>,
    lang: &str,
) -> Result<String> {
    let filename = media::secure_filename(original_name);
    let date_folder = Utc::now().date_naive().to_string();
    let save_dir = settings.upload_dir.join(&date_folder);
    tokio::fs::create_dir_all(&save_dir)
        .await
        .with_context(|| format!("failed to create {}", save_dir.display()))?;

    let saved_path = save_dir.join(&filename);
    tokio::fs::write(&saved_path, &bytes)
        .await
        .with_context(|| format!("failed to save upload to {}", saved_path.display()))?;

    match scan_and_normalize(ocr, &saved_path, &filename, bytes, lang).await {
        Ok((stored_name, transcript)) => {
            let relative = format!("{date_folder}/{stored_name}");
            db.insert_image(&relative, &transcript, lang, Utc::now())
                .await?;
            log_info!("stored upload as {relative}");
            Ok(relative)
        }
        Err(err) => {
            // No partial state: the record was never written, so drop the file.
            if let Err(rm_err) = tokio::fs::remove_file(&saved_path).await {
                log_warn!(
                    "failed to remove {} after scan error: {rm_err}",
                    saved_path.display()
                );
            }
            Err(err)
        }
    }
}

/// Scan the saved upload and make sure a `.gif` ends up on disk. Returns the
/// filename actually stored (GIF sibling for converted uploads) and the
/// transcript.
async fn scan_and_normalize(
    ocr: &OcrRouter,
    saved_path: &Path,
    filename: &str,
    bytes: Vec<u8>,
    lang: &str,
) -> Result<(String, String)> {
    let transcript = scan_bytes(ocr, bytes.clone(), lang).await?;

    if media::is_gif(filename) {
        return Ok((filename.to_string(), transcript));
    }

    let gif_name = media::gif_sibling(filename);
    let gif_path = saved_path.with_file_name(&gif_name);
    convert_file_to_gif(bytes, &gif_path).await?;
    tokio::fs::remove_file(saved_path)
        .await
        .with_context(|| format!("failed to remove original {}", saved_path.display()))?;

    Ok((gif_name, transcript))
}

async fn convert_file_to_gif(bytes: Vec<u8>, gif_path: &Path) -> Result<()> {
    let gif_bytes = tokio::task::spawn_blocking(move || media::encode_gif(&bytes))
        .await
        .context("gif encode worker join failed")??;
    tokio::fs::write(gif_path, gif_bytes)
        .await
        .with_context(|| format!("failed to write {}", gif_path.display()))
}

/// Re-run OCR on a stored image, converting legacy non-GIF files along the
/// way. Returns `false` when the file no longer exists on disk.
pub async fn rescan(
    db: &Database,
    settings: &Settings,
    ocr: &OcrRouter,
    filename: &str,
) -> Result<bool> {
    let file_path = settings.upload_dir.join(filename);
    if !file_path.exists() {
        log_warn!("rescan requested for missing file {filename}");
        return Ok(false);
    }

    let lang = db
        .find_language(filename)
        .await?
        .unwrap_or_else(|| settings.default_lang.clone());

    let bytes = tokio::fs::read(&file_path)
        .await
        .with_context(|| format!("failed to read {}", file_path.display()))?;
    let transcript = scan_bytes(ocr, bytes.clone(), &lang).await?;

    let stored_name = if media::is_gif(filename) {
        filename.to_string()
    } else {
        let gif_relative = media::gif_sibling(filename);
        let gif_path = settings.upload_dir.join(&gif_relative);
        convert_file_to_gif(bytes, &gif_path).await?;
        tokio::fs::remove_file(&file_path)
            .await
            .with_context(|| format!("failed to remove original {}", file_path.display()))?;
        gif_relative
    };

    db.update_scan(filename, &stored_name, &transcript).await?;
    log_info!("rescanned {filename} (lang={lang})");
    Ok(true)
}

/// List gallery records, lazily repairing rows that still point at legacy
/// non-GIF files.
pub async fn gallery(
    db: &Database,
    settings: &Settings,
    query: Option<String>,
) -> Result<Vec<ImageRecord>> {
    let mut records = db.list_images(query).await?;

    for record in &mut records {
        if media::is_gif(&record.filename) {
            continue;
        }
        match repair_legacy_file(settings, &record.filename).await {
            Ok(Some(new_name)) => {
                db.update_filename(record.id, &new_name).await?;
                record.filename = new_name;
            }
            Ok(None) => {}
            Err(err) => {
                log_warn!("could not convert legacy file {}: {err:#}", record.filename);
            }
        }
    }

    Ok(records)
}

/// Convert one legacy non-GIF file in place. `None` when the file is gone.
async fn repair_legacy_file(settings: &Settings, filename: &str) -> Result<Option<String>> {
    let original: PathBuf = settings.upload_dir.join(filename);
    if !original.exists() {
        return Ok(None);
    }

    let gif_relative = media::gif_sibling(filename);
    let gif_path = settings.upload_dir.join(&gif_relative);
    if let Some(parent) = gif_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let bytes = tokio::fs::read(&original)
        .await
        .with_context(|| format!("failed to read {}", original.display()))?;
    convert_file_to_gif(bytes, &gif_path).await?;
    tokio::fs::remove_file(&original)
        .await
        .with_context(|| format!("failed to remove {}", original.display()))?;

    Ok(Some(gif_relative))
}
