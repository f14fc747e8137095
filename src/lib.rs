mod db;
mod media;
mod models;
mod ocr;
mod pipeline;
mod server;
mod settings;
mod transcript;
mod utils;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use db::Database;
use ocr::OcrRouter;
use server::AppState;
use settings::Settings;

/// Wire everything up and serve until ctrl-c.
pub async fn run(settings_path: &Path) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    info!(
        "starting gifgrep on {} (uploads in {})",
        settings.bind_addr,
        settings.upload_dir.display()
    );

    std::fs::create_dir_all(&settings.upload_dir).with_context(|| {
        format!(
            "failed to create upload directory {}",
            settings.upload_dir.display()
        )
    })?;

    let db = Database::new(settings.db_path.clone())?;
    let ocr = OcrRouter::from_settings(&settings)?;

    let state = AppState {
        db,
        settings: Arc::new(settings),
        ocr: Arc::new(ocr),
    };

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {err}");
            return;
        }
        info!("shutdown signal received");
        signal_token.cancel();
    });

    server::serve(state, cancel_token).await
}
