//! HTTP surface: gallery page, uploads, search, delete, rescan.

mod pages;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;

use crate::db::Database;
use crate::ocr::OcrRouter;
use crate::settings::Settings;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Arc<Settings>,
    pub ocr: Arc<OcrRouter>,
}

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.settings.upload_dir.clone());

    Router::new()
        .route("/", get(routes::index).post(routes::upload))
        .route("/search", get(routes::search))
        .route(
            "/delete/*filename",
            get(routes::delete_image).post(routes::delete_image),
        )
        .route(
            "/rescan/*filename",
            get(routes::rescan_image).post(routes::rescan_image),
        )
        .nest_service("/static/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Serve until the token is cancelled (ctrl-c in `main`).
pub async fn serve(state: AppState, cancel_token: CancellationToken) -> Result<()> {
    let bind_addr = state.settings.bind_addr.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("gallery listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel_token.cancelled_owned())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}
