use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use log::error;
use serde::Deserialize;

use super::{pages, AppState};
use crate::pipeline;

/// anyhow adapter: any handler failure becomes a plain 500 with the error
/// chain in the body.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let records = pipeline::gallery(&state.db, &state.settings, None).await?;
    Ok(Html(pages::render_gallery(&records, None)))
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, AppError> {
    let query = if params.q.is_empty() {
        None
    } else {
        Some(params.q.clone())
    };
    let records = pipeline::gallery(&state.db, &state.settings, query).await?;
    Ok(Html(pages::render_gallery(&records, Some(&params.q))))
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut lang: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    file = Some((name, bytes.to_vec()));
                }
            }
            Some("lang") => {
                lang = Some(field.text().await?);
            }
            _ => {}
        }
    }

    // An empty form submit just reloads the gallery.
    let Some((original_name, bytes)) = file else {
        return Ok(Redirect::to("/"));
    };

    let lang = lang
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| state.settings.default_lang.clone());

    pipeline::process_upload(
        &state.db,
        &state.settings,
        &state.ocr,
        &original_name,
        bytes,
        &lang,
    )
    .await?;

    Ok(Redirect::to("/"))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Redirect, AppError> {
    if !safe_relative_path(&filename) {
        return Ok(Redirect::to("/"));
    }

    let file_path = state.settings.upload_dir.join(&filename);
    if file_path.exists() {
        tokio::fs::remove_file(&file_path).await?;
    }
    state.db.delete_by_filename(&filename).await?;

    Ok(Redirect::to("/"))
}

pub async fn rescan_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Redirect, AppError> {
    if !safe_relative_path(&filename) {
        return Ok(Redirect::to("/"));
    }

    pipeline::rescan(&state.db, &state.settings, &state.ocr, &filename).await?;
    Ok(Redirect::to("/"))
}

/// Stored filenames are `<date>/<name>`; anything trying to climb out of the
/// upload directory is ignored.
fn safe_relative_path(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('/')
        && !filename.split('/').any(|part| part == ".." || part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::safe_relative_path;

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        assert!(safe_relative_path("2025-08-29/cat.gif"));
        assert!(safe_relative_path("cat.gif"));
        assert!(!safe_relative_path("../db.sqlite"));
        assert!(!safe_relative_path("a/../../etc"));
        assert!(!safe_relative_path("/etc/passwd"));
        assert!(!safe_relative_path(""));
        assert!(!safe_relative_path("a//b"));
    }
}
