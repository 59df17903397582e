//! Front-end entry page and static assets

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::{Router, routing::get};
use std::path::{Component, Path, PathBuf};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/static/{*path}", get(asset))
}

/// Content type by file extension, everything unknown is served as binary
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Resolve a request path below `root`, refusing anything that could escape it
fn resolve(root: &Path, requested: &str) -> Option<PathBuf> {
    let relative = Path::new(requested);
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (resolved != root).then_some(resolved)
}

async fn read(path: &Path) -> Result<Vec<u8>, ApiError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found(format!("{} not found", path.display())))
        }
        Err(e) => Err(ApiError::internal(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

#[tracing::instrument(name = "GET /", skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Html<Vec<u8>>, ApiError> {
    let bytes = read(&state.config.static_dir.join("index.html")).await?;
    Ok(Html(bytes))
}

#[tracing::instrument(name = "GET /static", skip(state))]
pub async fn asset(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> Result<Response, ApiError> {
    let file = resolve(&state.config.static_dir, &path)
        .ok_or_else(|| ApiError::not_found(format!("{} not found", path)))?;
    let bytes = read(&file).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&file))], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!(content_type_for(Path::new("app.js")), "application/javascript");
        assert_eq!(content_type_for(Path::new("style.css")), "text/css");
        assert_eq!(content_type_for(Path::new("logo.png")), "image/png");
        assert_eq!(content_type_for(Path::new("a/b.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("photo.JPEG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("model.onnx")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("static");
        assert_eq!(resolve(root, "js/app.js"), Some(PathBuf::from("static/js/app.js")));
        assert_eq!(resolve(root, "../secret.txt"), None);
        assert_eq!(resolve(root, "js/../../secret.txt"), None);
        assert_eq!(resolve(root, "/etc/passwd"), None);
        assert_eq!(resolve(root, "."), None);
    }
}
