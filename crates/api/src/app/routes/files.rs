use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use bookstore_codec::Payload;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::negotiation::Negotiated;

pub fn router() -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/getfile/:filename", get(get_file))
}

/// Store the multipart `file` field under a fresh name and return its URL.
///
/// The body is multipart, so the response format follows `Accept`.
pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> axum::response::Response {
    let negotiated = Negotiated::from_accept(&headers);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }

        let ext = field
            .file_name()
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !services.accepts_extension(&ext) {
            return errors::json_error(StatusCode::NOT_ACCEPTABLE, "unsupported_extension", "extension no acceptable");
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.body_text()),
        };

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        if let Err(e) = services.files.save(&name, &bytes).await {
            return errors::file_error(e);
        }
        tracing::info!(file = %name, size = bytes.len(), "file uploaded");

        let payload = Payload::new()
            .with("status", "success")
            .with("url", format!("{}/api/file/getfile/{}", base_url(&headers), name));
        return negotiated.respond(StatusCode::CREATED, "file", &payload);
    }

    errors::json_error(StatusCode::BAD_REQUEST, "missing_file", "multipart field `file` is required")
}

pub async fn get_file(
    Extension(services): Extension<Arc<AppServices>>,
    Path(filename): Path<String>,
) -> axum::response::Response {
    match services.files.load(&filename).await {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&filename)))],
            bytes,
        )
            .into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "file not found"),
        Err(e) => errors::file_error(e),
    }
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
