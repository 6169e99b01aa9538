use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bookstore_auth::CredentialError;
use bookstore_codec::CodecError;
use bookstore_core::DomainError;
use bookstore_infra::{FileStoreError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn codec_error(err: &CodecError) -> axum::response::Response {
    match err {
        CodecError::Decoding { .. } => {
            tracing::debug!(format = %err.format(), error = %err, "request body rejected");
            json_error(StatusCode::BAD_REQUEST, "decoding_error", err.to_string())
        }
        CodecError::Encoding { .. } => {
            tracing::warn!(error = %err, "failed to encode response payload");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "encoding_error", err.to_string())
        }
    }
}

/// Credential failures are `401` with the client-facing reason; signing and
/// lookup failures are server errors.
pub fn credential_error(err: CredentialError) -> axum::response::Response {
    match err.unauthenticated_reason() {
        Some(reason) => {
            tracing::debug!(error = %err, "credential rejected");
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason)
        }
        None => {
            tracing::warn!(error = %err, "credential check failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "credential_error", err.to_string())
        }
    }
}

pub fn domain_error(err: DomainError) -> axum::response::Response {
    let code = match &err {
        DomainError::Validation(_) => "validation_error",
        DomainError::InvalidId(_) => "invalid_id",
    };
    json_error(StatusCode::BAD_REQUEST, code, err.message())
}

pub fn store_error(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn file_error(err: FileStoreError) -> axum::response::Response {
    match err {
        FileStoreError::InvalidName(_) => json_error(StatusCode::NOT_FOUND, "not_found", "file not found"),
        FileStoreError::Io(e) => {
            tracing::warn!(error = %e, "file storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "file_error", e.to_string())
        }
    }
}

pub fn internal(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}
