//! Dual JSON/XML request and response handling.
//!
//! Inbound, [`negotiate_request`] records the request's body format and turns
//! XML bodies into JSON so handlers only ever extract JSON. Outbound, handlers
//! hand a [`Payload`] to [`Negotiated::respond`], which encodes it in the
//! format the request arrived in.

use std::convert::Infallible;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use bookstore_codec::{CodecError, Format, Payload};

use crate::app::errors;

/// Upper bound on an XML request body that is buffered for conversion.
pub const MAX_XML_BODY_BYTES: usize = 2 * 1024 * 1024;

/// XML bodies larger than this are converted on the blocking pool.
pub const INLINE_XML_BODY_BYTES: usize = 64 * 1024;

/// The wire format negotiated for one request, if any.
///
/// `None` means the negotiation header named neither JSON nor XML; responses
/// then carry an empty body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Negotiated(Option<Format>);

impl Negotiated {
    pub fn new(format: Option<Format>) -> Self {
        Self(format)
    }

    pub fn format(&self) -> Option<Format> {
        self.0
    }

    /// Format named by the request's `Content-Type`.
    pub fn from_content_type(headers: &HeaderMap) -> Self {
        let format = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(Format::from_media_type);
        Self(format)
    }

    /// Format named by the request's `Accept` header, for requests whose body
    /// is not a payload (multipart uploads).
    ///
    /// The first acceptable entry wins. A missing header or a wildcard means
    /// JSON.
    pub fn from_accept(headers: &HeaderMap) -> Self {
        let Some(raw) = headers.get(ACCEPT) else {
            return Self(Some(Format::Json));
        };
        let Ok(raw) = raw.to_str() else {
            return Self(None);
        };

        let format = raw.split(',').find_map(|entry| {
            let essence = entry.split(';').next().unwrap_or_default().trim();
            if essence == "*/*" || essence.eq_ignore_ascii_case("application/*") {
                Some(Format::Json)
            } else {
                Format::from_media_type(essence)
            }
        });
        Self(format)
    }

    /// Encode `payload` under `root` in the negotiated format.
    ///
    /// Statuses that forbid a body get none, and an unknown format yields an
    /// empty body with the given status.
    pub fn respond(self, status: StatusCode, root: &str, payload: &Payload) -> Response {
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
            return status.into_response();
        }

        let Some(format) = self.0 else {
            return status.into_response();
        };

        match bookstore_codec::encode(payload, root, format) {
            Ok(bytes) => (
                status,
                [(CONTENT_TYPE, HeaderValue::from_static(format.media_type()))],
                bytes,
            )
                .into_response(),
            Err(err) => errors::codec_error(&err),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Negotiated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Negotiated>()
            .copied()
            .unwrap_or_else(|| Negotiated::from_content_type(&parts.headers)))
    }
}

/// Middleware: record the negotiated format, and re-encode XML bodies as JSON.
///
/// A body that fails to decode is answered with `400` before any handler runs.
pub async fn negotiate_request(req: Request, next: Next) -> Response {
    let negotiated = Negotiated::from_content_type(req.headers());
    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(negotiated);

    if negotiated.format() != Some(Format::Xml) {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let bytes = match axum::body::to_bytes(body, MAX_XML_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return errors::json_error(StatusCode::PAYLOAD_TOO_LARGE, "body_unreadable", err.to_string());
        }
    };

    let converted = if bytes.len() <= INLINE_XML_BODY_BYTES {
        xml_to_json(&bytes)
    } else {
        match tokio::task::spawn_blocking(move || xml_to_json(&bytes)).await {
            Ok(converted) => converted,
            Err(err) => return errors::internal(format!("xml conversion task failed: {err}")),
        }
    };
    let json = match converted {
        Ok(json) => json,
        Err(err) => return errors::codec_error(&err),
    };

    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(Format::JSON_MEDIA_TYPE));
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(json.len()));

    next.run(Request::from_parts(parts, Body::from(json))).await
}

fn xml_to_json(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return bookstore_codec::encode(&Payload::new(), "", Format::Json);
    }
    let payload = bookstore_codec::decode(bytes, Format::Xml)?;
    bookstore_codec::encode(&payload, "", Format::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn content_type_selects_format() {
        let xml = headers(CONTENT_TYPE, "application/xml; charset=utf-8");
        assert_eq!(Negotiated::from_content_type(&xml).format(), Some(Format::Xml));
        let other = headers(CONTENT_TYPE, "text/plain");
        assert_eq!(Negotiated::from_content_type(&other).format(), None);
        assert_eq!(Negotiated::from_content_type(&HeaderMap::new()).format(), None);
    }

    #[test]
    fn accept_prefers_first_known_entry() {
        let h = headers(ACCEPT, "text/html, application/xml;q=0.9, application/json");
        assert_eq!(Negotiated::from_accept(&h).format(), Some(Format::Xml));
        assert_eq!(Negotiated::from_accept(&headers(ACCEPT, "*/*")).format(), Some(Format::Json));
        assert_eq!(Negotiated::from_accept(&HeaderMap::new()).format(), Some(Format::Json));
        assert_eq!(Negotiated::from_accept(&headers(ACCEPT, "text/html")).format(), None);
    }

    #[tokio::test]
    async fn respond_encodes_in_negotiated_format() {
        let payload = Payload::new().with("email", "a@b.com").with("id", "1");

        let res = Negotiated::new(Some(Format::Xml)).respond(StatusCode::OK, "user", &payload);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/xml");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<user><email>a@b.com</email><id>1</id></user>");

        let res = Negotiated::new(None).respond(StatusCode::CREATED, "user", &payload);
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn no_content_has_no_body() {
        let payload = Payload::new().with("detail", "gone");
        let res = Negotiated::new(Some(Format::Json)).respond(StatusCode::NO_CONTENT, "book", &payload);
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn non_finite_numbers_fail_to_encode() {
        let payload = Payload::new().with("price", f64::NAN);
        let res = Negotiated::new(Some(Format::Json)).respond(StatusCode::OK, "book", &payload);
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn xml_bodies_become_json() {
        let json = xml_to_json(b"<user><email>a@b.com</email><password>secret123</password></user>").unwrap();
        assert_eq!(json, br#"{"email":"a@b.com","password":"secret123"}"#);
        assert_eq!(xml_to_json(b"  ").unwrap(), b"{}");
        assert!(matches!(xml_to_json(b"<user><email>"), Err(CodecError::Decoding { .. })));
    }
}
