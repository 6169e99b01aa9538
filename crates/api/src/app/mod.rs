//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, credential manager and password hashing
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and payload mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, ConfigError};
use crate::{middleware, negotiation};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (public entrypoint used by
/// `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(build_router(services, config)?)
}

/// Assemble the router around already-wired services.
pub fn build_router(services: services::AppServices, config: &AppConfig) -> Result<Router, ConfigError> {
    let auth_state = middleware::AuthState {
        credentials: services.credentials.clone(),
    };

    let protected = routes::protected_router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Ok(Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config)?)
                .layer(Extension(Arc::new(services)))
                .layer(axum::middleware::from_fn(negotiation::negotiate_request)),
        ))
}

fn cors_layer(config: &AppConfig) -> Result<CorsLayer, ConfigError> {
    let Some(origin) = &config.client_origin else {
        return Ok(CorsLayer::new());
    };
    let origin = HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
        key: "CLIENT_ORIGIN",
        value: origin.clone(),
        reason: e.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]))
}
