use axum::{routing::get, Router};

pub mod auth;
pub mod books;
pub mod files;
pub mod system;
pub mod user;

/// Router for endpoints open to anonymous clients.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/api/auth", auth::public_router())
        .nest("/api/store", books::public_router())
        .nest("/api/file", files::router())
}

/// Router for endpoints that require an authenticated, verified user.
pub fn protected_router() -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/user", user::router())
        .nest("/api/store", books::router())
}
