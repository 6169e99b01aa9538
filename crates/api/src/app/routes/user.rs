use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::get, Router};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CurrentUser;
use crate::negotiation::Negotiated;

pub fn router() -> Router {
    Router::new().route("/me", get(me))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
) -> axum::response::Response {
    match services.users.find_by_id(current.user_id()).await {
        Ok(Some(user)) => negotiated.respond(StatusCode::OK, "user", &dto::user_to_payload(&user)),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user no longer exist"),
        Err(e) => errors::store_error(e),
    }
}
