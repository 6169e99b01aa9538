use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use bookstore_auth::CredentialManager;

use crate::app::errors;
use crate::context::CurrentUser;
use crate::session;

#[derive(Clone)]
pub struct AuthState {
    pub credentials: Arc<CredentialManager>,
}

/// Reject requests without a valid access token for an existing, verified
/// user; otherwise attach [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let jar = CookieJar::from_headers(req.headers());
    let token = session::presented_token(req.headers(), &jar, session::ACCESS_TOKEN_COOKIE);

    let user_id = state
        .credentials
        .require_authenticated_user(token.as_deref())
        .await
        .map_err(errors::credential_error)?;

    req.extensions_mut().insert(CurrentUser::new(user_id));

    Ok(next.run(req).await)
}
