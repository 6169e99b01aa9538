use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;

use bookstore_auth::CredentialError;
use bookstore_codec::Payload;
use bookstore_infra::{NewUser, StoreError};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CurrentUser;
use crate::negotiation::Negotiated;
use crate::session;

pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", get(refresh))
}

pub fn router() -> Router {
    Router::new().route("/logout", get(logout))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    negotiated: Negotiated,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error(e);
    }

    let email = body.email.trim().to_lowercase();
    let username = body.username.trim().to_string();

    match services.users.exists_with_email_or_username(&email, &username).await {
        Ok(true) => return account_exists(),
        Ok(false) => {}
        Err(e) => return errors::store_error(e),
    }

    let password_hash = match services.hash_password(body.password).await {
        Ok(hash) => hash,
        Err(e) => return errors::internal(e.to_string()),
    };

    let new_user = NewUser {
        username,
        email,
        password_hash,
        photo: body.photo.filter(|p| !p.trim().is_empty()),
        verified: true,
        role: "user".to_string(),
    };

    match services.users.insert(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user registered");
            negotiated.respond(StatusCode::CREATED, "user", &dto::user_to_payload(&user))
        }
        Err(StoreError::Conflict(_)) => account_exists(),
        Err(e) => errors::store_error(e),
    }
}

fn account_exists() -> axum::response::Response {
    errors::json_error(StatusCode::CONFLICT, "conflict", "Account already exist")
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    negotiated: Negotiated,
    jar: CookieJar,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let email = body.email.trim().to_lowercase();

    let user = match services.users.find_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => return bad_login(),
        Err(e) => return errors::store_error(e),
    };

    match services.verify_password(body.password, user.password_hash.clone()).await {
        Ok(true) => {}
        Ok(false) => return bad_login(),
        Err(e) => return errors::internal(e.to_string()),
    }

    if !user.verified {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "please verify your email address",
        );
    }

    let tokens = services
        .credentials
        .issue_access(user.id)
        .and_then(|access| Ok((access, services.credentials.issue_refresh(user.id)?)));
    let (access, refresh) = match tokens {
        Ok(pair) => pair,
        Err(e) => return errors::credential_error(e),
    };

    tracing::info!(user_id = %user.id, "user logged in");

    let jar = session::start(jar, access.clone(), refresh, services.credentials.settings());
    let payload = Payload::new()
        .with("status", "success")
        .with("access_token", access);
    (jar, negotiated.respond(StatusCode::OK, "user", &payload)).into_response()
}

fn bad_login() -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "bad_credentials", "incorrect email and password")
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    negotiated: Negotiated,
    headers: HeaderMap,
    jar: CookieJar,
) -> axum::response::Response {
    let token = session::presented_token(&headers, &jar, session::REFRESH_TOKEN_COOKIE);

    let access = match services.credentials.refresh_cycle(token.as_deref()).await {
        Ok(access) => access,
        Err(e) => return refresh_error(e),
    };

    let jar = session::renew(jar, access.clone(), services.credentials.settings());
    let payload = Payload::new()
        .with("status", "success")
        .with("access_token", access);
    (jar, negotiated.respond(StatusCode::OK, "user", &payload)).into_response()
}

fn refresh_error(err: CredentialError) -> axum::response::Response {
    let message = match &err {
        CredentialError::Missing => "please provide refresh token",
        CredentialError::SubjectNotFound => "user belongs to this token not exist",
        CredentialError::Signing(_) | CredentialError::Lookup(_) => return errors::credential_error(err),
        _ => "could not refresh access token",
    };
    tracing::debug!(error = %err, "refresh rejected");
    errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
    jar: CookieJar,
) -> axum::response::Response {
    let user = match services.users.find_by_id(current.user_id()).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "user no longer exist"),
        Err(e) => return errors::store_error(e),
    };

    tracing::info!(user_id = %user.id, "user logged out");

    let payload = Payload::new()
        .with("status", "success")
        .with("email", user.email.as_str());
    (session::end(jar), negotiated.respond(StatusCode::OK, "user", &payload)).into_response()
}
