//! Session cookies and token transport.
//!
//! Login sets `access_token`, `refresh_token` and `logged_in`; refresh renews
//! `access_token` and `logged_in`; logout clears all three. Tokens are read
//! from `Authorization: Bearer` first, then from the matching cookie.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use bookstore_auth::TokenSettings;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const LOGGED_IN_COOKIE: &str = "logged_in";

fn session_cookie(name: &'static str, value: String, ttl: chrono::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .same_site(SameSite::Lax)
        .secure(false)
        .http_only(false)
        .build()
}

/// Cookies for a fresh login.
pub fn start(jar: CookieJar, access: String, refresh: String, settings: TokenSettings) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, access, settings.access_ttl))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, refresh, settings.refresh_ttl))
        .add(session_cookie(LOGGED_IN_COOKIE, "True".to_string(), settings.refresh_ttl))
}

/// Cookies after a refresh; the refresh cookie is left as is.
pub fn renew(jar: CookieJar, access: String, settings: TokenSettings) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, access, settings.access_ttl))
        .add(session_cookie(LOGGED_IN_COOKIE, "True".to_string(), settings.refresh_ttl))
}

pub fn end(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(LOGGED_IN_COOKIE).path("/"))
        .remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// The token a request presents for `cookie`, bearer header first.
pub fn presented_token(headers: &HeaderMap, jar: &CookieJar, cookie: &str) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_string());
    }
    jar.get(cookie)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}
