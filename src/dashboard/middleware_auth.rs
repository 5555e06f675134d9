//! Session auth for the dashboard.
//!
//! A successful password login issues an HS256 JWT in the `session` cookie and,
//! when the user supplied one, stores their Paymo API key in the
//! `paymo_api_key` cookie. [`require_session`] gates every route except the
//! login flow, health, metrics, and static frontend assets:
//!
//! - unauthenticated `/api/*` requests get `401` JSON
//! - unauthenticated page requests are redirected to `/login?from=<path>`
//!
//! When no dashboard password is configured the gate is open.
//!
//! [`PaymoCredential`] resolves the Paymo client for a request from the API
//! key cookie, falling back to the configured default key.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{ApiError, AppState};
use crate::paymo::PaymoClient;

pub const SESSION_COOKIE: &str = "session";
pub const API_KEY_COOKIE: &str = "paymo_api_key";
const SESSION_SUBJECT: &str = "dashboard";

/// JWT claims carried by the session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a session token valid for `ttl`.
pub fn issue_session_token(
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: SESSION_SUBJECT.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry of a session token.
pub fn verify_session_token(
    secret: &str,
    token: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Read a cookie value from the `Cookie` header(s), percent-decoded.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string())
        })
}

fn is_public_path(path: &str) -> bool {
    path == "/login"
        || path == "/healthz"
        || path == "/metrics"
        || path.starts_with("/api/login")
        || path.starts_with("/_next")
        || path.starts_with("/favicon.ico")
}

fn has_valid_session(state: &AppState, headers: &HeaderMap) -> bool {
    cookie_value(headers, SESSION_COOKIE)
        .map(|token| verify_session_token(&state.config.auth.session_secret, &token).is_ok())
        .unwrap_or(false)
}

/// Gate requests behind a valid session cookie.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if state.config.auth.dashboard_password.is_none() {
        return next.run(req).await;
    }
    let path = req.uri().path().to_string();
    if is_public_path(&path) || has_valid_session(&state, req.headers()) {
        return next.run(req).await;
    }
    if path.starts_with("/api/") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Authentication required"})),
        )
            .into_response();
    }
    let target = format!("/login?from={}", urlencoding::encode(&path));
    Redirect::to(&target).into_response()
}

/// Axum extractor yielding a Paymo client bound to the caller's credential.
///
/// Rejects with `401 {"error": "API key not provided"}` when neither the
/// session nor the configuration supplies a key.
pub struct PaymoCredential(pub PaymoClient);

impl FromRequestParts<Arc<AppState>> for PaymoCredential {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = cookie_value(&parts.headers, API_KEY_COOKIE)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| state.config.paymo.api_key.clone())
            .ok_or(ApiError::MissingCredential)?;
        Ok(PaymoCredential(state.paymo_client(&key)))
    }
}
