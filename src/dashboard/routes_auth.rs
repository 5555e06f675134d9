//! Login API: password check, session and API key cookies.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::middleware_auth::{issue_session_token, API_KEY_COOKIE, SESSION_COOKIE};
use super::AppState;

#[derive(Deserialize)]
pub(super) struct LoginPayload {
    #[serde(default)]
    password: String,
    #[serde(default, rename = "apiKey", alias = "api_key")]
    api_key: Option<String>,
}

fn set_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        urlencoding::encode(value),
        max_age_secs
    )
}

fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// POST /api/login: `{password, apiKey?}`. Sets the session cookie and,
/// when given, the Paymo API key cookie.
pub(super) async fn handler_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    let auth = &state.config.auth;
    if let Some(expected) = auth.dashboard_password.as_deref() {
        if payload.password != expected {
            warn!("rejected dashboard login");
            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"ok": false})))
                .into_response();
        }
    }

    let token = match issue_session_token(&auth.session_secret, auth.session_ttl) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "failed to issue session token");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"ok": false})),
            )
                .into_response();
        }
    };
    let ttl = auth.session_ttl.as_secs();
    let mut cookies = vec![(header::SET_COOKIE, set_cookie(SESSION_COOKIE, &token, ttl))];
    if let Some(key) = payload.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        cookies.push((header::SET_COOKIE, set_cookie(API_KEY_COOKIE, key, ttl)));
    }
    info!(custom_key = cookies.len() > 1, "dashboard login");
    (
        StatusCode::OK,
        AppendHeaders(cookies),
        Json(serde_json::json!({"ok": true})),
    )
        .into_response()
}

/// DELETE /api/login: clear session and API key cookies.
pub(super) async fn handler_logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(SESSION_COOKIE)),
            (header::SET_COOKIE, clear_cookie(API_KEY_COOKIE)),
        ]),
        Json(serde_json::json!({"ok": true})),
    )
}
