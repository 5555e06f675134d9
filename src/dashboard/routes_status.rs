//! Built-in frontend pages, served when no static export directory is configured.

use axum::http::header;
use axum::response::IntoResponse;

pub(super) async fn handler_index() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        include_str!("../dashboard.html"),
    )
}

pub(super) async fn handler_login_page() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        include_str!("../login.html"),
    )
}
