pub mod alerts_controller;
pub mod home_controller;
pub mod market_controller;
pub mod realtime_controller;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::error::AppError;

pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Attaches an `HX-Trigger` header so htmx fires `event` on the page.
pub(crate) fn htmx_trigger(mut res: Response, event: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(event) {
        res.headers_mut().insert("HX-Trigger", v);
    }
    res
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// Validation problems are shown inline with a 200 so htmx swaps them in.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::OK,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ImmutableField(_) => StatusCode::CONFLICT,
            AppError::Transport(_) | AppError::Upstream { .. } | AppError::Parse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let html = format!(r#"<div class="text-danger small">{}</div>"#, esc(&self.to_string()));
        (status, Html(html)).into_response()
    }
}
