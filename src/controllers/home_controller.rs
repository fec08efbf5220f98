use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde_json::json;

use crate::{controllers::is_htmx, render, AppState};

pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let body = match state.hbs.render("pages/home", &json!({})) {
        Ok(s) => s,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(format!("template error: {e}"))).into_response();
        }
    };

    if is_htmx(&headers) {
        return (StatusCode::OK, Html(body)).into_response();
    }

    match render::render_full(&state, "Alerts", body) {
        Ok(page) => (StatusCode::OK, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

pub async fn not_found(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let body = state
        .hbs
        .render("pages/not_found", &json!({}))
        .unwrap_or_else(|e| format!("template error: {e}"));

    if is_htmx(&headers) {
        return (StatusCode::NOT_FOUND, Html(body)).into_response();
    }

    match render::render_full(&state, "404", body) {
        Ok(page) => (StatusCode::NOT_FOUND, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Html("ok".to_string()))
}

// GET /status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let all = state.store.list_all().await;
    let active = all.iter().filter(|a| a.active).count();
    let triggered = all.iter().filter(|a| a.triggered).count();

    Json(json!({
        "alerts": {
            "total": all.len(),
            "active": active,
            "triggered": triggered,
            "persist_failures": state.store.persist_failures(),
        },
        "monitor": state.monitor.stats(),
        "last_cycle": state.monitor.last_report().await,
        "check_interval_secs": state.settings.check_interval_secs,
        "notifications": state.inbox.list().await.len(),
    }))
}
