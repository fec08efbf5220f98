use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    controllers::htmx_trigger,
    error::AppError,
    models::{Direction, NewAlert, PriceAlert},
    render,
    services::{alerts_service, evaluator},
    AppState,
};

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| (StatusCode::BAD_REQUEST, Html("bad id".to_string())).into_response())
}

fn alert_json(a: &PriceAlert) -> serde_json::Value {
    // crossed but not yet processed by a cycle: highlighted in the list
    let crossed = a.active
        && !a.triggered
        && a
            .last_price
            .map(|p| evaluator::crossed(a.target_price, a.direction, p))
            .unwrap_or(false);

    json!({
        "id": a.id.to_string(),
        "symbol": a.symbol,
        "direction": a.direction.label(),
        "target_price": a.target_price.normalize().to_string(),
        "last_price": a.last_price.map(|p| p.normalize().to_string()),
        "last_change": a.last_change_percent.map(|p| format!("{:.2}", p)),
        "active": a.active,
        "triggered": a.triggered,
        "crossed": crossed,
        "created_at": a.created_at.to_rfc3339(),
        "triggered_at": a.triggered_at.map(|t| t.to_rfc3339()),
    })
}

async fn alerts_list_html(state: &AppState, busy: bool) -> String {
    let groups: Vec<serde_json::Value> = alerts_service::list_alerts_grouped(state)
        .await
        .into_iter()
        .map(|(symbol, alerts)| {
            json!({
                "symbol": symbol,
                "alerts": alerts.iter().map(alert_json).collect::<Vec<_>>(),
            })
        })
        .collect();

    let stale = state
        .monitor
        .last_report()
        .await
        .map(|r| r.is_degraded())
        .unwrap_or(false);

    let ctx = json!({
        "groups": if groups.is_empty() { serde_json::Value::Null } else { serde_json::Value::Array(groups) },
        "stale": stale,
        "busy": busy,
    });

    render::render_partial(state, "partials/alerts_list", &ctx)
}

// GET /alerts/list
pub async fn get_alerts_list(State(state): State<AppState>) -> Response {
    let html = alerts_list_html(&state, false).await;
    (StatusCode::OK, Html(html)).into_response()
}

#[derive(Deserialize)]
pub struct CreateAlertForm {
    pub symbol: String,
    #[serde(rename = "targetPrice")]
    pub target_price: String,
    // "above" | "below" | "auto"
    #[serde(default)]
    pub direction: String,
}

// POST /alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    Form(form): Form<CreateAlertForm>,
) -> Response {
    let target_price = match alerts_service::parse_target(&form.target_price) {
        Ok(v) => v,
        Err(e) => return e.into_response(),
    };

    let direction = match form.direction.trim() {
        "" | "auto" => None,
        raw => match Direction::parse(raw) {
            Some(d) => Some(d),
            None => {
                return AppError::Validation("Please choose a valid direction.".to_string())
                    .into_response();
            }
        },
    };

    let new = NewAlert {
        symbol: form.symbol,
        target_price,
        direction,
    };

    match alerts_service::create_alert(&state, new).await {
        Ok(alert) => {
            let html = format!(
                r#"<div class="text-success">Alert created: {} {} {}.</div>"#,
                alert.symbol,
                alert.direction.as_str(),
                alert.target_price.normalize()
            );
            htmx_trigger((StatusCode::OK, Html(html)).into_response(), "alertsUpdated")
        }
        Err(e) => e.into_response(),
    }
}

// POST /alerts/:id/delete
pub async fn post_delete_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match alerts_service::delete_alert(&state, id).await {
        Ok(()) => htmx_trigger((StatusCode::OK, Html(String::new())).into_response(), "alertsUpdated"),
        Err(e) => e.into_response(),
    }
}

// POST /alerts/:id/toggle
pub async fn post_toggle_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match alerts_service::toggle_alert(&state, id).await {
        Ok(_) => htmx_trigger((StatusCode::OK, Html(String::new())).into_response(), "alertsUpdated"),
        Err(e) => e.into_response(),
    }
}

// POST /alerts/refresh
pub async fn post_refresh(State(state): State<AppState>) -> Response {
    let report = state.monitor.run_cycle().await;
    let busy = report.is_none();

    let html = alerts_list_html(&state, busy).await;
    let res = (StatusCode::OK, Html(html)).into_response();

    match report {
        Some(r) if r.triggered > 0 => htmx_trigger(res, "notificationsUpdated"),
        _ => res,
    }
}

// GET /notifications
pub async fn get_notifications(State(state): State<AppState>) -> Response {
    let notifications: Vec<serde_json::Value> = state
        .inbox
        .list()
        .await
        .into_iter()
        .map(|n| {
            json!({
                "title": n.title,
                "body": n.body,
                "created_at": n.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            })
        })
        .collect();

    let ctx = json!({
        "notifications": if notifications.is_empty() { serde_json::Value::Null } else { serde_json::Value::Array(notifications) },
    });

    let html = render::render_partial(&state, "partials/notifications", &ctx);
    (StatusCode::OK, Html(html)).into_response()
}

// POST /notifications/clear
pub async fn post_clear_notifications(State(state): State<AppState>) -> Response {
    state.inbox.clear().await;
    get_notifications(State(state)).await
}
