use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde::Deserialize;

use crate::{
    render,
    services::{alerts_service, market_service},
    AppState,
};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// GET /search/results?q=btc
pub async fn get_search_results(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> axum::response::Response {
    let q = query.q.unwrap_or_default().trim().to_string();

    let data = market_service::search_results_ctx(&state, &q).await;
    let html = render::render_partial(&state, "partials/search_results", &data);

    (StatusCode::OK, Html(html)).into_response()
}

// GET /quote/:symbol
pub async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> axum::response::Response {
    let sym = match alerts_service::normalize_symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };

    let data = market_service::quote_ctx(&state, &sym).await;
    let html = render::render_partial(&state, "partials/quote", &data);

    (StatusCode::OK, Html(html)).into_response()
}
