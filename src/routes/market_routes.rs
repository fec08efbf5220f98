use axum::{Router, routing::get};
use crate::{AppState, controllers::market_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/search/results", get(market_controller::get_search_results))
        .route("/quote/:symbol", get(market_controller::get_quote))
}
