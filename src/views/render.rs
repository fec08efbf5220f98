use serde_json::json;

use crate::AppState;

pub fn render_full(state: &AppState, title: &str, body_html: String) -> Result<String, String> {
    let ctx = json!({
        "title": title,
        "body": body_html,
        "interval_secs": state.settings.check_interval_secs,
    });

    state
        .hbs
        .render("layouts/base", &ctx)
        .map_err(|e| e.to_string())
}

/// Renders a partial, folding template errors into the output the way the
/// page handlers do.
pub fn render_partial(state: &AppState, tpl: &str, ctx: &serde_json::Value) -> String {
    state
        .hbs
        .render(tpl, ctx)
        .unwrap_or_else(|e| format!("template error: {e}"))
}
