use std::net::SocketAddr;

use cryptoalerts::{config, routes, services::alert_monitor, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let state = match AppState::from_settings(settings.clone()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialise");
            std::process::exit(1);
        }
    };

    alert_monitor::spawn_price_alert_monitor(state.monitor.clone(), settings.check_interval());
    tracing::info!(
        every_secs = settings.check_interval_secs,
        store = ?settings.alerts_file,
        "price alert monitor started"
    );

    let app = routes::app(state);

    let ip = match settings.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            tracing::error!(host = %settings.host, error = %e, "invalid HOST");
            std::process::exit(1);
        }
    };
    let addr = SocketAddr::from((ip, settings.port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}
