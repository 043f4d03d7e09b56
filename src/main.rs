// src/main.rs
// Entry point: config, service loops and the read-only status API.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use dotenv::dotenv;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vortex_scanner::config::Config;
use vortex_scanner::price_feed::PriceFeed;
use vortex_scanner::scanner::SignalScanner;
use vortex_scanner::telegram_notifier::TelegramNotifier;
use vortex_scanner::trade_event_logger::TradeEventLogger;
use vortex_scanner::trade_monitor::TradeMonitor;
use vortex_scanner::trade_store::TradeStore;

#[derive(Clone)]
struct AppState {
    store: Arc<TradeStore>,
    config: Arc<Config>,
}

async fn health() -> &'static str {
    "OK"
}

async fn status_api(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.list_all().await {
        Ok(trades) => {
            let open = trades.iter().filter(|t| !t.closed).count();
            let body = serde_json::json!({
                "open_trades": open,
                "closed_trades": trades.len() - open,
                "scan_interval_seconds": state.config.scan_interval_secs,
                "track_interval_seconds": state.config.track_interval_secs,
                "symbols": state.config.symbols,
                "timeframes": state.config.timeframes,
                "max_active_trades": state.config.max_active_trades,
            });
            (StatusCode::OK, Json(body))
        }
        Err(e) => store_error_response(e),
    }
}

async fn trades_api(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.list_all().await {
        Ok(trades) => (StatusCode::OK, Json(serde_json::json!(trades))),
        Err(e) => store_error_response(e),
    }
}

async fn open_trades_api(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.list_open().await {
        Ok(trades) => (StatusCode::OK, Json(serde_json::json!(trades))),
        Err(e) => store_error_response(e),
    }
}

fn store_error_response(
    e: vortex_scanner::errors::StoreError,
) -> (StatusCode, Json<serde_json::Value>) {
    error!("Error reading trade store: {}", e);
    let body = serde_json::json!({
        "error": "Failed to read trade store",
        "message": e.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("👋 Shutdown signal received, exiting.");
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    info!("🚀 vortex_scanner starting");
    info!(
        "   Symbols: {:?} | Timeframes: {:?} | MTF confirm: {} ({})",
        config.symbols, config.timeframes, config.mtf_enabled, config.mtf_timeframe
    );
    info!(
        "   Scan every {}s, monitor every {}s, max {} open trades, state: {:?}",
        config.scan_interval_secs,
        config.track_interval_secs,
        config.max_active_trades,
        config.state_file
    );

    let feed = match PriceFeed::new(config.api_key.clone()) {
        Ok(feed) => Arc::new(feed),
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let store = Arc::new(TradeStore::new(
        config.state_file.clone(),
        config.max_active_trades,
    ));
    let notifier = Arc::new(TelegramNotifier::new(config.telegram_bot_token.clone()));

    let scanner = SignalScanner::new(
        Arc::clone(&config),
        Arc::clone(&feed),
        Arc::clone(&store),
        Arc::clone(&notifier),
    );
    tokio::spawn(async move {
        scanner.run().await;
    });

    let monitor = TradeMonitor::new(
        Arc::clone(&feed),
        Arc::clone(&store),
        Arc::clone(&notifier),
        TradeEventLogger::new(config.logs_dir.clone()),
        config.track_interval_secs,
    );
    tokio::spawn(async move {
        monitor.run().await;
    });

    let app_state = AppState {
        store: Arc::clone(&store),
        config: Arc::clone(&config),
    };
    let cors = CorsLayer::new().allow_origin(Any);
    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(status_api))
        .route("/trades", get(trades_api))
        .route("/trades/open", get(open_trades_api))
        .layer(cors)
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", config.status_api_port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind status API on {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("🌐 Status API listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Status API server error: {}", e);
    }
}
