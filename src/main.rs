use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use crypto_scanner::{
    binance::BinanceClient,
    config::ScannerConfig,
    deduplication::Deduplicator,
    journal::SignalJournal,
    scanner::{CycleReport, MarketScanner},
    telegram::TelegramClient,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct ScanStats {
    cycles: u64,
    alerts_sent: u64,
    last_report: Option<CycleReport>,
    last_finished: Option<DateTime<Utc>>,
}

pub struct AppState {
    deduplicator: Arc<Deduplicator>,
    stats: RwLock<ScanStats>,
    started_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crypto_scanner=info")),
        )
        .init();

    info!("==================================================");
    info!("  CRYPTO SCANNER - Rust Edition");
    info!("==================================================");

    let config = Arc::new(ScannerConfig::from_env());
    info!("Binance URL: {}", config.base_url);
    info!(
        "Timeframes: {} / {} / {} (scan every {:?})",
        config.kline_interval, config.fast_interval, config.slow_interval, config.scan_interval
    );

    let market = Arc::new(BinanceClient::new(&config.base_url, config.http_timeout)?);
    let notifier = TelegramClient::new(
        config.telegram_token.as_deref(),
        config.telegram_chat_id.as_deref(),
        config.http_timeout,
    )?;
    let deduplicator = Arc::new(Deduplicator::new(config.min_alert_interval));
    let journal = SignalJournal::new(config.log_file.clone());
    info!("Signal log: {}", journal.path().display());

    let scanner = MarketScanner::new(
        Arc::clone(&config),
        market,
        Arc::clone(&deduplicator),
        journal,
        notifier.clone(),
    );

    let state = Arc::new(AppState {
        deduplicator,
        stats: RwLock::new(ScanStats::default()),
        started_at: Utc::now(),
    });

    let app = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Liveness server running on port {}", config.port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Liveness server stopped: {}", e);
        }
    });

    if let Err(e) = notifier.send_alert("🚀 *Advanced Crypto Scanner* is now running").await {
        warn!("Failed to send startup notice: {}", e);
    }

    tokio::select! {
        _ = scan_loop(&scanner, &state, &config) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested, abandoning in-flight scan"),
    }
    Ok(())
}

async fn scan_loop(scanner: &MarketScanner, state: &AppState, config: &ScannerConfig) {
    loop {
        match scanner.run_cycle().await {
            Ok(report) => {
                let mut stats = state.stats.write().await;
                stats.cycles += 1;
                stats.alerts_sent += report.alerts_sent as u64;
                stats.last_report = Some(report);
                stats.last_finished = Some(Utc::now());
            }
            Err(e) => warn!("Scan cycle failed: {}", e),
        }
        info!("Sleeping {:?}", config.scan_interval);
        tokio::time::sleep(config.scan_interval).await;
    }
}

async fn home() -> &'static str {
    "Crypto scanner is running!"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "crypto-scanner (rust)",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn status(State(s): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = s.stats.read().await;
    let tracked = s.deduplicator.tracked_symbols().await;

    Json(serde_json::json!({
        "startedAt": s.started_at.to_rfc3339(),
        "cyclesCompleted": stats.cycles,
        "alertsSent": stats.alerts_sent,
        "lastCycle": stats.last_report,
        "lastFinishedAt": stats.last_finished.map(|t| t.to_rfc3339()),
        "symbolsAlerted": tracked
    }))
}
