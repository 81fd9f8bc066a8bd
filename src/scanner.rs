use crate::binance::MarketData;
use crate::config::ScannerConfig;
use crate::deduplication::Deduplicator;
use crate::error::ScanResult;
use crate::journal::SignalJournal;
use crate::signal::{MarketFrames, SignalEvaluator};
use crate::telegram::{format_alert, TelegramClient};
use crate::types::{Grade, Signal};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-symbol outcome of one scan cycle.
pub type SymbolResult = (String, ScanResult<Option<Signal>>);

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleReport {
    pub symbols: usize,
    pub failures: usize,
    pub signals: usize,
    pub alerts_sent: usize,
}

/// Drives one scan cycle: fan out over symbols, collect, then dispatch alerts.
pub struct MarketScanner {
    market: Arc<dyn MarketData>,
    evaluator: SignalEvaluator,
    deduplicator: Arc<Deduplicator>,
    journal: SignalJournal,
    notifier: TelegramClient,
}

impl MarketScanner {
    pub fn new(
        config: Arc<ScannerConfig>,
        market: Arc<dyn MarketData>,
        deduplicator: Arc<Deduplicator>,
        journal: SignalJournal,
        notifier: TelegramClient,
    ) -> Self {
        Self {
            market,
            evaluator: SignalEvaluator::new(config),
            deduplicator,
            journal,
            notifier,
        }
    }

    fn config(&self) -> &ScannerConfig {
        self.evaluator.config()
    }

    pub fn notifier(&self) -> &TelegramClient {
        &self.notifier
    }

    /// Fetches everything one symbol needs and evaluates it. The ticker is
    /// checked first so illiquid symbols cost a single request.
    pub async fn build_signal(&self, symbol: &str) -> ScanResult<Option<Signal>> {
        let c = self.config();
        let ticker = self.market.get_24h_ticker(symbol).await?;
        if !self.evaluator.check_liquidity(&ticker).passes {
            return Ok(None);
        }

        let (primary, fast, trend, instant) = tokio::try_join!(
            self.market.get_candles(symbol, &c.kline_interval, c.kline_limit),
            self.market.get_candles(symbol, &c.fast_interval, c.fast_kline_limit),
            self.market.get_candles(symbol, &c.slow_interval, c.slow_kline_limit),
            self.market.get_candles(symbol, &c.instant_interval, c.instant_kline_limit),
        )?;

        let frames = MarketFrames { ticker, primary, fast, trend, instant };
        self.evaluator.evaluate(symbol, &frames)
    }

    /// Evaluates every symbol with at most `scan_concurrency` in flight.
    /// Failures stay attached to their symbol.
    pub async fn scan_symbols(&self, symbols: Vec<String>) -> Vec<SymbolResult> {
        stream::iter(symbols)
            .map(|symbol| async move {
                let result = self.build_signal(&symbol).await;
                (symbol, result)
            })
            .buffer_unordered(self.config().scan_concurrency.max(1))
            .collect()
            .await
    }

    /// Ping bookkeeping, cadence check, journal, notify. Returns true when an
    /// alert went out.
    pub async fn dispatch(&self, mut signal: Signal) -> bool {
        let c = self.config();
        let symbol = signal.symbol.clone();

        if c.skip_weak && signal.grade == Grade::Weak {
            debug!("[Scanner] {} skipped: weak signal (score {})", symbol, signal.score);
            return false;
        }

        signal.ping_count = self
            .deduplicator
            .update_ping(&symbol, signal.net_vol_1m, signal.quote_volume_24h)
            .await;

        if !self.deduplicator.should_alert(&symbol).await {
            debug!("[Scanner] {} suppressed: alerted within the last {:?}", symbol, c.min_alert_interval);
            return false;
        }

        if let Err(e) = self.journal.append(&signal).await {
            warn!("[Scanner] Failed to log signal for {}: {}", symbol, e);
        }

        let message = format_alert(&signal, &c.quote_asset);
        if let Err(e) = self.notifier.send_alert(&message).await {
            warn!("[Scanner] Failed to send alert for {}: {}", symbol, e);
        }

        self.deduplicator.record_alert(&symbol).await;
        info!(
            "[ALERT SENT] {} {} score={} pings={}",
            symbol, signal.grade, signal.score, signal.ping_count
        );
        true
    }

    pub async fn run_cycle(&self) -> ScanResult<CycleReport> {
        info!("[Scanner] Starting scan...");
        let symbols = self.market.list_tradable_pairs(&self.config().quote_asset).await?;

        let results = self.scan_symbols(symbols).await;
        let mut report = CycleReport {
            symbols: results.len(),
            ..CycleReport::default()
        };

        for (symbol, result) in results {
            match result {
                Ok(Some(signal)) => {
                    report.signals += 1;
                    if self.dispatch(signal).await {
                        report.alerts_sent += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!("[Scanner] Error processing {}: {}", symbol, e);
                }
            }
        }

        info!(
            "[Scanner] Scan finished: {} symbols, {} signals, {} alerts, {} errors",
            report.symbols, report.signals, report.alerts_sent, report.failures
        );
        Ok(report)
    }
}
