use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Share of 24h quote volume a single 1m net volume must exceed to count as a ping.
const PING_VOLUME_FRACTION: f64 = 0.003;

#[derive(Debug, Clone, Copy)]
struct PingState {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Per-symbol alert cadence and 24h activity ping counters.
///
/// Lives for the whole process and is never persisted. Each map sits behind
/// its own lock and every per-symbol update happens under one write guard.
pub struct Deduplicator {
    min_alert_interval: Duration,
    ping_window: Duration,
    last_alerts: RwLock<HashMap<String, DateTime<Utc>>>,
    pings: RwLock<HashMap<String, PingState>>,
}

impl Deduplicator {
    pub fn new(min_alert_interval: std::time::Duration) -> Self {
        Self {
            min_alert_interval: Duration::from_std(min_alert_interval).unwrap_or_else(|_| Duration::hours(1)),
            ping_window: Duration::hours(24),
            last_alerts: RwLock::new(HashMap::new()),
            pings: RwLock::new(HashMap::new()),
        }
    }

    pub async fn should_alert(&self, symbol: &str) -> bool {
        self.should_alert_at(symbol, Utc::now()).await
    }

    pub async fn should_alert_at(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        match self.last_alerts.read().await.get(symbol) {
            None => true,
            Some(&last) => now - last >= self.min_alert_interval,
        }
    }

    pub async fn record_alert(&self, symbol: &str) {
        self.record_alert_at(symbol, Utc::now()).await
    }

    pub async fn record_alert_at(&self, symbol: &str, now: DateTime<Utc>) {
        self.last_alerts.write().await.insert(symbol.to_string(), now);
    }

    pub async fn update_ping(&self, symbol: &str, net_vol_1m: f64, quote_vol_24h: f64) -> u32 {
        self.update_ping_at(symbol, net_vol_1m, quote_vol_24h, Utc::now()).await
    }

    /// Counts a ping when the 1m net volume beats 0.3% of 24h volume. The
    /// window restarts at 1 once 24h have passed since its first ping.
    pub async fn update_ping_at(
        &self,
        symbol: &str,
        net_vol_1m: f64,
        quote_vol_24h: f64,
        now: DateTime<Utc>,
    ) -> u32 {
        let mut pings = self.pings.write().await;
        let current = pings.get(symbol).map(|p| p.count).unwrap_or(0);

        if quote_vol_24h <= 0.0 || net_vol_1m <= 0.0 {
            return current;
        }
        if net_vol_1m <= PING_VOLUME_FRACTION * quote_vol_24h {
            return current;
        }

        let state = pings.entry(symbol.to_string()).or_insert(PingState { count: 0, window_start: now });
        if state.count == 0 || now - state.window_start >= self.ping_window {
            *state = PingState { count: 1, window_start: now };
        } else {
            state.count += 1;
        }
        state.count
    }

    pub async fn ping_count(&self, symbol: &str) -> u32 {
        self.pings.read().await.get(symbol).map(|p| p.count).unwrap_or(0)
    }

    pub async fn tracked_symbols(&self) -> usize {
        self.last_alerts.read().await.len()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(60 * 60))
    }
}
