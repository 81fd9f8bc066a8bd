use crate::error::ScanResult;
use crate::types::Signal;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

/// One row per alert actually sent. Field order is the CSV column order.
#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    timestamp_utc: String,
    symbol: &'a str,
    side: String,
    grade: &'static str,
    score: u32,
    price: f64,
    rsi_15m: f64,
    rsi_1h: f64,
    change_24h_percent: f64,
    quote_volume_24h: f64,
    vol_1m: f64,
    vol_5m: f64,
    vol_15m: f64,
    vol_60m: f64,
    net_vol_1m: f64,
    net_vol_15m: f64,
    net_vol_60m: f64,
    ping_count_24h: u32,
}

impl<'a> JournalRow<'a> {
    fn from_signal(signal: &'a Signal) -> Self {
        Self {
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            symbol: &signal.symbol,
            side: signal.side.to_string(),
            grade: signal.grade.label(),
            score: signal.score,
            price: signal.price,
            rsi_15m: signal.rsi_now,
            rsi_1h: signal.rsi_trend,
            change_24h_percent: signal.change_24h,
            quote_volume_24h: signal.quote_volume_24h,
            vol_1m: signal.vol_1m,
            vol_5m: signal.vol_5m,
            vol_15m: signal.vol_15m,
            vol_60m: signal.vol_60m,
            net_vol_1m: signal.net_vol_1m,
            net_vol_15m: signal.net_vol_primary,
            net_vol_60m: signal.net_vol_trend,
            ping_count_24h: signal.ping_count,
        }
    }
}

/// Append-only CSV record of sent alerts.
pub struct SignalJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SignalJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, writing the header first when the file is new or empty.
    pub async fn append(&self, signal: &Signal) -> ScanResult<()> {
        let _guard = self.write_lock.lock().await;

        let needs_header = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(needs_header).from_writer(file);
        writer.serialize(JournalRow::from_signal(signal))?;
        writer.flush()?;

        info!("[Journal] Logged {} {} (score {})", signal.symbol, signal.grade, signal.score);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Grade, Side};

    fn sample_signal(symbol: &str) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            side: Side::BUY,
            price: 1.25,
            grade: Grade::Strong,
            score: 8,
            quote_volume_24h: 2_500_000.0,
            change_24h: 4.5,
            main_spike: 3.4,
            fast_spike: 1.1,
            rsi_now: 55.0,
            rsi_min: 38.0,
            rsi_trend: 61.0,
            trend_extension: 0.03,
            reasons: vec!["Breakout 15m".to_string()],
            vol_1m: 10.0,
            vol_5m: 50.0,
            vol_15m: 150.0,
            vol_60m: 600.0,
            net_vol_1m: 10.0,
            net_vol_primary: 120.0,
            net_vol_trend: 300.0,
            ping_count: 2,
        }
    }

    #[tokio::test]
    async fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let journal = SignalJournal::new(dir.path().join("signals_log.csv"));

        journal.append(&sample_signal("ADAUSDT")).await.unwrap();
        journal.append(&sample_signal("XRPUSDT")).await.unwrap();

        let content = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp_utc,symbol,side,grade,score,price,rsi_15m,rsi_1h"));
        assert!(lines[0].ends_with("net_vol_15m,net_vol_60m,ping_count_24h"));
        assert!(lines[1].contains(",ADAUSDT,BUY,Strong,8,1.25,55.0,61.0,"));
        assert!(lines[2].contains(",XRPUSDT,"));
        assert!(lines[2].ends_with(",2"));
    }
}
