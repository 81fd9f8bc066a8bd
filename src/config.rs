use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Scanner configuration derived from environment variables.
///
/// Every field falls back to its default when the variable is unset or does
/// not parse.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    // ── Market data ────────────────────────────────────────────────
    pub base_url: String,
    pub quote_asset: String,
    pub http_timeout: Duration,

    // ── Timeframes ─────────────────────────────────────────────────
    pub kline_interval: String,
    pub fast_interval: String,
    pub slow_interval: String,
    pub instant_interval: String,
    pub kline_limit: u32,
    pub fast_kline_limit: u32,
    pub slow_kline_limit: u32,
    pub instant_kline_limit: u32,

    // ── Liquidity / volume ─────────────────────────────────────────
    pub min_24h_volume: f64,
    pub main_volume_window: usize,
    pub fast_volume_window: usize,
    pub main_volume_spike_multiplier: f64,
    pub fast_volume_spike_multiplier: f64,

    // ── Breakout / RSI / EMA ───────────────────────────────────────
    pub breakout_lookback: usize,
    pub rsi_period: usize,
    pub rsi_recent_lookback: usize,
    pub rsi_min_before: f64,
    pub rsi_now_min: f64,
    pub rsi_now_max: f64,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,

    // ── Over-extension guards ──────────────────────────────────────
    pub max_24h_pos_change: f64,
    pub max_24h_neg_change: f64,
    pub max_1h_rsi: f64,
    pub max_trend_extension: f64,

    // ── Net volume ─────────────────────────────────────────────────
    pub net_volume_window_15: usize,
    pub net_volume_window_60: usize,

    // ── Scoring / cadence ──────────────────────────────────────────
    pub min_score: u32,
    pub skip_weak: bool,
    pub scan_interval: Duration,
    pub min_alert_interval: Duration,
    pub scan_concurrency: usize,

    // ── Outputs ────────────────────────────────────────────────────
    pub log_file: PathBuf,
    pub port: u16,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data-api.binance.vision".to_string(),
            quote_asset: "USDT".to_string(),
            http_timeout: Duration::from_secs(10),

            kline_interval: "15m".to_string(),
            fast_interval: "5m".to_string(),
            slow_interval: "1h".to_string(),
            instant_interval: "1m".to_string(),
            kline_limit: 80,
            fast_kline_limit: 40,
            slow_kline_limit: 80,
            instant_kline_limit: 20,

            min_24h_volume: 1_000_000.0,
            main_volume_window: 20,
            fast_volume_window: 10,
            main_volume_spike_multiplier: 3.0,
            fast_volume_spike_multiplier: 2.0,

            breakout_lookback: 20,
            rsi_period: 14,
            rsi_recent_lookback: 20,
            rsi_min_before: 40.0,
            rsi_now_min: 45.0,
            rsi_now_max: 70.0,
            ema_fast_period: 20,
            ema_slow_period: 50,

            max_24h_pos_change: 25.0,
            max_24h_neg_change: -10.0,
            max_1h_rsi: 70.0,
            max_trend_extension: 0.08,

            net_volume_window_15: 4,
            net_volume_window_60: 4,

            min_score: 6,
            skip_weak: true,
            scan_interval: Duration::from_secs(300),
            min_alert_interval: Duration::from_secs(60 * 60),
            scan_concurrency: 8,

            log_file: PathBuf::from("signals_log.csv"),
            port: 8080,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name).map(|v| v.trim().to_lowercase()).as_deref() {
        Ok("1" | "true" | "yes" | "on") => true,
        Ok("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl ScannerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_str("BINANCE_BASE_URL", &d.base_url),
            quote_asset: env_str("QUOTE_ASSET", &d.quote_asset),
            http_timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", d.http_timeout.as_secs())),

            kline_interval: env_str("KLINE_INTERVAL", &d.kline_interval),
            fast_interval: env_str("FAST_INTERVAL", &d.fast_interval),
            slow_interval: env_str("SLOW_INTERVAL", &d.slow_interval),
            instant_interval: env_str("INSTANT_INTERVAL", &d.instant_interval),
            kline_limit: env_parse("KLINE_LIMIT", d.kline_limit),
            fast_kline_limit: env_parse("FAST_KLINE_LIMIT", d.fast_kline_limit),
            slow_kline_limit: env_parse("SLOW_KLINE_LIMIT", d.slow_kline_limit),
            instant_kline_limit: env_parse("INSTANT_KLINE_LIMIT", d.instant_kline_limit),

            min_24h_volume: env_parse("MIN_24H_VOLUME_USDT", d.min_24h_volume),
            main_volume_window: env_parse("MAIN_VOLUME_WINDOW", d.main_volume_window),
            fast_volume_window: env_parse("FAST_VOLUME_WINDOW", d.fast_volume_window),
            main_volume_spike_multiplier: env_parse("MAIN_VOLUME_SPIKE_MULTIPLIER", d.main_volume_spike_multiplier),
            fast_volume_spike_multiplier: env_parse("FAST_VOLUME_SPIKE_MULTIPLIER", d.fast_volume_spike_multiplier),

            breakout_lookback: env_parse("BREAKOUT_LOOKBACK", d.breakout_lookback),
            rsi_period: env_parse("RSI_PERIOD", d.rsi_period),
            rsi_recent_lookback: env_parse("RSI_RECENT_LOOKBACK", d.rsi_recent_lookback),
            rsi_min_before: env_parse("RSI_MIN_BEFORE", d.rsi_min_before),
            rsi_now_min: env_parse("RSI_NOW_MIN", d.rsi_now_min),
            rsi_now_max: env_parse("RSI_NOW_MAX", d.rsi_now_max),
            ema_fast_period: env_parse("EMA_FAST_PERIOD", d.ema_fast_period),
            ema_slow_period: env_parse("EMA_SLOW_PERIOD", d.ema_slow_period),

            max_24h_pos_change: env_parse("MAX_24H_POS_CHANGE", d.max_24h_pos_change),
            max_24h_neg_change: env_parse("MAX_24H_NEG_CHANGE", d.max_24h_neg_change),
            max_1h_rsi: env_parse("MAX_1H_RSI", d.max_1h_rsi),
            max_trend_extension: env_parse("MAX_TREND_EXTENSION", d.max_trend_extension),

            net_volume_window_15: env_parse("NET_VOLUME_WINDOW_15", d.net_volume_window_15),
            net_volume_window_60: env_parse("NET_VOLUME_WINDOW_60", d.net_volume_window_60),

            min_score: env_parse("MIN_SIGNAL_SCORE", d.min_score),
            skip_weak: env_bool("SKIP_WEAK_SIGNALS", d.skip_weak),
            scan_interval: Duration::from_secs(env_parse("SCAN_INTERVAL_SECONDS", d.scan_interval.as_secs())),
            min_alert_interval: Duration::from_secs(
                env_parse("MIN_ALERT_INTERVAL_MINUTES", d.min_alert_interval.as_secs() / 60) * 60,
            ),
            scan_concurrency: env_parse("SCAN_CONCURRENCY", d.scan_concurrency).max(1),

            log_file: PathBuf::from(env_str("SIGNALS_LOG_FILE", &d.log_file.to_string_lossy())),
            port: env_parse("PORT", d.port),
            telegram_token: env_opt("TELEGRAM_TOKEN"),
            telegram_chat_id: env_opt("TELEGRAM_CHAT_ID"),
        }
    }
}
