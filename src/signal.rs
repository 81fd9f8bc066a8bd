use crate::config::ScannerConfig;
use crate::error::{ScanError, ScanResult};
use crate::filter::{liquidity_and_change, LiquidityCheck};
use crate::indicators::{
    bull_strength, ema, is_breakout, net_volume, rsi, rsi_min_before, small_uptrend_score,
    volume_spike,
};
use crate::types::{Candle, Condition, ConditionSet, Grade, LiquiditySnapshot, Side, Signal};
use std::sync::Arc;
use tracing::debug;

const UPTREND_LOOKBACK: usize = 5;
const UPTREND_MIN_GREEN: u32 = 3;
const BULL_STRENGTH_MIN: f64 = 0.6;

/// Everything fetched for one symbol in one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct MarketFrames {
    pub ticker: LiquiditySnapshot,
    pub primary: Vec<Candle>,
    pub fast: Vec<Candle>,
    pub trend: Vec<Candle>,
    pub instant: Vec<Candle>,
}

/// Scores one symbol's frames against the configured condition set.
#[derive(Clone)]
pub struct SignalEvaluator {
    config: Arc<ScannerConfig>,
}

impl SignalEvaluator {
    pub fn new(config: Arc<ScannerConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn check_liquidity(&self, ticker: &LiquiditySnapshot) -> LiquidityCheck {
        liquidity_and_change(ticker, &self.config)
    }

    /// Runs every gate in order. `Ok(None)` is a clean reject; `Err` means the
    /// frames themselves were unusable.
    pub fn evaluate(&self, symbol: &str, frames: &MarketFrames) -> ScanResult<Option<Signal>> {
        let c = &*self.config;

        let liquidity = self.check_liquidity(&frames.ticker);
        if !liquidity.passes {
            debug!(
                "[Evaluator] {} rejected by liquidity (qv {:.0}, change {:.2}%)",
                symbol, liquidity.quote_volume, liquidity.change_percent
            );
            return Ok(None);
        }

        let primary_last = validate_series(&frames.primary, &c.kline_interval)?;
        let fast_last = validate_series(&frames.fast, &c.fast_interval)?;
        let trend_last = validate_series(&frames.trend, &c.slow_interval)?;
        if !frames.instant.is_empty() {
            validate_series(&frames.instant, &c.instant_interval)?;
        }

        // ── Primary timeframe ──────────────────────────────────────
        let closes: Vec<f64> = frames.primary.iter().map(|k| k.close).collect();
        let highs: Vec<f64> = frames.primary.iter().map(|k| k.high).collect();
        let vols_primary: Vec<f64> = frames.primary.iter().map(|k| k.volume).collect();

        let main_spike = volume_spike(&vols_primary, c.main_volume_window);
        let breakout = is_breakout(&highs, &closes, c.breakout_lookback);

        let rsi_now = rsi(&closes, c.rsi_period);
        let rsi_min = rsi_min_before(&closes, c.rsi_period, c.rsi_recent_lookback).unwrap_or(rsi_now);
        let rsi_rebound =
            rsi_min <= c.rsi_min_before && (c.rsi_now_min..=c.rsi_now_max).contains(&rsi_now);

        let up_score = small_uptrend_score(&closes, UPTREND_LOOKBACK);

        // ── Fast confirmation ──────────────────────────────────────
        let vols_fast: Vec<f64> = frames.fast.iter().map(|k| k.volume).collect();
        let fast_spike = volume_spike(&vols_fast, c.fast_volume_window);
        let bull = bull_strength(fast_last.open, fast_last.high, fast_last.low, fast_last.close);
        let bullish_candle = fast_last.close > fast_last.open && bull >= BULL_STRENGTH_MIN;

        // ── Trend timeframe ────────────────────────────────────────
        let closes_trend: Vec<f64> = frames.trend.iter().map(|k| k.close).collect();
        let ema_fast = ema(&closes_trend, c.ema_fast_period);
        let ema_slow = ema(&closes_trend, c.ema_slow_period);
        let uptrend = ema_fast > ema_slow && trend_last.close > ema_fast;
        let rsi_trend = rsi(&closes_trend, c.rsi_period);
        let extension = if ema_slow != 0.0 { (trend_last.close - ema_slow) / ema_slow } else { 0.0 };

        // ── Net volume ─────────────────────────────────────────────
        let net_vol_primary = net_volume(&frames.primary, c.net_volume_window_15);
        let net_vol_trend = net_volume(&frames.trend, c.net_volume_window_60);
        let (vol_1m, net_vol_1m) = frames
            .instant
            .last()
            .map(|k| (k.volume, k.signed_volume()))
            .unwrap_or((0.0, 0.0));

        let conditions = ConditionSet::new(vec![
            Condition {
                name: "main_spike",
                satisfied: main_spike >= c.main_volume_spike_multiplier,
                weight: 2,
                reason: format!("Main 15m spike x{:.2}", main_spike),
            },
            Condition { name: "breakout", satisfied: breakout, weight: 2, reason: "Breakout 15m".to_string() },
            Condition {
                name: "rsi_rebound",
                satisfied: rsi_rebound,
                weight: 1,
                reason: format!("RSI rebound (min {:.1} → {:.1})", rsi_min, rsi_now),
            },
            Condition {
                name: "fast_spike",
                satisfied: fast_spike >= c.fast_volume_spike_multiplier,
                weight: 1,
                reason: format!("Fast 5m spike x{:.2}", fast_spike),
            },
            Condition {
                name: "bullish_candle",
                satisfied: bullish_candle,
                weight: 1,
                reason: format!("Strong 5m bullish candle (strength {:.2})", bull),
            },
            Condition {
                name: "short_uptrend",
                satisfied: up_score >= UPTREND_MIN_GREEN,
                weight: 1,
                reason: format!("Short-term uptrend: {}/{} last candles green", up_score, UPTREND_LOOKBACK),
            },
            Condition {
                name: "trend_up",
                satisfied: uptrend,
                weight: 2,
                reason: "1h uptrend (EMA20 > EMA50 & price above EMA20)".to_string(),
            },
            Condition {
                name: "net_volume_primary",
                satisfied: net_vol_primary > 0.0,
                weight: 1,
                reason: format!("Net volume 15m window positive ({:.0})", net_vol_primary),
            },
            Condition {
                name: "net_volume_trend",
                satisfied: net_vol_trend > 0.0,
                weight: 1,
                reason: format!("Net volume 60m window positive ({:.0})", net_vol_trend),
            },
        ]);
        let score = conditions.score();
        debug!("[Evaluator] {} score {} from {:?}", symbol, score, conditions.satisfied_names());

        // Hard gates apply regardless of score.
        if rsi_trend > c.max_1h_rsi {
            debug!("[Evaluator] {} rejected: trend RSI {:.1} > {:.1}", symbol, rsi_trend, c.max_1h_rsi);
            return Ok(None);
        }
        if extension > c.max_trend_extension {
            debug!("[Evaluator] {} rejected: extension {:.4} > {:.4}", symbol, extension, c.max_trend_extension);
            return Ok(None);
        }
        if net_vol_primary <= 0.0 || net_vol_trend <= 0.0 {
            debug!(
                "[Evaluator] {} rejected: net volume {:.0} / {:.0} not positive",
                symbol, net_vol_primary, net_vol_trend
            );
            return Ok(None);
        }
        if score < c.min_score {
            debug!("[Evaluator] {} rejected: score {} < {}", symbol, score, c.min_score);
            return Ok(None);
        }

        Ok(Some(Signal {
            symbol: symbol.to_string(),
            side: Side::BUY,
            price: primary_last.close,
            grade: Grade::from_score(score),
            score,
            quote_volume_24h: liquidity.quote_volume,
            change_24h: liquidity.change_percent,
            main_spike,
            fast_spike,
            rsi_now,
            rsi_min,
            rsi_trend,
            trend_extension: extension,
            reasons: conditions.reasons(),
            vol_1m,
            vol_5m: fast_last.volume,
            vol_15m: primary_last.volume,
            vol_60m: trend_last.volume,
            net_vol_1m,
            net_vol_primary,
            net_vol_trend,
            ping_count: 0,
        }))
    }
}

/// Non-empty with strictly increasing open times. Returns the latest candle.
fn validate_series<'a>(candles: &'a [Candle], interval: &str) -> ScanResult<&'a Candle> {
    if let Some(index) = candles
        .windows(2)
        .position(|pair| pair[1].open_time <= pair[0].open_time)
    {
        return Err(ScanError::UnorderedSeries { interval: interval.to_string(), index: index + 1 });
    }
    candles.last().ok_or_else(|| ScanError::EmptySeries { interval: interval.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60_000;

    fn series(step_ms: i64, rows: &[(f64, f64, f64, f64, f64)]) -> Vec<Candle> {
        rows.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close, volume))| Candle {
                open_time: i as i64 * step_ms,
                open,
                high,
                low,
                close,
                volume,
                close_time: (i as i64 + 1) * step_ms - 1,
            })
            .collect()
    }

    /// 80 rising 15m candles, last one on 4x volume above the prior highs.
    fn primary() -> Vec<Candle> {
        let rows: Vec<_> = (0..80)
            .map(|i| {
                let close = 100.0 + i as f64;
                let open = close - 0.5;
                let volume = if i == 79 { 4000.0 } else { 1000.0 };
                (open, close + 0.2, open - 0.2, close, volume)
            })
            .collect();
        series(15 * MIN, &rows)
    }

    /// Flat volume and a red last candle: no fast-timeframe points.
    fn fast() -> Vec<Candle> {
        let rows: Vec<_> = (0..40)
            .map(|i| {
                let base = 170.0 + i as f64 * 0.25;
                if i == 39 {
                    (base + 0.5, base + 0.6, base - 0.1, base, 1000.0)
                } else {
                    (base, base + 0.3, base - 0.1, base + 0.2, 1000.0)
                }
            })
            .collect();
        series(5 * MIN, &rows)
    }

    /// Steady 1h climb: EMA20 above EMA50, no losses (RSI pinned at 70).
    fn trend() -> Vec<Candle> {
        let rows: Vec<_> = (0..80)
            .map(|i| {
                let close = 1000.0 + i as f64;
                (close - 0.5, close + 0.5, close - 1.0, close, 1000.0)
            })
            .collect();
        series(60 * MIN, &rows)
    }

    fn instant() -> Vec<Candle> {
        let rows: Vec<_> = (0..20).map(|_| (10.0, 11.0, 9.0, 10.5, 250.0)).collect();
        series(MIN, &rows)
    }

    fn frames() -> MarketFrames {
        MarketFrames {
            ticker: LiquiditySnapshot { quote_volume_24h: 5_000_000.0, price_change_percent_24h: 3.0 },
            primary: primary(),
            fast: fast(),
            trend: trend(),
            instant: instant(),
        }
    }

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(Arc::new(ScannerConfig::default()))
    }

    #[test]
    fn spike_and_breakout_grade_very_strong() {
        let signal = evaluator().evaluate("SOLUSDT", &frames()).unwrap().expect("signal");

        assert_eq!(signal.score, 9);
        assert_eq!(signal.grade, Grade::VeryStrong);
        assert_eq!(signal.price, 179.0);
        assert_eq!(signal.main_spike, 4.0);
        assert!(signal.reasons.iter().any(|r| r.starts_with("Main 15m spike")));
        assert!(signal.reasons.iter().any(|r| r == "Breakout 15m"));
        assert_eq!(signal.reasons[0], "Main 15m spike x4.00");
        assert_eq!(signal.reasons[1], "Breakout 15m");
        assert!(signal.reasons.iter().all(|r| !r.starts_with("RSI rebound")));
        assert_eq!(signal.rsi_trend, 70.0);
        assert_eq!(signal.vol_1m, 250.0);
        assert_eq!(signal.net_vol_1m, 250.0);
        assert_eq!(signal.vol_15m, 4000.0);
        assert_eq!(signal.net_vol_primary, 7000.0);
        assert_eq!(signal.net_vol_trend, 4000.0);
        assert_eq!(signal.ping_count, 0);
    }

    #[test]
    fn overbought_trend_rsi_rejects() {
        // 13 steps of +3 and one of -1 in the last 14 deltas: RSI = 75
        let rows: Vec<_> = (0..80)
            .scan(1000.0, |close, i| {
                *close += if i == 75 { -1.0 } else { 3.0 };
                let c = *close;
                Some((c - 0.5, c + 0.5, c - 1.0, c, 1000.0))
            })
            .collect();
        let mut f = frames();
        f.trend = series(60 * MIN, &rows);

        let closes: Vec<f64> = f.trend.iter().map(|k| k.close).collect();
        assert!((rsi(&closes, 14) - 75.0).abs() < 1e-9);
        assert!(evaluator().evaluate("SOLUSDT", &f).unwrap().is_none());
    }

    #[test]
    fn flat_trend_net_volume_rejects() {
        let mut f = frames();
        let n = f.trend.len();
        // two green and two red candles of equal size
        for (offset, k) in f.trend[n - 4..].iter_mut().enumerate() {
            if offset % 2 == 1 {
                k.open = k.close + 0.5;
            }
        }
        assert_eq!(net_volume(&f.trend, 4), 0.0);
        assert!(evaluator().evaluate("SOLUSDT", &f).unwrap().is_none());
    }

    #[test]
    fn over_extension_rejects() {
        let mut f = frames();
        if let Some(last) = f.trend.last_mut() {
            last.close = 1300.0;
            last.high = 1301.0;
        }
        assert!(evaluator().evaluate("SOLUSDT", &f).unwrap().is_none());
    }

    #[test]
    fn low_score_rejects() {
        let mut f = frames();
        // kill spike and breakout: score drops to 5
        let n = f.primary.len();
        f.primary[n - 1].volume = 1000.0;
        f.primary[n - 1].close = f.primary[n - 2].close;
        f.primary[n - 1].open = f.primary[n - 1].close - 0.5;
        assert!(evaluator().evaluate("SOLUSDT", &f).unwrap().is_none());
    }

    #[test]
    fn liquidity_reject_skips_everything() {
        let mut f = frames();
        f.ticker.price_change_percent_24h = 40.0;
        f.primary.clear();
        assert!(evaluator().evaluate("SOLUSDT", &f).unwrap().is_none());
    }

    #[test]
    fn malformed_series_is_an_error() {
        let mut f = frames();
        f.fast.clear();
        assert!(matches!(
            evaluator().evaluate("SOLUSDT", &f),
            Err(ScanError::EmptySeries { .. })
        ));

        let mut f = frames();
        f.primary[10].open_time = f.primary[9].open_time;
        assert!(matches!(
            evaluator().evaluate("SOLUSDT", &f),
            Err(ScanError::UnorderedSeries { index: 10, .. })
        ));
    }

    #[test]
    fn missing_instant_series_zeroes_readings() {
        let mut f = frames();
        f.instant.clear();
        let signal = evaluator().evaluate("SOLUSDT", &f).unwrap().expect("signal");
        assert_eq!(signal.vol_1m, 0.0);
        assert_eq!(signal.net_vol_1m, 0.0);
    }

    /// Rise, a 14-candle sell-off, then a steady recovery to a new high.
    fn dip_and_recover() -> Vec<Candle> {
        let rows: Vec<_> = (0..80)
            .map(|i| {
                let close = match i {
                    0..=44 => 100.0 + i as f64,
                    45..=58 => 144.0 - 2.0 * (i - 44) as f64,
                    _ => 116.0 + (i - 58) as f64,
                };
                let open = close - 0.5;
                let volume = if i == 79 { 4000.0 } else { 1000.0 };
                (open, close + 0.2, open - 0.2, close, volume)
            })
            .collect();
        series(15 * MIN, &rows)
    }

    /// Last 5m candle on 5x volume, closing near its high.
    fn fast_spike() -> Vec<Candle> {
        let mut candles = fast();
        if let Some(last) = candles.last_mut() {
            let base = last.close;
            last.open = base;
            last.high = base + 1.05;
            last.low = base - 0.05;
            last.close = base + 1.0;
            last.volume = 5000.0;
        }
        candles
    }

    /// Last 15m candle closes level with the previous one: no breakout,
    /// spike and 4/5 up-closes kept.
    fn without_breakout(f: &mut MarketFrames) {
        let n = f.primary.len();
        let close = f.primary[n - 2].close;
        let last = &mut f.primary[n - 1];
        last.close = close;
        last.open = close - 0.5;
        last.high = close + 0.2;
        last.low = last.open - 0.2;
    }

    #[test]
    fn every_condition_reports_in_order() {
        let mut f = frames();
        f.primary = dip_and_recover();
        f.fast = fast_spike();

        let signal = evaluator().evaluate("SOLUSDT", &f).unwrap().expect("signal");

        assert_eq!(signal.score, 12);
        assert_eq!(signal.grade, Grade::VeryStrong);
        assert_eq!(signal.price, 137.0);
        assert_eq!(signal.rsi_min, 0.0);
        assert_eq!(signal.rsi_now, 70.0);
        assert_eq!(signal.fast_spike, 5.0);
        assert_eq!(
            signal.reasons,
            vec![
                "Main 15m spike x4.00",
                "Breakout 15m",
                "RSI rebound (min 0.0 → 70.0)",
                "Fast 5m spike x5.00",
                "Strong 5m bullish candle (strength 0.93)",
                "Short-term uptrend: 5/5 last candles green",
                "1h uptrend (EMA20 > EMA50 & price above EMA20)",
                "Net volume 15m window positive (7000)",
                "Net volume 60m window positive (4000)",
            ]
        );
    }

    #[test]
    fn rsi_rebound_needs_current_rsi_in_band() {
        let mut f = frames();
        f.primary = dip_and_recover();
        // a drop of 7 inside the last 14 deltas pulls current RSI near 19
        let n = f.primary.len();
        f.primary[n - 8].close -= 8.0;
        f.primary[n - 8].open = f.primary[n - 8].close - 0.5;

        let signal = evaluator().evaluate("SOLUSDT", &f).unwrap().expect("signal");
        assert_eq!(signal.rsi_min, 0.0);
        assert!(signal.rsi_now < 45.0);
        assert_eq!(signal.score, 9);
        assert!(signal.reasons.iter().all(|r| !r.starts_with("RSI rebound")));
    }

    #[test]
    fn score_seven_grades_good() {
        let mut f = frames();
        without_breakout(&mut f);

        let signal = evaluator().evaluate("SOLUSDT", &f).unwrap().expect("signal");
        assert_eq!(signal.score, 7);
        assert_eq!(signal.grade, Grade::Good);
        assert_eq!(
            signal.reasons,
            vec![
                "Main 15m spike x4.00",
                "Short-term uptrend: 4/5 last candles green",
                "1h uptrend (EMA20 > EMA50 & price above EMA20)",
                "Net volume 15m window positive (7000)",
                "Net volume 60m window positive (4000)",
            ]
        );
    }

    #[test]
    fn score_eight_grades_strong() {
        let mut f = frames();
        without_breakout(&mut f);
        // spike on a red candle: volume point only
        if let Some(last) = f.fast.last_mut() {
            last.volume = 5000.0;
        }

        let signal = evaluator().evaluate("SOLUSDT", &f).unwrap().expect("signal");
        assert_eq!(signal.score, 8);
        assert_eq!(signal.grade, Grade::Strong);
        assert_eq!(signal.reasons[1], "Fast 5m spike x5.00");
        assert!(signal.reasons.iter().all(|r| !r.starts_with("Strong 5m bullish")));
    }
}
