//! Pure indicator functions over chronologically ordered series.
//!
//! Short inputs never fail: each function has a documented fallback value.

use crate::types::Candle;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Exponential moving average seeded with the simple mean of the first
/// `period` values. Fewer than `period` values yields their plain mean.
pub fn ema(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return mean(values);
    }
    let k = 2.0 / (period as f64 + 1.0);
    values[period..]
        .iter()
        .fold(mean(&values[..period]), |ema, &v| v * k + ema * (1.0 - k))
}

/// RSI over the most recent `period` deltas using plain means of gains and
/// losses (no Wilder smoothing).
///
/// Returns 50.0 when there are not enough values and 70.0 when the window has
/// no losses.
pub fn rsi(values: &[f64], period: usize) -> f64 {
    if values.len() <= period {
        return 50.0;
    }

    let mut gains = Vec::with_capacity(period);
    let mut losses = Vec::with_capacity(period);
    for pair in values[values.len() - period - 1..].windows(2) {
        let diff = pair[1] - pair[0];
        if diff >= 0.0 {
            gains.push(diff);
        } else {
            losses.push(-diff);
        }
    }

    let avg_gain = mean(&gains);
    let avg_loss = mean(&losses);
    if avg_loss == 0.0 {
        return 70.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Lowest RSI seen on the series with the last `i` closes dropped, for
/// `i` in `1..=lookback + 1`. Each truncation is recomputed from scratch.
pub fn rsi_min_before(closes: &[f64], period: usize, lookback: usize) -> Option<f64> {
    (1..=lookback + 1)
        .filter(|&i| closes.len() > period + i)
        .map(|i| rsi(&closes[..closes.len() - i], period))
        .reduce(f64::min)
}

/// Latest volume relative to the mean of the `window` volumes before it.
pub fn volume_spike(volumes: &[f64], window: usize) -> f64 {
    if volumes.len() <= window {
        return 0.0;
    }
    let last = volumes[volumes.len() - 1];
    let prev = mean(&volumes[volumes.len() - window - 1..volumes.len() - 1]);
    if prev == 0.0 {
        return 0.0;
    }
    last / prev
}

/// Latest close above the highest high of the `lookback` candles before it.
pub fn is_breakout(highs: &[f64], closes: &[f64], lookback: usize) -> bool {
    if highs.len() < lookback + 2 || closes.is_empty() {
        return false;
    }
    let last_close = closes[closes.len() - 1];
    let prev_high = highs[highs.len() - lookback - 1..highs.len() - 1]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    last_close > prev_high
}

/// Blend of body-to-range and close-position-in-range, in `[0, 1]`.
pub fn bull_strength(open: f64, high: f64, low: f64, close: f64) -> f64 {
    if high == low {
        return 0.5;
    }
    let range = high - low;
    let body_ratio = (close - open).abs() / range;
    let close_ratio = (close - low) / range;
    (body_ratio + close_ratio) / 2.0
}

/// Green volume minus red volume over the last `window` candles.
pub fn net_volume(candles: &[Candle], window: usize) -> f64 {
    let window = window.min(candles.len());
    candles[candles.len() - window..]
        .iter()
        .map(Candle::signed_volume)
        .sum()
}

/// Number of rising closes among the last `lookback` close-to-close steps.
pub fn small_uptrend_score(closes: &[f64], lookback: usize) -> u32 {
    if closes.len() < lookback + 1 {
        return 0;
    }
    closes[closes.len() - lookback - 1..]
        .windows(2)
        .filter(|pair| pair[1] > pair[0])
        .count() as u32
}
