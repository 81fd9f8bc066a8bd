use crate::config::ScannerConfig;
use crate::types::LiquiditySnapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityCheck {
    pub passes: bool,
    pub quote_volume: f64,
    pub change_percent: f64,
}

/// 24h liquidity and change gate. A change outside the configured window
/// rejects regardless of volume.
pub fn liquidity_and_change(snapshot: &LiquiditySnapshot, config: &ScannerConfig) -> LiquidityCheck {
    let quote_volume = snapshot.quote_volume_24h;
    let change_percent = snapshot.price_change_percent_24h;
    let enough = quote_volume >= config.min_24h_volume;
    let change_ok = change_percent <= config.max_24h_pos_change && change_percent >= config.max_24h_neg_change;

    LiquidityCheck {
        passes: enough && change_ok,
        quote_volume,
        change_percent,
    }
}
