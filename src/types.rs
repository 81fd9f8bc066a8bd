use serde::{Deserialize, Serialize};

/// One kline. Times are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle { pub open_time: i64, pub open: f64, pub high: f64, pub low: f64, pub close: f64, pub volume: f64, pub close_time: i64 }

impl Candle {
    pub fn is_green(&self) -> bool {
        self.close >= self.open
    }

    /// Volume signed by candle direction.
    pub fn signed_volume(&self) -> f64 {
        if self.is_green() { self.volume } else { -self.volume }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiquiditySnapshot { pub quote_volume_24h: f64, pub price_change_percent_24h: f64 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Side { #[default] BUY }

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self { Self::BUY => "BUY" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade { Weak, Good, Strong, VeryStrong }

impl Grade {
    /// Highest band first. Scores below the evaluator's minimum never get here.
    pub fn from_score(score: u32) -> Self {
        if score >= 9 {
            Self::VeryStrong
        } else if score >= 8 {
            Self::Strong
        } else if score == 7 {
            Self::Good
        } else {
            Self::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryStrong => "Very Strong",
            Self::Strong => "Strong",
            Self::Good => "Good",
            Self::Weak => "Weak",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Condition { pub name: &'static str, pub satisfied: bool, pub weight: u32, pub reason: String }

/// Weighted conditions in reporting order. Built once per evaluation.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet { conditions: Vec<Condition> }

impl ConditionSet {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn score(&self) -> u32 {
        self.conditions.iter().filter(|c| c.satisfied).map(|c| c.weight).sum()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.conditions.iter().filter(|c| c.satisfied).map(|c| c.reason.clone()).collect()
    }

    /// Names of the satisfied conditions, in order.
    pub fn satisfied_names(&self) -> Vec<&'static str> {
        self.conditions.iter().filter(|c| c.satisfied).map(|c| c.name).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub grade: Grade,
    pub score: u32,
    pub quote_volume_24h: f64,
    pub change_24h: f64,
    pub main_spike: f64,
    pub fast_spike: f64,
    pub rsi_now: f64,
    pub rsi_min: f64,
    pub rsi_trend: f64,
    pub trend_extension: f64,
    pub reasons: Vec<String>,
    pub vol_1m: f64,
    pub vol_5m: f64,
    pub vol_15m: f64,
    pub vol_60m: f64,
    pub net_vol_1m: f64,
    pub net_vol_primary: f64,
    pub net_vol_trend: f64,
    pub ping_count: u32,
}

impl Signal {
    /// Symbol with the quote asset suffix stripped.
    pub fn base_asset(&self, quote_asset: &str) -> &str {
        self.symbol.strip_suffix(quote_asset).filter(|b| !b.is_empty()).unwrap_or(&self.symbol)
    }
}
