pub mod binance;
pub mod config;
pub mod deduplication;
pub mod error;
pub mod filter;
pub mod indicators;
pub mod journal;
pub mod scanner;
pub mod signal;
pub mod telegram;
pub mod types;

// Re-export for tests
pub use scanner::MarketScanner;
