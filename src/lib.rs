pub mod analyzer;
pub mod candle_series;
pub mod config;
pub mod indicator;
pub mod model;
pub mod scanner;
pub mod signal;
pub mod signal_builder;
pub mod strategy;
pub mod supply;

/// 설정 로더
pub mod config_loader;

pub use candle_series::{CandleSeries, MarketSnapshot, SeriesError};
pub use config::EngineConfig;
pub use model::{Candle, Side, Strength, Timeframe};
pub use scanner::{Evaluation, ScanError, ScanReport, Scanner, SymbolOutcome};
pub use signal::{Evidence, Signal, SignalScope};
pub use signal_builder::{SignalRecordBuilder, SkipReason};
pub use strategy::{SignalStrategy, StrategyFactory, StrategyType};
