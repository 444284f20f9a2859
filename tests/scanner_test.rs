use common_test_utils::*;

use chrono::Utc;
use signal_engine::analyzer::volume_analyzer::VolumeSource;
use signal_engine::config::EngineConfig;
use signal_engine::model::{Side, Timeframe};
use signal_engine::scanner::{Scanner, SymbolOutcome};
use signal_engine::signal::SignalScope;
use signal_engine::signal_builder::SkipReason;
use signal_engine::strategy::{StrategyFactory, StrategyType};
use signal_engine::supply::{
    CandleSupplier, InMemorySupplier, RankedSuppliers, StaticSymbols, SupplyError,
};
use signal_engine::candle_series::CandleSeries;

struct BrokenSupplier;

impl CandleSupplier for BrokenSupplier {
    fn name(&self) -> &str {
        "broken"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _limit: usize,
    ) -> Result<Option<CandleSeries>, SupplyError> {
        if symbol == "BADUSDT" {
            Err(SupplyError::Io("connection reset".to_string()))
        } else {
            Ok(None)
        }
    }
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.volume.source = VolumeSource::Volume;
    config.strategy.timeframes = vec![Timeframe::Day1];
    config.scan.workers = 3;
    config
}

fn supplier() -> InMemorySupplier {
    InMemorySupplier::new()
        .with(linear_series("UPUSDT", Timeframe::Day1, 200, 100.0, 200.0, 5000.0, 15_000.0))
        .with(linear_series("DOWNUSDT", Timeframe::Day1, 200, 200.0, 100.0, 5000.0, 15_000.0))
        .with(constant_series("FLATUSDT", Timeframe::Day1, 200, 100.0, 5000.0))
        .with(linear_series("THINUSDT", Timeframe::Day1, 200, 100.0, 200.0, 10.0, 30.0))
        .with_funding("UPUSDT", 0.0003)
}

#[test]
fn test_scan_report_outcomes() {
    let config = config();
    let strategy = StrategyFactory::build(StrategyType::TrendVolume, &config);
    let ranked = RankedSuppliers::new()
        .push(Box::new(BrokenSupplier))
        .push(Box::new(supplier()));
    let scanner = Scanner::new(&config, strategy.as_ref(), &ranked);

    let symbols = StaticSymbols(
        ["UPUSDT", "BADUSDT", "FLATUSDT", "DOWNUSDT", "THINUSDT"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    let report = scanner.scan_source(&symbols, Utc::now()).unwrap();

    let order: Vec<&str> = report.evaluations.iter().map(|e| e.symbol.as_str()).collect();
    assert_eq!(order, vec!["BADUSDT", "DOWNUSDT", "FLATUSDT", "THINUSDT", "UPUSDT"]);

    let signals: Vec<(&str, Side)> = report
        .signals()
        .map(|s| (s.symbol.as_str(), s.side))
        .collect();
    assert_eq!(signals, vec![("DOWNUSDT", Side::Sell), ("UPUSDT", Side::Buy)]);

    let up = report.signals().find(|s| s.symbol == "UPUSDT").unwrap();
    assert_eq!(up.evidence.funding_rate, Some(0.0003));

    let skips = report.skip_counts();
    assert_eq!(skips.get(&SkipReason::NoVolumeEvidence), Some(&1));
    assert_eq!(skips.get(&SkipReason::LowLiquidity), Some(&1));

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "BADUSDT");
    assert!(failures[0].1.contains("connection reset"));
}

#[test]
fn test_parallel_and_sequential_agree() {
    let config = config();
    let strategy = StrategyFactory::build(StrategyType::TrendVolume, &config);
    let supplier = supplier();
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);
    let symbols: Vec<String> = ["UPUSDT", "DOWNUSDT", "FLATUSDT"]
        .into_iter()
        .map(String::from)
        .collect();
    let as_of = Utc::now();

    let report = scanner.scan(&symbols, as_of).unwrap();
    let mut parallel: Vec<_> = report.signals().cloned().collect();
    let mut sequential: Vec<_> = scanner.signals(&symbols, as_of).collect();
    parallel.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    sequential.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    assert_eq!(parallel, sequential);
}

#[test]
fn test_cancel_stops_requesting_symbols() {
    let config = config();
    let strategy = StrategyFactory::build(StrategyType::TrendVolume, &config);
    let supplier = supplier();
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);
    let symbols = vec!["UPUSDT".to_string(), "DOWNUSDT".to_string()];

    let cancel = scanner.cancel_handle();
    let mut signals = scanner.signals(&symbols, Utc::now());
    assert!(signals.next().is_some());
    cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    assert!(signals.next().is_none());
}

#[test]
fn test_unknown_symbol_is_missing_timeframe() {
    let config = config();
    let strategy = StrategyFactory::build(StrategyType::TrendVolume, &config);
    let supplier = supplier();
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);

    let evaluations = scanner.evaluate_symbol("NONEUSDT", Utc::now());
    assert_eq!(evaluations.len(), 1);
    assert_eq!(
        evaluations[0].outcome,
        SymbolOutcome::Skipped(SkipReason::MissingTimeframe)
    );
}

/// 1h 요청만 시간 초과로 실패하는 공급자
struct HourlyTimeoutSupplier(InMemorySupplier);

impl CandleSupplier for HourlyTimeoutSupplier {
    fn name(&self) -> &str {
        "hourly-timeout"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Option<CandleSeries>, SupplyError> {
        if timeframe == Timeframe::Hour1 {
            Err(SupplyError::Io("timeout".to_string()))
        } else {
            self.0.fetch_candles(symbol, timeframe, limit)
        }
    }
}

#[test]
fn test_optional_timeframe_error_keeps_structure_signal() {
    let mut config = config();
    config.filters.min_turnover = None;
    config.strategy.strategy_type = StrategyType::StructureVolume;
    let strategy = StrategyFactory::from_config(&config);
    let supplier = HourlyTimeoutSupplier(
        InMemorySupplier::new().with(bearish_base_breakout_series(Timeframe::Hour4, 105.0, 5000.0)),
    );
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);

    let report = scanner.scan(&["TESTUSDT".to_string()], Utc::now()).unwrap();
    assert!(report.failures().is_empty());
    let signals: Vec<Side> = report.signals().map(|s| s.side).collect();
    assert_eq!(signals, vec![Side::Buy]);
}

#[test]
fn test_timeframe_error_fails_only_its_scope() {
    let mut config = config();
    config.filters.min_turnover = None;
    config.strategy.timeframes = vec![Timeframe::Day1, Timeframe::Hour1];
    let strategy = StrategyFactory::build(StrategyType::TrendVolume, &config);
    let supplier = HourlyTimeoutSupplier(supplier());
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);

    let evaluations = scanner.evaluate_symbol("UPUSDT", Utc::now());
    assert_eq!(evaluations.len(), 2);
    let outcome = |scope| {
        evaluations
            .iter()
            .find(|e| e.scope == scope)
            .map(|e| e.outcome.clone())
            .unwrap()
    };
    assert!(matches!(
        outcome(SignalScope::Timeframe(Timeframe::Day1)),
        SymbolOutcome::Signal(signal) if signal.side == Side::Buy
    ));
    match outcome(SignalScope::Timeframe(Timeframe::Hour1)) {
        SymbolOutcome::Failed(message) => assert!(message.contains("timeout")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_breadth_fails_when_any_timeframe_errors() {
    let mut config = config();
    config.strategy.timeframes = vec![Timeframe::Day1, Timeframe::Hour4, Timeframe::Hour1];
    let strategy = StrategyFactory::build(StrategyType::TrendMomentum, &config);
    let supplier = HourlyTimeoutSupplier(
        InMemorySupplier::new()
            .with(linear_series("UPUSDT", Timeframe::Day1, 200, 100.0, 200.0, 5000.0, 5000.0))
            .with(linear_series("UPUSDT", Timeframe::Hour4, 200, 100.0, 200.0, 5000.0, 5000.0)),
    );
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);

    let report = scanner.scan(&["UPUSDT".to_string()], Utc::now()).unwrap();
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].1.contains("1h"));
    assert!(failures[0].1.contains("timeout"));
}
