use crate::candle_series::MarketSnapshot;
use crate::config::EngineConfig;
use crate::model::Timeframe;
use crate::signal::{Signal, SignalScope};
use crate::signal_builder::{SignalRecordBuilder, SkipReason};
use crate::strategy::SignalStrategy;
use crate::supply::{CandleSupplier, SupplyError, SymbolSource};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 심볼/범위 하나의 평가 결과
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Signal(Signal),
    Skipped(SkipReason),
    /// 공급 오류 등 예상하지 못한 실패 (메시지 보존)
    Failed(String),
}

/// 평가 기록
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub symbol: String,
    pub scope: SignalScope,
    pub outcome: SymbolOutcome,
}

/// 스캔 오류
#[derive(Debug)]
pub enum ScanError {
    /// 작업자 풀 생성 실패
    ThreadPool(String),
    /// 심볼 목록 조회 실패
    Symbols(SupplyError),
}

impl Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::ThreadPool(msg) => write!(f, "작업자 풀 생성 실패: {}", msg),
            ScanError::Symbols(e) => write!(f, "심볼 목록 조회 실패: {}", e),
        }
    }
}

impl std::error::Error for ScanError {}

/// 스캔 결과 (심볼, 범위 순으로 정렬됨)
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub evaluations: Vec<Evaluation>,
    /// 취소로 일부 심볼을 평가하지 않았는지 여부
    pub cancelled: bool,
}

impl ScanReport {
    /// 생성된 신호
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.evaluations.iter().filter_map(|e| match &e.outcome {
            SymbolOutcome::Signal(signal) => Some(signal),
            _ => None,
        })
    }

    /// 건너뛴 이유별 개수
    pub fn skip_counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for evaluation in &self.evaluations {
            if let SymbolOutcome::Skipped(reason) = evaluation.outcome {
                *counts.entry(reason).or_insert(0) += 1;
            }
        }
        counts
    }

    /// 실패한 심볼과 메시지
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.evaluations
            .iter()
            .filter_map(|e| match &e.outcome {
                SymbolOutcome::Failed(msg) => Some((e.symbol.as_str(), msg.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let skipped: Vec<String> = self
            .skip_counts()
            .iter()
            .map(|(reason, count)| format!("{reason}={count}"))
            .collect();
        write!(
            f,
            "평가 {}건 | 신호 {}건 | 실패 {}건 | 건너뜀: {}",
            self.evaluations.len(),
            self.signals().count(),
            self.failures().len(),
            if skipped.is_empty() { "-".to_string() } else { skipped.join(", ") }
        )?;
        if self.cancelled {
            write!(f, " (취소됨)")?;
        }
        Ok(())
    }
}

/// 심볼 스캐너
///
/// 심볼마다 필요한 타임프레임을 공급자에게서 받아 전략으로 평가합니다.
/// 심볼 평가는 서로 독립적이므로 고정 크기 작업자 풀에서 병렬로 실행합니다.
pub struct Scanner<'a> {
    config: &'a EngineConfig,
    strategy: &'a dyn SignalStrategy,
    supplier: &'a dyn CandleSupplier,
    cancel: Arc<AtomicBool>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        config: &'a EngineConfig,
        strategy: &'a dyn SignalStrategy,
        supplier: &'a dyn CandleSupplier,
    ) -> Self {
        Scanner {
            config,
            strategy,
            supplier,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 외부에서 만든 취소 플래그 사용
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// 취소 플래그 (true 로 바꾸면 이후 심볼을 요청하지 않음)
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// 심볼 하나의 모든 범위 평가
    ///
    /// 타임프레임 조회 오류는 해당 타임프레임만 빼고 계속 진행합니다.
    /// 범위가 반드시 필요로 하는 타임프레임이 실패한 경우에만 `Failed` 로 기록합니다.
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `as_of` - 분석 시각
    ///
    /// # Returns
    /// * `Vec<Evaluation>` - 전략 범위마다 하나씩
    pub fn evaluate_symbol(&self, symbol: &str, as_of: DateTime<Utc>) -> Vec<Evaluation> {
        let (snapshot, errors) = self.load_snapshot(symbol);
        let funding_rate = self.supplier.funding_rate(symbol);
        let builder = SignalRecordBuilder::new(&self.config.filters);

        self.strategy
            .scopes()
            .into_iter()
            .map(|scope| {
                let failure = self
                    .strategy
                    .required_timeframes(scope)
                    .into_iter()
                    .find_map(|timeframe| {
                        errors
                            .get(&timeframe)
                            .map(|e| format!("{} {}", timeframe, e))
                    });

                let outcome = match failure {
                    Some(message) => SymbolOutcome::Failed(message),
                    None => match builder.build(self.strategy, scope, &snapshot, as_of, funding_rate) {
                        Ok(signal) => SymbolOutcome::Signal(signal),
                        Err(reason) => {
                            debug!("{} {} 건너뜀: {}", symbol, scope, reason);
                            SymbolOutcome::Skipped(reason)
                        }
                    },
                };
                Evaluation {
                    symbol: symbol.to_string(),
                    scope,
                    outcome,
                }
            })
            .collect()
    }

    /// 전략이 요구하는 타임프레임을 모두 조회
    ///
    /// 없는 타임프레임과 조회에 실패한 타임프레임은 빠진 채로 두고,
    /// 실패한 타임프레임의 오류는 따로 돌려줍니다.
    fn load_snapshot(&self, symbol: &str) -> (MarketSnapshot, BTreeMap<Timeframe, SupplyError>) {
        let mut snapshot = MarketSnapshot::new(symbol);
        let mut errors = BTreeMap::new();
        for timeframe in self.strategy.timeframes() {
            match self
                .supplier
                .fetch_candles(symbol, timeframe, self.config.scan.candle_limit)
            {
                Ok(Some(series)) => snapshot.insert(series),
                Ok(None) => debug!("{} {} 캔들 없음", symbol, timeframe),
                Err(e) => {
                    warn!("{} {} 캔들 조회 실패: {}", symbol, timeframe, e);
                    errors.insert(timeframe, e);
                }
            }
        }
        (snapshot, errors)
    }

    /// 심볼 목록 전체를 병렬로 평가
    ///
    /// # Arguments
    /// * `symbols` - 평가할 심볼 목록
    /// * `as_of` - 분석 시각
    ///
    /// # Returns
    /// * `Result<ScanReport, ScanError>` - 정렬된 평가 결과
    pub fn scan(&self, symbols: &[String], as_of: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        info!(
            "스캔 시작: 심볼 {}개, 작업자 {}개, 전략 {}",
            symbols.len(),
            self.config.scan.workers,
            self.strategy
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.scan.workers)
            .build()
            .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

        let mut evaluations: Vec<Evaluation> = pool.install(|| {
            symbols
                .par_iter()
                .filter(|_| !self.is_cancelled())
                .flat_map_iter(|symbol| self.evaluate_symbol(symbol, as_of))
                .collect()
        });
        evaluations.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.scope.cmp(&b.scope)));

        let report = ScanReport {
            evaluations,
            cancelled: self.is_cancelled(),
        };
        info!("스캔 완료: {}", report);
        Ok(report)
    }

    /// 심볼 공급원에서 목록을 받아 스캔
    pub fn scan_source(
        &self,
        source: &dyn SymbolSource,
        as_of: DateTime<Utc>,
    ) -> Result<ScanReport, ScanError> {
        let symbols = source.list_symbols().map_err(ScanError::Symbols)?;
        self.scan(&symbols, as_of)
    }

    /// 신호를 하나씩 순차적으로 생성하는 지연 반복자
    ///
    /// 소비한 만큼만 심볼을 평가하며, 취소되면 다음 심볼부터 멈춥니다.
    pub fn signals<'s>(
        &'s self,
        symbols: &'s [String],
        as_of: DateTime<Utc>,
    ) -> impl Iterator<Item = Signal> + 's {
        symbols
            .iter()
            .take_while(move |_| !self.is_cancelled())
            .flat_map(move |symbol| self.evaluate_symbol(symbol, as_of))
            .filter_map(|evaluation| match evaluation.outcome {
                SymbolOutcome::Signal(signal) => Some(signal),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::volume_analyzer::VolumeSource;
    use crate::candle_series::CandleSeries;
    use crate::model::{Candle, Side};
    use crate::strategy::TrendVolumeStrategy;
    use crate::supply::InMemorySupplier;
    use chrono::TimeZone;

    fn daily(symbol: &str, rising: bool) -> CandleSeries {
        let candles = (0..200)
            .map(|i| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap();
                let step = i as f64 * 0.5;
                let close = if rising { 100.0 + step } else { 200.0 - step };
                let volume = if i == 199 { 3000.0 } else { 1000.0 };
                Candle::new(ts, close, close, close, close, volume)
            })
            .collect();
        CandleSeries::new(symbol, Timeframe::Day1, candles).unwrap()
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.volume.source = VolumeSource::Volume;
        config.filters.min_turnover = None;
        config.strategy.timeframes = vec![Timeframe::Day1];
        config.scan.workers = 2;
        config
    }

    #[test]
    fn test_scan_sorted_with_outcomes() {
        let config = config();
        let strategy = TrendVolumeStrategy::new(&config);
        let supplier = InMemorySupplier::new()
            .with(daily("BBBUSDT", false))
            .with(daily("AAAUSDT", true));
        let scanner = Scanner::new(&config, &strategy, &supplier);
        let symbols = vec!["CCCUSDT".to_string(), "BBBUSDT".to_string(), "AAAUSDT".to_string()];

        let report = scanner.scan(&symbols, Utc::now()).unwrap();
        let order: Vec<&str> = report.evaluations.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAAUSDT", "BBBUSDT", "CCCUSDT"]);

        let sides: Vec<Side> = report.signals().map(|s| s.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell]);
        assert_eq!(report.skip_counts().get(&SkipReason::MissingTimeframe), Some(&1));
        assert!(!report.cancelled);
    }

    #[test]
    fn test_cancelled_scan_requests_nothing() {
        let config = config();
        let strategy = TrendVolumeStrategy::new(&config);
        let supplier = InMemorySupplier::new().with(daily("AAAUSDT", true));
        let scanner = Scanner::new(&config, &strategy, &supplier);
        scanner.cancel_handle().store(true, Ordering::Relaxed);

        let symbols = vec!["AAAUSDT".to_string()];
        let report = scanner.scan(&symbols, Utc::now()).unwrap();
        assert!(report.evaluations.is_empty());
        assert!(report.cancelled);
        assert_eq!(scanner.signals(&symbols, Utc::now()).count(), 0);
    }

    #[test]
    fn test_lazy_signals() {
        let config = config();
        let strategy = TrendVolumeStrategy::new(&config);
        let supplier = InMemorySupplier::new()
            .with(daily("AAAUSDT", true))
            .with(daily("BBBUSDT", true));
        let scanner = Scanner::new(&config, &strategy, &supplier);
        let symbols = vec!["AAAUSDT".to_string(), "BBBUSDT".to_string()];

        let first = scanner.signals(&symbols, Utc::now()).next().unwrap();
        assert_eq!(first.symbol, "AAAUSDT");
        assert_eq!(first.evidence.funding_rate, None);
    }
}
