use crate::candle_series::{CandleSeries, MarketSnapshot};
use crate::config::FilterConfig;
use crate::indicator::IndicatorError;
use crate::signal::{Signal, SignalScope};
use crate::strategy::SignalStrategy;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::Serialize;
use std::fmt::{self, Display};

/// 신호를 만들지 않은 이유
///
/// 모두 예상 가능한 결과이며 호출자에게 오류로 전달되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 기준 시리즈가 최소 길이보다 짧음
    ShortHistory,
    /// 최신 거래대금이 하한 미만 (또는 거래대금 없음)
    LowLiquidity,
    /// 마지막 두 종가 변화율이 한도 초과
    GapExceeded,
    /// 어느 타임프레임에서도 거래량 이상 징후가 없음
    NoVolumeEvidence,
    /// 수요/공급 구역을 찾지 못함
    NoZone,
    /// 조건 조합이 매수/매도에 해당하지 않음
    NoSetup,
    /// 빠른/느린 EMA 가 정확히 같음
    AmbiguousTrend,
    /// 필요한 타임프레임 데이터가 없음
    MissingTimeframe,
    /// 지표 계산에 필요한 데이터 부족
    InsufficientData,
    /// NEUTRAL 결과 전송 비활성화
    NeutralSuppressed,
}

impl SkipReason {
    pub const ALL: [SkipReason; 10] = [
        SkipReason::ShortHistory,
        SkipReason::LowLiquidity,
        SkipReason::GapExceeded,
        SkipReason::NoVolumeEvidence,
        SkipReason::NoZone,
        SkipReason::NoSetup,
        SkipReason::AmbiguousTrend,
        SkipReason::MissingTimeframe,
        SkipReason::InsufficientData,
        SkipReason::NeutralSuppressed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ShortHistory => "short_history",
            SkipReason::LowLiquidity => "low_liquidity",
            SkipReason::GapExceeded => "gap_exceeded",
            SkipReason::NoVolumeEvidence => "no_volume_evidence",
            SkipReason::NoZone => "no_zone",
            SkipReason::NoSetup => "no_setup",
            SkipReason::AmbiguousTrend => "ambiguous_trend",
            SkipReason::MissingTimeframe => "missing_timeframe",
            SkipReason::InsufficientData => "insufficient_data",
            SkipReason::NeutralSuppressed => "neutral_suppressed",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 지표 오류는 "근거 없음"으로 취급
impl From<IndicatorError> for SkipReason {
    fn from(_: IndicatorError) -> Self {
        SkipReason::InsufficientData
    }
}

/// 신호 레코드 조립기
///
/// 유동성/갭 정책으로 거부할 수 있는 유일한 단계이며, 사전 조건은 분류 전에 검사합니다.
#[derive(Debug, Clone)]
pub struct SignalRecordBuilder<'a> {
    filters: &'a FilterConfig,
}

impl<'a> SignalRecordBuilder<'a> {
    pub fn new(filters: &'a FilterConfig) -> Self {
        SignalRecordBuilder { filters }
    }

    /// 기준 시리즈의 사전 조건 검사
    ///
    /// 순서: 최소 길이 → 거래대금 하한 → 종가 갭
    pub fn check_preconditions(&self, series: &CandleSeries) -> Result<(), SkipReason> {
        if series.len() < self.filters.min_history {
            return Err(SkipReason::ShortHistory);
        }

        if let Some(floor) = self.filters.min_turnover {
            match series.latest().turnover() {
                Some(turnover) if turnover >= floor => {}
                _ => return Err(SkipReason::LowLiquidity),
            }
        }

        if let (Some(max_gap), Some(gap)) = (self.filters.max_gap_pct, series.last_close_gap()) {
            if gap > max_gap {
                return Err(SkipReason::GapExceeded);
            }
        }

        Ok(())
    }

    /// 평가 범위 하나에 대해 신호 생성
    ///
    /// # Arguments
    /// * `strategy` - 분류 전략
    /// * `scope` - 평가 범위
    /// * `snapshot` - 심볼의 타임프레임별 시리즈
    /// * `as_of` - 분석 시각
    /// * `funding_rate` - 공급자가 제공한 펀딩비 (선택)
    ///
    /// # Returns
    /// * `Result<Signal, SkipReason>` - 신호 또는 건너뛴 이유
    pub fn build(
        &self,
        strategy: &dyn SignalStrategy,
        scope: SignalScope,
        snapshot: &MarketSnapshot,
        as_of: DateTime<Utc>,
        funding_rate: Option<f64>,
    ) -> Result<Signal, SkipReason> {
        let anchor = snapshot
            .get(strategy.anchor(scope))
            .ok_or(SkipReason::MissingTimeframe)?;
        self.check_preconditions(anchor)?;

        let mut classification = strategy.classify(scope, snapshot)?;
        classification.evidence.funding_rate = funding_rate;
        trace!("{} {} 분류 완료: {}", snapshot.symbol(), scope, classification.side);

        Ok(Signal {
            symbol: snapshot.symbol().to_string(),
            scope,
            side: classification.side,
            strength: classification.strength,
            strategy: strategy.strategy_type(),
            evidence: classification.evidence,
            price: anchor.latest_close(),
            timestamp: as_of,
        })
    }

    /// 전략의 모든 평가 범위를 순서대로 처리
    pub fn build_all(
        &self,
        strategy: &dyn SignalStrategy,
        snapshot: &MarketSnapshot,
        as_of: DateTime<Utc>,
        funding_rate: Option<f64>,
    ) -> Vec<(SignalScope, Result<Signal, SkipReason>)> {
        strategy
            .scopes()
            .into_iter()
            .map(|scope| {
                let result = self.build(strategy, scope, snapshot, as_of, funding_rate);
                if let Err(reason) = &result {
                    debug!("{} {} 건너뜀: {}", snapshot.symbol(), scope, reason);
                }
                (scope, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candle, Timeframe};
    use chrono::TimeZone;

    fn series(len: usize, last_close: f64, turnover: Option<f64>) -> CandleSeries {
        let candles = (0..len)
            .map(|i| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap();
                let close = if i + 1 == len { last_close } else { 100.0 };
                let candle = Candle::new(ts, 100.0, close.max(100.0), close.min(100.0), close, 1000.0);
                match turnover {
                    Some(t) => candle.with_turnover(t),
                    None => candle,
                }
            })
            .collect();
        CandleSeries::new("TESTUSDT", Timeframe::Day1, candles).unwrap()
    }

    #[test]
    fn test_preconditions_order() {
        let filters = FilterConfig::default();
        let builder = SignalRecordBuilder::new(&filters);

        // 짧은 시리즈는 다른 조건보다 먼저 걸림
        assert_eq!(
            builder.check_preconditions(&series(10, 150.0, None)),
            Err(SkipReason::ShortHistory)
        );
        assert_eq!(
            builder.check_preconditions(&series(80, 150.0, Some(100.0))),
            Err(SkipReason::LowLiquidity)
        );
        assert_eq!(
            builder.check_preconditions(&series(80, 110.0, Some(500_000.0))),
            Err(SkipReason::GapExceeded)
        );
        assert_eq!(
            builder.check_preconditions(&series(80, 107.0, Some(500_000.0))),
            Ok(())
        );
    }

    #[test]
    fn test_zero_previous_close_is_gap() {
        let filters = FilterConfig::default();
        let builder = SignalRecordBuilder::new(&filters);
        let mut candles = series(80, 100.0, Some(500_000.0)).items().to_vec();
        let ts = candles[78].open_time();
        candles[78] = Candle::new(ts, 0.0, 0.0, 0.0, 0.0, 1000.0).with_turnover(500_000.0);
        let zeroed = CandleSeries::new("TESTUSDT", Timeframe::Day1, candles).unwrap();
        assert_eq!(
            builder.check_preconditions(&zeroed),
            Err(SkipReason::GapExceeded)
        );
    }

    #[test]
    fn test_missing_turnover_fails_floor() {
        let filters = FilterConfig::default();
        let builder = SignalRecordBuilder::new(&filters);
        assert_eq!(
            builder.check_preconditions(&series(80, 100.0, None)),
            Err(SkipReason::LowLiquidity)
        );

        let no_floor = FilterConfig {
            min_turnover: None,
            ..FilterConfig::default()
        };
        assert!(SignalRecordBuilder::new(&no_floor)
            .check_preconditions(&series(80, 100.0, None))
            .is_ok());
    }

    #[test]
    fn test_indicator_error_maps_to_insufficient_data() {
        let reason: SkipReason = IndicatorError::InvalidPeriod { indicator: "EMA" }.into();
        assert_eq!(reason, SkipReason::InsufficientData);
    }
}
