use crate::model::{Candle, Timeframe};
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// 캔들 시리즈 검증 오류
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// 캔들이 하나도 없음
    Empty,
    /// 같은 open_time 이 두 번 이상 등장
    DuplicateTimestamp { index: usize },
    /// open_time 이 오름차순이 아님
    NotAscending { index: usize },
    /// 값이 유한하지 않거나 고가 < 저가 등
    InvalidCandle { index: usize, reason: String },
}

impl Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::Empty => write!(f, "캔들 시리즈가 비어 있습니다"),
            SeriesError::DuplicateTimestamp { index } => {
                write!(f, "중복된 캔들 시간: index={index}")
            }
            SeriesError::NotAscending { index } => {
                write!(f, "캔들 시간이 오름차순이 아닙니다: index={index}")
            }
            SeriesError::InvalidCandle { index, reason } => {
                write!(f, "잘못된 캔들: index={index} - {reason}")
            }
        }
    }
}

impl std::error::Error for SeriesError {}

/// 검증된 캔들 시리즈
///
/// 한 심볼 + 한 타임프레임의 캔들을 open_time 오름차순으로 보관합니다.
/// 길이는 항상 1 이상이며, 생성 후에는 변경되지 않습니다.
/// 지표 계산은 모두 이 시리즈에서 새 벡터를 만들어 사용합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    items: Vec<Candle>,
}

/// 단일 캔들의 값 검증
fn validate_candle(index: usize, candle: &Candle) -> Result<(), SeriesError> {
    let prices = [
        candle.open_price(),
        candle.high_price(),
        candle.low_price(),
        candle.close_price(),
        candle.volume(),
    ];
    if prices.iter().any(|v| !v.is_finite()) {
        return Err(SeriesError::InvalidCandle {
            index,
            reason: "유한하지 않은 값".to_string(),
        });
    }

    if candle.high_price() < candle.low_price() {
        return Err(SeriesError::InvalidCandle {
            index,
            reason: format!(
                "고가({})가 저가({})보다 작습니다",
                candle.high_price(),
                candle.low_price()
            ),
        });
    }

    if candle.volume() < 0.0 {
        return Err(SeriesError::InvalidCandle {
            index,
            reason: "음수 거래량".to_string(),
        });
    }

    if let Some(turnover) = candle.turnover() {
        if !turnover.is_finite() || turnover < 0.0 {
            return Err(SeriesError::InvalidCandle {
                index,
                reason: format!("잘못된 거래대금: {turnover}"),
            });
        }
    }

    Ok(())
}

impl CandleSeries {
    /// 캔들 목록으로 시리즈 생성
    ///
    /// 정렬을 대신 해주지 않습니다. 순서가 어긋나거나 중복이 있으면 오류를 반환합니다.
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `timeframe` - 타임프레임
    /// * `items` - open_time 오름차순 캔들 목록
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        items: Vec<Candle>,
    ) -> Result<CandleSeries, SeriesError> {
        if items.is_empty() {
            return Err(SeriesError::Empty);
        }

        for (index, candle) in items.iter().enumerate() {
            validate_candle(index, candle)?;
        }

        for (offset, pair) in items.windows(2).enumerate() {
            let index = offset + 1;
            if pair[1].open_time() == pair[0].open_time() {
                return Err(SeriesError::DuplicateTimestamp { index });
            }
            if pair[1].open_time() < pair[0].open_time() {
                return Err(SeriesError::NotAscending { index });
            }
        }

        Ok(CandleSeries {
            symbol: symbol.into(),
            timeframe,
            items,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// 캔들 수
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 항상 false (길이 1 이상 보장)
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 시간 순 캔들 슬라이스
    pub fn items(&self) -> &[Candle] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.items.get(index)
    }

    /// 가장 최근 캔들
    pub fn latest(&self) -> &Candle {
        // 생성 시 비어 있지 않음을 검증했으므로 마지막 원소가 존재합니다.
        &self.items[self.items.len() - 1]
    }

    /// 최근 캔들 직전의 캔들
    pub fn previous(&self) -> Option<&Candle> {
        self.items.len().checked_sub(2).map(|i| &self.items[i])
    }

    /// 최근 n개 캔들 (n 이 길이보다 크면 전체)
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.items.len().saturating_sub(n);
        &self.items[start..]
    }

    pub fn latest_close(&self) -> f64 {
        self.latest().close_price()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.items.iter().map(|c| c.open_price()).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.items.iter().map(|c| c.high_price()).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.items.iter().map(|c| c.low_price()).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.items.iter().map(|c| c.close_price()).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.items.iter().map(|c| c.volume()).collect()
    }

    /// 거래대금 목록
    ///
    /// 하나라도 거래대금이 없는 캔들이 있으면 None 을 반환합니다.
    pub fn turnovers(&self) -> Option<Vec<f64>> {
        self.items.iter().map(|c| c.turnover()).collect()
    }

    /// 마지막 두 종가 사이의 변화율 절댓값 (|c[-1]/c[-2] - 1|)
    ///
    /// 직전 종가가 0 이면 변화율을 정의할 수 없으므로 무한대로 취급합니다.
    pub fn last_close_gap(&self) -> Option<f64> {
        let previous = self.previous()?.close_price();
        if previous == 0.0 {
            return Some(f64::INFINITY);
        }
        Some((self.latest_close() / previous - 1.0).abs())
    }
}

impl Display for CandleSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CandleSeries({} {}: {} candles, last={})",
            self.symbol,
            self.timeframe,
            self.items.len(),
            self.latest_close()
        )
    }
}

/// 한 심볼의 타임프레임별 시리즈 묶음
///
/// 공급자가 데이터를 주지 않은 타임프레임은 비어 있습니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    symbol: String,
    series: BTreeMap<Timeframe, CandleSeries>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        MarketSnapshot {
            symbol: symbol.into(),
            series: BTreeMap::new(),
        }
    }

    /// 시리즈 추가 (같은 타임프레임이 있으면 교체)
    pub fn insert(&mut self, series: CandleSeries) {
        self.series.insert(series.timeframe(), series);
    }

    /// 시리즈를 추가한 스냅샷 반환
    pub fn with(mut self, series: CandleSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&CandleSeries> {
        self.series.get(&timeframe)
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.series.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(
            Utc.timestamp_opt(ts, 0).unwrap(),
            close,
            close + 1.0,
            close - 1.0,
            close,
            100.0,
        )
    }

    #[test]
    fn test_empty_series_rejected() {
        assert_eq!(
            CandleSeries::new("BTCUSDT", Timeframe::Hour1, vec![]),
            Err(SeriesError::Empty)
        );
    }

    #[test]
    fn test_duplicate_and_unsorted_rejected() {
        let dup = vec![candle(0, 1.0), candle(0, 2.0)];
        assert_eq!(
            CandleSeries::new("X", Timeframe::Hour1, dup),
            Err(SeriesError::DuplicateTimestamp { index: 1 })
        );

        let unsorted = vec![candle(10, 1.0), candle(5, 2.0)];
        assert_eq!(
            CandleSeries::new("X", Timeframe::Hour1, unsorted),
            Err(SeriesError::NotAscending { index: 1 })
        );
    }

    #[test]
    fn test_invalid_candle_rejected() {
        let bad = Candle::new(Utc.timestamp_opt(0, 0).unwrap(), 1.0, 0.5, 2.0, 1.0, 1.0);
        let result = CandleSeries::new("X", Timeframe::Hour1, vec![bad]);
        assert!(matches!(result, Err(SeriesError::InvalidCandle { index: 0, .. })));
    }

    #[test]
    fn test_accessors() {
        let series = CandleSeries::new(
            "X",
            Timeframe::Day1,
            vec![candle(0, 100.0), candle(60, 104.0), candle(120, 110.0)],
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![100.0, 104.0, 110.0]);
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(10).len(), 3);
        assert_eq!(series.previous().unwrap().close_price(), 104.0);
        assert!(series.turnovers().is_none());
        let gap = series.last_close_gap().unwrap();
        assert!((gap - (110.0 / 104.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_single_candle_has_no_gap() {
        let series = CandleSeries::new("X", Timeframe::Day1, vec![candle(0, 100.0)]).unwrap();
        assert!(series.previous().is_none());
        assert!(series.last_close_gap().is_none());
    }

    #[test]
    fn test_zero_previous_close_is_infinite_gap() {
        let zero = Candle::new(Utc.timestamp_opt(0, 0).unwrap(), 0.0, 0.0, 0.0, 0.0, 100.0);
        let series =
            CandleSeries::new("X", Timeframe::Day1, vec![zero, candle(86_400, 100.0)]).unwrap();
        assert_eq!(series.last_close_gap(), Some(f64::INFINITY));
    }

    #[test]
    fn test_snapshot_lookup() {
        let daily = CandleSeries::new("X", Timeframe::Day1, vec![candle(0, 100.0)]).unwrap();
        let snapshot = MarketSnapshot::new("X").with(daily.clone());
        assert_eq!(snapshot.symbol(), "X");
        assert_eq!(snapshot.get(Timeframe::Day1), Some(&daily));
        assert!(snapshot.get(Timeframe::Hour4).is_none());
        assert_eq!(snapshot.timeframes().collect::<Vec<_>>(), vec![Timeframe::Day1]);
    }
}
