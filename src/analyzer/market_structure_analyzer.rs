use crate::candle_series::CandleSeries;
use crate::config::StructureConfig;
use crate::indicator::{IndicatorError, ensure_len};
use crate::model::Candle;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 구조 돌파 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureBreak {
    /// 최신 종가가 기준 고점 위로 돌파 (BoS↑)
    Up,
    /// 최신 종가가 기준 저점 아래로 이탈 (BoS↓)
    Down,
    None,
}

impl Display for StructureBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureBreak::Up => write!(f, "BoS↑"),
            StructureBreak::Down => write!(f, "BoS↓"),
            StructureBreak::None => write!(f, "-"),
        }
    }
}

/// 구역 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    /// 수요 구역 (마지막 음봉)
    Demand,
    /// 공급 구역 (마지막 양봉)
    Supply,
}

impl Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneKind::Demand => write!(f, "Demand"),
            ZoneKind::Supply => write!(f, "Supply"),
        }
    }
}

/// 캔들 하나에서 유도한 가격 구역
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub lower: f64,
    pub upper: f64,
    pub kind: ZoneKind,
}

impl Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}, {}]", self.kind, self.lower, self.upper)
    }
}

impl Zone {
    /// 구역 높이
    pub fn height(&self) -> f64 {
        self.upper - self.lower
    }

    /// 여유폭을 둔 포함 여부
    ///
    /// 높이 × tolerance 만큼 양쪽을 넓히고, 높이가 0 이면 price × tolerance 로 넓힙니다.
    ///
    /// # Arguments
    /// * `price` - 검사할 가격
    /// * `tolerance` - 여유 비율 (기본 0.015)
    pub fn contains(&self, price: f64, tolerance: f64) -> bool {
        let height = self.height();
        let pad = if height > 0.0 {
            tolerance * height
        } else {
            tolerance * price.abs()
        };
        price >= self.lower - pad && price <= self.upper + pad
    }
}

/// 구역 포함 여부 (구역이 없으면 false)
pub fn within_zone(price: f64, zone: Option<&Zone>, tolerance: f64) -> bool {
    zone.is_some_and(|z| z.contains(price, tolerance))
}

/// 돌파 판정 기준 구간 (최신 봉 앞의 exclude_last 개를 제외한 lookback 개)
fn reference_window<'a>(
    series: &'a CandleSeries,
    lookback: usize,
    exclude_last: usize,
) -> Result<&'a [Candle], IndicatorError> {
    ensure_len("BoS", series.len(), exclude_last + 1)?;
    let end = series.len() - exclude_last;
    let start = end.saturating_sub(lookback);
    Ok(&series.items()[start..end])
}

/// 상방 구조 돌파 여부
///
/// 최신 종가가 기준 구간의 최고가보다 엄격하게 커야 합니다.
pub fn break_of_structure_up(
    series: &CandleSeries,
    lookback: usize,
    exclude_last: usize,
) -> Result<bool, IndicatorError> {
    let window = reference_window(series, lookback, exclude_last)?;
    let reference_high = window
        .iter()
        .map(|c| c.high_price())
        .fold(f64::NEG_INFINITY, f64::max);
    Ok(series.latest_close() > reference_high)
}

/// 하방 구조 이탈 여부 (최신 종가 < 기준 구간 최저가)
pub fn break_of_structure_down(
    series: &CandleSeries,
    lookback: usize,
    exclude_last: usize,
) -> Result<bool, IndicatorError> {
    let window = reference_window(series, lookback, exclude_last)?;
    let reference_low = window
        .iter()
        .map(|c| c.low_price())
        .fold(f64::INFINITY, f64::min);
    Ok(series.latest_close() < reference_low)
}

/// 상/하방 돌파를 하나로 합친 판정
///
/// 모든 캔들이 high >= low 이므로 두 돌파가 동시에 참일 수 없습니다.
pub fn structure_break(
    series: &CandleSeries,
    lookback: usize,
    exclude_last: usize,
) -> Result<StructureBreak, IndicatorError> {
    if break_of_structure_up(series, lookback, exclude_last)? {
        Ok(StructureBreak::Up)
    } else if break_of_structure_down(series, lookback, exclude_last)? {
        Ok(StructureBreak::Down)
    } else {
        Ok(StructureBreak::None)
    }
}

/// 최근 lookback 개 봉을 len-2 부터 1 까지 거꾸로 훑어 조건을 만족하는 첫 캔들
fn scan_backward<'a>(
    series: &'a CandleSeries,
    lookback: usize,
    predicate: impl Fn(&Candle) -> bool,
) -> Option<&'a Candle> {
    let sub = series.tail(lookback);
    if sub.len() < 3 {
        return None;
    }
    (1..sub.len() - 1).rev().map(|i| &sub[i]).find(|c| predicate(c))
}

/// 수요 구역: 가장 최근 음봉의 [저가, max(시가, 종가)]
pub fn extract_demand_zone(series: &CandleSeries, lookback: usize) -> Option<Zone> {
    scan_backward(series, lookback, Candle::is_bearish).map(|c| Zone {
        lower: c.low_price(),
        upper: c.body_top(),
        kind: ZoneKind::Demand,
    })
}

/// 공급 구역: 가장 최근 양봉의 [min(시가, 종가), 고가]
pub fn extract_supply_zone(series: &CandleSeries, lookback: usize) -> Option<Zone> {
    scan_backward(series, lookback, Candle::is_bullish).map(|c| Zone {
        lower: c.body_bottom(),
        upper: c.high_price(),
        kind: ZoneKind::Supply,
    })
}

/// 시장 구조 분석 결과
#[derive(Debug, Clone, PartialEq)]
pub struct MarketStructureAnalysis {
    pub structure_break: StructureBreak,
    pub demand: Option<Zone>,
    pub supply: Option<Zone>,
    /// 최신 종가
    pub price: f64,
    pub near_demand: bool,
    pub near_supply: bool,
}

impl MarketStructureAnalysis {
    /// BoS↑ 이면서 수요 구역 안
    pub fn is_buy_setup(&self) -> bool {
        self.structure_break == StructureBreak::Up && self.near_demand
    }

    /// BoS↓ 이면서 공급 구역 안
    pub fn is_sell_setup(&self) -> bool {
        self.structure_break == StructureBreak::Down && self.near_supply
    }

    /// 두 구역 모두 없음
    pub fn has_no_zone(&self) -> bool {
        self.demand.is_none() && self.supply.is_none()
    }
}

impl Display for MarketStructureAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let zone = |z: &Option<Zone>| z.map(|z| z.to_string()).unwrap_or_else(|| "-".into());
        write!(
            f,
            "구조: {} | 수요: {} | 공급: {} | 가격: {}",
            self.structure_break,
            zone(&self.demand),
            zone(&self.supply),
            self.price
        )
    }
}

/// 시장 구조 분석기
#[derive(Debug, Clone)]
pub struct MarketStructureAnalyzer<'a> {
    config: &'a StructureConfig,
}

impl<'a> MarketStructureAnalyzer<'a> {
    pub fn new(config: &'a StructureConfig) -> Self {
        MarketStructureAnalyzer { config }
    }

    /// 시리즈 하나의 돌파/구역/근접 여부를 계산
    pub fn analyze(&self, series: &CandleSeries) -> Result<MarketStructureAnalysis, IndicatorError> {
        let structure_break = structure_break(
            series,
            self.config.bos_lookback,
            self.config.bos_exclude_last,
        )?;
        let demand = extract_demand_zone(series, self.config.zone_lookback);
        let supply = extract_supply_zone(series, self.config.zone_lookback);
        let price = series.latest_close();
        let tolerance = self.config.zone_tolerance;

        Ok(MarketStructureAnalysis {
            structure_break,
            near_demand: within_zone(price, demand.as_ref(), tolerance),
            near_supply: within_zone(price, supply.as_ref(), tolerance),
            demand,
            supply,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timeframe;
    use chrono::{TimeZone, Utc};

    fn series_from(ohlc: &[(f64, f64, f64, f64)]) -> CandleSeries {
        let candles = ohlc
            .iter()
            .enumerate()
            .map(|(i, (o, h, l, c))| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 14_400, 0).unwrap();
                Candle::new(ts, *o, *h, *l, *c, 1000.0)
            })
            .collect();
        CandleSeries::new("TESTUSDT", Timeframe::Hour4, candles).unwrap()
    }

    fn flat(len: usize, price: f64) -> Vec<(f64, f64, f64, f64)> {
        vec![(price, price, price, price); len]
    }

    #[test]
    fn test_bos_up_excludes_last_bars() {
        let mut bars = flat(50, 100.0);
        // 제외 구간의 고점은 기준에 들어가지 않음
        bars.push((100.0, 150.0, 100.0, 100.0));
        bars.push((100.0, 101.0, 100.0, 101.0));
        let series = series_from(&bars);
        assert!(break_of_structure_up(&series, 40, 2).unwrap());
        assert!(!break_of_structure_up(&series, 40, 1).unwrap());
    }

    #[test]
    fn test_bos_flat_series_is_none() {
        let series = series_from(&flat(200, 100.0));
        assert_eq!(structure_break(&series, 40, 2).unwrap(), StructureBreak::None);
    }

    #[test]
    fn test_bos_down() {
        let mut bars = flat(60, 100.0);
        bars.push((100.0, 100.0, 90.0, 95.0));
        let series = series_from(&bars);
        assert_eq!(structure_break(&series, 40, 2).unwrap(), StructureBreak::Down);
    }

    #[test]
    fn test_bos_requires_history() {
        let series = series_from(&flat(2, 100.0));
        assert!(matches!(
            break_of_structure_up(&series, 40, 2),
            Err(IndicatorError::InsufficientData { required: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_zone_extraction_picks_most_recent() {
        let mut bars = flat(10, 100.0);
        bars[3] = (110.0, 112.0, 99.0, 100.0); // 음봉
        bars[6] = (105.0, 106.0, 98.0, 101.0); // 더 최근 음봉
        bars[7] = (100.0, 108.0, 99.5, 104.0); // 양봉
        let series = series_from(&bars);

        let demand = extract_demand_zone(&series, 60).unwrap();
        assert_eq!((demand.lower, demand.upper), (98.0, 105.0));

        let supply = extract_supply_zone(&series, 60).unwrap();
        assert_eq!((supply.lower, supply.upper), (100.0, 108.0));
    }

    #[test]
    fn test_zone_scan_skips_latest_and_first() {
        let mut bars = flat(5, 100.0);
        bars[0] = (110.0, 110.0, 100.0, 100.0);
        bars[4] = (110.0, 110.0, 100.0, 100.0);
        let series = series_from(&bars);
        assert!(extract_demand_zone(&series, 60).is_none());
    }

    #[test]
    fn test_within_zone_tolerance() {
        let zone = Zone {
            lower: 100.0,
            upper: 110.0,
            kind: ZoneKind::Demand,
        };
        assert!(zone.contains(105.0, 0.015));
        assert!(zone.contains(110.1, 0.015));
        assert!(!zone.contains(110.2, 0.015));
        assert!(!zone.contains(130.0, 0.015));
        assert!(!within_zone(105.0, None, 0.015));
    }

    #[test]
    fn test_within_zone_monotonic_in_tolerance() {
        let zone = Zone {
            lower: 100.0,
            upper: 110.0,
            kind: ZoneKind::Supply,
        };
        let prices: Vec<f64> = (0..200).map(|i| 90.0 + i as f64 * 0.15).collect();
        let tolerances = [0.0, 0.01, 0.015, 0.05, 0.2];
        for pair in tolerances.windows(2) {
            for &p in &prices {
                if zone.contains(p, pair[0]) {
                    assert!(zone.contains(p, pair[1]));
                }
            }
        }
    }

    #[test]
    fn test_zero_height_zone_pads_by_price() {
        let zone = Zone {
            lower: 100.0,
            upper: 100.0,
            kind: ZoneKind::Demand,
        };
        assert!(zone.contains(101.0, 0.015));
        assert!(!zone.contains(102.0, 0.015));
    }
}
