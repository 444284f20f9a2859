use crate::candle_series::CandleSeries;
use crate::indicator::atr::true_range_series;
use crate::indicator::utils::moving_average;
use crate::indicator::{EPSILON, IndicatorError, ensure_len, ensure_period};
use std::fmt::Display;

/// 방향성 움직임(+DM, -DM) 시계열
///
/// 우세하고 양수인 쪽만 남기며 첫 봉은 0 입니다.
fn directional_movement(highs: &[f64], lows: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut plus = Vec::with_capacity(highs.len());
    let mut minus = Vec::with_capacity(highs.len());
    plus.push(0.0);
    minus.push(0.0);

    for i in 1..highs.len() {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        plus.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus.push(if down > up && down > 0.0 { down } else { 0.0 });
    }

    (plus, minus)
}

#[derive(Debug, Clone, Copy)]
pub struct ADXBuilder {
    period: usize,
}

/// ADX(Average Directional Index) 값과 방향 지수
#[derive(Clone, Debug, PartialEq)]
pub struct ADX {
    period: usize,
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

impl Display for ADX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ADX({}: {:.2}, +DI {:.2}, -DI {:.2})",
            self.period, self.adx, self.plus_di, self.minus_di
        )
    }
}

impl ADX {
    pub fn period(&self) -> usize {
        self.period
    }

    /// 추세 강도가 기준 이상인지 (일반적으로 25)
    pub fn is_trending(&self, threshold: f64) -> bool {
        self.adx >= threshold
    }
}

impl ADXBuilder {
    pub fn new(period: usize) -> Self {
        ADXBuilder { period }
    }

    /// 캔들 시리즈로 최신 ADX 계산
    ///
    /// TR, DM, DX 모두 와일더 평활(α = 1/period)을 사용합니다.
    pub fn build(&self, series: &CandleSeries) -> Result<ADX, IndicatorError> {
        ensure_period("ADX", self.period)?;
        ensure_len("ADX", series.len(), self.period + 1)?;

        let highs = series.highs();
        let lows = series.lows();
        let alpha = moving_average::calculate_wilder_alpha(self.period);

        let tr = true_range_series(&highs, &lows, &series.closes());
        let atr = moving_average::ema_series_with_alpha(&tr, alpha);

        let (plus_dm, minus_dm) = directional_movement(&highs, &lows);
        let plus_smoothed = moving_average::ema_series_with_alpha(&plus_dm, alpha);
        let minus_smoothed = moving_average::ema_series_with_alpha(&minus_dm, alpha);

        let mut plus_di = Vec::with_capacity(atr.len());
        let mut minus_di = Vec::with_capacity(atr.len());
        let mut dx = Vec::with_capacity(atr.len());
        for i in 0..atr.len() {
            let p = 100.0 * plus_smoothed[i] / (atr[i] + EPSILON);
            let m = 100.0 * minus_smoothed[i] / (atr[i] + EPSILON);
            dx.push(100.0 * (p - m).abs() / (p + m + EPSILON));
            plus_di.push(p);
            minus_di.push(m);
        }

        let adx = moving_average::ema_series_with_alpha(&dx, alpha);
        let last = adx.len() - 1;

        Ok(ADX {
            period: self.period,
            adx: adx[last],
            plus_di: plus_di[last],
            minus_di: minus_di[last],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candle, Timeframe};
    use chrono::{TimeZone, Utc};

    fn trending_series(len: usize, step: f64) -> CandleSeries {
        let candles = (0..len)
            .map(|i| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap();
                let base = 100.0 + step * i as f64;
                Candle::new(ts, base, base + 1.0, base - 1.0, base + step * 0.5, 1000.0)
            })
            .collect();
        CandleSeries::new("TESTUSDT", Timeframe::Day1, candles).unwrap()
    }

    #[test]
    fn test_directional_movement_dominant_side() {
        let (plus, minus) = directional_movement(&[10.0, 12.0, 11.0], &[9.0, 10.0, 7.0]);
        assert_eq!(plus, vec![0.0, 2.0, 0.0]);
        assert_eq!(minus, vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_adx_uptrend() {
        let adx = ADXBuilder::new(14).build(&trending_series(100, 1.0)).unwrap();
        assert!(adx.plus_di > adx.minus_di);
        assert!(adx.is_trending(25.0));
    }

    #[test]
    fn test_adx_downtrend() {
        let adx = ADXBuilder::new(14).build(&trending_series(100, -0.5)).unwrap();
        assert!(adx.minus_di > adx.plus_di);
    }

    #[test]
    fn test_adx_flat_is_finite() {
        let adx = ADXBuilder::new(14).build(&trending_series(30, 0.0)).unwrap();
        assert!(adx.adx.is_finite());
        assert!(adx.adx.abs() < 1e-6);
    }

    #[test]
    fn test_adx_requires_period_plus_one() {
        assert!(matches!(
            ADXBuilder::new(14).build(&trending_series(14, 1.0)),
            Err(IndicatorError::InsufficientData { required: 15, actual: 14, .. })
        ));
    }
}
