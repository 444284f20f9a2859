use crate::candle_series::CandleSeries;
use crate::indicator::ma::MA;
use crate::indicator::utils::moving_average;
use crate::indicator::{IndicatorError, ensure_len, ensure_period};
use std::fmt::Display;

/// 지수이동평균(EMA) 계산 빌더
///
/// 평활 계수 α = 2/(period+1), 첫 값으로 시드하는 adjust=false 방식입니다.
/// period 가 시리즈 길이보다 커도 계산은 가능하며, 천천히 수렴하는 값이 나옵니다.
#[derive(Debug, Clone, Copy)]
pub struct EMABuilder {
    /// EMA 계산 기간
    pub period: usize,
}

/// 지수이동평균(EMA) 기술적 지표
#[derive(Clone, Debug, PartialEq)]
pub struct EMA {
    /// EMA 계산 기간
    period: usize,
    /// 최신 EMA 값
    ema: f64,
}

impl Display for EMA {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EMA({}: {:.2})", self.period, self.ema)
    }
}

impl MA for EMA {
    fn get(&self) -> f64 {
        self.ema
    }

    fn period(&self) -> usize {
        self.period
    }
}

impl EMABuilder {
    /// 새 EMA 빌더 생성
    pub fn new(period: usize) -> Self {
        EMABuilder { period }
    }

    /// 캔들 시리즈의 종가로 EMA 계산
    pub fn build(&self, series: &CandleSeries) -> Result<EMA, IndicatorError> {
        self.build_from_values(&series.closes())
    }

    /// 값 배열에서 최신 EMA 계산
    pub fn build_from_values(&self, values: &[f64]) -> Result<EMA, IndicatorError> {
        let series = self.series(values)?;
        let ema = series[series.len() - 1];
        Ok(EMA {
            period: self.period,
            ema,
        })
    }

    /// 전체 EMA 시계열 계산 (입력과 같은 길이)
    pub fn series(&self, values: &[f64]) -> Result<Vec<f64>, IndicatorError> {
        ensure_period("EMA", self.period)?;
        ensure_len("EMA", values.len(), 1)?;
        let alpha = moving_average::calculate_ema_alpha(self.period);
        Ok(moving_average::ema_series_with_alpha(values, alpha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_calculation() {
        let builder = EMABuilder::new(2);
        let values = [110.0, 120.0, 115.0];
        let ema = builder.build_from_values(&values).unwrap();
        // α = 2/3: 110 -> 116.666.. -> 115.555..
        assert!((ema.get() - 115.55555555555556).abs() < 1e-9);

        let rising = builder.build_from_values(&[110.0, 120.0, 115.0, 125.0]).unwrap();
        assert!(rising.get() > ema.get());
    }

    #[test]
    fn test_ema_constant_series_is_exact() {
        let values = vec![42.5; 300];
        for period in [1, 5, 20, 50, 500] {
            let series = EMABuilder::new(period).series(&values).unwrap();
            assert!(series.iter().all(|v| *v == 42.5));
        }
    }

    #[test]
    fn test_period_longer_than_series_is_legal() {
        let ema = EMABuilder::new(100).build_from_values(&[1.0, 2.0, 3.0]).unwrap();
        assert!(ema.get() > 1.0 && ema.get() < 2.0);
    }

    #[test]
    fn test_invalid_period() {
        assert_eq!(
            EMABuilder::new(0).build_from_values(&[1.0]),
            Err(IndicatorError::InvalidPeriod { indicator: "EMA" })
        );
    }

    #[test]
    fn test_empty_data() {
        assert!(matches!(
            EMABuilder::new(5).build_from_values(&[]),
            Err(IndicatorError::InsufficientData { required: 1, actual: 0, .. })
        ));
    }
}
