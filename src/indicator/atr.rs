use crate::candle_series::CandleSeries;
use crate::indicator::utils::moving_average;
use crate::indicator::{IndicatorError, ensure_len, ensure_period, safe_div};
use std::fmt::Display;

/// True Range 시계열
///
/// TR = max(고가-저가, |고가-이전종가|, |저가-이전종가|), 첫 봉은 이전 종가가 없으므로 고가-저가
pub(crate) fn true_range_series(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(highs.len());
    for i in 0..highs.len() {
        let range = highs[i] - lows[i];
        if i == 0 {
            result.push(range);
            continue;
        }
        let prev_close = closes[i - 1];
        let tr = range
            .max((highs[i] - prev_close).abs())
            .max((lows[i] - prev_close).abs());
        result.push(tr);
    }
    result
}

/// ATR(Average True Range) 계산을 위한 빌더
///
/// 첫 TR 로 시드하고 α = 2/(period+1) 의 EMA 로 평활합니다.
#[derive(Debug, Clone, Copy)]
pub struct ATRBuilder {
    /// ATR 계산 기간
    period: usize,
}

/// ATR 값
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ATR {
    period: usize,
    /// ATR 값 (가격 단위)
    pub value: f64,
    /// 최신 종가 대비 ATR 비율 (%)
    pub percent: f64,
}

impl Display for ATR {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ATR({}: {:.4}, {:.2}%)",
            self.period, self.value, self.percent
        )
    }
}

impl ATR {
    pub fn period(&self) -> usize {
        self.period
    }
}

impl ATRBuilder {
    /// 새 ATR 빌더 생성
    pub fn new(period: usize) -> ATRBuilder {
        ATRBuilder { period }
    }

    /// 캔들 시리즈로 최신 ATR 계산
    ///
    /// # Arguments
    /// * `series` - 캔들 시리즈 (최소 period + 1 개)
    ///
    /// # Returns
    /// * `Result<ATR, IndicatorError>` - ATR 값과 최신 종가 대비 비율
    pub fn build(&self, series: &CandleSeries) -> Result<ATR, IndicatorError> {
        let values = self.series(series)?;
        let value = values[values.len() - 1];
        let close = series.latest().close_price();

        Ok(ATR {
            period: self.period,
            value,
            percent: safe_div(value, close.abs()) * 100.0,
        })
    }

    /// 전체 ATR 시계열 계산
    pub fn series(&self, series: &CandleSeries) -> Result<Vec<f64>, IndicatorError> {
        ensure_period("ATR", self.period)?;
        ensure_len("ATR", series.len(), self.period + 1)?;

        let tr = true_range_series(&series.highs(), &series.lows(), &series.closes());
        let alpha = moving_average::calculate_ema_alpha(self.period);
        Ok(moving_average::ema_series_with_alpha(&tr, alpha))
    }
}
