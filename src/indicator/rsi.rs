use crate::candle_series::CandleSeries;
use crate::indicator::utils::moving_average;
use crate::indicator::{EPSILON, IndicatorError, ensure_len, ensure_period};
use std::fmt::Display;

/// RSI 최소 데이터 길이 (첫 차분 하나가 필요)
const MIN_POINTS: usize = 2;

/// 와일더 평활 RSI 시계열 계산
///
/// 상승분과 하락분을 각각 α = 1/period 로 평활하며, 첫 차분으로 시드합니다.
/// 결과 길이는 `values.len() - 1` 입니다.
fn calculate_rsi_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = moving_average::calculate_wilder_alpha(period);
    let mut result = Vec::with_capacity(values.len().saturating_sub(1));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, window) in values.windows(2).enumerate() {
        let change = window[1] - window[0];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = moving_average::calculate_ema_step(gain, avg_gain, alpha);
            avg_loss = moving_average::calculate_ema_step(loss, avg_loss, alpha);
        }

        // 분자/분모 모두 엡실론을 더해 변화가 없는 구간에서 RS → 1 (RSI 50)
        let rs = (avg_gain + EPSILON) / (avg_loss + EPSILON);
        result.push(100.0 - 100.0 / (1.0 + rs));
    }

    result
}

/// 상대강도지수(RSI) 기술적 지표 빌더
#[derive(Debug, Clone, Copy)]
pub struct RSIBuilder {
    /// RSI 계산 기간
    period: usize,
}

/// 상대강도지수(RSI) 기술적 지표
///
/// RSI는 가격 변동의 상대적 강도를 측정하여 과매수/과매도 상태를 판단
#[derive(Clone, Debug, PartialEq)]
pub struct RSI {
    /// RSI 계산 기간
    period: usize,
    /// RSI 값 (0-100)
    pub value: f64,
}

impl Display for RSI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RSI({}: {:.2})", self.period, self.value)
    }
}

impl RSI {
    /// RSI가 과매수 상태인지 확인 (일반적으로 70 이상)
    ///
    /// # Arguments
    /// * `threshold` - 과매수 기준값 (기본값 70.0)
    ///
    /// # Returns
    /// * `bool` - 과매수 여부
    pub fn is_overbought(&self, threshold: Option<f64>) -> bool {
        self.value >= threshold.unwrap_or(70.0)
    }

    /// RSI가 과매도 상태인지 확인 (일반적으로 30 이하)
    ///
    /// # Arguments
    /// * `threshold` - 과매도 기준값 (기본값 30.0)
    ///
    /// # Returns
    /// * `bool` - 과매도 여부
    pub fn is_oversold(&self, threshold: Option<f64>) -> bool {
        self.value <= threshold.unwrap_or(30.0)
    }

    /// 중립선(50) 위인지 확인 (50 은 어느 쪽에도 속하지 않음)
    pub fn is_bullish(&self) -> bool {
        self.value > 50.0
    }

    /// 중립선(50) 아래인지 확인
    pub fn is_bearish(&self) -> bool {
        self.value < 50.0
    }

    /// RSI 기간 반환
    pub fn period(&self) -> usize {
        self.period
    }

    /// RSI 값 반환
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl RSIBuilder {
    /// 새 RSI 빌더 생성
    ///
    /// # Arguments
    /// * `period` - RSI 계산 기간 (일반적으로 14)
    ///
    /// # Returns
    /// * `RSIBuilder` - 새 RSI 빌더 인스턴스
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// 캔들 시리즈의 종가로 RSI 지표 생성
    ///
    /// # Arguments
    /// * `series` - 캔들 시리즈
    ///
    /// # Returns
    /// * `Result<RSI, IndicatorError>` - 계산된 RSI 또는 데이터 부족 오류
    pub fn build(&self, series: &CandleSeries) -> Result<RSI, IndicatorError> {
        self.build_from_values(&series.closes())
    }

    /// 값 배열에서 최신 RSI 계산
    pub fn build_from_values(&self, values: &[f64]) -> Result<RSI, IndicatorError> {
        let series = self.series(values)?;
        let value = series.last().copied().ok_or(IndicatorError::InsufficientData {
            indicator: "RSI",
            required: MIN_POINTS,
            actual: values.len(),
        })?;

        Ok(RSI {
            period: self.period,
            value,
        })
    }

    /// RSI 시계열 계산 (길이 = 입력 길이 - 1)
    pub fn series(&self, values: &[f64]) -> Result<Vec<f64>, IndicatorError> {
        ensure_period("RSI", self.period)?;
        ensure_len("RSI", values.len(), MIN_POINTS)?;
        Ok(calculate_rsi_series(values, self.period))
    }
}
