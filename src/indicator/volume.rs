use crate::indicator::ma::{MABuilderFactory, MAType};
use crate::indicator::utils::statistics;
use crate::indicator::{EPSILON, IndicatorError, ensure_len, ensure_period, safe_div};
use std::fmt::Display;

/// 램프 테스트에서 합산하는 최근 봉 수
pub const RAMP_BARS: usize = 3;

/// 거래량(또는 거래대금) 이상 징후 통계 빌더
///
/// 세 가지 독립 통계를 계산합니다.
/// - 비율: 최신 값 / 직전 봉 기준선 (EMA 또는 직전 period 개 SMA)
/// - 로그 z-점수: (ln 최신 - median(ln 윈도우)) / stdev(ln 윈도우)
/// - 램프: 최근 3봉 합 / (3 × 윈도우 평균)
#[derive(Debug, Clone, Copy)]
pub struct VolumeBuilder {
    /// 기준선 계산 기간
    period: usize,
    /// 기준선 방식
    baseline: MAType,
    /// z-점수/램프 윈도우 (최신 값 포함)
    window: usize,
}

/// 볼륨 분석 결과
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    period: usize,
    /// 최신 값
    pub current: f64,
    /// 직전 봉 기준선
    pub baseline: f64,
    /// 최신 값 / 기준선
    pub ratio: f64,
    /// 로그 z-점수
    pub z_score: f64,
    /// 램프 비율
    pub ramp: f64,
}

impl Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Volume({}: current={:.2}, base={:.2}, ratio={:.2}, z={:.2}, ramp={:.2})",
            self.period, self.current, self.baseline, self.ratio, self.z_score, self.ramp
        )
    }
}

impl VolumeBuilder {
    /// 새 볼륨 빌더 생성
    ///
    /// # Arguments
    /// * `period` - 기준선 기간
    /// * `baseline` - 기준선 방식 (EMA 또는 SMA)
    /// * `window` - z-점수/램프 윈도우
    pub fn new(period: usize, baseline: MAType, window: usize) -> Self {
        VolumeBuilder {
            period,
            baseline,
            window,
        }
    }

    /// 계산에 필요한 최소 값 개수
    pub fn required_len(&self) -> usize {
        let ratio_len = match self.baseline {
            MAType::EMA => 2,
            MAType::SMA => self.period + 1,
        };
        ratio_len.max(self.window).max(RAMP_BARS)
    }

    /// 값 배열(시간 순)에서 세 가지 통계 계산
    pub fn build(&self, values: &[f64]) -> Result<Volume, IndicatorError> {
        ensure_period("Volume", self.period)?;
        if self.window < 2 {
            return Err(IndicatorError::InvalidPeriod {
                indicator: "Volume",
            });
        }
        ensure_len("Volume", values.len(), self.required_len())?;

        let current = values[values.len() - 1];
        let baseline = self.baseline_value(values)?;

        Ok(Volume {
            period: self.period,
            current,
            baseline,
            ratio: safe_div(current, baseline),
            z_score: log_z_score(&values[values.len() - self.window..]),
            ramp: ramp(values, self.window),
        })
    }

    /// 직전 봉 시점의 기준선
    fn baseline_value(&self, values: &[f64]) -> Result<f64, IndicatorError> {
        let preceding = &values[..values.len() - 1];
        Ok(MABuilderFactory::build(self.baseline, self.period, preceding)?.get())
    }
}

/// 윈도우(최신 값 포함)의 로그 z-점수
///
/// 표준편차가 0 이면 분자도 0 이 되어 결과는 0 입니다.
fn log_z_score(window: &[f64]) -> f64 {
    let logs: Vec<f64> = window.iter().map(|v| v.max(EPSILON).ln()).collect();
    let latest = logs[logs.len() - 1];
    let center = statistics::median(&logs);
    let spread = statistics::sample_std(&logs);
    safe_div(latest - center, spread)
}

/// 최근 3봉 합 / (3 × 윈도우 평균)
fn ramp(values: &[f64], window: usize) -> f64 {
    let recent: f64 = values[values.len() - RAMP_BARS..].iter().sum();
    let mean = statistics::mean(&values[values.len() - window..]);
    safe_div(recent, RAMP_BARS as f64 * mean)
}
