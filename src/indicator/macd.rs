use crate::candle_series::CandleSeries;
use crate::indicator::utils::moving_average;
use crate::indicator::{IndicatorError, ensure_len, ensure_period};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// MACD 최소 데이터 길이
const MIN_POINTS: usize = 2;

/// MACD 라인과 시그널 라인의 관계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MACDDirection {
    /// MACD 라인 > 시그널 라인
    Up,
    /// MACD 라인 < 시그널 라인
    Down,
    /// 정확히 같음
    Flat,
}

impl Display for MACDDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MACDDirection::Up => write!(f, "up"),
            MACDDirection::Down => write!(f, "down"),
            MACDDirection::Flat => write!(f, "flat"),
        }
    }
}

/// MACD(Moving Average Convergence Divergence) 계산을 위한 빌더
///
/// MACD는 두 개의 이동평균선(빠른 EMA와 느린 EMA)의 차이를 계산하고,
/// 이 값에 대한 시그널 라인(MACD의 EMA)을 제공하는 기술적 지표입니다.
#[derive(Debug, Clone, Copy)]
pub struct MACDBuilder {
    /// 빠른 EMA 기간 (일반적으로 12)
    fast_period: usize,
    /// 느린 EMA 기간 (일반적으로 26)
    slow_period: usize,
    /// 시그널 라인 기간 (일반적으로 9)
    signal_period: usize,
}

/// MACD(Moving Average Convergence Divergence) 기술적 지표
///
/// MACD는 추세 추종 모멘텀 지표로, 추세의 방향과 강도를 나타냅니다.
#[derive(Clone, Debug, PartialEq)]
pub struct MACD {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    /// MACD 라인 (빠른 EMA - 느린 EMA)
    pub macd_line: f64,
    /// 시그널 라인 (MACD의 EMA)
    pub signal_line: f64,
    /// 히스토그램 (MACD - 시그널)
    pub histogram: f64,
}

/// MACD 전체 시계열 (세 벡터 모두 입력과 같은 길이)
#[derive(Clone, Debug, PartialEq)]
pub struct MACDSeries {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Display for MACD {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MACD({},{},{}: {:.2}, {:.2}, {:.2})",
            self.fast_period,
            self.slow_period,
            self.signal_period,
            self.macd_line,
            self.signal_line,
            self.histogram
        )
    }
}

impl MACD {
    /// 라인과 시그널의 관계 (정확히 같으면 Flat)
    pub fn direction(&self) -> MACDDirection {
        direction_of(self.macd_line, self.signal_line)
    }

    /// (빠른, 느린, 시그널) 기간
    pub fn periods(&self) -> (usize, usize, usize) {
        (self.fast_period, self.slow_period, self.signal_period)
    }
}

fn direction_of(line: f64, signal: f64) -> MACDDirection {
    if line > signal {
        MACDDirection::Up
    } else if line < signal {
        MACDDirection::Down
    } else {
        MACDDirection::Flat
    }
}

impl MACDSeries {
    /// 마지막 봉에서 히스토그램 부호가 바뀌었는지 (라인이 시그널을 교차)
    ///
    /// # Returns
    /// * `Option<MACDDirection>` - 상향 교차면 Up, 하향 교차면 Down, 교차 없으면 None
    pub fn latest_cross(&self) -> Option<MACDDirection> {
        let len = self.histogram.len();
        if len < 2 {
            return None;
        }
        let prev = self.histogram[len - 2];
        let curr = self.histogram[len - 1];
        if prev <= 0.0 && curr > 0.0 {
            Some(MACDDirection::Up)
        } else if prev >= 0.0 && curr < 0.0 {
            Some(MACDDirection::Down)
        } else {
            None
        }
    }
}

impl MACDBuilder {
    /// 새 MACD 빌더 생성
    ///
    /// # Arguments
    /// * `fast_period` - 빠른 EMA 기간 (기본값 12)
    /// * `slow_period` - 느린 EMA 기간 (기본값 26)
    /// * `signal_period` - 시그널 라인 기간 (기본값 9)
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }

    /// 캔들 시리즈의 종가로 MACD 생성
    pub fn build(&self, series: &CandleSeries) -> Result<MACD, IndicatorError> {
        self.build_from_values(&series.closes())
    }

    /// 값 배열에서 최신 MACD 계산
    pub fn build_from_values(&self, values: &[f64]) -> Result<MACD, IndicatorError> {
        let series = self.series(values)?;
        let last = series.macd_line.len() - 1;

        Ok(MACD {
            fast_period: self.fast_period,
            slow_period: self.slow_period,
            signal_period: self.signal_period,
            macd_line: series.macd_line[last],
            signal_line: series.signal_line[last],
            histogram: series.histogram[last],
        })
    }

    /// 전체 MACD 시계열 계산
    ///
    /// 히스토그램은 `라인 - 시그널` 그대로이며 별도 보정을 하지 않습니다.
    pub fn series(&self, values: &[f64]) -> Result<MACDSeries, IndicatorError> {
        ensure_period("MACD", self.fast_period)?;
        ensure_period("MACD", self.slow_period)?;
        ensure_period("MACD", self.signal_period)?;
        ensure_len("MACD", values.len(), MIN_POINTS)?;

        let fast = moving_average::ema_series_with_alpha(
            values,
            moving_average::calculate_ema_alpha(self.fast_period),
        );
        let slow = moving_average::ema_series_with_alpha(
            values,
            moving_average::calculate_ema_alpha(self.slow_period),
        );

        let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal_line = moving_average::ema_series_with_alpha(
            &macd_line,
            moving_average::calculate_ema_alpha(self.signal_period),
        );
        let histogram = macd_line
            .iter()
            .zip(&signal_line)
            .map(|(line, signal)| line - signal)
            .collect();

        Ok(MACDSeries {
            macd_line,
            signal_line,
            histogram,
        })
    }
}
