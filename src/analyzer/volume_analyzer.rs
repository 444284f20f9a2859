use crate::candle_series::CandleSeries;
use crate::config::VolumeConfig;
use crate::indicator::IndicatorError;
use crate::indicator::volume::{Volume, VolumeBuilder};
use crate::model::Timeframe;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 스파이크 판정에 쓰는 테스트 묶음
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    /// 비율 테스트만
    RatioOnly,
    /// 비율 / z-점수 / 램프 중 하나라도 통과
    Combined,
}

impl Display for VolumeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeMode::RatioOnly => write!(f, "ratio"),
            VolumeMode::Combined => write!(f, "combined"),
        }
    }
}

/// 분석할 값의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    /// 거래대금 (호가 자산 기준)
    Turnover,
    /// 거래량 (기초 자산 기준)
    Volume,
}

impl VolumeSource {
    /// 시리즈에서 값 배열을 꺼냄
    ///
    /// 거래대금은 추정하지 않으며 없으면 MissingValues 오류입니다.
    pub fn values(&self, series: &CandleSeries) -> Result<Vec<f64>, IndicatorError> {
        match self {
            VolumeSource::Volume => Ok(series.volumes()),
            VolumeSource::Turnover => series.turnovers().ok_or(IndicatorError::MissingValues {
                indicator: "Volume",
                field: "turnover",
            }),
        }
    }
}

/// 거래량 이상 징후 판정 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeVerdict {
    pub timeframe: Timeframe,
    pub is_spike: bool,
    pub ratio: f64,
    pub z_score: f64,
    pub ramp: f64,
    pub mode: VolumeMode,
    /// 이 타임프레임에 적용한 비율 임계값
    pub threshold: f64,
}

impl Display for VolumeVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} x{:.2} z:{:.2} ramp:{:.2}{}",
            self.timeframe,
            self.ratio,
            self.z_score,
            self.ramp,
            if self.is_spike { " (spike)" } else { "" }
        )
    }
}

/// 거래량 분석기
#[derive(Debug, Clone)]
pub struct VolumeAnalyzer<'a> {
    config: &'a VolumeConfig,
}

impl<'a> VolumeAnalyzer<'a> {
    pub fn new(config: &'a VolumeConfig) -> Self {
        VolumeAnalyzer { config }
    }

    /// 시리즈의 타임프레임 임계값으로 스파이크 판정
    ///
    /// # Arguments
    /// * `series` - 캔들 시리즈
    ///
    /// # Returns
    /// * `Result<VolumeVerdict, IndicatorError>` - 판정 결과 (데이터 부족/누락 시 오류)
    pub fn analyze(&self, series: &CandleSeries) -> Result<VolumeVerdict, IndicatorError> {
        let values = self.config.source.values(series)?;
        let stats = VolumeBuilder::new(self.config.period, self.config.baseline, self.config.window)
            .build(&values)?;
        let threshold = self.config.threshold_for(series.timeframe());

        Ok(self.verdict(series.timeframe(), &stats, threshold))
    }

    fn verdict(&self, timeframe: Timeframe, stats: &Volume, threshold: f64) -> VolumeVerdict {
        let ratio_hit = stats.ratio >= threshold;
        let is_spike = match self.config.mode {
            VolumeMode::RatioOnly => ratio_hit,
            VolumeMode::Combined => {
                ratio_hit
                    || stats.z_score >= self.config.z_threshold
                    || stats.ramp >= self.config.ramp_threshold
            }
        };

        VolumeVerdict {
            timeframe,
            is_spike,
            ratio: stats.ratio,
            z_score: stats.z_score,
            ramp: stats.ramp,
            mode: self.config.mode,
            threshold,
        }
    }
}
