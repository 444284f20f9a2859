use crate::analyzer::volume_analyzer::{VolumeMode, VolumeSource};
use crate::config_loader::{ConfigError, ConfigResult, ConfigValidation};
use crate::indicator::MAType;
use crate::model::Timeframe;
use crate::strategy::StrategyType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// 지표 기간 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// 추세 판단용 빠른 EMA 기간
    pub ema_fast: usize,
    /// 추세 판단용 느린 EMA 기간
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub adx_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            ema_fast: 20,
            ema_slow: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            adx_period: 14,
        }
    }
}

/// 시장 구조(BoS/구역) 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// 구조 판단 타임프레임
    pub timeframe: Timeframe,
    /// 돌파 기준 구간 길이
    pub bos_lookback: usize,
    /// 기준 구간에서 제외할 최근 봉 수
    pub bos_exclude_last: usize,
    /// 구역 탐색 구간 길이
    pub zone_lookback: usize,
    /// 구역 포함 여유 비율
    pub zone_tolerance: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        StructureConfig {
            timeframe: Timeframe::Hour4,
            bos_lookback: 40,
            bos_exclude_last: 2,
            zone_lookback: 60,
            zone_tolerance: 0.015,
        }
    }
}

/// 거래량 이상 징후 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub mode: VolumeMode,
    pub source: VolumeSource,
    /// 비율 테스트 기준선 방식
    pub baseline: MAType,
    /// 기준선 기간
    pub period: usize,
    /// z-점수/램프 윈도우
    pub window: usize,
    pub z_threshold: f64,
    pub ramp_threshold: f64,
    /// 표에 없는 타임프레임의 비율 임계값
    pub default_threshold: f64,
    /// 타임프레임 라벨별 비율 임계값 ("1h" = 2.5)
    pub thresholds: BTreeMap<String, f64>,
    /// 구조+거래량 전략에서 확인하는 타임프레임
    pub timeframes: Vec<Timeframe>,
    /// 거래량 판정에 필요한 최소 봉 수 (미달 타임프레임은 건너뜀)
    pub min_len: usize,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        let thresholds = [("1h", 2.5), ("4h", 2.5), ("1d", 2.0)]
            .into_iter()
            .map(|(tf, r)| (tf.to_string(), r))
            .collect();

        VolumeConfig {
            mode: VolumeMode::Combined,
            source: VolumeSource::Turnover,
            baseline: MAType::EMA,
            period: 20,
            window: 20,
            z_threshold: 1.0,
            ramp_threshold: 1.5,
            default_threshold: 2.5,
            thresholds,
            timeframes: vec![Timeframe::Hour1, Timeframe::Hour4, Timeframe::Day1],
            min_len: 50,
        }
    }
}

impl VolumeConfig {
    /// 타임프레임의 비율 임계값
    pub fn threshold_for(&self, timeframe: Timeframe) -> f64 {
        self.thresholds
            .get(timeframe.as_str())
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// 신호 생성 전 사전 조건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 기준 시리즈의 최소 봉 수
    pub min_history: usize,
    /// 최신 거래대금 하한 (None 이면 검사 안 함)
    pub min_turnover: Option<f64>,
    /// 마지막 두 종가 사이 최대 변화율 (None 이면 검사 안 함)
    pub max_gap_pct: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            min_history: 60,
            min_turnover: Some(200_000.0),
            max_gap_pct: Some(0.08),
        }
    }
}

/// 전략 선택 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub strategy_type: StrategyType,
    /// 추세 전략이 평가하는 타임프레임 (긴 것부터)
    pub timeframes: Vec<Timeframe>,
    /// NEUTRAL 결과도 신호로 내보낼지 여부 (기본값 false)
    pub emit_neutral: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            strategy_type: StrategyType::StructureVolume,
            timeframes: vec![Timeframe::Day1, Timeframe::Hour4, Timeframe::Hour1],
            emit_neutral: false,
        }
    }
}

/// 스캔 실행 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 병렬 작업자 수
    pub workers: usize,
    /// 타임프레임별 요청 캔들 수
    pub candle_limit: usize,
    /// 한 번에 전달할 최대 신호 수
    pub max_signals: usize,
    /// 고정 심볼 목록 (비어 있으면 데이터 디렉터리에서 찾음)
    pub symbols: Vec<String>,
    /// 캔들 JSON 파일 디렉터리
    pub data_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            workers: 4,
            candle_limit: 300,
            max_signals: 10,
            symbols: Vec::new(),
            data_dir: None,
        }
    }
}

/// 엔진 전체 설정
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indicators: IndicatorConfig,
    pub structure: StructureConfig,
    pub volume: VolumeConfig,
    pub filters: FilterConfig,
    pub strategy: StrategyConfig,
    pub scan: ScanConfig,
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

impl ConfigValidation for IndicatorConfig {
    fn validate(&self) -> ConfigResult<()> {
        let periods = [
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("atr_period", self.atr_period),
            ("adx_period", self.adx_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(invalid(format!("{name}은(는) 0보다 커야 합니다")));
        }
        if self.ema_fast >= self.ema_slow {
            return Err(invalid("ema_fast는 ema_slow보다 작아야 합니다"));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(invalid("macd_fast는 macd_slow보다 작아야 합니다"));
        }
        Ok(())
    }
}

impl ConfigValidation for StructureConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.bos_lookback == 0 || self.bos_exclude_last == 0 {
            return Err(invalid("bos_lookback과 bos_exclude_last는 1 이상이어야 합니다"));
        }
        if self.zone_lookback < 3 {
            return Err(invalid("zone_lookback은 3 이상이어야 합니다"));
        }
        if !(self.zone_tolerance >= 0.0) {
            return Err(invalid("zone_tolerance는 0 이상이어야 합니다"));
        }
        Ok(())
    }
}

impl ConfigValidation for VolumeConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.period == 0 {
            return Err(invalid("volume.period는 0보다 커야 합니다"));
        }
        if self.window < 3 {
            return Err(invalid("volume.window는 3 이상이어야 합니다"));
        }
        if self.timeframes.is_empty() {
            return Err(invalid("volume.timeframes가 비어 있습니다"));
        }
        if !(self.default_threshold > 0.0) {
            return Err(invalid("volume.default_threshold는 0보다 커야 합니다"));
        }
        for (label, threshold) in &self.thresholds {
            Timeframe::from_str(label)
                .map_err(|e| invalid(format!("volume.thresholds 키 오류: {e}")))?;
            if !(*threshold > 0.0) {
                return Err(invalid(format!(
                    "volume.thresholds[{label}]는 0보다 커야 합니다: {threshold}"
                )));
            }
        }
        Ok(())
    }
}

impl ConfigValidation for FilterConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.min_history == 0 {
            return Err(invalid("filters.min_history는 0보다 커야 합니다"));
        }
        if let Some(floor) = self.min_turnover {
            if !(floor >= 0.0) {
                return Err(invalid("filters.min_turnover는 0 이상이어야 합니다"));
            }
        }
        if let Some(gap) = self.max_gap_pct {
            if !(gap > 0.0) {
                return Err(invalid("filters.max_gap_pct는 0보다 커야 합니다"));
            }
        }
        Ok(())
    }
}

impl ConfigValidation for StrategyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.timeframes.is_empty() {
            return Err(invalid("strategy.timeframes가 비어 있습니다"));
        }
        Ok(())
    }
}

impl ConfigValidation for ScanConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(invalid("scan.workers는 1 이상이어야 합니다"));
        }
        if self.candle_limit == 0 {
            return Err(invalid("scan.candle_limit는 0보다 커야 합니다"));
        }
        Ok(())
    }
}

impl ConfigValidation for EngineConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.indicators.validate()?;
        self.structure.validate()?;
        self.volume.validate()?;
        self.filters.validate()?;
        self.strategy.validate()?;
        self.scan.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.structure.bos_lookback, 40);
        assert_eq!(config.filters.max_gap_pct, Some(0.08));
    }

    #[test]
    fn test_threshold_lookup() {
        let config = VolumeConfig::default();
        assert_eq!(config.threshold_for(Timeframe::Day1), 2.0);
        assert_eq!(config.threshold_for(Timeframe::Hour1), 2.5);
        assert_eq!(config.threshold_for(Timeframe::Minute15), 2.5);
    }

    #[test]
    fn test_invalid_threshold_key() {
        let mut config = EngineConfig::default();
        config.volume.thresholds.insert("3h".to_string(), 1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_periods() {
        let mut config = EngineConfig::default();
        config.indicators.ema_fast = 60;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.scan.workers = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.filters.max_gap_pct = Some(0.0);
        assert!(config.validate().is_err());
    }
}
