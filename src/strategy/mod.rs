pub mod structure_volume_strategy;
pub mod trend_momentum_strategy;
pub mod trend_volume_strategy;

use crate::candle_series::MarketSnapshot;
use crate::config::EngineConfig;
use crate::model::{Side, Strength, Timeframe};
use crate::signal::{Evidence, SignalScope};
use crate::signal_builder::SkipReason;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub use structure_volume_strategy::StructureVolumeStrategy;
pub use trend_momentum_strategy::TrendMomentumStrategy;
pub use trend_volume_strategy::TrendVolumeStrategy;

/// 신호 분류 전략 유형
///
/// 두 가지 융합 방식과 타임프레임별 추세+거래량 방식을 선택할 수 있습니다.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// 구조 돌파 + 구역 + 거래량 게이트 (방향성)
    StructureVolume,
    /// 여러 타임프레임 추세/모멘텀 브레드스 투표 (강도 라벨)
    TrendMomentum,
    /// 타임프레임별 추세 + RSI, 거래량 게이트
    TrendVolume,
}

impl Display for StrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyType::StructureVolume => write!(f, "structure_volume"),
            StrategyType::TrendMomentum => write!(f, "trend_momentum"),
            StrategyType::TrendVolume => write!(f, "trend_volume"),
        }
    }
}

impl FromStr for StrategyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "structure_volume" => Ok(StrategyType::StructureVolume),
            "trend_momentum" => Ok(StrategyType::TrendMomentum),
            "trend_volume" => Ok(StrategyType::TrendVolume),
            other => Err(format!("지원되지 않는 전략 타입: {other}")),
        }
    }
}

/// 분류 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub side: Side,
    pub strength: Option<Strength>,
    pub evidence: Evidence,
}

/// 신호 분류 전략 인터페이스
///
/// 모든 전략은 순수 함수처럼 동작해야 하며 심볼 간 상태를 공유하지 않습니다.
pub trait SignalStrategy: Display + Send + Sync {
    /// 전략의 타입 반환
    fn strategy_type(&self) -> StrategyType;

    /// 심볼마다 평가할 범위 목록
    fn scopes(&self) -> Vec<SignalScope>;

    /// 평가에 필요한 모든 타임프레임 (공급자에게 요청할 목록)
    fn timeframes(&self) -> Vec<Timeframe>;

    /// 사전 조건을 검사할 기준 타임프레임
    ///
    /// # Arguments
    /// * `scope` - 평가 범위
    fn anchor(&self, scope: SignalScope) -> Timeframe;

    /// 조회에 실패하면 범위 전체를 평가할 수 없는 타임프레임
    ///
    /// 기본값은 기준 타임프레임 하나이며, 나머지 타임프레임의 조회 실패는 건너뜁니다.
    fn required_timeframes(&self, scope: SignalScope) -> Vec<Timeframe> {
        vec![self.anchor(scope)]
    }

    /// 범위 하나를 분류
    ///
    /// # Arguments
    /// * `scope` - 평가 범위
    /// * `snapshot` - 심볼의 타임프레임별 시리즈
    ///
    /// # Returns
    /// * `Result<Classification, SkipReason>` - 분류 결과 또는 건너뛴 이유
    fn classify(
        &self,
        scope: SignalScope,
        snapshot: &MarketSnapshot,
    ) -> Result<Classification, SkipReason>;
}

/// 전략 팩토리
///
/// 전략 유형과 엔진 설정으로 전략 인스턴스를 생성합니다.
pub struct StrategyFactory;

impl StrategyFactory {
    /// 전략 인스턴스 생성
    ///
    /// # Arguments
    /// * `strategy_type` - 생성할 전략 유형
    /// * `config` - 엔진 설정
    ///
    /// # Returns
    /// * `Box<dyn SignalStrategy>` - 생성된 전략
    pub fn build(strategy_type: StrategyType, config: &EngineConfig) -> Box<dyn SignalStrategy> {
        info!("전략 빌드 시작: {strategy_type}");

        let strategy: Box<dyn SignalStrategy> = match strategy_type {
            StrategyType::StructureVolume => {
                debug!("구조+거래량 전략 초기화");
                Box::new(StructureVolumeStrategy::new(config))
            }
            StrategyType::TrendMomentum => {
                debug!("추세+모멘텀 전략 초기화");
                Box::new(TrendMomentumStrategy::new(config))
            }
            StrategyType::TrendVolume => {
                debug!("추세+거래량 전략 초기화");
                Box::new(TrendVolumeStrategy::new(config))
            }
        };

        info!("전략 빌드 완료: {strategy}");
        strategy
    }

    /// 설정 파일에 지정된 전략 생성
    pub fn from_config(config: &EngineConfig) -> Box<dyn SignalStrategy> {
        Self::build(config.strategy.strategy_type, config)
    }
}
