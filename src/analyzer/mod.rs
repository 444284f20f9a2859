// 시장 분석기 모듈
// 캔들 시리즈에서 구조 돌파, 수요/공급 구역, 거래량 이상 징후를 판정합니다.

pub mod market_structure_analyzer;
pub mod volume_analyzer;

pub use market_structure_analyzer::{
    MarketStructureAnalysis, MarketStructureAnalyzer, StructureBreak, Zone, ZoneKind,
};
pub use volume_analyzer::{VolumeAnalyzer, VolumeMode, VolumeSource, VolumeVerdict};
