use crate::analyzer::market_structure_analyzer::{
    MarketStructureAnalysis, MarketStructureAnalyzer, StructureBreak,
};
use crate::analyzer::volume_analyzer::{VolumeAnalyzer, VolumeVerdict};
use crate::candle_series::MarketSnapshot;
use crate::config::{EngineConfig, IndicatorConfig, StructureConfig, VolumeConfig};
use crate::indicator::IndicatorFrame;
use crate::model::{Side, Timeframe};
use crate::signal::{Evidence, SignalScope};
use crate::signal_builder::SkipReason;
use crate::strategy::{Classification, SignalStrategy, StrategyType};
use log::{debug, trace};
use std::fmt::Display;

/// 구조 돌파 + 수요/공급 구역 + 거래량 게이트 전략
///
/// - BUY: 상방 돌파(BoS↑) 이면서 최신 종가가 수요 구역 안
/// - SELL: 하방 이탈(BoS↓) 이면서 최신 종가가 공급 구역 안
///
/// 설정된 거래량 타임프레임 중 하나라도 이상 징후가 있어야 신호를 냅니다.
/// RSI, MACD, EMA 추세, ADX 는 참고용이며 판정에 쓰지 않습니다.
#[derive(Debug, Clone)]
pub struct StructureVolumeStrategy {
    indicators: IndicatorConfig,
    structure: StructureConfig,
    volume: VolumeConfig,
}

impl StructureVolumeStrategy {
    pub fn new(config: &EngineConfig) -> Self {
        StructureVolumeStrategy {
            indicators: config.indicators.clone(),
            structure: config.structure.clone(),
            volume: config.volume.clone(),
        }
    }

    /// 거래량 타임프레임별 판정
    ///
    /// 데이터가 없거나 짧은 타임프레임은 건너뜁니다.
    fn volume_verdicts(&self, snapshot: &MarketSnapshot) -> Vec<VolumeVerdict> {
        let analyzer = VolumeAnalyzer::new(&self.volume);
        let mut verdicts = Vec::new();

        for &timeframe in &self.volume.timeframes {
            let Some(series) = snapshot.get(timeframe) else {
                trace!("{} {} 거래량 데이터 없음", snapshot.symbol(), timeframe);
                continue;
            };
            if series.len() < self.volume.min_len {
                trace!(
                    "{} {} 거래량 데이터 부족: {} < {}",
                    snapshot.symbol(),
                    timeframe,
                    series.len(),
                    self.volume.min_len
                );
                continue;
            }
            match analyzer.analyze(series) {
                Ok(verdict) => verdicts.push(verdict),
                Err(e) => debug!("{} {} 거래량 판정 생략: {}", snapshot.symbol(), timeframe, e),
            }
        }

        verdicts
    }

    fn skip_reason(analysis: &MarketStructureAnalysis) -> SkipReason {
        match analysis.structure_break {
            StructureBreak::Up if analysis.demand.is_none() => SkipReason::NoZone,
            StructureBreak::Down if analysis.supply.is_none() => SkipReason::NoZone,
            _ => SkipReason::NoSetup,
        }
    }
}

impl SignalStrategy for StructureVolumeStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::StructureVolume
    }

    fn scopes(&self) -> Vec<SignalScope> {
        vec![SignalScope::Timeframe(self.structure.timeframe)]
    }

    fn timeframes(&self) -> Vec<Timeframe> {
        let mut timeframes = vec![self.structure.timeframe];
        for tf in &self.volume.timeframes {
            if !timeframes.contains(tf) {
                timeframes.push(*tf);
            }
        }
        timeframes
    }

    fn anchor(&self, _scope: SignalScope) -> Timeframe {
        self.structure.timeframe
    }

    fn classify(
        &self,
        _scope: SignalScope,
        snapshot: &MarketSnapshot,
    ) -> Result<Classification, SkipReason> {
        let series = snapshot
            .get(self.structure.timeframe)
            .ok_or(SkipReason::MissingTimeframe)?;

        let volume = self.volume_verdicts(snapshot);
        if !volume.iter().any(|v| v.is_spike) {
            return Err(SkipReason::NoVolumeEvidence);
        }

        let analysis = MarketStructureAnalyzer::new(&self.structure).analyze(series)?;
        trace!("{} {}", snapshot.symbol(), analysis);

        let (side, zone) = if analysis.is_buy_setup() {
            (Side::Buy, analysis.demand)
        } else if analysis.is_sell_setup() {
            (Side::Sell, analysis.supply)
        } else {
            return Err(Self::skip_reason(&analysis));
        };

        // 참고 지표는 계산에 실패해도 신호를 막지 않음
        let frame = IndicatorFrame::compute(series, &self.indicators).ok();

        Ok(Classification {
            side,
            strength: None,
            evidence: Evidence {
                trend: frame.as_ref().map(|f| f.trend),
                rsi: frame.as_ref().map(|f| f.rsi.value()),
                macd_direction: frame.as_ref().map(|f| f.macd_direction()),
                structure_break: Some(analysis.structure_break),
                zone,
                volume,
                adx: frame.as_ref().map(|f| f.adx.adx),
                atr_pct: frame.as_ref().map(|f| f.atr_pct()),
                ..Evidence::default()
            },
        })
    }
}

impl Display for StructureVolumeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let volume_tfs: Vec<&str> = self.volume.timeframes.iter().map(|tf| tf.as_str()).collect();
        write!(
            f,
            "구조+거래량 전략 (구조: {}, BoS {}/{}, 거래량: {})",
            self.structure.timeframe,
            self.structure.bos_lookback,
            self.structure.bos_exclude_last,
            volume_tfs.join(",")
        )
    }
}
