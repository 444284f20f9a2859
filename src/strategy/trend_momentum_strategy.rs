use crate::analyzer::market_structure_analyzer::structure_break;
use crate::candle_series::{CandleSeries, MarketSnapshot};
use crate::config::{EngineConfig, IndicatorConfig, StructureConfig};
use crate::indicator::volume::VolumeBuilder;
use crate::indicator::{IndicatorError, IndicatorFrame, MAType};
use crate::model::{Strength, Timeframe};
use crate::signal::{BreadthScore, Evidence, SignalScope, TimeframeBrief};
use crate::signal_builder::SkipReason;
use crate::strategy::{Classification, SignalStrategy, StrategyType};
use log::{debug, trace};
use std::fmt::Display;

/// 브리핑 거래량 비율의 기준 봉 수
const BRIEF_VOLUME_PERIOD: usize = 20;

/// STRONG/WEAK 판정에 필요한 최소 표 차이
const BREADTH_MARGIN: i64 = 2;

/// 멀티 타임프레임 추세/모멘텀 브레드스 전략
///
/// 타임프레임마다 추세, RSI, MACD 방향, 구조 돌파로 상승/하락 표를 세고
/// 전체 합의 차이로 강도를 정합니다.
/// - STRONG (BUY): 상승 표 - 하락 표 >= 2
/// - WEAK (SELL): 하락 표 - 상승 표 >= 2
/// - 그 외 NEUTRAL
///
/// 설정된 모든 타임프레임이 있어야 평가합니다.
#[derive(Debug, Clone)]
pub struct TrendMomentumStrategy {
    indicators: IndicatorConfig,
    structure: StructureConfig,
    timeframes: Vec<Timeframe>,
    emit_neutral: bool,
}

impl TrendMomentumStrategy {
    pub fn new(config: &EngineConfig) -> Self {
        TrendMomentumStrategy {
            indicators: config.indicators.clone(),
            structure: config.structure.clone(),
            timeframes: config.strategy.timeframes.clone(),
            emit_neutral: config.strategy.emit_neutral,
        }
    }

    /// 타임프레임 하나의 요약 생성
    ///
    /// # Arguments
    /// * `series` - 캔들 시리즈
    ///
    /// # Returns
    /// * `Result<TimeframeBrief, IndicatorError>` - 요약 또는 데이터 부족 오류
    pub fn brief(&self, series: &CandleSeries) -> Result<TimeframeBrief, IndicatorError> {
        let frame = IndicatorFrame::compute(series, &self.indicators)?;
        let structure_break = structure_break(
            series,
            self.structure.bos_lookback,
            self.structure.bos_exclude_last,
        )?;

        // 거래량 비율은 참고용이라 부족하면 비워 둠
        let volume_ratio = VolumeBuilder::new(BRIEF_VOLUME_PERIOD, MAType::SMA, BRIEF_VOLUME_PERIOD)
            .build(&series.volumes())
            .ok()
            .map(|v| v.ratio);

        Ok(TimeframeBrief {
            timeframe: series.timeframe(),
            trend: frame.trend,
            rsi: frame.rsi.value(),
            macd_direction: frame.macd_direction(),
            structure_break,
            volume_ratio,
            atr_pct: frame.atr_pct(),
            price: series.latest_close(),
        })
    }

    /// 표 합계로 강도 결정
    pub fn classify_score(score: BreadthScore) -> Strength {
        let diff = i64::from(score.pos) - i64::from(score.neg);
        if diff >= BREADTH_MARGIN {
            Strength::Strong
        } else if -diff >= BREADTH_MARGIN {
            Strength::Weak
        } else {
            Strength::Neutral
        }
    }
}

impl SignalStrategy for TrendMomentumStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::TrendMomentum
    }

    fn scopes(&self) -> Vec<SignalScope> {
        vec![SignalScope::Multi]
    }

    fn timeframes(&self) -> Vec<Timeframe> {
        self.timeframes.clone()
    }

    /// 가장 앞(가장 긴) 타임프레임을 기준으로 삼음
    fn anchor(&self, _scope: SignalScope) -> Timeframe {
        self.timeframes.first().copied().unwrap_or(Timeframe::Day1)
    }

    /// 투표에는 모든 타임프레임이 필요
    fn required_timeframes(&self, _scope: SignalScope) -> Vec<Timeframe> {
        self.timeframes.clone()
    }

    fn classify(
        &self,
        _scope: SignalScope,
        snapshot: &MarketSnapshot,
    ) -> Result<Classification, SkipReason> {
        let mut briefs = Vec::with_capacity(self.timeframes.len());
        for &timeframe in &self.timeframes {
            let series = snapshot.get(timeframe).ok_or_else(|| {
                debug!("{} {} 데이터 없음", snapshot.symbol(), timeframe);
                SkipReason::MissingTimeframe
            })?;
            let brief = self.brief(series)?;
            trace!("{} {}", snapshot.symbol(), brief);
            briefs.push(brief);
        }

        let score = BreadthScore {
            pos: briefs.iter().map(TimeframeBrief::positive_votes).sum(),
            neg: briefs.iter().map(TimeframeBrief::negative_votes).sum(),
        };
        let strength = Self::classify_score(score);
        if strength == Strength::Neutral && !self.emit_neutral {
            return Err(SkipReason::NeutralSuppressed);
        }

        // 기준 타임프레임 값을 대표 근거로 사용
        let head = briefs.first();
        Ok(Classification {
            side: strength.side(),
            strength: Some(strength),
            evidence: Evidence {
                trend: head.map(|b| b.trend),
                rsi: head.map(|b| b.rsi),
                macd_direction: head.map(|b| b.macd_direction),
                structure_break: head.map(|b| b.structure_break),
                atr_pct: head.map(|b| b.atr_pct),
                briefs,
                score: Some(score),
                ..Evidence::default()
            },
        })
    }
}

impl Display for TrendMomentumStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timeframes: Vec<&str> = self.timeframes.iter().map(|tf| tf.as_str()).collect();
        write!(
            f,
            "추세+모멘텀 브레드스 전략 (타임프레임: {}, 중립 전송: {})",
            timeframes.join(","),
            self.emit_neutral
        )
    }
}
