use crate::analyzer::volume_analyzer::VolumeAnalyzer;
use crate::candle_series::MarketSnapshot;
use crate::config::{EngineConfig, IndicatorConfig, VolumeConfig};
use crate::indicator::{IndicatorFrame, TrendDirection};
use crate::model::{Side, Timeframe};
use crate::signal::{Evidence, SignalScope};
use crate::signal_builder::SkipReason;
use crate::strategy::{Classification, SignalStrategy, StrategyType};
use log::trace;
use std::fmt::Display;

/// 타임프레임별 추세 + RSI 전략 (거래량 게이트)
///
/// 각 타임프레임을 독립적으로 평가합니다.
/// - BUY: EMA 추세 상승 이면서 RSI > 50
/// - SELL: EMA 추세 하락 이면서 RSI < 50
///
/// 해당 타임프레임의 거래량 스파이크가 먼저 확인되어야 하며 ADX 는 참고용입니다.
#[derive(Debug, Clone)]
pub struct TrendVolumeStrategy {
    indicators: IndicatorConfig,
    volume: VolumeConfig,
    timeframes: Vec<Timeframe>,
}

impl TrendVolumeStrategy {
    pub fn new(config: &EngineConfig) -> Self {
        TrendVolumeStrategy {
            indicators: config.indicators.clone(),
            volume: config.volume.clone(),
            timeframes: config.strategy.timeframes.clone(),
        }
    }
}

impl SignalStrategy for TrendVolumeStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::TrendVolume
    }

    fn scopes(&self) -> Vec<SignalScope> {
        self.timeframes
            .iter()
            .map(|tf| SignalScope::Timeframe(*tf))
            .collect()
    }

    fn timeframes(&self) -> Vec<Timeframe> {
        self.timeframes.clone()
    }

    fn anchor(&self, scope: SignalScope) -> Timeframe {
        match scope {
            SignalScope::Timeframe(tf) => tf,
            SignalScope::Multi => self.timeframes.first().copied().unwrap_or(Timeframe::Day1),
        }
    }

    fn classify(
        &self,
        scope: SignalScope,
        snapshot: &MarketSnapshot,
    ) -> Result<Classification, SkipReason> {
        let timeframe = self.anchor(scope);
        let series = snapshot
            .get(timeframe)
            .ok_or(SkipReason::MissingTimeframe)?;

        if series.len() < self.volume.min_len {
            return Err(SkipReason::InsufficientData);
        }
        let verdict = VolumeAnalyzer::new(&self.volume).analyze(series)?;
        trace!("{} {}", snapshot.symbol(), verdict);
        if !verdict.is_spike {
            return Err(SkipReason::NoVolumeEvidence);
        }

        let frame = IndicatorFrame::compute(series, &self.indicators)?;
        let rsi = frame.rsi.value();
        let side = match frame.trend {
            TrendDirection::Flat => return Err(SkipReason::AmbiguousTrend),
            TrendDirection::Up if rsi > 50.0 => Side::Buy,
            TrendDirection::Down if rsi < 50.0 => Side::Sell,
            _ => return Err(SkipReason::NoSetup),
        };

        Ok(Classification {
            side,
            strength: None,
            evidence: Evidence {
                trend: Some(frame.trend),
                rsi: Some(rsi),
                macd_direction: Some(frame.macd_direction()),
                volume: vec![verdict],
                adx: Some(frame.adx.adx),
                atr_pct: Some(frame.atr_pct()),
                ..Evidence::default()
            },
        })
    }
}

impl Display for TrendVolumeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timeframes: Vec<&str> = self.timeframes.iter().map(|tf| tf.as_str()).collect();
        write!(
            f,
            "추세+거래량 전략 (EMA {}/{}, RSI {}, 타임프레임: {})",
            self.indicators.ema_fast,
            self.indicators.ema_slow,
            self.indicators.rsi_period,
            timeframes.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::volume_analyzer::VolumeSource;
    use crate::candle_series::CandleSeries;
    use crate::model::Candle;
    use chrono::{TimeZone, Utc};

    fn daily(closes: &[f64], last_volume: f64) -> CandleSeries {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap();
                let volume = if i + 1 == closes.len() { last_volume } else { 1000.0 };
                Candle::new(ts, *c, *c, *c, *c, volume)
            })
            .collect();
        CandleSeries::new("TESTUSDT", Timeframe::Day1, candles).unwrap()
    }

    fn strategy() -> TrendVolumeStrategy {
        let mut config = EngineConfig::default();
        config.volume.source = VolumeSource::Volume;
        TrendVolumeStrategy::new(&config)
    }

    fn rising() -> Vec<f64> {
        (0..200).map(|i| 100.0 + i as f64 * 100.0 / 199.0).collect()
    }

    #[test]
    fn test_uptrend_with_spike_is_buy() {
        let snapshot = MarketSnapshot::new("TESTUSDT").with(daily(&rising(), 3000.0));
        let classification = strategy()
            .classify(SignalScope::Timeframe(Timeframe::Day1), &snapshot)
            .unwrap();
        assert_eq!(classification.side, Side::Buy);
        assert_eq!(classification.evidence.trend, Some(TrendDirection::Up));
        let verdict = &classification.evidence.volume[0];
        assert!((verdict.ratio - 3.0).abs() < 1e-9);
        assert!(classification.evidence.adx.is_some());
    }

    #[test]
    fn test_downtrend_with_spike_is_sell() {
        let mut closes = rising();
        closes.reverse();
        let snapshot = MarketSnapshot::new("TESTUSDT").with(daily(&closes, 3000.0));
        let classification = strategy()
            .classify(SignalScope::Timeframe(Timeframe::Day1), &snapshot)
            .unwrap();
        assert_eq!(classification.side, Side::Sell);
    }

    #[test]
    fn test_no_spike_is_skipped() {
        let snapshot = MarketSnapshot::new("TESTUSDT").with(daily(&rising(), 1000.0));
        assert_eq!(
            strategy().classify(SignalScope::Timeframe(Timeframe::Day1), &snapshot),
            Err(SkipReason::NoVolumeEvidence)
        );
    }

    #[test]
    fn test_flat_trend_is_ambiguous() {
        let snapshot = MarketSnapshot::new("TESTUSDT").with(daily(&[100.0; 200], 3000.0));
        assert_eq!(
            strategy().classify(SignalScope::Timeframe(Timeframe::Day1), &snapshot),
            Err(SkipReason::AmbiguousTrend)
        );
    }

    #[test]
    fn test_scopes_follow_timeframes() {
        let strategy = strategy();
        assert_eq!(strategy.scopes().len(), 3);
        assert_eq!(strategy.anchor(SignalScope::Timeframe(Timeframe::Hour4)), Timeframe::Hour4);
        let snapshot = MarketSnapshot::new("TESTUSDT").with(daily(&rising(), 3000.0));
        assert_eq!(
            strategy.classify(SignalScope::Timeframe(Timeframe::Hour1), &snapshot),
            Err(SkipReason::MissingTimeframe)
        );
    }
}
