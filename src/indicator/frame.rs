use crate::candle_series::CandleSeries;
use crate::config::IndicatorConfig;
use crate::indicator::{
    ADX, ADXBuilder, ATR, ATRBuilder, EMABuilder, IndicatorError, MA, MACD, MACDBuilder,
    MACDDirection, RSI, RSIBuilder,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 빠른 EMA 와 느린 EMA 의 관계로 본 추세
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    /// 두 EMA 가 정확히 같음
    Flat,
}

impl Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

impl TrendDirection {
    fn from_emas(fast: f64, slow: f64) -> Self {
        if fast > slow {
            TrendDirection::Up
        } else if fast < slow {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }
}

/// 한 시리즈에 대한 지표 묶음
///
/// 매 분석마다 새로 계산하며 캐시하지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub trend: TrendDirection,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: RSI,
    pub macd: MACD,
    pub atr: ATR,
    pub adx: ADX,
}

impl IndicatorFrame {
    /// 설정된 기간으로 모든 지표를 계산
    ///
    /// # Arguments
    /// * `series` - 캔들 시리즈
    /// * `config` - 지표 기간 설정
    ///
    /// # Returns
    /// * `Result<IndicatorFrame, IndicatorError>` - 지표 하나라도 데이터가 부족하면 오류
    pub fn compute(
        series: &CandleSeries,
        config: &IndicatorConfig,
    ) -> Result<IndicatorFrame, IndicatorError> {
        let closes = series.closes();
        let ema_fast = EMABuilder::new(config.ema_fast).build_from_values(&closes)?.get();
        let ema_slow = EMABuilder::new(config.ema_slow).build_from_values(&closes)?.get();
        let rsi = RSIBuilder::new(config.rsi_period).build_from_values(&closes)?;
        let macd = MACDBuilder::new(config.macd_fast, config.macd_slow, config.macd_signal)
            .build_from_values(&closes)?;
        let atr = ATRBuilder::new(config.atr_period).build(series)?;
        let adx = ADXBuilder::new(config.adx_period).build(series)?;

        Ok(IndicatorFrame {
            trend: TrendDirection::from_emas(ema_fast, ema_slow),
            ema_fast,
            ema_slow,
            rsi,
            macd,
            atr,
            adx,
        })
    }

    pub fn macd_direction(&self) -> MACDDirection {
        self.macd.direction()
    }

    /// 최신 종가 대비 ATR (%)
    pub fn atr_pct(&self) -> f64 {
        self.atr.percent
    }
}

impl Display for IndicatorFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "trend={} {} macd={} {} {}",
            self.trend,
            self.rsi,
            self.macd_direction(),
            self.atr,
            self.adx
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candle, Timeframe};
    use chrono::{TimeZone, Utc};

    fn closes_series(closes: &[f64]) -> CandleSeries {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap();
                Candle::new(ts, *c, *c + 0.5, *c - 0.5, *c, 1000.0)
            })
            .collect::<Vec<_>>();
        CandleSeries::new("TESTUSDT", Timeframe::Day1, candles).unwrap()
    }

    #[test]
    fn test_trend_from_emas() {
        assert_eq!(TrendDirection::from_emas(2.0, 1.0), TrendDirection::Up);
        assert_eq!(TrendDirection::from_emas(1.0, 2.0), TrendDirection::Down);
        assert_eq!(TrendDirection::from_emas(1.0, 1.0), TrendDirection::Flat);
    }

    #[test]
    fn test_frame_rising_series() {
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + i as f64 * 0.5).collect();
        let frame = IndicatorFrame::compute(&closes_series(&closes), &IndicatorConfig::default())
            .unwrap();
        assert_eq!(frame.trend, TrendDirection::Up);
        assert!(frame.rsi.is_bullish());
        assert!(frame.atr_pct() > 0.0);
    }

    #[test]
    fn test_frame_constant_series() {
        let frame =
            IndicatorFrame::compute(&closes_series(&[100.0; 80]), &IndicatorConfig::default())
                .unwrap();
        assert_eq!(frame.trend, TrendDirection::Flat);
        assert_eq!(frame.ema_fast, 100.0);
        assert!((frame.rsi.value() - 50.0).abs() < 1e-9);
        assert_eq!(frame.macd_direction(), MACDDirection::Flat);
    }

    #[test]
    fn test_frame_short_series_fails() {
        let result =
            IndicatorFrame::compute(&closes_series(&[100.0; 10]), &IndicatorConfig::default());
        assert!(matches!(
            result,
            Err(IndicatorError::InsufficientData { indicator: "ATR", .. })
        ));
    }
}
