use crate::analyzer::market_structure_analyzer::{StructureBreak, Zone};
use crate::analyzer::volume_analyzer::VolumeVerdict;
use crate::indicator::{MACDDirection, TrendDirection};
use crate::model::{Side, Strength, Timeframe};
use crate::strategy::StrategyType;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt::{self, Display};

/// 한 줄 요약에 펀딩비를 표시하는 최소 절댓값
pub const FUNDING_DISPLAY_THRESHOLD: f64 = 0.01;

/// 신호 평가 범위
///
/// 단일 타임프레임 평가이거나 여러 타임프레임을 묶은 평가입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalScope {
    Timeframe(Timeframe),
    Multi,
}

impl Display for SignalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalScope::Timeframe(tf) => write!(f, "{tf}"),
            SignalScope::Multi => write!(f, "multi"),
        }
    }
}

impl Serialize for SignalScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 타임프레임 하나의 요약 (브레드스 투표 근거)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeBrief {
    pub timeframe: Timeframe,
    pub trend: TrendDirection,
    pub rsi: f64,
    pub macd_direction: MACDDirection,
    pub structure_break: StructureBreak,
    /// 최신 거래량 / 직전 20봉 평균 (참고용)
    pub volume_ratio: Option<f64>,
    pub atr_pct: f64,
    pub price: f64,
}

impl TimeframeBrief {
    /// 상승 쪽 표 수
    pub fn positive_votes(&self) -> u32 {
        u32::from(self.trend == TrendDirection::Up)
            + u32::from(self.rsi > 50.0)
            + u32::from(self.macd_direction == MACDDirection::Up)
            + u32::from(self.structure_break == StructureBreak::Up)
    }

    /// 하락 쪽 표 수
    pub fn negative_votes(&self) -> u32 {
        u32::from(self.trend == TrendDirection::Down)
            + u32::from(self.rsi < 50.0)
            + u32::from(self.macd_direction == MACDDirection::Down)
            + u32::from(self.structure_break == StructureBreak::Down)
    }
}

impl Display for TimeframeBrief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: trend {} | RSI {:.1} | MACD {} | {} | ATR% {:.2} | price {}",
            self.timeframe,
            self.trend,
            self.rsi,
            self.macd_direction,
            self.structure_break,
            self.atr_pct,
            self.price
        )?;
        if let Some(ratio) = self.volume_ratio {
            write!(f, " | vol x{ratio:.2}")?;
        }
        Ok(())
    }
}

/// 브레드스 점수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreadthScore {
    pub pos: u32,
    pub neg: u32,
}

/// 신호 근거 묶음
///
/// 전략마다 채우는 항목이 다르며, 채우지 않은 항목은 None 또는 빈 목록입니다.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Evidence {
    pub trend: Option<TrendDirection>,
    pub rsi: Option<f64>,
    pub macd_direction: Option<MACDDirection>,
    pub structure_break: Option<StructureBreak>,
    pub zone: Option<Zone>,
    pub volume: Vec<VolumeVerdict>,
    pub adx: Option<f64>,
    pub atr_pct: Option<f64>,
    pub funding_rate: Option<f64>,
    pub briefs: Vec<TimeframeBrief>,
    pub score: Option<BreadthScore>,
}

impl Evidence {
    /// 스파이크로 판정된 거래량 근거만
    pub fn volume_spikes(&self) -> impl Iterator<Item = &VolumeVerdict> {
        self.volume.iter().filter(|v| v.is_spike)
    }
}

/// 방향성 매매 신호
///
/// 생성 이후 변경되지 않으며 전달 계층으로 넘겨집니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub scope: SignalScope,
    pub side: Side,
    /// 멀티 타임프레임 투표에서만 채워짐
    pub strength: Option<Strength>,
    pub strategy: StrategyType,
    pub evidence: Evidence,
    /// 기준 시리즈의 최신 종가
    pub price: f64,
    /// 분석 시각
    pub timestamp: DateTime<Utc>,
}

impl Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.symbol, self.scope, self.side)?;
        if let Some(strength) = self.strength {
            write!(f, " ({strength})")?;
        }
        write!(f, " | price {}", self.price)?;

        let e = &self.evidence;
        if let Some(rsi) = e.rsi {
            write!(f, " | RSI:{rsi:.1}")?;
        }
        if let Some(macd) = e.macd_direction {
            write!(f, " | MACD {macd}")?;
        }
        if let Some(trend) = e.trend {
            write!(f, " | trend {trend}")?;
        }
        if let Some(bos) = e.structure_break {
            write!(f, " | {bos}")?;
        }
        if let Some(zone) = &e.zone {
            write!(f, " | {zone}")?;
        }
        if let Some(adx) = e.adx {
            write!(f, " | ADX:{adx:.0}")?;
        }
        let spikes: Vec<String> = e
            .volume_spikes()
            .map(|v| format!("{} x{:.2}", v.timeframe, v.ratio))
            .collect();
        if !spikes.is_empty() {
            write!(f, " | vol {}", spikes.join(", "))?;
        }
        if let Some(score) = e.score {
            write!(f, " | +{} -{}", score.pos, score.neg)?;
        }
        if let Some(funding) = e.funding_rate.filter(|r| r.abs() > FUNDING_DISPLAY_THRESHOLD) {
            write!(f, " | funding {funding:+.3}")?;
        }
        write!(f, " | {}", self.timestamp.format("%Y-%m-%d %H:%M UTC"))
    }
}
