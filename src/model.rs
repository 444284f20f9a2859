use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// 캔들 타임프레임
///
/// 설정 파일과 캔들 파일 이름에서는 `1h`, `4h`, `1d` 같은 문자열 라벨을 사용합니다.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl Timeframe {
    /// 지원하는 모든 타임프레임 (짧은 것부터)
    pub const ALL: [Timeframe; 11] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Hour2,
        Timeframe::Hour4,
        Timeframe::Hour6,
        Timeframe::Hour12,
        Timeframe::Day1,
        Timeframe::Week1,
    ];

    /// 설정/파일 이름에서 쓰는 라벨
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour2 => "2h",
            Timeframe::Hour4 => "4h",
            Timeframe::Hour6 => "6h",
            Timeframe::Hour12 => "12h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .iter()
            .find(|tf| tf.as_str() == s.trim())
            .copied()
            .ok_or_else(|| format!("지원되지 않는 타임프레임: {s}"))
    }
}

/// OHLCV 캔들
///
/// 생성 이후에는 변경되지 않습니다. `turnover`(호가 자산 기준 거래대금)는
/// 거래소가 제공하는 경우에만 채워지며, 가격 × 거래량으로 추정하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    open_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    turnover: Option<f64>,
}

impl Candle {
    /// 새 캔들 생성 (거래대금 없음)
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Candle {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            turnover: None,
        }
    }

    /// 거래대금 설정
    pub fn with_turnover(mut self, turnover: f64) -> Self {
        self.turnover = Some(turnover);
        self
    }

    pub fn open_time(&self) -> DateTime<Utc> {
        self.open_time
    }

    pub fn open_price(&self) -> f64 {
        self.open
    }

    pub fn high_price(&self) -> f64 {
        self.high
    }

    pub fn low_price(&self) -> f64 {
        self.low
    }

    pub fn close_price(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn turnover(&self) -> Option<f64> {
        self.turnover
    }

    /// 양봉 여부 (종가 > 시가)
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉 여부 (종가 < 시가)
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// 몸통 상단 (시가/종가 중 큰 값)
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    /// 몸통 하단 (시가/종가 중 작은 값)
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }
}

impl Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candle({}, o={}, h={}, l={}, c={}, v={})",
            self.open_time.format("%Y-%m-%d %H:%M"),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume
        )
    }
}

/// 신호 방향
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
    /// 중립 (멀티 타임프레임 브레드스 투표 전용)
    Neutral,
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// 브레드스 투표 강도 라벨
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Strength {
    Strong,
    Weak,
    Neutral,
}

impl Strength {
    /// 강도 라벨에 대응하는 방향
    pub fn side(&self) -> Side {
        match self {
            Strength::Strong => Side::Buy,
            Strength::Weak => Side::Sell,
            Strength::Neutral => Side::Neutral,
        }
    }
}

impl Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Strong => write!(f, "STRONG"),
            Strength::Weak => write!(f, "WEAK"),
            Strength::Neutral => write!(f, "NEUTRAL"),
        }
    }
}
