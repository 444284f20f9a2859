// 기술적 지표 모듈
// 캔들 시리즈(종가 또는 OHLC)에 대한 상태 없는 수치 변환을 제공합니다.

pub mod adx;
pub mod atr;
pub mod frame;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod utils;
pub mod volume;

use std::fmt::{self, Display};

pub use adx::{ADX, ADXBuilder};
pub use atr::{ATR, ATRBuilder};
pub use frame::{IndicatorFrame, TrendDirection};
pub use ma::ema::{EMA, EMABuilder};
pub use ma::sma::{SMA, SMABuilder};
pub use ma::{MA, MAType};
pub use macd::{MACD, MACDBuilder, MACDDirection};
pub use rsi::{RSI, RSIBuilder};

/// 0 나눗셈 방지용 고정 엡실론
pub const EPSILON: f64 = 1e-12;

/// 지표 계산 오류
///
/// 두 경우 모두 "근거 없음"으로 취급해야 하며 0 이나 false 로 해석하면 안 됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    /// 시리즈가 지표의 최소 길이보다 짧음
    InsufficientData {
        indicator: &'static str,
        required: usize,
        actual: usize,
    },
    /// 기간이 0
    InvalidPeriod { indicator: &'static str },
    /// 필요한 값(예: 거래대금)이 시리즈에 없음
    MissingValues {
        indicator: &'static str,
        field: &'static str,
    },
}

impl Display for IndicatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorError::InsufficientData {
                indicator,
                required,
                actual,
            } => write!(
                f,
                "{indicator} 데이터 부족: 필요 {required}, 실제 {actual}"
            ),
            IndicatorError::InvalidPeriod { indicator } => {
                write!(f, "{indicator} 기간은 0보다 커야 합니다")
            }
            IndicatorError::MissingValues { indicator, field } => {
                write!(f, "{indicator} 계산에 필요한 {field} 값이 없습니다")
            }
        }
    }
}

impl std::error::Error for IndicatorError {}

/// 기간 검증 (period > 0)
pub(crate) fn ensure_period(indicator: &'static str, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator });
    }
    Ok(())
}

/// 최소 길이 검증
pub(crate) fn ensure_len(
    indicator: &'static str,
    actual: usize,
    required: usize,
) -> Result<(), IndicatorError> {
    if actual < required {
        return Err(IndicatorError::InsufficientData {
            indicator,
            required,
            actual,
        });
    }
    Ok(())
}

/// 음수가 아닌 분모에 대한 나눗셈
///
/// 분모가 EPSILON 보다 작으면 EPSILON 으로 나눕니다. 정상 범위의 분모는 그대로 사용하므로
/// 경계값 비교(예: 비율 >= 임계값)가 엡실론 때문에 흔들리지 않습니다.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator.max(EPSILON)
}
