use crate::indicator::ma::MA;
use crate::indicator::utils::moving_average;
use crate::indicator::{IndicatorError, ensure_len, ensure_period};
use std::fmt::Display;

/// 단순이동평균(SMA) 빌더
#[derive(Debug, Clone, Copy)]
pub struct SMABuilder {
    period: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SMA {
    period: usize,
    sma: f64,
}

impl Display for SMA {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMA({}: {})", self.period, self.sma)
    }
}

impl MA for SMA {
    fn get(&self) -> f64 {
        self.sma
    }

    fn period(&self) -> usize {
        self.period
    }
}

impl SMABuilder {
    pub fn new(period: usize) -> Self {
        SMABuilder { period }
    }

    /// 마지막 period 개 값의 평균
    ///
    /// period 개보다 적으면 InsufficientData 를 반환합니다.
    pub fn build_from_values(&self, values: &[f64]) -> Result<SMA, IndicatorError> {
        ensure_period("SMA", self.period)?;
        ensure_len("SMA", values.len(), self.period)?;
        Ok(SMA {
            period: self.period,
            sma: moving_average::calculate_sma(values, self.period),
        })
    }
}
