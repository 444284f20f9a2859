pub mod ema;
pub mod sma;

use crate::indicator::IndicatorError;
use ema::EMABuilder;
use serde::{Deserialize, Serialize};
use sma::SMABuilder;
use std::fmt::Debug;
use std::fmt::Display;

/// 이동평균(Moving Average) 인터페이스
///
/// 다양한 이동평균 구현체에 대한 공통 인터페이스
pub trait MA: Display + Send + Debug {
    /// 이동평균 계산 기간
    fn period(&self) -> usize;

    /// 최신 이동평균 값
    fn get(&self) -> f64;
}

/// 이동평균 계산 방식
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MAType {
    /// 지수이동평균 (Exponential Moving Average)
    /// 최근 데이터에 더 큰 가중치를 부여합니다.
    EMA,
    /// 단순이동평균 (Simple Moving Average)
    /// 모든 데이터에 동일한 가중치를 부여합니다.
    SMA,
}

impl Display for MAType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MAType::EMA => write!(f, "EMA"),
            MAType::SMA => write!(f, "SMA"),
        }
    }
}

/// 이동평균 빌더 팩토리
pub struct MABuilderFactory;

impl MABuilderFactory {
    /// 이동평균 유형과 기간에 따라 값 배열의 최신 이동평균을 계산
    ///
    /// # Arguments
    /// * `ma_type` - 이동평균 유형 (EMA, SMA)
    /// * `period` - 이동평균 계산 기간
    /// * `values` - 시간 순 값 배열
    pub fn build(
        ma_type: MAType,
        period: usize,
        values: &[f64],
    ) -> Result<Box<dyn MA>, IndicatorError> {
        match ma_type {
            MAType::EMA => Ok(Box::new(EMABuilder::new(period).build_from_values(values)?)),
            MAType::SMA => Ok(Box::new(SMABuilder::new(period).build_from_values(values)?)),
        }
    }
}
