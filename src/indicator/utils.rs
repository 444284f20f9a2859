/// 공통 이동평균 계산 함수들
pub mod moving_average {
    /// 단순이동평균(SMA) 계산
    ///
    /// # Arguments
    /// * `values` - 가격 데이터 배열
    /// * `period` - 계산 기간
    ///
    /// # Returns
    /// * `f64` - 마지막 period 개 값의 평균 (데이터가 period 보다 적으면 전체 평균,
    ///   비어 있거나 period 가 0이면 0.0)
    pub fn calculate_sma(values: &[f64], period: usize) -> f64 {
        if values.is_empty() || period == 0 {
            return 0.0;
        }

        let start_idx = values.len().saturating_sub(period);
        let slice = &values[start_idx..];
        slice.iter().sum::<f64>() / slice.len() as f64
    }

    /// 기간 기반 EMA 알파값 (2 / (period + 1))
    pub fn calculate_ema_alpha(period: usize) -> f64 {
        2.0 / (period + 1) as f64
    }

    /// 와일더 평활 알파값 (1 / period)
    pub fn calculate_wilder_alpha(period: usize) -> f64 {
        1.0 / period as f64
    }

    /// 지수이동평균 한 스텝
    ///
    /// `prev + alpha * (x - prev)` 형태로 계산합니다. `alpha * x + (1 - alpha) * prev` 와
    /// 대수적으로 같지만 입력이 이전 값과 같으면 결과가 정확히 유지됩니다.
    pub fn calculate_ema_step(current_price: f64, previous_ema: f64, alpha: f64) -> f64 {
        previous_ema + alpha * (current_price - previous_ema)
    }

    /// 주어진 알파로 전체 EMA 시계열 계산 (첫 값으로 시드, adjust=false 방식)
    ///
    /// 빈 입력이면 빈 벡터를 반환합니다.
    pub fn ema_series_with_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
        let mut result = Vec::with_capacity(values.len());
        let mut iter = values.iter();
        if let Some(&first) = iter.next() {
            let mut ema = first;
            result.push(ema);
            for &value in iter {
                ema = calculate_ema_step(value, ema, alpha);
                result.push(ema);
            }
        }
        result
    }
}

/// 윈도우 통계 함수들
pub mod statistics {
    /// 산술 평균 (빈 입력은 0.0)
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// 중앙값 (빈 입력은 0.0, 짝수 개면 가운데 두 값의 평균)
    pub fn median(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// 표본 표준편차 (n - 1 로 나눔, 값이 2개 미만이면 0.0)
    pub fn sample_std(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let avg = mean(values);
        let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;
        variance.sqrt()
    }
}
