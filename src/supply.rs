use crate::candle_series::{CandleSeries, SeriesError};
use crate::model::{Candle, Timeframe};
use log::{debug, trace, warn};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

/// 캔들 공급 오류
#[derive(Debug)]
pub enum SupplyError {
    /// 파일/네트워크 입출력 오류
    Io(String),
    /// 응답 또는 파일 파싱 오류
    Parse(String),
    /// 받은 캔들이 시리즈 조건을 만족하지 않음
    Series(SeriesError),
    /// 공급자가 요청을 처리할 수 없음
    Unavailable(String),
}

impl Display for SupplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyError::Io(msg) => write!(f, "입출력 오류: {}", msg),
            SupplyError::Parse(msg) => write!(f, "파싱 오류: {}", msg),
            SupplyError::Series(e) => write!(f, "잘못된 캔들 시리즈: {}", e),
            SupplyError::Unavailable(msg) => write!(f, "공급자 사용 불가: {}", msg),
        }
    }
}

impl std::error::Error for SupplyError {}

impl From<SeriesError> for SupplyError {
    fn from(e: SeriesError) -> Self {
        SupplyError::Series(e)
    }
}

/// 캔들 공급자
///
/// 데이터가 없는 심볼/타임프레임은 오류가 아니라 `Ok(None)` 으로 알립니다.
pub trait CandleSupplier: Send + Sync {
    /// 공급자 이름 (로그용)
    fn name(&self) -> &str;

    /// 최근 캔들 조회
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `timeframe` - 타임프레임
    /// * `limit` - 최대 캔들 수 (가장 최근 것부터)
    ///
    /// # Returns
    /// * `Result<Option<CandleSeries>, SupplyError>` - 시리즈, 데이터 없음, 또는 오류
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Option<CandleSeries>, SupplyError>;

    /// 펀딩비 (제공하지 않으면 None)
    fn funding_rate(&self, _symbol: &str) -> Option<f64> {
        None
    }
}

/// 평가 대상 심볼 목록 제공자
pub trait SymbolSource: Send + Sync {
    fn list_symbols(&self) -> Result<Vec<String>, SupplyError>;
}

/// 우선순위 순서로 시도하는 공급자 목록
///
/// 앞의 공급자가 오류를 내거나 데이터가 없으면 다음 공급자로 넘어갑니다.
#[derive(Default)]
pub struct RankedSuppliers {
    suppliers: Vec<Box<dyn CandleSupplier>>,
}

impl RankedSuppliers {
    pub fn new() -> Self {
        RankedSuppliers::default()
    }

    /// 가장 낮은 우선순위로 공급자 추가
    pub fn push(mut self, supplier: Box<dyn CandleSupplier>) -> Self {
        self.suppliers.push(supplier);
        self
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }
}

impl CandleSupplier for RankedSuppliers {
    fn name(&self) -> &str {
        "ranked"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Option<CandleSeries>, SupplyError> {
        let mut last_error = None;

        for supplier in &self.suppliers {
            match supplier.fetch_candles(symbol, timeframe, limit) {
                Ok(Some(series)) => {
                    trace!("{} {} {} 에서 조회", symbol, timeframe, supplier.name());
                    return Ok(Some(series));
                }
                Ok(None) => {
                    trace!("{} {} {} 에 데이터 없음", symbol, timeframe, supplier.name());
                }
                Err(e) => {
                    warn!("{} {} {} 조회 실패: {}", symbol, timeframe, supplier.name(), e);
                    last_error = Some(e);
                }
            }
        }

        // 데이터를 얻지 못했고 오류가 있었다면 마지막 오류를 전달
        match last_error {
            Some(e) => {
                debug!("{} {} 모든 공급자에서 조회 실패", symbol, timeframe);
                Err(e)
            }
            None => Ok(None),
        }
    }

    fn funding_rate(&self, symbol: &str) -> Option<f64> {
        self.suppliers.iter().find_map(|s| s.funding_rate(symbol))
    }
}

/// 로컬 JSON 파일 공급자
///
/// `<dir>/<SYMBOL>_<tf>.json` 파일에서 캔들 배열을 읽습니다.
#[derive(Debug, Clone)]
pub struct JsonFileSupplier {
    dir: PathBuf,
}

impl JsonFileSupplier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileSupplier { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 심볼/타임프레임의 파일 경로
    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{}_{}.json", symbol, timeframe))
    }

    /// 캔들 목록을 파일로 저장 (테스트 데이터 준비용)
    pub fn write_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<(), SupplyError> {
        let content = serde_json::to_string(candles)
            .map_err(|e| SupplyError::Parse(format!("JSON 직렬화 실패: {}", e)))?;
        std::fs::write(self.path_for(symbol, timeframe), content)
            .map_err(|e| SupplyError::Io(format!("파일 쓰기 실패: {}", e)))
    }
}

impl CandleSupplier for JsonFileSupplier {
    fn name(&self) -> &str {
        "json_file"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Option<CandleSeries>, SupplyError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| SupplyError::Io(format!("{}: {}", path.display(), e)))?;
        let mut candles: Vec<Candle> = serde_json::from_str(&content)
            .map_err(|e| SupplyError::Parse(format!("{}: {}", path.display(), e)))?;
        if candles.is_empty() {
            return Ok(None);
        }

        let skip = candles.len().saturating_sub(limit);
        candles.drain(..skip);
        Ok(Some(CandleSeries::new(symbol, timeframe, candles)?))
    }
}

impl SymbolSource for JsonFileSupplier {
    /// 디렉터리의 `<SYMBOL>_<tf>.json` 파일 이름에서 심볼을 모읍니다.
    fn list_symbols(&self) -> Result<Vec<String>, SupplyError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| SupplyError::Io(format!("{}: {}", self.dir.display(), e)))?;

        let mut symbols = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| SupplyError::Io(e.to_string()))?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Some((symbol, tf)) = stem.rsplit_once('_') {
                if tf.parse::<Timeframe>().is_ok() && !symbol.is_empty() {
                    symbols.insert(symbol.to_string());
                }
            }
        }

        Ok(symbols.into_iter().collect())
    }
}

/// 메모리 공급자
#[derive(Debug, Clone, Default)]
pub struct InMemorySupplier {
    series: HashMap<(String, Timeframe), CandleSeries>,
    funding: HashMap<String, f64>,
}

impl InMemorySupplier {
    pub fn new() -> Self {
        InMemorySupplier::default()
    }

    pub fn insert(&mut self, series: CandleSeries) {
        self.series
            .insert((series.symbol().to_string(), series.timeframe()), series);
    }

    pub fn with(mut self, series: CandleSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn with_funding(mut self, symbol: &str, rate: f64) -> Self {
        self.funding.insert(symbol.to_string(), rate);
        self
    }
}

impl CandleSupplier for InMemorySupplier {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Option<CandleSeries>, SupplyError> {
        let Some(series) = self.series.get(&(symbol.to_string(), timeframe)) else {
            return Ok(None);
        };
        if series.len() <= limit {
            return Ok(Some(series.clone()));
        }
        let tail = series.tail(limit).to_vec();
        Ok(Some(CandleSeries::new(symbol, timeframe, tail)?))
    }

    fn funding_rate(&self, symbol: &str) -> Option<f64> {
        self.funding.get(symbol).copied()
    }
}

impl SymbolSource for InMemorySupplier {
    fn list_symbols(&self) -> Result<Vec<String>, SupplyError> {
        let symbols: BTreeSet<&String> = self.series.keys().map(|(s, _)| s).collect();
        Ok(symbols.into_iter().cloned().collect())
    }
}

/// 고정 심볼 목록
#[derive(Debug, Clone, Default)]
pub struct StaticSymbols(pub Vec<String>);

impl SymbolSource for StaticSymbols {
    fn list_symbols(&self) -> Result<Vec<String>, SupplyError> {
        Ok(self.0.clone())
    }
}
