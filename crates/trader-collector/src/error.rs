//! 에러 타입 정의.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use trader_core::{Timeframe, TimestampMs};
use trader_data::DataError;
use trader_exchange::{ExchangeError, KlineRequest};

/// 요청 시간 범위 (밀리초, 양끝 포함). 경계가 없으면 `*`로 표시.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchWindow {
    pub start: Option<TimestampMs>,
    pub end: Option<TimestampMs>,
}

impl FetchWindow {
    /// 범위가 정해지지 않은 작업 (워터마크 조회 등)
    pub fn unbounded() -> Self {
        Self::default()
    }
}

impl From<&KlineRequest> for FetchWindow {
    fn from(request: &KlineRequest) -> Self {
        Self {
            start: request.start_time,
            end: request.end_time,
        }
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |t: Option<TimestampMs>| t.map_or_else(|| "*".to_string(), |t| t.to_string());
        write!(f, "[{}, {}]", bound(self.start), bound(self.end))
    }
}

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 에러
    #[error("{symbol} {timeframe} {window}: data source error: {source}")]
    Source {
        symbol: String,
        timeframe: Timeframe,
        window: FetchWindow,
        #[source]
        source: ExchangeError,
    },

    /// 저장소 에러
    #[error("{symbol} {timeframe} {window}: storage error: {source}")]
    Storage {
        symbol: String,
        timeframe: Timeframe,
        window: FetchWindow,
        #[source]
        source: DataError,
    },

    /// 실행 제한 시간 초과
    #[error("{symbol} {timeframe}: sync did not finish within {deadline:?}")]
    DeadlineExceeded {
        symbol: String,
        timeframe: Timeframe,
        deadline: Duration,
    },
}

impl CollectorError {
    pub(crate) fn source_error(
        symbol: &str,
        timeframe: Timeframe,
        window: FetchWindow,
        source: ExchangeError,
    ) -> Self {
        Self::Source {
            symbol: symbol.to_string(),
            timeframe,
            window,
            source,
        }
    }

    pub(crate) fn storage_error(
        symbol: &str,
        timeframe: Timeframe,
        window: FetchWindow,
        source: DataError,
    ) -> Self {
        Self::Storage {
            symbol: symbol.to_string(),
            timeframe,
            window,
            source,
        }
    }

    /// 다음 실행에서 성공할 가능성이 있는 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Source { source, .. } => source.is_retryable(),
            Self::Storage { source, .. } => matches!(
                source,
                DataError::ConnectionError(_) | DataError::PoolExhausted
            ),
            Self::DeadlineExceeded { .. } => true,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
