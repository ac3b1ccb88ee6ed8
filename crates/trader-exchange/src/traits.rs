//! 데이터 소스 trait 정의.

use async_trait::async_trait;
use std::fmt;
use trader_core::{Kline, Timeframe, TimestampMs};

use crate::ExchangeError;

/// 데이터 소스 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 기본 페이지 크기.
pub const DEFAULT_PAGE_LIMIT: u32 = 500;

/// 한 번의 캔들 조회 요청.
///
/// `start_time`/`end_time`이 없으면 해당 방향으로 제한이 없는 것으로
/// 취급합니다. 둘 다 없으면 가장 최근 `limit`개를 요청합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineRequest {
    /// 거래 심볼 (예: "BTCUSDT")
    pub symbol: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 조회 시작 시간 (밀리초, 포함)
    pub start_time: Option<TimestampMs>,
    /// 조회 종료 시간 (밀리초, 포함)
    pub end_time: Option<TimestampMs>,
    /// 최대 캔들 수
    pub limit: u32,
}

impl KlineRequest {
    /// 새 요청을 생성합니다. 시간 범위는 비어 있습니다.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            start_time: None,
            end_time: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// 시작 시간을 설정합니다.
    pub fn with_start(mut self, start_time: TimestampMs) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// 종료 시간을 설정합니다.
    pub fn with_end(mut self, end_time: TimestampMs) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// 페이지 크기를 설정합니다.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

impl fmt::Display for KlineRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |t: Option<TimestampMs>| t.map_or_else(|| "*".to_string(), |t| t.to_string());
        write!(
            f,
            "{} {} [{}, {}] limit={}",
            self.symbol,
            self.timeframe,
            bound(self.start_time),
            bound(self.end_time),
            self.limit
        )
    }
}

/// 페이지 단위 캔들 데이터 소스.
///
/// 반환되는 캔들의 정렬 방향은 계약에 포함되지 않습니다. 호출자는
/// [`trader_core::PageBounds`]로 방향을 판별해야 합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 데이터 소스 이름.
    fn name(&self) -> &str;

    /// 요청 범위의 캔들을 최대 `limit`개 조회합니다.
    async fn fetch_klines(&self, request: &KlineRequest) -> ExchangeResult<Vec<Kline>>;
}
