//! 캔들 저장소.
//!
//! 캔들은 `(symbol, id)`로 식별되며 `id`는 `{interval}{open_time}`입니다.
//! 같은 id를 다시 삽입하면 기존 행을 유지하고 중복으로 보고합니다.

pub mod memory;
pub mod postgres;
pub mod state;

use async_trait::async_trait;
use trader_core::{Kline, Timeframe, TimestampMs};

use crate::error::{DataError, Result};
use state::{SyncState, WatermarkUpdate};

/// 단건 삽입 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 새로 저장됨
    Inserted,
    /// 같은 id가 이미 존재해 무시됨
    Duplicate,
}

/// 일괄 삽입 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

impl InsertSummary {
    /// 처리한 전체 캔들 수.
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates
    }

    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Duplicate => self.duplicates += 1,
        }
    }
}

/// 저장된 캔들 중 어느 쪽 끝을 조회할지.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    /// open_time이 가장 작은 캔들
    Oldest,
    /// open_time이 가장 큰 캔들
    Newest,
}

/// 캔들 및 동기화 워터마크 저장소.
#[async_trait]
pub trait KlineStore: Send + Sync {
    /// 캔들 하나를 저장합니다.
    async fn insert(&self, symbol: &str, kline: &Kline) -> Result<InsertOutcome>;

    /// 캔들 여러 개를 저장합니다.
    ///
    /// 중복은 에러가 아니며 결과에 집계됩니다.
    async fn insert_many(&self, symbol: &str, klines: &[Kline]) -> Result<InsertSummary> {
        let mut summary = InsertSummary::default();
        for kline in klines {
            match self.insert(symbol, kline).await {
                Ok(outcome) => summary.record(outcome),
                Err(DataError::DuplicateError(_)) => summary.record(InsertOutcome::Duplicate),
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// 가장 오래된/최근 캔들을 조회합니다.
    async fn query_extreme(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        extreme: Extreme,
    ) -> Result<Option<Kline>>;

    /// 저장된 캔들 수.
    async fn count_klines(&self, symbol: &str, timeframe: Timeframe) -> Result<u64>;

    /// 저장된 캔들의 open_time 목록 (오름차순).
    async fn list_open_times(&self, symbol: &str, timeframe: Timeframe)
        -> Result<Vec<TimestampMs>>;

    /// 영속화된 워터마크를 읽습니다. 한 번도 기록되지 않았으면 `None`.
    async fn load_sync_state(&self, symbol: &str, timeframe: Timeframe)
        -> Result<Option<SyncState>>;

    /// 워터마크 갱신을 단조 규칙으로 병합하고 병합 결과를 반환합니다.
    async fn apply_watermark(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        update: WatermarkUpdate,
    ) -> Result<SyncState>;
}
