//! 메모리 캔들 저장소.
//!
//! 프로세스가 끝나면 사라지므로 테스트와 `--memory` dry-run에만 사용합니다.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use trader_core::{Kline, Timeframe, TimestampMs};

use super::state::{SyncState, WatermarkUpdate};
use super::{Extreme, InsertOutcome, InsertSummary, KlineStore};
use crate::error::{DataError, Result};

type SeriesKey = (String, Timeframe);

/// 메모리 캔들 저장소.
#[derive(Debug, Default)]
pub struct MemoryKlineStore {
    /// (심볼, 타임프레임) → open_time 순 캔들
    series: RwLock<HashMap<SeriesKey, BTreeMap<TimestampMs, Kline>>>,
    states: RwLock<HashMap<SeriesKey, SyncState>>,
    /// 설정되면 모든 쓰기가 실패
    fail_writes: AtomicBool,
}

impl MemoryKlineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 쓰기 실패를 주입하거나 해제합니다.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 워터마크만 지웁니다. 워터마크 기록 전에 중단된 상황을 재현할 때 사용합니다.
    pub async fn clear_sync_state(&self, symbol: &str, timeframe: Timeframe) {
        self.states
            .write()
            .await
            .remove(&(symbol.to_string(), timeframe));
    }

    /// 저장된 캔들 전체 (open_time 오름차순).
    pub async fn klines(&self, symbol: &str, timeframe: Timeframe) -> Vec<Kline> {
        self.series
            .read()
            .await
            .get(&(symbol.to_string(), timeframe))
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError(
                "memory store write failure".to_string(),
            ));
        }
        Ok(())
    }
}

fn insert_into(series: &mut BTreeMap<TimestampMs, Kline>, kline: &Kline) -> InsertOutcome {
    if series.contains_key(&kline.open_time) {
        InsertOutcome::Duplicate
    } else {
        series.insert(kline.open_time, kline.clone());
        InsertOutcome::Inserted
    }
}

#[async_trait]
impl KlineStore for MemoryKlineStore {
    async fn insert(&self, symbol: &str, kline: &Kline) -> Result<InsertOutcome> {
        self.check_writable()?;
        let mut series = self.series.write().await;
        let entry = series
            .entry((symbol.to_string(), kline.timeframe))
            .or_default();
        Ok(insert_into(entry, kline))
    }

    async fn insert_many(&self, symbol: &str, klines: &[Kline]) -> Result<InsertSummary> {
        self.check_writable()?;
        let mut series = self.series.write().await;
        let mut summary = InsertSummary::default();
        for kline in klines {
            let entry = series
                .entry((symbol.to_string(), kline.timeframe))
                .or_default();
            match insert_into(entry, kline) {
                InsertOutcome::Inserted => summary.inserted += 1,
                InsertOutcome::Duplicate => summary.duplicates += 1,
            }
        }
        Ok(summary)
    }

    async fn query_extreme(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        extreme: Extreme,
    ) -> Result<Option<Kline>> {
        let series = self.series.read().await;
        let Some(klines) = series.get(&(symbol.to_string(), timeframe)) else {
            return Ok(None);
        };
        let found = match extreme {
            Extreme::Oldest => klines.values().next(),
            Extreme::Newest => klines.values().next_back(),
        };
        Ok(found.cloned())
    }

    async fn count_klines(&self, symbol: &str, timeframe: Timeframe) -> Result<u64> {
        Ok(self
            .series
            .read()
            .await
            .get(&(symbol.to_string(), timeframe))
            .map_or(0, |s| s.len() as u64))
    }

    async fn list_open_times(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<TimestampMs>> {
        Ok(self
            .series
            .read()
            .await
            .get(&(symbol.to_string(), timeframe))
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn load_sync_state(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<SyncState>> {
        Ok(self
            .states
            .read()
            .await
            .get(&(symbol.to_string(), timeframe))
            .copied())
    }

    async fn apply_watermark(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        update: WatermarkUpdate,
    ) -> Result<SyncState> {
        self.check_writable()?;
        let mut states = self.states.write().await;
        let state = states.entry((symbol.to_string(), timeframe)).or_default();
        state.apply(update);
        Ok(*state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const DAY: i64 = 86_400_000;

    fn kline(day: i64) -> Kline {
        Kline::new(
            Timeframe::D1,
            day * DAY,
            dec!(100),
            dec!(110),
            dec!(90),
            dec!(105),
            dec!(1000),
        )
    }

    #[tokio::test]
    async fn test_insert_reports_duplicates() {
        let store = MemoryKlineStore::new();
        assert_eq!(
            store.insert("BTCUSDT", &kline(1)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert("BTCUSDT", &kline(1)).await.unwrap(),
            InsertOutcome::Duplicate
        );
        // 심볼이 다르면 같은 id라도 별개
        assert_eq!(
            store.insert("ETHUSDT", &kline(1)).await.unwrap(),
            InsertOutcome::Inserted
        );

        let summary = store
            .insert_many("BTCUSDT", &[kline(0), kline(1), kline(2), kline(2)])
            .await
            .unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.total(), 4);
        assert_eq!(store.count_klines("BTCUSDT", Timeframe::D1).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_query_extreme_and_open_times() {
        let store = MemoryKlineStore::new();
        assert!(store
            .query_extreme("BTCUSDT", Timeframe::D1, Extreme::Oldest)
            .await
            .unwrap()
            .is_none());

        store
            .insert_many("BTCUSDT", &[kline(5), kline(3), kline(9)])
            .await
            .unwrap();

        let oldest = store
            .query_extreme("BTCUSDT", Timeframe::D1, Extreme::Oldest)
            .await
            .unwrap()
            .unwrap();
        let newest = store
            .query_extreme("BTCUSDT", Timeframe::D1, Extreme::Newest)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(oldest.open_time, 3 * DAY);
        assert_eq!(newest.open_time, 9 * DAY);
        assert_eq!(
            store.list_open_times("BTCUSDT", Timeframe::D1).await.unwrap(),
            vec![3 * DAY, 5 * DAY, 9 * DAY]
        );
    }

    #[tokio::test]
    async fn test_watermark_merge_and_failure_injection() {
        let store = MemoryKlineStore::new();
        assert!(store
            .load_sync_state("BTCUSDT", Timeframe::D1)
            .await
            .unwrap()
            .is_none());

        store
            .apply_watermark(
                "BTCUSDT",
                Timeframe::D1,
                WatermarkUpdate::Latest { close_time: 500 },
            )
            .await
            .unwrap();
        let state = store
            .apply_watermark(
                "BTCUSDT",
                Timeframe::D1,
                WatermarkUpdate::Latest { close_time: 100 },
            )
            .await
            .unwrap();
        assert_eq!(state.latest_close_time, Some(500));

        store.set_fail_writes(true);
        assert!(store.insert("BTCUSDT", &kline(1)).await.is_err());
        assert!(store
            .apply_watermark(
                "BTCUSDT",
                Timeframe::D1,
                WatermarkUpdate::Latest { close_time: 900 },
            )
            .await
            .is_err());

        store.set_fail_writes(false);
        store.clear_sync_state("BTCUSDT", Timeframe::D1).await;
        assert!(store
            .load_sync_state("BTCUSDT", Timeframe::D1)
            .await
            .unwrap()
            .is_none());
    }
}
