//! 동기화 워터마크 추적.
//!
//! 영속화된 `SyncState`를 읽고 갱신합니다. 마지막 페이지 저장 후 워터마크를
//! 기록하기 전에 실행이 중단되면 상태가 비어 있을 수 있으므로, 그 경우 저장된
//! 캔들에서 경계를 다시 계산합니다.

use trader_core::{Timeframe, TimestampMs};
use trader_data::{DataError, Extreme, KlineStore, OldestWatermark, SyncState, WatermarkUpdate};

use crate::error::{CollectorError, FetchWindow};
use crate::Result;

/// 한 (심볼, 타임프레임)의 워터마크 추적기.
pub struct BoundaryTracker<'a> {
    store: &'a dyn KlineStore,
    symbol: &'a str,
    timeframe: Timeframe,
}

impl<'a> BoundaryTracker<'a> {
    pub fn new(store: &'a dyn KlineStore, symbol: &'a str, timeframe: Timeframe) -> Self {
        Self {
            store,
            symbol,
            timeframe,
        }
    }

    fn storage_error(&self, source: DataError) -> CollectorError {
        self.window_error(FetchWindow::unbounded(), source)
    }

    fn window_error(&self, window: FetchWindow, source: DataError) -> CollectorError {
        CollectorError::storage_error(self.symbol, self.timeframe, window, source)
    }

    async fn state(&self) -> Result<Option<SyncState>> {
        self.store
            .load_sync_state(self.symbol, self.timeframe)
            .await
            .map_err(|e| self.storage_error(e))
    }

    /// 백필 워터마크. 한 번도 동기화하지 않았으면 `None`.
    pub async fn oldest_boundary(&self) -> Result<Option<OldestWatermark>> {
        if let Some(oldest) = self.state().await?.and_then(|s| s.oldest) {
            return Ok(Some(oldest));
        }

        let oldest = self
            .store
            .query_extreme(self.symbol, self.timeframe, Extreme::Oldest)
            .await
            .map_err(|e| self.storage_error(e))?;

        Ok(oldest.map(|k| OldestWatermark {
            open_time: k.open_time,
            is_final: false,
        }))
    }

    /// 정방향 워터마크 (마지막으로 저장한 캔들의 close_time). 저장된 캔들이 없으면 `None`.
    pub async fn latest_boundary(&self) -> Result<Option<TimestampMs>> {
        if let Some(latest) = self.state().await?.and_then(|s| s.latest_close_time) {
            return Ok(Some(latest));
        }

        let newest = self
            .store
            .query_extreme(self.symbol, self.timeframe, Extreme::Newest)
            .await
            .map_err(|e| self.storage_error(e))?;

        Ok(newest.map(|k| k.close_time))
    }

    /// 저장된 가장 오래된 캔들의 open_time.
    pub async fn oldest_stored(&self) -> Result<Option<TimestampMs>> {
        let oldest = self
            .store
            .query_extreme(self.symbol, self.timeframe, Extreme::Oldest)
            .await
            .map_err(|e| self.storage_error(e))?;
        Ok(oldest.map(|k| k.open_time))
    }

    /// 백필 워터마크를 기록합니다. 기존보다 최근 시점이면 시각은 유지되고,
    /// `is_final`은 한 번 켜지면 유지됩니다.
    ///
    /// `window`는 이 기록을 만든 페이지의 요청 범위로, 실패 시 에러에 담깁니다.
    pub async fn mark_oldest(
        &self,
        open_time: TimestampMs,
        is_final: bool,
        window: FetchWindow,
    ) -> Result<SyncState> {
        self.apply(
            WatermarkUpdate::Oldest {
                open_time,
                is_final,
            },
            window,
        )
        .await
    }

    /// 정방향 워터마크를 전진시킵니다. 기존보다 작은 값은 무시됩니다.
    pub async fn mark_latest(
        &self,
        close_time: TimestampMs,
        window: FetchWindow,
    ) -> Result<SyncState> {
        self.apply(WatermarkUpdate::Latest { close_time }, window)
            .await
    }

    async fn apply(&self, update: WatermarkUpdate, window: FetchWindow) -> Result<SyncState> {
        self.store
            .apply_watermark(self.symbol, self.timeframe, update)
            .await
            .map_err(|e| self.window_error(window, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trader_core::Kline;
    use trader_data::MemoryKlineStore;

    const DAY: i64 = 86_400_000;

    fn kline(day: i64) -> Kline {
        Kline::new(Timeframe::D1, day * DAY, dec!(1), dec!(2), dec!(1), dec!(2), dec!(3))
    }

    #[tokio::test]
    async fn test_boundaries_absent_on_empty_store() {
        let store = MemoryKlineStore::new();
        let tracker = BoundaryTracker::new(&store, "BTCUSDT", Timeframe::D1);
        assert!(tracker.oldest_boundary().await.unwrap().is_none());
        assert!(tracker.latest_boundary().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_boundaries_recomputed_from_stored_bars() {
        let store = MemoryKlineStore::new();
        store
            .insert_many("BTCUSDT", &[kline(3), kline(4), kline(5)])
            .await
            .unwrap();
        let tracker = BoundaryTracker::new(&store, "BTCUSDT", Timeframe::D1);

        let oldest = tracker.oldest_boundary().await.unwrap().unwrap();
        assert_eq!(oldest.open_time, 3 * DAY);
        assert!(!oldest.is_final);
        assert_eq!(
            tracker.latest_boundary().await.unwrap(),
            Some(6 * DAY - 1)
        );
    }

    #[tokio::test]
    async fn test_mark_is_monotonic_and_sticky() {
        let store = MemoryKlineStore::new();
        let tracker = BoundaryTracker::new(&store, "BTCUSDT", Timeframe::D1);

        let any = FetchWindow::unbounded();
        tracker.mark_oldest(10 * DAY, true, any).await.unwrap();
        tracker.mark_oldest(12 * DAY, false, any).await.unwrap();
        let oldest = tracker.oldest_boundary().await.unwrap().unwrap();
        assert_eq!(oldest.open_time, 10 * DAY);
        assert!(oldest.is_final);

        tracker.mark_latest(20 * DAY, any).await.unwrap();
        tracker.mark_latest(15 * DAY, any).await.unwrap();
        assert_eq!(tracker.latest_boundary().await.unwrap(), Some(20 * DAY));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_with_context() {
        let store = MemoryKlineStore::new();
        store.set_fail_writes(true);
        let tracker = BoundaryTracker::new(&store, "BTCUSDT", Timeframe::D1);

        let window = FetchWindow {
            start: Some(10 * DAY),
            end: Some(20 * DAY),
        };
        let err = tracker.mark_latest(20 * DAY, window).await.unwrap_err();
        match err {
            CollectorError::Storage {
                symbol,
                window: reported,
                ..
            } => {
                assert_eq!(symbol, "BTCUSDT");
                assert_eq!(reported, window);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = tracker
            .mark_oldest(10 * DAY, true, window)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Storage { window: w, .. } if w == window));
    }
}
