//! 워커들이 공유하는 실행 문맥.

use tracing::debug;
use trader_core::Kline;
use trader_data::{InsertSummary, KlineStore};
use trader_exchange::{KlineRequest, MarketDataSource};

use super::boundary::BoundaryTracker;
use super::clock::Clock;
use crate::config::SyncConfig;
use crate::error::{CollectorError, FetchWindow};
use crate::Result;

/// 한 번의 동기화 실행에 필요한 협력자 묶음.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub source: &'a dyn MarketDataSource,
    pub store: &'a dyn KlineStore,
    pub clock: &'a dyn Clock,
    pub config: &'a SyncConfig,
}

impl<'a> SyncContext<'a> {
    /// 심볼에 대한 워터마크 추적기.
    pub fn tracker(&self, symbol: &'a str) -> BoundaryTracker<'a> {
        BoundaryTracker::new(self.store, symbol, self.config.timeframe)
    }

    /// 요청 한 페이지를 가져옵니다.
    pub(crate) async fn fetch_page(&self, request: &KlineRequest) -> Result<Vec<Kline>> {
        let page = self.source.fetch_klines(request).await.map_err(|e| {
            CollectorError::source_error(
                &request.symbol,
                request.timeframe,
                FetchWindow::from(request),
                e,
            )
        })?;

        debug!(
            source = self.source.name(),
            request = %request,
            received = page.len(),
            "페이지 수신"
        );
        Ok(page)
    }

    /// 페이지를 저장합니다. 중복은 에러가 아닙니다.
    pub(crate) async fn store_page(
        &self,
        request: &KlineRequest,
        page: &[Kline],
    ) -> Result<InsertSummary> {
        self.store
            .insert_many(&request.symbol, page)
            .await
            .map_err(|e| {
                CollectorError::storage_error(
                    &request.symbol,
                    request.timeframe,
                    FetchWindow::from(request),
                    e,
                )
            })
    }
}
