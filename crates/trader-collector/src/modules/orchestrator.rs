//! 동기화 실행기.
//!
//! 한 심볼에 대해 백필(Backfilling)을 먼저 수행한 뒤 정방향 동기화(Current)를
//! 한 번 수행합니다. 같은 (심볼, 타임프레임)에 대한 실행은 키별 비동기 락으로
//! 직렬화됩니다. 실행 중 에러가 나면 즉시 중단하며, 다시 실행하면 저장된
//! 워터마크에서 이어집니다.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, Instrument};
use trader_core::Timeframe;
use trader_data::{Extreme, KlineStore, SyncState};
use trader_exchange::MarketDataSource;

use super::backfill::{run_backfill, BackfillReport};
use super::clock::{Clock, SystemClock};
use super::context::SyncContext;
use super::forward::{run_forward, ForwardReport};
use super::gaps::{check_gaps, Gap};
use crate::config::SyncConfig;
use crate::error::{CollectorError, FetchWindow};
use crate::stats::SyncStats;
use crate::Result;

/// (심볼, 타임프레임)별 실행 락 맵
type SyncLockMap = Arc<RwLock<HashMap<String, Arc<RwLock<()>>>>>;

/// 실행 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// 과거 방향 백필 중
    Backfilling,
    /// 현재 시점까지 따라잡는 중
    Current,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Backfilling => write!(f, "backfilling"),
            SyncPhase::Current => write!(f, "current"),
        }
    }
}

/// 한 심볼의 동기화 결과.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// 백필을 건너뛰었으면 `None`
    pub backfill: Option<BackfillReport>,
    pub forward: ForwardReport,
}

impl SyncReport {
    /// 새로 저장된 캔들 수.
    pub fn inserted(&self) -> usize {
        self.backfill.map_or(0, |b| b.inserted) + self.forward.inserted
    }

    /// 이미 있던 캔들 수.
    pub fn duplicates(&self) -> usize {
        self.backfill.map_or(0, |b| b.duplicates) + self.forward.duplicates
    }

    /// 소스 요청 수.
    pub fn pages(&self) -> usize {
        self.backfill.map_or(0, |b| b.pages) + self.forward.pages
    }
}

/// 저장 상태 요약 (`status` 명령).
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub state: Option<SyncState>,
    pub stored: u64,
    pub oldest_open_time: Option<i64>,
    pub newest_close_time: Option<i64>,
    pub gaps: Vec<Gap>,
}

/// 양방향 증분 동기화 실행기.
pub struct KlineSync {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn KlineStore>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    sync_locks: SyncLockMap,
}

impl KlineSync {
    /// 시스템 시계를 사용하는 실행기를 생성합니다. 설정 값은 `SyncConfig::normalized`로 보정됩니다.
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn KlineStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            clock: Arc::new(SystemClock),
            config: config.normalized(),
            sync_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 시계를 교체합니다.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn context(&self) -> SyncContext<'_> {
        SyncContext {
            source: self.source.as_ref(),
            store: self.store.as_ref(),
            clock: self.clock.as_ref(),
            config: &self.config,
        }
    }

    /// 키별 실행 락 획득 (없으면 생성).
    async fn sync_lock(&self, symbol: &str) -> Arc<RwLock<()>> {
        let key = format!("{}:{}", symbol, self.config.timeframe);

        let locks = self.sync_locks.read().await;
        if let Some(lock) = locks.get(&key) {
            return lock.clone();
        }
        drop(locks);

        let mut locks = self.sync_locks.write().await;
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// 백필 후 정방향 동기화를 한 번 수행합니다.
    pub async fn sync(&self, symbol: &str) -> Result<SyncReport> {
        let lock = self.sync_lock(symbol).await;
        let _guard = lock.write().await;

        let span = trader_core::sync_span!("sync", symbol, self.config.timeframe);
        self.sync_locked(symbol).instrument(span).await
    }

    async fn sync_locked(&self, symbol: &str) -> Result<SyncReport> {
        let ctx = self.context();

        let oldest = ctx.tracker(symbol).oldest_boundary().await?;
        let phase = match oldest {
            Some(o) if o.is_final => SyncPhase::Current,
            _ => SyncPhase::Backfilling,
        };
        info!(phase = %phase, "동기화 시작");

        let backfill = if phase == SyncPhase::Backfilling {
            let report = run_backfill(ctx, symbol).await?;
            info!(
                from = %SyncPhase::Backfilling,
                to = %SyncPhase::Current,
                outcome = ?report.outcome,
                "단계 전환"
            );
            Some(report)
        } else {
            None
        };

        let forward = run_forward(ctx, symbol).await?;

        Ok(SyncReport {
            symbol: symbol.to_string(),
            timeframe: self.config.timeframe,
            backfill,
            forward,
        })
    }

    /// 제한 시간 안에 `sync`를 수행합니다.
    ///
    /// 시간이 초과되면 진행 중이던 요청은 버려집니다. 이미 저장된 페이지는
    /// 유지되고 다음 실행은 저장된 워터마크에서 이어집니다.
    pub async fn sync_with_deadline(&self, symbol: &str, deadline: Duration) -> Result<SyncReport> {
        tokio::time::timeout(deadline, self.sync(symbol))
            .await
            .map_err(|_| CollectorError::DeadlineExceeded {
                symbol: symbol.to_string(),
                timeframe: self.config.timeframe,
                deadline,
            })?
    }

    /// 백필만 수행합니다.
    pub async fn backfill(&self, symbol: &str) -> Result<BackfillReport> {
        let lock = self.sync_lock(symbol).await;
        let _guard = lock.write().await;

        let span = trader_core::sync_span!("backfill", symbol, self.config.timeframe);
        run_backfill(self.context(), symbol).instrument(span).await
    }

    /// 정방향 동기화만 수행합니다.
    pub async fn forward(&self, symbol: &str) -> Result<ForwardReport> {
        let lock = self.sync_lock(symbol).await;
        let _guard = lock.write().await;

        let span = trader_core::sync_span!("forward", symbol, self.config.timeframe);
        run_forward(self.context(), symbol).instrument(span).await
    }

    /// 여러 심볼을 차례로 동기화합니다.
    ///
    /// 한 심볼이 실패해도 다음 심볼은 계속 진행합니다.
    pub async fn sync_symbols(&self, symbols: &[String]) -> SyncStats {
        let start = Instant::now();
        let mut stats = SyncStats::new();

        for (idx, symbol) in symbols.iter().enumerate() {
            tracing::debug!(
                symbol = %symbol,
                progress = format!("{}/{}", idx + 1, symbols.len()),
                "심볼 동기화 시작"
            );

            let result = match self.config.deadline() {
                Some(deadline) => self.sync_with_deadline(symbol, deadline).await,
                None => self.sync(symbol).await,
            };

            match result {
                Ok(report) => {
                    stats.record_success(&report);
                    info!(
                        symbol = %symbol,
                        inserted = report.inserted(),
                        duplicates = report.duplicates(),
                        pages = report.pages(),
                        "심볼 동기화 완료"
                    );
                }
                Err(e) => {
                    stats.record_error();
                    error!(
                        symbol = %symbol,
                        error = %e,
                        retryable = e.is_retryable(),
                        "심볼 동기화 실패"
                    );
                }
            }
        }

        stats.elapsed = start.elapsed();
        stats
    }

    /// 저장 상태를 조회합니다.
    pub async fn status(&self, symbol: &str) -> Result<SyncStatus> {
        let timeframe = self.config.timeframe;
        let store = self.store.as_ref();
        let storage_error =
            |e| CollectorError::storage_error(symbol, timeframe, FetchWindow::unbounded(), e);

        let state = store
            .load_sync_state(symbol, timeframe)
            .await
            .map_err(storage_error)?;
        let stored = store
            .count_klines(symbol, timeframe)
            .await
            .map_err(storage_error)?;
        let oldest = store
            .query_extreme(symbol, timeframe, Extreme::Oldest)
            .await
            .map_err(storage_error)?;
        let newest = store
            .query_extreme(symbol, timeframe, Extreme::Newest)
            .await
            .map_err(storage_error)?;
        let gaps = check_gaps(store, symbol, timeframe)
            .await
            .map_err(storage_error)?;

        Ok(SyncStatus {
            symbol: symbol.to_string(),
            timeframe,
            state,
            stored,
            oldest_open_time: oldest.map(|k| k.open_time),
            newest_close_time: newest.map(|k| k.close_time),
            gaps,
        })
    }
}
