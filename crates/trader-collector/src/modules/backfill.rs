//! 과거 방향 백필.
//!
//! 가장 오래된 워터마크에서 시작해 `end_time`만 지정한 요청으로 한 페이지씩
//! 과거로 내려갑니다. 소스가 빈 페이지나 `page_size`보다 짧은 페이지를 주면
//! 더 과거 데이터가 없는 것으로 보고 워터마크를 확정합니다. 요청한 끝 시점보다
//! 뒤의 캔들만 돌려준 페이지도 빈 페이지로 취급합니다. 한계 시점을 지나치면
//! 확정하지 않고 종료합니다.

use serde::Serialize;
use tracing::{debug, info};
use trader_core::{Kline, PageBounds, TimestampMs};
use trader_data::InsertSummary;
use trader_exchange::KlineRequest;

use super::context::SyncContext;
use crate::error::FetchWindow;
use crate::Result;

/// 백필 종료 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillOutcome {
    /// 이미 확정된 워터마크. 요청하지 않음
    AlreadyComplete,
    /// 소스에 더 과거 데이터가 없음 (워터마크 확정)
    Exhausted,
    /// 한계 시점 도달 (워터마크 미확정)
    HorizonReached,
}

/// 백필 실행 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub outcome: BackfillOutcome,
    pub pages: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

impl BackfillReport {
    fn new(outcome: BackfillOutcome) -> Self {
        Self {
            outcome,
            pages: 0,
            inserted: 0,
            duplicates: 0,
        }
    }
}

/// 심볼 하나를 과거 방향으로 백필합니다.
pub async fn run_backfill(ctx: SyncContext<'_>, symbol: &str) -> Result<BackfillReport> {
    let config = ctx.config;
    let tracker = ctx.tracker(symbol);
    let now = ctx.clock.now_ms();
    let horizon = now - config.horizon_ms();

    let oldest = tracker.oldest_boundary().await?;
    let mut window_end: TimestampMs = match oldest {
        Some(oldest) if oldest.is_final => {
            debug!(symbol, oldest = oldest.open_time, "백필 이미 완료");
            return Ok(BackfillReport::new(BackfillOutcome::AlreadyComplete));
        }
        Some(oldest) => oldest.open_time - 1,
        None => now,
    };
    // 빈 저장소에서 시작하면 첫 페이지가 가장 최근 구간
    let mut seed_latest = oldest.is_none();

    info!(
        symbol,
        timeframe = %config.timeframe,
        window_end,
        horizon,
        "백필 시작"
    );

    let mut report = BackfillReport::new(BackfillOutcome::HorizonReached);

    loop {
        if window_end < horizon {
            info!(symbol, window_end, horizon, pages = report.pages, "백필 한계 도달");
            report.outcome = BackfillOutcome::HorizonReached;
            return Ok(report);
        }

        let request = KlineRequest::new(symbol, config.timeframe)
            .with_end(window_end)
            .with_limit(config.page_size);
        let page = ctx.fetch_page(&request).await?;
        report.pages += 1;

        // 요청 끝보다 뒤의 캔들은 겹치는 재조회분. 저장은 하되 경계 계산에서 제외
        let window = FetchWindow::from(&request);
        let in_window: Vec<Kline> = page
            .iter()
            .filter(|k| k.open_time <= window_end)
            .cloned()
            .collect();

        let summary = if page.is_empty() {
            InsertSummary::default()
        } else {
            ctx.store_page(&request, &page).await?
        };
        report.inserted += summary.inserted;
        report.duplicates += summary.duplicates;

        let Some(bounds) = PageBounds::of(&in_window) else {
            let at = tracker.oldest_stored().await?.unwrap_or(window_end);
            tracker.mark_oldest(at, true, window).await?;
            info!(
                symbol,
                oldest = at,
                received = page.len(),
                pages = report.pages,
                "백필 완료 (요청 구간에 캔들 없음)"
            );
            report.outcome = BackfillOutcome::Exhausted;
            return Ok(report);
        };

        window_end = bounds.min_open_time - 1;

        let is_short = page.len() < config.page_size as usize;
        tracker
            .mark_oldest(bounds.min_open_time, is_short, window)
            .await?;
        if seed_latest {
            if let Some(raw) = PageBounds::of(&page) {
                tracker.mark_latest(raw.max_close_time, window).await?;
            }
            seed_latest = false;
        }

        debug!(
            symbol,
            received = page.len(),
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            oldest = bounds.min_open_time,
            ascending = bounds.ascending,
            "백필 페이지 저장"
        );

        if is_short {
            info!(
                symbol,
                oldest = bounds.min_open_time,
                pages = report.pages,
                inserted = report.inserted,
                "백필 완료"
            );
            report.outcome = BackfillOutcome::Exhausted;
            return Ok(report);
        }

        if window_end >= horizon {
            tokio::time::sleep(config.request_delay()).await;
        }
    }
}
