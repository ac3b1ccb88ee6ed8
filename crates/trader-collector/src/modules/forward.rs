//! 정방향 동기화.
//!
//! 최근 워터마크 다음 시점부터 현재까지 `[start_time, end_time]` 요청으로
//! 한 페이지씩 따라잡습니다.

use serde::Serialize;
use tracing::{debug, info};
use trader_core::{Kline, PageBounds};
use trader_exchange::KlineRequest;

use super::context::SyncContext;
use crate::error::FetchWindow;
use crate::Result;

/// 정방향 동기화 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ForwardReport {
    pub pages: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// 실행 후 최근 워터마크
    pub latest_close_time: Option<i64>,
}

/// 심볼 하나를 현재 시점까지 따라잡습니다.
pub async fn run_forward(ctx: SyncContext<'_>, symbol: &str) -> Result<ForwardReport> {
    let config = ctx.config;
    let tracker = ctx.tracker(symbol);
    let now = ctx.clock.now_ms();
    let latest = tracker.latest_boundary().await?;

    let mut report = ForwardReport {
        latest_close_time: latest,
        ..Default::default()
    };
    // 저장된 캔들이 없던 상태에서 처음 받은 페이지는 오래된 경계도 함께 기록
    let mut seed_oldest = latest.is_none();

    let mut start = latest.map_or(now - config.horizon_ms(), |t| t + 1);
    let end = now;

    if start >= end {
        debug!(symbol, start, end, "이미 최신 상태");
        return Ok(report);
    }

    loop {
        let request = KlineRequest::new(symbol, config.timeframe)
            .with_start(start)
            .with_end(end)
            .with_limit(config.page_size);
        let page = ctx.fetch_page(&request).await?;
        report.pages += 1;

        let Some(raw) = PageBounds::of(&page) else {
            break;
        };

        // 요청 시작보다 앞의 캔들은 겹치는 재조회분. 저장은 하되 경계 계산에서 제외
        let window = FetchWindow::from(&request);
        let in_window: Vec<Kline> = page
            .iter()
            .filter(|k| k.close_time >= start)
            .cloned()
            .collect();

        let summary = ctx.store_page(&request, &page).await?;
        report.inserted += summary.inserted;
        report.duplicates += summary.duplicates;

        let Some(bounds) = PageBounds::of(&in_window) else {
            debug!(symbol, received = page.len(), start, "요청 구간에 새 캔들 없음");
            break;
        };

        let state = tracker.mark_latest(bounds.max_close_time, window).await?;
        report.latest_close_time = state.latest_close_time;
        if seed_oldest {
            tracker
                .mark_oldest(raw.min_open_time, false, window)
                .await?;
            seed_oldest = false;
        }

        debug!(
            symbol,
            received = page.len(),
            inserted = summary.inserted,
            latest = bounds.max_close_time,
            ascending = bounds.ascending,
            "정방향 페이지 저장"
        );

        if page.len() < config.page_size as usize {
            break;
        }
        start = bounds.max_close_time + 1;
        if start >= end {
            break;
        }
        tokio::time::sleep(config.request_delay()).await;
    }

    info!(
        symbol,
        pages = report.pages,
        inserted = report.inserted,
        latest = ?report.latest_close_time,
        "정방향 동기화 완료"
    );
    Ok(report)
}
