//! 메모리 기반 캔들 데이터 소스.
//!
//! Binance `/api/v3/klines`의 범위 규칙을 흉내냅니다:
//! - `start_time`이 있으면 그 시점부터 오래된 순으로 최대 `limit`개
//! - `end_time`만 있으면 그 시점 이전의 가장 최근 `limit`개
//! - 둘 다 없으면 가장 최근 `limit`개
//!
//! 반환 순서는 [`SourceOrder`]로 바꿀 수 있어, 정렬 방향을 가정하지 않는
//! 호출자를 검증할 수 있습니다.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use trader_core::{Kline, TimestampMs};

use crate::traits::{ExchangeResult, KlineRequest, MarketDataSource};
use crate::ExchangeError;

/// 시뮬레이션 소스의 반환 순서.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceOrder {
    /// 오래된 것부터
    #[default]
    Ascending,
    /// 최신 것부터
    Descending,
}

#[derive(Debug, Default)]
struct SourceState {
    /// open_time 기준으로 정렬된 캔들
    klines: BTreeMap<TimestampMs, Kline>,
    /// 지금까지 받은 요청
    requests: Vec<KlineRequest>,
    /// 이 횟수만큼 성공한 뒤부터 실패
    fail_after: Option<usize>,
}

/// 메모리 기반 캔들 데이터 소스.
#[derive(Debug, Default)]
pub struct SimulatedKlineSource {
    order: SourceOrder,
    state: Mutex<SourceState>,
}

impl SimulatedKlineSource {
    /// 주어진 캔들로 소스를 생성합니다.
    pub fn new(klines: impl IntoIterator<Item = Kline>) -> Self {
        let source = Self::default();
        source.push(klines);
        source
    }

    /// 반환 순서를 설정합니다.
    pub fn with_order(mut self, order: SourceOrder) -> Self {
        self.order = order;
        self
    }

    /// 캔들을 추가합니다 (같은 open_time은 덮어씀).
    pub fn push(&self, klines: impl IntoIterator<Item = Kline>) {
        let mut state = self.lock();
        for kline in klines {
            state.klines.insert(kline.open_time, kline);
        }
    }

    /// `n`번 성공한 이후의 모든 요청을 네트워크 에러로 실패시킵니다.
    pub fn fail_after(&self, n: usize) {
        self.lock().fail_after = Some(n);
    }

    /// 실패 주입을 해제합니다.
    pub fn recover(&self) {
        self.lock().fail_after = None;
    }

    /// 지금까지 받은 요청 목록.
    pub fn requests(&self) -> Vec<KlineRequest> {
        self.lock().requests.clone()
    }

    /// 지금까지 받은 요청 수.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SourceState> {
        // 테스트 중 패닉으로 poison되어도 상태는 그대로 사용
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MarketDataSource for SimulatedKlineSource {
    fn name(&self) -> &str {
        "Simulated"
    }

    async fn fetch_klines(&self, request: &KlineRequest) -> ExchangeResult<Vec<Kline>> {
        let mut state = self.lock();

        if let Some(limit) = state.fail_after {
            if state.requests.len() >= limit {
                return Err(ExchangeError::NetworkError(format!(
                    "simulated failure for {}",
                    request
                )));
            }
        }
        state.requests.push(request.clone());

        let limit = request.limit as usize;
        let lower = request.start_time.unwrap_or(TimestampMs::MIN);
        let upper = request.end_time.unwrap_or(TimestampMs::MAX);
        if lower > upper {
            return Ok(Vec::new());
        }

        let in_range = state
            .klines
            .range(lower..=upper)
            .map(|(_, k)| k)
            .filter(|k| k.timeframe == request.timeframe);

        let mut page: Vec<Kline> = if request.start_time.is_some() {
            in_range.take(limit).cloned().collect()
        } else {
            let mut newest: Vec<Kline> = in_range.rev().take(limit).cloned().collect();
            newest.reverse();
            newest
        };

        if self.order == SourceOrder::Descending {
            page.reverse();
        }

        Ok(page)
    }
}
