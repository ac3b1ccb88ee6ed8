//! 저장된 캔들의 누락 구간 탐지.

use serde::Serialize;
use trader_core::{Timeframe, TimestampMs};
use trader_data::KlineStore;

/// 연속된 두 캔들 사이의 누락 구간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gap {
    /// 누락 직전 캔들의 open_time
    pub after_open_time: TimestampMs,
    /// 빠진 캔들 수
    pub missing: u64,
}

/// 오름차순 open_time 목록에서 누락 구간을 찾습니다.
pub fn find_gaps(open_times: &[TimestampMs], step_ms: i64) -> Vec<Gap> {
    if step_ms <= 0 {
        return Vec::new();
    }

    open_times
        .windows(2)
        .filter_map(|pair| {
            let diff = pair[1] - pair[0];
            // 간격을 step 단위로 올림한 뒤 자기 자신을 뺀 수가 누락 수
            let steps = (diff + step_ms - 1) / step_ms;
            (steps > 1).then(|| Gap {
                after_open_time: pair[0],
                missing: (steps - 1) as u64,
            })
        })
        .collect()
}

/// 저장소에서 심볼의 누락 구간을 찾습니다.
pub async fn check_gaps(
    store: &dyn KlineStore,
    symbol: &str,
    timeframe: Timeframe,
) -> trader_data::Result<Vec<Gap>> {
    let open_times = store.list_open_times(symbol, timeframe).await?;
    let gaps = find_gaps(&open_times, timeframe.as_millis());

    if !gaps.is_empty() {
        let missing: u64 = gaps.iter().map(|g| g.missing).sum();
        tracing::warn!(
            symbol,
            timeframe = %timeframe,
            gaps = gaps.len(),
            missing,
            "누락 구간 발견"
        );
    }
    Ok(gaps)
}
