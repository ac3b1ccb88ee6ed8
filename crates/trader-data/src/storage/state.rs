//! 동기화 워터마크.
//!
//! 심볼/타임프레임마다 두 개의 경계를 유지합니다:
//! - 가장 오래된 경계: 과거 방향 백필이 어디까지 진행됐는지 (`open_time`)와
//!   더 과거 데이터가 없다는 확정 여부
//! - 가장 최근 경계: 정방향 동기화가 저장한 마지막 캔들의 `close_time`
//!
//! 두 경계는 단조적으로만 움직입니다. 오래된 경계는 과거로만, 최근 경계는
//! 미래로만 이동하고 확정 플래그는 한 번 켜지면 꺼지지 않습니다.

use serde::{Deserialize, Serialize};
use trader_core::TimestampMs;

/// 가장 오래된 경계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OldestWatermark {
    /// 저장된 가장 오래된 캔들의 open_time
    pub open_time: TimestampMs,
    /// 소스에 이보다 오래된 데이터가 없음이 확인됨
    pub is_final: bool,
}

/// 워터마크 갱신 요청.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkUpdate {
    /// 오래된 경계 갱신
    Oldest {
        open_time: TimestampMs,
        is_final: bool,
    },
    /// 최근 경계 갱신
    Latest { close_time: TimestampMs },
}

/// 한 (심볼, 타임프레임)의 동기화 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub oldest: Option<OldestWatermark>,
    pub latest_close_time: Option<TimestampMs>,
}

impl SyncState {
    /// 갱신을 병합합니다. 상태가 바뀌었으면 `true`.
    pub fn apply(&mut self, update: WatermarkUpdate) -> bool {
        let before = *self;
        match update {
            WatermarkUpdate::Oldest {
                open_time,
                is_final,
            } => {
                self.oldest = Some(match self.oldest {
                    Some(current) => OldestWatermark {
                        open_time: current.open_time.min(open_time),
                        is_final: current.is_final || is_final,
                    },
                    None => OldestWatermark {
                        open_time,
                        is_final,
                    },
                });
            }
            WatermarkUpdate::Latest { close_time } => {
                self.latest_close_time = Some(
                    self.latest_close_time
                        .map_or(close_time, |current| current.max(close_time)),
                );
            }
        }
        *self != before
    }

    /// 갱신을 병합한 새 상태를 반환합니다.
    pub fn merged(mut self, update: WatermarkUpdate) -> Self {
        self.apply(update);
        self
    }

    /// 더 이상 과거 방향으로 가져올 데이터가 없는지 여부.
    pub fn is_backfill_complete(&self) -> bool {
        self.oldest.is_some_and(|o| o.is_final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_oldest_moves_only_backwards() {
        let mut state = SyncState::default();
        assert!(state.apply(WatermarkUpdate::Oldest {
            open_time: 100,
            is_final: false
        }));
        assert!(!state.apply(WatermarkUpdate::Oldest {
            open_time: 200,
            is_final: false
        }));
        assert_eq!(state.oldest.map(|o| o.open_time), Some(100));

        state.apply(WatermarkUpdate::Oldest {
            open_time: 50,
            is_final: false,
        });
        assert_eq!(state.oldest.map(|o| o.open_time), Some(50));
    }

    #[test]
    fn test_final_flag_is_sticky() {
        let state = SyncState::default()
            .merged(WatermarkUpdate::Oldest {
                open_time: 100,
                is_final: true,
            })
            .merged(WatermarkUpdate::Oldest {
                open_time: 100,
                is_final: false,
            });
        assert!(state.is_backfill_complete());
    }

    #[test]
    fn test_latest_moves_only_forward() {
        let mut state = SyncState::default();
        state.apply(WatermarkUpdate::Latest { close_time: 500 });
        assert!(!state.apply(WatermarkUpdate::Latest { close_time: 400 }));
        assert_eq!(state.latest_close_time, Some(500));
        assert!(state.apply(WatermarkUpdate::Latest { close_time: 600 }));
        assert_eq!(state.latest_close_time, Some(600));
        assert!(state.oldest.is_none());
    }

    fn update_strategy() -> impl Strategy<Value = WatermarkUpdate> {
        prop_oneof![
            (0i64..1_000_000, any::<bool>()).prop_map(|(open_time, is_final)| {
                WatermarkUpdate::Oldest {
                    open_time,
                    is_final,
                }
            }),
            (0i64..1_000_000).prop_map(|close_time| WatermarkUpdate::Latest { close_time }),
        ]
    }

    proptest! {
        #[test]
        fn prop_watermarks_are_monotonic(updates in prop::collection::vec(update_strategy(), 1..50)) {
            let mut state = SyncState::default();
            for update in updates {
                let before = state;
                state.apply(update);

                if let (Some(b), Some(a)) = (before.oldest, state.oldest) {
                    prop_assert!(a.open_time <= b.open_time);
                    prop_assert!(!b.is_final || a.is_final);
                }
                if let (Some(b), Some(a)) = (before.latest_close_time, state.latest_close_time) {
                    prop_assert!(a >= b);
                }
                prop_assert!(before.oldest.is_none() || state.oldest.is_some());
                prop_assert!(before.latest_close_time.is_none() || state.latest_close_time.is_some());
            }
        }
    }
}
