//! 공통 타입 정의.

mod timeframe;

pub use timeframe::*;

/// 밀리초 단위 Unix 타임스탬프.
pub type TimestampMs = i64;
