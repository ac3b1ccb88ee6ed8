//! 캔들 데이터 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - `KlineStore` trait: 캔들 저장과 동기화 워터마크 읽기/쓰기
//! - PostgreSQL 저장소 (`PgKlineStore`)
//! - 메모리 저장소 (`MemoryKlineStore`, 테스트 및 dry-run용)
//! - 워터마크 병합 규칙 (`SyncState`)

pub mod error;
pub mod storage;

pub use error::{DataError, Result};
pub use storage::memory::MemoryKlineStore;
pub use storage::postgres::{Database, DatabaseConfig, PgKlineStore};
pub use storage::state::{OldestWatermark, SyncState, WatermarkUpdate};
pub use storage::{Extreme, InsertOutcome, InsertSummary, KlineStore};
