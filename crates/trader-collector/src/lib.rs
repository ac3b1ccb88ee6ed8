//! 일봉 캔들 양방향 증분 동기화.
//!
//! 이 crate는 원격 캔들 API를 페이지 단위로 조회해 로컬 저장소를 빈틈없이
//! 유지하는 동기화 엔진과 이를 실행하는 바이너리를 제공합니다:
//! - 과거 방향 백필 (한계 시점 또는 소스 데이터 소진까지)
//! - 정방향 동기화 (마지막 저장 시점부터 현재까지)
//! - 재시작 시 이어서 진행하기 위한 워터마크 기록

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, SyncConfig};
pub use error::{CollectorError, FetchWindow, Result};
pub use modules::{KlineSync, SyncReport};
pub use stats::SyncStats;
