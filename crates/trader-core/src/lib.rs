//! # Trader Core
//!
//! 캔들(kline) 동기화 시스템의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 워크스페이스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 일봉 캔들 데이터 (`Kline`) 및 페이지 경계 계산
//! - 타임프레임 정의
//! - 공통 에러 타입
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
