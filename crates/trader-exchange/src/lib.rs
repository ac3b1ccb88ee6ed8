//! 캔들 데이터 소스.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `MarketDataSource` trait: 페이지 단위 캔들 조회 인터페이스
//! - Binance REST 커넥터 (`/api/v3/klines`)
//! - 시뮬레이션 데이터 소스 (테스트 및 dry-run용)

pub mod connector;
pub mod error;
pub mod simulated;
pub mod traits;

pub use connector::binance::{BinanceClient, BinanceConfig};
pub use error::*;
pub use simulated::{SimulatedKlineSource, SourceOrder};
pub use traits::*;
