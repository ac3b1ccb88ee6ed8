//! 시뮬레이션 데이터 소스.
//!
//! 실제 거래소 없이 동기화 엔진을 실행하기 위한 메모리 기반 소스입니다.

mod kline_source;

pub use kline_source::{SimulatedKlineSource, SourceOrder};
