//! 도메인 공통 에러 타입.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 캔들 데이터 무결성 위반
    #[error("잘못된 캔들: {0}")]
    InvalidKline(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type TraderResult<T> = Result<T, TraderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TraderError::InvalidKline("high < low".to_string());
        assert_eq!(err.to_string(), "잘못된 캔들: high < low");

        let err = TraderError::InvalidInput("Unsupported timeframe: 7m".to_string());
        assert_eq!(err.to_string(), "잘못된 입력: Unsupported timeframe: 7m");
    }
}
