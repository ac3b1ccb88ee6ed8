//! 저장소 에러.

use thiserror::Error;

/// 캔들/워터마크 저장소 에러.
#[derive(Debug, Error)]
pub enum DataError {
    /// DB에 연결할 수 없음 (재시도 가능)
    #[error("DB 연결 실패: {0}")]
    ConnectionError(String),

    /// 커넥션 풀 대기 시간 초과 (재시도 가능)
    #[error("커넥션 풀 대기 시간 초과")]
    PoolExhausted,

    #[error("스키마 마이그레이션 실패: {0}")]
    MigrationError(String),

    /// 같은 키의 캔들이 이미 있음
    #[error("이미 저장된 캔들: {0}")]
    DuplicateError(String),

    /// 저장된 행을 도메인 타입으로 옮길 수 없음
    #[error("저장 데이터 변환 실패: {0}")]
    InvalidData(String),

    #[error("쿼리 실패: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Io(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::PoolClosed => DataError::ConnectionError("pool closed".to_string()),
            // 23505: unique_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                DataError::DuplicateError(db.message().to_string())
            }
            sqlx::Error::Database(db) => DataError::QueryError(db.message().to_string()),
            other => DataError::QueryError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
