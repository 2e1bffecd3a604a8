//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터셋 파일이 없음
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// 파일 I/O 오류
    #[error("I/O error: {0}")]
    Io(String),

    /// CSV 형식 오류
    #[error("CSV error: {0}")]
    Csv(String),

    /// 셀 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),

}

impl DataError {
    /// 다시 시도하면 성공할 수 있는 오류인지 확인합니다.
    ///
    /// 파일 I/O, 연결, 풀 소진만 재시도 대상입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::Io(_) | DataError::ConnectionError(_) | DataError::PoolExhausted
        )
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            DataError::NotFound(err.to_string())
        } else {
            DataError::Io(err.to_string())
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => DataError::from(io),
                other => DataError::Csv(format!("{:?}", other)),
            }
        } else {
            DataError::Csv(err.to_string())
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Io(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::Tls(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
