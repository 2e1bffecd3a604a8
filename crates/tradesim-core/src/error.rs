//! 싱크 에러 타입.
//!
//! 싱크 실패는 재시도 여부에 따라 두 가지로 나뉩니다.

use thiserror::Error;

/// 싱크 전달 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// 일시적 실패 (연결 끊김, 브로커 불가 등). 재시도 대상.
    #[error("일시적 싱크 에러: {0}")]
    Transient(String),

    /// 영구적 실패 (잘못된 레코드, 스키마 위반 등). 재시도하지 않음.
    #[error("영구적 싱크 에러: {0}")]
    Permanent(String),
}

impl SinkError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
