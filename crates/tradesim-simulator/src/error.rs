//! 에러 타입 정의.

use thiserror::Error;
use tradesim_core::SinkError;
use tradesim_data::DataError;

/// 시뮬레이터 에러 타입.
///
/// `Config`, `EmptyDataset`, 그리고 시작 단계의 `Data` 에러는 루프 시작 전에
/// 프로세스를 종료시킵니다. 배치 단위 싱크 실패는 여기까지 올라오지 않습니다.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 샘플링할 데이터가 없음
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// 데이터셋 로드/싱크 연결 에러
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// 잘못된 수명주기 상태에서의 호출
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 싱크 종료 에러
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl SimulatorError {
    /// 설정 관련 에러인지 (싱크 연결 설정 누락 포함).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Data(DataError::ConfigError(_))
        )
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, SimulatorError>;
