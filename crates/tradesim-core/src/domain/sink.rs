//! 체결 배치 싱크 추상화.
//!
//! 데이터베이스나 메시지 큐처럼 배치를 받아 저장/발행하는 대상을
//! 싱크 중립적인 인터페이스로 감쌉니다.

use async_trait::async_trait;

use super::TradeRecord;
use crate::error::SinkError;

/// 체결 배치 싱크 trait.
///
/// 배치는 하나의 단위로 성공하거나 실패합니다. 구현체는 서로 다른 배치에 대한
/// 동시 호출에 안전해야 하며, 호출마다 자체 연결(또는 발행 핸들)을 확보해야 합니다.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct StdoutSink;
///
/// #[async_trait]
/// impl TradeSink for StdoutSink {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     async fn deliver(&self, records: &[TradeRecord]) -> Result<usize, SinkError> {
///         for record in records {
///             println!("{:?}", record);
///         }
///         Ok(records.len())
///     }
/// }
/// ```
#[async_trait]
pub trait TradeSink: Send + Sync {
    /// 로그에 표시할 싱크 이름.
    fn name(&self) -> &str;

    /// 배치를 전달하고 전달된 레코드 수를 반환합니다.
    ///
    /// # Errors
    ///
    /// - `SinkError::Transient`: 연결 끊김, 브로커 불가 등 재시도 가능한 실패
    /// - `SinkError::Permanent`: 잘못된 레코드, 스키마 위반 등 재시도 불가능한 실패
    async fn deliver(&self, records: &[TradeRecord]) -> Result<usize, SinkError>;

    /// 남은 쓰기를 모두 내보내고 싱크를 닫습니다.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
