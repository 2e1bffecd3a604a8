//! 체결 데이터셋 로딩 및 전달 싱크.
//!
//! 이 crate는 다음을 제공합니다:
//! - CSV 체결 데이터셋 로더 (누락 컬럼 자동 보완)
//! - 데이터베이스에서 CSV 데이터셋을 내보내는 부트스트랩
//! - PostgreSQL 배치 INSERT 싱크
//! - Kafka 토픽 발행 싱크 (`kafka` feature)

pub mod error;
pub mod sink;
pub mod source;

pub use error::{DataError, Result};

// 소스 재내보내기
pub use source::loader::{load_csv, REQUIRED_COLUMNS};
pub use source::export::export_from_database;
pub use source::TradeDataset;

// 싱크 재내보내기
pub use sink::database::{DatabaseSink, DatabaseSinkConfig};
pub use sink::queue::{QueueSink, QueueSinkConfig, TopicPublisher};
pub use sink::{ConfiguredSink, SinkMode, SinkSettings};

#[cfg(feature = "kafka")]
pub use sink::queue::KafkaPublisher;
