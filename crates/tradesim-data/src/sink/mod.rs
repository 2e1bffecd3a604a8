//! 체결 배치 싱크 구현.
//!
//! 싱크는 시작 시 `MODE` 설정으로 한 번만 선택됩니다.
//! 선택 지점 이후에는 `ConfiguredSink` enum이 정적으로 분기합니다.

pub mod database;
pub mod queue;

use crate::error::{DataError, Result};
use async_trait::async_trait;
use tradesim_core::{SinkError, TradeRecord, TradeSink};

use database::{DatabaseSink, DatabaseSinkConfig};
use queue::QueueSinkConfig;

#[cfg(feature = "kafka")]
use queue::{KafkaPublisher, QueueSink};

/// 싱크 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// 데이터베이스 배치 INSERT
    #[default]
    Database,
    /// Kafka 토픽 발행
    Kafka,
}

impl std::str::FromStr for SinkMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "db" => Ok(Self::Database),
            "kafka" => Ok(Self::Kafka),
            _ => Err(format!("Unsupported mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "db"),
            Self::Kafka => write!(f, "kafka"),
        }
    }
}

/// 선택된 모드의 싱크 연결 설정.
#[derive(Debug, Clone)]
pub enum SinkSettings {
    Database(DatabaseSinkConfig),
    Queue(QueueSinkConfig),
}

impl SinkSettings {
    pub fn mode(&self) -> SinkMode {
        match self {
            Self::Database(_) => SinkMode::Database,
            Self::Queue(_) => SinkMode::Kafka,
        }
    }
}

/// 설정으로 선택된 싱크.
pub enum ConfiguredSink {
    Database(DatabaseSink),
    #[cfg(feature = "kafka")]
    Queue(QueueSink<KafkaPublisher>),
}

impl ConfiguredSink {
    /// 설정에 맞는 싱크를 생성하고 연결합니다.
    ///
    /// # Errors
    ///
    /// - `DataError::ConfigError`: 선택된 모드에 필요한 연결 설정 누락
    /// - `DataError::ConnectionError`: 연결 실패
    pub async fn connect(settings: &SinkSettings) -> Result<Self> {
        match settings {
            SinkSettings::Database(config) => {
                Ok(Self::Database(DatabaseSink::connect(config).await?))
            }
            #[cfg(feature = "kafka")]
            SinkSettings::Queue(config) => {
                let publisher = KafkaPublisher::create(config)?;
                Ok(Self::Queue(QueueSink::new(publisher, config)?))
            }
            #[cfg(not(feature = "kafka"))]
            SinkSettings::Queue(_) => Err(DataError::ConfigError(
                "kafka mode requires the `kafka` feature".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TradeSink for ConfiguredSink {
    fn name(&self) -> &str {
        match self {
            Self::Database(sink) => sink.name(),
            #[cfg(feature = "kafka")]
            Self::Queue(sink) => sink.name(),
        }
    }

    async fn deliver(&self, records: &[TradeRecord]) -> std::result::Result<usize, SinkError> {
        match self {
            Self::Database(sink) => sink.deliver(records).await,
            #[cfg(feature = "kafka")]
            Self::Queue(sink) => sink.deliver(records).await,
        }
    }

    async fn close(&self) -> std::result::Result<(), SinkError> {
        match self {
            Self::Database(sink) => sink.close().await,
            #[cfg(feature = "kafka")]
            Self::Queue(sink) => sink.close().await,
        }
    }
}

/// 필수 연결 설정 값을 꺼냅니다. 비어 있으면 설정 오류입니다.
pub(crate) fn required_setting<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DataError::ConfigError(format!(
            "{} is required for the selected mode",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_mode_from_str() {
        assert_eq!("db".parse::<SinkMode>().unwrap(), SinkMode::Database);
        assert_eq!("KAFKA".parse::<SinkMode>().unwrap(), SinkMode::Kafka);
        assert!("s3".parse::<SinkMode>().is_err());
        assert_eq!(SinkMode::Kafka.to_string(), "kafka");
    }

    #[test]
    fn test_required_setting() {
        assert_eq!(
            required_setting(&Some("postgres://x".to_string()), "DATABASE_URL").unwrap(),
            "postgres://x"
        );
        assert!(matches!(
            required_setting(&Some("  ".to_string()), "DATABASE_URL"),
            Err(DataError::ConfigError(_))
        ));
        assert!(required_setting(&None, "KAFKA_BROKER").is_err());
    }

    #[tokio::test]
    async fn test_connect_without_database_url_is_config_error() {
        let settings = SinkSettings::Database(DatabaseSinkConfig::default());

        let result = ConfiguredSink::connect(&settings).await;

        assert!(matches!(result, Err(DataError::ConfigError(_))));
    }
}
