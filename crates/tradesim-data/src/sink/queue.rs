//! 메시지 큐 발행 싱크.
//!
//! 레코드를 하나씩 JSON으로 직렬화해 토픽에 발행하고, 각 메시지의 전달 결과를
//! 모두 기다립니다. 배치는 모든 메시지의 전달이 확인되어야 성공입니다.

use crate::error::Result;
use crate::sink::required_setting;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use tradesim_core::{SinkError, TradeRecord, TradeSink};

/// 큐 싱크 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSinkConfig {
    /// 브로커 주소 (host:port)
    pub broker: Option<String>,
    /// 발행 대상 토픽
    pub topic: Option<String>,
    /// 메시지 전달 타임아웃 (밀리초)
    #[serde(default = "default_message_timeout")]
    pub message_timeout_ms: u64,
    /// 종료 시 flush 타임아웃 (초)
    #[serde(default = "default_flush_timeout")]
    pub flush_timeout_secs: u64,
}

fn default_message_timeout() -> u64 {
    5000
}
fn default_flush_timeout() -> u64 {
    10
}

impl Default for QueueSinkConfig {
    fn default() -> Self {
        Self {
            broker: Some("localhost:9092".to_string()),
            topic: Some("trades".to_string()),
            message_timeout_ms: default_message_timeout(),
            flush_timeout_secs: default_flush_timeout(),
        }
    }
}

impl QueueSinkConfig {
    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }
}

/// 토픽 발행 클라이언트 추상화.
///
/// `publish`는 해당 메시지의 전달 결과가 도착할 때 완료됩니다.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// 메시지 하나를 발행하고 전달 확인을 기다립니다.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> std::result::Result<(), SinkError>;

    /// 아직 전달되지 않은 메시지를 모두 내보냅니다.
    async fn flush(&self, timeout: Duration) -> std::result::Result<(), SinkError>;
}

/// 토픽 발행 싱크.
pub struct QueueSink<P> {
    publisher: P,
    topic: String,
    flush_timeout: Duration,
}

impl<P: TopicPublisher> QueueSink<P> {
    pub fn new(publisher: P, config: &QueueSinkConfig) -> Result<Self> {
        let topic = required_setting(&config.topic, "KAFKA_TOPIC")?;
        Ok(Self {
            publisher,
            topic: topic.to_string(),
            flush_timeout: config.flush_timeout(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

#[async_trait]
impl<P: TopicPublisher> TradeSink for QueueSink<P> {
    fn name(&self) -> &str {
        "kafka"
    }

    async fn deliver(&self, records: &[TradeRecord]) -> std::result::Result<usize, SinkError> {
        let payloads = records
            .iter()
            .map(|record| serde_json::to_vec(record).map(|payload| (record.ticker.as_str(), payload)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SinkError::permanent(format!("trade serialization failed: {}", e)))?;

        let results = join_all(
            payloads
                .iter()
                .map(|(key, payload)| self.publisher.publish(&self.topic, key, payload)),
        )
        .await;

        let mut failed = 0usize;
        let mut batch_error: Option<SinkError> = None;
        for err in results.into_iter().filter_map(|r| r.err()) {
            failed += 1;
            // 영구적 실패가 하나라도 있으면 배치 전체를 영구적 실패로 본다
            let replace = match &batch_error {
                None => true,
                Some(current) => current.is_transient() && !err.is_transient(),
            };
            if replace {
                batch_error = Some(err);
            }
        }

        match batch_error {
            None => Ok(records.len()),
            Some(err) => {
                warn!(
                    topic = %self.topic,
                    failed = failed,
                    total = records.len(),
                    error = %err,
                    "Message delivery failed"
                );
                Err(err)
            }
        }
    }

    async fn close(&self) -> std::result::Result<(), SinkError> {
        self.publisher.flush(self.flush_timeout).await?;
        info!(topic = %self.topic, "Producer flushed");
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;

#[cfg(feature = "kafka")]
mod kafka {
    use super::{QueueSinkConfig, TopicPublisher};
    use crate::error::{DataError, Result};
    use crate::sink::required_setting;
    use async_trait::async_trait;
    use rdkafka::error::{KafkaError, RDKafkaErrorCode};
    use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
    use rdkafka::util::Timeout;
    use rdkafka::ClientConfig;
    use std::time::Duration;
    use tracing::{debug, info};
    use tradesim_core::SinkError;

    /// rdkafka 기반 발행 클라이언트.
    #[derive(Clone)]
    pub struct KafkaPublisher {
        producer: FutureProducer,
        queue_timeout: Duration,
    }

    impl KafkaPublisher {
        pub fn create(config: &QueueSinkConfig) -> Result<Self> {
            let broker = required_setting(&config.broker, "KAFKA_BROKER")?;

            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", broker)
                .set("message.timeout.ms", config.message_timeout_ms.to_string())
                .create()
                .map_err(|e| DataError::ConfigError(format!("kafka producer: {}", e)))?;

            info!(broker = broker, "Kafka producer created");

            Ok(Self {
                producer,
                queue_timeout: config.message_timeout(),
            })
        }
    }

    #[async_trait]
    impl TopicPublisher for KafkaPublisher {
        async fn publish(
            &self,
            topic: &str,
            key: &str,
            payload: &[u8],
        ) -> std::result::Result<(), SinkError> {
            let record = FutureRecord::to(topic).key(key).payload(payload);

            match self
                .producer
                .send(record, Timeout::After(self.queue_timeout))
                .await
            {
                Ok((partition, offset)) => {
                    debug!(topic = topic, partition, offset, "Message delivered");
                    Ok(())
                }
                Err((err, _message)) => Err(classify_kafka_error(&err)),
            }
        }

        async fn flush(&self, timeout: Duration) -> std::result::Result<(), SinkError> {
            let producer = self.producer.clone();
            tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
                .await
                .map_err(|e| SinkError::transient(format!("flush task failed: {}", e)))?
                .map_err(|e| classify_kafka_error(&e))
        }
    }

    /// 메시지 크기/형식, 토픽 권한 문제만 영구적입니다.
    pub(crate) fn classify_kafka_error(err: &KafkaError) -> SinkError {
        let permanent = matches!(
            err.rdkafka_error_code(),
            Some(
                RDKafkaErrorCode::MessageSizeTooLarge
                    | RDKafkaErrorCode::InvalidMessage
                    | RDKafkaErrorCode::InvalidMessageSize
                    | RDKafkaErrorCode::UnknownTopic
                    | RDKafkaErrorCode::InvalidTopic
                    | RDKafkaErrorCode::TopicAuthorizationFailed
            )
        );

        if permanent {
            SinkError::Permanent(err.to_string())
        } else {
            SinkError::Transient(err.to_string())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 발행된 메시지를 기록하는 테스트용 발행기
    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String, Vec<u8>)>>,
        transient_for: Option<String>,
        permanent_for: Option<String>,
        flushes: AtomicUsize,
    }

    #[async_trait]
    impl TopicPublisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            key: &str,
            payload: &[u8],
        ) -> std::result::Result<(), SinkError> {
            if self.transient_for.as_deref() == Some(key) {
                return Err(SinkError::transient("broker unavailable"));
            }
            if self.permanent_for.as_deref() == Some(key) {
                return Err(SinkError::permanent("message too large"));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), key.to_string(), payload.to_vec()));
            Ok(())
        }

        async fn flush(&self, _timeout: Duration) -> std::result::Result<(), SinkError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn batch(tickers: &[&str]) -> Vec<TradeRecord> {
        tickers
            .iter()
            .map(|t| TradeRecord::new(*t, dec!(10.5), 1))
            .collect()
    }

    #[tokio::test]
    async fn test_each_record_is_published_individually() {
        let sink = QueueSink::new(RecordingPublisher::default(), &QueueSinkConfig::default()).unwrap();

        let delivered = sink.deliver(&batch(&["AAPL", "MSFT", "AAPL"])).await.unwrap();

        assert_eq!(delivered, 3);
        assert_eq!(sink.topic(), "trades");
        let published = sink.publisher().published.lock().unwrap();
        assert_eq!(published.len(), 3);
        assert!(published.iter().all(|(topic, _, _)| topic == "trades"));

        let payload: serde_json::Value = serde_json::from_slice(&published[1].2).unwrap();
        assert_eq!(payload["ticker"], "MSFT");
        assert_eq!(published[1].1, "MSFT");
    }

    #[tokio::test]
    async fn test_one_failed_delivery_fails_the_batch() {
        let publisher = RecordingPublisher {
            transient_for: Some("MSFT".to_string()),
            ..Default::default()
        };
        let sink = QueueSink::new(publisher, &QueueSinkConfig::default()).unwrap();

        let err = sink.deliver(&batch(&["AAPL", "MSFT"])).await.unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_permanent_failure_wins_over_transient() {
        let publisher = RecordingPublisher {
            transient_for: Some("AAPL".to_string()),
            permanent_for: Some("MSFT".to_string()),
            ..Default::default()
        };
        let sink = QueueSink::new(publisher, &QueueSinkConfig::default()).unwrap();

        let err = sink.deliver(&batch(&["AAPL", "MSFT", "AAPL"])).await.unwrap_err();

        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_close_flushes_publisher() {
        let sink = QueueSink::new(RecordingPublisher::default(), &QueueSinkConfig::default()).unwrap();

        sink.close().await.unwrap();

        assert_eq!(sink.publisher().flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_topic_is_config_error() {
        let config = QueueSinkConfig {
            topic: None,
            ..Default::default()
        };

        let result = QueueSink::new(RecordingPublisher::default(), &config);

        assert!(matches!(result, Err(DataError::ConfigError(_))));
    }
}
