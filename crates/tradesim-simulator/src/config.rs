//! 환경변수 기반 설정 모듈.
//!
//! 모든 값은 선택 사항이며 기본값이 있습니다. 숫자로 파싱할 수 없는 값은
//! 기본값으로 대체되고, 알 수 없는 `MODE`는 설정 에러입니다.
//! `THROUGHPUT`, `NUM_THREADS`, `BATCH_SIZE`는 설정된 경우 양의 정수여야 하며
//! 그렇지 않으면 기본값으로 대체하지 않고 설정 에러를 반환합니다.
//! 선택된 모드의 연결 설정 누락은 싱크 생성 시점에 검사합니다.

use crate::dispatcher::DispatcherConfig;
use crate::retry::RetryPolicy;
use crate::{Result, SimulatorError};
use std::path::PathBuf;
use std::time::Duration;
use tradesim_data::{DatabaseSinkConfig, QueueSinkConfig, SinkMode, SinkSettings};

/// 시뮬레이터 전체 설정
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// 초당 배치 승인 수 (레코드 수가 아님)
    pub throughput: u32,
    /// 싱크 종류
    pub mode: SinkMode,
    /// 동시 전달 워커 수
    pub num_threads: usize,
    /// 배치당 레코드 수
    pub batch_size: usize,
    /// 누적 처리량 로그 주기 (초)
    pub log_interval_secs: u64,
    /// 원본 데이터셋 CSV 경로
    pub csv_path: PathBuf,
    /// 제출할 최대 배치 수 (없으면 무한)
    pub max_batches: Option<u64>,
    /// 배치당 최대 전달 시도 횟수
    pub retry_max_attempts: u32,
    /// CSV 부트스트랩 시 내려받을 최대 행 수
    pub bootstrap_limit: i64,
    /// 데이터베이스 싱크 설정
    pub database: DatabaseSinkConfig,
    /// Kafka 싱크 설정
    pub kafka: QueueSinkConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            throughput: 1000,
            mode: SinkMode::Database,
            num_threads: 8,
            batch_size: 1000,
            log_interval_secs: 5,
            csv_path: PathBuf::from("./trades_data.csv"),
            max_batches: None,
            retry_max_attempts: 5,
            bootstrap_limit: 5000,
            database: DatabaseSinkConfig::default(),
            kafka: QueueSinkConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// 환경변수에서 설정 로드 (`.env` 파일 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let defaults = Self::default();

        let mode = match env.get("MODE") {
            Some(value) => value.parse().map_err(SimulatorError::Config)?,
            None => defaults.mode,
        };

        let config = Self {
            throughput: env.positive("THROUGHPUT", defaults.throughput)?,
            mode,
            num_threads: env.positive("NUM_THREADS", defaults.num_threads)?,
            batch_size: env.positive("BATCH_SIZE", defaults.batch_size)?,
            log_interval_secs: env.parse("LOG_INTERVAL", defaults.log_interval_secs),
            csv_path: env
                .get("LOCAL_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.csv_path),
            max_batches: env.get("MAX_BATCHES").and_then(|v| v.parse().ok()),
            retry_max_attempts: env.parse("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            bootstrap_limit: env.parse("BOOTSTRAP_LIMIT", defaults.bootstrap_limit),
            database: DatabaseSinkConfig {
                url: env.get("DATABASE_URL"),
                max_connections: env.parse("DB_POOL_SIZE", defaults.database.max_connections),
                table: env.get("DB_TABLE").unwrap_or(defaults.database.table),
                ..defaults.database
            },
            kafka: QueueSinkConfig {
                broker: env.get("KAFKA_BROKER").or(defaults.kafka.broker),
                topic: env.get("KAFKA_TOPIC").or(defaults.kafka.topic),
                ..defaults.kafka
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// 수치 설정 검증
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("THROUGHPUT", self.throughput as u64),
            ("NUM_THREADS", self.num_threads as u64),
            ("BATCH_SIZE", self.batch_size as u64),
            ("LOG_INTERVAL", self.log_interval_secs),
            ("RETRY_MAX_ATTEMPTS", self.retry_max_attempts as u64),
        ];

        for (key, value) in checks {
            if value == 0 {
                return Err(SimulatorError::Config(format!(
                    "{} must be greater than 0",
                    key
                )));
            }
        }

        Ok(())
    }

    /// 누적 처리량 로그 주기를 Duration으로 반환
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval_secs)
    }

    /// 선택된 모드의 싱크 설정
    pub fn sink_settings(&self) -> SinkSettings {
        match self.mode {
            SinkMode::Database => SinkSettings::Database(self.database.clone()),
            SinkMode::Kafka => SinkSettings::Queue(self.kafka.clone()),
        }
    }

    /// 싱크 전달 재시도 정책
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.retry_max_attempts)
    }

    /// 디스패처 설정
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            batch_size: self.batch_size,
            num_workers: self.num_threads,
            log_interval: self.log_interval(),
            target_rate: self.throughput,
            max_batches: self.max_batches,
        }
    }
}

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    /// 빈 문자열은 설정되지 않은 것으로 취급
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// 값을 파싱 (실패 시 기본값 사용)
    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(key = key, value = %value, "설정 값을 파싱할 수 없어 기본값 사용");
                default
            }),
            None => default,
        }
    }

    /// 양의 정수 값을 파싱합니다. 값이 있는데 0 이하이거나 파싱할 수 없으면 에러.
    fn positive<T: TryFrom<i64>>(&self, key: &str, default: T) -> Result<T> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };

        let invalid = || {
            SimulatorError::Config(format!(
                "{} must be a positive integer, got {:?}",
                key, value
            ))
        };

        match value.parse::<i64>() {
            Ok(n) if n > 0 => T::try_from(n).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}
