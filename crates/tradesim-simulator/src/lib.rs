//! Throughput-controlled trade replay simulator.
//!
//! 과거 체결 데이터셋에서 무작위로 배치를 샘플링해 현재 시각을 찍고,
//! 설정된 속도로 데이터베이스 또는 메시지 큐에 재생합니다:
//! - 배치 단위 속도 제한 (`RateLimiter`)
//! - 복원 추출 샘플링 (`Sampler`)
//! - 지수 백오프 재시도 (`RetryPolicy`)
//! - 제한된 워커 풀로 전달하는 디스패처 (`Dispatcher`)

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod limiter;
pub mod retry;
pub mod runner;
pub mod sampler;
pub mod stats;

pub use config::SimulatorConfig;
pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherState};
pub use error::{Result, SimulatorError};
pub use limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use runner::{load_dataset, run_simulation, run_with_sink};
pub use sampler::Sampler;
pub use stats::{SimulationStats, ThroughputCounters};
