//! 배치 디스패처.
//!
//! 단일 태스크가 샘플링 → 속도 제한 승인 → 워커 슬롯 확보 → 전달 태스크 생성을
//! 반복합니다. 워커 수만큼의 세마포어 permit이 전달 태스크에 묶여 있으므로
//! 모든 워커가 바쁘면 제출이 멈춥니다 (backpressure).
//!
//! 상태 전이:
//! - `Running` → `Stopping` (취소 또는 `max_batches` 도달)
//! - `Stopping` → `Draining` (진행 중 전달 대기)
//! - `Draining` → `Stopped` (싱크 `close()` 1회 호출 후)

use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::sampler::Sampler;
use crate::stats::{SimulationStats, ThroughputCounters};
use crate::{Result, SimulatorError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tradesim_core::{TradeBatch, TradeSink};

/// 디스패처 설정
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// 배치당 레코드 수
    pub batch_size: usize,
    /// 동시 전달 워커 수
    pub num_workers: usize,
    /// 누적 처리량 로그 주기
    pub log_interval: Duration,
    /// 목표 배치 승인 속도 (로그 표시용)
    pub target_rate: u32,
    /// 제출할 최대 배치 수
    pub max_batches: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            num_workers: 8,
            log_interval: Duration::from_secs(5),
            target_rate: 1000,
            max_batches: None,
        }
    }
}

/// 디스패처 수명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// 배치 제출 중
    Running,
    /// 제출 중단
    Stopping,
    /// 진행 중 전달 대기
    Draining,
    /// 싱크 종료 완료
    Stopped,
    /// 싱크 생성 실패로 루프가 시작되지 않음
    FailedStartup,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::FailedStartup => "failed_startup",
        };
        write!(f, "{}", name)
    }
}

/// 샘플링된 배치를 제한된 워커 풀로 싱크에 전달하는 디스패처.
pub struct Dispatcher<S> {
    sink: Arc<S>,
    limiter: Arc<RateLimiter>,
    sampler: Sampler,
    retry: RetryPolicy,
    config: DispatcherConfig,
    counters: Arc<ThroughputCounters>,
    state: DispatcherState,
}

impl<S> Dispatcher<S>
where
    S: TradeSink + 'static,
{
    pub fn new(
        sink: Arc<S>,
        limiter: Arc<RateLimiter>,
        sampler: Sampler,
        retry: RetryPolicy,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            sink,
            limiter,
            sampler,
            retry,
            config,
            counters: Arc::new(ThroughputCounters::new()),
            state: DispatcherState::Running,
        }
    }

    /// 공유 카운터 (실행 중 관찰용)
    pub fn counters(&self) -> Arc<ThroughputCounters> {
        Arc::clone(&self.counters)
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// 누적 처리량 로그를 남기고 다음 보고 시각을 반환합니다.
    fn report_progress(&self) -> Instant {
        self.counters.record_progress_report();
        info!(
            total_trades_sent = self.counters.total_trades_sent(),
            target_rate = self.config.target_rate,
            "누적 전송 체결 수"
        );
        Instant::now() + self.config.log_interval
    }

    fn transition(&mut self, next: DispatcherState) {
        debug!(from = %self.state, to = %next, "디스패처 상태 전이");
        self.state = next;
    }

    /// `shutdown`이 취소되거나 `max_batches`에 도달할 때까지 배치를 제출하고,
    /// 진행 중 전달을 모두 기다린 뒤 싱크를 닫습니다.
    ///
    /// # Errors
    ///
    /// - 이미 종료된 디스패처를 다시 실행하면 `SimulatorError::InvalidState`
    /// - 싱크 `close()` 실패 시 `SimulatorError::Sink`
    pub async fn run(&mut self, shutdown: &CancellationToken) -> Result<SimulationStats> {
        if self.state != DispatcherState::Running {
            return Err(SimulatorError::InvalidState(format!(
                "dispatcher cannot run from state {}",
                self.state
            )));
        }

        let started = Instant::now();
        let workers = Arc::new(Semaphore::new(self.config.num_workers.max(1)));
        let mut deliveries = JoinSet::new();
        let mut next_report = started + self.config.log_interval;
        let mut sequence: u64 = 0;

        info!(
            sink = self.sink.name(),
            target_rate = self.config.target_rate,
            batch_size = self.config.batch_size,
            num_workers = self.config.num_workers,
            "디스패처 시작"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            if let Some(max) = self.config.max_batches {
                if sequence >= max {
                    info!(max_batches = max, "최대 배치 수 도달");
                    break;
                }
            }

            let records = self.sampler.sample_batch(self.config.batch_size);

            if !self.limiter.admit_or_cancel(shutdown).await {
                break;
            }

            // 워커가 모두 바쁜 동안에도 주기 로그는 계속 출력
            let permit = loop {
                tokio::select! {
                    permit = Arc::clone(&workers).acquire_owned() => break permit.ok(),
                    _ = shutdown.cancelled() => break None,
                    _ = sleep_until(next_report) => next_report = self.report_progress(),
                }
            };
            let Some(permit) = permit else {
                break;
            };

            let batch = TradeBatch::new(sequence, records);
            sequence += 1;
            self.counters.record_submitted();

            let sink = Arc::clone(&self.sink);
            let retry = self.retry.clone();
            let counters = Arc::clone(&self.counters);
            let token = shutdown.clone();
            deliveries.spawn(async move {
                let _permit = permit;
                match retry.deliver(sink.as_ref(), &batch.records, &token).await {
                    Ok(delivered) => counters.record_delivered(delivered),
                    Err(err) => {
                        counters.record_failed(batch.len());
                        error!(
                            sink = sink.name(),
                            batch = batch.sequence,
                            records = batch.len(),
                            error = %err,
                            "배치 전달 실패"
                        );
                    }
                }
            });

            while let Some(joined) = deliveries.try_join_next() {
                log_join_error(joined);
            }

            if Instant::now() >= next_report {
                next_report = self.report_progress();
            }
        }

        self.transition(DispatcherState::Stopping);
        info!(submitted = sequence, "배치 제출 중단");

        self.transition(DispatcherState::Draining);
        let in_flight = deliveries.len();
        if in_flight > 0 {
            info!(in_flight = in_flight, "진행 중 전달 대기");
        }
        while let Some(joined) = deliveries.join_next().await {
            log_join_error(joined);
        }

        let closed = self.sink.close().await;
        self.transition(DispatcherState::Stopped);

        let stats = self.counters.snapshot(started.elapsed());
        stats.log_summary(self.sink.name());

        if let Err(err) = closed {
            error!(sink = self.sink.name(), error = %err, "싱크 종료 실패");
            return Err(err.into());
        }

        Ok(stats)
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "전달 태스크 비정상 종료");
    }
}
