//! 지수 백오프 재시도 정책.
//!
//! 기본값은 최대 5회 시도, 대기 1s → 2s → 4s → 5s (상한 5s)입니다.
//! 재시도 가능 여부는 호출자가 넘기는 판별 함수로 결정하며,
//! 영구 에러는 대기 없이 즉시 반환됩니다.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tradesim_core::{SinkError, TradeRecord, TradeSink};

/// 재시도 정책
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// 최대 시도 횟수 설정 (최소 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// 첫 대기 시간과 대기 상한 설정
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `failed_attempt`번째 시도(1부터)가 실패한 뒤의 대기 시간.
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// `op`을 정책에 따라 실행합니다.
    ///
    /// `is_retryable`이 거짓인 에러, 시도 횟수 소진, 또는 `shutdown` 취소 시
    /// 마지막 에러를 반환합니다. 백오프 대기 중 취소되면 즉시 반환합니다.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        shutdown: &CancellationToken,
        is_retryable: P,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !is_retryable(&err) || attempt >= self.max_attempts || shutdown.is_cancelled() {
                return Err(err);
            }

            let backoff = self.backoff_for(attempt);
            tracing::warn!(
                attempt = attempt,
                max_attempts = self.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "일시적 실패, 재시도 예정"
            );

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown.cancelled() => return Err(err),
            }
            attempt += 1;
        }
    }

    /// 싱크 전달을 재시도 정책으로 감쌉니다 (일시적 에러만 재시도).
    pub async fn deliver<S>(
        &self,
        sink: &S,
        records: &[TradeRecord],
        shutdown: &CancellationToken,
    ) -> Result<usize, SinkError>
    where
        S: TradeSink + ?Sized,
    {
        self.run(shutdown, SinkError::is_transient, || sink.deliver(records))
            .await
    }
}
