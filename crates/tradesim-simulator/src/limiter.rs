//! 배치 승인 속도 제한기.
//!
//! 크기 1짜리 leaky bucket입니다. 다음 승인 시각 커서 하나를 잠금으로 보호하고,
//! 호출마다 커서를 정확히 한 간격씩 전진시킵니다:
//! - 대기 후에는 깨어난 시각이 아니라 커서 기준으로 전진하므로 승인 간격은 엄격히 주기적입니다.
//! - 커서가 이미 지난 경우(호출자가 늦은 경우) 커서를 현재로 당겨 오므로
//!   놓친 슬롯은 적립되지 않습니다 (버스트 없음).
//! - 동시 호출자는 커서에서 직렬화되며, 대기 중인 호출자 간 승인 순서는 정해져 있지 않습니다.

use crate::{Result, SimulatorError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// 프로세스 단위 속도 제한기.
#[derive(Debug)]
pub struct RateLimiter {
    rate_per_second: f64,
    interval: Duration,
    next_admission: Mutex<Instant>,
}

impl RateLimiter {
    /// 초당 `rate_per_second`회 승인하는 제한기를 생성합니다.
    ///
    /// # Errors
    ///
    /// 속도가 0 이하이거나 유한하지 않으면 `SimulatorError::Config`.
    pub fn new(rate_per_second: f64) -> Result<Self> {
        if !(rate_per_second.is_finite() && rate_per_second > 0.0) {
            return Err(SimulatorError::Config(format!(
                "rate_per_second must be greater than 0, got {}",
                rate_per_second
            )));
        }

        let interval = Duration::try_from_secs_f64(1.0 / rate_per_second).map_err(|e| {
            SimulatorError::Config(format!("rate_per_second {} is too small: {}", rate_per_second, e))
        })?;

        Ok(Self {
            rate_per_second,
            interval,
            next_admission: Mutex::new(Instant::now()),
        })
    }

    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    /// 승인 간 최소 간격.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 다음 승인 슬롯까지 기다린 뒤 슬롯을 예약합니다.
    pub async fn admit(&self) {
        let mut next = self.next_admission.lock().await;
        let now = Instant::now();
        if now < *next {
            sleep_until(*next).await;
        } else {
            *next = now;
        }
        *next += self.interval;
    }

    /// `admit`과 같지만 `shutdown`이 취소되면 즉시 `false`를 반환합니다.
    ///
    /// 취소된 경우 슬롯은 소비되지 않습니다.
    pub async fn admit_or_cancel(&self, shutdown: &CancellationToken) -> bool {
        let mut next = tokio::select! {
            guard = self.next_admission.lock() => guard,
            _ = shutdown.cancelled() => return false,
        };

        let now = Instant::now();
        if now < *next {
            tokio::select! {
                _ = sleep_until(*next) => {}
                _ = shutdown.cancelled() => return false,
            }
        } else {
            *next = now;
        }

        *next += self.interval;
        true
    }
}
