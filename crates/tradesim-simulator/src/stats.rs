//! 처리량 카운터와 실행 통계.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 워커들이 공유하는 누적 카운터.
///
/// `trades_sent`는 싱크가 배치 전달을 확인한 뒤에만 증가합니다.
#[derive(Debug, Default)]
pub struct ThroughputCounters {
    trades_sent: AtomicU64,
    batches_submitted: AtomicU64,
    batches_delivered: AtomicU64,
    batches_failed: AtomicU64,
    records_failed: AtomicU64,
    progress_reports: AtomicU64,
}

impl ThroughputCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// 전달 확인된 배치 기록
    pub fn record_delivered(&self, records: usize) {
        self.trades_sent.fetch_add(records as u64, Ordering::Relaxed);
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// 최종 실패한 배치 기록
    pub fn record_failed(&self, records: usize) {
        self.records_failed.fetch_add(records as u64, Ordering::Relaxed);
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// 주기 처리량 로그 출력 기록
    pub fn record_progress_report(&self) {
        self.progress_reports.fetch_add(1, Ordering::Relaxed);
    }

    /// 누적 전달 레코드 수
    pub fn total_trades_sent(&self) -> u64 {
        self.trades_sent.load(Ordering::Relaxed)
    }

    /// 현재 카운터 스냅샷
    pub fn snapshot(&self, elapsed: Duration) -> SimulationStats {
        SimulationStats {
            trades_sent: self.trades_sent.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            progress_reports: self.progress_reports.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// 시뮬레이션 실행 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// 전달 확인된 총 레코드 수
    pub trades_sent: u64,
    /// 워커에 제출된 배치 수
    pub batches_submitted: u64,
    /// 전달 성공 배치 수
    pub batches_delivered: u64,
    /// 재시도 후에도 실패한 배치 수
    pub batches_failed: u64,
    /// 실패한 배치에 포함된 레코드 수
    pub records_failed: u64,
    /// 주기 처리량 로그 출력 횟수
    pub progress_reports: u64,
    /// 실행 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SimulationStats {
    /// 실측 레코드 처리량 (초당)
    pub fn effective_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.trades_sent as f64 / secs
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, sink: &str) {
        tracing::info!(
            sink = sink,
            trades_sent = self.trades_sent,
            batches_submitted = self.batches_submitted,
            batches_delivered = self.batches_delivered,
            batches_failed = self.batches_failed,
            records_failed = self.records_failed,
            effective_rate = format!("{:.1}/s", self.effective_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "시뮬레이션 종료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = ThroughputCounters::new();
        counters.record_submitted();
        counters.record_submitted();
        counters.record_submitted();
        counters.record_delivered(10);
        counters.record_delivered(10);
        counters.record_failed(10);

        let stats = counters.snapshot(Duration::from_secs(2));

        assert_eq!(counters.total_trades_sent(), 20);
        assert_eq!(stats.batches_submitted, 3);
        assert_eq!(stats.batches_delivered, 2);
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.records_failed, 10);
        assert_eq!(stats.effective_rate(), 10.0);
    }

    #[test]
    fn test_effective_rate_without_elapsed() {
        let stats = SimulationStats {
            trades_sent: 100,
            ..Default::default()
        };
        assert_eq!(stats.effective_rate(), 0.0);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = SimulationStats {
            trades_sent: 5,
            batches_delivered: 1,
            ..Default::default()
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["trades_sent"], 5);
        assert!(json.get("elapsed").is_none());
    }
}
