//! 복원 추출 배치 샘플러.

use crate::{Result, SimulatorError};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tradesim_core::{TradeRecord, TradeStamp};
use tradesim_data::TradeDataset;

/// 데이터셋에서 균등 복원 추출로 배치를 만들고 현재 시각을 찍는 샘플러.
///
/// 배치마다 시각을 한 번만 캡처하므로 같은 배치의 레코드는 모두 같은
/// 타임스탬프를 가집니다. 벽시계가 뒤로 가더라도 직전 배치보다 이른
/// 시각은 찍지 않습니다.
#[derive(Debug)]
pub struct Sampler {
    dataset: Arc<TradeDataset>,
    rng: StdRng,
    last_stamp_nanos: i64,
}

impl Sampler {
    /// 엔트로피 시드 RNG로 샘플러를 생성합니다.
    ///
    /// # Errors
    ///
    /// 데이터셋이 비어 있으면 `SimulatorError::EmptyDataset`.
    pub fn new(dataset: Arc<TradeDataset>) -> Result<Self> {
        Self::with_rng(dataset, StdRng::from_entropy())
    }

    /// 고정 시드로 샘플러를 생성합니다 (재현 가능한 추출 순서).
    pub fn with_seed(dataset: Arc<TradeDataset>, seed: u64) -> Result<Self> {
        Self::with_rng(dataset, StdRng::seed_from_u64(seed))
    }

    fn with_rng(dataset: Arc<TradeDataset>, rng: StdRng) -> Result<Self> {
        if dataset.is_empty() {
            return Err(SimulatorError::EmptyDataset(match dataset.source() {
                Some(path) => format!("no rows loaded from {}", path.display()),
                None => "no rows to sample from".to_string(),
            }));
        }

        Ok(Self {
            dataset,
            rng,
            last_stamp_nanos: i64::MIN,
        })
    }

    /// 현재 시각으로 `n`개 레코드를 샘플링합니다.
    pub fn sample_batch(&mut self, n: usize) -> Vec<TradeRecord> {
        self.sample_batch_at(n, Utc::now())
    }

    /// 주어진 시각으로 `n`개 레코드를 샘플링합니다.
    pub fn sample_batch_at(&mut self, n: usize, at: DateTime<Utc>) -> Vec<TradeRecord> {
        let stamp = self.next_stamp(at);
        let len = self.dataset.len();

        (0..n)
            .map(|_| {
                let index = self.rng.gen_range(0..len);
                self.dataset.records()[index].stamped(&stamp)
            })
            .collect()
    }

    fn next_stamp(&mut self, at: DateTime<Utc>) -> TradeStamp {
        let stamp = TradeStamp::from_datetime(at);
        if stamp.nanos >= self.last_stamp_nanos {
            self.last_stamp_nanos = stamp.nanos;
            stamp
        } else {
            tracing::debug!(
                captured = stamp.nanos,
                previous = self.last_stamp_nanos,
                "벽시계 역행 감지, 직전 시각 유지"
            );
            TradeStamp::from_nanos(self.last_stamp_nanos)
        }
    }
}
