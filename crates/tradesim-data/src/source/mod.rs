//! 샘플링 대상 체결 데이터셋.
//!
//! 데이터셋은 시작 시 한 번 로드되고 이후에는 읽기 전용입니다.

pub mod loader;
pub mod export;

use std::path::{Path, PathBuf};
use tradesim_core::TradeRecord;

/// 메모리에 적재된 읽기 전용 체결 데이터셋.
#[derive(Debug, Clone, Default)]
pub struct TradeDataset {
    records: Vec<TradeRecord>,
    /// 파일에 없어서 기본값으로 채운 컬럼
    synthesized_columns: Vec<&'static str>,
    /// 파싱 실패로 건너뛴 행 수
    skipped_rows: usize,
    /// 로드한 파일 경로
    source: Option<PathBuf>,
}

impl TradeDataset {
    /// 레코드 목록에서 데이터셋을 생성합니다.
    pub fn from_records(records: Vec<TradeRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub(crate) fn with_load_report(
        mut self,
        source: &Path,
        synthesized_columns: Vec<&'static str>,
        skipped_rows: usize,
    ) -> Self {
        self.source = Some(source.to_path_buf());
        self.synthesized_columns = synthesized_columns;
        self.skipped_rows = skipped_rows;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TradeRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn synthesized_columns(&self) -> &[&'static str] {
        &self.synthesized_columns
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 고유 티커 수.
    pub fn distinct_tickers(&self) -> usize {
        let mut tickers: Vec<&str> = self.records.iter().map(|r| r.ticker.as_str()).collect();
        tickers.sort_unstable();
        tickers.dedup();
        tickers.len()
    }
}
