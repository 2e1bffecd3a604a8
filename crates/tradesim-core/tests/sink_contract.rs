//! TradeSink trait 통합 테스트
//!
//! 최소 구현으로 trait의 기본 동작(기본 close, 동시 호출)을 확인합니다.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tradesim_core::{SinkError, TradeRecord, TradeSink, TradeStamp};

/// 받은 레코드 수만 세는 테스트용 싱크
#[derive(Default)]
struct CountingSink {
    received: AtomicUsize,
}

#[async_trait]
impl TradeSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    async fn deliver(&self, records: &[TradeRecord]) -> Result<usize, SinkError> {
        if records.iter().any(|r| r.ticker.is_empty()) {
            return Err(SinkError::permanent("empty ticker"));
        }
        self.received.fetch_add(records.len(), Ordering::SeqCst);
        Ok(records.len())
    }
}

fn batch(n: usize) -> Vec<TradeRecord> {
    let stamp = TradeStamp::now();
    (0..n)
        .map(|_| TradeRecord::new("AAPL", dec!(150.0), 100).stamped(&stamp))
        .collect()
}

#[tokio::test]
async fn test_concurrent_deliveries_are_all_counted() {
    let sink = Arc::new(CountingSink::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move { sink.deliver(&batch(25)).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 25);
    }

    assert_eq!(sink.received.load(Ordering::SeqCst), 200);
    assert!(sink.close().await.is_ok());
}

#[tokio::test]
async fn test_permanent_failure_is_reported_for_whole_batch() {
    let sink = CountingSink::default();
    let mut records = batch(3);
    records[1].ticker.clear();

    let err = sink.deliver(&records).await.unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(sink.received.load(Ordering::SeqCst), 0);
}
