//! 시뮬레이션 통합 테스트.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tradesim_core::{SinkError, TradeRecord, TradeSink};
use tradesim_data::TradeDataset;
use tradesim_simulator::{load_dataset, run_with_sink, SimulatorConfig};

/// 전달된 레코드를 모두 보관하는 싱크.
#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<TradeRecord>>,
    calls: AtomicUsize,
    closes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    /// n번째 호출(1부터)의 결과를 결정
    fail_on: Option<fn(usize) -> Option<SinkError>>,
}

impl RecordingSink {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn failing(fail_on: fn(usize) -> Option<SinkError>) -> Self {
        Self {
            fail_on: Some(fail_on),
            ..Default::default()
        }
    }

    fn delivered(&self) -> Vec<TradeRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, records: &[TradeRecord]) -> Result<usize, SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.fail_on.and_then(|f| f(call)) {
            return Err(err);
        }

        self.records.lock().unwrap().extend_from_slice(records);
        Ok(records.len())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn aapl_dataset() -> Arc<TradeDataset> {
    let mut record = TradeRecord::new("AAPL", dec!(189.91), 100);
    record.exchange = 4;
    record.participant_timestamp = 1_640_995_200_000_000_000;
    Arc::new(TradeDataset::from_records(vec![record]))
}

fn config(throughput: u32, batch_size: usize, num_threads: usize) -> SimulatorConfig {
    SimulatorConfig {
        throughput,
        batch_size,
        num_threads,
        ..Default::default()
    }
}

fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap()
}

#[tokio::test]
async fn test_replays_single_row_dataset_for_one_second() {
    let sink = Arc::new(RecordingSink::default());
    let shutdown = CancellationToken::new();
    let window_start = now_nanos();

    let run = tokio::spawn({
        let sink = Arc::clone(&sink);
        let shutdown = shutdown.clone();
        async move { run_with_sink(&config(100, 10, 2), aapl_dataset(), sink, &shutdown).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown.cancel();
    let stats = run.await.unwrap().unwrap();
    let window_end = now_nanos();

    let delivered = sink.delivered();
    assert!(delivered.len() >= 10, "delivered {}", delivered.len());
    assert_eq!(stats.trades_sent, delivered.len() as u64);
    for record in &delivered {
        assert_eq!(record.ticker, "AAPL");
        assert_eq!(record.exchange, 4);
        assert!(record.sip_timestamp >= window_start && record.sip_timestamp <= window_end);
        assert_eq!(record.participant_timestamp, record.sip_timestamp);
        assert_eq!(record.trf_timestamp, record.sip_timestamp);
    }
}

#[tokio::test]
async fn test_graceful_shutdown_drains_whole_batches() {
    let sink = Arc::new(RecordingSink::with_delay(Duration::from_millis(50)));
    let shutdown = CancellationToken::new();

    let run = tokio::spawn({
        let sink = Arc::clone(&sink);
        let shutdown = shutdown.clone();
        async move { run_with_sink(&config(200, 7, 3), aapl_dataset(), sink, &shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();
    let stats = run.await.unwrap().unwrap();

    assert!(stats.batches_submitted > 0);
    assert_eq!(stats.trades_sent % 7, 0);
    assert_eq!(stats.batches_delivered, stats.batches_submitted);
    assert_eq!(sink.delivered().len() as u64, stats.trades_sent);
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failures_are_dropped_and_loop_continues() {
    let sink = Arc::new(RecordingSink::failing(|call| {
        (call % 2 == 1).then(|| SinkError::permanent("duplicate key"))
    }));
    let config = SimulatorConfig {
        max_batches: Some(6),
        ..config(100, 5, 1)
    };

    let stats = run_with_sink(&config, aapl_dataset(), Arc::clone(&sink), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.calls.load(Ordering::SeqCst), 6);
    assert_eq!(stats.batches_submitted, 6);
    assert_eq!(stats.batches_delivered, 3);
    assert_eq!(stats.batches_failed, 3);
    assert_eq!(stats.records_failed, 15);
    assert_eq!(stats.trades_sent, 15);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_then_counted() {
    let sink = Arc::new(RecordingSink::failing(|call| {
        (call <= 3).then(|| SinkError::transient("connection reset"))
    }));
    let config = SimulatorConfig {
        max_batches: Some(1),
        ..config(100, 10, 2)
    };

    let stats = run_with_sink(&config, aapl_dataset(), Arc::clone(&sink), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.calls.load(Ordering::SeqCst), 4);
    assert_eq!(stats.batches_delivered, 1);
    assert_eq!(stats.trades_sent, 10);
}

#[tokio::test(start_paused = true)]
async fn test_busy_workers_block_submission() {
    let sink = Arc::new(RecordingSink::with_delay(Duration::from_millis(100)));
    let config = SimulatorConfig {
        max_batches: Some(10),
        ..config(1000, 1, 2)
    };
    let start = tokio::time::Instant::now();

    let stats = run_with_sink(&config, aapl_dataset(), Arc::clone(&sink), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.batches_delivered, 10);
    assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 2);
    // 2개 워커로 100ms 전달 10건 → 최소 5라운드
    assert!(start.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
async fn test_missing_exchange_column_replays_as_zero() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ticker,conditions,correction,id,price,size").unwrap();
    writeln!(file, "TSLA,,0,52983525029461,251.05,3").unwrap();

    let config = SimulatorConfig {
        csv_path: file.path().to_path_buf(),
        max_batches: Some(2),
        ..config(100, 4, 1)
    };
    let shutdown = CancellationToken::new();
    let dataset = load_dataset(&config, &shutdown).await.unwrap();
    let sink = Arc::new(RecordingSink::default());

    let stats = run_with_sink(&config, Arc::new(dataset), Arc::clone(&sink), &shutdown)
        .await
        .unwrap();

    assert_eq!(stats.trades_sent, 8);
    for record in sink.delivered() {
        assert_eq!(record.ticker, "TSLA");
        assert_eq!(record.exchange, 0);
        assert_eq!(record.conditions, "");
        assert_eq!(record.price, dec!(251.05));
    }
}
