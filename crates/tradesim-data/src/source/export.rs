//! 데이터베이스 → CSV 데이터셋 부트스트랩.
//!
//! 로컬 CSV가 없을 때 `trades` 테이블에서 샘플을 내려받아 파일로 저장합니다.

use crate::error::{DataError, Result};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::FromRow;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use tradesim_core::TradeRecord;

/// 원본 체결 테이블에서 읽는 행.
#[derive(Debug, FromRow)]
struct TradeRow {
    ticker: String,
    conditions: Option<String>,
    correction: Option<i32>,
    exchange: Option<i32>,
    id: Option<String>,
    participant_timestamp: Option<i64>,
    price: Option<Decimal>,
    sequence_number: Option<i64>,
    sip_timestamp: Option<i64>,
    size: Option<i64>,
    tape: Option<i32>,
    trf_id: Option<i64>,
    trf_timestamp: Option<i64>,
}

impl From<TradeRow> for TradeRecord {
    fn from(row: TradeRow) -> Self {
        Self {
            local_ts: String::new(),
            local_date: String::new(),
            ticker: row.ticker,
            conditions: row.conditions.unwrap_or_default(),
            correction: row.correction.unwrap_or_default(),
            exchange: row.exchange.unwrap_or_default(),
            id: row.id.unwrap_or_default(),
            participant_timestamp: row.participant_timestamp.unwrap_or_default(),
            price: row.price.unwrap_or_default(),
            sequence_number: row.sequence_number.unwrap_or_default(),
            sip_timestamp: row.sip_timestamp.unwrap_or_default(),
            size: row.size.unwrap_or_default(),
            tape: row.tape.unwrap_or_default(),
            trf_id: row.trf_id.unwrap_or_default(),
            trf_timestamp: row.trf_timestamp.unwrap_or_default(),
        }
    }
}

const EXPORT_QUERY: &str = r#"
    SELECT ticker,
           conditions::text AS conditions,
           correction::int4 AS correction,
           exchange::int4 AS exchange,
           id::text AS id,
           participant_timestamp::int8 AS participant_timestamp,
           price::numeric AS price,
           sequence_number::int8 AS sequence_number,
           sip_timestamp::int8 AS sip_timestamp,
           size::int8 AS size,
           tape::int4 AS tape,
           trf_id::int8 AS trf_id,
           trf_timestamp::int8 AS trf_timestamp
    FROM trades
    LIMIT $1
"#;

/// `trades` 테이블에서 최대 `limit`개 행을 읽어 `path`에 CSV로 저장합니다.
///
/// 저장된 행 수를 반환합니다.
#[instrument(skip(database_url, path), fields(path = %path.display()))]
pub async fn export_from_database(database_url: &str, path: &Path, limit: i64) -> Result<usize> {
    info!("Downloading trade dataset from database...");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
        .map_err(|e| DataError::ConnectionError(e.to_string()))?;

    let rows: Vec<TradeRow> = sqlx::query_as(EXPORT_QUERY)
        .bind(limit)
        .fetch_all(&pool)
        .await?;
    pool.close().await;

    let records: Vec<TradeRecord> = rows.into_iter().map(TradeRecord::from).collect();
    let written = records.len();
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_csv(&path, &records))
        .await
        .map_err(|e| DataError::Io(e.to_string()))??;

    info!(rows = written, "Trade dataset saved");
    Ok(written)
}

fn write_csv(path: &Path, records: &[TradeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
