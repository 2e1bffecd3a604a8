//! CSV 체결 데이터셋 로더.
//!
//! 부분적인 내보내기 파일로도 시뮬레이터를 돌릴 수 있도록 관대하게 로드합니다:
//! - 없는 컬럼은 기본값(숫자 0, 문자열 빈 값)으로 채우고 경고만 남깁니다.
//! - 파싱할 수 없는 셀이 있는 행은 건너뜁니다.

use crate::error::{DataError, Result};
use crate::source::TradeDataset;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};
use tradesim_core::TradeRecord;

/// 체결 스키마의 필수 컬럼.
///
/// 순서는 `Column`의 판별값과 일치해야 합니다.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "ticker",
    "conditions",
    "correction",
    "exchange",
    "id",
    "participant_timestamp",
    "price",
    "sequence_number",
    "sip_timestamp",
    "size",
    "tape",
    "trf_id",
    "trf_timestamp",
];

#[derive(Debug, Clone, Copy)]
enum Column {
    Ticker,
    Conditions,
    Correction,
    Exchange,
    Id,
    ParticipantTimestamp,
    Price,
    SequenceNumber,
    SipTimestamp,
    Size,
    Tape,
    TrfId,
    TrfTimestamp,
}

impl Column {
    fn name(self) -> &'static str {
        REQUIRED_COLUMNS[self as usize]
    }
}

/// 헤더 이름 → 컬럼 위치 매핑.
struct ColumnMap {
    positions: [Option<usize>; REQUIRED_COLUMNS.len()],
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Self {
        let mut positions = [None; REQUIRED_COLUMNS.len()];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers.iter().position(|h| h == name);
        }
        Self { positions }
    }

    fn missing(&self) -> Vec<&'static str> {
        self.positions
            .iter()
            .zip(REQUIRED_COLUMNS)
            .filter(|(pos, _)| pos.is_none())
            .map(|(_, name)| name)
            .collect()
    }

    /// 없는 컬럼이나 짧은 행은 빈 셀로 취급합니다.
    fn cell<'r>(&self, row: &'r StringRecord, column: Column) -> &'r str {
        self.positions[column as usize]
            .and_then(|pos| row.get(pos))
            .unwrap_or("")
    }

    fn parse_row(&self, row: &StringRecord) -> Result<TradeRecord> {
        let conditions = self.cell(row, Column::Conditions);
        let conditions = if conditions.eq_ignore_ascii_case("nan") {
            String::new()
        } else {
            conditions.to_string()
        };

        Ok(TradeRecord {
            local_ts: String::new(),
            local_date: String::new(),
            ticker: self.cell(row, Column::Ticker).to_string(),
            conditions,
            correction: self.int(row, Column::Correction)?,
            exchange: self.int(row, Column::Exchange)?,
            id: self.cell(row, Column::Id).to_string(),
            participant_timestamp: self.int(row, Column::ParticipantTimestamp)?,
            price: self.decimal(row, Column::Price)?,
            sequence_number: self.int(row, Column::SequenceNumber)?,
            sip_timestamp: self.int(row, Column::SipTimestamp)?,
            size: self.int(row, Column::Size)?,
            tape: self.int(row, Column::Tape)?,
            trf_id: self.int(row, Column::TrfId)?,
            trf_timestamp: self.int(row, Column::TrfTimestamp)?,
        })
    }

    fn int<T: TryFrom<i64>>(&self, row: &StringRecord, column: Column) -> Result<T> {
        let cell = self.cell(row, column);
        let value = parse_integer(cell).ok_or_else(|| invalid_cell(column, cell))?;
        T::try_from(value).map_err(|_| invalid_cell(column, cell))
    }

    fn decimal(&self, row: &StringRecord, column: Column) -> Result<Decimal> {
        let cell = self.cell(row, column);
        if cell.is_empty() {
            return Ok(Decimal::ZERO);
        }
        Decimal::from_str(cell)
            .or_else(|_| Decimal::from_scientific(cell))
            .map_err(|_| invalid_cell(column, cell))
    }
}

/// 정수 셀 파싱. 빈 셀은 0, `"3.0"`처럼 소수부가 없는 실수 표기도 허용합니다.
fn parse_integer(cell: &str) -> Option<i64> {
    if cell.is_empty() {
        return Some(0);
    }
    if let Ok(value) = cell.parse::<i64>() {
        return Some(value);
    }
    let value = cell.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn invalid_cell(column: Column, cell: &str) -> DataError {
    DataError::ParseError(format!("column {}: {:?}", column.name(), cell))
}

/// CSV 파일에서 체결 데이터셋을 로드합니다.
///
/// # Errors
///
/// - `DataError::NotFound`: 파일이 없음
/// - `DataError::Io`: 읽기 실패
/// - `DataError::Csv`: 헤더를 읽을 수 없음
pub fn load_csv(path: impl AsRef<Path>) -> Result<TradeDataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (dataset, synthesized, skipped) = parse_csv(file)?;

    for column in &synthesized {
        warn!(
            column = *column,
            path = %path.display(),
            "Column not found in CSV. Created column with default values."
        );
    }

    info!(
        path = %path.display(),
        rows = dataset.len(),
        skipped_rows = skipped,
        tickers = dataset.distinct_tickers(),
        "Trade dataset loaded"
    );

    Ok(dataset.with_load_report(path, synthesized, skipped))
}

fn parse_csv<R: Read>(input: R) -> Result<(TradeDataset, Vec<&'static str>, usize)> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let columns = ColumnMap::resolve(reader.headers()?);
    let synthesized = columns.missing();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in reader.records().enumerate() {
        // 헤더가 1행이므로 데이터 행 번호는 index + 2
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                skipped += 1;
                warn!(line = line, error = %e, "Skipping malformed CSV row");
                continue;
            }
        };

        match columns.parse_row(&row) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                debug!(line = line, error = %e, "Skipping unparseable CSV row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped_rows = skipped, "Some CSV rows could not be parsed");
    }

    Ok((TradeDataset::from_records(records), synthesized, skipped))
}
