//! 체결 레코드.
//!
//! 이 모듈은 재생 대상이 되는 체결 관련 타입을 정의합니다:
//! - `TradeRecord` - 원본 데이터셋의 개별 체결 행
//! - `TradeStamp` - 샘플링 시점에 찍히는 "현재" 시각
//! - `TradeBatch` - 싱크 한 번의 호출로 전달되는 레코드 묶음

use chrono::{DateTime, Local, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 로컬 타임스탬프 문자열 형식.
pub const LOCAL_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// 로컬 날짜 문자열 형식.
pub const LOCAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// 과거 체결 데이터의 한 행.
///
/// 필드 이름은 원본 체결 테이블의 컬럼 이름과 동일하며,
/// 큐 싱크로 발행되는 JSON 페이로드도 같은 이름을 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// 샘플링 시각 (로컬, `%Y-%m-%d %H:%M:%S`)
    #[serde(rename = "localTS", default)]
    pub local_ts: String,
    /// 샘플링 날짜 (로컬, `%Y-%m-%d`)
    #[serde(rename = "localDate", default)]
    pub local_date: String,
    /// 종목 티커
    pub ticker: String,
    /// 체결 조건 코드 (비어 있을 수 있음)
    #[serde(default)]
    pub conditions: String,
    /// 정정 코드
    pub correction: i32,
    /// 거래소 ID
    pub exchange: i32,
    /// 원본 데이터셋 내 체결 ID (재생 간에는 고유하지 않음)
    pub id: String,
    /// 참여자 타임스탬프 (Unix epoch 기준 나노초)
    pub participant_timestamp: i64,
    /// 체결 가격
    pub price: Decimal,
    /// 시퀀스 번호
    pub sequence_number: i64,
    /// SIP 타임스탬프 (Unix epoch 기준 나노초)
    pub sip_timestamp: i64,
    /// 체결 수량
    pub size: i64,
    /// 테이프 구분
    #[serde(default)]
    pub tape: i32,
    /// TRF ID
    pub trf_id: i64,
    /// TRF 타임스탬프 (Unix epoch 기준 나노초)
    pub trf_timestamp: i64,
}

impl TradeRecord {
    /// 티커와 가격/수량만 지정하고 나머지는 기본값인 레코드를 생성합니다.
    pub fn new(ticker: impl Into<String>, price: Decimal, size: i64) -> Self {
        Self {
            local_ts: String::new(),
            local_date: String::new(),
            ticker: ticker.into(),
            conditions: String::new(),
            correction: 0,
            exchange: 0,
            id: String::new(),
            participant_timestamp: 0,
            price,
            sequence_number: 0,
            sip_timestamp: 0,
            size,
            tape: 0,
            trf_id: 0,
            trf_timestamp: 0,
        }
    }

    /// 세 타임스탬프 필드와 로컬 시각 필드를 `stamp`로 덮어씁니다.
    pub fn stamp(&mut self, stamp: &TradeStamp) {
        self.participant_timestamp = stamp.nanos;
        self.sip_timestamp = stamp.nanos;
        self.trf_timestamp = stamp.nanos;
        self.local_ts.clone_from(&stamp.local_ts);
        self.local_date.clone_from(&stamp.local_date);
    }

    /// `stamp`가 찍힌 사본을 반환합니다.
    pub fn stamped(&self, stamp: &TradeStamp) -> Self {
        let mut record = self.clone();
        record.stamp(stamp);
        record
    }
}

/// 샘플링 시점에 한 번 캡처되는 시각.
///
/// 한 배치의 모든 레코드는 같은 `TradeStamp`를 공유합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeStamp {
    /// Unix epoch 기준 나노초
    pub nanos: i64,
    /// 로컬 타임스탬프 문자열
    pub local_ts: String,
    /// 로컬 날짜 문자열
    pub local_date: String,
}

impl TradeStamp {
    /// 현재 시각으로 생성합니다.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// 주어진 UTC 시각으로 생성합니다.
    ///
    /// 나노초 표현 범위(2262년)를 넘는 시각은 `i64::MAX`로 고정됩니다.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let nanos = at.timestamp_nanos_opt().unwrap_or(i64::MAX);
        let local = at.with_timezone(&Local);
        Self {
            nanos,
            local_ts: local.format(LOCAL_TS_FORMAT).to_string(),
            local_date: local.format(LOCAL_DATE_FORMAT).to_string(),
        }
    }

    /// Unix epoch 기준 나노초로 생성합니다.
    pub fn from_nanos(nanos: i64) -> Self {
        Self::from_datetime(Utc.timestamp_nanos(nanos))
    }
}

/// 싱크 한 번의 호출로 전달되는 체결 배치.
#[derive(Debug, Clone)]
pub struct TradeBatch {
    /// 디스패처가 부여한 배치 순번 (0부터 시작)
    pub sequence: u64,
    /// 배치에 포함된 레코드
    pub records: Vec<TradeRecord>,
}

impl TradeBatch {
    pub fn new(sequence: u64, records: Vec<TradeRecord>) -> Self {
        Self { sequence, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
