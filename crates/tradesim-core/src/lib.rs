//! # Tradesim Core
//!
//! 거래 시뮬레이터의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시뮬레이터 전반에서 사용되는 기본 타입을 제공합니다:
//! - 체결 레코드(`TradeRecord`)와 배치(`TradeBatch`)
//! - 배치를 전달받는 싱크 추상화(`TradeSink`)
//! - 싱크 에러 분류 (일시적 / 영구적)
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;

pub use domain::*;
pub use error::*;
pub use logging::*;
