//! 거래 시뮬레이션을 위한 도메인 모델.

mod sink;
mod trade;

pub use sink::*;
pub use trade::*;
