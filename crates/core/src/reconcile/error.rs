use crate::common::Exchange;
use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// 行情表与交割表之间找不到任何可用的关联键 (ISIN、数字代码、代码均不可用)。
///
/// # Invariants
/// - 只影响该交易所该日的交割文件：交割数据被丢弃并报告，行情记录保留。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{exchange} {date}: no usable join key between `{bhav_file}` and `{delivery_file}`")]
pub struct IdentityResolutionError {
    pub exchange: Exchange,
    pub date: NaiveDate,
    pub bhav_file: String,
    pub delivery_file: String,
}
