use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库连接、读写失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
    /// 文件读写失败
    #[error("IO error: {0}")]
    Io(String),
    /// 序列化失败
    #[error("Encode error: {0}")]
    Encode(String),
    /// 已持久化的数据无法还原
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    /// 初始化存储失败
    #[error("Initialization error: {0}")]
    InitError(String),
    /// 记录日期与写入的交易日不符
    #[error("Record {key} dated {found} cannot be stored under {expected}")]
    DateMismatch {
        key: String,
        expected: NaiveDate,
        found: NaiveDate,
    },
}

