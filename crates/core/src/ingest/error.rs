use crate::common::{Exchange, FileKind};
use thiserror::Error;

/// # Summary
/// 原始文件缺少下游必需的规范列。
///
/// # Invariants
/// - 只影响单个文件：该文件被跳过，运行继续。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{exchange} {kind} file `{file}`: required column `{column}` not found")]
pub struct SchemaMappingError {
    pub exchange: Exchange,
    pub kind: FileKind,
    pub file: String,
    // 缺失的规范列名
    pub column: String,
}

/// # Summary
/// 文件读取与规范化阶段的错误枚举。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    // 版式无法映射
    #[error(transparent)]
    Schema(#[from] SchemaMappingError),
    // 表格文本本身无法解析
    #[error("Parse error in `{file}`: {message}")]
    Parse { file: String, message: String },
    // 文件没有表头
    #[error("Empty file: {0}")]
    Empty(String),
}

/// # Summary
/// 抓取协作方错误枚举。
///
/// # Invariants
/// - 单日单交易所的不可用不属于错误，应返回 `FetchOutcome::Unavailable`。
#[derive(Error, Debug)]
pub enum FetchError {
    // 本地文件系统错误
    #[error("IO error: {0}")]
    Io(String),
}
