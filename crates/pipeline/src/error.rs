use spikescan_core::ingest::error::FetchError;
use spikescan_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 运行级致命错误。
///
/// # Invariants
/// - 文件级与记录级问题从不出现在这里，它们记录在 `RunReport` 中。
/// - 出现任何变体时都不会发布输出。
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    // 所有交易所所有交易日都没有任何记录
    #[error("Empty dataset: no records loaded for any exchange across {dates} date(s)")]
    EmptyDataset { dates: usize },
    // 后台计算任务异常退出
    #[error("Task error: {0}")]
    Task(String),
}
