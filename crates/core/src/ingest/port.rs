use crate::common::Exchange;
use crate::ingest::entity::FetchOutcome;
use crate::ingest::error::FetchError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 原始文件提供者接口 (外部协作方)。
///
/// # Invariants
/// - 核心流水线假定抓取已完成，只读取本地可得的数据，从不阻塞等待下载。
/// - 重试与退避属于实现者的职责。
#[async_trait]
pub trait RawFileFetcher: Send + Sync {
    /// # Summary
    /// 列出所有至少存在一个原始文件的交易日。
    ///
    /// # Returns
    /// 升序且去重的日期列表。
    async fn available_dates(&self) -> Result<Vec<NaiveDate>, FetchError>;

    /// # Summary
    /// 获取某交易所某交易日的原始文件。
    ///
    /// # Arguments
    /// * `date`: 交易日。
    /// * `exchange`: 交易所。
    ///
    /// # Returns
    /// 零或多个文件，或声明不可用。
    async fn fetch(&self, date: NaiveDate, exchange: Exchange)
    -> Result<FetchOutcome, FetchError>;
}
