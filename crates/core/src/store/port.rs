use super::error::StoreError;
use crate::common::InstrumentKey;
use crate::quality::entity::RunReport;
use crate::reconcile::entity::{CanonicalDailyRecord, InstrumentHistory};
use crate::screen::entity::SnapshotRow;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 规范日记录存储接口，负责历史的持久化与读取。
///
/// # Invariants
/// - 存储只保存原始字段，派生指标在读取后现算。
/// - 同一 (证券, 日期) 重复写入时以最后一次为准。
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// # Summary
    /// 清空所有规范记录，为一次完整重算做准备。
    async fn reset(&self) -> Result<(), StoreError>;

    /// # Summary
    /// 写入某交易日的全部规范记录。
    ///
    /// # Logic
    /// 1. 任何记录的日期不等于 `date` 时整批拒绝，不做任何写入。
    /// 2. 删除该日已有记录。
    /// 3. 批量插入新记录。
    ///
    /// # Arguments
    /// * `date`: 交易日。
    /// * `records`: 该日去重、过滤后的记录。
    ///
    /// # Returns
    /// 成功返回 Ok；日期不符返回 `StoreError::DateMismatch`。
    async fn append_day(
        &self,
        date: NaiveDate,
        records: &[CanonicalDailyRecord],
    ) -> Result<(), StoreError>;

    /// # Summary
    /// 加载单个证券的历史。
    ///
    /// # Returns
    /// 按日期升序的历史；证券不存在时返回空历史。
    async fn load_history(&self, key: &InstrumentKey) -> Result<InstrumentHistory, StoreError>;

    /// # Summary
    /// 加载全部证券的历史。
    ///
    /// # Returns
    /// 按身份键升序排列的历史列表。
    async fn load_all(&self) -> Result<Vec<InstrumentHistory>, StoreError>;
}

/// # Summary
/// 结果发布接口。
///
/// # Invariants
/// - 发布必须是原子的：并发读取者只能看到旧文件或完整的新文件。
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    /// # Summary
    /// 发布输出表与质量报告。
    ///
    /// # Arguments
    /// * `rows`: 已排序的输出行。
    /// * `report`: 本次运行的质量报告。
    async fn publish(&self, rows: &[SnapshotRow], report: &RunReport) -> Result<(), StoreError>;
}

/// # Summary
/// 检查一批记录是否都属于 `date`。
///
/// # Returns
/// 遇到第一条日期不符的记录时返回 `StoreError::DateMismatch`。
pub fn ensure_same_day(date: NaiveDate, records: &[CanonicalDailyRecord]) -> Result<(), StoreError> {
    match records.iter().find(|r| r.date != date) {
        Some(record) => Err(StoreError::DateMismatch {
            key: record.key.to_string(),
            expected: date,
            found: record.date,
        }),
        None => Ok(()),
    }
}
