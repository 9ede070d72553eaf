//! 内存版测试替身，仅在 `test-utils` 特性下编译。

use crate::common::{Exchange, InstrumentKey};
use crate::ingest::entity::{FetchOutcome, RawFile};
use crate::ingest::error::FetchError;
use crate::ingest::port::RawFileFetcher;
use crate::quality::entity::RunReport;
use crate::reconcile::entity::{CanonicalDailyRecord, InstrumentHistory};
use crate::screen::entity::SnapshotRow;
use crate::store::error::StoreError;
use crate::store::port::{HistoryStore, SnapshotPublisher, ensure_same_day};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

/// # Summary
/// 基于 DashMap 的内存历史存储。
///
/// # Invariants
/// - 读取结果与写入顺序无关，始终按键和日期排序。
#[derive(Default)]
pub struct MemHistoryStore {
    records: DashMap<InstrumentKey, Vec<CanonicalDailyRecord>>,
}

impl MemHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的记录总数。
    pub fn len(&self) -> usize {
        self.records.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for MemHistoryStore {
    async fn reset(&self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }

    async fn append_day(
        &self,
        date: NaiveDate,
        records: &[CanonicalDailyRecord],
    ) -> Result<(), StoreError> {
        ensure_same_day(date, records)?;
        for mut entry in self.records.iter_mut() {
            entry.value_mut().retain(|r| r.date != date);
        }
        for record in records {
            self.records
                .entry(record.key.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(())
    }

    async fn load_history(&self, key: &InstrumentKey) -> Result<InstrumentHistory, StoreError> {
        let records = self
            .records
            .get(key)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        Ok(InstrumentHistory::new(key.clone(), records))
    }

    async fn load_all(&self) -> Result<Vec<InstrumentHistory>, StoreError> {
        let mut histories: Vec<InstrumentHistory> = self
            .records
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| InstrumentHistory::new(e.key().clone(), e.value().clone()))
            .collect();
        histories.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(histories)
    }
}

/// # Summary
/// 记录每次发布内容的内存发布器。
#[derive(Default)]
pub struct MemSnapshotPublisher {
    published: Mutex<Vec<(Vec<SnapshotRow>, RunReport)>>,
}

impl MemSnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近一次发布的内容。
    pub async fn last(&self) -> Option<(Vec<SnapshotRow>, RunReport)> {
        self.published.lock().await.last().cloned()
    }

    pub async fn publish_count(&self) -> usize {
        self.published.lock().await.len()
    }
}

#[async_trait]
impl SnapshotPublisher for MemSnapshotPublisher {
    async fn publish(&self, rows: &[SnapshotRow], report: &RunReport) -> Result<(), StoreError> {
        self.published
            .lock()
            .await
            .push((rows.to_vec(), report.clone()));
        Ok(())
    }
}

/// # Summary
/// 预置文件内容的抓取替身。
///
/// # Invariants
/// - 未登记的 (日期, 交易所) 返回 `Unavailable`。
#[derive(Default)]
pub struct StaticFileFetcher {
    files: BTreeMap<(NaiveDate, Exchange), Vec<RawFile>>,
}

impl StaticFileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个原始文件。
    pub fn with_file(mut self, file: RawFile) -> Self {
        self.files
            .entry((file.date, file.exchange))
            .or_default()
            .push(file);
        self
    }
}

#[async_trait]
impl RawFileFetcher for StaticFileFetcher {
    async fn available_dates(&self) -> Result<Vec<NaiveDate>, FetchError> {
        let dates: BTreeSet<NaiveDate> = self.files.keys().map(|(d, _)| *d).collect();
        Ok(dates.into_iter().collect())
    }

    async fn fetch(
        &self,
        date: NaiveDate,
        exchange: Exchange,
    ) -> Result<FetchOutcome, FetchError> {
        Ok(match self.files.get(&(date, exchange)) {
            Some(files) => FetchOutcome::Available {
                files: files.clone(),
                unreadable: Vec::new(),
            },
            None => FetchOutcome::Unavailable {
                reason: format!("no {} files registered for {}", exchange, date),
            },
        })
    }
}
