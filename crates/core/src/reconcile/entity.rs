use crate::common::{Exchange, InstrumentKey, JoinKeyKind};
use crate::reconcile::metric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 行情与交割合并、跨交易所去重后的规范日记录。
///
/// # Invariants
/// - 每个 (证券, 日期) 仅一条。
/// - 交割成交额与 ATW 不作为字段保存，每次都由原始字段现算。
/// - `delivery_data_present == false` 时交割量与交割百分比为 0 (默认值，而非真实的零交割)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDailyRecord {
    // 跨交易所身份键
    pub key: InstrumentKey,
    pub symbol: String,
    pub isin: Option<String>,
    pub code: Option<String>,
    pub exchange: Exchange,
    pub date: NaiveDate,
    pub series: Option<String>,
    pub close: f64,
    pub total_traded_quantity: f64,
    pub total_traded_value: f64,
    pub delivered_quantity: f64,
    pub delivery_percentage: f64,
    // 该记录是否真正匹配到了交割数据
    pub delivery_data_present: bool,
}

impl CanonicalDailyRecord {
    /// 交割成交额 = 交割量 × 收盘价。
    pub fn delivery_turnover(&self) -> f64 {
        metric::delivery_turnover(self.delivered_quantity, self.close)
    }

    /// 平均成交额 = 总成交额 / 1000。
    pub fn average_traded_worth(&self) -> f64 {
        metric::average_traded_worth(self.total_traded_value)
    }
}

/// # Summary
/// 单个证券按日期升序排列的完整历史。
///
/// # Invariants
/// - 记录严格按日期升序，同一日期至多一条。
/// - 构造后只读。
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentHistory {
    key: InstrumentKey,
    records: Vec<CanonicalDailyRecord>,
}

impl InstrumentHistory {
    /// # Summary
    /// 由任意顺序的记录构造历史。
    ///
    /// # Logic
    /// 1. 按 (日期, 交易所优先级) 排序。
    /// 2. 同一日期只保留优先级最高的一条。
    pub fn new(key: InstrumentKey, mut records: Vec<CanonicalDailyRecord>) -> Self {
        records.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.exchange.priority().cmp(&b.exchange.priority()))
        });
        records.dedup_by(|later, earlier| later.date == earlier.date);
        Self { key, records }
    }

    pub fn key(&self) -> &InstrumentKey {
        &self.key
    }

    pub fn records(&self) -> &[CanonicalDailyRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 最近一个交易日的记录，即该证券自己的基准日。
    pub fn latest(&self) -> Option<&CanonicalDailyRecord> {
        self.records.last()
    }

    /// 严格早于 `date` 的所有记录 (升序)。
    pub fn prior_to(&self, date: NaiveDate) -> &[CanonicalDailyRecord] {
        let end = self.records.partition_point(|r| r.date < date);
        &self.records[..end]
    }
}

/// # Summary
/// 同一交易所同一交易日的行情/交割关联键解析结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyResolution {
    // 置信度标签，同时就是所用键的类别
    pub kind: JoinKeyKind,
    // 规范列名
    pub column: &'static str,
}
