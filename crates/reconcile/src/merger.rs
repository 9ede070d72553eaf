use crate::identity::{bhav_key, cross_exchange_key, delivery_key, resolve_join_key};
use spikescan_core::common::JoinKeyKind;
use spikescan_core::ingest::entity::{BhavTable, DeliveryTable, RawBhavRecord, RawDeliveryRecord};
use spikescan_core::quality::entity::ExchangeDayReport;
use spikescan_core::reconcile::entity::CanonicalDailyRecord;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 单个交易所单个交易日的合并结果。
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeDayMerge {
    pub records: Vec<CanonicalDailyRecord>,
    pub report: ExchangeDayReport,
}

/// 关联键值到交割记录的索引，保留同键的全部候选行。
struct DeliveryIndex<'a> {
    kind: JoinKeyKind,
    rows: HashMap<&'a str, Vec<&'a RawDeliveryRecord>>,
}

impl<'a> DeliveryIndex<'a> {
    fn build(table: &'a DeliveryTable, kind: JoinKeyKind) -> Self {
        let mut rows: HashMap<&'a str, Vec<&'a RawDeliveryRecord>> = HashMap::new();
        for record in &table.records {
            if let Some(key) = delivery_key(record, kind) {
                rows.entry(key).or_default().push(record);
            }
        }
        Self { kind, rows }
    }

    /// 同键多行时优先选择序列相同的一行，否则取第一行。
    fn lookup(&self, bhav: &RawBhavRecord) -> Option<&'a RawDeliveryRecord> {
        let candidates = self.rows.get(bhav_key(bhav, self.kind)?)?;
        candidates
            .iter()
            .find(|d| d.series.is_some() && d.series == bhav.series)
            .or_else(|| candidates.first())
            .copied()
    }
}

/// # Summary
/// 以行情为左表、交割为右表，左连接生成规范日记录。
///
/// # Logic
/// 1. 没有交割表时，所有记录的交割字段取默认值 0，并标记为缺失。
/// 2. 有交割表时先解析关联键；解析失败则丢弃交割表并在报告中说明。
/// 3. 逐条行情记录查找交割数据，未匹配的记录同样取默认值并计数。
/// 4. 行情缺失的数值字段按 0 处理，由质量检查报告。
///
/// # Arguments
/// * `bhav`: 该交易所该日的行情表。
/// * `delivery`: 该交易所该日的交割表，可能不存在。
///
/// # Returns
/// 合并后的记录与诊断报告。
pub fn merge_exchange_day(bhav: &BhavTable, delivery: Option<&DeliveryTable>) -> ExchangeDayMerge {
    let mut note = None;
    let index = match delivery {
        None => None,
        Some(table) => match resolve_join_key(bhav, table) {
            Ok(resolution) => {
                debug!(
                    "{} {}: joining delivery on {}",
                    bhav.exchange, bhav.date, resolution.column
                );
                Some(DeliveryIndex::build(table, resolution.kind))
            }
            Err(e) => {
                warn!("{}", e);
                note = Some(e.to_string());
                None
            }
        },
    };

    let mut defaulted = 0usize;
    let records: Vec<CanonicalDailyRecord> = bhav
        .records
        .iter()
        .map(|b| {
            let matched = index.as_ref().and_then(|i| i.lookup(b));
            let delivered = matched.and_then(|d| d.delivered_quantity);
            if delivered.is_none() {
                defaulted += 1;
            }
            CanonicalDailyRecord {
                key: cross_exchange_key(b),
                symbol: b.symbol.clone(),
                isin: b.isin.clone(),
                code: b.code.clone(),
                exchange: b.exchange,
                date: b.date,
                series: b.series.clone(),
                close: b.close.unwrap_or(0.0),
                total_traded_quantity: b.total_traded_quantity.unwrap_or(0.0),
                total_traded_value: b.total_traded_value.unwrap_or(0.0),
                delivered_quantity: delivered.unwrap_or(0.0),
                delivery_percentage: matched
                    .filter(|_| delivered.is_some())
                    .and_then(|d| d.delivery_percentage)
                    .unwrap_or(0.0),
                delivery_data_present: delivered.is_some(),
            }
        })
        .collect();

    if defaulted > 0 && index.is_some() {
        debug!(
            "{} {}: {} of {} records had no matching delivery row",
            bhav.exchange,
            bhav.date,
            defaulted,
            records.len()
        );
    }

    let report = ExchangeDayReport {
        exchange: bhav.exchange,
        date: bhav.date,
        unavailable: None,
        bhav_rows: bhav.records.len(),
        delivery_rows: delivery.map(|d| d.records.len()).unwrap_or(0),
        join_key: index.as_ref().map(|i| i.kind),
        delivery_report_present: index.is_some(),
        defaulted_records: defaulted,
        note,
    };

    ExchangeDayMerge { records, report }
}

/// # Summary
/// 跨交易所去重：同一 (身份键, 日期) 只保留优先级最高的交易所的记录。
///
/// # Logic
/// 1. 按 (身份键, 日期, 交易所优先级, 代码, 序列) 排序，保证结果与输入顺序无关。
/// 2. 相邻的同 (身份键, 日期) 记录只保留第一条。
///
/// # Returns
/// 去重后按 (身份键, 日期) 排序的记录，以及被移除的数量。
pub fn deduplicate_cross_exchange(
    mut records: Vec<CanonicalDailyRecord>,
) -> (Vec<CanonicalDailyRecord>, usize) {
    records.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then(a.date.cmp(&b.date))
            .then(a.exchange.priority().cmp(&b.exchange.priority()))
            .then(a.symbol.cmp(&b.symbol))
            .then(a.series.cmp(&b.series))
    });
    let before = records.len();
    records.dedup_by(|later, earlier| later.key == earlier.key && later.date == earlier.date);
    let removed = before - records.len();
    (records, removed)
}
