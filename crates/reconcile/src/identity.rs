use spikescan_core::common::{InstrumentKey, JoinKeyKind};
use spikescan_core::ingest::entity::{BhavTable, DeliveryTable, RawBhavRecord, RawDeliveryRecord};
use spikescan_core::reconcile::entity::KeyResolution;
use spikescan_core::reconcile::error::IdentityResolutionError;

/// 按关联键类别取行情记录上的键值。
pub fn bhav_key(record: &RawBhavRecord, kind: JoinKeyKind) -> Option<&str> {
    match kind {
        JoinKeyKind::Isin => record.isin.as_deref(),
        JoinKeyKind::Code => record.code.as_deref(),
        JoinKeyKind::Symbol => Some(record.symbol.as_str()),
    }
}

/// 按关联键类别取交割记录上的键值。
pub fn delivery_key(record: &RawDeliveryRecord, kind: JoinKeyKind) -> Option<&str> {
    match kind {
        JoinKeyKind::Isin => record.isin.as_deref(),
        JoinKeyKind::Code => record.code.as_deref(),
        JoinKeyKind::Symbol => record.symbol.as_deref(),
    }
}

fn column_present(bhav: &BhavTable, delivery: &DeliveryTable, kind: JoinKeyKind) -> bool {
    match kind {
        JoinKeyKind::Isin => bhav.has_isin && delivery.has_isin,
        JoinKeyKind::Code => bhav.has_code && delivery.has_code,
        JoinKeyKind::Symbol => delivery.has_symbol,
    }
}

/// # Summary
/// 为同一交易所同一交易日的行情表与交割表选择关联键。
///
/// # Logic
/// 1. 依次尝试 ISIN、数字代码、代码字符串。
/// 2. 某类键可用的条件：两侧都有该列，且两侧都至少有一行非空值。
/// 3. 第一个可用的键即为结果，其类别同时作为置信度标签。
///
/// # Arguments
/// * `bhav`: 规范化后的行情表。
/// * `delivery`: 规范化后的交割表。
///
/// # Returns
/// 成功返回 `KeyResolution`；三类键都不可用时返回 `IdentityResolutionError`。
pub fn resolve_join_key(
    bhav: &BhavTable,
    delivery: &DeliveryTable,
) -> Result<KeyResolution, IdentityResolutionError> {
    const ORDER: [JoinKeyKind; 3] = [JoinKeyKind::Isin, JoinKeyKind::Code, JoinKeyKind::Symbol];

    ORDER
        .into_iter()
        .find(|kind| {
            column_present(bhav, delivery, *kind)
                && bhav.records.iter().any(|r| bhav_key(r, *kind).is_some())
                && delivery
                    .records
                    .iter()
                    .any(|r| delivery_key(r, *kind).is_some())
        })
        .map(|kind| KeyResolution {
            kind,
            column: kind.as_str(),
        })
        .ok_or_else(|| IdentityResolutionError {
            exchange: bhav.exchange,
            date: bhav.date,
            bhav_file: bhav.file.clone(),
            delivery_file: delivery.file.clone(),
        })
}

/// # Summary
/// 跨交易所身份键：有 ISIN 用 ISIN，否则退回代码字符串。
///
/// # Invariants
/// - 代码字符串只是兜底：两地代码不同的双重上市证券无法被识别为同一证券。
pub fn cross_exchange_key(record: &RawBhavRecord) -> InstrumentKey {
    match record.isin.as_deref() {
        Some(isin) => InstrumentKey::new(JoinKeyKind::Isin, isin),
        None => InstrumentKey::new(JoinKeyKind::Symbol, &record.symbol),
    }
}
