use spikescan_core::config::QualityConfig;
use spikescan_core::quality::entity::{DataQualityWarning, QualityIssue};
use spikescan_core::reconcile::entity::{CanonicalDailyRecord, InstrumentHistory};

fn warning(record: &CanonicalDailyRecord, issue: QualityIssue, detail: String) -> DataQualityWarning {
    DataQualityWarning {
        issue,
        exchange: record.exchange,
        symbol: record.symbol.clone(),
        date: record.date,
        detail,
    }
}

/// # Summary
/// 检查单条记录的内部一致性。
///
/// # Logic
/// 1. 收盘价、总成交量必须为正；交割量不得为负。
/// 2. 交割量不得超过总成交量。
/// 3. 有交割数据时，申报百分比与 交割量/成交量 的偏差不得超过容差 (百分点)。
///
/// # Returns
/// 发现的问题列表，记录本身不做修正。
pub fn check_record(record: &CanonicalDailyRecord, config: &QualityConfig) -> Vec<DataQualityWarning> {
    let mut found = Vec::new();

    if record.close <= 0.0 {
        found.push(warning(
            record,
            QualityIssue::NonPositivePrice,
            format!("close {}", record.close),
        ));
    }
    if record.total_traded_quantity <= 0.0 {
        found.push(warning(
            record,
            QualityIssue::NonPositiveQuantity,
            format!("total traded quantity {}", record.total_traded_quantity),
        ));
    }
    if record.delivered_quantity < 0.0 {
        found.push(warning(
            record,
            QualityIssue::NegativeDelivery,
            format!("delivered quantity {}", record.delivered_quantity),
        ));
    }
    if record.total_traded_quantity > 0.0 {
        if record.delivered_quantity > record.total_traded_quantity {
            found.push(warning(
                record,
                QualityIssue::DeliveredExceedsTraded,
                format!(
                    "delivered {} > traded {}",
                    record.delivered_quantity, record.total_traded_quantity
                ),
            ));
        }
        if record.delivery_data_present {
            let implied = record.delivered_quantity / record.total_traded_quantity * 100.0;
            if (record.delivery_percentage - implied).abs() > config.delivery_pct_tolerance {
                found.push(warning(
                    record,
                    QualityIssue::DeliveryPctInconsistent,
                    format!(
                        "reported {:.2}% vs implied {:.2}%",
                        record.delivery_percentage, implied
                    ),
                ));
            }
        }
    }

    found
}

/// 相对前一交易日放大或缩小超过 `multiple` 倍视为跳变；任一侧为零时不判断。
fn is_jump(previous: f64, current: f64, multiple: f64) -> bool {
    if previous <= 0.0 || current <= 0.0 {
        return false;
    }
    current > previous * multiple || current * multiple < previous
}

/// # Summary
/// 对单个证券的完整历史做质量检查。
///
/// # Logic
/// 1. 每条记录做 `check_record`。
/// 2. 相邻交易日比较交割成交额与 ATW，升降超过配置倍数都报告跳变。
pub fn validate_history(history: &InstrumentHistory, config: &QualityConfig) -> Vec<DataQualityWarning> {
    let records = history.records();
    let mut found: Vec<DataQualityWarning> =
        records.iter().flat_map(|r| check_record(r, config)).collect();

    for pair in records.windows(2) {
        let [previous, current] = pair else {
            continue;
        };
        let (prev_turnover, cur_turnover) = (previous.delivery_turnover(), current.delivery_turnover());
        if is_jump(prev_turnover, cur_turnover, config.jump_multiple) {
            found.push(warning(
                current,
                QualityIssue::TurnoverJump,
                format!(
                    "delivery turnover {:.2} vs {:.2} on {}",
                    cur_turnover, prev_turnover, previous.date
                ),
            ));
        }
        let (prev_atw, cur_atw) = (previous.average_traded_worth(), current.average_traded_worth());
        if is_jump(prev_atw, cur_atw, config.jump_multiple) {
            found.push(warning(
                current,
                QualityIssue::WorthJump,
                format!("ATW {:.2} vs {:.2} on {}", cur_atw, prev_atw, previous.date),
            ));
        }
    }

    found
}
