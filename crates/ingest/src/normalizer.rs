use crate::alias::{self, CanonicalColumn, ResolvedColumns, RevisionMiss};
use crate::reader::{RawTable, parse_table};
use chrono::NaiveDate;
use spikescan_core::common::{FileKind, non_empty_identifier};
use spikescan_core::ingest::entity::{
    BhavTable, DeliveryTable, RawBhavRecord, RawDeliveryRecord, RawFile,
};
use spikescan_core::ingest::error::{IngestError, SchemaMappingError};
use std::collections::HashSet;
use tracing::{debug, warn};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d/%m/%Y", "%d%m%Y", "%Y%m%d", "%d-%m-%Y"];

/// # Summary
/// 宽松地把单元格转换为数值。
///
/// # Logic
/// 去除千分位逗号；空串、`-`、`NA` 等占位符以及非有限值一律视为缺失，从不报错。
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    if matches!(cleaned.to_uppercase().as_str(), "NA" | "N/A" | "NAN" | "NULL") {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 依次尝试已知日期格式，月份缩写不区分大小写。
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// # Summary
/// 选出第一个必需列全部命中的修订。
///
/// # Logic
/// 1. 按从新到旧的顺序逐个尝试。
/// 2. 全部失败时，以命中必需列最多 (同数取较新) 的修订为准，报告它的第一个缺失列。
fn select_revision(file: &RawFile, table: &RawTable) -> Result<ResolvedColumns, SchemaMappingError> {
    let mut closest: Option<RevisionMiss> = None;
    for revision in alias::revisions_for(file.exchange, file.kind) {
        match alias::resolve(revision, &table.headers) {
            Ok(resolved) => return Ok(resolved),
            Err(miss) => {
                if closest.is_none_or(|c| miss.matched > c.matched) {
                    closest = Some(miss);
                }
            }
        }
    }
    let column = closest
        .map(|m| m.first_missing.name())
        .unwrap_or(CanonicalColumn::Symbol.name());
    Err(SchemaMappingError {
        exchange: file.exchange,
        kind: file.kind,
        file: file.name.clone(),
        column: column.to_string(),
    })
}

/// 按规范列读取某行的单元格。
struct RowView<'a> {
    table: &'a RawTable,
    columns: &'a ResolvedColumns,
    row: usize,
}

impl<'a> RowView<'a> {
    fn text(&self, column: CanonicalColumn) -> Option<&'a str> {
        self.columns
            .position(column)
            .map(|pos| self.table.cell(self.row, pos))
    }

    fn identifier(&self, column: CanonicalColumn) -> Option<String> {
        non_empty_identifier(self.text(column))
    }

    fn number(&self, column: CanonicalColumn) -> Option<f64> {
        self.text(column).and_then(parse_number)
    }

    /// 行内日期可解析且不等于 `expected` 时为 true；缺失或无法解析的日期不算。
    fn dated_elsewhere(&self, expected: NaiveDate) -> bool {
        self.text(CanonicalColumn::Date)
            .and_then(parse_date)
            .is_some_and(|date| date != expected)
    }
}

fn ensure_kind(file: &RawFile, expected: FileKind) -> Result<(), IngestError> {
    if file.kind == expected {
        Ok(())
    } else {
        Err(IngestError::Parse {
            file: file.name.clone(),
            message: format!("expected a {} file, got {}", expected, file.kind),
        })
    }
}

/// # Summary
/// 将行情文件规范化为 `BhavTable`。
///
/// # Logic
/// 1. 解析表格并选择版式修订，失败时返回 `SchemaMappingError`，由调用方跳过该文件。
/// 2. 逐行映射：代码为空的行丢弃；数值宽松解析。
/// 3. 行内日期属于其它交易日的行计入 `stale_rows` 并丢弃，其余记录一律使用文件所属交易日。
/// 4. 同一 (代码, 序列) 只保留第一次出现。
///
/// # Arguments
/// * `file`: 行情原始文件。
///
/// # Returns
/// 规范化后的行情表。
pub fn normalize_bhav(file: &RawFile) -> Result<BhavTable, IngestError> {
    ensure_kind(file, FileKind::Bhav)?;
    let table = parse_table(&file.name, &file.contents)?;
    let columns = select_revision(file, &table)?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    let mut stale_rows = 0usize;
    for row in 0..table.rows.len() {
        let view = RowView {
            table: &table,
            columns: &columns,
            row,
        };
        let Some(symbol) = view.identifier(CanonicalColumn::Symbol) else {
            dropped += 1;
            continue;
        };
        if view.dated_elsewhere(file.date) {
            stale_rows += 1;
            continue;
        }
        let series = view.identifier(CanonicalColumn::Series);
        if !seen.insert((symbol.clone(), series.clone())) {
            dropped += 1;
            continue;
        }
        records.push(RawBhavRecord {
            exchange: file.exchange,
            date: file.date,
            symbol,
            code: view.identifier(CanonicalColumn::Code),
            isin: view.identifier(CanonicalColumn::Isin),
            series,
            close: view.number(CanonicalColumn::Close),
            total_traded_quantity: view.number(CanonicalColumn::TotalTradedQuantity),
            total_traded_value: view.number(CanonicalColumn::TotalTradedValue),
        });
    }

    warn_stale(file, stale_rows);
    debug!(
        "Normalized {} bhav file {} with revision {}: {} rows, {} dropped",
        file.exchange,
        file.name,
        columns.revision,
        records.len(),
        dropped
    );

    Ok(BhavTable {
        exchange: file.exchange,
        date: file.date,
        file: file.name.clone(),
        revision: columns.revision.to_string(),
        has_isin: columns.has(CanonicalColumn::Isin),
        has_code: columns.has(CanonicalColumn::Code),
        records,
        stale_rows,
    })
}

/// # Summary
/// 将交割报告规范化为 `DeliveryTable`。
///
/// # Logic
/// 1. 解析表格并选择版式修订。
/// 2. 没有任何标识的行丢弃；行内日期属于其它交易日的行计入 `stale_rows` 并丢弃。
/// 3. 缺少交割百分比时，若有成交量则按 交割量 / 成交量 × 100 推算。
pub fn normalize_delivery(file: &RawFile) -> Result<DeliveryTable, IngestError> {
    ensure_kind(file, FileKind::Delivery)?;
    let table = parse_table(&file.name, &file.contents)?;
    let columns = select_revision(file, &table)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    let mut stale_rows = 0usize;
    for row in 0..table.rows.len() {
        let view = RowView {
            table: &table,
            columns: &columns,
            row,
        };
        let symbol = view.identifier(CanonicalColumn::Symbol);
        let code = view.identifier(CanonicalColumn::Code);
        let isin = view.identifier(CanonicalColumn::Isin);
        if symbol.is_none() && code.is_none() && isin.is_none() {
            dropped += 1;
            continue;
        }
        if view.dated_elsewhere(file.date) {
            stale_rows += 1;
            continue;
        }
        let delivered_quantity = view.number(CanonicalColumn::DeliveredQuantity);
        let traded_quantity = view.number(CanonicalColumn::TradedQuantity);
        let delivery_percentage = view
            .number(CanonicalColumn::DeliveryPercentage)
            .or_else(|| derive_percentage(delivered_quantity, traded_quantity));
        records.push(RawDeliveryRecord {
            exchange: file.exchange,
            date: file.date,
            symbol,
            code,
            isin,
            series: view.identifier(CanonicalColumn::Series),
            delivered_quantity,
            delivery_percentage,
            traded_quantity,
        });
    }

    warn_stale(file, stale_rows);
    debug!(
        "Normalized {} delivery file {} with revision {}: {} rows, {} dropped",
        file.exchange,
        file.name,
        columns.revision,
        records.len(),
        dropped
    );

    Ok(DeliveryTable {
        exchange: file.exchange,
        date: file.date,
        file: file.name.clone(),
        revision: columns.revision.to_string(),
        has_symbol: columns.has(CanonicalColumn::Symbol),
        has_isin: columns.has(CanonicalColumn::Isin),
        has_code: columns.has(CanonicalColumn::Code),
        records,
        stale_rows,
    })
}

fn warn_stale(file: &RawFile, stale_rows: usize) {
    if stale_rows > 0 {
        warn!(
            "{} {} file {} for {}: {} rows dated another day were dropped",
            file.exchange, file.kind, file.name, file.date, stale_rows
        );
    }
}

fn derive_percentage(delivered: Option<f64>, traded: Option<f64>) -> Option<f64> {
    match (delivered, traded) {
        (Some(d), Some(t)) if t > 0.0 => Some(d / t * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_is_lenient() {
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number(" - "), None);
        assert_eq!(parse_number("NA"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(parse_date("2025-01-06"), Some(expected));
        assert_eq!(parse_date("06-JAN-2025"), Some(expected));
        assert_eq!(parse_date("06-Jan-2025"), Some(expected));
        assert_eq!(parse_date("06/01/2025"), Some(expected));
        assert_eq!(parse_date("06012025"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_rows_dated_another_day_are_dropped() {
        let file = RawFile {
            exchange: spikescan_core::common::Exchange::Bse,
            kind: FileKind::Bhav,
            date: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            name: "bse_bhav_20250107.csv".to_string(),
            contents: "SYMBOL,CLOSE,TOTTRDQTY,TOTTRDVAL,SC_CODE,ISIN,DATE\n\
                       ABC,200,10,2000,500001,INE000A01010,2025-01-06\n\
                       XYZ,50,10,500,500002,INE000B01010,2025-01-07\n\
                       PQR,20,10,200,500003,INE000C01010,\n"
                .to_string(),
        };
        let table = normalize_bhav(&file).unwrap();
        assert_eq!(table.stale_rows, 1);
        let symbols: Vec<&str> = table.records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["XYZ", "PQR"]);
        assert!(table.records.iter().all(|r| r.date == file.date));
    }

    #[test]
    fn test_derive_percentage_requires_positive_volume() {
        assert_eq!(derive_percentage(Some(50.0), Some(200.0)), Some(25.0));
        assert_eq!(derive_percentage(Some(50.0), Some(0.0)), None);
        assert_eq!(derive_percentage(None, Some(10.0)), None);
    }
}
