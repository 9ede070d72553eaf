use crate::common::{Exchange, FileKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 由抓取协作方落地到本地的单个原始文件 (已解压的表格文本)。
///
/// # Invariants
/// - `date` 为文件所属交易日，由文件名或抓取方确定。规范化后的每条记录都以它为日期。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    // 所属交易所
    pub exchange: Exchange,
    // 文件类别
    pub kind: FileKind,
    // 所属交易日
    pub date: NaiveDate,
    // 文件名，仅用于诊断
    pub name: String,
    // 表格原文 (逗号或竖线分隔)
    pub contents: String,
}

/// 已识别但无法读取的原始文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableFile {
    pub kind: FileKind,
    pub name: String,
    pub reason: String,
}

/// # Summary
/// 某交易所某交易日的抓取结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    // 找到零个或多个文件；识别出但读取失败的文件单独列出
    Available {
        files: Vec<RawFile>,
        unreadable: Vec<UnreadableFile>,
    },
    // 数据源声明该日不可用 (休市、尚未发布等)
    Unavailable { reason: String },
}

/// # Summary
/// 行情文件中的单条记录，已映射为规范列名。
///
/// # Invariants
/// - 每个 (交易所, 代码, 日期) 至多一条。
/// - 数值列无法解析时为 `None`，从不因坏值报错。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBhavRecord {
    pub exchange: Exchange,
    pub date: NaiveDate,
    // 交易所内代码，已规范化
    pub symbol: String,
    // 交易所数字代码 (BSE scrip code 等)
    pub code: Option<String>,
    pub isin: Option<String>,
    // 序列/板块标记 (如 EQ)
    pub series: Option<String>,
    pub close: Option<f64>,
    pub total_traded_quantity: Option<f64>,
    pub total_traded_value: Option<f64>,
}

/// # Summary
/// 交割报告中的单条记录。
///
/// # Invariants
/// - 至少有一个标识 (`symbol`、`code`、`isin`) 非空。
/// - 每个 (交易所, 标识, 日期) 零或一条；缺失是合法状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeliveryRecord {
    pub exchange: Exchange,
    pub date: NaiveDate,
    pub symbol: Option<String>,
    pub code: Option<String>,
    pub isin: Option<String>,
    pub series: Option<String>,
    pub delivered_quantity: Option<f64>,
    pub delivery_percentage: Option<f64>,
    // 交割报告自带的成交量，用于核对交割百分比口径
    pub traded_quantity: Option<f64>,
}

/// # Summary
/// 规范化后的行情表。
///
/// # Invariants
/// - `has_isin` / `has_code` 仅表示原文件存在该列，单元格仍可能为空。
/// - 每条记录的 `date` 都等于表的 `date`。
#[derive(Debug, Clone, PartialEq)]
pub struct BhavTable {
    pub exchange: Exchange,
    pub date: NaiveDate,
    pub file: String,
    // 匹配到的版式修订名
    pub revision: String,
    pub has_isin: bool,
    pub has_code: bool,
    pub records: Vec<RawBhavRecord>,
    // 行内日期属于其它交易日而被丢弃的行数
    pub stale_rows: usize,
}

/// # Summary
/// 规范化后的交割表。
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryTable {
    pub exchange: Exchange,
    pub date: NaiveDate,
    pub file: String,
    pub revision: String,
    pub has_symbol: bool,
    pub has_isin: bool,
    pub has_code: bool,
    pub records: Vec<RawDeliveryRecord>,
    pub stale_rows: usize,
}
