use crate::common::{Exchange, FileKind, JoinKeyKind};
use crate::screen::entity::ConditionStats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 数据质量问题类别。
///
/// # Invariants
/// - 均为非致命发现：记录照常参与计算，但必须出现在报告中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    // 交割量大于总成交量
    DeliveredExceedsTraded,
    // 申报交割百分比与 交割量/成交量 不一致
    DeliveryPctInconsistent,
    // 收盘价为零或负
    NonPositivePrice,
    // 总成交量为零或负
    NonPositiveQuantity,
    // 交割量为负
    NegativeDelivery,
    // 交割成交额相对前一交易日跳变过大
    TurnoverJump,
    // ATW 相对前一交易日跳变过大
    WorthJump,
}

/// # Summary
/// 结构化的数据质量发现。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub issue: QualityIssue,
    pub exchange: Exchange,
    pub symbol: String,
    pub date: NaiveDate,
    pub detail: String,
}

/// # Summary
/// 历史不足完整窗口的提示，不是错误：均值退化为对现有记录求均值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientHistoryNotice {
    pub symbol: String,
    pub exchange: Exchange,
    pub as_of: NaiveDate,
    // 基准日之前可用的交易日数
    pub available: usize,
    // 最长窗口所需的交易日数
    pub required: usize,
}

/// 单个原始文件的处理结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Loaded {
        revision: String,
        rows: usize,
        // 行内日期与所属交易日不符而丢弃的行数
        stale_rows: usize,
    },
    Skipped { reason: String },
}

/// 文件级处理报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub exchange: Exchange,
    pub kind: FileKind,
    pub date: NaiveDate,
    pub file: String,
    pub outcome: FileOutcome,
}

/// # Summary
/// 某交易所某交易日的合并诊断。
///
/// # Invariants
/// - `join_key` 为 None 表示没有可关联的交割报告 (缺失或身份解析失败)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDayReport {
    pub exchange: Exchange,
    pub date: NaiveDate,
    // 抓取方声明不可用时的原因
    pub unavailable: Option<String>,
    pub bhav_rows: usize,
    pub delivery_rows: usize,
    pub join_key: Option<JoinKeyKind>,
    // 是否存在可用的交割报告
    pub delivery_report_present: bool,
    // 因未匹配到交割数据而默认为零的记录数
    pub defaulted_records: usize,
    // 身份解析失败等附加说明
    pub note: Option<String>,
}

/// # Summary
/// 一次运行的完整质量报告，与输出文件一同发布。
///
/// # Invariants
/// - 不包含任何墙钟时间，相同输入必须生成逐字节相同的报告。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunReport {
    // 本次处理的交易日
    pub dates: Vec<NaiveDate>,
    pub files: Vec<FileReport>,
    pub exchange_days: Vec<ExchangeDayReport>,
    // 所有交易所都没有记录的交易日
    pub gaps: Vec<NaiveDate>,
    // 跨交易所去重移除的记录数
    pub duplicates_removed: usize,
    // 被可投资范围过滤排除的记录数
    pub excluded_by_universe: usize,
    pub warnings: Vec<DataQualityWarning>,
    pub insufficient_history: Vec<InsufficientHistoryNotice>,
    pub condition_stats: ConditionStats,
    pub output_rows: usize,
    // 通过全部十二个条件的代码
    pub signals: Vec<String>,
}
