use crate::common::{Exchange, InstrumentKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// # Summary
/// 单个指标的 "今日 vs 1W vs 1M vs 3M" 特征向量。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWindows {
    pub today: f64,
    pub week: f64,
    pub month: f64,
    pub quarter: f64,
}

impl MetricWindows {
    /// 无历史时三个窗口都回退为当日值。
    pub fn flat(value: f64) -> Self {
        Self {
            today: value,
            week: value,
            month: value,
            quarter: value,
        }
    }
}

/// # Summary
/// 每个证券一行的渐进快照：基准日字段加三个指标的滚动均值。
///
/// # Invariants
/// - `as_of` 是该证券自己的最近交易日，不是全局最新日期。
/// - 窗口均值只使用严格早于 `as_of` 的记录。
/// - 每次运行完全重算，不做增量更新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveSnapshot {
    pub key: InstrumentKey,
    pub symbol: String,
    pub isin: Option<String>,
    pub exchange: Exchange,
    pub as_of: NaiveDate,
    pub close: f64,
    pub delivery_data_present: bool,
    // 基准日之前可用的历史交易日数
    pub prior_days: usize,
    pub delivery_pct: MetricWindows,
    pub delivery_turnover: MetricWindows,
    pub atw: MetricWindows,
}

/// # Summary
/// 固定顺序的十二条筛选条件。
///
/// # Invariants
/// - 编号 1-12 与声明顺序一致，不可调整。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    // A 组：绝对阈值
    DeliveryPctMin,
    DeliveryTurnoverMin,
    AtwMin,
    // B 组：交割百分比渐进
    DeliveryPctTodayOverWeek,
    DeliveryPctWeekOverMonth,
    DeliveryPctMonthOverQuarter,
    // C 组：交割成交额渐进
    TurnoverTodayOverWeek,
    TurnoverWeekOverMonth,
    TurnoverMonthOverQuarter,
    // D 组：ATW 渐进
    AtwTodayOverWeek,
    AtwWeekOverMonth,
    AtwMonthOverQuarter,
}

impl Condition {
    pub const ALL: [Condition; 12] = [
        Condition::DeliveryPctMin,
        Condition::DeliveryTurnoverMin,
        Condition::AtwMin,
        Condition::DeliveryPctTodayOverWeek,
        Condition::DeliveryPctWeekOverMonth,
        Condition::DeliveryPctMonthOverQuarter,
        Condition::TurnoverTodayOverWeek,
        Condition::TurnoverWeekOverMonth,
        Condition::TurnoverMonthOverQuarter,
        Condition::AtwTodayOverWeek,
        Condition::AtwWeekOverMonth,
        Condition::AtwMonthOverQuarter,
    ];

    /// 条件编号 (1-12)。
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Condition::DeliveryPctMin => 0,
            Condition::DeliveryTurnoverMin => 1,
            Condition::AtwMin => 2,
            Condition::DeliveryPctTodayOverWeek => 3,
            Condition::DeliveryPctWeekOverMonth => 4,
            Condition::DeliveryPctMonthOverQuarter => 5,
            Condition::TurnoverTodayOverWeek => 6,
            Condition::TurnoverWeekOverMonth => 7,
            Condition::TurnoverMonthOverQuarter => 8,
            Condition::AtwTodayOverWeek => 9,
            Condition::AtwWeekOverMonth => 10,
            Condition::AtwMonthOverQuarter => 11,
        }
    }

    /// 条件所属分组 (A-D)。
    pub fn group(self) -> char {
        match self.number() {
            1..=3 => 'A',
            4..=6 => 'B',
            7..=9 => 'C',
            _ => 'D',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Condition::DeliveryPctMin => "delivery_pct >= min",
            Condition::DeliveryTurnoverMin => "delivery_turnover >= min",
            Condition::AtwMin => "atw >= min",
            Condition::DeliveryPctTodayOverWeek => "delivery_pct today > 1W",
            Condition::DeliveryPctWeekOverMonth => "delivery_pct 1W > 1M",
            Condition::DeliveryPctMonthOverQuarter => "delivery_pct 1M > 3M",
            Condition::TurnoverTodayOverWeek => "delivery_turnover today > 1W",
            Condition::TurnoverWeekOverMonth => "delivery_turnover 1W > 1M",
            Condition::TurnoverMonthOverQuarter => "delivery_turnover 1M > 3M",
            Condition::AtwTodayOverWeek => "atw today > 1W",
            Condition::AtwWeekOverMonth => "atw 1W > 1M",
            Condition::AtwMonthOverQuarter => "atw 1M > 3M",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.number())
    }
}

/// # Summary
/// 十二个条件的逐项结果与总结果。
///
/// # Invariants
/// - `all_pass` 恒等于十二项的严格与。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionResult {
    flags: [bool; 12],
    all_pass: bool,
}

impl ConditionResult {
    /// 由按条件顺序排列的十二个结果构造。
    pub fn from_flags(flags: [bool; 12]) -> Self {
        Self {
            flags,
            all_pass: flags.iter().all(|f| *f),
        }
    }

    pub fn get(&self, condition: Condition) -> bool {
        self.flags[condition.index()]
    }

    pub fn flags(&self) -> [bool; 12] {
        self.flags
    }

    pub fn all_pass(&self) -> bool {
        self.all_pass
    }

    pub fn passed_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    /// 未通过的条件列表，按编号升序。
    pub fn failed(&self) -> Vec<Condition> {
        Condition::ALL
            .into_iter()
            .filter(|c| !self.get(*c))
            .collect()
    }
}

/// 附带条件结果的快照。
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenedSnapshot {
    pub snapshot: ProgressiveSnapshot,
    pub conditions: ConditionResult,
}

/// # Summary
/// 发布给看板/自选股协作方的唯一输出行。
///
/// # Invariants
/// - 列名与语义跨版本保持稳定，调整必须视为破坏性变更。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    #[serde(rename = "SYMBOL")]
    pub symbol: String,
    #[serde(rename = "EXCHANGE")]
    pub exchange: Exchange,
    #[serde(rename = "ISIN")]
    pub isin: Option<String>,
    #[serde(rename = "DATE")]
    pub date: NaiveDate,
    #[serde(rename = "CLOSE")]
    pub close: f64,
    #[serde(rename = "DELIV_PER")]
    pub deliv_per: f64,
    #[serde(rename = "DELIV_PER_1W")]
    pub deliv_per_1w: f64,
    #[serde(rename = "DELIV_PER_1M")]
    pub deliv_per_1m: f64,
    #[serde(rename = "DELIV_PER_3M")]
    pub deliv_per_3m: f64,
    #[serde(rename = "DELIVERY_TURNOVER")]
    pub delivery_turnover: f64,
    #[serde(rename = "DELIVERY_TURNOVER_1W")]
    pub delivery_turnover_1w: f64,
    #[serde(rename = "DELIVERY_TURNOVER_1M")]
    pub delivery_turnover_1m: f64,
    #[serde(rename = "DELIVERY_TURNOVER_3M")]
    pub delivery_turnover_3m: f64,
    #[serde(rename = "ATW")]
    pub atw: f64,
    #[serde(rename = "ATW_1W")]
    pub atw_1w: f64,
    #[serde(rename = "ATW_1M")]
    pub atw_1m: f64,
    #[serde(rename = "ATW_3M")]
    pub atw_3m: f64,
    #[serde(rename = "DELIVERY_DATA_PRESENT")]
    pub delivery_data_present: bool,
    #[serde(rename = "HISTORY_DAYS")]
    pub history_days: usize,
    #[serde(rename = "C1")]
    pub c1: bool,
    #[serde(rename = "C2")]
    pub c2: bool,
    #[serde(rename = "C3")]
    pub c3: bool,
    #[serde(rename = "C4")]
    pub c4: bool,
    #[serde(rename = "C5")]
    pub c5: bool,
    #[serde(rename = "C6")]
    pub c6: bool,
    #[serde(rename = "C7")]
    pub c7: bool,
    #[serde(rename = "C8")]
    pub c8: bool,
    #[serde(rename = "C9")]
    pub c9: bool,
    #[serde(rename = "C10")]
    pub c10: bool,
    #[serde(rename = "C11")]
    pub c11: bool,
    #[serde(rename = "C12")]
    pub c12: bool,
    #[serde(rename = "ALL_PASS")]
    pub all_pass: bool,
}

impl From<&ScreenedSnapshot> for SnapshotRow {
    fn from(screened: &ScreenedSnapshot) -> Self {
        let s = &screened.snapshot;
        let [c1, c2, c3, c4, c5, c6, c7, c8, c9, c10, c11, c12] = screened.conditions.flags();
        Self {
            symbol: s.symbol.clone(),
            exchange: s.exchange,
            isin: s.isin.clone(),
            date: s.as_of,
            close: s.close,
            deliv_per: s.delivery_pct.today,
            deliv_per_1w: s.delivery_pct.week,
            deliv_per_1m: s.delivery_pct.month,
            deliv_per_3m: s.delivery_pct.quarter,
            delivery_turnover: s.delivery_turnover.today,
            delivery_turnover_1w: s.delivery_turnover.week,
            delivery_turnover_1m: s.delivery_turnover.month,
            delivery_turnover_3m: s.delivery_turnover.quarter,
            atw: s.atw.today,
            atw_1w: s.atw.week,
            atw_1m: s.atw.month,
            atw_3m: s.atw.quarter,
            delivery_data_present: s.delivery_data_present,
            history_days: s.prior_days,
            c1,
            c2,
            c3,
            c4,
            c5,
            c6,
            c7,
            c8,
            c9,
            c10,
            c11,
            c12,
            all_pass: screened.conditions.all_pass(),
        }
    }
}

/// # Summary
/// 单个条件的通过计数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCount {
    pub condition: String,
    pub label: String,
    pub passed: usize,
    pub failed: usize,
}

/// # Summary
/// 某一范围内 (全部或单个交易所) 的逐条件通过率，用于定位瓶颈条件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConditionBreakdown {
    pub total: usize,
    pub all_pass: usize,
    pub conditions: Vec<ConditionCount>,
}

/// 全局与分交易所的通过率统计。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConditionStats {
    pub overall: ConditionBreakdown,
    pub by_exchange: BTreeMap<Exchange, ConditionBreakdown>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_numbering_is_fixed() {
        let numbers: Vec<usize> = Condition::ALL.iter().map(|c| c.number()).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
        assert_eq!(Condition::AtwMin.group(), 'A');
        assert_eq!(Condition::TurnoverWeekOverMonth.group(), 'C');
        assert_eq!(Condition::AtwMonthOverQuarter.to_string(), "C12");
    }

    #[test]
    fn test_all_pass_is_strict_and() {
        let mut flags = [true; 12];
        assert!(ConditionResult::from_flags(flags).all_pass());
        flags[2] = false;
        let result = ConditionResult::from_flags(flags);
        assert!(!result.all_pass());
        assert_eq!(result.passed_count(), 11);
        assert_eq!(result.failed(), vec![Condition::AtwMin]);
    }
}
