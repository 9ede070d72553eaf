use spikescan_core::config::ScreenConfig;
use spikescan_core::screen::entity::{
    ConditionResult, MetricWindows, ProgressiveSnapshot, ScreenedSnapshot,
};

/// 严格递减：今日 > 1W，1W > 1M，1M > 3M。
fn progressive(w: &MetricWindows) -> [bool; 3] {
    [w.today > w.week, w.week > w.month, w.month > w.quarter]
}

/// # Summary
/// 十二条件评估器，阈值来自配置。
///
/// # Invariants
/// - 十二个条件总是全部计算，便于诊断。
/// - 阈值条件用 `>=`，渐进条件用严格 `>`，相等即不通过。
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator {
    config: ScreenConfig,
}

impl ConditionEvaluator {
    pub fn new(config: ScreenConfig) -> Self {
        Self { config }
    }

    /// # Summary
    /// 按固定顺序评估十二个条件。
    ///
    /// # Logic
    /// 1. A 组：当日交割百分比、交割成交额、ATW 分别不低于阈值。
    /// 2. B/C/D 组：三个指标各自的窗口值严格递减。
    /// 3. `all_pass` 为十二项的严格与。
    pub fn evaluate(&self, snapshot: &ProgressiveSnapshot) -> ConditionResult {
        let [b1, b2, b3] = progressive(&snapshot.delivery_pct);
        let [c1, c2, c3] = progressive(&snapshot.delivery_turnover);
        let [d1, d2, d3] = progressive(&snapshot.atw);
        ConditionResult::from_flags([
            snapshot.delivery_pct.today >= self.config.delivery_pct_min,
            snapshot.delivery_turnover.today >= self.config.delivery_turnover_min,
            snapshot.atw.today >= self.config.atw_min,
            b1,
            b2,
            b3,
            c1,
            c2,
            c3,
            d1,
            d2,
            d3,
        ])
    }

    pub fn screen(&self, snapshot: ProgressiveSnapshot) -> ScreenedSnapshot {
        let conditions = self.evaluate(&snapshot);
        ScreenedSnapshot {
            snapshot,
            conditions,
        }
    }
}
