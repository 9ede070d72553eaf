use rayon::prelude::*;
use spikescan_core::config::WindowConfig;
use spikescan_core::quality::entity::InsufficientHistoryNotice;
use spikescan_core::reconcile::entity::{CanonicalDailyRecord, InstrumentHistory};
use spikescan_core::screen::entity::{MetricWindows, ProgressiveSnapshot};
use tracing::debug;

/// # Summary
/// 对最近 `window` 条历史记录 (倒序取) 求均值。
///
/// # Logic
/// 1. 历史不足窗口时对现有记录求均值。
/// 2. 没有任何历史 (或窗口为 0) 时返回当日值。
fn trailing_mean(
    prior: &[CanonicalDailyRecord],
    window: usize,
    today: f64,
    metric: fn(&CanonicalDailyRecord) -> f64,
) -> f64 {
    let mut sum = 0.0;
    let mut count = 0.0;
    for record in prior.iter().rev().take(window) {
        sum += metric(record);
        count += 1.0;
    }
    if count > 0.0 { sum / count } else { today }
}

/// 单个证券的聚合结果。
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentAggregate {
    pub snapshot: ProgressiveSnapshot,
    pub notice: Option<InsufficientHistoryNotice>,
}

/// 全部证券的聚合结果，按输入顺序排列。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    pub snapshots: Vec<ProgressiveSnapshot>,
    pub notices: Vec<InsufficientHistoryNotice>,
}

/// # Summary
/// 渐进聚合器：为每个证券生成 "今日 vs 1W vs 1M vs 3M" 特征向量。
///
/// # Invariants
/// - 每个证券使用自己的最近交易日作为基准日。
/// - 窗口只包含严格早于基准日的交易日，基准日本身不参与均值。
#[derive(Debug, Clone, Copy)]
pub struct ProgressiveAggregator {
    windows: WindowConfig,
}

impl ProgressiveAggregator {
    pub fn new(windows: WindowConfig) -> Self {
        Self { windows }
    }

    /// 最长窗口的交易日数，用于判断历史是否充足。
    pub fn required_days(&self) -> usize {
        self.windows
            .week
            .max(self.windows.month)
            .max(self.windows.quarter)
    }

    fn windows_for(
        &self,
        latest: &CanonicalDailyRecord,
        prior: &[CanonicalDailyRecord],
        metric: fn(&CanonicalDailyRecord) -> f64,
    ) -> MetricWindows {
        let today = metric(latest);
        MetricWindows {
            today,
            week: trailing_mean(prior, self.windows.week, today, metric),
            month: trailing_mean(prior, self.windows.month, today, metric),
            quarter: trailing_mean(prior, self.windows.quarter, today, metric),
        }
    }

    /// # Summary
    /// 计算单个证券的渐进快照。
    ///
    /// # Logic
    /// 1. 以历史中最近一条记录为基准日。
    /// 2. 取严格早于基准日的记录，分别计算三个指标的三个窗口均值。
    /// 3. 历史短于最长窗口时附带 `InsufficientHistoryNotice`。
    ///
    /// # Returns
    /// 历史为空时返回 None。
    pub fn snapshot(&self, history: &InstrumentHistory) -> Option<InstrumentAggregate> {
        let latest = history.latest()?;
        let prior = history.prior_to(latest.date);

        let snapshot = ProgressiveSnapshot {
            key: history.key().clone(),
            symbol: latest.symbol.clone(),
            isin: latest.isin.clone(),
            exchange: latest.exchange,
            as_of: latest.date,
            close: latest.close,
            delivery_data_present: latest.delivery_data_present,
            prior_days: prior.len(),
            delivery_pct: self.windows_for(latest, prior, |r| r.delivery_percentage),
            delivery_turnover: self.windows_for(latest, prior, CanonicalDailyRecord::delivery_turnover),
            atw: self.windows_for(latest, prior, CanonicalDailyRecord::average_traded_worth),
        };

        let required = self.required_days();
        let notice = (prior.len() < required).then(|| InsufficientHistoryNotice {
            symbol: latest.symbol.clone(),
            exchange: latest.exchange,
            as_of: latest.date,
            available: prior.len(),
            required,
        });

        Some(InstrumentAggregate { snapshot, notice })
    }

    /// # Summary
    /// 并行计算全部证券的快照。
    ///
    /// # Logic
    /// 使用 rayon 按证券并行；`collect` 保持输入顺序，因此结果与线程调度无关。
    pub fn aggregate_all(&self, histories: &[InstrumentHistory]) -> Aggregation {
        let aggregates: Vec<InstrumentAggregate> = histories
            .par_iter()
            .filter_map(|h| self.snapshot(h))
            .collect();

        let mut result = Aggregation::default();
        for aggregate in aggregates {
            if let Some(notice) = aggregate.notice {
                result.notices.push(notice);
            }
            result.snapshots.push(aggregate.snapshot);
        }
        debug!(
            "Aggregated {} instruments, {} with short history",
            result.snapshots.len(),
            result.notices.len()
        );
        result
    }
}
