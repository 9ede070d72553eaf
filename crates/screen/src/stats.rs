use spikescan_core::screen::entity::{
    Condition, ConditionBreakdown, ConditionCount, ConditionStats, ScreenedSnapshot,
};
use std::collections::{BTreeMap, BTreeSet};

fn breakdown<'a>(screened: impl Iterator<Item = &'a ScreenedSnapshot>) -> ConditionBreakdown {
    let mut total = 0;
    let mut all_pass = 0;
    let mut passed = [0usize; 12];
    for s in screened {
        total += 1;
        if s.conditions.all_pass() {
            all_pass += 1;
        }
        for (slot, flag) in passed.iter_mut().zip(s.conditions.flags()) {
            if flag {
                *slot += 1;
            }
        }
    }

    let conditions = Condition::ALL
        .into_iter()
        .zip(passed)
        .map(|(condition, passed)| ConditionCount {
            condition: condition.to_string(),
            label: condition.label().to_string(),
            passed,
            failed: total - passed,
        })
        .collect();

    ConditionBreakdown {
        total,
        all_pass,
        conditions,
    }
}

/// # Summary
/// 统计每个条件的通过/未通过数量，整体及按交易所分别统计。
///
/// # Logic
/// 用于回答 "为什么没有任何信号"：找出通过数最少的瓶颈条件。
pub fn condition_stats(screened: &[ScreenedSnapshot]) -> ConditionStats {
    let mut by_exchange = BTreeMap::new();
    for exchange in screened
        .iter()
        .map(|s| s.snapshot.exchange)
        .collect::<BTreeSet<_>>()
    {
        by_exchange.insert(
            exchange,
            breakdown(screened.iter().filter(|s| s.snapshot.exchange == exchange)),
        );
    }

    ConditionStats {
        overall: breakdown(screened.iter()),
        by_exchange,
    }
}

/// 通过数最少的条件 (同数取编号较小者)；没有快照时返回 None。
pub fn bottleneck(stats: &ConditionStats) -> Option<&ConditionCount> {
    if stats.overall.total == 0 {
        return None;
    }
    stats
        .overall
        .conditions
        .iter()
        .reduce(|best, c| if c.passed < best.passed { c } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spikescan_core::common::{Exchange, InstrumentKey, JoinKeyKind};
    use spikescan_core::screen::entity::{ConditionResult, MetricWindows, ProgressiveSnapshot};

    fn screened(exchange: Exchange, flags: [bool; 12]) -> ScreenedSnapshot {
        ScreenedSnapshot {
            snapshot: ProgressiveSnapshot {
                key: InstrumentKey::new(JoinKeyKind::Symbol, "ABC"),
                symbol: "ABC".to_string(),
                isin: None,
                exchange,
                as_of: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                close: 1.0,
                delivery_data_present: true,
                prior_days: 0,
                delivery_pct: MetricWindows::flat(0.0),
                delivery_turnover: MetricWindows::flat(0.0),
                atw: MetricWindows::flat(0.0),
            },
            conditions: ConditionResult::from_flags(flags),
        }
    }

    #[test]
    fn test_stats_split_by_exchange() {
        let mut partial = [true; 12];
        partial[2] = false;
        let rows = vec![
            screened(Exchange::Nse, [true; 12]),
            screened(Exchange::Nse, partial),
            screened(Exchange::Bse, partial),
        ];

        let stats = condition_stats(&rows);
        assert_eq!(stats.overall.total, 3);
        assert_eq!(stats.overall.all_pass, 1);
        assert_eq!(stats.overall.conditions[2].condition, "C3");
        assert_eq!(stats.overall.conditions[2].passed, 1);
        assert_eq!(stats.overall.conditions[2].failed, 2);
        assert_eq!(stats.by_exchange[&Exchange::Nse].total, 2);
        assert_eq!(stats.by_exchange[&Exchange::Bse].all_pass, 0);
        assert_eq!(bottleneck(&stats).map(|c| c.condition.as_str()), Some("C3"));
    }

    #[test]
    fn test_empty_input_has_no_bottleneck() {
        let stats = condition_stats(&[]);
        assert_eq!(stats.overall.conditions.len(), 12);
        assert!(bottleneck(&stats).is_none());
    }
}
