use spikescan_core::common::{Exchange, normalize_identifier};
use spikescan_core::config::UniverseConfig;
use spikescan_core::reconcile::entity::CanonicalDailyRecord;
use spikescan_core::reconcile::port::UniverseFilter;
use tracing::debug;

/// # Summary
/// 基于序列白名单与名称黑名单的可投资范围判定。
///
/// # Invariants
/// - 所有比较均不区分大小写 (构造时统一转为大写)。
/// - 交易所的合格序列列表为空时不做白名单过滤 (该交易所不报告股票序列)，
///   但黑名单序列仍然生效。
#[derive(Debug, Clone)]
pub struct DenylistUniverse {
    nse_series: Vec<String>,
    bse_series: Vec<String>,
    denied_series: Vec<String>,
    contains: Vec<String>,
    suffixes: Vec<String>,
    debt_issuers: Vec<String>,
    symbols: Vec<String>,
    isin_prefixes: Vec<String>,
}

fn upper_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| normalize_identifier(v))
        .filter(|v| !v.is_empty())
        .collect()
}

impl DenylistUniverse {
    pub fn from_config(config: &UniverseConfig) -> Self {
        Self {
            nse_series: upper_all(config.eligible_series(Exchange::Nse)),
            bse_series: upper_all(config.eligible_series(Exchange::Bse)),
            denied_series: upper_all(&config.denylist.series),
            contains: upper_all(&config.denylist.contains),
            suffixes: upper_all(&config.denylist.suffixes),
            debt_issuers: upper_all(&config.denylist.debt_issuers),
            symbols: upper_all(&config.denylist.symbols),
            isin_prefixes: upper_all(&config.denylist.isin_prefixes),
        }
    }

    fn eligible_series(&self, exchange: Exchange) -> &[String] {
        match exchange {
            Exchange::Nse => &self.nse_series,
            Exchange::Bse => &self.bse_series,
        }
    }
}

impl UniverseFilter for DenylistUniverse {
    fn exclusion_reason(&self, record: &CanonicalDailyRecord) -> Option<String> {
        let eligible = self.eligible_series(record.exchange);
        if !eligible.is_empty() {
            match record.series.as_deref() {
                Some(series) if eligible.iter().any(|s| s == series) => {}
                Some(series) => return Some(format!("series {} is not equity-eligible", series)),
                None => return Some("series missing".to_string()),
            }
        }
        if let Some(series) = record
            .series
            .as_deref()
            .filter(|s| self.denied_series.iter().any(|d| d == s))
        {
            return Some(format!("series {} is denylisted", series));
        }

        let symbol = normalize_identifier(&record.symbol);
        if self.symbols.contains(&symbol) {
            return Some(format!("symbol {} is denylisted", symbol));
        }
        if let Some(pattern) = self.contains.iter().find(|p| symbol.contains(p.as_str())) {
            return Some(format!("symbol contains {}", pattern));
        }
        if let Some(issuer) = self
            .debt_issuers
            .iter()
            .filter(|_| symbol.ends_with(|c: char| c.is_ascii_digit()))
            .find(|i| symbol.contains(i.as_str()))
        {
            return Some(format!("debt issue of {}", issuer));
        }
        if let Some(suffix) = self.suffixes.iter().find(|s| symbol.ends_with(s.as_str())) {
            return Some(format!("symbol ends with {}", suffix));
        }
        record
            .isin
            .as_deref()
            .and_then(|isin| self.isin_prefixes.iter().find(|p| isin.starts_with(p.as_str())))
            .map(|prefix| format!("isin starts with {}", prefix))
    }
}

/// # Summary
/// 对一批记录应用范围过滤。
///
/// # Returns
/// 合格记录 (保持原顺序) 与被排除的数量。
pub fn apply_universe(
    filter: &dyn UniverseFilter,
    records: Vec<CanonicalDailyRecord>,
) -> (Vec<CanonicalDailyRecord>, usize) {
    let before = records.len();
    let kept: Vec<CanonicalDailyRecord> = records
        .into_iter()
        .filter(|r| match filter.exclusion_reason(r) {
            Some(reason) => {
                debug!("Excluded {} {} on {}: {}", r.exchange, r.symbol, r.date, reason);
                false
            }
            None => true,
        })
        .collect();
    let excluded = before - kept.len();
    (kept, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spikescan_core::common::{InstrumentKey, JoinKeyKind};

    fn record(exchange: Exchange, symbol: &str, series: Option<&str>, isin: Option<&str>) -> CanonicalDailyRecord {
        CanonicalDailyRecord {
            key: InstrumentKey::new(JoinKeyKind::Symbol, symbol),
            symbol: symbol.to_string(),
            isin: isin.map(str::to_string),
            code: None,
            exchange,
            date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            series: series.map(str::to_string),
            close: 10.0,
            total_traded_quantity: 10.0,
            total_traded_value: 100.0,
            delivered_quantity: 5.0,
            delivery_percentage: 50.0,
            delivery_data_present: true,
        }
    }

    #[test]
    fn test_series_filter_only_where_series_reported() {
        let universe = DenylistUniverse::from_config(&UniverseConfig::default());
        assert!(universe.is_eligible(&record(Exchange::Nse, "ABC", Some("EQ"), None)));
        assert!(!universe.is_eligible(&record(Exchange::Nse, "ABC", Some("N1"), None)));
        assert!(!universe.is_eligible(&record(Exchange::Nse, "ABC", None, None)));
        assert!(universe.is_eligible(&record(Exchange::Bse, "ABC", Some("A"), None)));
    }

    #[test]
    fn test_denylist_patterns() {
        let mut config = UniverseConfig::default();
        config.denylist.symbols.push("sgbfeb32".to_string());
        let universe = DenylistUniverse::from_config(&config);

        assert!(!universe.is_eligible(&record(Exchange::Nse, "NIFTYBEES", Some("EQ"), None)));
        assert!(!universe.is_eligible(&record(Exchange::Nse, "ABC-RE", Some("EQ"), None)));
        assert!(!universe.is_eligible(&record(Exchange::Bse, "SGBFEB32", None, None)));
        assert!(!universe.is_eligible(&record(
            Exchange::Bse,
            "GS2033",
            None,
            Some("IN0020230010")
        )));
    }

    #[test]
    fn test_bond_and_ncd_listings_are_excluded() {
        let universe = DenylistUniverse::from_config(&UniverseConfig::default());

        // 发行人标记加数字结尾是债券，发行人自身的股票照常保留
        assert!(!universe.is_eligible(&record(Exchange::Bse, "PGCIL30", None, None)));
        assert!(!universe.is_eligible(&record(Exchange::Bse, "HUDCO2031", None, None)));
        assert!(universe.is_eligible(&record(Exchange::Bse, "HUDCO", Some("A"), None)));
        assert!(universe.is_eligible(&record(Exchange::Nse, "HDFCBANK", Some("EQ"), None)));

        // 到期年份后缀与债券板块
        assert!(!universe.is_eligible(&record(Exchange::Bse, "EFSL9NCD28", None, None)));
        assert!(!universe.is_eligible(&record(Exchange::Bse, "XYZ", Some("F"), None)));
        assert!(!universe.is_eligible(&record(Exchange::Bse, "XYZ", Some("G"), None)));
        assert!(universe.is_eligible(&record(Exchange::Bse, "XYZ", Some("B"), None)));
    }

    #[test]
    fn test_apply_universe_counts_exclusions() {
        let universe = DenylistUniverse::from_config(&UniverseConfig::default());
        let (kept, excluded) = apply_universe(
            &universe,
            vec![
                record(Exchange::Nse, "ABC", Some("EQ"), None),
                record(Exchange::Nse, "LIQUIDBEES", Some("EQ"), None),
            ],
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(excluded, 1);
    }
}
