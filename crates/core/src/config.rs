use crate::common::Exchange;
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub screen: ScreenConfig,
    pub windows: WindowConfig,
    pub quality: QualityConfig,
    pub universe: UniverseConfig,
}

/// 文件位置配置，所有路径均可为相对路径。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub nse_raw_dir: String,
    pub bse_raw_dir: String,
    pub store_dir: String,
    pub output_file: String,
    pub report_file: String,
    pub logs_dir: String,
}

impl DataConfig {
    /// 返回指定交易所的原始文件根目录。
    pub fn raw_dir(&self, exchange: Exchange) -> &str {
        match exchange {
            Exchange::Nse => &self.nse_raw_dir,
            Exchange::Bse => &self.bse_raw_dir,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            nse_raw_dir: "data/nse_raw".to_string(),
            bse_raw_dir: "data/bse_raw".to_string(),
            store_dir: "data".to_string(),
            output_file: "data/combined_dashboard_live.csv".to_string(),
            report_file: "data/quality_report.json".to_string(),
            logs_dir: "logs".to_string(),
        }
    }
}

/// # Summary
/// 十二条件中绝对阈值部分 (C1-C3) 的参数。
///
/// # Invariants
/// - 所有阈值均为闭区间下界 (`>=`)。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    // C1: 交割百分比下限
    pub delivery_pct_min: f64,
    // C2: 交割成交额下限 (货币单位)
    pub delivery_turnover_min: f64,
    // C3: 平均成交额 (ATW) 下限
    pub atw_min: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            delivery_pct_min: 50.0,
            delivery_turnover_min: 5_000_000.0,
            atw_min: 20_000.0,
        }
    }
}

/// # Summary
/// 滚动窗口长度，单位为交易日 (即历史中实际存在的记录条数，而非自然日)。
///
/// # Invariants
/// - 三个窗口长度均应大于零。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowConfig {
    pub week: usize,
    pub month: usize,
    pub quarter: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            week: 5,
            month: 22,
            quarter: 66,
        }
    }
}

/// 数据质量校验的容差参数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    // 申报交割百分比与 交割量/成交量 推算值之间允许的偏差 (百分点)
    pub delivery_pct_tolerance: f64,
    // 相邻两个交易日之间交割成交额或 ATW 的最大合理倍数
    pub jump_multiple: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            delivery_pct_tolerance: 1.0,
            jump_multiple: 10.0,
        }
    }
}

/// # Summary
/// 可投资范围配置：序列过滤与非股票品种的黑名单。
///
/// # Invariants
/// - 某交易所的合格序列列表为空表示该交易所不做序列过滤。
/// - 所有黑名单匹配均忽略大小写。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UniverseConfig {
    pub nse_eligible_series: Vec<String>,
    pub bse_eligible_series: Vec<String>,
    pub denylist: DenylistConfig,
}

impl UniverseConfig {
    pub fn eligible_series(&self, exchange: Exchange) -> &[String] {
        match exchange {
            Exchange::Nse => &self.nse_eligible_series,
            Exchange::Bse => &self.bse_eligible_series,
        }
    }
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            nse_eligible_series: vec!["EQ".to_string()],
            bse_eligible_series: Vec::new(),
            denylist: DenylistConfig::default(),
        }
    }
}

/// 非股票品种黑名单 (ETF、指数跟踪、国债、债券/NCD)。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DenylistConfig {
    // 任一交易所上直接排除的序列/板块 (如 BSE 债券 F 组、政府证券 G 组)
    pub series: Vec<String>,
    // 代码中包含即排除的子串
    pub contains: Vec<String>,
    // 代码以此结尾即排除 (含债券/NCD 的到期年份后缀)
    pub suffixes: Vec<String>,
    // 债券/NCD 发行人标记：代码包含标记且以数字结尾时排除，发行人自身的股票不受影响
    pub debt_issuers: Vec<String>,
    // 精确匹配排除的代码
    pub symbols: Vec<String>,
    // ISIN 前缀排除 (如国债 IN00)
    pub isin_prefixes: Vec<String>,
}

impl Default for DenylistConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            series: owned(&["F", "G"]),
            contains: owned(&[
                "ETF", "LIQUID", "FUND", "INDEX", "NIFTY", "SENSEX", "GLOBE", "BEES",
            ]),
            suffixes: owned(&["-RE", "26", "27", "28", "29"]),
            debt_issuers: owned(&["IHFCL", "HUDCO", "PGCIL", "HDFCB", "BHFL"]),
            symbols: Vec::new(),
            isin_prefixes: owned(&["IN00"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.screen.delivery_pct_min, 50.0);
        assert_eq!(config.screen.delivery_turnover_min, 5_000_000.0);
        assert_eq!(config.screen.atw_min, 20_000.0);
        assert_eq!(config.windows, WindowConfig { week: 5, month: 22, quarter: 66 });
        assert_eq!(config.data.raw_dir(Exchange::Bse), "data/bse_raw");
        assert_eq!(config.universe.eligible_series(Exchange::Nse), ["EQ".to_string()]);
        assert!(config.universe.eligible_series(Exchange::Bse).is_empty());
    }
}
