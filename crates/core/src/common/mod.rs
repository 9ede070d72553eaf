use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// # Summary
/// 交易所枚举，决定原始文件的版式与跨交易所去重时的优先级。
///
/// # Invariants
/// - 枚举声明顺序即优先级顺序，`Nse` 为主交易所，排序时必须排在 `Bse` 之前。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    // 主交易所
    Nse,
    // 次交易所
    Bse,
}

impl Exchange {
    /// 全部交易所，按优先级排列。
    pub const ALL: [Exchange; 2] = [Exchange::Nse, Exchange::Bse];

    /// # Summary
    /// 返回去重优先级，数值越小越优先。
    pub fn priority(self) -> u8 {
        match self {
            Exchange::Nse => 0,
            Exchange::Bse => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
        }
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nse" => Ok(Exchange::Nse),
            "bse" => Ok(Exchange::Bse),
            _ => Err(format!("Unknown Exchange: {}", s)),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Summary
/// 原始文件类别：行情 (bhavcopy) 或交割报告。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Bhav,
    Delivery,
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bhav" | "bhavcopy" => Ok(FileKind::Bhav),
            "delivery" | "deliv" => Ok(FileKind::Delivery),
            _ => Err(format!("Unknown FileKind: {}", s)),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Bhav => write!(f, "bhav"),
            FileKind::Delivery => write!(f, "delivery"),
        }
    }
}

/// # Summary
/// 关联键类别，同时作为身份解析的置信度标签。
///
/// # Invariants
/// - 声明顺序即优先级：ISIN > 交易所数字代码 > 代码字符串。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum JoinKeyKind {
    Isin,
    Code,
    Symbol,
}

impl JoinKeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKeyKind::Isin => "isin",
            JoinKeyKind::Code => "code",
            JoinKeyKind::Symbol => "symbol",
        }
    }
}

impl fmt::Display for JoinKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Summary
/// 跨交易所的证券身份键，一个经济意义上的证券对应唯一的键。
///
/// # Invariants
/// - `value` 已经过规范化 (去除首尾空白并转为大写)。
/// - 文本形式 `"{kind}:{value}"` 可无损解析回结构体。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentKey {
    // 键的来源类别
    pub kind: JoinKeyKind,
    // 规范化后的键值
    pub value: String,
}

impl InstrumentKey {
    pub fn new(kind: JoinKeyKind, value: &str) -> Self {
        Self {
            kind,
            value: normalize_identifier(value),
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

impl FromStr for InstrumentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("Malformed InstrumentKey: {}", s))?;
        let kind = match kind {
            "isin" => JoinKeyKind::Isin,
            "code" => JoinKeyKind::Code,
            "symbol" => JoinKeyKind::Symbol,
            _ => return Err(format!("Unknown InstrumentKey kind: {}", kind)),
        };
        Ok(Self::new(kind, value))
    }
}

/// # Summary
/// 规范化证券标识 (代码、ISIN、数字代码)：去除首尾空白并转为大写。
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// # Summary
/// 将可选标识规范化，空串视为缺失。
pub fn non_empty_identifier(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_identifier).filter(|s| !s.is_empty())
}
