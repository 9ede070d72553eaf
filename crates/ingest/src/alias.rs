//! 版式修订表：每个交易所、每类文件的已知表头别名，按时间从新到旧排列。

use CanonicalColumn::*;
use spikescan_core::common::{Exchange, FileKind};
use std::collections::HashMap;

/// # Summary
/// 下游使用的规范列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalColumn {
    Symbol,
    Code,
    Isin,
    Series,
    Date,
    Close,
    TotalTradedQuantity,
    TotalTradedValue,
    DeliveredQuantity,
    DeliveryPercentage,
    TradedQuantity,
}

impl CanonicalColumn {
    pub fn name(self) -> &'static str {
        match self {
            CanonicalColumn::Symbol => "symbol",
            CanonicalColumn::Code => "code",
            CanonicalColumn::Isin => "isin",
            CanonicalColumn::Series => "series",
            CanonicalColumn::Date => "date",
            CanonicalColumn::Close => "close",
            CanonicalColumn::TotalTradedQuantity => "total_traded_quantity",
            CanonicalColumn::TotalTradedValue => "total_traded_value",
            CanonicalColumn::DeliveredQuantity => "delivered_quantity",
            CanonicalColumn::DeliveryPercentage => "delivery_percentage",
            CanonicalColumn::TradedQuantity => "traded_quantity",
        }
    }
}

/// 单个规范列的别名定义。
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column: CanonicalColumn,
    // 按优先级排列的原始表头
    pub aliases: &'static [&'static str],
    pub required: bool,
}

const fn req(column: CanonicalColumn, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        column,
        aliases,
        required: true,
    }
}

const fn opt(column: CanonicalColumn, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        column,
        aliases,
        required: false,
    }
}

/// # Summary
/// 一个已知的文件版式修订。
///
/// # Invariants
/// - 每个修订至少有一个必需的标识列。
#[derive(Debug, Clone, Copy)]
pub struct SchemaRevision {
    pub name: &'static str,
    pub exchange: Exchange,
    pub kind: FileKind,
    pub columns: &'static [ColumnSpec],
}

pub static REVISIONS: &[SchemaRevision] = &[
    // 2024 年起的统一格式 (UDiFF)
    SchemaRevision {
        name: "nse-cm-udiff-2024",
        exchange: Exchange::Nse,
        kind: FileKind::Bhav,
        columns: &[
            req(Symbol, &["TckrSymb"]),
            req(Close, &["ClsPric"]),
            req(TotalTradedQuantity, &["TtlTradgVol"]),
            req(TotalTradedValue, &["TtlTrfVal"]),
            opt(Series, &["SctySrs"]),
            opt(Isin, &["ISIN"]),
            opt(Code, &["FinInstrmId"]),
            opt(Date, &["TradDt", "BizDt"]),
        ],
    },
    // 旧版 cm bhavcopy，以及改名成旧列名的 UDiFF 文件
    SchemaRevision {
        name: "nse-cm-legacy",
        exchange: Exchange::Nse,
        kind: FileKind::Bhav,
        columns: &[
            req(Symbol, &["SYMBOL"]),
            req(Close, &["CLOSE", "CLOSE_PRICE"]),
            req(TotalTradedQuantity, &["TOTTRDQTY", "TTL_TRD_QNTY"]),
            req(TotalTradedValue, &["TOTTRDVAL"]),
            opt(Series, &["SERIES", "SctySrs"]),
            opt(Isin, &["ISIN"]),
            opt(Code, &["FinInstrmId"]),
            opt(Date, &["TIMESTAMP", "DATE", "DATE1", "TradDt"]),
        ],
    },
    SchemaRevision {
        name: "nse-sec-bhavdata-full",
        exchange: Exchange::Nse,
        kind: FileKind::Delivery,
        columns: &[
            req(Symbol, &["SYMBOL"]),
            req(DeliveredQuantity, &["DELIV_QTY", "DELIV"]),
            opt(DeliveryPercentage, &["DELIV_PER"]),
            opt(TradedQuantity, &["TTL_TRD_QNTY"]),
            opt(Series, &["SERIES"]),
            opt(Isin, &["ISIN"]),
            opt(Date, &["DATE1", "DATE"]),
        ],
    },
    // MTO 证券级交割报告
    SchemaRevision {
        name: "nse-mto",
        exchange: Exchange::Nse,
        kind: FileKind::Delivery,
        columns: &[
            req(Symbol, &["Name of Security"]),
            req(
                DeliveredQuantity,
                &["Deliverable Quantity(gross across client level)", "Deliverable Quantity"],
            ),
            opt(
                DeliveryPercentage,
                &["% of Deliverable Quantity to Traded Quantity"],
            ),
            opt(TradedQuantity, &["Quantity Traded"]),
            opt(Series, &["Series"]),
        ],
    },
    SchemaRevision {
        name: "bse-cm-udiff-2024",
        exchange: Exchange::Bse,
        kind: FileKind::Bhav,
        columns: &[
            req(Symbol, &["TckrSymb"]),
            req(Close, &["ClsPric"]),
            req(TotalTradedQuantity, &["TtlTradgVol"]),
            req(TotalTradedValue, &["TtlTrfVal"]),
            opt(Code, &["FinInstrmId"]),
            opt(Isin, &["ISIN"]),
            opt(Series, &["SctySrs"]),
            opt(Date, &["TradDt", "BizDt"]),
        ],
    },
    SchemaRevision {
        name: "bse-cm-renamed",
        exchange: Exchange::Bse,
        kind: FileKind::Bhav,
        columns: &[
            req(Symbol, &["SYMBOL"]),
            req(Close, &["CLOSE"]),
            req(TotalTradedQuantity, &["TOTTRDQTY"]),
            req(TotalTradedValue, &["TOTTRDVAL"]),
            opt(Code, &["SC_CODE", "FinInstrmId"]),
            opt(Isin, &["ISIN", "ISIN_CODE"]),
            opt(Series, &["SERIES", "SctySrs"]),
            opt(Date, &["DATE", "TradDt", "BizDt"]),
        ],
    },
    // EQ_ISINCODE 旧格式
    SchemaRevision {
        name: "bse-eq-legacy",
        exchange: Exchange::Bse,
        kind: FileKind::Bhav,
        columns: &[
            req(Symbol, &["SC_NAME"]),
            req(Close, &["CLOSE"]),
            req(TotalTradedQuantity, &["NO_OF_SHRS"]),
            req(TotalTradedValue, &["NET_TURNOV"]),
            opt(Code, &["SC_CODE"]),
            opt(Isin, &["ISIN_CODE"]),
            opt(Series, &["SC_GROUP"]),
            opt(Date, &["TRADING_DATE"]),
        ],
    },
    // SCBSEALL 竖线分隔原文
    SchemaRevision {
        name: "bse-scbseall",
        exchange: Exchange::Bse,
        kind: FileKind::Delivery,
        columns: &[
            req(Code, &["SCRIP CODE"]),
            req(DeliveredQuantity, &["DELIVERY QTY"]),
            opt(DeliveryPercentage, &["DELV. PER.", "DELV. PER"]),
            opt(TradedQuantity, &["DAY'S VOLUME"]),
            opt(Date, &["DATE"]),
        ],
    },
    // BSE 交割报告只有数字代码，早期处理脚本把它写进了 SYMBOL 列
    SchemaRevision {
        name: "bse-delivery-processed",
        exchange: Exchange::Bse,
        kind: FileKind::Delivery,
        columns: &[
            req(Code, &["SC_CODE", "SYMBOL"]),
            req(DeliveredQuantity, &["DELIV_QTY"]),
            opt(DeliveryPercentage, &["DELIV_PER"]),
            opt(TradedQuantity, &["TTL_TRD_QNTY", "DAY'S VOLUME"]),
            opt(Date, &["DATE"]),
        ],
    },
];

/// 指定交易所与文件类别的全部修订，从新到旧。
pub fn revisions_for(
    exchange: Exchange,
    kind: FileKind,
) -> impl Iterator<Item = &'static SchemaRevision> {
    REVISIONS
        .iter()
        .filter(move |r| r.exchange == exchange && r.kind == kind)
}

/// 表头匹配键：去除 BOM 与首尾空白，忽略大小写。
pub fn header_key(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_uppercase()
}

/// 某个修订在具体表头上的列位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub revision: &'static str,
    positions: HashMap<CanonicalColumn, usize>,
}

impl ResolvedColumns {
    pub fn position(&self, column: CanonicalColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn has(&self, column: CanonicalColumn) -> bool {
        self.positions.contains_key(&column)
    }
}

/// 修订与表头不匹配时的诊断。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionMiss {
    // 已找到的必需列数量
    pub matched: usize,
    pub first_missing: CanonicalColumn,
}

/// # Summary
/// 在给定表头上解析一个修订的全部列。
///
/// # Logic
/// 1. 表头按 `header_key` 建立索引，重复表头取第一次出现的位置。
/// 2. 每个规范列按别名顺序取第一个命中的表头。
/// 3. 任一必需列缺失即返回 `RevisionMiss`。
pub fn resolve(
    revision: &'static SchemaRevision,
    headers: &[String],
) -> Result<ResolvedColumns, RevisionMiss> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (pos, header) in headers.iter().enumerate() {
        index.entry(header_key(header)).or_insert(pos);
    }

    let mut positions = HashMap::new();
    let mut matched = 0;
    let mut first_missing = None;
    for spec in revision.columns {
        let found = spec
            .aliases
            .iter()
            .find_map(|alias| index.get(&header_key(alias)).copied());
        match found {
            Some(pos) => {
                positions.insert(spec.column, pos);
                if spec.required {
                    matched += 1;
                }
            }
            None if spec.required && first_missing.is_none() => {
                first_missing = Some(spec.column);
            }
            None => {}
        }
    }

    match first_missing {
        Some(column) => Err(RevisionMiss {
            matched,
            first_missing: column,
        }),
        None => Ok(ResolvedColumns {
            revision: revision.name,
            positions,
        }),
    }
}
