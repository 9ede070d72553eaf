//! 行情与交割合并、跨交易所去重、可投资范围过滤与数据质量检查。

pub mod identity;
pub mod merger;
pub mod quality;
pub mod universe;
