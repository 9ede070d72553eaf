//! 渐进窗口聚合、十二条件评估与条件通过率统计。

pub mod aggregator;
pub mod condition;
pub mod stats;
