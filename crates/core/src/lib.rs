//! 交割量渐进放量筛选系统的核心领域层。
//!
//! 只包含实体、错误与端口 (Trait) 定义，不依赖任何具体实现。

pub mod common;
pub mod config;
pub mod ingest;
pub mod quality;
pub mod reconcile;
pub mod screen;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testing;
