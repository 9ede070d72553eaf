//! 批处理应用服务：把抓取、规范化、合并、存储、聚合、筛选与发布串成一次完整运行。

pub mod batch;
pub mod error;
