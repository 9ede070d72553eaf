//! 规范记录的 SQLite 持久化与输出文件的原子发布。

pub mod config;
pub mod history;
pub mod publisher;
