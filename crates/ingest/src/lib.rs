//! 原始文件的读取与版式规范化。

pub mod alias;
pub mod local;
pub mod normalizer;
pub mod reader;
