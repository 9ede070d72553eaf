use csv::{ReaderBuilder, Trim};
use spikescan_core::ingest::error::IngestError;

/// # Summary
/// 未经解释的表格：规范化前的表头与单元格文本。
///
/// # Invariants
/// - 表头已去除首尾空白与 UTF-8 BOM，但保留原始大小写。
/// - 完全空白的行已被丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// 读取指定单元格，越界视为空。
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// # Summary
/// 根据首个非空行推断分隔符。
///
/// # Logic
/// 竖线多于逗号时视为竖线分隔 (BSE 交割报告)，否则为逗号分隔。
pub fn detect_delimiter(contents: &str) -> u8 {
    let first = contents
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");
    let pipes = first.matches('|').count();
    let commas = first.matches(',').count();
    if pipes > commas { b'|' } else { b',' }
}

/// 去除表头首尾空白与 BOM。
pub fn clean_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_string()
}

/// # Summary
/// 将表格文本解析为 `RawTable`。
///
/// # Logic
/// 1. 推断分隔符。
/// 2. 以宽松模式读取 (允许行长度不一致)，并修剪所有字段的空白。
/// 3. 丢弃完全空白的行。
///
/// # Arguments
/// * `file`: 文件名，仅用于错误信息。
/// * `contents`: 表格原文。
///
/// # Returns
/// 成功返回表格；没有表头时返回 `IngestError::Empty`。
pub fn parse_table(file: &str, contents: &str) -> Result<RawTable, IngestError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(contents))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Parse {
            file: file.to_string(),
            message: e.to_string(),
        })?
        .iter()
        .map(clean_header)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::Empty(file.to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IngestError::Parse {
            file: file.to_string(),
            message: e.to_string(),
        })?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}
