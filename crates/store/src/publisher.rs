use async_trait::async_trait;
use spikescan_core::quality::entity::RunReport;
use spikescan_core::screen::entity::SnapshotRow;
use spikescan_core::store::error::StoreError;
use spikescan_core::store::port::SnapshotPublisher;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// # Summary
/// 将输出行编码为 CSV 文本。
///
/// # Invariants
/// - 列顺序与 `SnapshotRow` 字段声明顺序一致。
pub fn encode_rows(rows: &[SnapshotRow]) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::Encode(e.to_string()))
}

/// 将质量报告编码为缩进的 JSON。
pub fn encode_report(report: &RunReport) -> Result<Vec<u8>, StoreError> {
    let mut bytes =
        serde_json::to_vec_pretty(report).map_err(|e| StoreError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// # Summary
/// 原子写入文件：先写同目录的临时文件，再重命名到目标路径。
///
/// # Logic
/// 1. 确保父目录存在。
/// 2. 在父目录中创建临时文件并写入全部内容。
/// 3. `persist` 原子替换目标文件；失败时临时文件被自动删除，旧文件保持不变。
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| StoreError::Io(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| StoreError::Io(e.to_string()))?;
    tmp.write_all(bytes)
        .map_err(|e| StoreError::Io(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::Io(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

/// SnapshotPublisher 的文件实现。
///
/// # Summary
/// 输出表写为 CSV，质量报告写为 JSON，两者都以原子替换的方式发布。
///
/// # Invariants
/// * 报告先于输出表发布：读取者看到新输出表时，对应的报告一定已就位。
#[derive(Debug, Clone)]
pub struct CsvSnapshotPublisher {
    output_file: PathBuf,
    report_file: PathBuf,
}

impl CsvSnapshotPublisher {
    pub fn new(output_file: impl Into<PathBuf>, report_file: impl Into<PathBuf>) -> Self {
        Self {
            output_file: output_file.into(),
            report_file: report_file.into(),
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn report_file(&self) -> &Path {
        &self.report_file
    }
}

#[async_trait]
impl SnapshotPublisher for CsvSnapshotPublisher {
    async fn publish(&self, rows: &[SnapshotRow], report: &RunReport) -> Result<(), StoreError> {
        let csv_bytes = encode_rows(rows)?;
        let report_bytes = encode_report(report)?;
        let output_file = self.output_file.clone();
        let report_file = self.report_file.clone();

        tokio::task::spawn_blocking(move || {
            write_atomic(&report_file, &report_bytes)?;
            write_atomic(&output_file, &csv_bytes)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))??;

        info!(
            "Published {} rows to {} (report: {})",
            rows.len(),
            self.output_file.display(),
            self.report_file.display()
        );
        Ok(())
    }
}
