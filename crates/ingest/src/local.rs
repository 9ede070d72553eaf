use async_trait::async_trait;
use chrono::NaiveDate;
use spikescan_core::common::{Exchange, FileKind};
use spikescan_core::config::DataConfig;
use spikescan_core::ingest::entity::{FetchOutcome, RawFile, UnreadableFile};
use spikescan_core::ingest::error::FetchError;
use spikescan_core::ingest::port::RawFileFetcher;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 已知的落地文件命名规则：`{prefix}{date}{suffix}.{csv|txt}`。
struct NamePattern {
    exchange: Exchange,
    kind: FileKind,
    prefix: &'static str,
    date_format: &'static str,
    suffix: &'static str,
}

const PATTERNS: &[NamePattern] = &[
    NamePattern {
        exchange: Exchange::Nse,
        kind: FileKind::Bhav,
        prefix: "nse_bhav_",
        date_format: "%Y%m%d",
        suffix: "",
    },
    NamePattern {
        exchange: Exchange::Nse,
        kind: FileKind::Bhav,
        prefix: "BhavCopy_NSE_CM_0_0_0_",
        date_format: "%Y%m%d",
        suffix: "_F_0000",
    },
    NamePattern {
        exchange: Exchange::Nse,
        kind: FileKind::Delivery,
        prefix: "nse_delivery_",
        date_format: "%Y%m%d",
        suffix: "",
    },
    NamePattern {
        exchange: Exchange::Nse,
        kind: FileKind::Delivery,
        prefix: "sec_bhavdata_full_",
        date_format: "%d%m%Y",
        suffix: "",
    },
    NamePattern {
        exchange: Exchange::Bse,
        kind: FileKind::Bhav,
        prefix: "bse_bhav_",
        date_format: "%Y%m%d",
        suffix: "",
    },
    NamePattern {
        exchange: Exchange::Bse,
        kind: FileKind::Bhav,
        prefix: "BhavCopy_BSE_CM_0_0_0_",
        date_format: "%Y%m%d",
        suffix: "_F_0000",
    },
    NamePattern {
        exchange: Exchange::Bse,
        kind: FileKind::Delivery,
        prefix: "bse_delivery_",
        date_format: "%Y%m%d",
        suffix: "",
    },
];

/// # Summary
/// 根据文件名识别文件类别与交易日。
///
/// # Returns
/// 不符合任何命名规则时返回 None。
pub fn recognize(exchange: Exchange, file_name: &str) -> Option<(FileKind, NaiveDate)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case("csv") && !ext.eq_ignore_ascii_case("txt") {
        return None;
    }
    PATTERNS
        .iter()
        .filter(|p| p.exchange == exchange)
        .find_map(|p| {
            let date = stem.strip_prefix(p.prefix)?.strip_suffix(p.suffix)?;
            NaiveDate::parse_from_str(date, p.date_format)
                .ok()
                .map(|d| (p.kind, d))
        })
}

/// # Summary
/// 从本地目录读取已落地原始文件的抓取实现。
///
/// # Invariants
/// - 每个交易所对应一个目录，目录不存在视为该交易所没有数据，而不是错误。
/// - 同一交易日的文件按文件名排序返回。
#[derive(Debug, Clone)]
pub struct LocalFileFetcher {
    roots: BTreeMap<Exchange, PathBuf>,
}

impl LocalFileFetcher {
    pub fn new(roots: impl IntoIterator<Item = (Exchange, PathBuf)>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    /// 按数据配置中的原始目录构造。
    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            Exchange::ALL
                .iter()
                .map(|e| (*e, PathBuf::from(config.raw_dir(*e)))),
        )
    }

    /// 列出目录中可识别的文件，目录不存在时返回空列表。
    async fn scan(
        &self,
        exchange: Exchange,
    ) -> Result<Vec<(FileKind, NaiveDate, PathBuf)>, FetchError> {
        let Some(root) = self.roots.get(&exchange) else {
            return Ok(Vec::new());
        };
        if !is_dir(root).await {
            debug!("Raw directory {} for {} does not exist", root.display(), exchange);
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|e| FetchError::Io(format!("{}: {}", root.display(), e)))?;
        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FetchError::Io(format!("{}: {}", root.display(), e)))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some((kind, date)) = recognize(exchange, &name) {
                found.push((kind, date, entry.path()));
            }
        }
        found.sort_by(|a, b| a.2.cmp(&b.2));
        Ok(found)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[async_trait]
impl RawFileFetcher for LocalFileFetcher {
    async fn available_dates(&self) -> Result<Vec<NaiveDate>, FetchError> {
        let mut dates = BTreeSet::new();
        for exchange in self.roots.keys() {
            for (_, date, _) in self.scan(*exchange).await? {
                dates.insert(date);
            }
        }
        Ok(dates.into_iter().collect())
    }

    async fn fetch(&self, date: NaiveDate, exchange: Exchange) -> Result<FetchOutcome, FetchError> {
        let matching: Vec<(FileKind, PathBuf)> = self
            .scan(exchange)
            .await?
            .into_iter()
            .filter(|(_, d, _)| *d == date)
            .map(|(kind, _, path)| (kind, path))
            .collect();

        if matching.is_empty() {
            return Ok(FetchOutcome::Unavailable {
                reason: format!("no {} files for {}", exchange, date),
            });
        }

        let mut files = Vec::with_capacity(matching.len());
        let mut unreadable = Vec::new();
        for (kind, path) in matching {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    unreadable.push(UnreadableFile {
                        kind,
                        name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            files.push(RawFile {
                exchange,
                kind,
                date,
                name,
                contents: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(FetchOutcome::Available { files, unreadable })
    }
}
