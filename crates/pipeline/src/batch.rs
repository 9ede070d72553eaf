use crate::error::PipelineError;
use chrono::NaiveDate;
use spikescan_core::common::{Exchange, FileKind};
use spikescan_core::config::AppConfig;
use spikescan_core::ingest::entity::{
    BhavTable, DeliveryTable, FetchOutcome, RawFile, UnreadableFile,
};
use spikescan_core::ingest::error::IngestError;
use spikescan_core::ingest::port::RawFileFetcher;
use spikescan_core::quality::entity::{
    DataQualityWarning, ExchangeDayReport, FileOutcome, FileReport, RunReport,
};
use spikescan_core::reconcile::entity::{CanonicalDailyRecord, InstrumentHistory};
use spikescan_core::reconcile::port::UniverseFilter;
use spikescan_core::screen::entity::{ConditionCount, ScreenedSnapshot, SnapshotRow};
use spikescan_core::store::port::{HistoryStore, SnapshotPublisher};
use spikescan_ingest::normalizer::{normalize_bhav, normalize_delivery};
use spikescan_reconcile::merger::{deduplicate_cross_exchange, merge_exchange_day};
use spikescan_reconcile::quality::validate_history;
use spikescan_reconcile::universe::apply_universe;
use spikescan_screen::aggregator::{Aggregation, ProgressiveAggregator};
use spikescan_screen::condition::ConditionEvaluator;
use spikescan_screen::stats::{bottleneck, condition_stats};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// # Summary
/// 一次运行的摘要，供入口程序打印。
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    // 处理的交易日数
    pub dates: usize,
    // 写入存储的规范记录总数
    pub records: usize,
    // 输出行数
    pub rows: usize,
    // 通过全部十二个条件的代码 (升序)
    pub signals: Vec<String>,
    pub gaps: Vec<NaiveDate>,
    pub warnings: usize,
    pub skipped_files: usize,
    // 通过数最少的条件
    pub bottleneck: Option<ConditionCount>,
}

/// 某交易所某交易日规范化后的文件。
#[derive(Default)]
struct LoadedDay {
    bhav: Option<BhavTable>,
    delivery: Option<DeliveryTable>,
}

fn skipped(file: &RawFile, reason: String) -> FileReport {
    FileReport {
        exchange: file.exchange,
        kind: file.kind,
        date: file.date,
        file: file.name.clone(),
        outcome: FileOutcome::Skipped { reason },
    }
}

fn loaded(file: &RawFile, revision: &str, rows: usize, stale_rows: usize) -> FileReport {
    FileReport {
        exchange: file.exchange,
        kind: file.kind,
        date: file.date,
        file: file.name.clone(),
        outcome: FileOutcome::Loaded {
            revision: revision.to_string(),
            rows,
            stale_rows,
        },
    }
}

fn unreadable_report(exchange: Exchange, date: NaiveDate, file: UnreadableFile) -> FileReport {
    FileReport {
        exchange,
        kind: file.kind,
        date,
        file: file.name,
        outcome: FileOutcome::Skipped {
            reason: format!("unreadable: {}", file.reason),
        },
    }
}

/// # Summary
/// 规范化某交易所某交易日的全部原始文件。
///
/// # Logic
/// 1. 按 (类别, 文件名) 排序，使结果与抓取方返回顺序无关。
/// 2. 每类文件只采用第一个成功规范化的文件，其余记为跳过。
/// 3. 版式或解析失败的文件记为跳过并输出警告，不影响其它文件。
fn normalize_files(mut files: Vec<RawFile>, reports: &mut Vec<FileReport>) -> LoadedDay {
    files.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.name.cmp(&b.name)));

    let mut day = LoadedDay::default();
    for file in &files {
        let taken = match file.kind {
            FileKind::Bhav => day.bhav.as_ref().map(|t| t.file.clone()),
            FileKind::Delivery => day.delivery.as_ref().map(|t| t.file.clone()),
        };
        if let Some(first) = taken {
            warn!(
                "{} {} {}: `{}` ignored, `{}` already loaded",
                file.exchange, file.date, file.kind, file.name, first
            );
            reports.push(skipped(
                file,
                format!("another {} file already loaded: {}", file.kind, first),
            ));
            continue;
        }

        let result: Result<(), IngestError> = match file.kind {
            FileKind::Bhav => normalize_bhav(file).map(|table| {
                reports.push(loaded(
                    file,
                    &table.revision,
                    table.records.len(),
                    table.stale_rows,
                ));
                day.bhav = Some(table);
            }),
            FileKind::Delivery => normalize_delivery(file).map(|table| {
                reports.push(loaded(
                    file,
                    &table.revision,
                    table.records.len(),
                    table.stale_rows,
                ));
                day.delivery = Some(table);
            }),
        };
        if let Err(e) = result {
            warn!("Skipping {}: {}", file.name, e);
            reports.push(skipped(file, e.to_string()));
        }
    }
    day
}

/// 没有可用行情表的交易所日报告。
fn empty_exchange_day(
    exchange: Exchange,
    date: NaiveDate,
    unavailable: Option<String>,
    delivery: Option<&DeliveryTable>,
) -> ExchangeDayReport {
    ExchangeDayReport {
        exchange,
        date,
        unavailable,
        bhav_rows: 0,
        delivery_rows: delivery.map(|d| d.records.len()).unwrap_or(0),
        join_key: None,
        delivery_report_present: false,
        defaulted_records: 0,
        note: delivery.map(|d| format!("delivery file `{}` has no bhav copy to join", d.file)),
    }
}

/// # Summary
/// 渐进放量筛选的批处理服务，系统的应用服务层门面。
/// 只依赖 `spikescan-core` 中的端口定义，所有具体实现通过构造函数注入。
///
/// # Invariants
/// - 每次运行都从原始文件完整重算，不做增量更新。
/// - 相同的原始文件与配置必须产生逐字节相同的输出与报告。
/// - 要么发布完整的输出与报告，要么返回致命错误，不存在中间状态。
pub struct Pipeline {
    // 原始文件来源
    fetcher: Arc<dyn RawFileFetcher>,
    // 规范记录存储
    store: Arc<dyn HistoryStore>,
    // 结果发布
    publisher: Arc<dyn SnapshotPublisher>,
    // 可投资范围过滤
    universe: Arc<dyn UniverseFilter>,
    config: AppConfig,
}

impl Pipeline {
    /// # Summary
    /// 创建 Pipeline 实例。
    ///
    /// # Arguments
    /// * `fetcher` - 原始文件来源的具体实现。
    /// * `store` - 历史存储的具体实现。
    /// * `publisher` - 结果发布的具体实现。
    /// * `universe` - 可投资范围过滤的具体实现。
    /// * `config` - 阈值、窗口与容差配置。
    pub fn new(
        fetcher: Arc<dyn RawFileFetcher>,
        store: Arc<dyn HistoryStore>,
        publisher: Arc<dyn SnapshotPublisher>,
        universe: Arc<dyn UniverseFilter>,
        config: AppConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            publisher,
            universe,
            config,
        }
    }

    /// # Summary
    /// 处理单个交易日：逐交易所合并、过滤，再跨交易所去重。
    ///
    /// # Returns
    /// 该日去重后的规范记录。
    async fn process_date(
        &self,
        date: NaiveDate,
        report: &mut RunReport,
    ) -> Result<Vec<CanonicalDailyRecord>, PipelineError> {
        let mut day_records = Vec::new();

        for exchange in Exchange::ALL {
            let files = match self.fetcher.fetch(date, exchange).await? {
                FetchOutcome::Available { files, unreadable } => {
                    for file in unreadable {
                        warn!("{} {}: skipping unreadable {}", exchange, date, file.name);
                        report.files.push(unreadable_report(exchange, date, file));
                    }
                    files
                }
                FetchOutcome::Unavailable { reason } => {
                    debug!("{} {} unavailable: {}", exchange, date, reason);
                    report
                        .exchange_days
                        .push(empty_exchange_day(exchange, date, Some(reason), None));
                    continue;
                }
            };

            let day_files = normalize_files(files, &mut report.files);
            let Some(bhav) = day_files.bhav.as_ref() else {
                if day_files.delivery.is_some() {
                    warn!("{} {}: delivery data without bhav copy", exchange, date);
                }
                report.exchange_days.push(empty_exchange_day(
                    exchange,
                    date,
                    None,
                    day_files.delivery.as_ref(),
                ));
                continue;
            };

            let merged = merge_exchange_day(bhav, day_files.delivery.as_ref());
            if !merged.report.delivery_report_present {
                warn!(
                    "{} {}: no delivery data joined, {} records default to zero",
                    exchange, date, merged.report.defaulted_records
                );
            }
            report.exchange_days.push(merged.report);

            let (kept, excluded) = apply_universe(self.universe.as_ref(), merged.records);
            report.excluded_by_universe += excluded;
            day_records.extend(kept);
        }

        let (records, removed) = deduplicate_cross_exchange(day_records);
        report.duplicates_removed += removed;
        Ok(records)
    }

    /// # Summary
    /// 对全部历史做数据质量检查，每条发现都输出警告。
    fn validate(&self, histories: &[InstrumentHistory]) -> Vec<DataQualityWarning> {
        let mut warnings: Vec<DataQualityWarning> = histories
            .iter()
            .flat_map(|h| validate_history(h, &self.config.quality))
            .collect();
        warnings.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then(a.exchange.cmp(&b.exchange))
                .then(a.date.cmp(&b.date))
                .then(a.issue.cmp(&b.issue))
        });
        for w in &warnings {
            warn!(
                "Data quality {:?}: {} {} on {}: {}",
                w.issue, w.exchange, w.symbol, w.date, w.detail
            );
        }
        warnings
    }

    /// # Summary
    /// 执行一次完整运行。
    ///
    /// # Logic
    /// 1. 列出全部可用交易日并清空存储。
    /// 2. 逐日：抓取、规范化、逐交易所合并与范围过滤、跨交易所去重，写入存储。
    /// 3. 所有交易日都没有记录时返回 `EmptyDataset`，不发布任何输出。
    /// 4. 读取全部历史，在阻塞线程池中并行计算渐进快照。
    /// 5. 评估十二个条件并统计逐条件通过率。
    /// 6. 数据质量检查。
    /// 7. 按 (代码, 交易所) 排序生成输出行，原子发布输出与报告。
    ///
    /// # Returns
    /// 成功返回运行摘要；运行级失败返回 `PipelineError`。
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let dates = self.fetcher.available_dates().await?;
        info!("Pipeline run over {} date(s)", dates.len());
        self.store.reset().await?;

        let mut report = RunReport {
            dates: dates.clone(),
            ..RunReport::default()
        };
        let mut total_records = 0usize;

        for date in &dates {
            let records = self.process_date(*date, &mut report).await?;
            if records.is_empty() {
                warn!("No records for any exchange on {}", date);
                report.gaps.push(*date);
                continue;
            }
            self.store.append_day(*date, &records).await?;
            total_records += records.len();
        }

        if total_records == 0 {
            return Err(PipelineError::EmptyDataset { dates: dates.len() });
        }

        let histories = self.store.load_all().await?;
        let aggregator = ProgressiveAggregator::new(self.config.windows);
        let (aggregation, histories): (Aggregation, Vec<InstrumentHistory>) =
            tokio::task::spawn_blocking(move || {
                let aggregation = aggregator.aggregate_all(&histories);
                (aggregation, histories)
            })
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?;

        let evaluator = ConditionEvaluator::new(self.config.screen);
        let mut screened: Vec<ScreenedSnapshot> = aggregation
            .snapshots
            .into_iter()
            .map(|s| evaluator.screen(s))
            .collect();
        screened.sort_by(|a, b| {
            a.snapshot
                .symbol
                .cmp(&b.snapshot.symbol)
                .then(a.snapshot.exchange.cmp(&b.snapshot.exchange))
        });

        let mut notices = aggregation.notices;
        notices.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.exchange.cmp(&b.exchange)));

        let rows: Vec<SnapshotRow> = screened.iter().map(SnapshotRow::from).collect();
        let mut signals: Vec<String> = rows
            .iter()
            .filter(|r| r.all_pass)
            .map(|r| r.symbol.clone())
            .collect();
        signals.dedup();

        report.condition_stats = condition_stats(&screened);
        report.warnings = self.validate(&histories);
        report.insufficient_history = notices;
        report.output_rows = rows.len();
        report.signals = signals.clone();

        let limiting = bottleneck(&report.condition_stats).cloned();
        if let Some(c) = &limiting {
            info!(
                "Bottleneck condition {} ({}): {} of {} passed",
                c.condition, c.label, c.passed, report.condition_stats.overall.total
            );
        }

        self.publisher.publish(&rows, &report).await?;
        info!(
            "Pipeline finished: {} records, {} rows, {} signal(s), {} warning(s)",
            total_records,
            rows.len(),
            signals.len(),
            report.warnings.len()
        );

        Ok(RunSummary {
            dates: dates.len(),
            records: total_records,
            rows: rows.len(),
            signals,
            gaps: report.gaps.clone(),
            warnings: report.warnings.len(),
            skipped_files: report
                .files
                .iter()
                .filter(|f| matches!(f.outcome, FileOutcome::Skipped { .. }))
                .count(),
            bottleneck: limiting,
        })
    }
}
