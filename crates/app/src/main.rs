use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use config::{Config, Environment, File};
use spikescan_core::config::AppConfig;
use spikescan_ingest::local::LocalFileFetcher;
use spikescan_pipeline::batch::Pipeline;
use spikescan_reconcile::universe::DenylistUniverse;
use spikescan_store::history::SqliteHistoryStore;
use spikescan_store::publisher::CsvSnapshotPublisher;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 分层加载配置。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 为底。
/// 2. 叠加 `{dir}/default.toml` 与 `{dir}/universe.toml` (均可缺省)。
/// 3. 叠加 `SPIKESCAN__` 前缀的环境变量，`__` 分隔层级。
fn load_config(dir: &Path) -> anyhow::Result<AppConfig> {
    let settings = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::from(dir.join("default.toml")).required(false))
        .add_source(File::from(dir.join("universe.toml")).required(false))
        .add_source(
            Environment::with_prefix("SPIKESCAN")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to load configuration")?;
    Ok(settings.try_deserialize()?)
}

/// # Summary
/// 初始化日志：标准输出加按日滚动的日志文件。
///
/// # Returns
/// 文件写入线程的守卫，必须存活到进程结束，否则尾部日志会丢失。
fn init_tracing(logs_dir: &str) -> anyhow::Result<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("spikescan")
        .filename_suffix("log")
        .build(logs_dir)
        .with_context(|| format!("failed to open log directory {}", logs_dir))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;
    Ok(guard)
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 Pipeline。
///
/// # Logic
/// 1. 加载配置并初始化全局日志。
/// 2. 实例化基础设施层 (本地文件抓取、SQLite 历史库、CSV 发布)。
/// 3. 实例化可投资范围过滤。
/// 4. 构造 Pipeline 并执行一次完整运行。
/// 5. 打印信号列表；致命错误以非零状态退出。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 配置与日志
    let config = load_config(&PathBuf::from("config"))?;
    let _guard = init_tracing(&config.data.logs_dir)?;
    info!("Spikescan starting...");

    // 2. 基础设施层
    spikescan_store::config::set_root_dir(PathBuf::from(&config.data.store_dir));
    let fetcher = Arc::new(LocalFileFetcher::from_config(&config.data));
    let store = Arc::new(SqliteHistoryStore::new().await?);
    let publisher = Arc::new(CsvSnapshotPublisher::new(
        &config.data.output_file,
        &config.data.report_file,
    ));

    // 3. 范围过滤
    let universe = Arc::new(DenylistUniverse::from_config(&config.universe));

    // 4. 执行
    let pipeline = Pipeline::new(fetcher, store, publisher, universe, config.clone());
    let summary = pipeline.run().await.context("pipeline run failed")?;

    // 5. 汇总
    info!(
        "Processed {} date(s), {} records, {} rows written to {}",
        summary.dates, summary.records, summary.rows, config.data.output_file
    );
    if !summary.gaps.is_empty() {
        warn!("{} date(s) had no records: {:?}", summary.gaps.len(), summary.gaps);
    }
    if summary.signals.is_empty() {
        info!("No symbol passed all 12 conditions");
    } else {
        info!("Signals ({}): {}", summary.signals.len(), summary.signals.join(", "));
    }
    Ok(())
}
