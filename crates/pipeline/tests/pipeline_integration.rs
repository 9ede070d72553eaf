use chrono::NaiveDate;
use spikescan_core::common::{Exchange, FileKind, InstrumentKey, JoinKeyKind};
use spikescan_core::config::{AppConfig, WindowConfig};
use spikescan_core::ingest::entity::RawFile;
use spikescan_core::quality::entity::FileOutcome;
use spikescan_core::store::port::HistoryStore;
use spikescan_core::testing::{MemHistoryStore, MemSnapshotPublisher, StaticFileFetcher};
use spikescan_ingest::local::LocalFileFetcher;
use spikescan_pipeline::batch::Pipeline;
use spikescan_pipeline::error::PipelineError;
use spikescan_reconcile::universe::DenylistUniverse;
use spikescan_store::history::SqliteHistoryStore;
use spikescan_store::publisher::CsvSnapshotPublisher;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn raw(exchange: Exchange, kind: FileKind, date: NaiveDate, name: &str, contents: &str) -> RawFile {
    RawFile {
        exchange,
        kind,
        date,
        name: name.to_string(),
        contents: contents.to_string(),
    }
}

fn mem_pipeline(
    fetcher: StaticFileFetcher,
    config: AppConfig,
) -> (Pipeline, Arc<MemHistoryStore>, Arc<MemSnapshotPublisher>) {
    let store = Arc::new(MemHistoryStore::new());
    let publisher = Arc::new(MemSnapshotPublisher::new());
    let universe = Arc::new(DenylistUniverse::from_config(&config.universe));
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        store.clone(),
        publisher.clone(),
        universe,
        config,
    );
    (pipeline, store, publisher)
}

#[tokio::test]
async fn test_two_exchange_run_with_memory_doubles() {
    // 1. 准备两个交易日的原始文件
    let fetcher = StaticFileFetcher::new()
        .with_file(raw(
            Exchange::Nse,
            FileKind::Bhav,
            day(6),
            "nse_bhav_20250106.csv",
            "SYMBOL,SERIES,CLOSE,TOTTRDQTY,TOTTRDVAL,TIMESTAMP,ISIN\n\
             ABC,EQ,100,150000,9000000,06-JAN-2025,INE000A01010\n\
             NIFTYBEES,EQ,250,10000,2500000,06-JAN-2025,INF204KB14I2\n",
        ))
        .with_file(raw(
            Exchange::Nse,
            FileKind::Bhav,
            day(6),
            "nse_bhav_extra.csv",
            "SYMBOL,CLOSE\nABC,100\n",
        ))
        .with_file(raw(
            Exchange::Nse,
            FileKind::Delivery,
            day(6),
            "sec_bhavdata_full_06012025.csv",
            "SYMBOL, SERIES, DATE1, TTL_TRD_QNTY, DELIV_QTY, DELIV_PER\n\
             ABC, EQ, 06-Jan-2025, 150000, 60000, 40.00\n",
        ))
        .with_file(raw(
            Exchange::Bse,
            FileKind::Bhav,
            day(6),
            "bse_bhav_20250106.csv",
            "SYMBOL,CLOSE,TOTTRDQTY,TOTTRDVAL,SC_CODE,ISIN,DATE\n\
             ABC,100.5,20000,2010000,500001,INE000A01010,2025-01-06\n\
             BSEONLY,50,4000,200000,500003,INE000C01010,2025-01-06\n",
        ))
        .with_file(raw(
            Exchange::Bse,
            FileKind::Bhav,
            day(7),
            "bse_bhav_20250107.csv",
            "SYMBOL,CLOSE,TOTTRDQTY,TOTTRDVAL,SC_CODE,ISIN,DATE\n\
             BSEONLY,52,5000,260000,500003,INE000C01010,2025-01-07\n",
        ));
    let (pipeline, store, publisher) = mem_pipeline(fetcher, AppConfig::default());

    // 2. 执行
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.dates, 2);
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.skipped_files, 1);
    assert!(summary.gaps.is_empty());
    assert!(summary.signals.is_empty());
    assert_eq!(store.len(), 3);

    // 3. 校验输出行
    let (rows, report) = publisher.last().await.unwrap();
    assert_eq!(publisher.publish_count().await, 1);
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["ABC", "BSEONLY"]);

    let abc = &rows[0];
    assert_eq!(abc.exchange, Exchange::Nse);
    assert!(abc.delivery_data_present);
    assert_eq!(abc.deliv_per, 40.0);
    assert_eq!(abc.delivery_turnover, 6_000_000.0);
    assert_eq!(abc.atw, 9_000.0);

    let bse_only = &rows[1];
    assert_eq!(bse_only.exchange, Exchange::Bse);
    assert!(!bse_only.delivery_data_present);
    assert_eq!(bse_only.deliv_per, 0.0);
    assert_eq!(bse_only.date, day(7));
    assert_eq!(bse_only.history_days, 1);

    // 4. 校验质量报告
    assert_eq!(report.dates, vec![day(6), day(7)]);
    assert_eq!(report.excluded_by_universe, 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.output_rows, 2);
    assert_eq!(report.exchange_days.len(), 4);
    let nse_day7 = report
        .exchange_days
        .iter()
        .find(|d| d.exchange == Exchange::Nse && d.date == day(7))
        .unwrap();
    assert!(nse_day7.unavailable.is_some());
    let bse_day6 = report
        .exchange_days
        .iter()
        .find(|d| d.exchange == Exchange::Bse && d.date == day(6))
        .unwrap();
    assert!(!bse_day6.delivery_report_present);
    assert_eq!(bse_day6.defaulted_records, 2);
    assert!(report.files.iter().any(|f| f.file == "nse_bhav_extra.csv"
        && matches!(f.outcome, FileOutcome::Skipped { .. })));
    assert_eq!(report.condition_stats.overall.total, 2);
    assert_eq!(report.insufficient_history.len(), 2);
}

#[tokio::test]
async fn test_run_without_any_records_is_fatal() {
    let fetcher = StaticFileFetcher::new().with_file(raw(
        Exchange::Nse,
        FileKind::Bhav,
        day(6),
        "nse_bhav_20250106.csv",
        "SYMBOL,CLOSE\nABC,100\n",
    ));
    let (pipeline, _store, publisher) = mem_pipeline(fetcher, AppConfig::default());

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyDataset { dates: 1 }));
    // 致命错误时不得发布任何输出
    assert_eq!(publisher.publish_count().await, 0);
}

fn write_nse_day(dir: &Path, date: NaiveDate, rows: &[(&str, f64, f64, f64, f64)]) {
    let stamp = date.format("%d-%b-%Y").to_string();
    let mut bhav = String::from("SYMBOL,SERIES,CLOSE,TOTTRDQTY,TOTTRDVAL,TIMESTAMP,ISIN\n");
    let mut delivery =
        String::from("SYMBOL, SERIES, DATE1, TTL_TRD_QNTY, DELIV_QTY, DELIV_PER\n");
    for (symbol, close, traded, value, delivered) in rows {
        bhav.push_str(&format!(
            "{},EQ,{},{},{},{},INE{}01010\n",
            symbol, close, traded, value, stamp, symbol
        ));
        delivery.push_str(&format!(
            "{}, EQ, {}, {}, {}, {:.2}\n",
            symbol,
            stamp,
            traded,
            delivered,
            delivered / traded * 100.0
        ));
    }
    std::fs::write(
        dir.join(format!("nse_bhav_{}.csv", date.format("%Y%m%d"))),
        bhav,
    )
    .unwrap();
    std::fs::write(
        dir.join(format!("sec_bhavdata_full_{}.csv", date.format("%d%m%Y"))),
        delivery,
    )
    .unwrap();
}

async fn run_on_disk(root: &Path, config: &AppConfig) -> anyhow::Result<Vec<String>> {
    let fetcher = LocalFileFetcher::new([
        (Exchange::Nse, root.join("nse_raw")),
        (Exchange::Bse, root.join("bse_raw")),
    ]);
    let store = SqliteHistoryStore::open(&root.join("store")).await?;
    let publisher = CsvSnapshotPublisher::new(
        root.join("out").join("dashboard.csv"),
        root.join("out").join("report.json"),
    );
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(store),
        Arc::new(publisher),
        Arc::new(DenylistUniverse::from_config(&config.universe)),
        config.clone(),
    );
    Ok(pipeline.run().await?.signals)
}

#[tokio::test]
async fn test_end_to_end_progressive_signal_is_reproducible() -> anyhow::Result<()> {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir()?;
    let nse = tmp_dir.path().join("nse_raw");
    std::fs::create_dir_all(&nse)?;

    // 2. ABC 三个指标逐日递增，XYZ 保持不变
    let abc = [
        (100.0, 100_000.0, 10_000_000.0, 40_000.0),
        (100.0, 100_000.0, 12_000_000.0, 45_000.0),
        (100.0, 100_000.0, 15_000_000.0, 50_000.0),
        (100.0, 100_000.0, 25_000_000.0, 60_000.0),
    ];
    for (i, (close, traded, value, delivered)) in abc.iter().enumerate() {
        let date = day(6 + u32::try_from(i)?);
        write_nse_day(
            &nse,
            date,
            &[
                ("ABC", *close, *traded, *value, *delivered),
                ("XYZ", 10.0, 1_000.0, 10_000.0, 100.0),
            ],
        );
    }

    let config = AppConfig {
        windows: WindowConfig {
            week: 1,
            month: 2,
            quarter: 3,
        },
        ..AppConfig::default()
    };

    // 3. 第一次运行
    let signals = run_on_disk(tmp_dir.path(), &config).await?;
    assert_eq!(signals, vec!["ABC".to_string()]);
    let output = tmp_dir.path().join("out").join("dashboard.csv");
    let report = tmp_dir.path().join("out").join("report.json");
    let first_csv = std::fs::read(&output)?;
    let first_report = std::fs::read(&report)?;

    let text = String::from_utf8(first_csv.clone())?;
    let abc_line = text.lines().find(|l| l.starts_with("ABC,")).unwrap();
    assert!(abc_line.starts_with("ABC,NSE,INEABC01010,2025-01-09,100.0,60.0,50.0,47.5,45.0"));
    assert!(abc_line.ends_with(",true"));
    let xyz_line = text.lines().find(|l| l.starts_with("XYZ,")).unwrap();
    assert!(xyz_line.ends_with(",false"));

    // 4. 相同输入再次运行，输出逐字节一致
    let signals = run_on_disk(tmp_dir.path(), &config).await?;
    assert_eq!(signals, vec!["ABC".to_string()]);
    assert_eq!(std::fs::read(&output)?, first_csv);
    assert_eq!(std::fs::read(&report)?, first_report);
    Ok(())
}

#[tokio::test]
async fn test_lagging_secondary_file_cannot_replace_primary_history() -> anyhow::Result<()> {
    // 1. 初始化 SQLite 历史库；BSE 7 日的文件仍是 6 日的行情
    let tmp_dir = tempdir()?;
    let store = Arc::new(SqliteHistoryStore::open(&tmp_dir.path().join("store")).await?);
    let publisher = Arc::new(MemSnapshotPublisher::new());
    let fetcher = StaticFileFetcher::new()
        .with_file(raw(
            Exchange::Nse,
            FileKind::Bhav,
            day(6),
            "nse_bhav_20250106.csv",
            "SYMBOL,SERIES,CLOSE,TOTTRDQTY,TOTTRDVAL,TIMESTAMP,ISIN\n\
             ABC,EQ,100,10000,1000000,06-JAN-2025,INE000A01010\n",
        ))
        .with_file(raw(
            Exchange::Nse,
            FileKind::Bhav,
            day(7),
            "nse_bhav_20250107.csv",
            "SYMBOL,SERIES,CLOSE,TOTTRDQTY,TOTTRDVAL,TIMESTAMP,ISIN\n\
             ABC,EQ,110,10000,1100000,07-JAN-2025,INE000A01010\n",
        ))
        .with_file(raw(
            Exchange::Bse,
            FileKind::Bhav,
            day(7),
            "bse_bhav_20250107.csv",
            "SYMBOL,CLOSE,TOTTRDQTY,TOTTRDVAL,SC_CODE,ISIN,DATE\n\
             ABC,200,25000,5000000,500001,INE000A01010,2025-01-06\n",
        ));
    let config = AppConfig::default();
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        store.clone(),
        publisher.clone(),
        Arc::new(DenylistUniverse::from_config(&config.universe)),
        config,
    );

    // 2. 执行
    let summary = pipeline.run().await?;
    assert_eq!(summary.records, 2);

    // 3. 6 日的存储记录仍来自 NSE
    let history = store
        .load_history(&InstrumentKey::new(JoinKeyKind::Isin, "INE000A01010"))
        .await?;
    let stored: Vec<(NaiveDate, Exchange, f64)> = history
        .records()
        .iter()
        .map(|r| (r.date, r.exchange, r.close))
        .collect();
    assert_eq!(
        stored,
        vec![(day(6), Exchange::Nse, 100.0), (day(7), Exchange::Nse, 110.0)]
    );

    // 4. 尾部窗口只包含 NSE 6 日的 ATW
    let (rows, report) = publisher.last().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].exchange, Exchange::Nse);
    assert_eq!(rows[0].date, day(7));
    assert_eq!(rows[0].atw, 1_100.0);
    assert_eq!(rows[0].atw_1w, 1_000.0);

    // 5. 被丢弃的过期行体现在文件报告中
    let bse_file = report
        .files
        .iter()
        .find(|f| f.file == "bse_bhav_20250107.csv")
        .unwrap();
    assert!(matches!(
        bse_file.outcome,
        FileOutcome::Loaded { rows: 0, stale_rows: 1, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_unreadable_raw_file_is_reported_as_skipped() -> anyhow::Result<()> {
    // 1. 初始化临时测试环境：交割文件位置上是一个目录，无法读取
    let tmp_dir = tempdir()?;
    let nse = tmp_dir.path().join("nse_raw");
    std::fs::create_dir_all(nse.join("sec_bhavdata_full_06012025.csv"))?;
    std::fs::write(
        nse.join("nse_bhav_20250106.csv"),
        "SYMBOL,SERIES,CLOSE,TOTTRDQTY,TOTTRDVAL,TIMESTAMP,ISIN\n\
         ABC,EQ,100,150000,9000000,06-JAN-2025,INE000A01010\n",
    )?;

    // 2. 执行
    let config = AppConfig::default();
    let publisher = Arc::new(MemSnapshotPublisher::new());
    let pipeline = Pipeline::new(
        Arc::new(LocalFileFetcher::new([(Exchange::Nse, nse)])),
        Arc::new(MemHistoryStore::new()),
        publisher.clone(),
        Arc::new(DenylistUniverse::from_config(&config.universe)),
        config,
    );
    let summary = pipeline.run().await?;
    assert_eq!(summary.skipped_files, 1);

    // 3. 读取失败的文件出现在报告里，行情照常处理
    let (rows, report) = publisher.last().await.unwrap();
    assert_eq!(rows.len(), 1);
    let unreadable = report
        .files
        .iter()
        .find(|f| f.file == "sec_bhavdata_full_06012025.csv")
        .unwrap();
    assert_eq!(unreadable.kind, FileKind::Delivery);
    assert_eq!(unreadable.date, day(6));
    assert!(matches!(
        &unreadable.outcome,
        FileOutcome::Skipped { reason } if reason.starts_with("unreadable")
    ));
    Ok(())
}
