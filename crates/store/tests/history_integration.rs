use chrono::NaiveDate;
use spikescan_core::common::{Exchange, InstrumentKey, JoinKeyKind};
use spikescan_core::quality::entity::RunReport;
use spikescan_core::reconcile::entity::CanonicalDailyRecord;
use spikescan_core::screen::entity::SnapshotRow;
use spikescan_core::store::error::StoreError;
use spikescan_core::store::port::{HistoryStore, SnapshotPublisher};
use spikescan_store::history::SqliteHistoryStore;
use spikescan_store::publisher::CsvSnapshotPublisher;
use tempfile::tempdir;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn record(key: &InstrumentKey, symbol: &str, date: NaiveDate, delivered: f64) -> CanonicalDailyRecord {
    CanonicalDailyRecord {
        key: key.clone(),
        symbol: symbol.to_string(),
        isin: (key.kind == JoinKeyKind::Isin).then(|| key.value.clone()),
        code: None,
        exchange: Exchange::Nse,
        date,
        series: Some("EQ".to_string()),
        close: 100.0,
        total_traded_quantity: 1000.0,
        total_traded_value: 100_000.0,
        delivered_quantity: delivered,
        delivery_percentage: delivered / 10.0,
        delivery_data_present: delivered > 0.0,
    }
}

#[tokio::test]
async fn test_history_store_round_trip() {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let store = SqliteHistoryStore::open(tmp_dir.path())
        .await
        .expect("Failed to open history store");

    let abc = InstrumentKey::new(JoinKeyKind::Isin, "INE000A01010");
    let xyz = InstrumentKey::new(JoinKeyKind::Symbol, "XYZ");

    // 2. 写入两个交易日 (乱序)
    store
        .append_day(day(7), &[record(&abc, "ABC", day(7), 600.0)])
        .await
        .unwrap();
    store
        .append_day(
            day(6),
            &[record(&abc, "ABC", day(6), 500.0), record(&xyz, "XYZ", day(6), 0.0)],
        )
        .await
        .unwrap();

    // 3. 单证券读取按日期升序
    let history = store.load_history(&abc).await.unwrap();
    let dates: Vec<_> = history.records().iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![day(6), day(7)]);
    assert_eq!(history.latest().unwrap().delivered_quantity, 600.0);
    assert_eq!(history.records()[0], record(&abc, "ABC", day(6), 500.0));

    // 4. 全量读取按身份键排序
    let all = store.load_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].key(), &abc);
    assert!(!all[1].records()[0].delivery_data_present);

    // 5. 重写同一交易日替换旧记录
    store
        .append_day(day(7), &[record(&abc, "ABC", day(7), 700.0)])
        .await
        .unwrap();
    let history = store.load_history(&abc).await.unwrap();
    assert_eq!(history.records().len(), 2);
    assert_eq!(history.latest().unwrap().delivered_quantity, 700.0);

    // 6. 重置后为空
    store.reset().await.unwrap();
    assert!(store.load_all().await.unwrap().is_empty());
    assert!(store.load_history(&abc).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_append_day_rejects_records_of_another_date() {
    // 1. 初始化临时测试环境并写入 NSE 的 6 日记录
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let store = SqliteHistoryStore::open(tmp_dir.path())
        .await
        .expect("Failed to open history store");
    let abc = InstrumentKey::new(JoinKeyKind::Isin, "INE000A01010");
    store
        .append_day(day(6), &[record(&abc, "ABC", day(6), 500.0)])
        .await
        .unwrap();

    // 2. 以 7 日写入一条 6 日的 BSE 记录，整批拒绝
    let mut stale = record(&abc, "ABC", day(6), 900.0);
    stale.exchange = Exchange::Bse;
    let err = store
        .append_day(day(7), &[record(&abc, "ABC", day(7), 600.0), stale])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DateMismatch { expected, found, .. } if expected == day(7) && found == day(6)
    ));

    // 3. 已存的 6 日记录不受影响，7 日也没有写入任何记录
    let history = store.load_history(&abc).await.unwrap();
    assert_eq!(history.records().len(), 1);
    assert_eq!(history.records()[0], record(&abc, "ABC", day(6), 500.0));
}

#[tokio::test]
async fn test_publisher_writes_csv_and_report() {
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let output = tmp_dir.path().join("out").join("dashboard.csv");
    let report_path = tmp_dir.path().join("out").join("report.json");
    let publisher = CsvSnapshotPublisher::new(&output, &report_path);

    let row = SnapshotRow {
        symbol: "ABC".to_string(),
        exchange: Exchange::Nse,
        isin: Some("INE000A01010".to_string()),
        date: day(6),
        close: 100.0,
        deliv_per: 55.0,
        deliv_per_1w: 52.0,
        deliv_per_1m: 48.0,
        deliv_per_3m: 40.0,
        delivery_turnover: 6_000_000.0,
        delivery_turnover_1w: 5_000_000.0,
        delivery_turnover_1m: 4_000_000.0,
        delivery_turnover_3m: 3_000_000.0,
        atw: 9000.0,
        atw_1w: 8000.0,
        atw_1m: 7000.0,
        atw_3m: 6000.0,
        delivery_data_present: true,
        history_days: 66,
        c1: true,
        c2: true,
        c3: false,
        c4: true,
        c5: true,
        c6: true,
        c7: true,
        c8: true,
        c9: true,
        c10: true,
        c11: true,
        c12: true,
        all_pass: false,
    };
    let report = RunReport {
        dates: vec![day(6)],
        output_rows: 1,
        ..RunReport::default()
    };

    publisher.publish(&[row.clone()], &report).await.unwrap();

    let csv_text = std::fs::read_to_string(&output).unwrap();
    let mut lines = csv_text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("SYMBOL,EXCHANGE,ISIN,DATE,CLOSE,DELIV_PER,DELIV_PER_1W"));
    assert!(header.ends_with("C11,C12,ALL_PASS"));
    assert!(lines.next().unwrap().starts_with("ABC,NSE,INE000A01010,2025-01-06,"));

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let parsed: Vec<SnapshotRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(parsed, vec![row]);

    let report_text = std::fs::read_to_string(&report_path).unwrap();
    let parsed_report: RunReport = serde_json::from_str(&report_text).unwrap();
    assert_eq!(parsed_report, report);

    // 临时文件不应残留
    let leftovers = std::fs::read_dir(tmp_dir.path().join("out")).unwrap().count();
    assert_eq!(leftovers, 2);
}
