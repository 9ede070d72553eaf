use async_trait::async_trait;
use chrono::NaiveDate;
use spikescan_core::common::{Exchange, InstrumentKey};
use spikescan_core::reconcile::entity::{CanonicalDailyRecord, InstrumentHistory};
use spikescan_core::store::error::StoreError;
use spikescan_core::store::port::{HistoryStore, ensure_same_day};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::path::Path;
use tracing::{debug, info};

/// 历史库文件名
const HISTORY_DB: &str = "history.db";

const SELECT_COLUMNS: &str = r#"
    SELECT instrument_key, symbol, isin, code, exchange, date, series,
           close, total_traded_quantity, total_traded_value,
           delivered_quantity, delivery_percentage, delivery_data_present
    FROM canonical_records
"#;

type RecordRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    NaiveDate,
    Option<String>,
    f64,
    f64,
    f64,
    f64,
    f64,
    bool,
);

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// 将一行还原为规范记录；键或交易所无法解析视为数据损坏。
fn decode(row: RecordRow) -> Result<CanonicalDailyRecord, StoreError> {
    let key: InstrumentKey = row.0.parse().map_err(StoreError::Corrupt)?;
    let exchange: Exchange = row.4.parse().map_err(StoreError::Corrupt)?;
    Ok(CanonicalDailyRecord {
        key,
        symbol: row.1,
        isin: row.2,
        code: row.3,
        exchange,
        date: row.5,
        series: row.6,
        close: row.7,
        total_traded_quantity: row.8,
        total_traded_value: row.9,
        delivered_quantity: row.10,
        delivery_percentage: row.11,
        delivery_data_present: row.12,
    })
}

/// HistoryStore 的 SQLite 实现。
///
/// # Summary
/// 在单个 SQLite 文件 (`history.db`) 中保存全部规范日记录。
///
/// # Invariants
/// * 主键为 (身份键, 日期)，同一证券同一日期至多一行。
/// * 只保存原始字段；交割成交额与 ATW 在读取后由记录现算。
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// 在配置的数据根目录下打开历史库。
    pub async fn new() -> Result<Self, StoreError> {
        Self::open(&crate::config::get_root_dir()).await
    }

    /// 在指定目录下打开 (必要时创建) 历史库。
    ///
    /// # Logic
    /// 1. 确保目录存在。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing`。
    /// 3. 执行 DDL 初始化表结构。
    ///
    /// # Arguments
    /// * `dir` - 历史库所在目录。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::InitError(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(dir.join(HISTORY_DB))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS canonical_records (
                instrument_key TEXT NOT NULL,
                date DATE NOT NULL,
                symbol TEXT NOT NULL,
                isin TEXT,
                code TEXT,
                exchange TEXT NOT NULL,
                series TEXT,
                close REAL NOT NULL,
                total_traded_quantity REAL NOT NULL,
                total_traded_value REAL NOT NULL,
                delivered_quantity REAL NOT NULL,
                delivery_percentage REAL NOT NULL,
                delivery_data_present INTEGER NOT NULL,
                PRIMARY KEY (instrument_key, date)
            );

            CREATE INDEX IF NOT EXISTS idx_canonical_records_date ON canonical_records (date);
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        debug!("Opened history store at {}", dir.display());
        Ok(Self { pool })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn reset(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM canonical_records")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// # Summary
    /// 在一个事务内替换某交易日的全部记录。
    async fn append_day(
        &self,
        date: NaiveDate,
        records: &[CanonicalDailyRecord],
    ) -> Result<(), StoreError> {
        ensure_same_day(date, records)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM canonical_records WHERE date = ?")
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for record in records {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO canonical_records (
                    instrument_key, date, symbol, isin, code, exchange, series,
                    close, total_traded_quantity, total_traded_value,
                    delivered_quantity, delivery_percentage, delivery_data_present
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.key.to_string())
            .bind(date)
            .bind(&record.symbol)
            .bind(&record.isin)
            .bind(&record.code)
            .bind(record.exchange.as_str())
            .bind(&record.series)
            .bind(record.close)
            .bind(record.total_traded_quantity)
            .bind(record.total_traded_value)
            .bind(record.delivered_quantity)
            .bind(record.delivery_percentage)
            .bind(record.delivery_data_present)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        info!("Stored {} records for {}", records.len(), date);
        Ok(())
    }

    async fn load_history(&self, key: &InstrumentKey) -> Result<InstrumentHistory, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{} WHERE instrument_key = ? ORDER BY date ASC",
            SELECT_COLUMNS
        ))
        .bind(key.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let records = rows.into_iter().map(decode).collect::<Result<Vec<_>, _>>()?;
        Ok(InstrumentHistory::new(key.clone(), records))
    }

    /// # Summary
    /// 加载全部证券的历史。
    ///
    /// # Logic
    /// 1. 按 (身份键文本, 日期) 顺序读取全部行。
    /// 2. 相邻同键的行归为一个证券。
    /// 3. 按 `InstrumentKey` 的排序规则重新排序。
    async fn load_all(&self) -> Result<Vec<InstrumentHistory>, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{} ORDER BY instrument_key ASC, date ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut histories = Vec::new();
        let mut current: Option<(InstrumentKey, Vec<CanonicalDailyRecord>)> = None;
        for row in rows {
            let record = decode(row)?;
            if let Some((key, records)) = current.as_mut() {
                if *key == record.key {
                    records.push(record);
                    continue;
                }
            }
            if let Some((key, records)) = current.take() {
                histories.push(InstrumentHistory::new(key, records));
            }
            current = Some((record.key.clone(), vec![record]));
        }
        if let Some((key, records)) = current {
            histories.push(InstrumentHistory::new(key, records));
        }

        histories.sort_by(|a, b| a.key().cmp(b.key()));
        debug!("Loaded {} instrument histories", histories.len());
        Ok(histories)
    }
}
