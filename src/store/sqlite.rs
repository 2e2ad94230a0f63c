//! SQLite-backed [`RecordStore`].
//!
//! Records live in one `records` table. Business columns are nullable so rows written by other
//! tools can be read back; a unique index over the eight business columns backs up the
//! pipeline's duplicate check. `period` is stored as `YYYY-MM-DD` text so range comparisons work
//! lexicographically.

#![cfg(feature = "sqlite")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension};
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};
use crate::query::{FieldValue, RecordQuery};
use crate::types::{Record, StoredRecord};

use super::RecordStore;

/// Schema version written to `store_meta`.
const SCHEMA_VERSION: i64 = 1;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = "SELECT id, record_id, object_id, work_type, period, quantity, \
                              unit_price, total_cost, contractor FROM records";

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Rollback-journal delete mode.
    Delete,
}

impl SqliteJournalMode {
    fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for [`SqliteStore::open`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the database file. Parent directories are created.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
}

impl SqliteStoreConfig {
    /// Config with defaults for everything but the path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
        }
    }
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Store backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(config: &SqliteStoreConfig) -> StoreResult<Self> {
        validate_store_path(&config.path)?;
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&config.path, flags).map_err(db_err)?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            config.journal_mode.pragma_value()
        ))
        .map_err(db_err)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        initialize_schema(&mut conn)?;
        Ok(Self { conn })
    }

    /// Direct access to the underlying connection (for other writers and diagnostics).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteStore {
    fn has_exact_match(&self, record: &Record) -> StoreResult<bool> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT 1 FROM records WHERE record_id = ?1 AND object_id = ?2 AND work_type = ?3 \
                 AND period = ?4 AND quantity = ?5 AND unit_price = ?6 AND total_cost = ?7 \
                 AND contractor = ?8 LIMIT 1",
            )
            .map_err(db_err)?;
        let found: Option<i64> = stmt
            .query_row(params_from_iter(record_params(record).iter()), |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn commit_batch(&mut self, records: &[Record]) -> StoreResult<usize> {
        // Dropping the transaction without commit rolls it back.
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO records (record_id, object_id, work_type, period, quantity, \
                     unit_price, total_cost, contractor) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(db_err)?;
            for record in records {
                stmt.execute(params_from_iter(record_params(record).iter()))
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        Ok(records.len())
    }

    fn query(&self, query: &RecordQuery) -> StoreResult<Vec<StoredRecord>> {
        let (sql, args) = compile_query(query)?;
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(RawStoredRow {
                    id: row.get(0)?,
                    record_id: row.get(1)?,
                    object_id: row.get(2)?,
                    work_type: row.get(3)?,
                    period: row.get(4)?,
                    quantity: row.get(5)?,
                    unit_price: row.get(6)?,
                    total_cost: row.get(7)?,
                    contractor: row.get(8)?,
                })
            })
            .map_err(db_err)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(db_err)?.into_stored()?);
        }
        Ok(out)
    }

    fn count(&self) -> StoreResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", params![], |row| row.get(0))
            .map_err(db_err)?;
        usize::try_from(n).map_err(|_| StoreError::Invalid(format!("negative row count {n}")))
    }
}

fn record_params(record: &Record) -> [SqlValue; 8] {
    [
        SqlValue::Integer(record.record_id),
        SqlValue::Text(record.object_id.clone()),
        SqlValue::Text(record.work_type.clone()),
        SqlValue::Text(record.period.format(DATE_FORMAT).to_string()),
        SqlValue::Integer(record.quantity),
        SqlValue::Real(record.unit_price),
        SqlValue::Real(record.total_cost),
        SqlValue::Text(record.contractor.clone()),
    ]
}

/// Row as read from SQLite, before `period` text is turned back into a date.
struct RawStoredRow {
    id: i64,
    record_id: Option<i64>,
    object_id: Option<String>,
    work_type: Option<String>,
    period: Option<String>,
    quantity: Option<i64>,
    unit_price: Option<f64>,
    total_cost: Option<f64>,
    contractor: Option<String>,
}

impl RawStoredRow {
    fn into_stored(self) -> StoreResult<StoredRecord> {
        let period = match self.period {
            Some(text) => Some(NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| {
                StoreError::Invalid(format!("row {} has malformed period '{text}'", self.id))
            })?),
            None => None,
        };
        Ok(StoredRecord {
            id: self.id,
            record_id: self.record_id,
            object_id: self.object_id,
            work_type: self.work_type,
            period,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_cost: self.total_cost,
            contractor: self.contractor,
        })
    }
}

/// Lower a [`RecordQuery`] into parameterized SQL. Natural order is `id` ascending, which also
/// breaks ties when sorting.
fn compile_query(query: &RecordQuery) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut sql = String::from(SELECT_COLUMNS);
    let mut args: Vec<SqlValue> = Vec::new();

    let predicates = query.filter.predicates();
    if !predicates.is_empty() {
        let clauses: Vec<String> = predicates
            .iter()
            .map(|p| {
                args.push(field_value_to_sql(&p.value));
                format!("{} {} ?{}", p.field.column(), p.op.sql(), args.len())
            })
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    match &query.sort {
        Some(sort) => {
            sql.push_str(&format!(" ORDER BY {} {}", sort.field.column(), sort.order.sql()));
            sql.push_str(", id ASC");
        }
        None => sql.push_str(" ORDER BY id ASC"),
    }

    let limit = i64::try_from(query.page.limit)
        .map_err(|_| StoreError::Invalid("limit out of range".to_string()))?;
    let offset = i64::try_from(query.page.offset)
        .map_err(|_| StoreError::Invalid("offset out of range".to_string()))?;
    args.push(SqlValue::Integer(limit));
    sql.push_str(&format!(" LIMIT ?{}", args.len()));
    args.push(SqlValue::Integer(offset));
    sql.push_str(&format!(" OFFSET ?{}", args.len()));

    Ok((sql, args))
}

fn field_value_to_sql(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Int(i) => SqlValue::Integer(*i),
        FieldValue::Float(f) => SqlValue::Real(*f),
        FieldValue::Text(s) => SqlValue::Text(s.clone()),
        FieldValue::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
    }
}

fn db_err(err: rusqlite::Error) -> StoreError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        StoreError::Constraint(err.to_string())
    } else {
        StoreError::Db(err.to_string())
    }
}

fn validate_store_path(path: &Path) -> StoreResult<()> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.is_dir() {
        return Err(StoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

fn initialize_schema(conn: &mut Connection) -> StoreResult<()> {
    let tx = conn.transaction().map_err(db_err)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_err)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| {
            row.get(0)
        })
        .optional()
        .map_err(db_err)?;
    match version {
        None => {
            tx.execute(
                "INSERT INTO store_meta (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    record_id INTEGER,
                    object_id TEXT,
                    work_type TEXT,
                    period TEXT,
                    quantity INTEGER,
                    unit_price REAL,
                    total_cost REAL,
                    contractor TEXT
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_records_business_key ON records (
                    record_id, object_id, work_type, period,
                    quantity, unit_price, total_cost, contractor
                );
                CREATE INDEX IF NOT EXISTS idx_records_period ON records (period);",
            )
            .map_err(db_err)?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(StoreError::Invalid(format!(
                "unsupported store schema version {other} (expected {SCHEMA_VERSION})"
            )));
        }
    }
    tx.commit().map_err(db_err)
}
