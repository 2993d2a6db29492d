//! Append-only event store
//!
//! Durable storage for weight and water events, backed by one SQLite
//! connection. The event kind is chosen with a type parameter
//! ([`EventRecord`]), so the same range and top-K primitives serve both
//! ledgers.
//!
//! ## Ordering
//!
//! Events order by `created_at` with ties broken by id, in the same
//! direction. "Most recent" is therefore deterministic even when two events
//! share an instant.
//!
//! ## Concurrency
//!
//! The connection sits behind a mutex: one statement sequence runs at a
//! time, which is the single-writer discipline the ledgers rely on. The store
//! is `Send + Sync` and meant to be shared through `Arc`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::legacy::{reconcile_legacy_weights, upgrade_text_timestamps};
use super::schema::{init_schema, needs_init};
use crate::models::{WaterEvent, WeightEvent, WeightUnit};

/// Nanoseconds since the Unix epoch, if the instant is representable
pub(crate) fn to_nanos(at: DateTime<Utc>) -> Option<i64> {
    at.timestamp_nanos_opt()
}

/// Like [`to_nanos`], but clamps out-of-range instants for use as query bounds
fn saturating_nanos(at: DateTime<Utc>) -> i64 {
    to_nanos(at).unwrap_or(if at.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

fn from_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

/// A stored event kind
pub trait EventRecord: Sized {
    /// Table holding this kind
    const TABLE: &'static str;
    /// Column list matching [`EventRecord::from_row`]
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn id(&self) -> i64;

    fn created_at(&self) -> DateTime<Utc>;
}

impl EventRecord for WeightEvent {
    const TABLE: &'static str = "weight_events";
    const COLUMNS: &'static str = "id, value, unit, created_at_ns";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(WeightEvent {
            id: row.get(0)?,
            value: row.get(1)?,
            unit: row.get(2)?,
            created_at: from_nanos(row.get(3)?),
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl EventRecord for WaterEvent {
    const TABLE: &'static str = "water_events";
    const COLUMNS: &'static str = "id, delta_liters, created_at_ns";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(WaterEvent {
            id: row.get(0)?,
            delta_liters: row.get(1)?,
            created_at: from_nanos(row.get(2)?),
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Direction of a time-ordered query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    fn sql(self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

/// SQLite-backed store for weight and water events
pub struct EventStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl EventStore {
    /// Open or create the database at `path`
    ///
    /// Creates the schema if needed, converts event tables that still use
    /// text timestamps, and runs the one-time legacy weight reconciliation.
    /// All of it happens in one transaction; if either fails the
    /// store is not returned and nothing is committed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
            }
        }

        let mut conn = Connection::open(path)?;
        // FULL sync: a committed write is on disk before the call returns
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        bootstrap(&mut conn)?;
        info!("Opened event store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        bootstrap(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Insert a weight event and return its id
    ///
    /// Instants outside the nanosecond range are clamped; the ledgers reject
    /// them before they get here.
    pub fn append_weight(
        &self,
        value: f64,
        unit: WeightUnit,
        at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let nanos = saturating_nanos(at);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO weight_events (value, unit, created_at_ns) VALUES (?1, ?2, ?3)",
            params![value, unit, nanos],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Appended weight event {} ({} {})", id, value, unit);
        Ok(id)
    }

    /// Insert a water event and return its id
    pub fn append_water(&self, delta_liters: f64, at: DateTime<Utc>) -> StorageResult<i64> {
        let nanos = saturating_nanos(at);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO water_events (delta_liters, created_at_ns) VALUES (?1, ?2)",
            params![delta_liters, nanos],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Appended water event {} ({} L)", id, delta_liters);
        Ok(id)
    }

    /// Events with `start <= created_at < end`, in the given order
    ///
    /// `limit` of `None` returns every matching event.
    pub fn query_range<E: EventRecord>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        order: Order,
        limit: Option<usize>,
    ) -> StorageResult<Vec<E>> {
        let sql = format!(
            "SELECT {cols} FROM {table}
             WHERE created_at_ns >= ?1 AND created_at_ns < ?2
             ORDER BY created_at_ns {dir}, id {dir}
             LIMIT ?3",
            cols = E::COLUMNS,
            table = E::TABLE,
            dir = order.sql(),
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(
            params![saturating_nanos(start), saturating_nanos(end), sql_limit(limit)],
            E::from_row,
        )?;
        collect_rows::<E>(rows)
    }

    /// Up to `limit` most recent events, newest first
    pub fn most_recent<E: EventRecord>(&self, limit: usize) -> StorageResult<Vec<E>> {
        let sql = format!(
            "SELECT {cols} FROM {table} ORDER BY created_at_ns DESC, id DESC LIMIT ?1",
            cols = E::COLUMNS,
            table = E::TABLE,
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![sql_limit(Some(limit))], E::from_row)?;
        collect_rows::<E>(rows)
    }

    /// Delete one event by id; `true` iff a row was removed
    pub fn delete_by_id<E: EventRecord>(&self, id: i64) -> StorageResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", E::TABLE);
        let conn = self.conn()?;
        let removed = conn.execute(&sql, params![id])? > 0;
        debug!("Delete {} id={} removed={}", E::TABLE, id, removed);
        Ok(removed)
    }

    /// Number of stored events of this kind
    pub fn count<E: EventRecord>(&self) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn bootstrap(conn: &mut Connection) -> StorageResult<()> {
    let tx = conn.transaction()?;
    upgrade_text_timestamps(&tx)?;
    if needs_init(&tx) {
        init_schema(&tx)?;
    }
    reconcile_legacy_weights(&tx)?;
    tx.commit()?;
    Ok(())
}

/// SQLite treats a negative LIMIT as "no limit"
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

fn collect_rows<E: EventRecord>(
    rows: impl Iterator<Item = rusqlite::Result<E>>,
) -> StorageResult<Vec<E>> {
    rows.map(|row| {
        row.map_err(|e| match e {
            rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
                StorageError::CorruptRecord {
                    table: E::TABLE,
                    details: source.to_string(),
                }
            }
            other => StorageError::Database(other),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let store = EventStore::open_in_memory().unwrap();

        let a = store.append_weight(70.0, WeightUnit::Kg, t0()).unwrap();
        let b = store.append_weight(71.0, WeightUnit::Kg, t0()).unwrap();
        let c = store.append_water(0.25, t0()).unwrap();
        let d = store.append_water(0.5, t0()).unwrap();

        assert!(b > a);
        assert!(d > c);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let store = EventStore::open_in_memory().unwrap();

        let first = store.append_water(0.25, t0()).unwrap();
        assert!(store.delete_by_id::<WaterEvent>(first).unwrap());
        let second = store.append_water(0.25, t0()).unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_query_range_is_half_open() {
        let store = EventStore::open_in_memory().unwrap();
        let start = t0();
        let end = start + TimeDelta::hours(24);

        store.append_water(1.0, start).unwrap();
        store.append_water(2.0, end - TimeDelta::nanoseconds(1)).unwrap();
        store.append_water(4.0, end).unwrap();
        store.append_water(8.0, start - TimeDelta::nanoseconds(1)).unwrap();

        let events: Vec<WaterEvent> = store
            .query_range(start, end, Order::Ascending, None)
            .unwrap();
        let deltas: Vec<f64> = events.iter().map(|e| e.delta_liters).collect();
        assert_eq!(deltas, vec![1.0, 2.0]);
    }

    #[test]
    fn test_query_range_order_and_limit() {
        let store = EventStore::open_in_memory().unwrap();
        for i in 0..5i32 {
            let at = t0() + TimeDelta::minutes(i64::from(i));
            store
                .append_weight(70.0 + f64::from(i), WeightUnit::Kg, at)
                .unwrap();
        }

        let end = t0() + TimeDelta::hours(1);
        let asc: Vec<WeightEvent> = store.query_range(t0(), end, Order::Ascending, None).unwrap();
        assert_eq!(asc.first().unwrap().value, 70.0);
        assert_eq!(asc.last().unwrap().value, 74.0);

        let desc: Vec<WeightEvent> = store
            .query_range(t0(), end, Order::Descending, Some(2))
            .unwrap();
        let values: Vec<f64> = desc.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![74.0, 73.0]);
    }

    #[test]
    fn test_most_recent_orders_by_time_not_insertion() {
        let store = EventStore::open_in_memory().unwrap();
        // Backfilled event inserted last but timestamped earliest
        store.append_water(0.5, t0()).unwrap();
        store.append_water(0.75, t0() + TimeDelta::hours(1)).unwrap();
        store.append_water(0.25, t0() - TimeDelta::days(3)).unwrap();

        let recent: Vec<WaterEvent> = store.most_recent(10).unwrap();
        let deltas: Vec<f64> = recent.iter().map(|e| e.delta_liters).collect();
        assert_eq!(deltas, vec![0.75, 0.5, 0.25]);

        let top: Vec<WaterEvent> = store.most_recent(1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].delta_liters, 0.75);
    }

    #[test]
    fn test_ties_break_by_id() {
        let store = EventStore::open_in_memory().unwrap();
        let first = store.append_weight(70.0, WeightUnit::Kg, t0()).unwrap();
        let second = store.append_weight(71.0, WeightUnit::Kg, t0()).unwrap();

        let recent: Vec<WeightEvent> = store.most_recent(2).unwrap();
        assert_eq!(recent[0].id, second);
        assert_eq!(recent[1].id, first);

        let asc: Vec<WeightEvent> = store
            .query_range(t0(), t0() + TimeDelta::seconds(1), Order::Ascending, None)
            .unwrap();
        assert_eq!(asc[0].id, first);
    }

    #[test]
    fn test_nanosecond_precision_survives() {
        let store = EventStore::open_in_memory().unwrap();
        let at = t0() + TimeDelta::nanoseconds(123_456_789);
        store.append_weight(70.0, WeightUnit::Lb, at).unwrap();

        let recent: Vec<WeightEvent> = store.most_recent(1).unwrap();
        assert_eq!(recent[0].created_at, at);
        assert_eq!(recent[0].unit, WeightUnit::Lb);
    }

    #[test]
    fn test_delete_by_id() {
        let store = EventStore::open_in_memory().unwrap();
        let id = store.append_weight(70.0, WeightUnit::Kg, t0()).unwrap();

        assert!(store.delete_by_id::<WeightEvent>(id).unwrap());
        assert!(!store.delete_by_id::<WeightEvent>(id).unwrap());
        assert_eq!(store.count::<WeightEvent>().unwrap(), 0);
    }

    #[test]
    fn test_kinds_are_separate() {
        let store = EventStore::open_in_memory().unwrap();
        let id = store.append_water(0.5, t0()).unwrap();

        assert!(!store.delete_by_id::<WeightEvent>(id).unwrap());
        assert_eq!(store.count::<WaterEvent>().unwrap(), 1);
        assert_eq!(store.count::<WeightEvent>().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_unit_is_reported() {
        let store = EventStore::open_in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            // Bypass the CHECK constraint to simulate a damaged row
            conn.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 INSERT INTO weight_events (value, unit, created_at_ns) VALUES (70.0, 'st', 1);
                 PRAGMA ignore_check_constraints = OFF;",
            )
            .unwrap();
        }

        let err = store.most_recent::<WeightEvent>(1).unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { table: "weight_events", .. }));
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("biometrics.sqlite");

        {
            let store = EventStore::open(&path).unwrap();
            store.append_weight(70.0, WeightUnit::Kg, t0()).unwrap();
            store.append_water(0.5, t0()).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }

        let store = EventStore::open(&path).unwrap();
        assert_eq!(store.count::<WeightEvent>().unwrap(), 1);
        assert_eq!(store.count::<WaterEvent>().unwrap(), 1);
    }

    #[test]
    fn test_legacy_reconciled_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("biometrics.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE weights (day TEXT PRIMARY KEY, value REAL NOT NULL, unit TEXT NOT NULL, created_at TEXT NOT NULL);
                 INSERT INTO weights VALUES ('2026-02-07', 70.0, 'kg', '2026-02-07T14:00:00Z');",
            )
            .unwrap();
        }

        let store = EventStore::open(&path).unwrap();
        let events: Vec<WeightEvent> = store.most_recent(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 70.0);
        assert_eq!(events[0].unit, WeightUnit::Kg);
    }

    fn write_text_timestamp_db(path: &Path, water_created_at: &str) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE weights (day TEXT PRIMARY KEY, value REAL NOT NULL, unit TEXT NOT NULL, created_at TEXT NOT NULL);
             CREATE TABLE weight_events (id INTEGER PRIMARY KEY AUTOINCREMENT, value REAL NOT NULL, unit TEXT NOT NULL, created_at TEXT NOT NULL);
             CREATE INDEX idx_weight_events_created_at ON weight_events(created_at);
             CREATE TABLE water_events (id INTEGER PRIMARY KEY AUTOINCREMENT, delta_liters REAL NOT NULL, created_at TEXT NOT NULL);
             CREATE INDEX idx_water_events_created_at ON water_events(created_at);
             INSERT INTO weights VALUES ('2026-02-06', 69.0, 'kg', '2026-02-06T14:00:00Z');
             INSERT INTO weight_events (value, unit, created_at) VALUES (69.0, 'kg', '2026-02-06T14:00:00Z');
             INSERT INTO weight_events (value, unit, created_at) VALUES (70.0, 'kg', '2026-02-07T14:00:00.5Z');",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO water_events (delta_liters, created_at) VALUES (0.75, ?1)",
            [water_created_at],
        )
        .unwrap();
    }

    #[test]
    fn test_text_timestamp_tables_upgraded_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("biometrics.sqlite");
        write_text_timestamp_db(&path, "2026-02-07T15:00:00Z");

        let store = EventStore::open(&path).unwrap();

        // Events already present, so the legacy rows are not copied again
        let weights: Vec<WeightEvent> = store.most_recent(10).unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].id, 2);
        assert_eq!(weights[0].value, 70.0);
        assert_eq!(
            weights[0].created_at,
            Utc.with_ymd_and_hms(2026, 2, 7, 14, 0, 0).unwrap() + TimeDelta::milliseconds(500)
        );

        let day_start = Utc.with_ymd_and_hms(2026, 2, 7, 0, 0, 0).unwrap();
        let water: Vec<WaterEvent> = store
            .query_range(day_start, day_start + TimeDelta::days(1), Order::Ascending, None)
            .unwrap();
        assert_eq!(water.len(), 1);
        assert_eq!(water[0].delta_liters, 0.75);

        assert!(store.append_weight(71.0, WeightUnit::Kg, t0()).unwrap() > 2);
    }

    #[test]
    fn test_bad_text_timestamp_fails_open_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("biometrics.sqlite");
        write_text_timestamp_db(&path, "last tuesday");

        let err = EventStore::open(&path).err().unwrap();
        assert!(matches!(err, StorageError::Migration { .. }));
        assert!(err.recovery_suggestion().is_some());

        // The old layout is still in place
        let conn = Connection::open(&path).unwrap();
        let old_rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM water_events WHERE created_at = 'last tuesday'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(old_rows, 1);
    }

    #[test]
    fn test_failed_reconciliation_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("biometrics.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE weights (day TEXT PRIMARY KEY, value REAL NOT NULL, unit TEXT NOT NULL, created_at TEXT NOT NULL);
                 INSERT INTO weights VALUES ('2026-02-07', 70.0, 'kg', '2026-02-07T14:00:00Z');
                 INSERT INTO weights VALUES ('2026-02-08', 70.5, 'kg', 'not a time');",
            )
            .unwrap();
        }

        let err = EventStore::open(&path).err().unwrap();
        assert!(matches!(err, StorageError::Migration { .. }));

        // Schema creation was rolled back with the failed copy
        let conn = Connection::open(&path).unwrap();
        let has_events: bool = conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='weight_events'")
            .unwrap()
            .exists([])
            .unwrap();
        assert!(!has_events);
    }

    #[test]
    fn test_shared_across_threads() {
        let store = Arc::new(EventStore::open_in_memory().unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        store
                            .append_water(0.1, t0() + TimeDelta::seconds(i * 100 + j))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.count::<WaterEvent>().unwrap(), 100);
    }
}
