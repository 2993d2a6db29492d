//! Upgrades from older database layouts
//!
//! Two shapes predate the current schema:
//!
//! - A `weights` table with one row per local day (`day`, `value`, `unit`,
//!   `created_at` as RFC 3339 text). On store initialization, if the event
//!   table is still empty, those rows are copied into `weight_events` once,
//!   preserving value, unit and instant. A marker in `schema_info` records
//!   that the copy happened so it is never repeated, even after every weight
//!   event is later undone.
//! - `weight_events` / `water_events` tables whose instant is a `created_at`
//!   RFC 3339 text column. They are rebuilt with `created_at_ns`, keeping ids
//!   and the autoincrement high-water mark.
//!
//! Both run inside the store's initialization transaction: any bad row
//! aborts the whole open.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::events::to_nanos;
use super::schema::{get_info, init_schema, set_info, table_exists};
use crate::models::WeightUnit;

/// Name of the legacy per-day table
pub const LEGACY_TABLE: &str = "weights";

const RECONCILED_MARKER: &str = "legacy_weights_reconciled";

/// Event tables and their payload columns (everything but id and instant)
const EVENT_TABLES: [(&str, &str); 2] = [
    ("weight_events", "value, unit"),
    ("water_events", "delta_liters"),
];

struct LegacyRow {
    value: f64,
    unit: WeightUnit,
    created_at: DateTime<Utc>,
}

/// Copy legacy per-day weights into the event ledger, at most once
///
/// Returns the number of rows copied. A no-op when the copy already ran,
/// when any weight event exists, or when there is no legacy table.
pub fn reconcile_legacy_weights(conn: &Connection) -> StorageResult<usize> {
    if get_info(conn, RECONCILED_MARKER)?.is_some() {
        debug!("Legacy weights already reconciled");
        return Ok(0);
    }

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM weight_events", [], |row| row.get(0))?;
    if existing > 0 {
        debug!("Weight events present ({}), skipping legacy reconciliation", existing);
        set_info(conn, RECONCILED_MARKER, "skipped")?;
        return Ok(0);
    }

    if !table_exists(conn, LEGACY_TABLE)? {
        return Ok(0);
    }

    let mut rows = read_legacy_rows(conn)?;
    rows.sort_by_key(|row| row.created_at);

    {
        let mut insert = conn.prepare(
            "INSERT INTO weight_events (value, unit, created_at_ns) VALUES (?1, ?2, ?3)",
        )?;
        for row in &rows {
            let nanos = to_nanos(row.created_at).ok_or_else(|| StorageError::Migration {
                details: format!("timestamp {} is outside the supported range", row.created_at),
            })?;
            insert.execute(params![row.value, row.unit, nanos])?;
        }
    }

    set_info(conn, RECONCILED_MARKER, &rows.len().to_string())?;
    info!("Reconciled {} legacy weight rows into the event ledger", rows.len());

    Ok(rows.len())
}

/// Rebuild event tables that still store `created_at` as text
///
/// Returns the number of rows converted. Tables already keyed by
/// `created_at_ns` are left alone, so this is a no-op on current databases.
pub fn upgrade_text_timestamps(conn: &Connection) -> StorageResult<usize> {
    let mut stale = Vec::new();
    for (table, payload) in EVENT_TABLES {
        if !table_exists(conn, table)? || has_column(conn, table, "created_at_ns")? {
            continue;
        }
        if !has_column(conn, table, "created_at")? {
            return Err(StorageError::Migration {
                details: format!("table '{}' has neither created_at_ns nor created_at", table),
            });
        }
        stash_table(conn, table)?;
        stale.push((table, payload));
    }

    if stale.is_empty() {
        return Ok(0);
    }

    init_schema(conn)?;

    let mut converted = 0;
    for (table, payload) in stale {
        converted += restore_table(conn, table, payload)?;
    }
    info!("Converted {} events from text timestamps", converted);

    Ok(converted)
}

fn stashed_name(table: &str) -> String {
    format!("{}_text_timestamps", table)
}

/// Move a text-timestamp table aside, along with the index that would
/// otherwise block the new one
fn stash_table(conn: &Connection, table: &str) -> StorageResult<()> {
    debug!("Moving {} aside to convert its timestamps", table);
    conn.execute_batch(&format!(
        "DROP INDEX IF EXISTS idx_{table}_created_at;
         ALTER TABLE {table} RENAME TO {stashed};",
        table = table,
        stashed = stashed_name(table),
    ))?;
    Ok(())
}

fn restore_table(conn: &Connection, table: &str, payload: &str) -> StorageResult<usize> {
    let stashed = stashed_name(table);
    let high_water = sequence_of(conn, &stashed)?;

    let rows = conn
        .prepare(&format!("SELECT id, created_at FROM {}", stashed))?
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Migration {
            details: format!("could not read {} row: {}", table, e),
        })?;

    {
        let mut copy = conn.prepare(&format!(
            "INSERT INTO {table} (id, {payload}, created_at_ns)
             SELECT id, {payload}, ?2 FROM {stashed} WHERE id = ?1",
            table = table,
            payload = payload,
            stashed = stashed,
        ))?;
        for (id, created_at) in &rows {
            let nanos = DateTime::parse_from_rfc3339(created_at)
                .ok()
                .and_then(|at| to_nanos(at.with_timezone(&Utc)))
                .ok_or_else(|| StorageError::Migration {
                    details: format!("{} row {} has bad created_at '{}'", table, id, created_at),
                })?;
            copy.execute(params![id, nanos])
                .map_err(|e| StorageError::Migration {
                    details: format!("could not copy {} row {}: {}", table, id, e),
                })?;
        }
    }

    conn.execute_batch(&format!("DROP TABLE {}", stashed))?;

    // Ids of deleted rows stay retired
    if let Some(seq) = high_water {
        conn.execute("DELETE FROM sqlite_sequence WHERE name = ?1", [table])?;
        conn.execute(
            "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
            params![table, seq],
        )?;
    }

    debug!("Converted {} rows in {}", rows.len(), table);
    Ok(rows.len())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    conn.prepare("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")?
        .exists([table, column])
}

fn sequence_of(conn: &Connection, table: &str) -> rusqlite::Result<Option<i64>> {
    if !table_exists(conn, "sqlite_sequence")? {
        return Ok(None);
    }
    conn.query_row(
        "SELECT seq FROM sqlite_sequence WHERE name = ?1",
        [table],
        |row| row.get(0),
    )
    .optional()
}

fn read_legacy_rows(conn: &Connection) -> StorageResult<Vec<LegacyRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT day, value, unit, created_at FROM {}",
        LEGACY_TABLE
    ))?;

    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Migration {
            details: format!("could not read legacy row: {}", e),
        })?;

    raw.into_iter()
        .map(|(day, value, unit, created_at)| {
            let unit = unit.parse::<WeightUnit>().map_err(|_| StorageError::Migration {
                details: format!("row for {} has unknown unit '{}'", day, unit),
            })?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::Migration {
                    details: format!("row for {} has bad timestamp '{}': {}", day, created_at, e),
                })?
                .with_timezone(&Utc);
            Ok(LegacyRow {
                value,
                unit,
                created_at,
            })
        })
        .collect()
}
