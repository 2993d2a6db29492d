//! SQLite schema for the event ledgers
//!
//! Two append-only tables, one per event kind. Timestamps are stored as
//! nanoseconds since the Unix epoch so numeric order is chronological order;
//! the `(created_at_ns, id)` indexes serve both range scans and top-K
//! lookups, with `id` as the tie-breaker.

use rusqlite::{Connection, OptionalExtension, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking and one-shot markers
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weight_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            value REAL NOT NULL,
            unit TEXT NOT NULL CHECK(unit IN ('kg','lb')),
            created_at_ns INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS water_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            delta_liters REAL NOT NULL,
            created_at_ns INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_weight_events_created_at
            ON weight_events(created_at_ns, id);
        CREATE INDEX IF NOT EXISTS idx_water_events_created_at
            ON water_events(created_at_ns, id);
        "#,
    )?;

    set_info(conn, "version", &SCHEMA_VERSION.to_string())?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    Ok(get_info(conn, "version")?.and_then(|v| v.parse().ok()))
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    if !table_exists(conn, "schema_info").unwrap_or(false) {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

/// Whether a table with this name exists
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1")?
        .exists([name])
}

pub(crate) fn get_info(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

pub(crate) fn set_info(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}
