//! Storage layer
//!
//! SQLite persistence for the weight and water event ledgers.
//!
//! ## Tables
//!
//! - `weight_events` - weight measurements (value, unit, instant)
//! - `water_events` - signed water deltas in liters
//! - `schema_info` - schema version and one-shot markers
//! - `weights` - legacy per-day table, read once by [`legacy`]

pub mod error;
pub mod events;
pub mod legacy;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use events::{EventRecord, EventStore, Order};
pub use legacy::{reconcile_legacy_weights, upgrade_text_timestamps};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
