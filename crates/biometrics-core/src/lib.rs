//! Biometrics Core Library
//!
//! Append-only event ledgers for body weight and water intake, with
//! aggregation by calendar day in the user's local timezone.
//!
//! # Architecture
//!
//! - Events are stored in SQLite with UTC instants (nanosecond precision).
//! - Local days exist only at query time: a [`DayResolver`] turns a
//!   `YYYY-MM-DD` day into a half-open UTC range, and ledgers query that range.
//! - "Undo" deletes the most recent event of a kind across all history.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! store.weight().record_measurement(70.0, WeightUnit::Kg)?;
//! let today = store.weight().today_entry()?;
//!
//! store.water().record_event(0.25)?;
//! let total = store.water().today_total()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `ledger`: Weight and water ledgers
//! - `chart`: Day-by-day series over a trailing window
//! - `day`: Local day parsing and UTC bounds
//! - `models`: Events and read-side entries
//! - `storage`: SQLite event store, schema and legacy reconciliation
//! - `config`: Application configuration

pub mod chart;
pub mod config;
pub mod day;
pub mod error;
pub mod ledger;
pub mod models;
pub mod storage;
pub mod store;

pub use chart::ChartAggregator;
pub use config::Config;
pub use day::{DayBounds, DayResolver, LocalDay, LocalZone};
pub use error::{Error, Result};
pub use ledger::{convert, WaterLedger, WeightLedger, LB_PER_KG, MAX_WATER_DELTA_LITERS};
pub use models::{
    DayPoint, UndoOutcome, WaterEntry, WaterEvent, WeightEntry, WeightEvent, WeightPoint,
    WeightUnit,
};
pub use storage::{EventStore, StorageError};
pub use store::{Store, StoreStats};
