//! Weight and water ledgers
//!
//! Each ledger scopes the shared [`EventStore`](crate::storage::EventStore)
//! to one event kind, validates input, and turns local days into UTC bounds
//! through the [`DayResolver`](crate::day::DayResolver). Ledgers are cheap
//! to clone; clones share the same store.

pub mod water;
pub mod weight;

pub use water::{WaterLedger, MAX_WATER_DELTA_LITERS};
pub use weight::{convert, WeightLedger, LB_PER_KG};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::storage::events::to_nanos;

/// Reject instants the store cannot represent
fn check_instant(at: DateTime<Utc>) -> Result<()> {
    match to_nanos(at) {
        Some(_) => Ok(()),
        None => Err(Error::validation(format!(
            "timestamp {} is outside the supported range",
            at
        ))),
    }
}
