//! Water ledger
//!
//! Water intake is a stream of signed deltas in liters. A day's total is the
//! sum of the deltas inside its bounds; negative deltas correct earlier
//! over-counting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::check_instant;
use crate::day::{DayResolver, LocalDay};
use crate::error::{Error, Result};
use crate::models::{UndoOutcome, WaterEntry, WaterEvent};
use crate::storage::{EventStore, Order};

/// Largest accepted magnitude for a single water delta
pub const MAX_WATER_DELTA_LITERS: f64 = 10.0;

/// Operations over water events
#[derive(Clone)]
pub struct WaterLedger {
    store: Arc<EventStore>,
    resolver: DayResolver,
}

impl WaterLedger {
    pub fn new(store: Arc<EventStore>, resolver: DayResolver) -> Self {
        Self { store, resolver }
    }

    pub fn resolver(&self) -> DayResolver {
        self.resolver
    }

    pub fn record_event(&self, delta_liters: f64) -> Result<i64> {
        self.record_event_at(delta_liters, Utc::now())
    }

    /// Record a signed delta at `at`
    ///
    /// The delta must be finite, non-zero and at most
    /// [`MAX_WATER_DELTA_LITERS`] in magnitude.
    pub fn record_event_at(&self, delta_liters: f64, at: DateTime<Utc>) -> Result<i64> {
        if !delta_liters.is_finite() {
            return Err(Error::validation("deltaLiters must be a finite number"));
        }
        if delta_liters == 0.0 {
            return Err(Error::validation("deltaLiters must be non-zero"));
        }
        if delta_liters.abs() > MAX_WATER_DELTA_LITERS {
            return Err(Error::validation(format!(
                "deltaLiters must be between -{max} and {max}, got {}",
                delta_liters,
                max = MAX_WATER_DELTA_LITERS
            )));
        }
        check_instant(at)?;

        Ok(self.store.append_water(delta_liters, at)?)
    }

    /// Sum of all deltas within a local day, `0.0` when there are none
    pub fn total_for_local_day(&self, day: LocalDay) -> Result<f64> {
        let bounds = self.resolver.bounds(day);
        let events: Vec<WaterEvent> =
            self.store
                .query_range(bounds.start, bounds.end, Order::Ascending, None)?;

        Ok(events.iter().map(|e| e.delta_liters).sum())
    }

    pub fn today_total(&self) -> Result<f64> {
        self.total_for_local_day(self.resolver.today())
    }

    /// Delete the most recent water event across all history
    pub fn undo_latest(&self) -> Result<UndoOutcome> {
        let latest: Vec<WaterEvent> = self.store.most_recent(1)?;
        let Some(event) = latest.first() else {
            debug!("Water undo requested on an empty ledger");
            return Ok(UndoOutcome::nothing());
        };

        if self.store.delete_by_id::<WaterEvent>(event.id)? {
            Ok(UndoOutcome::removed(event.id))
        } else {
            // Removed by someone else between the lookup and the delete
            Ok(UndoOutcome::nothing())
        }
    }

    /// Most recent water events, newest first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<WaterEntry>> {
        let events: Vec<WaterEvent> = self.store.most_recent(limit)?;
        Ok(events
            .into_iter()
            .map(|event| {
                let day = self.resolver.to_local_day(event.created_at);
                WaterEntry::from_event(event, day)
            })
            .collect())
    }

    /// Delete a specific water event
    pub fn remove(&self, id: i64) -> Result<()> {
        if self.store.delete_by_id::<WaterEvent>(id)? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("water event {}", id)))
        }
    }
}
