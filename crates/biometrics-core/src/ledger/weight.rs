//! Weight ledger
//!
//! Weight is recorded as a stream of measurements. "Setting today's weight"
//! appends a new event; the value shown for a day is the latest event that
//! falls inside that day's bounds. Undo always targets the globally most
//! recent event, whichever day it belongs to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::check_instant;
use crate::day::{DayResolver, LocalDay};
use crate::error::{Error, Result};
use crate::models::{WeightEntry, WeightEvent, WeightUnit};
use crate::storage::{EventStore, Order};

/// Pounds in one kilogram
pub const LB_PER_KG: f64 = 2.2046226218;

/// Convert a weight between units; exact identity when the units match
pub fn convert(value: f64, from: WeightUnit, to: WeightUnit) -> f64 {
    match (from, to) {
        (WeightUnit::Kg, WeightUnit::Lb) => value * LB_PER_KG,
        (WeightUnit::Lb, WeightUnit::Kg) => value / LB_PER_KG,
        _ => value,
    }
}

/// Operations over weight events
#[derive(Clone)]
pub struct WeightLedger {
    store: Arc<EventStore>,
    resolver: DayResolver,
}

impl WeightLedger {
    pub fn new(store: Arc<EventStore>, resolver: DayResolver) -> Self {
        Self { store, resolver }
    }

    pub fn resolver(&self) -> DayResolver {
        self.resolver
    }

    /// Record a measurement taken now
    pub fn record_measurement(&self, value: f64, unit: WeightUnit) -> Result<i64> {
        self.record_measurement_at(value, unit, Utc::now())
    }

    /// Record a measurement taken at `at`
    ///
    /// Fails with [`Error::Validation`] unless `value` is a finite number
    /// greater than zero.
    pub fn record_measurement_at(
        &self,
        value: f64,
        unit: WeightUnit,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::validation(format!("value must be > 0, got {}", value)));
        }
        check_instant(at)?;

        Ok(self.store.append_weight(value, unit, at)?)
    }

    /// The most recently recorded weight within a local day
    ///
    /// The entry reports the requested `day`, not one recomputed from its
    /// instant.
    pub fn latest_for_local_day(&self, day: LocalDay) -> Result<Option<WeightEntry>> {
        let bounds = self.resolver.bounds(day);
        let mut events: Vec<WeightEvent> =
            self.store
                .query_range(bounds.start, bounds.end, Order::Descending, Some(1))?;

        Ok(events.pop().map(|event| WeightEntry::from_event(event, day)))
    }

    /// Latest weight for the current local day
    pub fn today_entry(&self) -> Result<Option<WeightEntry>> {
        self.latest_for_local_day(self.resolver.today())
    }

    /// Delete the most recent weight event across all history
    ///
    /// Returns `false` when the ledger is empty.
    pub fn undo_latest(&self) -> Result<bool> {
        let latest: Vec<WeightEvent> = self.store.most_recent(1)?;
        let Some(event) = latest.first() else {
            debug!("Weight undo requested on an empty ledger");
            return Ok(false);
        };

        Ok(self.store.delete_by_id::<WeightEvent>(event.id)?)
    }

    /// Most recent weight events, newest first, each placed on its local day
    pub fn list_recent(&self, limit: usize) -> Result<Vec<WeightEntry>> {
        let events: Vec<WeightEvent> = self.store.most_recent(limit)?;
        Ok(events
            .into_iter()
            .map(|event| {
                let day = self.resolver.to_local_day(event.created_at);
                WeightEntry::from_event(event, day)
            })
            .collect())
    }

    /// Delete a specific weight event
    pub fn remove(&self, id: i64) -> Result<()> {
        if self.store.delete_by_id::<WeightEvent>(id)? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("weight event {}", id)))
        }
    }

    /// See [`convert`]
    pub fn convert(value: f64, from: WeightUnit, to: WeightUnit) -> f64 {
        convert(value, from, to)
    }
}
