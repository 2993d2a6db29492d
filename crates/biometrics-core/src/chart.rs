//! Daily chart series
//!
//! Combines both ledgers into one point per local day over a trailing
//! window: the day's water total and its latest weight in the display unit.

use tracing::debug;

use crate::day::LocalDay;
use crate::error::{Error, Result};
use crate::ledger::{convert, WaterLedger, WeightLedger};
use crate::models::{DayPoint, WeightPoint, WeightUnit};

/// Upper bound on up-front allocation; longer windows grow as they fill
const PREALLOCATE_DAYS: u32 = 366;

/// Builds day-by-day series from the weight and water ledgers
#[derive(Clone)]
pub struct ChartAggregator {
    weight: WeightLedger,
    water: WaterLedger,
}

impl ChartAggregator {
    pub fn new(weight: WeightLedger, water: WaterLedger) -> Self {
        Self { weight, water }
    }

    /// `window_days` days ending today, oldest first
    pub fn daily_series(&self, window_days: u32, unit: WeightUnit) -> Result<Vec<DayPoint>> {
        let today = self.weight.resolver().today();
        self.daily_series_through(today, window_days, unit)
    }

    /// `window_days` days ending at and including `last_day`, oldest first
    pub fn daily_series_through(
        &self,
        last_day: LocalDay,
        window_days: u32,
        unit: WeightUnit,
    ) -> Result<Vec<DayPoint>> {
        debug!("Building {}-day series through {}", window_days, last_day);

        if window_days == 0 {
            return Ok(Vec::new());
        }

        let first_day = last_day
            .days_before(u64::from(window_days) - 1)
            .ok_or_else(|| {
                Error::validation(format!(
                    "a {}-day window ending {} starts before the earliest supported date",
                    window_days, last_day
                ))
            })?;

        let mut series = Vec::with_capacity(window_days.min(PREALLOCATE_DAYS) as usize);
        let mut day = first_day;
        loop {
            series.push(self.point_for(day, unit)?);
            if day == last_day {
                break;
            }
            day = match day.days_after(1) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(series)
    }

    fn point_for(&self, day: LocalDay, unit: WeightUnit) -> Result<DayPoint> {
        let water_liters = self.water.total_for_local_day(day)?;
        let weight = self
            .weight
            .latest_for_local_day(day)?
            .map(|entry| WeightPoint {
                value: convert(entry.value, entry.unit, unit),
                unit,
            });

        Ok(DayPoint {
            day,
            water_liters,
            weight,
        })
    }
}
