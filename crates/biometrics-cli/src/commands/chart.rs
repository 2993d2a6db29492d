//! Chart command handler

use anyhow::{Context, Result};

use biometrics_core::{Store, WeightUnit};

use crate::output::Output;

/// Largest window the chart command will build
pub const MAX_CHART_DAYS: u32 = 366;

/// Clamp a requested window to `1..=MAX_CHART_DAYS`
pub fn clamp_days(days: u32) -> u32 {
    days.clamp(1, MAX_CHART_DAYS)
}

/// Show one point per day for the trailing `days` days
pub fn show(store: &Store, days: u32, unit: Option<WeightUnit>, output: &Output) -> Result<()> {
    let days = clamp_days(days);
    let unit = unit.unwrap_or(store.config().display_unit);
    let today = store.today();

    let points = store
        .charts()
        .daily_series_through(today, days, unit)
        .context("Failed to build chart series")?;

    output.print_series(days, unit, today, &points)
}
