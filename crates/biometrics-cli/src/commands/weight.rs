//! Weight command handlers

use anyhow::{Context, Result};

use biometrics_core::{Store, WeightUnit};

use crate::output::Output;

/// Record a measurement now and show today's entry
pub fn set(store: &Store, value: f64, unit: Option<WeightUnit>, output: &Output) -> Result<()> {
    let unit = unit.unwrap_or(store.config().display_unit);
    let id = store.weight().record_measurement(value, unit)?;
    tracing::debug!("Recorded weight event {}", id);

    today(store, output)
}

/// Show the latest weight of the current local day
pub fn today(store: &Store, output: &Output) -> Result<()> {
    let day = store.today();
    let entry = store
        .weight()
        .latest_for_local_day(day)
        .context("Failed to read today's weight")?;

    output.print_weight_day(day, entry.as_ref())
}

pub fn recent(store: &Store, limit: usize, output: &Output) -> Result<()> {
    let entries = store
        .weight()
        .list_recent(limit)
        .context("Failed to list weight entries")?;

    output.print_weight_entries(&entries)
}

/// Delete the most recent weight event, then show today's entry
pub fn undo(store: &Store, output: &Output) -> Result<()> {
    let deleted = store.weight().undo_latest()?;
    let day = store.today();
    let entry = store.weight().latest_for_local_day(day)?;

    if output.is_json() {
        return output.json(&serde_json::json!({
            "ok": true,
            "deleted": deleted,
            "today": day,
            "entry": entry,
        }));
    }

    if deleted {
        output.success("Removed the most recent weight entry");
    } else {
        output.message("Nothing to undo.");
    }
    output.print_weight_day(day, entry.as_ref())
}

/// Delete a weight event by id
pub fn remove(store: &Store, id: i64, output: &Output) -> Result<()> {
    store.weight().remove(id)?;
    output.success(&format!("Deleted weight entry #{}", id));
    Ok(())
}
