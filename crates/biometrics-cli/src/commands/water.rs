//! Water command handlers

use anyhow::{Context, Result};

use biometrics_core::Store;

use crate::output::Output;

/// Record a signed delta in liters
pub fn add(store: &Store, delta_liters: f64, output: &Output) -> Result<()> {
    let id = store.water().record_event(delta_liters)?;

    if output.is_json() {
        return output.json(&serde_json::json!({ "id": id }));
    }

    output.success(&format!("Recorded {:+} L (#{})", delta_liters, id));
    today(store, output)
}

/// Show the current local day's total
pub fn today(store: &Store, output: &Output) -> Result<()> {
    let day = store.today();
    let total = store
        .water()
        .total_for_local_day(day)
        .context("Failed to read today's water total")?;

    output.print_water_day(day, total)
}

pub fn recent(store: &Store, limit: usize, output: &Output) -> Result<()> {
    let entries = store
        .water()
        .list_recent(limit)
        .context("Failed to list water entries")?;

    output.print_water_entries(&entries)
}

/// Delete the most recent water event
pub fn undo(store: &Store, output: &Output) -> Result<()> {
    let outcome = store.water().undo_latest()?;

    if output.is_json() {
        return output.json(&outcome);
    }

    match outcome.id {
        Some(id) if outcome.undone => output.success(&format!("Removed water entry #{}", id)),
        _ => output.message("Nothing to undo."),
    }
    Ok(())
}

/// Delete a water event by id
pub fn remove(store: &Store, id: i64, output: &Output) -> Result<()> {
    store.water().remove(id)?;
    output.success(&format!("Deleted water entry #{}", id));
    Ok(())
}
