//! Day command handler

use anyhow::Result;
use serde_json::json;

use biometrics_core::{LocalDay, Store};

use crate::output::{Output, OutputFormat};

/// Show the UTC bounds of a local day with its water total and latest weight
pub fn show(store: &Store, day: &str, output: &Output) -> Result<()> {
    let local_day: LocalDay = day.parse()?;
    let bounds = store.resolver().bounds(local_day);
    let water = store.water().total_for_local_day(local_day)?;
    let weight = store.weight().latest_for_local_day(local_day)?;

    match output.format {
        OutputFormat::Json => output.json(&json!({
            "day": local_day,
            "timezone": store.resolver().zone().to_string(),
            "startUtc": bounds.start,
            "endUtc": bounds.end,
            "waterLiters": water,
            "weight": weight,
        }))?,
        OutputFormat::Quiet => {
            println!("{}\t{}", bounds.start.to_rfc3339(), bounds.end.to_rfc3339());
        }
        OutputFormat::Human => {
            println!("Day {} ({})", local_day, store.resolver().zone());
            println!("  Start: {}", bounds.start.to_rfc3339());
            println!("  End:   {}", bounds.end.to_rfc3339());
            println!();
            output.print_water_day(local_day, water)?;
            output.print_weight_day(local_day, weight.as_ref())?;
        }
    }

    Ok(())
}
