//! Status command handler

use anyhow::Result;

use biometrics_core::Store;

use crate::output::{Output, OutputFormat};

/// Show store location, event counts and today's summary
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.stats()?;
    let config = store.config();
    let today = store.today();
    let weight = store.weight().latest_for_local_day(today)?;
    let water = store.water().total_for_local_day(today)?;

    match output.format {
        OutputFormat::Json => {
            output.json(&serde_json::json!({
                "today": today,
                "timezone": store.resolver().zone().to_string(),
                "displayUnit": config.display_unit,
                "storage": stats,
                "summary": {
                    "weight": weight,
                    "waterLiters": water,
                }
            }))?;
        }
        OutputFormat::Quiet => {
            println!("{}\t{}", stats.weight_events, stats.water_events);
        }
        OutputFormat::Human => {
            println!("Biometrics Status");
            println!("=================");
            println!();
            println!("Storage:");
            if let Some(ref path) = stats.database_path {
                println!("  Database: {}", path.display());
            }
            println!("  Size:     {}", stats.database_size_human());
            println!();
            println!("Contents:");
            println!("  Weight events: {}", stats.weight_events);
            println!("  Water events:  {}", stats.water_events);
            println!();
            println!("Today ({}, {}):", today, store.resolver().zone());
            output.print_weight_day(today, weight.as_ref())?;
            output.print_water_day(today, water)?;
        }
    }

    Ok(())
}
