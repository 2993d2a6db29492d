//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use biometrics_core::{DayPoint, LocalDay, WaterEntry, WeightEntry, WeightUnit};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{}", text);
        Ok(())
    }

    /// Print the latest weight of a day
    pub fn print_weight_day(&self, day: LocalDay, entry: Option<&WeightEntry>) -> Result<()> {
        match self.format {
            OutputFormat::Human => match entry {
                Some(entry) => println!(
                    "{}: {} {}  (#{}, recorded {})",
                    day,
                    format_weight(entry.value),
                    entry.unit,
                    entry.id,
                    entry.created_at.format("%H:%M UTC")
                ),
                None => println!("{}: no weight recorded", day),
            },
            OutputFormat::Json => self.json(&json!({ "today": day, "entry": entry }))?,
            OutputFormat::Quiet => {
                if let Some(entry) = entry {
                    println!("{} {}", format_weight(entry.value), entry.unit);
                }
            }
        }
        Ok(())
    }

    /// Print a list of weight entries, newest first
    pub fn print_weight_entries(&self, entries: &[WeightEntry]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No weight entries found.");
                    return Ok(());
                }
                for entry in entries {
                    println!(
                        "{:>6} | {} | {:>8} {} | {}",
                        entry.id,
                        entry.day,
                        format_weight(entry.value),
                        entry.unit,
                        entry.created_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
                println!("\n{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => self.json(&json!({ "items": entries }))?,
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
        Ok(())
    }

    /// Print a day's water total
    pub fn print_water_day(&self, day: LocalDay, total_liters: f64) -> Result<()> {
        match self.format {
            OutputFormat::Human => println!("{}: {} L", day, format_liters(total_liters)),
            OutputFormat::Json => {
                self.json(&json!({ "today": day, "totalLiters": total_liters }))?
            }
            OutputFormat::Quiet => println!("{}", format_liters(total_liters)),
        }
        Ok(())
    }

    /// Print a list of water entries, newest first
    pub fn print_water_entries(&self, entries: &[WaterEntry]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No water entries found.");
                    return Ok(());
                }
                for entry in entries {
                    println!(
                        "{:>6} | {} | {:>7} L | {}",
                        entry.id,
                        entry.day,
                        format_liters(entry.delta_liters),
                        entry.created_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
                println!("\n{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => self.json(&json!({ "items": entries }))?,
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
        Ok(())
    }

    /// Print a daily chart series
    pub fn print_series(
        &self,
        days: u32,
        unit: WeightUnit,
        today: LocalDay,
        points: &[DayPoint],
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("{:<10}  {:>8}  {:>10}", "day", "water", "weight");
                for point in points {
                    let weight = point
                        .weight
                        .map(|w| format!("{} {}", format_weight(w.value), w.unit))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}  {:>6} L  {:>10}",
                        point.day,
                        format_liters(point.water_liters),
                        weight
                    );
                }
            }
            OutputFormat::Json => self.json(&json!({
                "days": days,
                "unit": unit,
                "today": today,
                "items": points,
            }))?,
            OutputFormat::Quiet => {
                for point in points {
                    let weight = point
                        .weight
                        .map(|w| format_weight(w.value))
                        .unwrap_or_default();
                    println!("{}\t{}\t{}", point.day, format_liters(point.water_liters), weight);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Weight with one decimal place
fn format_weight(value: f64) -> String {
    format!("{:.1}", value)
}

/// Liters with up to three decimals, trailing zeros trimmed
fn format_liters(value: f64) -> String {
    let text = format!("{:.3}", value);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_format_liters() {
        assert_eq!(format_liters(0.75), "0.75");
        assert_eq!(format_liters(2.0), "2");
        assert_eq!(format_liters(-0.25), "-0.25");
        assert_eq!(format_liters(0.0), "0");
        assert_eq!(format_liters(1.23456), "1.235");
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(70.0), "70.0");
        assert_eq!(format_weight(154.32), "154.3");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural_y(1), "y");
        assert_eq!(plural_y(0), "ies");
        assert_eq!(plural_y(3), "ies");
    }
}
