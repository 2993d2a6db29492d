//! Unified storage interface
//!
//! The `Store` opens the event database described by a [`Config`], fixes the
//! day-bucketing zone, and hands out the ledgers and chart aggregator that
//! share it.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?;
//!
//! store.weight().record_measurement(70.0, WeightUnit::Kg)?;
//! store.water().record_event(0.25)?;
//!
//! let series = store.charts().daily_series(30, WeightUnit::Lb)?;
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::chart::ChartAggregator;
use crate::config::Config;
use crate::day::{DayResolver, LocalDay, LocalZone};
use crate::ledger::{WaterLedger, WeightLedger};
use crate::models::{WaterEvent, WeightEvent};
use crate::storage::EventStore;

/// Counts and on-disk footprint of the event database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub weight_events: u64,
    pub water_events: u64,
    pub database_path: Option<PathBuf>,
    /// Size of the database file plus its WAL, in bytes
    pub database_size: u64,
}

impl StoreStats {
    pub fn database_size_human(&self) -> String {
        format_bytes(self.database_size)
    }
}

/// Unified storage interface for biometrics
pub struct Store {
    events: Arc<EventStore>,
    weight: WeightLedger,
    water: WaterLedger,
    charts: ChartAggregator,
    config: Config,
}

impl Store {
    /// Open the store using configuration from the default location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    ///
    /// Creates the database on first run and performs the one-time legacy
    /// weight reconciliation; failure of either is fatal.
    pub fn open_with_config(config: Config) -> Result<Self> {
        let zone = config.zone()?;
        let path = config.sqlite_path();
        let events = EventStore::open(&path)
            .with_context(|| format!("Failed to open event database at {:?}", path))?;

        Ok(Self::assemble(events, zone, config))
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(zone: LocalZone) -> Result<Self> {
        let events = EventStore::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self::assemble(events, zone, Config::default()))
    }

    fn assemble(events: EventStore, zone: LocalZone, config: Config) -> Self {
        let events = Arc::new(events);
        let resolver = DayResolver::new(zone);
        let weight = WeightLedger::new(events.clone(), resolver);
        let water = WaterLedger::new(events.clone(), resolver);
        let charts = ChartAggregator::new(weight.clone(), water.clone());

        Self {
            events,
            weight,
            water,
            charts,
            config,
        }
    }

    pub fn weight(&self) -> &WeightLedger {
        &self.weight
    }

    pub fn water(&self) -> &WaterLedger {
        &self.water
    }

    pub fn charts(&self) -> &ChartAggregator {
        &self.charts
    }

    pub fn resolver(&self) -> DayResolver {
        self.weight.resolver()
    }

    /// Current local day in the configured zone
    pub fn today(&self) -> LocalDay {
        self.resolver().today()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let weight_events = self
            .events
            .count::<WeightEvent>()
            .context("Failed to count weight events")?;
        let water_events = self
            .events
            .count::<WaterEvent>()
            .context("Failed to count water events")?;

        let database_path = self.events.path().map(|p| p.to_path_buf());
        let database_size = database_path
            .as_ref()
            .map(|path| {
                let mut wal = path.clone().into_os_string();
                wal.push("-wal");
                file_size(path) + file_size(Path::new(&wal))
            })
            .unwrap_or(0);

        Ok(StoreStats {
            weight_events,
            water_events,
            database_path,
            database_size,
        })
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
