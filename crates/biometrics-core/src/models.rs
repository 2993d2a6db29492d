//! Data models for biometrics
//!
//! Defines the stored events (weight, water) and the read-side shapes the
//! ledgers and the chart aggregator hand back. Events are never mutated
//! after creation; they only carry a UTC instant, the local day is derived
//! on read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::day::LocalDay;
use crate::error::Error;

/// Unit a weight measurement was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kg" => Ok(WeightUnit::Kg),
            "lb" => Ok(WeightUnit::Lb),
            other => Err(Error::Validation(format!(
                "unit must be \"kg\" or \"lb\", got \"{}\"",
                other
            ))),
        }
    }
}

impl ToSql for WeightUnit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for WeightUnit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// A single recorded body-weight measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEvent {
    /// Insertion-order identifier, never reused
    pub id: i64,
    pub value: f64,
    pub unit: WeightUnit,
    pub created_at: DateTime<Utc>,
}

/// A single signed water-intake delta, in liters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterEvent {
    pub id: i64,
    pub delta_liters: f64,
    pub created_at: DateTime<Utc>,
}

/// A weight event placed on a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub id: i64,
    pub day: LocalDay,
    pub value: f64,
    pub unit: WeightUnit,
    pub created_at: DateTime<Utc>,
}

impl WeightEntry {
    pub(crate) fn from_event(event: WeightEvent, day: LocalDay) -> Self {
        Self {
            id: event.id,
            day,
            value: event.value,
            unit: event.unit,
            created_at: event.created_at,
        }
    }
}

/// A water event placed on a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterEntry {
    pub id: i64,
    pub day: LocalDay,
    pub delta_liters: f64,
    pub created_at: DateTime<Utc>,
}

impl WaterEntry {
    pub(crate) fn from_event(event: WaterEvent, day: LocalDay) -> Self {
        Self {
            id: event.id,
            day,
            delta_liters: event.delta_liters,
            created_at: event.created_at,
        }
    }
}

/// Result of undoing the most recent water event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoOutcome {
    pub undone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl UndoOutcome {
    pub fn nothing() -> Self {
        Self {
            undone: false,
            id: None,
        }
    }

    pub fn removed(id: i64) -> Self {
        Self {
            undone: true,
            id: Some(id),
        }
    }
}

/// A weight value expressed in the chart's display unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightPoint {
    pub value: f64,
    pub unit: WeightUnit,
}

/// One day of the chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPoint {
    pub day: LocalDay,
    pub water_liters: f64,
    pub weight: Option<WeightPoint>,
}
