//! Core data types for vehicle telemetry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One poll cycle's readings, best-effort.
///
/// Built once per cycle by the poller and never mutated afterwards. Fields a
/// vehicle does not report (or that failed this cycle) stay at their defaults:
/// zero for speed and rpm, `None` for the optionals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock time the cycle started
    pub timestamp: DateTime<Utc>,
    /// Vehicle speed in km/h, never negative
    pub speed_kmh: f32,
    /// Engine speed in rpm, never negative
    pub rpm: i32,
    /// Fuel tank level in percent of capacity
    pub fuel_level_pct: Option<f32>,
    /// Fuel consumption rate in L/h, direct or derived from mass air flow
    pub fuel_rate_lph: Option<f32>,
    /// Engine coolant temperature in °C
    pub coolant_temp_c: Option<f32>,
}

impl Sample {
    /// Empty sample stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            speed_kmh: 0.0,
            rpm: 0,
            fuel_level_pct: None,
            fuel_rate_lph: None,
            coolant_temp_c: None,
        }
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one adapter initialization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Adapter accepted the full init sequence and is ready for queries
    Ready,
    /// Adapter rejected or ignored a command; polling must not start
    Failed {
        /// The init command that produced the failure
        command: String,
        /// Human-readable failure detail
        reason: String,
    },
}

/// Instantaneous fuel consumption, in the unit the current speed allows.
///
/// Below walking pace a per-distance figure diverges, so the raw hourly rate
/// is reported instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InstantConsumption {
    /// L/100km, reported while the vehicle is moving
    PerDistance(f32),
    /// L/h, reported while stationary or crawling
    PerHour(f32),
}

impl fmt::Display for InstantConsumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantConsumption::PerDistance(v) => write!(f, "{v:.1} L/100km"),
            InstantConsumption::PerHour(v) => write!(f, "{v:.1} L/h"),
        }
    }
}

/// Renderer-facing snapshot of one poll cycle plus the rolling aggregates.
///
/// `None` means "unknown" and renders as `--`; a session that has not covered
/// enough distance yet legitimately has no average or range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub timestamp: DateTime<Utc>,
    pub speed_kmh: f32,
    pub rpm: i32,
    pub fuel_level_pct: Option<f32>,
    pub coolant_temp_c: Option<f32>,
    /// This cycle's consumption, unit depending on speed
    pub instant_consumption: Option<InstantConsumption>,
    /// Rolling average over the recent window, in L/100km
    pub avg_consumption_l_100km: Option<f64>,
    /// Estimated remaining range in km at the rolling average
    pub range_km: Option<f64>,
}

impl fmt::Display for DisplayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:5.1} km/h | {:4} rpm | inst ", self.speed_kmh, self.rpm)?;
        match &self.instant_consumption {
            Some(c) => write!(f, "{c}")?,
            None => f.write_str("--")?,
        }
        f.write_str(" | avg ")?;
        match self.avg_consumption_l_100km {
            Some(v) => write!(f, "{v:.1} L/100km")?,
            None => f.write_str("--")?,
        }
        f.write_str(" | fuel ")?;
        match self.fuel_level_pct {
            Some(v) => write!(f, "{v:.1}%")?,
            None => f.write_str("--")?,
        }
        f.write_str(" | coolant ")?;
        match self.coolant_temp_c {
            Some(v) => write!(f, "{v:.1}°C")?,
            None => f.write_str("--")?,
        }
        f.write_str(" | range ")?;
        match self.range_km {
            Some(v) => write!(f, "{v:.0} km"),
            None => f.write_str("--"),
        }
    }
}
