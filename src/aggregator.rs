//! Rolling fuel consumption aggregation.
//!
//! Integrates per-cycle speed and fuel rate into distance and volume totals
//! over a bounded recent-history window, then derives the dashboard metrics:
//! instantaneous consumption, rolling average, and remaining range. All
//! derived values are `Option` — "unknown" is a normal state for a vehicle
//! that has not moved yet or does not report a fuel level.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_WINDOW_DISTANCE_KM, MAX_WINDOW_SAMPLES, MIN_AVERAGE_DISTANCE_KM, MIN_DISTANCE_DELTA_KM,
    MIN_FUEL_DELTA_L, MIN_MOVING_SPEED_KMH, MIN_RANGE_CONSUMPTION, TANK_CAPACITY_L,
};
use crate::types::{DisplayRecord, InstantConsumption, Sample};

/// Bounds and vehicle parameters for the rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Maximum number of samples kept
    pub max_samples: usize,
    /// Maximum accumulated distance kept, in km
    pub max_window_distance_km: f64,
    /// Tank capacity used for range estimation, in liters
    pub tank_capacity_l: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_samples: MAX_WINDOW_SAMPLES,
            max_window_distance_km: MAX_WINDOW_DISTANCE_KM,
            tank_capacity_l: TANK_CAPACITY_L,
        }
    }
}

/// Bounded-window consumption aggregator.
///
/// Totals are maintained incrementally: each admitted sample adds its own
/// distance and fuel deltas, and eviction subtracts the same re-derived
/// deltas, so the window never needs a full rescan. The sample interval is
/// configuration, not measurement — cycle timing jitter does not perturb the
/// integration.
pub struct ConsumptionAggregator {
    config: AggregatorConfig,
    dt_hours: f64,
    window: VecDeque<Sample>,
    total_distance_km: f64,
    total_fuel_l: f64,
}

impl ConsumptionAggregator {
    pub fn new(config: AggregatorConfig, sample_interval: Duration) -> Self {
        Self {
            config,
            dt_hours: sample_interval.as_secs_f64() / 3600.0,
            window: VecDeque::new(),
            total_distance_km: 0.0,
            total_fuel_l: 0.0,
        }
    }

    /// Fold one sample into the window.
    ///
    /// Cycles that moved no measurable distance and burned no measurable fuel
    /// (idle at a red light, or a cycle with no data at all) are skipped
    /// entirely; they would only dilute the rolling average. Admission is
    /// followed by eviction from the oldest end until both window caps hold.
    pub fn ingest(&mut self, sample: &Sample) {
        let (d, f) = self.deltas(sample);
        if d > MIN_DISTANCE_DELTA_KM || f > MIN_FUEL_DELTA_L {
            self.window.push_back(sample.clone());
            self.total_distance_km += d;
            self.total_fuel_l += f;
        }

        while self.window.len() > self.config.max_samples
            || (self.total_distance_km > self.config.max_window_distance_km
                && !self.window.is_empty())
        {
            let Some(oldest) = self.window.pop_front() else {
                break;
            };
            let (d0, f0) = self.deltas(&oldest);
            // Clamp at zero so accumulated float error cannot push a total
            // negative.
            self.total_distance_km = (self.total_distance_km - d0).max(0.0);
            self.total_fuel_l = (self.total_fuel_l - f0).max(0.0);
        }
    }

    /// This cycle's consumption: per-distance while moving, raw hourly rate
    /// otherwise, unknown without a fuel rate.
    pub fn instant_consumption(sample: &Sample) -> Option<InstantConsumption> {
        match sample.fuel_rate_lph {
            Some(rate) if sample.speed_kmh > MIN_MOVING_SPEED_KMH && rate > 0.0 => {
                Some(InstantConsumption::PerDistance(rate / sample.speed_kmh * 100.0))
            }
            Some(rate) => Some(InstantConsumption::PerHour(rate)),
            None => None,
        }
    }

    /// Rolling average in L/100km, once the window covers enough distance to
    /// be meaningful.
    pub fn average_consumption(&self) -> Option<f64> {
        (self.total_distance_km > MIN_AVERAGE_DISTANCE_KM)
            .then(|| self.total_fuel_l / self.total_distance_km * 100.0)
    }

    /// Estimated remaining range in km at the rolling average.
    ///
    /// Suppressed near-zero averages would predict absurd ranges from a
    /// coasting stretch, so those report unknown too.
    pub fn estimated_range_km(&self, fuel_level_pct: Option<f32>) -> Option<f64> {
        let avg = self.average_consumption()?;
        let level = fuel_level_pct?;
        if avg <= MIN_RANGE_CONSUMPTION {
            return None;
        }
        let liters_left = self.config.tank_capacity_l * f64::from(level) / 100.0;
        Some(liters_left / avg * 100.0)
    }

    /// Assemble the renderer-facing record for one cycle.
    ///
    /// Call after [`ingest`](Self::ingest) so the rolling metrics include the
    /// cycle being displayed.
    pub fn display_record(&self, sample: &Sample) -> DisplayRecord {
        DisplayRecord {
            timestamp: sample.timestamp,
            speed_kmh: sample.speed_kmh,
            rpm: sample.rpm,
            fuel_level_pct: sample.fuel_level_pct,
            coolant_temp_c: sample.coolant_temp_c,
            instant_consumption: Self::instant_consumption(sample),
            avg_consumption_l_100km: self.average_consumption(),
            range_km: self.estimated_range_km(sample.fuel_level_pct),
        }
    }

    /// Drop all history; every metric reports unknown afterwards.
    pub fn reset(&mut self) {
        self.window.clear();
        self.total_distance_km = 0.0;
        self.total_fuel_l = 0.0;
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.window.iter()
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn total_fuel_l(&self) -> f64 {
        self.total_fuel_l
    }

    fn deltas(&self, sample: &Sample) -> (f64, f64) {
        let d = f64::from(sample.speed_kmh) * self.dt_hours;
        let f = f64::from(sample.fuel_rate_lph.unwrap_or(0.0)) * self.dt_hours;
        (d, f)
    }
}

impl Default for ConsumptionAggregator {
    fn default() -> Self {
        Self::new(
            AggregatorConfig::default(),
            Duration::from_millis(crate::constants::POLL_INTERVAL_MS),
        )
    }
}
