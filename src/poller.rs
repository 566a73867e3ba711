//! Per-cycle parameter polling.

use log::debug;

use crate::constants::FUEL_DENSITY_G_PER_L;
use crate::error::{ObdError, Result};
use crate::source::ParameterSource;
use crate::types::Sample;

/// Polls one [`Sample`] per cycle from a [`ParameterSource`].
///
/// A cycle queries speed, rpm, coolant temperature, fuel level and fuel rate
/// in that fixed order, falling back to a mass-air-flow derivation when the
/// vehicle has no direct fuel rate parameter. Individual query failures leave
/// the affected field at its default and the cycle still produces a sample;
/// only a lost transport aborts.
pub struct ParameterPoller<S: ParameterSource> {
    source: S,
    fuel_density_g_per_l: f32,
}

impl<S: ParameterSource> ParameterPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            fuel_density_g_per_l: FUEL_DENSITY_G_PER_L,
        }
    }

    /// Override the fuel density used for the mass-air-flow fallback
    /// (diesel burns denser than gasoline).
    pub fn with_fuel_density(mut self, grams_per_liter: f32) -> Self {
        self.fuel_density_g_per_l = grams_per_liter;
        self
    }

    /// Run one full query cycle.
    ///
    /// Returns `Err` only when the transport is gone: a not-connected report
    /// before the cycle, or any fatal error mid-cycle. Everything else
    /// degrades to missing fields on the returned sample.
    pub fn poll_cycle(&mut self) -> Result<Sample> {
        if !self.source.is_connected() {
            return Err(ObdError::NotConnected);
        }

        let mut sample = Sample::new();
        if let Some(v) = optional("speed", self.source.speed_kmh())? {
            sample.speed_kmh = v.max(0.0);
        }
        if let Some(v) = optional("rpm", self.source.engine_rpm())? {
            sample.rpm = v.max(0);
        }
        if let Some(v) = optional("coolant temp", self.source.coolant_temp_c())? {
            sample.coolant_temp_c = Some(v);
        }
        if let Some(v) = optional("fuel level", self.source.fuel_level_pct())? {
            sample.fuel_level_pct = Some(v.clamp(0.0, 100.0));
        }
        sample.fuel_rate_lph = self.poll_fuel_rate()?;
        Ok(sample)
    }

    /// Direct fuel rate when the vehicle reports one, otherwise derived from
    /// mass air flow via the configured density. `None` when neither works.
    fn poll_fuel_rate(&mut self) -> Result<Option<f32>> {
        if let Some(rate) = optional("fuel rate", self.source.fuel_rate_lph())? {
            return Ok(Some(rate.max(0.0)));
        }
        match optional("mass air flow", self.source.mass_air_flow_gps())? {
            Some(maf) => Ok(Some((maf.max(0.0) * 3600.0) / self.fuel_density_g_per_l)),
            None => Ok(None),
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

/// Soft failures become `None`; fatal errors propagate.
fn optional<T>(label: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("{label} query failed: {e}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// How one parameter answers, reusable across cycles.
    #[derive(Clone, Copy)]
    enum Reply {
        Value(f32),
        SoftFail,
        Dead,
    }

    impl Reply {
        fn resolve(self) -> Result<f32> {
            match self {
                Reply::Value(v) => Ok(v),
                Reply::SoftFail => Err(ObdError::Timeout),
                Reply::Dead => Err(ObdError::NotConnected),
            }
        }
    }

    struct FakeSource {
        speed: Reply,
        rpm: Reply,
        coolant: Reply,
        level: Reply,
        rate: Reply,
        maf: Reply,
        connected: bool,
    }

    impl FakeSource {
        fn healthy() -> Self {
            Self {
                speed: Reply::Value(90.0),
                rpm: Reply::Value(2500.0),
                coolant: Reply::Value(88.0),
                level: Reply::Value(60.0),
                rate: Reply::Value(7.2),
                maf: Reply::Value(10.0),
                connected: true,
            }
        }
    }

    impl ParameterSource for FakeSource {
        fn speed_kmh(&mut self) -> Result<f32> {
            self.speed.resolve()
        }

        fn engine_rpm(&mut self) -> Result<i32> {
            self.rpm.resolve().map(|v| v as i32)
        }

        fn coolant_temp_c(&mut self) -> Result<f32> {
            self.coolant.resolve()
        }

        fn fuel_level_pct(&mut self) -> Result<f32> {
            self.level.resolve()
        }

        fn fuel_rate_lph(&mut self) -> Result<f32> {
            self.rate.resolve()
        }

        fn mass_air_flow_gps(&mut self) -> Result<f32> {
            self.maf.resolve()
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn healthy_cycle_fills_every_field() {
        let mut poller = ParameterPoller::new(FakeSource::healthy());
        let sample = poller.poll_cycle().unwrap();
        assert_eq!(sample.speed_kmh, 90.0);
        assert_eq!(sample.rpm, 2500);
        assert_eq!(sample.coolant_temp_c, Some(88.0));
        assert_eq!(sample.fuel_level_pct, Some(60.0));
        assert_eq!(sample.fuel_rate_lph, Some(7.2));
    }

    #[test]
    fn failed_rpm_leaves_default_and_cycle_completes() {
        let mut source = FakeSource::healthy();
        source.rpm = Reply::SoftFail;
        let mut poller = ParameterPoller::new(source);
        let sample = poller.poll_cycle().unwrap();
        assert_eq!(sample.rpm, 0);
        assert_eq!(sample.speed_kmh, 90.0);
        assert_eq!(sample.fuel_level_pct, Some(60.0));
    }

    #[test]
    fn maf_fallback_derives_fuel_rate() {
        let mut source = FakeSource::healthy();
        source.rate = Reply::SoftFail;
        source.maf = Reply::Value(10.0);
        let mut poller = ParameterPoller::new(source);
        let sample = poller.poll_cycle().unwrap();
        // 10 g/s * 3600 / 750 g/L = 48 L/h
        let rate = sample.fuel_rate_lph.unwrap();
        assert!((rate - 48.0).abs() < 1e-4);
    }

    #[test]
    fn maf_is_not_queried_when_fuel_rate_works() {
        let mut source = FakeSource::healthy();
        source.maf = Reply::Dead;
        let mut poller = ParameterPoller::new(source);
        // Would abort if the fallback were queried anyway.
        let sample = poller.poll_cycle().unwrap();
        assert_eq!(sample.fuel_rate_lph, Some(7.2));
    }

    #[test]
    fn rate_stays_unknown_when_both_paths_fail() {
        let mut source = FakeSource::healthy();
        source.rate = Reply::SoftFail;
        source.maf = Reply::SoftFail;
        let mut poller = ParameterPoller::new(source);
        let sample = poller.poll_cycle().unwrap();
        assert_eq!(sample.fuel_rate_lph, None);
    }

    #[test]
    fn custom_density_changes_the_derivation() {
        let mut source = FakeSource::healthy();
        source.rate = Reply::SoftFail;
        source.maf = Reply::Value(10.0);
        let mut poller = ParameterPoller::new(source).with_fuel_density(832.0);
        let rate = poller.poll_cycle().unwrap().fuel_rate_lph.unwrap();
        assert!((rate - 10.0 * 3600.0 / 832.0).abs() < 1e-4);
    }

    #[test]
    fn disconnected_source_aborts_before_querying() {
        let mut source = FakeSource::healthy();
        source.connected = false;
        let mut poller = ParameterPoller::new(source);
        assert!(matches!(poller.poll_cycle(), Err(ObdError::NotConnected)));
    }

    #[test]
    fn fatal_error_mid_cycle_aborts() {
        let mut source = FakeSource::healthy();
        source.coolant = Reply::Dead;
        let mut poller = ParameterPoller::new(source);
        assert!(matches!(poller.poll_cycle(), Err(ObdError::NotConnected)));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut source = FakeSource::healthy();
        source.speed = Reply::Value(-3.0);
        source.level = Reply::Value(112.0);
        source.rate = Reply::Value(-1.0);
        let mut poller = ParameterPoller::new(source);
        let sample = poller.poll_cycle().unwrap();
        assert_eq!(sample.speed_kmh, 0.0);
        assert_eq!(sample.fuel_level_pct, Some(100.0));
        assert_eq!(sample.fuel_rate_lph, Some(0.0));
    }
}
