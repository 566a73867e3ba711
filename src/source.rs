//! Query seam to the diagnostic parameter command layer.

use crate::channel::LineChannel;
use crate::error::Result;
use crate::transport::Transport;

/// One operation per diagnostic parameter.
///
/// Implementations own the request encoding and response parsing for their
/// vehicle bus; this crate only consumes the parsed numeric results. Each
/// operation fails independently, and the poller decides which failures are
/// survivable. Implementations are handed an initialized [`LineChannel`] by a
/// [`SourceFactory`] once the adapter handshake has completed.
pub trait ParameterSource {
    /// Vehicle speed in km/h.
    fn speed_kmh(&mut self) -> Result<f32>;

    /// Engine speed in revolutions per minute.
    fn engine_rpm(&mut self) -> Result<i32>;

    /// Engine coolant temperature in °C.
    fn coolant_temp_c(&mut self) -> Result<f32>;

    /// Fuel tank level in percent of capacity.
    fn fuel_level_pct(&mut self) -> Result<f32>;

    /// Direct fuel consumption rate in L/h.
    fn fuel_rate_lph(&mut self) -> Result<f32>;

    /// Mass air flow in g/s, queried only as a fuel-rate fallback.
    fn mass_air_flow_gps(&mut self) -> Result<f32>;

    /// Whether the underlying link is still up.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Builds a [`ParameterSource`] over a channel that has completed its
/// handshake. Closures taking the channel implement this directly.
pub trait SourceFactory<T: Transport> {
    type Source: ParameterSource;

    fn build(self, channel: LineChannel<T>) -> Self::Source;
}

impl<T, S, F> SourceFactory<T> for F
where
    T: Transport,
    S: ParameterSource,
    F: FnOnce(LineChannel<T>) -> S,
{
    type Source = S;

    fn build(self, channel: LineChannel<T>) -> S {
        self(channel)
    }
}
