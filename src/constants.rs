//! Protocol constants for ELM327-class adapter communication.
//!
//! This module defines the constants used on the adapter link (framing bytes,
//! timing, init sequence) together with the vehicle-model defaults used by the
//! consumption aggregator.

/// Command terminator expected by the adapter
pub const LINE_TERMINATOR: u8 = b'\r';

/// Prompt byte marking the end of an adapter response
pub const PROMPT: u8 = b'>';

/// Baud rate (38400 bps, the common ELM327 default)
pub const BAUD_RATE: u32 = 38_400;

/// Gap between read attempts while waiting on a response, also used as the
/// serial port read timeout
pub const READ_GAP_MS: u64 = 50;

/// Deadline for each handshake command's complete response
pub const HANDSHAKE_TIMEOUT_MS: u64 = 2000;

/// Initialization sequence: reset, echo off, linefeeds off, automatic protocol
pub const DEFAULT_INIT_COMMANDS: [&str; 4] = ["ATZ", "ATE0", "ATL0", "ATSP0"];

/// Substring identifying a genuine adapter in the reset response
pub const ADAPTER_IDENT_MARKER: &str = "ELM327";

/// Interval between poll cycles
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Granularity at which a sleeping session re-checks for cancellation
pub const CANCEL_CHECK_MS: u64 = 50;

/// Gasoline density in g/L, used to derive fuel flow from mass air flow
pub const FUEL_DENSITY_G_PER_L: f32 = 750.0;

/// Fuel tank capacity in liters assumed for range estimation
pub const TANK_CAPACITY_L: f64 = 50.0;

/// Maximum number of samples kept in the rolling consumption window
pub const MAX_WINDOW_SAMPLES: usize = 1000;

/// Maximum distance in km accumulated in the rolling window before eviction
pub const MAX_WINDOW_DISTANCE_KM: f64 = 100.0;

/// Distance delta in km below which a cycle does not enter the window
pub const MIN_DISTANCE_DELTA_KM: f64 = 0.0001;

/// Fuel delta in liters below which a cycle does not enter the window
pub const MIN_FUEL_DELTA_L: f64 = 0.00001;

/// Distance in km the window must cover before a rolling average is reported
pub const MIN_AVERAGE_DISTANCE_KM: f64 = 0.01;

/// Average consumption in L/100km below which range estimation is suppressed
pub const MIN_RANGE_CONSUMPTION: f64 = 0.1;

/// Speed in km/h above which consumption is expressed per distance rather
/// than per hour
pub const MIN_MOVING_SPEED_KMH: f32 = 1.0;
