//! # OBD Telemetry Library
//!
//! A Rust library for turning ELM327-class OBD-II adapters into live fuel
//! economy telemetry. It owns the serial line discipline, the adapter
//! handshake, and a poll → aggregate → emit session loop that produces one
//! dashboard-ready record per second.
//!
//! ## Features
//!
//! - Line framing with prompt detection over any serial-like transport
//! - Configurable adapter initialization (reset, echo off, protocol auto)
//! - Per-cycle polling of speed, rpm, coolant, fuel level and fuel rate,
//!   with a mass-air-flow fallback for vehicles without a rate parameter
//! - Rolling fuel consumption window with instant/average/range metrics
//! - Background session with cooperative cancellation and ordered events
//! - Deterministic simulated vehicle for desk development
//!
//! ## Example
//!
//! ```no_run
//! use obd_telemetry::{ConsumptionAggregator, ParameterPoller, SimulatedSource};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut poller = ParameterPoller::new(SimulatedSource::new());
//!     let mut aggregator = ConsumptionAggregator::default();
//!     for _ in 0..60 {
//!         poller.source_mut().advance();
//!         let sample = poller.poll_cycle()?;
//!         aggregator.ingest(&sample);
//!         println!("{}", aggregator.display_record(&sample));
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod channel;
pub mod constants;
pub mod error;
pub mod handshake;
pub mod poller;
pub mod session;
pub mod sim;
pub mod source;
pub mod transport;
pub mod types;

pub use aggregator::{AggregatorConfig, ConsumptionAggregator};
pub use channel::{LineChannel, LineEvent};
pub use error::{ObdError, Result};
pub use handshake::AdapterHandshake;
pub use poller::ParameterPoller;
pub use session::{
    PollingSession, SessionConfig, SessionEnd, SessionEvent, SessionHandle, SessionState,
};
pub use sim::SimulatedSource;
pub use source::{ParameterSource, SourceFactory};
pub use transport::{list_ports, open_serial, Transport};
pub use types::*;
