//! Dashboard Example
//!
//! This example runs the full telemetry pipeline against the simulated
//! vehicle, no adapter required:
//! - Poller querying the simulated source once per second
//! - Rolling consumption aggregation with instant/average/range metrics
//! - One dashboard line (or JSON record) per cycle
//!
//! Usage:
//!   cargo run --example dashboard                # 60 cycles, text output
//!   cargo run --example dashboard -- 300         # Number of cycles
//!   cargo run --example dashboard -- 300 --json  # One JSON record per line
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example dashboard

use std::thread;
use std::time::Duration;

use log::info;
use obd_telemetry::{ConsumptionAggregator, ParameterPoller, Result, SimulatedSource};

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let cycles: u32 = args
        .iter()
        .find_map(|a| a.parse().ok())
        .unwrap_or(60);

    info!("Simulated drive: {} cycles, 1 Hz", cycles);
    let mut poller = ParameterPoller::new(SimulatedSource::new());
    let mut aggregator = ConsumptionAggregator::default();

    for _ in 0..cycles {
        poller.source_mut().advance();
        let sample = poller.poll_cycle()?;
        aggregator.ingest(&sample);
        let record = aggregator.display_record(&sample);

        if json {
            if let Ok(line) = serde_json::to_string(&record) {
                println!("{}", line);
            }
        } else {
            println!("{}", record);
        }
        thread::sleep(Duration::from_secs(1));
    }

    info!(
        "Drive complete: {:.2} km and {:.3} L in the rolling window",
        aggregator.total_distance_km(),
        aggregator.total_fuel_l()
    );

    Ok(())
}
