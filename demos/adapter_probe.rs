//! Adapter Probe Example
//!
//! This example demonstrates the adapter initialization flow of the OBD
//! telemetry library:
//! - Listing and selecting serial ports
//! - Opening the adapter link
//! - Running the init sequence (reset, echo off, linefeeds off, protocol auto)
//! - Reporting whether the adapter is ready for parameter queries
//!
//! Usage:
//!   cargo run --example adapter_probe                  # Interactive mode
//!   cargo run --example adapter_probe -- COM3          # Specify port
//!   cargo run --example adapter_probe -- /dev/rfcomm0
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example adapter_probe
//!   RUST_LOG=trace cargo run --example adapter_probe   # Includes RX lines

use inquire::Select;
use log::info;
use obd_telemetry::{
    list_ports, open_serial, AdapterHandshake, HandshakeOutcome, LineChannel, Result,
};

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Selection cancelled: {}", e),
            )
        })?;

    // Extract just the port name (before " - ")
    let port_name = selection.split(" - ").next().unwrap().to_string();
    Ok(port_name)
}

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Get port name from command line argument or interactive selection
    let port_name = std::env::args()
        .nth(1)
        .map(Ok)
        .unwrap_or_else(|| select_port())?;

    info!("Opening adapter on {}...", port_name);
    let transport = open_serial(&port_name)?;
    let mut channel = LineChannel::new(transport);

    let handshake = AdapterHandshake::default();
    info!("Running init sequence: {:?}", handshake.commands);

    match handshake.run(&mut channel)? {
        HandshakeOutcome::Ready => {
            info!("✓ Adapter initialized and ready for parameter queries");
        }
        HandshakeOutcome::Failed { command, reason } => {
            info!("✗ Adapter failed on {}: {}", command, reason);
            info!("  Check wiring, ignition state, and that the port is an OBD adapter.");
        }
    }

    Ok(())
}
