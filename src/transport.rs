//! Byte-stream contract the protocol layers run over.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortInfo};

use crate::constants::{BAUD_RATE, READ_GAP_MS};
use crate::error::Result;

/// Raw byte stream carrying the adapter link.
///
/// Serial is the usual carrier, but anything `Read + Write` works — Bluetooth
/// RFCOMM sockets look the same from here. Reads are expected to time out
/// after a short gap rather than block indefinitely, so deadline loops in the
/// layers above can make progress.
pub trait Transport: Read + Write + Send {
    /// Whether the link is still believed usable.
    fn is_connected(&self) -> bool;
}

impl Transport for Box<dyn SerialPort> {
    fn is_connected(&self) -> bool {
        // Querying the driver fails once the underlying device is gone.
        self.bytes_to_read().is_ok()
    }
}

/// Open a serial connection to an adapter with the crate's timing defaults.
pub fn open_serial(port_name: &str) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(port_name, BAUD_RATE)
        .timeout(Duration::from_millis(READ_GAP_MS))
        .open()?;
    Ok(port)
}

/// List available serial ports on this host.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    Ok(serialport::available_ports()?)
}
