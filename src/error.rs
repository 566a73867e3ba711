//! Error types for OBD telemetry operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ObdError>;

#[derive(Error, Debug)]
pub enum ObdError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Communication timeout")]
    Timeout,

    #[error("Transport not connected")]
    NotConnected,

    #[error("Handshake failed on {command}: {reason}")]
    Handshake { command: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported parameter: {0}")]
    Unsupported(String),
}

impl ObdError {
    /// True when the error reflects a lost or broken transport rather than a
    /// single failed query. Fatal errors end the session; the rest leave one
    /// field unset and the cycle continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ObdError::SerialPort(_) | ObdError::Io(_) | ObdError::NotConnected
        )
    }
}
