//! Adapter initialization sequence.
//!
//! Before any parameter can be queried, an ELM-class adapter has to be reset
//! and configured: echo off so responses are not polluted with the command
//! text, linefeeds off so framing stays CR-only, and protocol autodetection so
//! the adapter finds the vehicle bus on its own. The sequence is fixed but
//! fully configurable for adapter quirks.

use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::channel::{LineChannel, LineEvent};
use crate::constants::{ADAPTER_IDENT_MARKER, DEFAULT_INIT_COMMANDS, HANDSHAKE_TIMEOUT_MS};
use crate::error::{ObdError, Result};
use crate::transport::Transport;
pub use crate::types::HandshakeOutcome;

/// Init command sequence and its validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterHandshake {
    /// Commands sent in order; the first is expected to be a reset
    pub commands: Vec<String>,
    /// Deadline for each command's complete response
    pub command_timeout: Duration,
    /// Substring expected (case-insensitively) in the reset response
    pub ident_marker: String,
}

impl Default for AdapterHandshake {
    fn default() -> Self {
        Self {
            commands: DEFAULT_INIT_COMMANDS.iter().map(|s| s.to_string()).collect(),
            command_timeout: Duration::from_millis(HANDSHAKE_TIMEOUT_MS),
            ident_marker: ADAPTER_IDENT_MARKER.to_string(),
        }
    }
}

impl AdapterHandshake {
    /// Run the init sequence on `channel`.
    ///
    /// Each command's response is accumulated until the adapter prompt or the
    /// per-command deadline; a deadline lapse with lines already received just
    /// ends that response, since slow adapters routinely omit or delay the
    /// prompt. An entirely empty response to any command fails the handshake:
    /// the adapter is absent, unpowered, or not talking our protocol, and
    /// polling must not start. Only transport-level errors return `Err`.
    pub fn run<T: Transport>(&self, channel: &mut LineChannel<T>) -> Result<HandshakeOutcome> {
        for (index, command) in self.commands.iter().enumerate() {
            channel.send(command)?;
            let response = self.collect_response(channel)?;
            debug!("init {command} -> {response:?}");

            if response.is_empty() {
                return Ok(HandshakeOutcome::Failed {
                    command: command.clone(),
                    reason: "empty response".to_string(),
                });
            }
            if index == 0 && !contains_ignore_case(&response, &self.ident_marker) {
                // Clones often skip the vendor banner; keep going but leave a
                // trace for when the link later misbehaves.
                warn!(
                    "reset response {response:?} does not identify an {} adapter",
                    self.ident_marker
                );
            }
        }
        Ok(HandshakeOutcome::Ready)
    }

    /// Lines received until the prompt or the per-command deadline, joined.
    fn collect_response<T: Transport>(&self, channel: &mut LineChannel<T>) -> Result<String> {
        let deadline = Instant::now() + self.command_timeout;
        let mut lines: Vec<String> = Vec::new();
        loop {
            match channel.read_line(deadline) {
                Ok(LineEvent::Line(text)) => {
                    if !text.is_empty() {
                        lines.push(text);
                    }
                }
                Ok(LineEvent::Prompt) => break,
                Err(ObdError::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(lines.join(" "))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}
