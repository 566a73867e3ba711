//! Line framing over a raw adapter transport.
//!
//! ELM-class adapters speak a line protocol: commands end with a single
//! carriage return, responses arrive as CR-delimited lines, and a `>` prompt
//! marks the adapter ready for the next command. This module turns the raw
//! byte stream into those events without owning any protocol policy.

use std::io;
use std::time::Instant;

use log::{debug, trace};

use crate::constants::{LINE_TERMINATOR, PROMPT};
use crate::error::{ObdError, Result};
use crate::transport::Transport;

/// One framing event read off the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete terminator-delimited line, decoded and trimmed
    Line(String),
    /// The adapter's prompt: the current response is complete
    Prompt,
}

/// Framed line channel over a [`Transport`].
///
/// Bytes that arrive past what a read consumed are carried over to the next
/// call, so responses split across transport reads reassemble correctly.
pub struct LineChannel<T: Transport> {
    transport: T,
    buf: Vec<u8>,
}

impl<T: Transport> LineChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buf: Vec::new(),
        }
    }

    /// Send one command, terminated with a single carriage return.
    ///
    /// Unconsumed bytes from the previous exchange are dropped first so a
    /// stale response cannot be read as the reply to this command. Blocks
    /// only for the transport hand-off, never for a response.
    pub fn send(&mut self, command: &str) -> Result<()> {
        self.buf.clear();
        debug!("TX {command}");
        self.transport.write_all(command.as_bytes())?;
        self.transport.write_all(&[LINE_TERMINATOR])?;
        self.transport.flush()?;
        Ok(())
    }

    /// Read the next line or prompt, waiting until `deadline` at most.
    ///
    /// Short transport timeouts are retried until the deadline; only then
    /// does the call fail with [`ObdError::Timeout`]. A transport read of
    /// zero bytes means the peer is gone and maps to
    /// [`ObdError::NotConnected`].
    pub fn read_line(&mut self, deadline: Instant) -> Result<LineEvent> {
        loop {
            if let Some(event) = self.take_buffered() {
                if let LineEvent::Line(text) = &event {
                    trace!("RX {text:?}");
                }
                return Ok(event);
            }
            if Instant::now() >= deadline {
                return Err(ObdError::Timeout);
            }
            let mut chunk = [0u8; 128];
            match self.transport.read(&mut chunk) {
                Ok(0) => return Err(ObdError::NotConnected),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) =>
                {
                    // Transport read gap elapsed; loop re-checks the deadline.
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Whether the transport still looks alive.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Give the transport back, discarding any buffered bytes.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Next complete event already sitting in the carry-over buffer.
    ///
    /// A prompt preceded by pending text yields the text first; the prompt
    /// stays queued for the following call.
    fn take_buffered(&mut self) -> Option<LineEvent> {
        let pos = self
            .buf
            .iter()
            .position(|&b| b == LINE_TERMINATOR || b == PROMPT)?;
        if self.buf[pos] == LINE_TERMINATOR {
            let line = decode(&self.buf[..pos]);
            self.buf.drain(..=pos);
            Some(LineEvent::Line(line))
        } else {
            let text = decode(&self.buf[..pos]);
            if text.is_empty() {
                self.buf.drain(..=pos);
                Some(LineEvent::Prompt)
            } else {
                self.buf.drain(..pos);
                Some(LineEvent::Line(text))
            }
        }
    }
}

/// Lossy-decode one raw line, stripping NUL padding and surrounding
/// whitespace. Cheap adapters pad with NULs and echo stray linefeeds.
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}
