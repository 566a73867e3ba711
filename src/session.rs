//! Polling session lifecycle.
//!
//! One background thread owns the transport for the whole session: it runs
//! the adapter handshake once, then loops poll → aggregate → emit until
//! cancelled or the transport dies. Results leave the thread as ordered,
//! non-blocking events on an mpsc channel; the consumer renders them in
//! whatever context it likes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use crate::aggregator::{AggregatorConfig, ConsumptionAggregator};
use crate::channel::LineChannel;
use crate::constants::{CANCEL_CHECK_MS, FUEL_DENSITY_G_PER_L, POLL_INTERVAL_MS};
use crate::error::{ObdError, Result};
use crate::handshake::AdapterHandshake;
use crate::poller::ParameterPoller;
use crate::source::SourceFactory;
use crate::transport::{open_serial, Transport};
use crate::types::{DisplayRecord, HandshakeOutcome};

/// Lifecycle of a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, not yet started
    Idle,
    /// Handshake in progress
    Connecting,
    /// Handshake done, polling about to start
    Ready,
    /// Poll loop running
    Polling,
    /// Terminal: cancelled, failed, or transport lost
    Disconnected,
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Stopped on request
    Cancelled,
    /// Adapter never became ready; polling did not start
    HandshakeFailed(String),
    /// Transport died mid-session
    Disconnected(String),
}

/// Events emitted by a running session, in order.
///
/// `Ended` is always the last event; nothing follows it.
#[derive(Debug)]
pub enum SessionEvent {
    /// Handshake completed, polling begins
    Ready,
    /// One display record per completed poll cycle
    Update(DisplayRecord),
    /// Terminal notice with the user-facing reason
    Ended(SessionEnd),
}

/// Tunables for a polling session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pause between poll cycles; also the aggregator's sample interval
    pub poll_interval: Duration,
    /// Fuel density handed to the poller's mass-air-flow fallback
    pub fuel_density_g_per_l: f32,
    pub handshake: AdapterHandshake,
    pub aggregator: AggregatorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            fuel_density_g_per_l: FUEL_DENSITY_G_PER_L,
            handshake: AdapterHandshake::default(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// One telemetry session over one exclusively-owned transport.
///
/// Ownership is the single-session guarantee: the transport moves into the
/// session, the session moves into its thread, and the transport is only
/// released (dropped, closing the port) when the session ends. Starting a
/// replacement session on the same device therefore requires tearing this
/// one down first — [`SessionHandle`] does that on drop.
pub struct PollingSession<T: Transport, F: SourceFactory<T>> {
    transport: T,
    make_source: F,
    config: SessionConfig,
    events: Sender<SessionEvent>,
    cancel: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
}

impl<T, F> PollingSession<T, F>
where
    T: Transport,
    F: SourceFactory<T>,
{
    /// Create a session over an already-open transport.
    ///
    /// The returned receiver sees every event the session will ever emit.
    pub fn new(transport: T, make_source: F, config: SessionConfig) -> (Self, Receiver<SessionEvent>) {
        let (events, receiver) = mpsc::channel();
        let session = Self {
            transport,
            make_source,
            config,
            events,
            cancel: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(SessionState::Idle)),
        };
        (session, receiver)
    }

    /// Run the session on the current thread until it ends.
    ///
    /// Returns `Ok(())` after a cooperative cancellation and `Err` when the
    /// handshake failed or the transport died; either way the terminal
    /// [`SessionEvent::Ended`] has been emitted before this returns.
    pub fn run(self) -> Result<()> {
        let Self {
            transport,
            make_source,
            config,
            events,
            cancel,
            state,
        } = self;

        set_state(&state, SessionState::Connecting);
        let mut channel = LineChannel::new(transport);

        let outcome = match config.handshake.run(&mut channel) {
            Ok(outcome) => outcome,
            Err(err) => {
                set_state(&state, SessionState::Disconnected);
                let _ = events.send(SessionEvent::Ended(SessionEnd::HandshakeFailed(
                    err.to_string(),
                )));
                return Err(err);
            }
        };
        if let HandshakeOutcome::Failed { command, reason } = outcome {
            warn!("handshake failed on {command}: {reason}");
            let err = ObdError::Handshake { command, reason };
            set_state(&state, SessionState::Disconnected);
            let _ = events.send(SessionEvent::Ended(SessionEnd::HandshakeFailed(
                err.to_string(),
            )));
            return Err(err);
        }

        set_state(&state, SessionState::Ready);
        let _ = events.send(SessionEvent::Ready);

        let source = make_source.build(channel);
        let mut poller =
            ParameterPoller::new(source).with_fuel_density(config.fuel_density_g_per_l);
        let mut aggregator =
            ConsumptionAggregator::new(config.aggregator.clone(), config.poll_interval);

        set_state(&state, SessionState::Polling);
        let end = loop {
            if cancel.load(Ordering::Relaxed) {
                break SessionEnd::Cancelled;
            }
            let sample = match poller.poll_cycle() {
                Ok(sample) => sample,
                Err(err) => {
                    set_state(&state, SessionState::Disconnected);
                    let _ = events.send(SessionEvent::Ended(SessionEnd::Disconnected(
                        err.to_string(),
                    )));
                    return Err(err);
                }
            };
            aggregator.ingest(&sample);
            // Fire-and-forget: a gone receiver must not stall polling.
            let _ = events.send(SessionEvent::Update(aggregator.display_record(&sample)));

            if !sleep_unless_cancelled(&cancel, config.poll_interval) {
                break SessionEnd::Cancelled;
            }
        };

        info!("session ended: {end:?}");
        set_state(&state, SessionState::Disconnected);
        let _ = events.send(SessionEvent::Ended(end));
        Ok(())
    }

    /// Run the session on a named background thread.
    pub fn spawn(self) -> Result<SessionHandle>
    where
        T: 'static,
        F: Send + 'static,
    {
        let cancel = Arc::clone(&self.cancel);
        let state = Arc::clone(&self.state);
        let thread = thread::Builder::new()
            .name("obd-session".to_string())
            .spawn(move || self.run())?;
        Ok(SessionHandle {
            cancel,
            state,
            thread: Some(thread),
        })
    }
}

impl<F> PollingSession<Box<dyn SerialPort>, F>
where
    F: SourceFactory<Box<dyn SerialPort>>,
{
    /// Open `port_name` with the crate's serial defaults and build a session
    /// over it.
    pub fn open(
        port_name: &str,
        make_source: F,
        config: SessionConfig,
    ) -> Result<(Self, Receiver<SessionEvent>)> {
        Ok(Self::new(open_serial(port_name)?, make_source, config))
    }
}

/// Owner handle for a background session thread.
///
/// Dropping the handle cancels the session and waits for its thread, so the
/// transport is guaranteed released once the handle is gone.
pub struct SessionHandle {
    cancel: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl SessionHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Request cooperative shutdown without waiting for it.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Cancel and wait for the session to unwind.
    ///
    /// Returns the session's terminal result: `Ok` for a clean cancellation,
    /// the underlying error when it ended by failing.
    pub fn stop(mut self) -> Result<()> {
        self.cancel();
        match self.thread.take() {
            Some(thread) => match thread.join() {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "session thread panicked",
                )
                .into()),
            },
            None => Ok(()),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn set_state(state: &Mutex<SessionState>, next: SessionState) {
    let mut current = state.lock().unwrap();
    if *current != next {
        info!("session state {:?} -> {next:?}", *current);
        *current = next;
    }
}

/// Sleep for `duration`, re-checking the cancel flag at a short granularity.
/// Returns false when cancellation cut the sleep short.
fn sleep_unless_cancelled(cancel: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(CANCEL_CHECK_MS)));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::source::ParameterSource;
    use crate::transport::testing::ScriptedTransport;

    /// Source with fixed readings, built by the factory closure after the
    /// handshake; ignores the channel it is given.
    struct StaticSource {
        speed: f32,
        rate: f32,
        cycles_before_death: Option<u32>,
    }

    impl StaticSource {
        fn cruising() -> Self {
            Self {
                speed: 100.0,
                rate: 8.0,
                cycles_before_death: None,
            }
        }
    }

    impl ParameterSource for StaticSource {
        fn speed_kmh(&mut self) -> Result<f32> {
            if let Some(left) = self.cycles_before_death.as_mut() {
                if *left == 0 {
                    return Err(ObdError::NotConnected);
                }
                *left -= 1;
            }
            Ok(self.speed)
        }

        fn engine_rpm(&mut self) -> Result<i32> {
            Ok(2800)
        }

        fn coolant_temp_c(&mut self) -> Result<f32> {
            Ok(90.0)
        }

        fn fuel_level_pct(&mut self) -> Result<f32> {
            Ok(55.0)
        }

        fn fuel_rate_lph(&mut self) -> Result<f32> {
            Ok(self.rate)
        }

        fn mass_air_flow_gps(&mut self) -> Result<f32> {
            Err(ObdError::Unsupported("mass air flow".into()))
        }
    }

    fn handshake_script() -> ScriptedTransport {
        ScriptedTransport::new(["ELM327 v1.5\r\r>", "OK\r>", "OK\r>", "OK\r>"])
    }

    fn fast_config() -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(5),
            handshake: AdapterHandshake {
                command_timeout: Duration::from_millis(20),
                ..AdapterHandshake::default()
            },
            ..SessionConfig::default()
        }
    }

    #[test]
    fn session_emits_ready_then_updates_then_ended() {
        let (session, events) = PollingSession::new(
            handshake_script(),
            |_channel| StaticSource::cruising(),
            fast_config(),
        );
        let handle = session.spawn().unwrap();

        let first = events.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(first, SessionEvent::Ready));

        let mut updates = 0;
        while updates < 3 {
            match events.recv_timeout(Duration::from_secs(2)).unwrap() {
                SessionEvent::Update(record) => {
                    assert_eq!(record.speed_kmh, 100.0);
                    assert_eq!(record.rpm, 2800);
                    updates += 1;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        handle.stop().unwrap();
        let mut saw_ended = false;
        while let Ok(event) = events.recv_timeout(Duration::from_secs(2)) {
            if let SessionEvent::Ended(end) = event {
                assert_eq!(end, SessionEnd::Cancelled);
                saw_ended = true;
                break;
            }
        }
        assert!(saw_ended, "no terminal event seen");
        assert!(events.try_recv().is_err(), "events after Ended");
    }

    #[test]
    fn handshake_failure_never_starts_polling() {
        // Empty response to the second command.
        let transport = ScriptedTransport::new(["ELM327 v1.5\r>", "\r>"]);
        let (session, events) = PollingSession::new(
            transport,
            |_channel| StaticSource::cruising(),
            fast_config(),
        );
        let err = session.run().unwrap_err();
        assert!(matches!(err, ObdError::Handshake { .. }));

        match events.recv().unwrap() {
            SessionEvent::Ended(SessionEnd::HandshakeFailed(reason)) => {
                assert!(reason.contains("ATE0"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(events.try_recv().is_err(), "events after Ended");
    }

    #[test]
    fn dead_transport_mid_session_ends_with_disconnected() {
        let (session, events) = PollingSession::new(
            handshake_script(),
            |_channel| StaticSource {
                cycles_before_death: Some(2),
                ..StaticSource::cruising()
            },
            fast_config(),
        );
        let err = session.run().unwrap_err();
        assert!(matches!(err, ObdError::NotConnected));

        let mut terminal = None;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Ended(end) = event {
                terminal = Some(end);
            }
        }
        assert!(matches!(terminal, Some(SessionEnd::Disconnected(_))));
    }

    #[test]
    fn state_reaches_disconnected_after_cancel() {
        let (session, _events) = PollingSession::new(
            handshake_script(),
            |_channel| StaticSource::cruising(),
            fast_config(),
        );
        let handle = session.spawn().unwrap();
        handle.cancel();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while handle.state() != SessionState::Disconnected {
            assert!(
                std::time::Instant::now() < deadline,
                "session never reached the terminal state"
            );
            thread::sleep(Duration::from_millis(1));
        }
        handle.stop().unwrap();
    }

    #[test]
    fn dropping_the_handle_tears_the_session_down() {
        let (session, events) = PollingSession::new(
            handshake_script(),
            |_channel| StaticSource::cruising(),
            fast_config(),
        );
        let handle = session.spawn().unwrap();
        assert!(matches!(
            events.recv_timeout(Duration::from_secs(2)).unwrap(),
            SessionEvent::Ready
        ));
        drop(handle);
        // Drop joined the thread, so the terminal event is already queued.
        let mut saw_ended = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::Ended(SessionEnd::Cancelled)) {
                saw_ended = true;
            }
        }
        assert!(saw_ended);
    }

    #[test]
    fn gone_receiver_does_not_stall_the_session() {
        let (session, events) = PollingSession::new(
            handshake_script(),
            |_channel| StaticSource::cruising(),
            fast_config(),
        );
        drop(events);
        let handle = session.spawn().unwrap();
        thread::sleep(Duration::from_millis(30));
        handle.stop().unwrap();
    }
}
