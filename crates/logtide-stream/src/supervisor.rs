use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use logtide_types::{ConnectionStatus, ProviderContext};

use crate::buffer::{ArcLogEvent, StreamBuffer};
use crate::parser::FrameDecoder;
use crate::status::StatusTracker;
use crate::transport::{
    Connection, SessionId, SessionSignal, SignalSender, Transport, TransportEvent,
};

/// One connection attempt and the metadata shown alongside it
#[derive(Clone, Debug, PartialEq)]
pub struct StreamSession {
    pub id: SessionId,

    /// Identifier the stream endpoint is addressed by
    pub subject_id: String,

    /// Source metadata from the provider exchange, if known
    pub provider_context: Option<ProviderContext>,

    pub started_at: DateTime<Utc>,

    /// Most recent transport failure
    pub last_error: Option<String>,
}

/// Per-session frame counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Frames received from the transport
    pub received: u64,
    /// Events committed to the buffer
    pub accepted: u64,
    /// Decoded events discarded because ingestion was paused
    pub dropped_while_paused: u64,
    /// Frames that failed to decode
    pub decode_failures: u64,
}

/// Owns one streaming session at a time.
///
/// Transport signals and user commands are applied in the order they are
/// handed in; the supervisor itself never blocks or spawns.
pub struct ConnectionSupervisor<T: Transport> {
    transport: T,
    buffer: StreamBuffer,
    status: StatusTracker,
    signals: SignalSender,

    session: Option<StreamSession>,

    /// Present while the current session's connection is live
    connection: Option<Box<dyn Connection>>,

    /// Ingestion gate
    paused: bool,

    stats: SupervisorStats,
    last_session: u64,
}

impl<T: Transport> ConnectionSupervisor<T> {
    /// Create a supervisor. Transport signals are delivered to the receiving
    /// end of `signals` and must be fed back through [`Self::handle_signal`].
    pub fn new(transport: T, buffer: StreamBuffer, signals: SignalSender) -> Self {
        Self {
            transport,
            buffer,
            status: StatusTracker::new(),
            signals,
            session: None,
            connection: None,
            paused: false,
            stats: SupervisorStats::default(),
            last_session: 0,
        }
    }

    /// Start a session for `subject_id`, tearing down any previous one
    pub fn start(&mut self, subject_id: &str) {
        self.start_with_context(subject_id, None);
    }

    /// Start a session carrying provider metadata
    pub fn start_with_context(
        &mut self,
        subject_id: &str,
        provider_context: Option<ProviderContext>,
    ) {
        self.stop();

        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            warn!("cannot start a stream session without a subject identifier");
            let _ = self.status.transition(ConnectionStatus::Error);
            return;
        }

        self.last_session += 1;
        let id = SessionId(self.last_session);
        info!(session = %id, subject = subject_id, "starting stream session");

        self.session = Some(StreamSession {
            id,
            subject_id: subject_id.to_string(),
            provider_context,
            started_at: Utc::now(),
            last_error: None,
        });
        let _ = self.status.transition(ConnectionStatus::Connecting);
        self.connection = Some(self.transport.open(id, subject_id, self.signals.clone()));
    }

    /// Stop committing events to the buffer. The connection stays open.
    pub fn pause(&mut self) {
        if !self.paused {
            debug!("ingestion paused");
            self.paused = true;
        }
    }

    /// Resume committing events to the buffer
    pub fn resume(&mut self) {
        if self.paused {
            debug!("ingestion resumed");
            self.paused = false;
        }
    }

    /// Close the connection, clear the buffer and reset status. Idempotent.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            info!(session = %session.id, "stopping stream session");
        }
        self.close_connection();
        self.buffer.clear();
        self.stats = SupervisorStats::default();
        self.status.reset();
    }

    /// Apply one transport signal. Signals from earlier or ended sessions
    /// are ignored.
    pub fn handle_signal(&mut self, signal: SessionSignal) {
        if !self.is_live(signal.session) {
            trace!(session = %signal.session, "ignoring signal from inactive session");
            return;
        }

        match signal.event {
            TransportEvent::Opened => {
                let _ = self.status.transition(ConnectionStatus::Connected);
            }
            TransportEvent::Frame(frame) => self.ingest(signal.session, &frame),
            TransportEvent::Error(reason) => {
                warn!(session = %signal.session, %reason, "stream transport failed");
                if let Some(session) = self.session.as_mut() {
                    session.last_error = Some(reason);
                }
                self.close_connection();
                let _ = self.status.transition(ConnectionStatus::Error);
            }
            TransportEvent::Closed => {
                debug!(session = %signal.session, "stream closed");
                self.close_connection();
                let _ = self.status.transition(ConnectionStatus::Disconnected);
            }
        }
    }

    fn ingest(&mut self, session: SessionId, frame: &str) {
        self.stats.received += 1;

        let event = match FrameDecoder::decode(frame, Utc::now()) {
            Ok(event) => event,
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!(%session, error = %e, "dropping malformed frame");
                return;
            }
        };

        if self.paused {
            self.stats.dropped_while_paused += 1;
            return;
        }

        self.buffer.push(event);
        self.stats.accepted += 1;
    }

    fn is_live(&self, id: SessionId) -> bool {
        self.connection.is_some() && self.session.as_ref().is_some_and(|s| s.id == id)
    }

    fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Buffered events, newest first
    pub fn snapshot(&self) -> Vec<ArcLogEvent> {
        self.buffer.snapshot()
    }

    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }
}

impl<T: Transport> Drop for ConnectionSupervisor<T> {
    fn drop(&mut self) {
        self.close_connection();
    }
}
