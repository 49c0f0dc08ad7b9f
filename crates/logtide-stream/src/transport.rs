use std::fmt;

use tokio::sync::mpsc;

/// Identifies one connection attempt. Increases with every `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle and data signals produced by a transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established
    Opened,
    /// One inbound text frame
    Frame(String),
    /// The connection failed and is unusable
    Error(String),
    /// The connection was closed by either side
    Closed,
}

/// A transport event tagged with the session that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSignal {
    pub session: SessionId,
    pub event: TransportEvent,
}

impl SessionSignal {
    pub fn new(session: SessionId, event: TransportEvent) -> Self {
        Self { session, event }
    }
}

pub type SignalSender = mpsc::UnboundedSender<SessionSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<SessionSignal>;

/// An open (or opening) connection
pub trait Connection: Send {
    /// Close the connection. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// Opens streaming connections for a subject.
///
/// `open` must not block: it issues the request and reports progress through
/// `signals`, tagging every signal with `session`.
pub trait Transport: Send {
    fn open(
        &mut self,
        session: SessionId,
        subject_id: &str,
        signals: SignalSender,
    ) -> Box<dyn Connection>;
}
