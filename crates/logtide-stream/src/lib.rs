//! Live log stream core for logtide
//!
//! This crate provides the bounded event buffer, the connection status state
//! machine, frame decoding, and the supervisor that ties a streaming
//! transport to them.

mod buffer;
mod handle;
mod parser;
mod status;
mod supervisor;
mod transport;
mod websocket;

pub use buffer::{ArcLogEvent, DEFAULT_CAPACITY, LevelCounts, StreamBuffer};
pub use handle::{SessionView, SupervisorHandle};
pub use parser::{DecodeError, FrameDecoder};
pub use status::{InvalidTransition, StatusTracker};
pub use supervisor::{ConnectionSupervisor, StreamSession, SupervisorStats};
pub use transport::{
    Connection, SessionId, SessionSignal, SignalReceiver, SignalSender, Transport, TransportEvent,
};
pub use websocket::{DEFAULT_STREAM_URL, EndpointError, SUBJECT_PLACEHOLDER, WebSocketTransport};

// Re-export types used in our public API
pub use logtide_types::{ConnectionStatus, LogEvent, LogLevel, ProviderContext};
