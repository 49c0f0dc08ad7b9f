use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::transport::{
    Connection, SessionId, SessionSignal, SignalSender, Transport, TransportEvent,
};

/// Placeholder replaced by the subject identifier in endpoint templates
pub const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Default endpoint template
pub const DEFAULT_STREAM_URL: &str = "ws://127.0.0.1:8080/ws/logs/{subject}";

const SUBJECT_MARKER: &str = "__logtide_subject__";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Problems building the endpoint URL
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("stream URL must use ws:// or wss://, got {0}://")]
    UnsupportedScheme(String),

    #[error("stream URL cannot carry a path")]
    CannotBeABase,
}

/// Streams frames from a WebSocket endpoint addressed by subject
#[derive(Clone, Debug)]
pub struct WebSocketTransport {
    /// Endpoint template containing `{subject}`
    url_template: String,

    /// Give up on an attempt that has not opened within this long
    connect_timeout: Option<Duration>,
}

impl WebSocketTransport {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            connect_timeout: None,
        }
    }

    /// Bound the time spent in the connecting state
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the endpoint for a subject. The subject becomes one
    /// percent-encoded path segment; without a placeholder it is appended.
    pub fn endpoint(&self, subject_id: &str) -> Result<Url, EndpointError> {
        let template = self.url_template.replace(SUBJECT_PLACEHOLDER, SUBJECT_MARKER);
        let mut url = Url::parse(&template)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(EndpointError::UnsupportedScheme(url.scheme().to_string()));
        }

        let mut segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        if !segments.iter().any(|s| s == SUBJECT_MARKER) {
            segments.push(SUBJECT_MARKER.to_string());
        }

        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| EndpointError::CannotBeABase)?;
            path.clear();
            for segment in &segments {
                if segment == SUBJECT_MARKER {
                    path.push(subject_id);
                } else {
                    path.push(segment);
                }
            }
        }

        Ok(url)
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_URL)
    }
}

impl Transport for WebSocketTransport {
    fn open(
        &mut self,
        session: SessionId,
        subject_id: &str,
        signals: SignalSender,
    ) -> Box<dyn Connection> {
        let cancel = CancellationToken::new();

        match self.endpoint(subject_id) {
            Ok(url) => {
                debug!(%session, %url, "opening websocket");
                tokio::spawn(run_connection(
                    url,
                    session,
                    signals,
                    cancel.clone(),
                    self.connect_timeout,
                ));
            }
            Err(e) => {
                let _ = signals.send(SessionSignal::new(
                    session,
                    TransportEvent::Error(e.to_string()),
                ));
            }
        }

        Box::new(WebSocketConnection { cancel })
    }
}

/// Handle to a spawned connection task
struct WebSocketConnection {
    cancel: CancellationToken,
}

impl Connection for WebSocketConnection {
    fn close(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn connect(url: &Url, timeout: Option<Duration>) -> Result<WsStream, String> {
    let attempt = connect_async(url.as_str());
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| "connection attempt timed out".to_string())?,
        None => attempt.await,
    };
    result
        .map(|(stream, _response)| stream)
        .map_err(|e| e.to_string())
}

async fn run_connection(
    url: Url,
    session: SessionId,
    signals: SignalSender,
    cancel: CancellationToken,
    timeout: Option<Duration>,
) {
    let send = |event| signals.send(SessionSignal::new(session, event)).is_ok();

    // Cancellation wins over anything the socket has ready
    let mut stream = tokio::select! {
        biased;

        _ = cancel.cancelled() => return,

        result = connect(&url, timeout) => match result {
            Ok(stream) => stream,
            Err(reason) => {
                send(TransportEvent::Error(reason));
                return;
            }
        },
    };

    if !send(TransportEvent::Opened) {
        return;
    }

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                let _ = stream.close(None).await;
                break;
            }

            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if !send(TransportEvent::Frame(text)) {
                            // Nobody is listening any more
                            let _ = stream.close(None).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        if !send(TransportEvent::Frame(text)) {
                            let _ = stream.close(None).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        send(TransportEvent::Closed);
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are handled by tungstenite
                    }
                    Some(Err(e)) => {
                        warn!(%session, error = %e, "websocket transport error");
                        send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
        }
    }
}
