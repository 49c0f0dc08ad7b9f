use tokio::sync::watch;
use tracing::{debug, warn};

use logtide_types::ConnectionStatus;

/// A status change that is not one of the allowed edges
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ConnectionStatus,
    pub to: ConnectionStatus,
}

/// State machine for the health of the streaming session.
///
/// Every applied change is published on a watch channel.
#[derive(Debug)]
pub struct StatusTracker {
    tx: watch::Sender<ConnectionStatus>,
}

impl StatusTracker {
    /// Create a tracker in the `Disconnected` state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionStatus::Disconnected);
        Self { tx }
    }

    /// Current status
    pub fn current(&self) -> ConnectionStatus {
        *self.tx.borrow()
    }

    /// Receive every subsequent status change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }

    /// Whether `from -> to` is an allowed edge
    pub fn is_allowed(from: ConnectionStatus, to: ConnectionStatus) -> bool {
        use ConnectionStatus::*;

        matches!(
            (from, to),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Error)
                | (Connected, Error)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
                | (Error, Disconnected)
                // Missing subject at start: the session never reaches Connecting
                | (Disconnected, Error)
                | (Disconnected, Disconnected)
        )
    }

    /// Apply a transition, rejecting edges that are not allowed
    pub fn transition(&mut self, to: ConnectionStatus) -> Result<(), InvalidTransition> {
        let from = self.current();
        if !Self::is_allowed(from, to) {
            warn!(%from, %to, "rejected status transition");
            return Err(InvalidTransition { from, to });
        }
        if from != to {
            debug!(%from, %to, "status transition");
            self.tx.send_replace(to);
        }
        Ok(())
    }

    /// Force `Disconnected`. Every state has an edge to it.
    pub fn reset(&mut self) {
        let _ = self.transition(ConnectionStatus::Disconnected);
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtide_types::ConnectionStatus::*;

    const ALL: [ConnectionStatus; 4] = [Disconnected, Connecting, Connected, Error];

    #[test]
    fn test_happy_path() {
        let mut tracker = StatusTracker::new();
        assert_eq!(tracker.current(), Disconnected);

        tracker.transition(Connecting).unwrap();
        tracker.transition(Connected).unwrap();
        tracker.transition(Error).unwrap();
        tracker.transition(Disconnected).unwrap();
        assert_eq!(tracker.current(), Disconnected);
    }

    #[test]
    fn test_error_cannot_reach_connected_or_connecting() {
        let mut tracker = StatusTracker::new();
        tracker.transition(Connecting).unwrap();
        tracker.transition(Error).unwrap();

        assert_eq!(
            tracker.transition(Connected),
            Err(InvalidTransition { from: Error, to: Connected })
        );
        assert!(tracker.transition(Connecting).is_err());
        assert_eq!(tracker.current(), Error);
    }

    #[test]
    fn test_cannot_skip_connecting() {
        let mut tracker = StatusTracker::new();
        assert!(tracker.transition(Connected).is_err());
        assert_eq!(tracker.current(), Disconnected);
    }

    #[test]
    fn test_reset_from_every_state() {
        for start in ALL {
            let mut tracker = StatusTracker::new();
            match start {
                Disconnected => {}
                Connecting => tracker.transition(Connecting).unwrap(),
                Connected => {
                    tracker.transition(Connecting).unwrap();
                    tracker.transition(Connected).unwrap();
                }
                Error => tracker.transition(Error).unwrap(),
            }
            tracker.reset();
            assert_eq!(tracker.current(), Disconnected, "reset from {start}");
        }
    }

    #[test]
    fn test_edge_table() {
        let allowed: Vec<_> = ALL
            .iter()
            .flat_map(|&from| ALL.iter().map(move |&to| (from, to)))
            .filter(|&(from, to)| StatusTracker::is_allowed(from, to))
            .collect();
        assert_eq!(allowed.len(), 9);
        assert!(!StatusTracker::is_allowed(Error, Connected));
        assert!(!StatusTracker::is_allowed(Error, Connecting));
        assert!(!StatusTracker::is_allowed(Connected, Connecting));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let mut tracker = StatusTracker::new();
        let mut rx = tracker.subscribe();

        tracker.transition(Connecting).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Connecting);

        tracker.transition(Connected).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Connected);
    }
}
