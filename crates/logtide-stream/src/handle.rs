use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use logtide_types::{ConnectionStatus, ProviderContext};

use crate::buffer::{ArcLogEvent, StreamBuffer};
use crate::supervisor::{ConnectionSupervisor, StreamSession, SupervisorStats};
use crate::transport::{SignalReceiver, Transport};

/// Commands accepted by the supervisor task
#[derive(Debug)]
enum Command {
    Start {
        subject_id: String,
        provider_context: Option<ProviderContext>,
    },
    Pause,
    Resume,
    Stop,
    Shutdown,
}

/// Everything a consumer needs to draw the session, published after every
/// command or signal the supervisor task applies
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionView {
    pub status: ConnectionStatus,
    pub paused: bool,
    pub session: Option<StreamSession>,
    pub stats: SupervisorStats,
}

/// Runs a [`ConnectionSupervisor`] on its own task so every mutation is
/// serialized through one owner.
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<Command>,
    buffer: StreamBuffer,
    status: watch::Receiver<ConnectionStatus>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Spawn the supervisor task. Must be called inside a tokio runtime.
    pub fn spawn<T>(transport: T, buffer_capacity: usize) -> Self
    where
        T: Transport + 'static,
    {
        let buffer = StreamBuffer::new(buffer_capacity);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let supervisor = ConnectionSupervisor::new(transport, buffer.clone(), signal_tx);
        let status = supervisor.subscribe_status();
        let (view_tx, view) = watch::channel(view_of(&supervisor));

        let task = tokio::spawn(run(supervisor, command_rx, signal_rx, view_tx));

        Self {
            commands: command_tx,
            buffer,
            status,
            view,
            task,
        }
    }

    /// Start (or restart) streaming for `subject_id`. Returns immediately.
    pub fn start(&self, subject_id: impl Into<String>) {
        self.send(Command::Start {
            subject_id: subject_id.into(),
            provider_context: None,
        });
    }

    pub fn start_with_context(
        &self,
        subject_id: impl Into<String>,
        provider_context: Option<ProviderContext>,
    ) {
        self.send(Command::Start {
            subject_id: subject_id.into(),
            provider_context,
        });
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Current status
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Receiver notified whenever the session view changes
    pub fn subscribe_view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Latest published session view
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Buffered events, newest first
    pub fn snapshot(&self) -> Vec<ArcLogEvent> {
        self.buffer.snapshot()
    }

    /// Read access to the shared buffer
    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Stop the session and wait for the supervisor task to finish
    pub async fn shutdown(self) {
        self.send(Command::Shutdown);
        let _ = self.task.await;
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("supervisor task has already exited");
        }
    }
}

fn view_of<T: Transport>(supervisor: &ConnectionSupervisor<T>) -> SessionView {
    SessionView {
        status: supervisor.status(),
        paused: supervisor.is_paused(),
        session: supervisor.session().cloned(),
        stats: supervisor.stats(),
    }
}

async fn run<T: Transport>(
    mut supervisor: ConnectionSupervisor<T>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut signals: SignalReceiver,
    view_tx: watch::Sender<SessionView>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(Command::Start { subject_id, provider_context }) => {
                        supervisor.start_with_context(&subject_id, provider_context);
                    }
                    Some(Command::Pause) => supervisor.pause(),
                    Some(Command::Resume) => supervisor.resume(),
                    Some(Command::Stop) => supervisor.stop(),
                    Some(Command::Shutdown) | None => break,
                }
            }

            Some(signal) = signals.recv() => {
                supervisor.handle_signal(signal);
            }
        }

        view_tx.send_if_modified(|view| {
            let next = view_of(&supervisor);
            if *view == next {
                false
            } else {
                *view = next;
                true
            }
        });
    }

    supervisor.stop();
    view_tx.send_replace(view_of(&supervisor));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::tests::FakeTransport;
    use crate::transport::TransportEvent;
    use std::time::Duration;

    async fn wait_for_view<F>(handle: &SupervisorHandle, predicate: F) -> SessionView
    where
        F: FnMut(&SessionView) -> bool,
    {
        let mut rx = handle.subscribe_view();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for session view")
            .expect("supervisor task ended")
            .clone()
    }

    #[tokio::test]
    async fn test_handle_drives_session() {
        let transport = FakeTransport {
            on_open: vec![
                TransportEvent::Opened,
                TransportEvent::Frame(r#"{"level":"warn","message":"disk 91%"}"#.into()),
                TransportEvent::Frame("garbage".into()),
            ],
            ..Default::default()
        };
        let handle = SupervisorHandle::spawn(transport, 200);

        handle.start("user-42");
        let view = wait_for_view(&handle, |v| v.stats.received == 2).await;

        assert_eq!(view.status, ConnectionStatus::Connected);
        assert_eq!(view.stats.decode_failures, 1);
        assert_eq!(view.session.unwrap().subject_id, "user-42");

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].message, "disk 91%");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_commands_are_applied_in_order() {
        let transport = FakeTransport {
            on_open: vec![TransportEvent::Opened],
            ..Default::default()
        };
        let handle = SupervisorHandle::spawn(transport.clone(), 10);

        handle.start("a");
        handle.pause();
        handle.stop();
        handle.start("b");

        let view = wait_for_view(&handle, |v| {
            v.session.as_ref().is_some_and(|s| s.subject_id == "b")
                && v.status == ConnectionStatus::Connected
        })
        .await;
        assert!(view.paused);

        let opened: Vec<_> = transport.opened.lock().iter().map(|(_, s)| s.clone()).collect();
        assert_eq!(opened, vec!["a", "b"]);

        handle.resume();
        let view = wait_for_view(&handle, |v| !v.paused).await;
        assert_eq!(view.status, ConnectionStatus::Connected);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_subject_reports_error_status() {
        let handle = SupervisorHandle::spawn(FakeTransport::default(), 10);
        let mut status = handle.subscribe_status();

        handle.start("");
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| *s == ConnectionStatus::Error),
        )
        .await
        .expect("timed out")
        .expect("supervisor task ended");

        assert!(handle.snapshot().is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_connection() {
        let transport = FakeTransport {
            on_open: vec![TransportEvent::Opened],
            ..Default::default()
        };
        let handle = SupervisorHandle::spawn(transport.clone(), 10);
        handle.start("u");
        wait_for_view(&handle, |v| v.status == ConnectionStatus::Connected).await;

        handle.shutdown().await;
        assert_eq!(transport.closed.lock().len(), 1);
    }
}
