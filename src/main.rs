mod config;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use logtide_provider::{
    ConnectRequest, ProviderApi, ProviderClient, ProviderContext, ProviderKind,
};
use logtide_stream::{SupervisorHandle, WebSocketTransport};
use logtide_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    PAGE_SIZE, Tui,
};

use crate::config::{Config, Overrides, TOKEN_ENV};

/// logtide - A terminal viewer for live cloud log streams
#[derive(Parser, Debug)]
#[command(name = "logtide")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.logtide/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Subject whose logs are streamed
    #[arg(long, value_name = "ID", global = true)]
    subject: Option<String>,

    /// Base URL of the provider API
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Stream endpoint template, `{subject}` is substituted
    #[arg(long, value_name = "TEMPLATE", global = true)]
    stream_url: Option<String>,

    /// Seconds to wait for the stream to open
    #[arg(long, value_name = "SECS", global = true)]
    connect_timeout: Option<u64>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the live log viewer (default)
    Watch,

    /// Show the linked provider
    Status,

    /// Link a cloud provider
    Connect {
        /// Provider name (aws, azure, gcp)
        #[arg(long)]
        provider: String,

        /// JSON file holding the provider credentials
        #[arg(long, value_name = "FILE")]
        credentials: PathBuf,
    },

    /// Unlink the current provider
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let command = args.command.unwrap_or(Command::Watch);
    let interactive = matches!(command, Command::Watch);
    init_tracing(log_target(args.log_file, interactive))?;

    let overrides = Overrides {
        api_url: args.api_url,
        stream_url: args.stream_url,
        subject: args.subject,
        connect_timeout_secs: args.connect_timeout,
    };
    let config = Config::load(args.config.as_deref())?
        .layer(overrides, std::env::var(TOKEN_ENV).ok());
    config.validate()?;

    let client = ProviderClient::new(&config.api_url, config.token.as_deref())
        .context("Failed to create provider API client")?;

    match command {
        Command::Watch => run_watch(config, client).await,
        Command::Status => print_status(&client).await,
        Command::Connect {
            provider,
            credentials,
        } => link_provider(&client, provider, &credentials).await,
        Command::Disconnect => {
            client.disconnect().await.context("Failed to unlink provider")?;
            println!("Provider unlinked");
            Ok(())
        }
    }
}

/// Where diagnostics go
#[derive(Debug, PartialEq)]
enum LogTarget {
    File(PathBuf),
    Stderr,
    Discard,
}

/// Interactive runs never log to stderr
fn log_target(log_file: Option<PathBuf>, interactive: bool) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path),
        None if !interactive => LogTarget::Stderr,
        None => Config::default_log_path()
            .map(LogTarget::File)
            .unwrap_or(LogTarget::Discard),
    }
}

fn init_tracing(target: LogTarget) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::Discard => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

async fn print_status(client: &ProviderClient) -> Result<()> {
    match client.linked_provider().await? {
        Some(context) => println!("Linked: {}", context.summary()),
        None => println!("No provider linked"),
    }
    Ok(())
}

async fn link_provider(
    client: &ProviderClient,
    provider: String,
    credentials: &Path,
) -> Result<()> {
    let content = std::fs::read_to_string(credentials)
        .with_context(|| format!("Failed to read {}", credentials.display()))?;
    let credentials: serde_json::Value =
        serde_json::from_str(&content).context("Credentials file is not valid JSON")?;
    if !credentials.is_object() {
        anyhow::bail!("Credentials file must contain a JSON object");
    }

    let request = ConnectRequest {
        provider: ProviderKind::from(provider),
        credentials,
    };
    let context = client
        .connect(&request)
        .await
        .context("Failed to link provider")?;
    println!("Linked: {}", context.summary());
    Ok(())
}

/// Streaming starts by itself only for a configured subject with a linked
/// provider
fn should_auto_start(config: &Config, provider: Option<&ProviderContext>) -> bool {
    config.auto_start && provider.is_some() && config.subject.is_some()
}

async fn run_watch(config: Config, client: ProviderClient) -> Result<()> {
    let (provider, lookup_error) = match client.linked_provider().await {
        Ok(provider) => (provider, None),
        Err(e) => {
            warn!("Could not query linked provider: {}", e);
            (None, Some(e))
        }
    };

    let transport = WebSocketTransport::new(config.stream_url.clone())
        .with_connect_timeout(config.connect_timeout());
    let handle = SupervisorHandle::spawn(transport, config.buffer_capacity);
    let mut view_rx = handle.subscribe_view();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let mut state = AppState::new(config.subject.clone(), provider);

    match config.subject.as_deref() {
        Some(subject) if should_auto_start(&config, state.provider.as_ref()) => {
            info!("Starting stream for {}", subject);
            handle.start_with_context(subject, state.provider.clone());
        }
        None => {
            state.show_error("No subject configured, pass --subject or set it in the config file")
        }
        Some(_) => {
            if let Some(e) = lookup_error {
                state.show_error(format!("Could not query linked provider: {}", e));
            } else if state.provider.is_none() {
                state.show_notice("No provider linked, run `logtide connect` or press c");
            }
        }
    }

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(100));
    let keybindings = KeyBindings::new();

    render(&mut tui, &mut state, &handle)?;

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let context = if state.ui_state.help_visible {
                            KeyContext::Help
                        } else {
                            KeyContext::LogViewer
                        };
                        if let Some(action) = keybindings.get_action(context, &key) {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Tick => {}
                    Event::Resize(_, _) => {
                        let _ = action_tx.send(Action::Render);
                    }
                    Event::Error(e) => {
                        state.show_error(e);
                    }
                }
            }

            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &handle, action);
            }

            Ok(()) = view_rx.changed() => {
                state.session = view_rx.borrow_and_update().clone();
            }
        }

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, &handle)?;
    }

    events.shutdown();
    tui.restore()?;
    handle.shutdown().await;

    Ok(())
}

fn render(tui: &mut Tui, state: &mut AppState, handle: &SupervisorHandle) -> Result<()> {
    let buffer = handle.buffer();
    let events = buffer.snapshot();
    let counts = buffer.level_counts();
    let capacity = buffer.capacity();

    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state, &events, &counts, capacity);
        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;
    Ok(())
}

fn handle_action(state: &mut AppState, handle: &SupervisorHandle, action: Action) {
    if action != Action::Render {
        state.ui_state.notice = None;
    }

    match action {
        Action::Quit => {
            state.should_quit = true;
        }

        Action::Connect => match state.subject_id.clone() {
            Some(subject) => {
                state.dismiss_error();
                state.ui_state.log_scroll = 0;
                handle.start_with_context(subject, state.provider.clone());
            }
            None => state.show_error("No subject configured"),
        },

        Action::Disconnect => {
            handle.stop();
            state.show_notice("Disconnected");
        }

        Action::TogglePause => {
            if state.is_paused() {
                handle.resume();
            } else {
                handle.pause();
            }
        }

        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }

        Action::ToggleTimestamps => {
            state.ui_state.show_timestamps = !state.ui_state.show_timestamps;
        }

        Action::ToggleLocalTime => {
            state.ui_state.local_time = !state.ui_state.local_time;
        }

        Action::ScrollUp(n) => state.scroll_up(n),
        Action::ScrollDown(n) => state.scroll_down(n),
        Action::PageUp => state.scroll_up(PAGE_SIZE),
        Action::PageDown => state.scroll_down(PAGE_SIZE),
        Action::ScrollToTop => {
            state.ui_state.log_scroll = 0;
        }
        Action::ScrollToBottom => {
            state.ui_state.log_scroll = usize::MAX;
        }

        Action::ExportLogs => {
            let subject = state.subject_id.as_deref().unwrap_or("logs");
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let filename = format!("logtide_{}_{}.log", sanitize(subject), timestamp);

            match export_logs_to_file(&filename, handle) {
                Ok(count) => {
                    state.show_notice(format!("Exported {} logs to {}", count, filename))
                }
                Err(e) => state.show_error(format!("Export failed: {}", e)),
            }
        }

        Action::DismissError => state.dismiss_error(),
        Action::Render => {}
    }
}

fn export_logs_to_file(filename: &str, handle: &SupervisorHandle) -> std::io::Result<usize> {
    let buffer = handle.buffer();
    let mut file = File::create(filename)?;
    writeln!(file, "{}", buffer.export_lines())?;
    Ok(buffer.len())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_command() {
        let args = Args::try_parse_from([
            "logtide",
            "connect",
            "--provider",
            "aws",
            "--credentials",
            "creds.json",
            "--api-url",
            "http://localhost:9000",
        ])
        .unwrap();

        assert_eq!(args.api_url.as_deref(), Some("http://localhost:9000"));
        match args.command {
            Some(Command::Connect { provider, .. }) => assert_eq!(provider, "aws"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_watch_is_default() {
        let args = Args::try_parse_from(["logtide", "--subject", "user-42"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.subject.as_deref(), Some("user-42"));
    }

    #[test]
    fn test_auto_start_needs_linked_provider() {
        let config = Config {
            subject: Some("user-42".to_string()),
            ..Default::default()
        };
        let provider = ProviderContext::new(ProviderKind::Aws);

        assert!(should_auto_start(&config, Some(&provider)));
        assert!(!should_auto_start(&config, None));

        let manual = Config {
            auto_start: false,
            ..config.clone()
        };
        assert!(!should_auto_start(&manual, Some(&provider)));

        let no_subject = Config::default();
        assert!(!should_auto_start(&no_subject, Some(&provider)));
    }

    #[test]
    fn test_viewer_never_logs_to_stderr() {
        assert_eq!(log_target(None, false), LogTarget::Stderr);
        assert_ne!(log_target(None, true), LogTarget::Stderr);
        assert_eq!(
            log_target(Some(PathBuf::from("out.log")), true),
            LogTarget::File(PathBuf::from("out.log"))
        );
        assert_eq!(
            log_target(Some(PathBuf::from("out.log")), false),
            LogTarget::File(PathBuf::from("out.log"))
        );
    }

    #[test]
    fn test_sanitize_export_name() {
        assert_eq!(sanitize("team/user 42"), "team_user_42");
    }
}
