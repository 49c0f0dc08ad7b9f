//! TUI components for logtide
//!
//! This crate provides the terminal user interface for logtide: state
//! management, keybindings, event handling, and the log viewer screen.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, PAGE_SIZE, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar, log_viewer_hints};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
