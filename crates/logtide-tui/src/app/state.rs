use logtide_stream::SessionView;
use logtide_types::{ConnectionStatus, ProviderContext};

/// Lines moved by a page up/down
pub const PAGE_SIZE: usize = 20;

/// UI-specific transient state
#[derive(Debug)]
pub struct UiState {
    /// Lines scrolled away from the newest event (0 = following)
    pub log_scroll: usize,

    /// Show timestamps in log viewer?
    pub show_timestamps: bool,

    /// Show timestamps in local time instead of UTC?
    pub local_time: bool,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Error message to display (if any)
    pub error_message: Option<String>,

    /// Transient informational message (e.g. export path)
    pub notice: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            log_scroll: 0,
            show_timestamps: true,
            local_time: false,
            help_visible: false,
            error_message: None,
            notice: None,
        }
    }
}

/// Main application state
#[derive(Debug, Default)]
pub struct AppState {
    /// Subject the stream is addressed by
    pub subject_id: Option<String>,

    /// Linked provider, if known
    pub provider: Option<ProviderContext>,

    /// Last session view published by the supervisor
    pub session: SessionView,

    pub ui_state: UiState,

    pub should_quit: bool,
}

impl AppState {
    pub fn new(subject_id: Option<String>, provider: Option<ProviderContext>) -> Self {
        Self {
            subject_id,
            provider,
            ..Default::default()
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.session.status
    }

    pub fn is_paused(&self) -> bool {
        self.session.paused
    }

    /// Whether the view is pinned to the newest event
    pub fn is_following(&self) -> bool {
        self.ui_state.log_scroll == 0
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.ui_state.error_message = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.ui_state.error_message = None;
    }

    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.ui_state.notice = Some(message.into());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(lines);
    }

    /// Scroll towards older events; the renderer clamps to the real length
    pub fn scroll_down(&mut self, lines: usize) {
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(lines);
    }

    /// Keep the scroll offset inside `[0, total - visible]`
    pub fn clamp_scroll(&mut self, total: usize, visible: usize) -> usize {
        let max = total.saturating_sub(visible);
        self.ui_state.log_scroll = self.ui_state.log_scroll.min(max);
        self.ui_state.log_scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_clamps_to_content() {
        let mut state = AppState::new(Some("u".to_string()), None);
        assert!(state.is_following());

        state.scroll_down(PAGE_SIZE);
        state.scroll_down(usize::MAX);
        assert_eq!(state.clamp_scroll(50, 10), 40);

        state.scroll_up(100);
        assert!(state.is_following());
        assert_eq!(state.clamp_scroll(5, 10), 0);
    }

    #[test]
    fn test_error_lifecycle() {
        let mut state = AppState::default();
        state.show_error("boom");
        assert_eq!(state.ui_state.error_message.as_deref(), Some("boom"));
        state.dismiss_error();
        assert!(state.ui_state.error_message.is_none());
    }
}
