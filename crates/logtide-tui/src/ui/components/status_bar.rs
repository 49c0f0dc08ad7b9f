use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// One-line bar with key hints on the left and a summary on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    message: Option<(String, Style)>,
    right_text: Option<String>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            message: None,
            right_text: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Show a message in place of the hints
    pub fn message<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        self.message = Some((text.into(), style));
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }

    fn left_line(&self) -> Line<'_> {
        if let Some((text, style)) = &self.message {
            return Line::from(Span::styled(
                text.as_str(),
                Theme::status_bar().patch(*style),
            ));
        }

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
            spans.push(Span::styled(format!(" {}", desc), Theme::status_bar()));
        }
        Line::from(spans)
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let line = self.left_line();
        let line_width = line.width() as u16;
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        // Right text is dropped when it would overlap the hints
        if let Some(right) = &self.right_text {
            let right_width = right.width() as u16;
            let right_x = area.x + area.width.saturating_sub(right_width + 1);
            if right_x > area.x + line_width + 2 {
                let span = Span::styled(right.as_str(), Theme::status_bar());
                buf.set_span(right_x, area.y, &span, right_width);
            }
        }
    }
}

/// Hints for the log viewer
pub fn log_viewer_hints(paused: bool) -> Vec<(&'static str, &'static str)> {
    vec![
        ("p", if paused { "Resume" } else { "Pause" }),
        ("c", "Connect"),
        ("d", "Disconnect"),
        ("t", "Time"),
        ("e", "Export"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_renders_hints_and_right_text() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);

        StatusBar::new()
            .hints([("p", "Pause"), ("q", "Quit")])
            .right("12/200")
            .render(area, &mut buf);

        let text = row(&buf, 0);
        assert!(text.starts_with(" [p] Pause  [q] Quit"));
        assert!(text.trim_end().ends_with("12/200"));
    }

    #[test]
    fn test_message_replaces_hints() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);

        StatusBar::new()
            .hints([("p", "Pause")])
            .message("connection refused", Theme::error())
            .render(area, &mut buf);

        let text = row(&buf, 0);
        assert!(text.contains("connection refused"));
        assert!(!text.contains("[p]"));
    }

    #[test]
    fn test_right_text_dropped_when_too_narrow() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);

        StatusBar::new()
            .hints([("p", "Pause"), ("q", "Quit")])
            .right("E0 W0 I0 D0")
            .render(area, &mut buf);

        assert!(!row(&buf, 0).contains("E0"));
    }

    #[test]
    fn test_pause_hint_follows_state() {
        assert_eq!(log_viewer_hints(false)[0], ("p", "Pause"));
        assert_eq!(log_viewer_hints(true)[0], ("p", "Resume"));
    }
}
