use chrono::Local;
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use logtide_stream::{ArcLogEvent, LevelCounts};
use logtide_types::{LogEvent, LogLevel};

use crate::app::AppState;
use crate::ui::components::{StatusBar, log_viewer_hints};
use crate::ui::{Layout, Theme};

/// Live log viewer, newest event on top
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(
        frame: &mut Frame,
        state: &mut AppState,
        events: &[ArcLogEvent],
        counts: &LevelCounts,
        capacity: usize,
    ) {
        let (header, content, status) = Layout::main(frame.area());

        Self::render_header(frame, header, state);
        Self::render_logs(frame, content, state, events);
        Self::render_status_bar(frame, status, state, counts, events.len(), capacity);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let status = state.status();
        let mut spans = vec![Span::styled("logtide", Theme::title())];

        if let Some(provider) = &state.provider {
            spans.push(Span::styled(" │ ", Theme::text_dim()));
            spans.push(Span::styled(provider.summary(), Theme::text()));
        }

        spans.push(Span::styled(" │ ", Theme::text_dim()));
        spans.push(Span::styled(
            state.subject_id.as_deref().unwrap_or("no subject").to_string(),
            Theme::text_highlight(),
        ));
        spans.push(Span::styled(" │ ", Theme::text_dim()));
        spans.push(Span::styled(
            format!("{} {}", status.symbol(), status.as_str()),
            Style::default()
                .fg(status.color())
                .add_modifier(Modifier::BOLD),
        ));

        if state.is_paused() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(" PAUSED ", Theme::paused()));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, events: &[ArcLogEvent]) {
        let total = events.len();
        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll = state.clamp_scroll(total, inner_height);

        let lines: Vec<Line> = if events.is_empty() {
            vec![Line::from(Span::styled(
                Self::empty_hint(state),
                Theme::text_dim(),
            ))]
        } else {
            events
                .iter()
                .skip(scroll)
                .take(inner_height)
                .map(|event| Self::format_event(event, state))
                .collect()
        };

        let title = if state.is_following() {
            format!(" Logs ({}) ", total)
        } else {
            format!(" Logs ({}) ↓{} ", total, scroll)
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );

        frame.render_widget(logs_widget, area);

        if total > inner_height {
            let max_scroll = total.saturating_sub(inner_height);
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(scroll);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn empty_hint(state: &AppState) -> &'static str {
        use logtide_types::ConnectionStatus::*;

        match state.status() {
            Connected if state.is_paused() => " Paused. Press p to resume.",
            Connected => " Waiting for log events...",
            Connecting => " Connecting...",
            Error => " Stream failed. Press c to reconnect.",
            Disconnected => " Not streaming. Press c to connect.",
        }
    }

    fn format_event(event: &LogEvent, state: &AppState) -> Line<'static> {
        let mut spans = Vec::new();

        if state.ui_state.show_timestamps {
            let time = if state.ui_state.local_time {
                event
                    .timestamp
                    .with_timezone(&Local)
                    .format("%H:%M:%S%.3f")
                    .to_string()
            } else {
                event.timestamp.format("%H:%M:%S%.3f").to_string()
            };
            spans.push(Span::styled(format!(" {}", time), Theme::text_dim()));
        }

        spans.push(Span::styled(
            format!(" {:<5}", event.level.as_str()),
            Style::default()
                .fg(event.level.color())
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(" │ ", Theme::text_dim()));
        spans.push(Span::styled(event.message.clone(), message_style(event.level)));

        Line::from(spans)
    }

    fn render_status_bar(
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        counts: &LevelCounts,
        len: usize,
        capacity: usize,
    ) {
        let stats = &state.session.stats;
        let mut right = format!(
            "E{} W{} I{} D{} │ {}/{}",
            counts.error, counts.warn, counts.info, counts.debug, len, capacity
        );
        if stats.dropped_while_paused > 0 {
            right.push_str(&format!(" │ {} skipped", stats.dropped_while_paused));
        }
        if stats.decode_failures > 0 {
            right.push_str(&format!(" │ {} bad frames", stats.decode_failures));
        }

        let mut bar = StatusBar::new()
            .hints(log_viewer_hints(state.is_paused()))
            .right(right);

        if let Some(error) = &state.ui_state.error_message {
            bar = bar.message(format!("✗ {}  [Esc] dismiss", error), Theme::error());
        } else if let Some(notice) = &state.ui_state.notice {
            bar = bar.message(notice.clone(), Theme::status_bar_notice());
        } else if let Some(last_error) = state
            .session
            .session
            .as_ref()
            .and_then(|s| s.last_error.as_deref())
        {
            bar = bar.message(format!("✗ {}", last_error), Theme::error());
        }

        frame.render_widget(bar, area);
    }
}

fn message_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Error | LogLevel::Warn => Style::default().fg(level.color()),
        LogLevel::Debug => Theme::text_dim(),
        LogLevel::Info => Theme::text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use logtide_stream::StreamBuffer;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn draw(state: &mut AppState, buffer: &StreamBuffer) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 12)).unwrap();
        let events = buffer.snapshot();
        let counts = buffer.level_counts();
        terminal
            .draw(|frame| {
                LogViewerScreen::render(frame, state, &events, &counts, buffer.capacity())
            })
            .unwrap();
        screen_text(&terminal)
    }

    #[test]
    fn test_renders_newest_first() {
        let buffer = StreamBuffer::new(200);
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        buffer.push(LogEvent::new(LogLevel::Info, "first", ts));
        buffer.push(LogEvent::new(LogLevel::Error, "second", ts));

        let mut state = AppState::new(Some("user-42".to_string()), None);
        let text = draw(&mut state, &buffer);

        let first = text.find("first").unwrap();
        let second = text.find("second").unwrap();
        assert!(second < first);
        assert!(text.contains("user-42"));
        assert!(text.contains("12:00:00.000"));
        assert!(text.contains("E1 W0 I1 D0 │ 2/200"));
    }

    #[test]
    fn test_header_shows_paused() {
        let buffer = StreamBuffer::new(10);
        let mut state = AppState::new(Some("u".to_string()), None);
        state.session.paused = true;

        let text = draw(&mut state, &buffer);
        assert!(text.contains("PAUSED"));
    }

    #[test]
    fn test_hides_timestamps() {
        let buffer = StreamBuffer::new(10);
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        buffer.push(LogEvent::new(LogLevel::Warn, "disk 91%", ts));

        let mut state = AppState::new(Some("u".to_string()), None);
        state.ui_state.show_timestamps = false;

        let text = draw(&mut state, &buffer);
        assert!(text.contains("disk 91%"));
        assert!(!text.contains("12:00:00"));
    }

    #[test]
    fn test_scroll_is_clamped_while_rendering() {
        let buffer = StreamBuffer::new(10);
        let ts = Utc::now();
        for i in 0..3 {
            buffer.push(LogEvent::new(LogLevel::Info, format!("line {}", i), ts));
        }

        let mut state = AppState::default();
        state.scroll_down(50);
        draw(&mut state, &buffer);
        assert_eq!(state.ui_state.log_scroll, 0);
    }
}
