//! Message log display component

use crate::events::{ChatMessage, ChatRole};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the transcript tail-anchored, so the newest message (and
/// the growing assistant reply) is always visible.
pub struct ChatLog<'a> {
    messages: &'a [ChatMessage],
    reply_in_progress: bool,
}

impl<'a> ChatLog<'a> {
    pub fn new(messages: &'a [ChatMessage], reply_in_progress: bool) -> Self {
        Self {
            messages,
            reply_in_progress,
        }
    }

    fn role_style(role: ChatRole) -> Style {
        match role {
            ChatRole::User => Style::default().fg(Color::Blue),
            ChatRole::Assistant => Style::default().fg(Color::Green),
        }
    }

    /// Render a single message into lines
    fn message_lines(&self, message: &ChatMessage, width: u16, is_last: bool) -> Vec<Line<'_>> {
        let mut lines = Vec::new();

        let timestamp = message.timestamp.format("%H:%M:%S").to_string();
        let header = format!("{} · {}", message.role.display_name(), timestamp);
        lines.push(Line::from(vec![Span::styled(
            header,
            Style::default().fg(Color::DarkGray),
        )]));

        let content_lines = wrap_text(&message.text, width.saturating_sub(2) as usize);
        let last_index = content_lines.len().saturating_sub(1);
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let show_cursor = self.reply_in_progress
                && is_last
                && message.role == ChatRole::Assistant
                && i == last_index;
            let mut spans = vec![
                Span::raw("  "),
                Span::styled(content_line, Self::role_style(message.role)),
            ];
            if show_cursor {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(spans));
        }

        lines
    }
}

impl Widget for ChatLog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() {
            let welcome = Line::from(vec![Span::styled(
                "Say hello to start the conversation.",
                Style::default().fg(Color::Gray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &welcome, inner_area.width);
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        let last_index = self.messages.len() - 1;
        for (i, message) in self.messages.iter().enumerate() {
            all_lines.extend(self.message_lines(message, inner_area.width, i == last_index));
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        // Show the tail; older lines scroll off the top
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let start = total.saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Wrap text to fit within the given width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for source_line in text.split('\n') {
        let mut current_line = String::new();
        for word in source_line.split_whitespace() {
            if current_line.len() + word.len() + 1 <= width {
                if !current_line.is_empty() {
                    current_line.push(' ');
                }
                current_line.push_str(word);
            } else {
                if !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                }
                // A word longer than the width is hard-broken rather
                // than left to truncate off the edge
                let mut rest = word;
                while rest.len() > width {
                    let mut cut = width;
                    while !rest.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    if cut == 0 {
                        cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
                    }
                    lines.push(rest[..cut].to_string());
                    rest = &rest[cut..];
                }
                current_line.push_str(rest);
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
