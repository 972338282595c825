use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Text input for composing messages
#[derive(Debug, Default, Clone)]
pub struct Composer {
    content: String,
    cursor_position: usize,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Handle key input. Enter submits non-empty content and clears
    /// the input; Shift+Enter inserts a line break.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor_position = 0;
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
            }
            KeyCode::Backspace => {
                if let Some((idx, _)) = self.content[..self.cursor_position]
                    .char_indices()
                    .next_back()
                {
                    self.content.remove(idx);
                    self.cursor_position = idx;
                }
            }
            KeyCode::Delete => {
                if self.cursor_position < self.content.len() {
                    self.content.remove(self.cursor_position);
                }
            }
            KeyCode::Left => {
                if let Some((idx, _)) = self.content[..self.cursor_position]
                    .char_indices()
                    .next_back()
                {
                    self.cursor_position = idx;
                }
            }
            KeyCode::Right => {
                if let Some(c) = self.content[self.cursor_position..].chars().next() {
                    self.cursor_position += c.len_utf8();
                }
            }
            KeyCode::Home => {
                self.cursor_position = 0;
            }
            KeyCode::End => {
                self.cursor_position = self.content.len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Render with a state-dependent title and placeholder
    pub fn draw(&self, area: Rect, buf: &mut Buffer, title: &str, enabled: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .style(if enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder = Line::from(vec![Span::styled(
                "Type a message and press Enter...",
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder, inner_area.width);
        } else {
            let mut content = self.content.clone();
            if enabled {
                content.insert(self.cursor_position.min(content.len()), '▌');
            }

            for (i, line_text) in content.split('\n').enumerate() {
                if i < inner_area.height as usize {
                    let line = Line::from(vec![Span::raw(line_text)]);
                    buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
                }
            }
        }
    }
}
