use crate::ui::conversation::commands::{parse_slash_command, SlashCommand};
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
    /// The text changed; carries the full new content
    Changed(String),
    /// Enter was pressed on non-command text
    Submitted,
    Command(SlashCommand),
    None,
}

/// Single-line input box. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct ConversationComposer {
    content: String,
    cursor: usize,
    placeholder: String,
    has_focus: bool,
    locked: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            has_focus: true,
            ..Self::default()
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if let Some(command) = parse_slash_command(&self.content) {
                    self.clear();
                    return ComposerResult::Command(command);
                }
                if !self.content.trim().is_empty() {
                    return ComposerResult::Submitted;
                }
                ComposerResult::None
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
                self.changed()
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_str(&c.to_string());
                self.changed()
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                    return self.changed();
                }
                ComposerResult::None
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                    return self.changed();
                }
                ComposerResult::None
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                ComposerResult::None
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                ComposerResult::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                ComposerResult::None
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                ComposerResult::None
            }
            _ => ComposerResult::None,
        }
    }

    /// Insert pasted text at the cursor; newlines become spaces
    pub fn handle_paste(&mut self, text: &str) -> ComposerResult {
        let flattened: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        if flattened.is_empty() {
            return ComposerResult::None;
        }
        self.insert_str(&flattened);
        self.changed()
    }

    fn insert_str(&mut self, text: &str) {
        let at = self.byte_index(self.cursor);
        self.content.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    fn changed(&self) -> ComposerResult {
        ComposerResult::Changed(self.content.clone())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    #[allow(dead_code)]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Cursor column, in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Set focus state
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Show the box as waiting on the bot
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.locked {
            "Waiting for the assistant..."
        } else {
            "Message"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if self.has_focus && !self.locked {
                Style::default().fg(Color::Rgb(0, 132, 255))
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        let line = if self.content.is_empty() {
            Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )])
        } else {
            // Keep the cursor visible on long input
            let width = inner_area.width.max(1) as usize;
            let skip = self.cursor.saturating_sub(width.saturating_sub(1));
            let visible: String = self.content.chars().skip(skip).collect();
            Line::from(vec![Span::styled(visible, Style::default().fg(Color::White))])
        };
        buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
    }
}
