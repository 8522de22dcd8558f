//! Conversation history display component

use crate::conversation::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Read-only view over the conversation's messages
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    bot_name: &'a str,
    awaiting_reply: bool,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message], bot_name: &'a str) -> Self {
        Self {
            messages,
            bot_name,
            awaiting_reply: false,
        }
    }

    pub fn awaiting_reply(mut self, awaiting: bool) -> Self {
        self.awaiting_reply = awaiting;
        self
    }

    /// All display lines for `width` columns, oldest first
    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for message in self.messages {
            let (label, color) = match message.role {
                Role::User => ("You".to_string(), Color::Rgb(0, 132, 255)),
                Role::Bot => (self.bot_name.to_string(), Color::Green),
            };
            lines.push(Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {}", message.sent_at.with_timezone(&chrono::Local).format("%H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            for chunk in wrap_text(&message.text, width.saturating_sub(2)) {
                lines.push(Line::from(format!("  {}", chunk)));
            }
            lines.push(Line::from(""));
        }

        if self.awaiting_reply {
            lines.push(Line::from(Span::styled(
                format!("{} is typing...", self.bot_name),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }
}

/// Greedy word wrap; words longer than `width` are split
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            lines.push(word.drain(..width).collect());
        }

        let needed = if current_len == 0 { word.len() } else { word.len() + 1 };
        if current_len + needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let lines = self.lines(inner_area.width as usize);
        let height = inner_area.height as usize;
        // Newest messages stay in view
        let skip = lines.len().saturating_sub(height);

        for (i, line) in lines.iter().skip(skip).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
