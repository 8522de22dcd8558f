use super::history::wrap_text;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

/// Header with the app title and, once a booking is confirmed, the banner
pub struct ConfirmationBanner<'a> {
    pub title: &'a str,
    pub confirmation: Option<&'a str>,
}

impl ConfirmationBanner<'_> {
    /// Rows needed to show the header at `width`
    pub fn height(&self, width: u16) -> u16 {
        let inner = width.saturating_sub(2) as usize;
        let rows = |text: &str| wrap_text(text, inner).len().max(1) as u16;

        let text_rows = rows(self.title) + self.confirmation.map_or(0, rows);
        // plus borders
        2 + text_rows
    }
}

impl Widget for ConfirmationBanner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![Line::from(Span::styled(
            self.title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))];
        if let Some(text) = self.confirmation {
            lines.push(Line::from(Span::styled(
                text,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .style(Style::default().bg(Color::Rgb(0, 132, 255))),
            )
            .render(area, buf);
    }
}

/// Modal that must be dismissed before the chat accepts input again
pub struct AcknowledgementDialog<'a> {
    pub text: &'a str,
}

impl AcknowledgementDialog<'_> {
    /// Centered area for the dialog inside `area`
    pub fn area(&self, area: Rect) -> Rect {
        let width = area.width.saturating_sub(4).min(60).max(1);
        let rows = wrap_text(self.text, width.saturating_sub(2) as usize).len() as u16;
        let height = (rows + 4).min(area.height);
        Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        }
    }
}

impl Widget for AcknowledgementDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dialog_area = self.area(area);
        Clear.render(dialog_area, buf);

        let lines = vec![
            Line::from(self.text),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to continue",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Reservation confirmed")
                    .style(Style::default().fg(Color::White).bg(Color::Black)),
            )
            .render(dialog_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};

    const TITLE: &str = "Welcome to my travel bot!";
    const BOOKED: &str = "Congratulations! Your compact for pick up in Denver on 2026-12-03 has been reserved!";

    #[test]
    fn wide_header_uses_one_row_per_line() {
        let banner = ConfirmationBanner {
            title: TITLE,
            confirmation: None,
        };
        assert_eq!(banner.height(80), 3);

        let banner = ConfirmationBanner {
            title: TITLE,
            confirmation: Some("Booked!"),
        };
        assert_eq!(banner.height(80), 4);
    }

    #[test]
    fn narrow_header_keeps_the_whole_confirmation_visible() {
        let width = 20;
        let banner = ConfirmationBanner {
            title: TITLE,
            confirmation: Some(BOOKED),
        };
        let title_rows = wrap_text(TITLE, 18).len() as u16;
        assert!(title_rows > 1);
        let height = banner.height(width);
        assert_eq!(height, 2 + title_rows + wrap_text(BOOKED, 18).len() as u16);

        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| {
                ConfirmationBanner {
                    title: TITLE,
                    confirmation: Some(BOOKED),
                }
                .render(frame.size(), frame.buffer_mut())
            })
            .unwrap();
        let shown: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(shown.contains("reserved!"), "{shown}");
    }
}
