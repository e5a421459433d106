use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::engine::mistakes::MistakeEntry;
use crate::ui::theme::Theme;

pub struct MistakeList<'a> {
    /// Already sorted by count, highest first.
    pub entries: &'a [&'a MistakeEntry],
    pub selected: usize,
    pub confirm_clear: bool,
    pub theme: &'a Theme,
}

/// First visible row so that `selected` stays on screen.
fn scroll_offset(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        return 0;
    }
    (selected + 1).saturating_sub(visible)
}

impl Widget for MistakeList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" Mistakes ({}) ", self.entries.len()))
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(2),
            ])
            .split(inner);

        let header_style = Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD);
        Paragraph::new(Line::from(Span::styled(
            format!("   {:<4}{:<10}{:<10}{:>6}", "Char", "Correct", "Typed", "Count"),
            header_style,
        )))
        .render(layout[0], buf);

        if self.entries.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "   No mistakes recorded. Keep practicing!",
                Style::default().fg(colors.text_pending()),
            )))
            .render(layout[1], buf);
        } else {
            let visible = layout[1].height as usize;
            let offset = scroll_offset(self.selected, visible);
            let lines: Vec<Line> = self
                .entries
                .iter()
                .enumerate()
                .skip(offset)
                .take(visible)
                .map(|(i, entry)| {
                    let is_selected = i == self.selected;
                    let indicator = if is_selected { " > " } else { "   " };
                    let base = if is_selected {
                        Style::default().fg(colors.accent()).bg(colors.accent_dim())
                    } else {
                        Style::default().fg(colors.fg())
                    };
                    Line::from(vec![
                        Span::styled(indicator, base),
                        // Han glyphs are two columns wide.
                        Span::styled(format!("{}  ", entry.character), base.add_modifier(Modifier::BOLD)),
                        Span::styled(format!("{:<10}", entry.correct), base.fg(colors.text_correct())),
                        Span::styled(format!("{:<10}", entry.wrong), base.fg(colors.text_incorrect())),
                        Span::styled(format!("{:>6}", entry.count), base),
                    ])
                })
                .collect();
            Paragraph::new(lines).render(layout[1], buf);
        }

        Paragraph::new(Line::from(Span::styled(
            "  [j/k] Move  [x] Delete  [C] Clear all  [p] Practice these  [Esc] Back",
            Style::default().fg(colors.accent()),
        )))
        .render(layout[2], buf);

        if self.confirm_clear {
            let dialog_width = 36u16.min(area.width);
            let dialog_height = 5u16.min(area.height);
            let dialog_area = Rect::new(
                area.x + area.width.saturating_sub(dialog_width) / 2,
                area.y + area.height.saturating_sub(dialog_height) / 2,
                dialog_width,
                dialog_height,
            );
            Clear.render(dialog_area, buf);
            Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  Clear all mistakes? (y/n)",
                    Style::default().fg(colors.fg()),
                )),
            ])
            .block(
                Block::bordered()
                    .title(" Confirm ")
                    .border_style(Style::default().fg(colors.error()))
                    .style(Style::default().bg(colors.bg())),
            )
            .render(dialog_area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 5), 0);
        assert_eq!(scroll_offset(4, 5), 0);
        assert_eq!(scroll_offset(5, 5), 1);
        assert_eq!(scroll_offset(12, 5), 8);
        assert_eq!(scroll_offset(3, 0), 0);
    }
}
