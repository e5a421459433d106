use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::session::tracker::{SessionSummary, format_mmss};
use crate::ui::components::stats_sidebar::accuracy_color;
use crate::ui::theme::Theme;

/// Popup shown when a timed session ends.
pub struct Dashboard<'a> {
    pub summary: &'a SessionSummary,
    pub theme: &'a Theme,
}

impl<'a> Dashboard<'a> {
    pub fn new(summary: &'a SessionSummary, theme: &'a Theme) -> Self {
        Self { summary, theme }
    }
}

impl Widget for Dashboard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let s = self.summary;

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(" Session Complete ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(6),
                Constraint::Length(2),
            ])
            .split(inner);

        Paragraph::new(Line::from(Span::styled(
            "Results",
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .render(layout[0], buf);

        if s.counters.typed == 0 {
            Paragraph::new(Line::from(Span::styled(
                "  Nothing was typed, so this session is not recorded.",
                Style::default().fg(colors.text_pending()),
            )))
            .render(layout[1], buf);
        } else {
            let label = |text: &'static str| Span::styled(text, Style::default().fg(colors.fg()));
            let acc_detail = format!("  ({}/{} correct)", s.counters.correct, s.counters.typed);
            let lines = vec![
                Line::from(vec![
                    label("  Accuracy: "),
                    Span::styled(
                        format!("{}%", s.accuracy),
                        Style::default()
                            .fg(accuracy_color(colors, s.accuracy))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(acc_detail, Style::default().fg(colors.text_pending())),
                ]),
                Line::from(vec![
                    label("  Speed:    "),
                    Span::styled(
                        format!("{} chars/min", s.speed()),
                        Style::default()
                            .fg(colors.accent())
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(vec![
                    label("  Duration: "),
                    Span::raw(format_mmss(s.duration_secs.min(u32::MAX as u64) as u32)),
                ]),
                Line::from(vec![
                    label("  Typed:    "),
                    Span::raw(s.counters.typed.to_string()),
                ]),
                Line::from(vec![
                    label("  Wrong:    "),
                    Span::styled(
                        s.counters.wrong.to_string(),
                        Style::default().fg(if s.counters.wrong == 0 {
                            colors.success()
                        } else {
                            colors.error()
                        }),
                    ),
                ]),
            ];
            Paragraph::new(lines).render(layout[1], buf);
        }

        Paragraph::new(Line::from(vec![
            Span::styled("  [Enter/Space] Continue  ", Style::default().fg(colors.accent())),
            Span::styled("[s] Stats  ", Style::default().fg(colors.accent())),
            Span::styled("[m] Mistakes", Style::default().fg(colors.accent())),
        ]))
        .render(layout[2], buf);
    }
}
