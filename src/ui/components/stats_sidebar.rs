use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::session::tracker::{SessionCounters, format_mmss};
use crate::ui::theme::{Theme, ThemeColors};

/// Text progress plus the running session, if any.
pub struct StatsSidebar<'a> {
    pub text_accuracy: u32,
    pub graded: usize,
    pub targets: usize,
    pub remaining_secs: Option<u32>,
    pub counters: Option<SessionCounters>,
    pub session_secs: u32,
    pub theme: &'a Theme,
}

pub fn accuracy_color(colors: &ThemeColors, accuracy: u32) -> Color {
    if accuracy >= 90 {
        colors.success()
    } else if accuracy >= 70 {
        colors.warning()
    } else {
        colors.error()
    }
}

fn stat_line<'s>(label: &'s str, value: String, style: Style, colors: &ThemeColors) -> Line<'s> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(colors.fg())),
        Span::styled(value, style),
    ])
}

impl Widget for StatsSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(8)])
            .split(area);

        let text_lines = vec![
            stat_line(
                "Accuracy: ",
                format!("{}%", self.text_accuracy),
                Style::default().fg(accuracy_color(colors, self.text_accuracy)),
                colors,
            ),
            Line::from(""),
            stat_line(
                "Progress: ",
                format!("{}/{}", self.graded, self.targets),
                Style::default().fg(colors.accent()),
                colors,
            ),
        ];
        let block = Block::bordered()
            .title(" This text ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        Paragraph::new(text_lines).block(block).render(sections[0], buf);

        let session_lines = match (self.remaining_secs, self.counters) {
            (Some(remaining), Some(c)) => vec![
                stat_line(
                    "Time left: ",
                    format_mmss(remaining),
                    Style::default()
                        .fg(if remaining <= 10 {
                            colors.warning()
                        } else {
                            colors.accent()
                        })
                        .add_modifier(Modifier::BOLD),
                    colors,
                ),
                Line::from(""),
                stat_line("Typed:   ", c.typed.to_string(), Style::default().fg(colors.fg()), colors),
                stat_line(
                    "Correct: ",
                    c.correct.to_string(),
                    Style::default().fg(colors.success()),
                    colors,
                ),
                stat_line("Wrong:   ", c.wrong.to_string(), Style::default().fg(colors.error()), colors),
                stat_line(
                    "Accuracy: ",
                    format!("{}%", c.accuracy()),
                    Style::default().fg(accuracy_color(colors, c.accuracy())),
                    colors,
                ),
            ],
            _ => vec![
                Line::from(Span::styled(
                    "No session running.",
                    Style::default().fg(colors.text_pending()),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    format!("[Enter] start {}", format_mmss(self.session_secs)),
                    Style::default().fg(colors.accent()),
                )),
            ],
        };
        let block = Block::bordered()
            .title(" Session ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        Paragraph::new(session_lines)
            .block(block)
            .render(sections[1], buf);
    }
}
