use chrono::{DateTime, Local, Utc};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::mistakes::MistakeBook;
use crate::session::report::{self, Period};
use crate::session::stat::SessionStat;
use crate::session::tracker::format_mmss;
use crate::ui::components::chart::TrendChart;
use crate::ui::components::stats_sidebar::accuracy_color;
use crate::ui::theme::Theme;

pub const TAB_COUNT: usize = 3;

pub struct StatsDashboard<'a> {
    pub sessions: &'a [SessionStat],
    pub mistakes: &'a MistakeBook,
    pub period: Period,
    pub active_tab: usize,
    pub now: DateTime<Utc>,
    pub notice: Option<&'a str>,
    pub theme: &'a Theme,
}

impl StatsDashboard<'_> {
    fn render_overview(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let s = report::summarize(self.sessions, self.mistakes, self.period, self.now);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(3)])
            .split(area);

        let row = |label: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!("  {label:<18}"), Style::default().fg(colors.fg())),
                Span::styled(value, Style::default().fg(colors.accent())),
            ])
        };
        let totals = vec![
            row("Sessions", s.total_sessions.to_string()),
            row("Practice time", format!("{} min", s.total_minutes)),
            row("Characters", s.total_characters.to_string()),
            row("Correct / wrong", format!("{} / {}", s.total_correct, s.total_wrong)),
            row("Average accuracy", format!("{}%", s.avg_accuracy)),
            row("Average speed", format!("{} chars/min", s.avg_speed)),
            row("Best accuracy", format!("{}%", s.best_accuracy)),
            row("Best speed", format!("{} chars/min", s.best_speed)),
            row("Tracked mistakes", s.total_mistakes.to_string()),
        ];
        Paragraph::new(totals).render(layout[0], buf);

        let mut recent: Vec<Line> = vec![Line::from(Span::styled(
            format!("  {:<18}{:>7}{:>8}{:>10}{:>9}", "Finished", "Typed", "Acc", "Speed", "Time"),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        ))];
        for stat in self.period.filter(self.sessions, self.now).into_iter().take(10) {
            let finished = stat.end_at.with_timezone(&Local).format("%m-%d %H:%M");
            recent.push(Line::from(vec![
                Span::styled(
                    format!("  {:<18}{:>7}", finished.to_string(), stat.typed),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(
                    format!("{:>7}%", stat.accuracy),
                    Style::default().fg(accuracy_color(colors, stat.accuracy)),
                ),
                Span::styled(
                    format!(
                        "{:>10}{:>9}",
                        stat.speed(),
                        format_mmss(stat.duration_secs.min(u32::MAX as u64) as u32)
                    ),
                    Style::default().fg(colors.fg()),
                ),
            ]));
        }
        Paragraph::new(recent)
            .block(
                Block::bordered()
                    .title(" Recent sessions ")
                    .border_style(Style::default().fg(colors.border())),
            )
            .render(layout[1], buf);
    }

    fn render_trend(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let trends = report::daily_trends(self.sessions, self.period, self.now);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(trends.len() as u16 + 3)])
            .split(area);

        TrendChart::new(&trends, self.theme).render(layout[0], buf);

        let mut lines = vec![Line::from(Span::styled(
            format!("  {:<8}{:>8}{:>12}{:>8}", "Day", "Acc", "Speed", "Chars"),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        ))];
        for t in &trends {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<8}", t.date.format("%m-%d").to_string()),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(
                    format!("{:>7}%", t.accuracy),
                    Style::default().fg(accuracy_color(colors, t.accuracy)),
                ),
                Span::styled(
                    format!("{:>12}{:>8}", t.speed, t.characters),
                    Style::default().fg(colors.fg()),
                ),
            ]));
        }
        Paragraph::new(lines).render(layout[1], buf);
    }

    fn render_mistakes(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let mut top: Vec<Line> = Vec::new();
        for (i, entry) in report::top_mistakes(self.mistakes, 10).iter().enumerate() {
            top.push(Line::from(vec![
                Span::styled(format!(" {:>2}. ", i + 1), Style::default().fg(colors.text_pending())),
                Span::styled(
                    entry.character.to_string(),
                    Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {}", entry.correct), Style::default().fg(colors.text_correct())),
                Span::styled(format!(" ({})", entry.wrong), Style::default().fg(colors.text_incorrect())),
                Span::styled(format!(" x{}", entry.count), Style::default().fg(colors.accent())),
            ]));
        }
        Paragraph::new(top)
            .block(
                Block::bordered()
                    .title(" Top mistakes ")
                    .border_style(Style::default().fg(colors.border())),
            )
            .render(columns[0], buf);

        let mut weak: Vec<Line> = Vec::new();
        for p in self.mistakes.weak_patterns(5) {
            weak.push(Line::from(vec![
                Span::styled(
                    format!(" {} ", p.character),
                    Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
                ),
                Span::styled(p.correct.clone(), Style::default().fg(colors.text_correct())),
                Span::styled(format!("  {} mistakes", p.count), Style::default().fg(colors.accent())),
            ]));
            weak.push(Line::from(Span::styled(
                format!("    typed: {}", p.wrong_inputs.join(", ")),
                Style::default().fg(colors.text_pending()),
            )));
        }
        Paragraph::new(weak)
            .block(
                Block::bordered()
                    .title(" Weak characters ")
                    .border_style(Style::default().fg(colors.border())),
            )
            .render(columns[1], buf);
    }
}

impl Widget for StatsDashboard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" Statistics: {} ", self.period.label()))
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.sessions.is_empty() && self.mistakes.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "  No sessions yet. Press Enter on the practice screen to start one.",
                Style::default().fg(colors.text_pending()),
            )))
            .render(inner, buf);
            return;
        }

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(10),
                Constraint::Length(2),
            ])
            .split(inner);

        let tabs = ["[1] Overview", "[2] Trend", "[3] Mistakes"];
        let tab_spans: Vec<Span> = tabs
            .iter()
            .enumerate()
            .flat_map(|(i, &label)| {
                let style = if i == self.active_tab {
                    Style::default()
                        .fg(colors.accent())
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(colors.text_pending())
                };
                vec![Span::styled(format!(" {label} "), style), Span::raw("  ")]
            })
            .collect();
        Paragraph::new(Line::from(tab_spans)).render(layout[0], buf);

        match self.active_tab {
            0 => self.render_overview(layout[1], buf),
            1 => self.render_trend(layout[1], buf),
            _ => self.render_mistakes(layout[1], buf),
        }

        let footer = match self.notice {
            Some(notice) => Line::from(Span::styled(
                format!("  {notice}"),
                Style::default().fg(colors.success()),
            )),
            None => Line::from(Span::styled(
                "  [Esc] Back  [Tab] Next tab  [p] Period  [r] Save report",
                Style::default().fg(colors.accent()),
            )),
        };
        Paragraph::new(footer).render(layout[2], buf);
    }
}
