use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Widget};

use crate::session::report::DailyTrend;
use crate::ui::theme::Theme;

/// Daily accuracy and speed, oldest day on the left.
pub struct TrendChart<'a> {
    pub trends: &'a [DailyTrend],
    pub theme: &'a Theme,
}

impl<'a> TrendChart<'a> {
    pub fn new(trends: &'a [DailyTrend], theme: &'a Theme) -> Self {
        Self { trends, theme }
    }
}

fn points(trends: &[DailyTrend], value: impl Fn(&DailyTrend) -> u32) -> Vec<(f64, f64)> {
    trends
        .iter()
        .enumerate()
        .map(|(i, t)| (i as f64, value(t) as f64))
        .collect()
}

impl Widget for TrendChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(" Daily trend ")
            .border_style(Style::default().fg(colors.border()));

        if self.trends.is_empty() {
            block.render(area, buf);
            return;
        }

        let accuracy = points(self.trends, |t| t.accuracy);
        let speed = points(self.trends, |t| t.speed);
        let max_x = (self.trends.len().saturating_sub(1)).max(1) as f64;
        let max_y = speed
            .iter()
            .map(|(_, y)| *y)
            .fold(100.0f64, f64::max);

        let datasets = vec![
            Dataset::default()
                .name("accuracy %")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(colors.success()))
                .data(&accuracy),
            Dataset::default()
                .name("chars/min")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(colors.accent()))
                .data(&speed),
        ];

        let first = self.trends.first().map(|t| t.date.format("%m-%d").to_string());
        let last = self.trends.last().map(|t| t.date.format("%m-%d").to_string());
        let x_labels: Vec<Span> = [first, last].into_iter().flatten().map(Span::raw).collect();

        Chart::new(datasets)
            .block(block)
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(colors.text_pending()))
                    .bounds([0.0, max_x])
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(colors.text_pending()))
                    .bounds([0.0, max_y * 1.1])
                    .labels(vec![Span::raw("0"), Span::raw(format!("{:.0}", max_y))]),
            )
            .render(area, buf);
    }
}
