use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::practice::{CharacterSlot, SlotStatus};
use crate::ui::theme::Theme;

/// The practice text, one column per character with its pinyin above.
pub struct TypingArea<'a> {
    slots: &'a [CharacterSlot],
    cursor: usize,
    buffer: &'a str,
    title: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> TypingArea<'a> {
    pub fn new(slots: &'a [CharacterSlot], cursor: usize, buffer: &'a str, theme: &'a Theme) -> Self {
        Self {
            slots,
            cursor,
            buffer,
            title: None,
            theme,
        }
    }

    pub fn title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellKind {
    Plain,
    Pending,
    Current,
    Correct,
    Wrong,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Cell {
    above: String,
    glyph: char,
    kind: CellKind,
    width: usize,
}

fn text_width(s: &str) -> usize {
    Span::raw(s).width()
}

/// The live buffer sits over the cursor; graded slots show their answer.
fn build_cells(slots: &[CharacterSlot], cursor: usize, buffer: &str) -> Vec<Cell> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let kind = if !slot.is_target {
                CellKind::Plain
            } else {
                match slot.status {
                    SlotStatus::Correct => CellKind::Correct,
                    SlotStatus::Wrong => CellKind::Wrong,
                    SlotStatus::Pending if i == cursor => CellKind::Current,
                    SlotStatus::Pending => CellKind::Pending,
                }
            };
            let above = match kind {
                CellKind::Current => buffer.to_string(),
                CellKind::Correct | CellKind::Wrong => {
                    slot.recorded_answer.clone().unwrap_or_default()
                }
                CellKind::Plain | CellKind::Pending => String::new(),
            };
            let glyph_width = text_width(&slot.character.to_string()).max(1);
            let width = text_width(&above).max(glyph_width);
            Cell {
                above,
                glyph: slot.character,
                kind,
                width,
            }
        })
        .collect()
}

/// Packs cells into rows of at most `width` columns, one space between cells.
fn wrap_cells(cells: Vec<Cell>, width: usize) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut used = 0usize;

    for cell in cells {
        let needed = if row.is_empty() { cell.width } else { cell.width + 1 };
        if !row.is_empty() && used + needed > width {
            rows.push(std::mem::take(&mut row));
            used = 0;
        }
        used += if row.is_empty() { cell.width } else { cell.width + 1 };
        row.push(cell);
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

fn centered(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(text_width(s));
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(pad - left))
}

impl Widget for TypingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let mut block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        if let Some(title) = self.title {
            block = block.title(format!(" {title} "));
        }
        let inner = block.inner(area);
        block.render(area, buf);

        let cells = build_cells(self.slots, self.cursor, self.buffer);
        let rows = wrap_cells(cells, inner.width.saturating_sub(2) as usize);

        let mut lines: Vec<Line> = Vec::new();
        for row in rows {
            let mut above: Vec<Span> = vec![Span::raw(" ")];
            let mut glyphs: Vec<Span> = vec![Span::raw(" ")];
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    above.push(Span::raw(" "));
                    glyphs.push(Span::raw(" "));
                }
                let (above_style, glyph_style) = match cell.kind {
                    CellKind::Plain => (
                        Style::default(),
                        Style::default().fg(colors.text_pending()),
                    ),
                    CellKind::Pending => (Style::default(), Style::default().fg(colors.fg())),
                    CellKind::Current => (
                        Style::default()
                            .fg(colors.pinyin())
                            .add_modifier(Modifier::BOLD),
                        Style::default()
                            .fg(colors.text_cursor_fg())
                            .bg(colors.text_cursor_bg())
                            .add_modifier(Modifier::BOLD),
                    ),
                    CellKind::Correct => (
                        Style::default().fg(colors.text_correct()),
                        Style::default().fg(colors.text_correct()),
                    ),
                    CellKind::Wrong => (
                        Style::default().fg(colors.text_incorrect()),
                        Style::default()
                            .fg(colors.text_incorrect())
                            .bg(colors.text_incorrect_bg())
                            .add_modifier(Modifier::UNDERLINED),
                    ),
                };
                above.push(Span::styled(centered(&cell.above, cell.width), above_style));
                glyphs.push(Span::styled(
                    centered(&cell.glyph.to_string(), cell.width),
                    glyph_style,
                ));
            }
            lines.push(Line::from(above));
            lines.push(Line::from(glyphs));
            lines.push(Line::from(""));
        }

        Paragraph::new(lines).render(inner, buf);
    }
}
