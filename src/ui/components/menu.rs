use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::content::{Category, ReservedCategory, Volume};
use crate::ui::theme::Theme;

pub struct MenuItem {
    pub category: Category,
    pub label: String,
}

/// Category picker: the reserved pools first, then any known volumes.
pub struct Menu {
    pub items: Vec<MenuItem>,
    pub selected: usize,
}

impl Menu {
    pub fn new() -> Self {
        let items = ReservedCategory::ALL
            .into_iter()
            .map(|c| MenuItem {
                category: Category::Builtin(c),
                label: c.label().to_string(),
            })
            .collect();
        Self { items, selected: 0 }
    }

    /// Replaces the volume entries, keeping the reserved ones.
    pub fn set_volumes(&mut self, volumes: &[Volume]) {
        self.items.retain(|item| item.category.is_builtin());
        self.items.extend(volumes.iter().map(|v| MenuItem {
            category: Category::Volume(v.id.clone()),
            label: v.name.clone(),
        }));
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
    }

    pub fn select(&mut self, category: &Category) {
        if let Some(i) = self.items.iter().position(|item| &item.category == category) {
            self.selected = i;
        }
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.items.get(self.selected).map(|item| &item.category)
    }

    pub fn label_of(&self, category: &Category) -> String {
        self.items
            .iter()
            .find(|item| &item.category == category)
            .map(|item| item.label.clone())
            .unwrap_or_else(|| category.to_string())
    }

    pub fn next(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.selected = self.items.len().saturating_sub(1);
        }
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MenuView<'a> {
    pub menu: &'a Menu,
    pub current: &'a Category,
    pub theme: &'a Theme,
}

impl Widget for MenuView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(" Category ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));

        let mut lines: Vec<Line> = vec![Line::from("")];
        for (i, item) in self.menu.items.iter().enumerate() {
            let is_selected = i == self.menu.selected;
            let indicator = if is_selected { ">" } else { " " };
            let active = if &item.category == self.current { " *" } else { "" };
            let style = Style::default()
                .fg(if is_selected { colors.accent() } else { colors.fg() })
                .add_modifier(if is_selected {
                    Modifier::BOLD
                } else {
                    Modifier::empty()
                });
            lines.push(Line::from(vec![
                Span::styled(format!(" {indicator} {}", item.label), style),
                Span::styled(active, Style::default().fg(colors.text_pending())),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  [j/k] Move  [Enter] Select  [Esc] Close",
            Style::default().fg(colors.text_pending()),
        )));

        Paragraph::new(lines).block(block).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_wraps_and_selects() {
        let mut menu = Menu::new();
        assert_eq!(menu.items.len(), ReservedCategory::ALL.len());
        menu.prev();
        assert_eq!(
            menu.selected_category(),
            Some(&Category::Builtin(ReservedCategory::Mistake))
        );
        menu.next();
        assert_eq!(
            menu.selected_category(),
            Some(&Category::Builtin(ReservedCategory::Random))
        );
    }

    #[test]
    fn test_set_volumes_replaces_volume_entries() {
        let mut menu = Menu::new();
        let volumes = vec![Volume {
            id: "grade-1-vol-1".to_string(),
            name: "Grade 1".to_string(),
        }];
        menu.set_volumes(&volumes);
        menu.set_volumes(&volumes);
        assert_eq!(menu.items.len(), ReservedCategory::ALL.len() + 1);
        let vol = Category::parse("grade-1-vol-1");
        menu.select(&vol);
        assert_eq!(menu.selected_category(), Some(&vol));
        assert_eq!(menu.label_of(&vol), "Grade 1");
        assert_eq!(menu.label_of(&Category::parse("unknown")), "unknown");
    }
}
