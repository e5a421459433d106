use std::fs;

use ratatui::style::Color;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ThemeKind};

#[derive(Embed)]
#[folder = "assets/themes/"]
struct ThemeAssets;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeColors {
    pub bg: String,
    pub fg: String,
    pub text_correct: String,
    pub text_incorrect: String,
    pub text_incorrect_bg: String,
    pub text_pending: String,
    pub text_cursor_bg: String,
    pub text_cursor_fg: String,
    pub pinyin: String,
    pub accent: String,
    pub accent_dim: String,
    pub border: String,
    pub header_bg: String,
    pub header_fg: String,
    pub bar_filled: String,
    pub bar_empty: String,
    pub error: String,
    pub warning: String,
    pub success: String,
}

impl Theme {
    /// A user file in `<config_dir>/pinydr/themes/` wins over the bundled one.
    pub fn load(name: &str) -> Option<Self> {
        let filename = format!("{name}.toml");

        let user_path = Config::config_dir().join("themes").join(&filename);
        if let Ok(content) = fs::read_to_string(&user_path) {
            match toml::from_str::<Theme>(&content) {
                Ok(theme) => return Some(theme),
                Err(e) => tracing::warn!(path = %user_path.display(), error = %e, "ignoring user theme"),
            }
        }

        let file = ThemeAssets::get(&filename)?;
        let content = std::str::from_utf8(file.data.as_ref()).ok()?;
        toml::from_str::<Theme>(content).ok()
    }

    pub fn for_kind(kind: ThemeKind) -> Self {
        Self::load(kind.as_str()).unwrap_or_else(|| Self {
            name: kind.as_str().to_string(),
            colors: match kind {
                ThemeKind::Light => ThemeColors::light(),
                ThemeKind::Dark => ThemeColors::dark(),
            },
        })
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::for_kind(ThemeKind::default())
    }
}

impl ThemeColors {
    fn light() -> Self {
        Self {
            bg: "#fafaf7".to_string(),
            fg: "#2f3437".to_string(),
            text_correct: "#2e7d32".to_string(),
            text_incorrect: "#c62828".to_string(),
            text_incorrect_bg: "#fde7e7".to_string(),
            text_pending: "#8a9096".to_string(),
            text_cursor_bg: "#fff3c4".to_string(),
            text_cursor_fg: "#2f3437".to_string(),
            pinyin: "#1565c0".to_string(),
            accent: "#e65100".to_string(),
            accent_dim: "#ffe0b2".to_string(),
            border: "#c9ccd1".to_string(),
            header_bg: "#eceae4".to_string(),
            header_fg: "#2f3437".to_string(),
            bar_filled: "#e65100".to_string(),
            bar_empty: "#eceae4".to_string(),
            error: "#c62828".to_string(),
            warning: "#b26a00".to_string(),
            success: "#2e7d32".to_string(),
        }
    }

    fn dark() -> Self {
        Self {
            bg: "#1e1e2e".to_string(),
            fg: "#cdd6f4".to_string(),
            text_correct: "#a6e3a1".to_string(),
            text_incorrect: "#f38ba8".to_string(),
            text_incorrect_bg: "#45273a".to_string(),
            text_pending: "#6c7086".to_string(),
            text_cursor_bg: "#f5e0dc".to_string(),
            text_cursor_fg: "#1e1e2e".to_string(),
            pinyin: "#89b4fa".to_string(),
            accent: "#fab387".to_string(),
            accent_dim: "#45475a".to_string(),
            border: "#45475a".to_string(),
            header_bg: "#313244".to_string(),
            header_fg: "#cdd6f4".to_string(),
            bar_filled: "#fab387".to_string(),
            bar_empty: "#313244".to_string(),
            error: "#f38ba8".to_string(),
            warning: "#f9e2af".to_string(),
            success: "#a6e3a1".to_string(),
        }
    }

    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6 {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return Color::Rgb(r, g, b);
            }
        }
        Color::Reset
    }
}

macro_rules! color_accessors {
    ($($field:ident),* $(,)?) => {
        impl ThemeColors {
            $(pub fn $field(&self) -> Color { Self::parse_color(&self.$field) })*
        }
    };
}

color_accessors!(
    bg,
    fg,
    text_correct,
    text_incorrect,
    text_incorrect_bg,
    text_pending,
    text_cursor_bg,
    text_cursor_fg,
    pinyin,
    accent,
    accent_dim,
    border,
    header_bg,
    header_fg,
    bar_filled,
    bar_empty,
    error,
    warning,
    success,
);
