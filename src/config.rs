use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Minutes of 0 select the short trial session.
pub const TRIAL_SESSION_SECS: u32 = 10;
pub const MAX_SESSION_MINUTES: u32 = 120;
pub const MAX_AUTO_CONFIRM_MS: u64 = 5000;
pub const MAX_PREFETCH_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Light,
    Dark,
}

impl ThemeKind {
    pub fn toggle(self) -> Self {
        match self {
            ThemeKind::Light => ThemeKind::Dark,
            ThemeKind::Dark => ThemeKind::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeKind::Light => "light",
            ThemeKind::Dark => "dark",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_session_minutes")]
    pub session_minutes: u32,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default)]
    pub content_endpoint: Option<String>,
    #[serde(default = "default_auto_confirm_ms")]
    pub auto_confirm_ms: u64,
    #[serde(default = "default_prefetch_depth")]
    pub prefetch_depth: usize,
}

fn default_session_minutes() -> u32 {
    10
}
fn default_category() -> String {
    "sentence".to_string()
}
fn default_auto_confirm_ms() -> u64 {
    0
}
fn default_prefetch_depth() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_minutes: default_session_minutes(),
            default_category: default_category(),
            content_endpoint: None,
            auto_confirm_ms: default_auto_confirm_ms(),
            prefetch_depth: default_prefetch_depth(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pinydr")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Clamp out-of-range values after deserialization or CLI overrides.
    pub fn validate(&mut self) {
        self.session_minutes = self.session_minutes.min(MAX_SESSION_MINUTES);
        self.auto_confirm_ms = self.auto_confirm_ms.min(MAX_AUTO_CONFIRM_MS);
        self.prefetch_depth = self.prefetch_depth.clamp(1, MAX_PREFETCH_DEPTH);
        if self.default_category.trim().is_empty() {
            self.default_category = default_category();
        }
        if self
            .content_endpoint
            .as_deref()
            .is_some_and(|e| e.trim().is_empty())
        {
            self.content_endpoint = None;
        }
    }

    pub fn session_secs(&self) -> u32 {
        if self.session_minutes == 0 {
            TRIAL_SESSION_SECS
        } else {
            self.session_minutes * 60
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session_minutes, 10);
        assert_eq!(config.default_category, "sentence");
        assert_eq!(config.content_endpoint, None);
        assert_eq!(config.auto_confirm_ms, 0);
        assert_eq!(config.prefetch_depth, 3);
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
session_minutes = 5
content_endpoint = "http://localhost:3000"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session_minutes, 5);
        assert_eq!(config.content_endpoint.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.default_category, "sentence");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.content_endpoint = Some("http://example.test".to_string());
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = Config {
            session_minutes: 500,
            default_category: "  ".to_string(),
            content_endpoint: Some(String::new()),
            auto_confirm_ms: 60_000,
            prefetch_depth: 0,
        };
        config.validate();
        assert_eq!(config.session_minutes, MAX_SESSION_MINUTES);
        assert_eq!(config.default_category, "sentence");
        assert_eq!(config.content_endpoint, None);
        assert_eq!(config.auto_confirm_ms, MAX_AUTO_CONFIRM_MS);
        assert_eq!(config.prefetch_depth, 1);

        config.prefetch_depth = 99;
        config.validate();
        assert_eq!(config.prefetch_depth, MAX_PREFETCH_DEPTH);
    }

    #[test]
    fn test_session_secs() {
        let mut config = Config::default();
        assert_eq!(config.session_secs(), 600);
        config.session_minutes = 0;
        assert_eq!(config.session_secs(), TRIAL_SESSION_SECS);
    }

    #[test]
    fn test_theme_kind() {
        assert_eq!(ThemeKind::default(), ThemeKind::Light);
        assert_eq!(ThemeKind::Light.toggle(), ThemeKind::Dark);
        assert_eq!(ThemeKind::Dark.toggle(), ThemeKind::Light);
        assert_eq!(serde_json::to_string(&ThemeKind::Dark).unwrap(), "\"dark\"");
        let parsed: ThemeKind = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(parsed, ThemeKind::Light);
    }
}
