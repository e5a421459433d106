use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, ThemeKind};
use crate::engine::mistakes::MistakeBook;
use crate::session::stat::SessionHistory;

pub const SCHEMA_VERSION: u32 = 1;

pub const MISTAKES_KEY: &str = "mistakes";
pub const SESSIONS_KEY: &str = "sessions";
pub const CATEGORY_KEY: &str = "category";
pub const THEME_KEY: &str = "theme";

pub const ALL_KEYS: &[&str] = &[MISTAKES_KEY, SESSIONS_KEY, CATEGORY_KEY, THEME_KEY];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakesData {
    pub schema_version: u32,
    pub mistakes: MistakeBook,
}

impl Default for MistakesData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            mistakes: MistakeBook::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsData {
    pub schema_version: u32,
    pub sessions: SessionHistory,
}

impl Default for SessionsData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sessions: SessionHistory::default(),
        }
    }
}

/// Documents that carry a schema version; a stale one loads as default.
pub trait Versioned {
    fn schema_version(&self) -> u32;

    fn needs_reset(&self) -> bool {
        self.schema_version() != SCHEMA_VERSION
    }
}

impl Versioned for MistakesData {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

impl Versioned for SessionsData {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub pinydr_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub config: Config,
    pub mistakes: MistakesData,
    pub sessions: SessionsData,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub theme: ThemeKind,
}
