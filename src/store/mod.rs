//! Whole-document persistence of mistakes, session history and preferences.
//!
//! [`Storage`] is the injected capability; [`Persistence`] sits on top of it
//! and swallows every failure, logging it and handing callers defaults.

pub mod json_store;
pub mod schema;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{Config, ThemeKind};
use crate::engine::mistakes::MistakeBook;
use crate::session::stat::SessionHistory;
use crate::store::json_store::{JsonStore, MemoryStore};
use crate::store::schema::{
    ALL_KEYS, CATEGORY_KEY, EXPORT_VERSION, ExportData, MISTAKES_KEY, MistakesData, SESSIONS_KEY,
    SessionsData, THEME_KEY, Versioned,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported export version: {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Key-value store of whole JSON documents.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

pub struct Persistence {
    storage: Box<dyn Storage>,
}

impl Persistence {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// File store in the user data directory, or memory if that fails.
    pub fn open_default() -> Self {
        match JsonStore::new() {
            Ok(store) => Self::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "data directory unavailable, nothing will be saved");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable document");
                None
            }
        }
    }

    fn read_versioned<T: DeserializeOwned + Versioned + Default>(&self, key: &str) -> T {
        match self.read::<T>(key) {
            Some(doc) if !doc.needs_reset() => doc,
            Some(_) => {
                tracing::warn!(key, "stale schema version, starting fresh");
                T::default()
            }
            None => T::default(),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, doc: &T) {
        let result = serde_json::to_string_pretty(doc)
            .map_err(StoreError::from)
            .and_then(|json| self.storage.set(key, &json));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "write failed");
        }
    }

    pub fn load_mistakes(&self) -> MistakeBook {
        self.read_versioned::<MistakesData>(MISTAKES_KEY).mistakes
    }

    pub fn save_mistakes(&mut self, mistakes: &MistakeBook) {
        self.write(
            MISTAKES_KEY,
            &MistakesData {
                mistakes: mistakes.clone(),
                ..Default::default()
            },
        );
    }

    pub fn load_sessions(&self) -> SessionHistory {
        let data = self.read_versioned::<SessionsData>(SESSIONS_KEY);
        SessionHistory::from_sessions(data.sessions.sessions().to_vec())
    }

    pub fn save_sessions(&mut self, sessions: &SessionHistory) {
        self.write(
            SESSIONS_KEY,
            &SessionsData {
                sessions: sessions.clone(),
                ..Default::default()
            },
        );
    }

    pub fn load_category(&self) -> Option<String> {
        self.read::<String>(CATEGORY_KEY).filter(|c| !c.is_empty())
    }

    pub fn save_category(&mut self, category: &str) {
        self.write(CATEGORY_KEY, &category);
    }

    pub fn load_theme(&self) -> ThemeKind {
        self.read(THEME_KEY).unwrap_or_default()
    }

    pub fn save_theme(&mut self, theme: ThemeKind) {
        self.write(THEME_KEY, &theme);
    }

    /// Bundles every document plus config.
    pub fn export_all(&self, config: &Config) -> ExportData {
        ExportData {
            pinydr_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            config: config.clone(),
            mistakes: MistakesData {
                mistakes: self.load_mistakes(),
                ..Default::default()
            },
            sessions: SessionsData {
                sessions: self.load_sessions(),
                ..Default::default()
            },
            category: self.load_category(),
            theme: self.load_theme(),
        }
    }

    /// Replaces every document with the export's; an export without a
    /// category drops the saved one. All documents are serialized before the
    /// first write, so a bad export changes nothing.
    pub fn import_all(&mut self, data: &ExportData) -> Result<(), StoreError> {
        if data.pinydr_export_version != EXPORT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: data.pinydr_export_version,
                expected: EXPORT_VERSION,
            });
        }

        let mut staged: Vec<(&str, String)> = vec![
            (MISTAKES_KEY, serde_json::to_string_pretty(&data.mistakes)?),
            (SESSIONS_KEY, serde_json::to_string_pretty(&data.sessions)?),
            (THEME_KEY, serde_json::to_string(&data.theme)?),
        ];
        if let Some(ref category) = data.category {
            staged.push((CATEGORY_KEY, serde_json::to_string(category)?));
        }

        for (key, json) in &staged {
            self.storage.set(key, json)?;
        }
        if data.category.is_none() {
            self.storage.remove(CATEGORY_KEY)?;
        }
        Ok(())
    }

    /// Drops every document. Failures are logged and skipped.
    pub fn clear_all(&mut self) {
        for key in ALL_KEYS {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "remove failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::stat::test_stat;
    use crate::store::schema::SCHEMA_VERSION;

    struct FailingStore;

    impl Storage for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    #[test]
    fn test_failures_fall_back_to_defaults() {
        let mut p = Persistence::new(FailingStore);
        assert!(p.load_mistakes().is_empty());
        assert!(p.load_sessions().is_empty());
        assert_eq!(p.load_theme(), ThemeKind::Light);
        assert_eq!(p.load_category(), None);

        let mut book = MistakeBook::new();
        book.record('你', "ma", "nǐ");
        p.save_mistakes(&book);
        p.save_theme(ThemeKind::Dark);
        p.clear_all();
    }

    #[test]
    fn test_round_trip_documents() {
        let mut p = Persistence::in_memory();
        let mut book = MistakeBook::new();
        book.record('你', "ma", "nǐ");
        p.save_mistakes(&book);

        let mut history = SessionHistory::new();
        history.push(test_stat(1, Utc::now(), 10, 8, 60));
        p.save_sessions(&history);
        p.save_category("poem");
        p.save_theme(ThemeKind::Dark);

        assert_eq!(p.load_mistakes(), book);
        assert_eq!(p.load_sessions(), history);
        assert_eq!(p.load_category().as_deref(), Some("poem"));
        assert_eq!(p.load_theme(), ThemeKind::Dark);
    }

    #[test]
    fn test_corrupt_document_loads_default() {
        let mut store = MemoryStore::new();
        store.set(MISTAKES_KEY, "{not json").unwrap();
        store.set(THEME_KEY, "\"neon\"").unwrap();
        let p = Persistence::new(store);
        assert!(p.load_mistakes().is_empty());
        assert_eq!(p.load_theme(), ThemeKind::Light);
    }

    #[test]
    fn test_stale_schema_resets() {
        let mut store = MemoryStore::new();
        store
            .set(MISTAKES_KEY, r#"{"schema_version":99,"mistakes":[{"char":"你","wrong":"ma","correct":"nǐ","count":1}]}"#)
            .unwrap();
        let p = Persistence::new(store);
        assert!(p.load_mistakes().is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut p = Persistence::in_memory();
        let mut book = MistakeBook::new();
        book.record('好', "ha", "hǎo");
        p.save_mistakes(&book);
        p.save_theme(ThemeKind::Dark);
        p.save_category("idiom");

        let export = p.export_all(&Config::default());
        let json = serde_json::to_string(&export).unwrap();
        let parsed: ExportData = serde_json::from_str(&json).unwrap();

        let mut other = Persistence::in_memory();
        other.import_all(&parsed).unwrap();
        assert_eq!(other.load_mistakes(), book);
        assert_eq!(other.load_theme(), ThemeKind::Dark);
        assert_eq!(other.load_category().as_deref(), Some("idiom"));
    }

    #[test]
    fn test_import_without_category_drops_saved_one() {
        let source = Persistence::in_memory();
        let export = source.export_all(&Config::default());
        assert_eq!(export.category, None);

        let mut other = Persistence::in_memory();
        other.save_category("poem");
        other.import_all(&export).unwrap();
        assert_eq!(other.load_category(), None);
    }

    #[test]
    fn test_duplicate_mistake_rows_merge_on_load() {
        let mut store = MemoryStore::new();
        let doc = format!(
            r#"{{"schema_version":{SCHEMA_VERSION},"mistakes":[
                {{"char":"你","wrong":"ma","correct":"nǐ","count":2}},
                {{"char":"你","wrong":"na","correct":"nǐ","count":3}}]}}"#
        );
        store.set(MISTAKES_KEY, &doc).unwrap();
        let p = Persistence::new(store);

        let mut book = p.load_mistakes();
        assert_eq!(book.len(), 1);
        assert_eq!(book.list()[0].count, 5);
        assert_eq!(book.list()[0].wrong, "na");
        book.record('你', "li", "nǐ");
        assert_eq!(book.len(), 1);
        assert_eq!(book.list()[0].count, 6);
    }

    #[test]
    fn test_import_rejects_unknown_version() {
        let p = Persistence::in_memory();
        let mut export = p.export_all(&Config::default());
        export.pinydr_export_version = 99;
        let mut other = Persistence::in_memory();
        let err = other.import_all(&export).unwrap_err().to_string();
        assert!(err.contains("Unsupported export version"));
        assert!(err.contains("99"));
    }

    #[test]
    fn test_clear_all() {
        let mut p = Persistence::in_memory();
        p.save_category("poem");
        p.save_theme(ThemeKind::Dark);
        p.clear_all();
        assert_eq!(p.load_category(), None);
        assert_eq!(p.load_theme(), ThemeKind::Light);
    }
}
