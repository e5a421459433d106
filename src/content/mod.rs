//! Practice text supply: categories, the source contract and the prefetch feed.

pub mod feed;
#[cfg(feature = "network")]
pub mod remote;
pub mod samples;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories served from curated sample pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservedCategory {
    Random,
    Poem,
    Tongue,
    Sentence,
    Idiom,
    Classical,
    Mistake,
}

impl ReservedCategory {
    pub const ALL: [ReservedCategory; 7] = [
        ReservedCategory::Random,
        ReservedCategory::Poem,
        ReservedCategory::Tongue,
        ReservedCategory::Sentence,
        ReservedCategory::Idiom,
        ReservedCategory::Classical,
        ReservedCategory::Mistake,
    ];

    /// What `Random` draws from.
    pub const RANDOM_POOL: [ReservedCategory; 5] = [
        ReservedCategory::Poem,
        ReservedCategory::Tongue,
        ReservedCategory::Sentence,
        ReservedCategory::Idiom,
        ReservedCategory::Classical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservedCategory::Random => "random",
            ReservedCategory::Poem => "poem",
            ReservedCategory::Tongue => "tongue",
            ReservedCategory::Sentence => "sentence",
            ReservedCategory::Idiom => "idiom",
            ReservedCategory::Classical => "classical",
            ReservedCategory::Mistake => "mistake",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReservedCategory::Random => "Random",
            ReservedCategory::Poem => "Poems",
            ReservedCategory::Tongue => "Tongue twisters",
            ReservedCategory::Sentence => "Sentences",
            ReservedCategory::Idiom => "Idioms",
            ReservedCategory::Classical => "Classical",
            ReservedCategory::Mistake => "Mistake review",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == id)
    }
}

/// A requested category, resolved once at the boundary: a reserved pool or
/// an opaque curriculum volume id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Builtin(ReservedCategory),
    Volume(String),
}

impl Category {
    /// Blank input falls back to sentences.
    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        if id.is_empty() {
            return Category::Builtin(ReservedCategory::Sentence);
        }
        match ReservedCategory::from_id(id) {
            Some(reserved) => Category::Builtin(reserved),
            None => Category::Volume(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Builtin(reserved) => reserved.as_str(),
            Category::Volume(id) => id,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Category::Builtin(_))
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Builtin(ReservedCategory::Sentence)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::parse(s))
    }
}

/// Position of a line inside a paginated article.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArticleCursor {
    pub article_id: u64,
    pub line_index: u32,
    pub total_lines: u32,
}

impl ArticleCursor {
    pub fn is_last_line(&self) -> bool {
        self.line_index.saturating_add(1) >= self.total_lines
    }

    /// True when `other` is the line right after this one.
    pub fn is_followed_by(&self, other: &ArticleCursor) -> bool {
        other.article_id == self.article_id && self.line_index.checked_add(1) == Some(other.line_index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentItem {
    pub text: String,
    pub title: Option<String>,
    pub article: Option<ArticleCursor>,
}

impl ContentItem {
    pub fn sentence(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
            article: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRequest {
    pub category: Category,
    /// Weak characters, only sent for mistake review.
    pub mistakes: Vec<char>,
    /// Ask for the line after this one instead of a fresh pick.
    pub next_from: Option<ArticleCursor>,
}

impl ContentRequest {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            mistakes: Vec::new(),
            next_from: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content request failed: {0}")]
    Request(String),
    #[error("unexpected content payload: {0}")]
    Payload(String),
    #[error("unknown volume: {0}")]
    UnknownVolume(String),
    #[error("content source returned no text")]
    Empty,
    #[error("content worker stopped")]
    Disconnected,
}

/// Anything that can hand out practice texts. Runs on the feed's worker
/// thread, so blocking is fine.
pub trait ContentSource: Send {
    fn fetch(&self, request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError>;

    fn volumes(&self) -> Result<Vec<Volume>, ContentError>;
}

impl<S: ContentSource + Sync> ContentSource for std::sync::Arc<S> {
    fn fetch(&self, request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
        (**self).fetch(request)
    }

    fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
        (**self).volumes()
    }
}

/// The remote service when an endpoint is configured, local pools otherwise.
pub fn source_for(endpoint: Option<&str>) -> Box<dyn ContentSource> {
    match endpoint {
        #[cfg(feature = "network")]
        Some(url) => match remote::RemoteSource::new(url) {
            Ok(source) => Box::new(source),
            Err(e) => {
                tracing::warn!(error = %e, "remote content unavailable, using local samples");
                Box::new(samples::SampleSource::new())
            }
        },
        #[cfg(not(feature = "network"))]
        Some(_) => {
            tracing::warn!("built without network support, using local samples");
            Box::new(samples::SampleSource::new())
        }
        None => Box::new(samples::SampleSource::new()),
    }
}
