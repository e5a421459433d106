use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_embed::Embed;
use serde::Deserialize;

use crate::content::{
    ArticleCursor, Category, ContentError, ContentItem, ContentRequest, ContentSource,
    ReservedCategory, Volume,
};

#[derive(Embed)]
#[folder = "assets/content/"]
struct ContentAssets;

/// Commonly confused characters, drilled when the mistake book is empty.
pub const CONFUSABLES: [char; 10] = ['那', '哪', '拔', '拨', '拆', '折', '即', '既', '染', '梁'];

const FALLBACK_TEXT: &str = "小桥流水人家";

#[derive(Debug, Default, Deserialize)]
struct Library {
    pools: HashMap<ReservedCategory, Vec<String>>,
    #[serde(default)]
    volumes: Vec<VolumeData>,
}

#[derive(Debug, Deserialize)]
struct VolumeData {
    id: String,
    name: String,
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: String,
    lines: Vec<String>,
}

impl Library {
    fn embedded() -> Result<Self, ContentError> {
        let file = ContentAssets::get("samples.json")
            .ok_or_else(|| ContentError::Payload("samples.json is not bundled".to_string()))?;
        serde_json::from_slice(file.data.as_ref()).map_err(|e| ContentError::Payload(e.to_string()))
    }

    fn pool(&self, category: ReservedCategory) -> &[String] {
        self.pools.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Curated local pools plus bundled curriculum volumes.
pub struct SampleSource {
    library: Library,
    rng: Mutex<SmallRng>,
}

impl SampleSource {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        let library = Library::embedded().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "bundled samples unreadable");
            Library::default()
        });
        Self {
            library,
            rng: Mutex::new(rng),
        }
    }

    fn pick_index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..len)
    }

    fn pick_from(&self, pool: &[String]) -> Result<ContentItem, ContentError> {
        if pool.is_empty() {
            return Err(ContentError::Empty);
        }
        Ok(ContentItem::sentence(pool[self.pick_index(pool.len())].clone()))
    }

    fn builtin(&self, category: ReservedCategory, mistakes: &[char]) -> Result<ContentItem, ContentError> {
        match category {
            ReservedCategory::Random => {
                let pool = ReservedCategory::RANDOM_POOL;
                let picked = pool[self.pick_index(pool.len())];
                self.pick_from(self.library.pool(picked))
            }
            ReservedCategory::Mistake => self.review(mistakes),
            other => match self.pick_from(self.library.pool(other)) {
                Err(ContentError::Empty) if self.library.pools.is_empty() => {
                    Ok(ContentItem::sentence(FALLBACK_TEXT))
                }
                result => result,
            },
        }
    }

    /// Prefers the samples covering the most weak characters.
    fn review(&self, mistakes: &[char]) -> Result<ContentItem, ContentError> {
        let targets: &[char] = if mistakes.is_empty() {
            &CONFUSABLES
        } else {
            mistakes
        };

        let mut best: Vec<&String> = Vec::new();
        let mut best_score = 0;
        for text in self.library.pools.values().flatten() {
            let score = targets.iter().filter(|c| text.contains(**c)).count();
            if score > best_score {
                best_score = score;
                best.clear();
            }
            if score == best_score && score > 0 {
                best.push(text);
            }
        }

        if best.is_empty() {
            return self.pick_from(self.library.pool(ReservedCategory::Mistake));
        }
        // Pools iterate in hash order; sort so seeded picks repeat.
        best.sort();
        Ok(ContentItem::sentence(best[self.pick_index(best.len())].clone()))
    }

    /// The requested line and the rest of its article, or the first article
    /// when starting fresh. Past the last line moves to the next article.
    fn volume(&self, id: &str, next_from: Option<ArticleCursor>) -> Result<Vec<ContentItem>, ContentError> {
        let volume = self
            .library
            .volumes
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| ContentError::UnknownVolume(id.to_string()))?;
        if volume.articles.is_empty() {
            return Err(ContentError::Empty);
        }

        let (mut article_id, mut line) = match next_from {
            Some(cursor) => (cursor.article_id as usize, (cursor.line_index as usize).saturating_add(1)),
            None => (0, 0),
        };
        let article = volume
            .articles
            .get(article_id)
            .ok_or_else(|| ContentError::Payload(format!("no article {article_id} in {id}")))?;
        if line >= article.lines.len() {
            article_id = (article_id + 1) % volume.articles.len();
            line = 0;
        }

        let article = &volume.articles[article_id];
        let total_lines = article.lines.len() as u32;
        let items: Vec<ContentItem> = article
            .lines
            .iter()
            .enumerate()
            .skip(line)
            .map(|(i, text)| ContentItem {
                text: text.clone(),
                title: Some(article.title.clone()),
                article: Some(ArticleCursor {
                    article_id: article_id as u64,
                    line_index: i as u32,
                    total_lines,
                }),
            })
            .collect();
        if items.is_empty() {
            return Err(ContentError::Empty);
        }
        Ok(items)
    }
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSource for SampleSource {
    fn fetch(&self, request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
        match &request.category {
            Category::Builtin(reserved) => Ok(vec![self.builtin(*reserved, &request.mistakes)?]),
            Category::Volume(id) => self.volume(id, request.next_from),
        }
    }

    fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
        Ok(self
            .library
            .volumes
            .iter()
            .map(|v| Volume {
                id: v.id.clone(),
                name: v.name.clone(),
            })
            .collect())
    }
}
