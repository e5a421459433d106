use serde::{Deserialize, Serialize};

use crate::engine::practice::MistakeRecord;

/// One tracked mistake. Unique per `(character, correct)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeEntry {
    #[serde(rename = "char")]
    pub character: char,
    /// Most recent wrong input; overwritten, not accumulated.
    pub wrong: String,
    pub correct: String,
    pub count: u32,
}

/// Per-character roll-up across all of its tracked readings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeakPattern {
    pub character: char,
    pub count: u32,
    pub wrong_inputs: Vec<String>,
    pub correct: String,
}

/// Stored as a plain list. Loading merges rows that share a key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MistakeEntry>", into = "Vec<MistakeEntry>")]
pub struct MistakeBook {
    entries: Vec<MistakeEntry>,
}

impl From<Vec<MistakeEntry>> for MistakeBook {
    fn from(entries: Vec<MistakeEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<MistakeBook> for Vec<MistakeEntry> {
    fn from(book: MistakeBook) -> Self {
        book.entries
    }
}

impl MistakeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<MistakeEntry>) -> Self {
        let mut book = Self::new();
        for e in entries {
            match book.position(e.character, &e.correct) {
                Some(idx) => {
                    book.entries[idx].count += e.count;
                    book.entries[idx].wrong = e.wrong;
                }
                None => book.entries.push(e),
            }
        }
        book
    }

    fn position(&self, character: char, correct: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.character == character && e.correct == correct)
    }

    pub fn record(&mut self, character: char, wrong: &str, correct: &str) {
        match self.position(character, correct) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.count += 1;
                entry.wrong = wrong.to_string();
            }
            None => self.entries.push(MistakeEntry {
                character,
                wrong: wrong.to_string(),
                correct: correct.to_string(),
                count: 1,
            }),
        }
    }

    pub fn record_mistake(&mut self, m: &MistakeRecord) {
        self.record(m.character, &m.wrong, &m.correct);
    }

    pub fn list(&self) -> &[MistakeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&mut self, character: char, correct: &str) -> bool {
        match self.position(character, correct) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries by count, highest first. Ties keep insertion order.
    pub fn sorted_by_count(&self) -> Vec<&MistakeEntry> {
        let mut sorted: Vec<&MistakeEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    /// Characters of the `n` highest-count entries, without repeats. Feeds
    /// the review content request.
    pub fn top_characters(&self, n: usize) -> Vec<char> {
        let mut out: Vec<char> = Vec::new();
        for e in self.sorted_by_count() {
            if out.len() >= n {
                break;
            }
            if !out.contains(&e.character) {
                out.push(e.character);
            }
        }
        out
    }

    /// Every mistaken character once, in insertion order.
    pub fn unique_characters(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            if !out.contains(e.character) {
                out.push(e.character);
            }
        }
        out
    }

    pub fn weak_patterns(&self, n: usize) -> Vec<WeakPattern> {
        let mut patterns: Vec<WeakPattern> = Vec::new();
        for e in &self.entries {
            match patterns.iter_mut().find(|p| p.character == e.character) {
                Some(p) => {
                    p.count += e.count;
                    if !p.wrong_inputs.contains(&e.wrong) {
                        p.wrong_inputs.push(e.wrong.clone());
                    }
                }
                None => patterns.push(WeakPattern {
                    character: e.character,
                    count: e.count,
                    wrong_inputs: vec![e.wrong.clone()],
                    correct: e.correct.clone(),
                }),
            }
        }
        patterns.sort_by(|a, b| b.count.cmp(&a.count));
        patterns.truncate(n);
        patterns
    }
}
