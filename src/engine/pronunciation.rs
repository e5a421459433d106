use std::collections::HashMap;

use icu_properties::CodePointMapData;
use icu_properties::props::Script;
use pinyin::{Pinyin, ToPinyin, ToPinyinMulti};

use crate::engine::normalize::normalize;

/// One acceptable romanization of a character, with its comparison form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pronunciation {
    pub raw: String,
    pub normalized: String,
}

impl Pronunciation {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }
}

/// Lookup of the pronunciations a practice character accepts.
///
/// An unknown character yields an empty set; the engine grades every input
/// against it as wrong rather than treating it as a fault.
pub trait PronunciationSource {
    /// Every accepted reading, polyphones included, without duplicates.
    fn accepted_pronunciations(&self, ch: char) -> Vec<Pronunciation>;

    /// The reading shown as the correct answer (the most common one).
    fn primary_pronunciation(&self, ch: char) -> Option<String>;
}

/// True iff `ch` belongs to the Han script. Only these are graded.
pub fn is_han(ch: char) -> bool {
    CodePointMapData::<Script>::new().get(ch) == Script::Han
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ToneStyle {
    /// nǐ hǎo
    #[default]
    Marks,
    /// ni3 hao3
    Numbers,
    /// ni hao
    None,
}

impl ToneStyle {
    fn render(self, p: Pinyin) -> &'static str {
        match self {
            ToneStyle::Marks => p.with_tone(),
            ToneStyle::Numbers => p.with_tone_num_end(),
            ToneStyle::None => p.plain(),
        }
    }
}

/// Dictionary backed by the bundled data of the `pinyin` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct PinyinDictionary;

impl PinyinDictionary {
    pub fn new() -> Self {
        Self
    }

    /// All readings of `ch` in the given tone style, primary first.
    pub fn readings(&self, ch: char, style: ToneStyle) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if let Some(multi) = ch.to_pinyin_multi() {
            for p in multi {
                let r = style.render(p);
                if !out.iter().any(|o| o == r) {
                    out.push(r.to_string());
                }
            }
        } else if let Some(p) = ch.to_pinyin() {
            out.push(style.render(p).to_string());
        }
        out
    }

    /// Annotates `text` with pinyin, one token per Han character. Other
    /// characters pass through unchanged. With `all_readings`, polyphones are
    /// rendered as `hǎo/hào`.
    pub fn convert(&self, text: &str, style: ToneStyle, all_readings: bool) -> String {
        let mut tokens: Vec<String> = Vec::new();
        let mut passthrough = String::new();

        for ch in text.chars() {
            let readings = if is_han(ch) {
                self.readings(ch, style)
            } else {
                Vec::new()
            };
            if readings.is_empty() {
                passthrough.push(ch);
                continue;
            }
            if !passthrough.trim().is_empty() {
                tokens.push(passthrough.trim().to_string());
            }
            passthrough.clear();
            if all_readings {
                tokens.push(readings.join("/"));
            } else {
                tokens.push(readings[0].clone());
            }
        }
        if !passthrough.trim().is_empty() {
            tokens.push(passthrough.trim().to_string());
        }

        tokens.join(" ")
    }
}

impl PronunciationSource for PinyinDictionary {
    fn accepted_pronunciations(&self, ch: char) -> Vec<Pronunciation> {
        self.readings(ch, ToneStyle::Marks)
            .into_iter()
            .map(Pronunciation::new)
            .collect()
    }

    fn primary_pronunciation(&self, ch: char) -> Option<String> {
        ch.to_pinyin().map(|p| p.with_tone().to_string())
    }
}

/// Fixed character table, first reading primary. Used for curated word lists
/// and for deterministic tests.
#[derive(Clone, Debug, Default)]
pub struct TableDictionary {
    entries: HashMap<char, Vec<String>>,
}

impl TableDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(char, &[&str])]) -> Self {
        let mut table = Self::new();
        for (ch, readings) in pairs {
            for r in *readings {
                table.insert(*ch, r);
            }
        }
        table
    }

    pub fn insert(&mut self, ch: char, reading: &str) {
        let readings = self.entries.entry(ch).or_default();
        if !readings.iter().any(|r| r == reading) {
            readings.push(reading.to_string());
        }
    }
}

impl PronunciationSource for TableDictionary {
    fn accepted_pronunciations(&self, ch: char) -> Vec<Pronunciation> {
        self.entries
            .get(&ch)
            .map(|rs| rs.iter().map(Pronunciation::new).collect())
            .unwrap_or_default()
    }

    fn primary_pronunciation(&self, ch: char) -> Option<String> {
        self.entries.get(&ch).and_then(|rs| rs.first().cloned())
    }
}
