//! Keystroke-by-keystroke pinyin practice over one loaded text.
//!
//! The engine owns a [`PracticeSession`]: the slots of the text, the cursor
//! and the in-progress buffer. Each [`PracticeEngine::load`] replaces the
//! session wholesale. Mutators that arrive in an invalid state (empty buffer,
//! exhausted text, non-pinyin key) are ignored and report that through their
//! return value; they never panic or error.

use crate::engine::normalize::normalize;
use crate::engine::pronunciation::{PinyinDictionary, Pronunciation, PronunciationSource, is_han};

/// Longest buffer kept. One more key clears it instead of truncating.
pub const MAX_BUFFER_LEN: usize = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotStatus {
    #[default]
    Pending,
    Correct,
    Wrong,
}

#[derive(Clone, Debug)]
pub struct CharacterSlot {
    pub character: char,
    pub is_target: bool,
    pub status: SlotStatus,
    /// Primary reading shown once the slot is graded, right or wrong.
    pub recorded_answer: Option<String>,
    accepted: Vec<Pronunciation>,
    primary: Option<String>,
}

impl CharacterSlot {
    fn new<P: PronunciationSource>(character: char, source: &P) -> Self {
        let is_target = is_han(character);
        let (accepted, primary) = if is_target {
            (
                source.accepted_pronunciations(character),
                source.primary_pronunciation(character),
            )
        } else {
            (Vec::new(), None)
        };
        Self {
            character,
            is_target,
            status: SlotStatus::Pending,
            recorded_answer: None,
            accepted,
            primary,
        }
    }

    pub fn accepted(&self) -> &[Pronunciation] {
        &self.accepted
    }

    fn accepts(&self, normalized_input: &str) -> bool {
        self.accepted.iter().any(|p| p.normalized == normalized_input)
    }

    /// Unknown characters fall back to showing themselves.
    fn answer(&self) -> String {
        self.primary
            .clone()
            .unwrap_or_else(|| self.character.to_string())
    }
}

/// State for one loaded text.
#[derive(Clone, Debug, Default)]
pub struct PracticeSession {
    pub slots: Vec<CharacterSlot>,
    pub cursor: usize,
    pub buffer: String,
}

impl PracticeSession {
    fn new<P: PronunciationSource>(text: &str, source: &P) -> Self {
        let slots: Vec<CharacterSlot> = text
            .chars()
            .map(|ch| CharacterSlot::new(ch, source))
            .collect();
        let cursor = next_target(&slots, 0);
        Self {
            slots,
            cursor,
            buffer: String::new(),
        }
    }
}

/// First target index at or after `from`, or `slots.len()`.
fn next_target(slots: &[CharacterSlot], from: usize) -> usize {
    slots
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, s)| s.is_target)
        .map(|(i, _)| i)
        .unwrap_or(slots.len())
}

/// A wrong answer, for the mistake book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MistakeRecord {
    pub character: char,
    pub wrong: String,
    pub correct: String,
}

/// Result of a successful confirm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub index: usize,
    pub character: char,
    pub typed: String,
    pub correct: bool,
    pub answer: String,
    /// Set iff the answer was wrong.
    pub mistake: Option<MistakeRecord>,
    /// The confirm graded the last target of the text.
    pub exhausted: bool,
}

pub struct PracticeEngine<P: PronunciationSource = PinyinDictionary> {
    source: P,
    session: PracticeSession,
    generation: u64,
}

impl<P: PronunciationSource> PracticeEngine<P> {
    pub fn new(source: P) -> Self {
        Self {
            source,
            session: PracticeSession::default(),
            generation: 0,
        }
    }

    /// Replaces the current session with a fresh one over `text`.
    pub fn load(&mut self, text: &str) {
        self.session = PracticeSession::new(text, &self.source);
        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            slots = self.session.slots.len(),
            targets = self.target_count(),
            "loaded practice text"
        );
    }

    /// Bumped on every load; lets delayed actions detect a replaced text.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> &PracticeSession {
        &self.session
    }

    pub fn slots(&self) -> &[CharacterSlot] {
        &self.session.slots
    }

    pub fn cursor(&self) -> usize {
        self.session.cursor
    }

    pub fn buffer(&self) -> &str {
        &self.session.buffer
    }

    pub fn text(&self) -> String {
        self.session.slots.iter().map(|s| s.character).collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.session.cursor >= self.session.slots.len()
    }

    pub fn current_slot(&self) -> Option<&CharacterSlot> {
        self.session.slots.get(self.session.cursor)
    }

    /// Appends a pinyin key (`a-z`, `A-Z`, `1-5`), lowercased. Returns false
    /// when the key was ignored.
    pub fn append_key(&mut self, ch: char) -> bool {
        if self.is_exhausted() || !is_pinyin_key(ch) {
            return false;
        }
        let buffer = &mut self.session.buffer;
        buffer.push(ch.to_ascii_lowercase());
        if buffer.chars().count() > MAX_BUFFER_LEN {
            buffer.clear();
        }
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.session.buffer.pop().is_some()
    }

    /// Whether the buffer already names an accepted reading of the current
    /// slot, without grading it.
    pub fn buffer_matches(&self) -> bool {
        if self.session.buffer.is_empty() {
            return false;
        }
        self.current_slot()
            .is_some_and(|slot| slot.accepts(&normalize(&self.session.buffer)))
    }

    /// Grades the buffer against the slot under the cursor and advances to
    /// the next target. Returns `None` when exhausted or the buffer is empty.
    pub fn confirm(&mut self) -> Option<Confirmation> {
        if self.is_exhausted() || self.session.buffer.is_empty() {
            return None;
        }

        let index = self.session.cursor;
        let typed = std::mem::take(&mut self.session.buffer);
        let normalized = normalize(&typed);

        let slot = &mut self.session.slots[index];
        let correct = slot.accepts(&normalized);
        let answer = slot.answer();
        slot.status = if correct {
            SlotStatus::Correct
        } else {
            SlotStatus::Wrong
        };
        slot.recorded_answer = Some(answer.clone());
        let character = slot.character;

        let mistake = (!correct).then(|| MistakeRecord {
            character,
            wrong: typed.clone(),
            correct: answer.clone(),
        });
        if let Some(ref m) = mistake {
            tracing::debug!(character = %m.character, wrong = %m.wrong, correct = %m.correct, "mistake");
        }

        self.session.cursor = next_target(&self.session.slots, index + 1);

        Some(Confirmation {
            index,
            character,
            typed,
            correct,
            answer,
            mistake,
            exhausted: self.is_exhausted(),
        })
    }

    pub fn target_count(&self) -> usize {
        self.session.slots.iter().filter(|s| s.is_target).count()
    }

    pub fn graded_count(&self) -> usize {
        self.graded().count()
    }

    pub fn correct_count(&self) -> usize {
        self.graded()
            .filter(|s| s.status == SlotStatus::Correct)
            .count()
    }

    pub fn wrong_count(&self) -> usize {
        self.graded().filter(|s| s.status == SlotStatus::Wrong).count()
    }

    /// Percentage of graded targets answered correctly; 100 before any grade.
    pub fn accuracy(&self) -> u32 {
        percent(self.correct_count(), self.graded_count())
    }

    pub fn progress(&self) -> f64 {
        let total = self.target_count();
        if total == 0 {
            return 1.0;
        }
        self.graded_count() as f64 / total as f64
    }

    fn graded(&self) -> impl Iterator<Item = &CharacterSlot> {
        self.session
            .slots
            .iter()
            .filter(|s| s.is_target && s.status != SlotStatus::Pending)
    }
}

pub fn is_pinyin_key(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '1'..='5')
}

/// `round(100 * part / whole)`, 100 when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 100;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}
