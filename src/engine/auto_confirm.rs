use std::time::{Duration, Instant};

use crate::engine::practice::{Confirmation, PracticeEngine};
use crate::engine::pronunciation::PronunciationSource;

/// Optional delayed confirm of a buffer that already matches.
///
/// Armed after a keystroke leaves a matching buffer; fires on the first poll
/// past the deadline if neither the buffer nor the loaded text changed since.
#[derive(Debug)]
pub struct AutoConfirm {
    delay: Option<Duration>,
    armed: Option<Armed>,
}

#[derive(Debug)]
struct Armed {
    deadline: Instant,
    generation: u64,
    buffer: String,
}

impl AutoConfirm {
    /// `delay_ms == 0` disables it.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: (delay_ms > 0).then(|| Duration::from_millis(delay_ms)),
            armed: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.delay.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Call after every buffer change.
    pub fn rearm<P: PronunciationSource>(&mut self, engine: &PracticeEngine<P>, now: Instant) {
        self.armed = None;
        let Some(delay) = self.delay else {
            return;
        };
        if engine.buffer_matches() {
            self.armed = Some(Armed {
                deadline: now + delay,
                generation: engine.generation(),
                buffer: engine.buffer().to_string(),
            });
        }
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn poll<P: PronunciationSource>(
        &mut self,
        engine: &mut PracticeEngine<P>,
        now: Instant,
    ) -> Option<Confirmation> {
        if self.armed.as_ref().is_none_or(|a| now < a.deadline) {
            return None;
        }
        let armed = self.armed.take()?;
        if armed.generation != engine.generation() || armed.buffer != engine.buffer() {
            return None;
        }
        engine.confirm()
    }
}
