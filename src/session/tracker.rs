//! Timed practice sessions: `Idle -> Active -> Idle`.
//!
//! The tracker keeps its own tally of graded characters, independent of the
//! engine's slot statuses, so a session spans any number of loaded texts.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::engine::practice::{Confirmation, percent};
use crate::session::stat::{SessionStat, speed_per_minute};

const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub typed: u32,
    pub correct: u32,
    pub wrong: u32,
}

impl SessionCounters {
    pub fn accuracy(&self) -> u32 {
        percent(self.correct as usize, self.typed as usize)
    }
}

/// Whole-second countdown driven by polling with the current instant.
#[derive(Debug)]
pub struct Countdown {
    id: u64,
    remaining: u32,
    next_tick: Instant,
}

impl Countdown {
    fn new(id: u64, secs: u32, now: Instant) -> Self {
        Self {
            id,
            remaining: secs,
            next_tick: now + TICK,
        }
    }

    /// Applies every whole second elapsed up to `now`; returns what is left.
    fn advance(&mut self, now: Instant) -> u32 {
        while self.remaining > 0 && now >= self.next_tick {
            self.remaining -= 1;
            self.next_tick += TICK;
        }
        self.remaining
    }
}

#[derive(Debug)]
struct ActiveSession {
    started_at: DateTime<Utc>,
    countdown: Countdown,
    counters: SessionCounters,
}

/// Outcome of a finished session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub counters: SessionCounters,
    pub accuracy: u32,
}

impl SessionSummary {
    pub fn speed(&self) -> u32 {
        speed_per_minute(self.counters.typed as u64, self.duration_secs)
    }

    /// The history record; empty sessions leave none.
    pub fn record(&self) -> Option<SessionStat> {
        if self.counters.typed == 0 {
            return None;
        }
        Some(SessionStat {
            id: self.end_at.timestamp_millis().to_string(),
            start_at: self.start_at,
            end_at: self.end_at,
            duration_secs: self.duration_secs,
            typed: self.counters.typed,
            correct: self.counters.correct,
            wrong: self.counters.wrong,
            accuracy: self.accuracy,
        })
    }
}

#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Option<ActiveSession>,
    timers_started: u64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a countdown of `duration_secs`. A no-op while already active.
    pub fn start(&mut self, duration_secs: u32, now: Instant, wall: DateTime<Utc>) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.timers_started += 1;
        // The only countdown lives inside `active`; replacing it drops any prior one.
        self.active = Some(ActiveSession {
            started_at: wall,
            countdown: Countdown::new(self.timers_started, duration_secs, now),
            counters: SessionCounters::default(),
        });
        tracing::info!(duration_secs, timer = self.timers_started, "session started");
        true
    }

    /// Counts a graded character toward the active session.
    pub fn observe(&mut self, confirmation: &Confirmation) {
        if let Some(ref mut active) = self.active {
            let c = &mut active.counters;
            c.typed += 1;
            if confirmation.correct {
                c.correct += 1;
            } else {
                c.wrong += 1;
            }
        }
    }

    /// Advances the countdown; finishes the session when it reaches zero.
    pub fn tick(&mut self, now: Instant, wall: DateTime<Utc>) -> Option<SessionSummary> {
        let remaining = self.active.as_mut()?.countdown.advance(now);
        if remaining == 0 {
            return self.end(wall);
        }
        None
    }

    /// Finishes the active session early. `None` when idle.
    pub fn end(&mut self, wall: DateTime<Utc>) -> Option<SessionSummary> {
        let active = self.active.take()?;
        let elapsed_ms = (wall - active.started_at).num_milliseconds().max(0);
        let duration_secs = (elapsed_ms as f64 / 1000.0).round() as u64;
        let counters = active.counters;
        let summary = SessionSummary {
            start_at: active.started_at,
            end_at: wall,
            duration_secs,
            counters,
            accuracy: counters.accuracy(),
        };
        tracing::info!(
            timer = active.countdown.id,
            typed = counters.typed,
            correct = counters.correct,
            duration_secs,
            "session ended"
        );
        Some(summary)
    }

    /// Cancels without producing a summary.
    pub fn reset(&mut self) {
        if self.active.take().is_some() {
            tracing::info!("session reset");
        }
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.countdown.remaining)
    }

    pub fn counters(&self) -> Option<SessionCounters> {
        self.active.as_ref().map(|a| a.counters)
    }

    /// Id of the running countdown; changes with every start.
    pub fn timer_id(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.countdown.id)
    }
}

pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(correct: bool) -> Confirmation {
        Confirmation {
            index: 0,
            character: '你',
            typed: "ni".to_string(),
            correct,
            answer: "nǐ".to_string(),
            mistake: None,
            exhausted: false,
        }
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let mut t = SessionTracker::new();
        let now = Instant::now();
        let wall = Utc::now();
        assert!(t.start(60, now, wall));
        let id = t.timer_id();
        t.observe(&confirmation(true));
        assert!(!t.start(30, now, wall));
        assert_eq!(t.timer_id(), id);
        assert_eq!(t.remaining_secs(), Some(60));
        assert_eq!(t.counters().unwrap().typed, 1);
    }

    #[test]
    fn test_observe_ignored_when_idle() {
        let mut t = SessionTracker::new();
        t.observe(&confirmation(true));
        assert!(t.counters().is_none());
        assert!(t.end(Utc::now()).is_none());
    }

    #[test]
    fn test_empty_session_leaves_no_record() {
        let mut t = SessionTracker::new();
        let wall = Utc::now();
        t.start(60, Instant::now(), wall);
        let summary = t.end(wall + chrono::Duration::seconds(60)).unwrap();
        assert_eq!(summary.accuracy, 100);
        assert!(summary.record().is_none());
        assert!(!t.is_active());
    }

    #[test]
    fn test_accuracy_of_finalized_session() {
        let mut t = SessionTracker::new();
        let wall = Utc::now();
        t.start(60, Instant::now(), wall);
        for i in 0..10 {
            t.observe(&confirmation(i < 8));
        }
        let stat = t
            .end(wall + chrono::Duration::seconds(60))
            .unwrap()
            .record()
            .unwrap();
        assert_eq!(stat.typed, 10);
        assert_eq!(stat.correct, 8);
        assert_eq!(stat.wrong, 2);
        assert_eq!(stat.accuracy, 80);
        assert_eq!(stat.duration_secs, 60);
    }

    #[test]
    fn test_duration_is_wall_clock_not_nominal() {
        let mut t = SessionTracker::new();
        let wall = Utc::now();
        t.start(60, Instant::now(), wall);
        t.observe(&confirmation(true));
        let summary = t.end(wall + chrono::Duration::milliseconds(61_600)).unwrap();
        assert_eq!(summary.duration_secs, 62);
    }

    #[test]
    fn test_countdown_reaching_zero_ends_session() {
        let mut t = SessionTracker::new();
        let now = Instant::now();
        let wall = Utc::now();
        t.start(3, now, wall);
        t.observe(&confirmation(false));
        assert!(t.tick(now + Duration::from_millis(500), wall).is_none());
        assert!(t.tick(now + Duration::from_secs(1), wall).is_none());
        assert_eq!(t.remaining_secs(), Some(2));
        let summary = t
            .tick(now + Duration::from_secs(3), wall + chrono::Duration::seconds(3))
            .unwrap();
        assert_eq!(summary.counters.wrong, 1);
        assert_eq!(summary.accuracy, 0);
        assert!(!t.is_active());
        assert!(t.tick(now + Duration::from_secs(4), wall).is_none());
    }

    #[test]
    fn test_reset_discards_counters() {
        let mut t = SessionTracker::new();
        let wall = Utc::now();
        t.start(60, Instant::now(), wall);
        t.observe(&confirmation(true));
        t.reset();
        assert!(!t.is_active());
        assert!(t.end(wall).is_none());

        assert!(t.start(60, Instant::now(), wall));
        assert_eq!(t.counters().unwrap(), SessionCounters::default());
    }

    #[test]
    fn test_each_start_gets_new_timer() {
        let mut t = SessionTracker::new();
        let wall = Utc::now();
        t.start(60, Instant::now(), wall);
        let first = t.timer_id();
        t.reset();
        t.start(60, Instant::now(), wall);
        assert_ne!(t.timer_id(), first);
    }

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(605), "10:05");
    }
}
