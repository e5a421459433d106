use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sessions kept in history; older ones are evicted.
pub const HISTORY_LIMIT: usize = 100;

/// Finalized record of one timed session. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStat {
    pub id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub typed: u32,
    pub correct: u32,
    pub wrong: u32,
    pub accuracy: u32,
}

impl SessionStat {
    /// Characters per minute.
    pub fn speed(&self) -> u32 {
        speed_per_minute(self.typed as u64, self.duration_secs)
    }
}

pub fn speed_per_minute(typed: u64, duration_secs: u64) -> u32 {
    (typed as f64 * 60.0 / duration_secs.max(1) as f64).round() as u32
}

/// Newest-first, capped, one entry per id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    sessions: Vec<SessionStat>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the invariants over a loaded list of arbitrary order.
    pub fn from_sessions(mut sessions: Vec<SessionStat>) -> Self {
        sessions.sort_by(|a, b| b.end_at.cmp(&a.end_at));
        let mut history = Self::new();
        for s in sessions {
            if !history.sessions.iter().any(|h| h.id == s.id) {
                history.sessions.push(s);
            }
        }
        history.sessions.truncate(HISTORY_LIMIT);
        history
    }

    pub fn push(&mut self, stat: SessionStat) {
        self.sessions.retain(|s| s.id != stat.id);
        self.sessions.insert(0, stat);
        self.sessions.truncate(HISTORY_LIMIT);
    }

    pub fn sessions(&self) -> &[SessionStat] {
        &self.sessions
    }

    pub fn recent(&self, n: usize) -> &[SessionStat] {
        &self.sessions[..n.min(self.sessions.len())]
    }

    pub fn latest(&self) -> Option<&SessionStat> {
        self.sessions.first()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
pub(crate) fn test_stat(id: u32, end_at: DateTime<Utc>, typed: u32, correct: u32, secs: u64) -> SessionStat {
    SessionStat {
        id: id.to_string(),
        start_at: end_at - chrono::Duration::seconds(secs as i64),
        end_at,
        duration_secs: secs,
        typed,
        correct,
        wrong: typed - correct,
        accuracy: crate::engine::practice::percent(correct as usize, typed as usize),
    }
}
