use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};

use crate::engine::mistakes::{MistakeBook, MistakeEntry, WeakPattern};
use crate::engine::practice::percent;
use crate::session::stat::{SessionStat, speed_per_minute};

const TREND_DAYS: usize = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Period {
    #[default]
    Week,
    Month,
    All,
}

impl Period {
    pub fn label(self) -> &'static str {
        match self {
            Period::Week => "This week",
            Period::Month => "This month",
            Period::All => "All time",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Period::Week => Period::Month,
            Period::Month => Period::All,
            Period::All => Period::Week,
        }
    }

    fn max_age_days(self) -> Option<i64> {
        match self {
            Period::Week => Some(7),
            Period::Month => Some(30),
            Period::All => None,
        }
    }

    pub fn includes(self, stat: &SessionStat, now: DateTime<Utc>) -> bool {
        match self.max_age_days() {
            Some(days) => now - stat.end_at <= chrono::Duration::days(days),
            None => true,
        }
    }

    pub fn filter<'a>(self, sessions: &'a [SessionStat], now: DateTime<Utc>) -> Vec<&'a SessionStat> {
        sessions.iter().filter(|s| self.includes(s, now)).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeriodSummary {
    pub total_sessions: usize,
    pub total_minutes: u64,
    pub total_characters: u64,
    pub total_correct: u64,
    pub total_wrong: u64,
    pub avg_accuracy: u32,
    pub avg_speed: u32,
    pub best_accuracy: u32,
    pub best_speed: u32,
    pub total_mistakes: usize,
}

pub fn summarize(
    sessions: &[SessionStat],
    mistakes: &MistakeBook,
    period: Period,
    now: DateTime<Utc>,
) -> PeriodSummary {
    let filtered = period.filter(sessions, now);
    let mut summary = PeriodSummary {
        total_mistakes: mistakes.len(),
        ..Default::default()
    };
    if filtered.is_empty() {
        return summary;
    }

    let total_secs: u64 = filtered.iter().map(|s| s.duration_secs).sum();
    summary.total_sessions = filtered.len();
    summary.total_minutes = (total_secs as f64 / 60.0).round() as u64;
    summary.total_characters = filtered.iter().map(|s| s.typed as u64).sum();
    summary.total_correct = filtered.iter().map(|s| s.correct as u64).sum();
    summary.total_wrong = filtered.iter().map(|s| s.wrong as u64).sum();
    summary.avg_accuracy = if summary.total_characters > 0 {
        percent(summary.total_correct as usize, summary.total_characters as usize)
    } else {
        0
    };
    summary.avg_speed = if total_secs > 0 {
        speed_per_minute(summary.total_characters, total_secs)
    } else {
        0
    };
    summary.best_accuracy = filtered.iter().map(|s| s.accuracy).max().unwrap_or(0);
    summary.best_speed = filtered.iter().map(|s| s.speed()).max().unwrap_or(0);
    summary
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub accuracy: u32,
    pub speed: u32,
    pub characters: u64,
}

/// Per-day totals, oldest first, limited to the most recent days practiced.
pub fn daily_trends(sessions: &[SessionStat], period: Period, now: DateTime<Utc>) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, (u64, u64, u64)> = BTreeMap::new();
    for s in period.filter(sessions, now) {
        let day = days.entry(s.end_at.date_naive()).or_default();
        day.0 += s.typed as u64;
        day.1 += s.correct as u64;
        day.2 += s.duration_secs;
    }

    let trends: Vec<DailyTrend> = days
        .into_iter()
        .map(|(date, (typed, correct, secs))| DailyTrend {
            date,
            accuracy: percent(correct as usize, typed as usize),
            speed: speed_per_minute(typed, secs),
            characters: typed,
        })
        .collect();
    let skip = trends.len().saturating_sub(TREND_DAYS);
    trends.into_iter().skip(skip).collect()
}

pub fn top_mistakes(mistakes: &MistakeBook, n: usize) -> Vec<&MistakeEntry> {
    let mut sorted = mistakes.sorted_by_count();
    sorted.truncate(n);
    sorted
}

fn accuracy_level(accuracy: u32) -> &'static str {
    if accuracy >= 90 {
        "excellent"
    } else if accuracy >= 70 {
        "good"
    } else {
        "needs work"
    }
}

/// Markdown learning report, `None` without any session history.
pub fn learning_report(
    sessions: &[SessionStat],
    mistakes: &MistakeBook,
    period: Period,
    now: DateTime<Utc>,
) -> Option<String> {
    if sessions.is_empty() {
        return None;
    }
    let summary = summarize(sessions, mistakes, period, now);
    let patterns: Vec<WeakPattern> = mistakes.weak_patterns(5);
    let trends = daily_trends(sessions, period, now);

    let mut out = String::new();
    let _ = writeln!(out, "# Learning report ({})\n", period.label());
    let _ = writeln!(out, "Generated: {}\n", now.format("%Y-%m-%d %H:%M UTC"));

    let _ = writeln!(out, "## Overview\n");
    let _ = writeln!(out, "- Practice time: {} min", summary.total_minutes);
    let _ = writeln!(out, "- Sessions: {}", summary.total_sessions);
    let _ = writeln!(out, "- Characters typed: {}", summary.total_characters);
    let _ = writeln!(out, "- Average accuracy: {}%", summary.avg_accuracy);
    let _ = writeln!(out, "- Average speed: {} chars/min", summary.avg_speed);
    let _ = writeln!(out, "- Best accuracy: {}%", summary.best_accuracy);
    let _ = writeln!(out, "- Best speed: {} chars/min\n", summary.best_speed);

    let _ = writeln!(out, "## Details\n");
    let _ = writeln!(out, "- Correct: {}", summary.total_correct);
    let _ = writeln!(out, "- Wrong: {}", summary.total_wrong);
    if summary.total_characters > 0 {
        let _ = writeln!(
            out,
            "- Error rate: {}%",
            percent(summary.total_wrong as usize, summary.total_characters as usize)
        );
    }
    let _ = writeln!(out, "- Tracked mistakes: {}\n", summary.total_mistakes);

    if !patterns.is_empty() {
        let _ = writeln!(out, "## Weak characters\n");
        for (i, p) in patterns.iter().enumerate() {
            let _ = writeln!(out, "{}. **{}** ({})", i + 1, p.character, p.correct);
            let _ = writeln!(out, "   - Mistakes: {}", p.count);
            let common: Vec<&str> = p.wrong_inputs.iter().take(2).map(String::as_str).collect();
            let _ = writeln!(out, "   - Typed instead: {}", common.join(", "));
        }
        out.push('\n');
    }

    if !trends.is_empty() {
        let _ = writeln!(out, "## Recent trend\n");
        for t in &trends {
            let _ = writeln!(
                out,
                "- **{}**: accuracy {}% ({}), speed {} chars/min, {} characters",
                t.date.format("%m-%d"),
                t.accuracy,
                accuracy_level(t.accuracy),
                t.speed,
                t.characters
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Advice\n");
    if summary.avg_accuracy >= 90 {
        let _ = writeln!(out, "Accuracy is excellent. Keep the current pace.\n");
    } else if summary.avg_accuracy >= 70 {
        let _ = writeln!(out, "Accuracy is good. Review the weak characters in the mistake book.\n");
    } else {
        let _ = writeln!(
            out,
            "Slow down and check each syllable before confirming. Mistake review practice helps.\n"
        );
    }
    if !patterns.is_empty() {
        let chars: Vec<String> = patterns.iter().map(|p| p.character.to_string()).collect();
        let _ = writeln!(out, "Practice these first: {}\n", chars.join(" "));
    }
    if summary.avg_speed < 20 {
        let _ = writeln!(out, "Speed has room to grow; more short sessions will help.\n");
    }

    Some(out)
}
