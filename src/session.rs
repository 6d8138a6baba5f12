//! Per-session counters, transcript, and the unconditional exit summary.

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::accounting::{format_tokens, Usage};

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

/// One turn's worth of transcript content.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Lifetime counters for one chat session.
pub struct SessionState {
    start: Instant,
    started_at: DateTime<Utc>,
    query_count: u64,
    cumulative_usage: Usage,
    transcript: Vec<TranscriptEntry>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            started_at: Utc::now(),
            query_count: 0,
            cumulative_usage: Usage::default(),
            transcript: Vec::new(),
        }
    }

    pub fn query_count(&self) -> u64 {
        self.query_count
    }

    pub fn cumulative_usage(&self) -> &Usage {
        &self.cumulative_usage
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn record_user_input(&mut self, text: &str) {
        self.transcript.push(TranscriptEntry {
            role: Role::User,
            text: text.to_string(),
            at: Utc::now(),
        });
    }

    /// Records one successful turn: increments the query counter exactly
    /// once and folds the turn's usage into the cumulative total. Retries
    /// must never reach this method.
    pub fn record_success(&mut self, agent_text: &str, usage: Usage) {
        self.query_count += 1;
        self.cumulative_usage = self.cumulative_usage.combine(&usage);
        self.transcript.push(TranscriptEntry {
            role: Role::Agent,
            text: agent_text.to_string(),
            at: Utc::now(),
        });
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration as `Xm Ys`, or `Xh Ym Ys` when over an hour.
pub fn format_duration(d: std::time::Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

/// Render the framed session summary block, emitted on every exit path.
pub fn render_summary(session: &SessionState) -> String {
    let usage = session.cumulative_usage();
    let mut lines = vec![
        "┌─ Session Summary ─────────────────────────".to_string(),
        format!("│ Duration: {}", format_duration(session.elapsed())),
        format!("│ Queries: {}", session.query_count()),
        format!(
            "│ Tokens: {} (in: {}, out: {})",
            format_tokens(usage.total_tokens),
            format_tokens(usage.input_tokens),
            format_tokens(usage.output_tokens),
        ),
    ];
    lines.push(format!("│ Cost: ${:.4}", usage.cost));
    lines.push("└────────────────────────────────────────────".to_string());
    lines.join("\n")
}
