//! Writes the session transcript to a markdown file on clean exit.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::accounting::{format_tokens, Usage};
use crate::error::ExportError;
use crate::session::{Role, SessionState};

/// Lowercases `name` and replaces every non-word character with `-`, for
/// use in export file names.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

pub struct ConversationExporter {
    save_location: PathBuf,
}

impl ConversationExporter {
    pub fn new(save_location: PathBuf) -> Self {
        Self { save_location }
    }

    fn file_name(&self, agent_name: &str, now: DateTime<Utc>) -> String {
        format!(
            "{}_{}.md",
            now.format("%Y-%m-%d_%H-%M-%S"),
            slugify(agent_name)
        )
    }

    /// Write the transcript, creating `save_location` if absent. A write
    /// failure is reported to the caller but never suppresses the session
    /// summary or alters the exit status.
    pub fn export(
        &self,
        session: &SessionState,
        agent_name: &str,
        model: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.save_location).map_err(|source| ExportError::CreateDir {
            path: self.save_location.display().to_string(),
            source,
        })?;

        let path = self.save_location.join(self.file_name(agent_name, now));
        let content = render_markdown(session, agent_name, model, now);
        std::fs::write(&path, content).map_err(|source| ExportError::WriteFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }
}

fn render_markdown(
    session: &SessionState,
    agent_name: &str,
    model: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let usage: &Usage = session.cumulative_usage();
    let mut out = String::new();
    out.push_str("# Conversation Export\n\n");
    out.push_str(&format!("- Agent: {agent_name}\n"));
    out.push_str(&format!("- Model: {}\n", model.unwrap_or("unknown")));
    out.push_str(&format!(
        "- Started: {}\n",
        session.started_at().to_rfc3339()
    ));
    out.push_str(&format!("- Ended: {}\n", now.to_rfc3339()));
    out.push_str(&format!("- Queries: {}\n", session.query_count()));
    out.push_str(&format!(
        "- Tokens: {} (in: {}, out: {})\n",
        format_tokens(usage.total_tokens),
        format_tokens(usage.input_tokens),
        format_tokens(usage.output_tokens),
    ));
    out.push_str(&format!("- Cost: ${:.4}\n\n", usage.cost));

    for entry in session.transcript() {
        let heading = match entry.role {
            Role::User => "## User",
            Role::Agent => "## Agent",
        };
        out.push_str(heading);
        out.push_str("\n\n");
        out.push_str(&entry.text);
        out.push_str("\n\n");
    }
    out
}

pub fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".chat_history"))
        .unwrap_or_else(|| PathBuf::from(".chat_history"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::Usage;
    use chrono::TimeZone;

    #[test]
    fn slugify_collapses_non_word_runs() {
        assert_eq!(slugify("Product Pete!!"), "product-pete");
        assert_eq!(slugify("  leading"), "leading");
    }

    #[test]
    fn export_writes_metadata_and_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ConversationExporter::new(dir.path().to_path_buf());

        let mut session = SessionState::new();
        session.record_user_input("hello");
        session.record_success("hi there", Usage::new(3, 4, 0.01));

        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let path = exporter
            .export(&session, "Dr. Echo", Some("echo-1"), now)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Dr. Echo"));
        assert!(content.contains("## User"));
        assert!(content.contains("hello"));
        assert!(content.contains("## Agent"));
        assert!(content.contains("hi there"));
        assert!(path.to_string_lossy().contains("dr-echo"));
    }

    #[test]
    fn export_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("deeper");
        let exporter = ConversationExporter::new(nested.clone());
        let session = SessionState::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        exporter.export(&session, "echo", None, now).unwrap();
        assert!(nested.exists());
    }
}
