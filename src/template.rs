//! Discovers and materializes reusable prompt templates under `~/.prompts/`.

use std::path::PathBuf;

use crate::error::TemplateError;

/// A named reusable prompt, discovered from `~/.prompts/<name>.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub body: String,
}

/// Discovers templates lazily on every invocation, so new files appear
/// without a restart.
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_location() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".prompts"))
            .unwrap_or_else(|| PathBuf::from(".prompts"))
    }

    /// Enumerate present templates in alphabetical order by name.
    pub fn list(&self) -> Result<Vec<Template>, TemplateError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|source| TemplateError::DirUnreadable {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut templates = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(body) = std::fs::read_to_string(&path) {
                templates.push(Template {
                    name: stem.to_lowercase(),
                    body,
                });
            }
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    /// Load the named template, or `TemplateError::NotFound`.
    pub fn get(&self, name: &str) -> Result<Template, TemplateError> {
        self.list()?
            .into_iter()
            .find(|t| t.name == name.to_lowercase())
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}

/// The first non-empty line of a template body, for `templates` listing.
pub fn short_description(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Substitute `{input}` placeholders with `context`, or append `context`
/// as a trailing paragraph when no placeholder is present.
pub fn materialize(body: &str, context: &str) -> String {
    if body.contains("{input}") {
        body.replace("{input}", context)
    } else if !context.is_empty() {
        format!("{body}\n\n{context}")
    } else {
        body.to_string()
    }
}
