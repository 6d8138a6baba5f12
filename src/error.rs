//! Error types for the chat loop.

use thiserror::Error;

/// Errors raised while locating, parsing, or merging configuration layers.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The explicit `--config <path>` could not be read.
    #[error("cannot read config file {path}: {source}")]
    ExplicitUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A layer parsed as syntactically invalid YAML.
    #[error("invalid YAML in {origin}: {message}")]
    InvalidYaml { origin: String, message: String },
}

/// Errors raised by the template store.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The named template does not exist under `~/.prompts/`.
    #[error("no template named '{0}'")]
    NotFound(String),

    /// The template directory could not be read.
    #[error("cannot read prompts directory {path}: {source}")]
    DirUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by one attempt of an agent call, prior to classification.
#[derive(Error, Debug)]
pub enum AgentCallError {
    #[error("{0}")]
    Message(String),

    #[error("attempt timed out")]
    TimedOut,

    #[error("interrupted")]
    Cancelled,
}

impl AgentCallError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}

/// Errors raised by the markdown conversation exporter.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot create export directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write export file {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error surfaced at the process boundary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("could not acquire agent: {0}")]
    Agent(#[from] AgentCallError),
}
