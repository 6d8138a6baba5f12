//! Command-line interface definition using clap.

use std::path::PathBuf;

use clap::Parser;

/// Interactive terminal chat loop for pluggable AI agents.
#[derive(Parser, Debug)]
#[command(name = "chatloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to an agent definition, e.g. `echo:Dr. Echo`.
    #[arg(short, long, env = "CHATLOOP_AGENT")]
    pub agent: String,

    /// Overrides the discovered configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Returns the tracing level implied by the repeated `-v` flag.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
