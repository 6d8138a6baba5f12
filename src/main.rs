//! chatloop entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use chatloop::cli::Cli;
use chatloop::orchestrator::{discover_config, NoExternalAgents, Orchestrator};

#[tokio::main]
async fn main() {
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    fmt().with_env_filter(filter).with_target(false).init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("chatloop: {e}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, chatloop::error::AppError> {
    let config = discover_config(cli.config)?;
    let mut orchestrator = Orchestrator::new(config, cli.agent, Box::new(NoExternalAgents))?;
    Ok(orchestrator.run().await)
}
