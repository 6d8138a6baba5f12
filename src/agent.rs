//! The pluggable agent contract and the built-in `echo:` scheme.

pub mod echo;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentCallError;

/// A single agent response, probed for its text and raw usage shape.
pub trait AgentResponse: Send {
    /// The agent's reply text, shown to the user.
    fn text(&self) -> String;

    /// The raw response body, handed to the token accountant for
    /// shape-sniffing (`usage` / top-level / `metrics`).
    fn raw(&self) -> Value;

    /// The model identifier reported for this turn, if any.
    fn model(&self) -> Option<String> {
        None
    }

    /// The number of agentic cycles (tool calls, internal loop turns) the
    /// agent reports for this response, if it tracks one.
    fn cycle_count(&self) -> Option<u64> {
        None
    }

    /// The agent's own account of how long the call took, if it tracks one.
    /// The invoker's measured wall-clock attempt time is used when this is
    /// `None`.
    fn duration(&self) -> Option<Duration> {
        None
    }
}

/// A pluggable conversational backend.
///
/// Implementors hold their own connection/session state; `invoke` is called
/// once per turn (retries are the invoker's concern, not the agent's).
#[async_trait]
pub trait Agent: Send {
    async fn invoke(&mut self, prompt: &str) -> Result<Box<dyn AgentResponse>, AgentCallError>;

    /// The name shown in the status bar and export headers.
    fn display_name(&self) -> String {
        "agent".to_string()
    }

    /// The model identifier, if fixed and known ahead of any response.
    fn model_id(&self) -> Option<String> {
        None
    }

    fn description(&self) -> Option<String> {
        None
    }

    /// Tool names this agent exposes, shown by the `info` builtin.
    fn tools(&self) -> Vec<String> {
        Vec::new()
    }

    /// Best-effort teardown, called once on shutdown regardless of how the
    /// session ended.
    async fn cleanup(&mut self) {}
}

/// Constructs an `Agent` from a `--agent <path>` argument.
///
/// `path` carries a `scheme:rest` shape; the built-in `echo:` scheme is
/// always recognized, and implementors may recognize others.
pub trait AgentFactory: Send + Sync {
    fn build(&self, path: &str) -> Result<Box<dyn Agent>, AgentCallError>;
}

/// Resolves `--agent <path>` against the built-in schemes, falling back to
/// `fallback` for anything it doesn't recognize.
pub fn resolve(path: &str, fallback: &dyn AgentFactory) -> Result<Box<dyn Agent>, AgentCallError> {
    if let Some(rest) = path.strip_prefix("echo:") {
        return Ok(Box::new(echo::EchoAgent::new(rest)));
    }
    fallback.build(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingFactory;
    impl AgentFactory for RejectingFactory {
        fn build(&self, path: &str) -> Result<Box<dyn Agent>, AgentCallError> {
            Err(AgentCallError::message(format!("unknown agent scheme: {path}")))
        }
    }

    #[test]
    fn echo_scheme_resolves_without_the_fallback() {
        let agent = resolve("echo:Dr. Echo", &RejectingFactory).expect("echo: must resolve");
        assert_eq!(agent.display_name(), "Dr. Echo");
    }

    #[test]
    fn unknown_scheme_falls_through_to_the_factory() {
        let err = resolve("grpc://localhost:9000", &RejectingFactory).unwrap_err();
        assert!(err.to_string().contains("unknown agent scheme"));
    }
}
