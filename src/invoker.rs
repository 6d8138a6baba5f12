//! Retry/backoff, timeout, and error classification around one agent call.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::agent::{Agent, AgentResponse};
use crate::config::BehaviorConfig;
use crate::error::AgentCallError;

/// The classification assigned to a failed attempt, driving whether the
/// invoker retries and how the error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    TransientNetwork,
    RateLimited,
    Timeout,
    Configuration,
    Cancelled,
    Fatal,
}

impl ErrorCategory {
    /// Whether the invoker should sleep and try the call again.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::TransientNetwork | Self::RateLimited | Self::Timeout
        )
    }
}

/// Classify an error by substring match on its rendered message, per the
/// documented ordered rules.
pub fn classify(err: &AgentCallError) -> ErrorCategory {
    if matches!(err, AgentCallError::Cancelled) {
        return ErrorCategory::Cancelled;
    }
    if matches!(err, AgentCallError::TimedOut) {
        return ErrorCategory::Timeout;
    }

    let message = err.to_string().to_lowercase();

    if message.contains("timeout") || message.contains("timed out") || message.contains("ended prematurely") {
        return ErrorCategory::Timeout;
    }
    if message.contains("rate limit") || message.contains("throttl") || message.contains("429") {
        return ErrorCategory::RateLimited;
    }
    if message.contains("connection reset")
        || message.contains("dns")
        || message.contains("unreachable")
        || message.contains("connection refused")
    {
        return ErrorCategory::TransientNetwork;
    }
    if message.contains("unsupported model")
        || message.contains("invalid argument")
        || message.contains("configuration")
    {
        return ErrorCategory::Configuration;
    }
    ErrorCategory::Fatal
}

/// A short, actionable remediation string for a `configuration` error,
/// keyed by a coarse pattern match on the error message. Falls back to a
/// generic hint when no specific pattern is recognized.
pub fn configuration_hint(message: &str) -> &'static str {
    let message = message.to_lowercase();
    if message.contains("unsupported model") || message.contains("model id") {
        "check the model identifier and that your provider supports it"
    } else if message.contains("invalid argument") {
        "check the arguments passed to the agent for this turn"
    } else {
        "check your agent configuration"
    }
}

/// One retryable failure, reported to the caller before the backoff sleep.
/// `attempt` is the 1-based count of the attempt that just failed.
pub struct RetryNotice {
    pub attempt: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub next_delay: Duration,
}

/// The outcome of invoking an agent for one turn, after retries.
pub enum InvokeOutcome {
    Success {
        response: Box<dyn AgentResponse>,
        /// Wall-clock time of the successful attempt alone, excluding any
        /// prior failed attempts or backoff sleeps.
        attempt_duration: Duration,
    },
    Failed {
        category: ErrorCategory,
        message: String,
    },
}

/// Drives one turn's worth of agent calls: timeout per attempt, exponential
/// backoff between retryable failures, up to `behavior.max_retries` retries.
pub struct AgentInvoker {
    max_retries: u32,
    retry_delay: f64,
    timeout: Duration,
}

impl AgentInvoker {
    pub fn new(behavior: &BehaviorConfig) -> Self {
        Self {
            max_retries: behavior.max_retries,
            retry_delay: behavior.retry_delay,
            timeout: Duration::from_secs_f64(behavior.timeout.max(0.0)),
        }
    }

    /// Run one turn: up to `max_retries + 1` attempts, each bounded by the
    /// per-attempt timeout, with exponential backoff between retryable
    /// failures. Retries never touch the session query counter — that is
    /// the caller's responsibility on `Success`.
    ///
    /// A `SIGINT` arriving while an attempt is in flight races the call and
    /// wins: the attempt is abandoned and classified `Cancelled`, which is
    /// not retryable. `on_retry` is called once per retryable failure, just
    /// before its backoff sleep, so the caller can render a progress line;
    /// per spec, the first failure is not announced, only the second and
    /// later ones.
    pub async fn invoke(
        &self,
        agent: &mut dyn Agent,
        prompt: &str,
        mut on_retry: impl FnMut(&RetryNotice),
    ) -> InvokeOutcome {
        let mut attempt: u32 = 0;
        let mut base_delay = self.retry_delay;

        loop {
            let started = Instant::now();
            let call_result = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => Err(AgentCallError::Cancelled),
                timed = tokio::time::timeout(self.timeout, agent.invoke(prompt)) => match timed {
                    Ok(result) => result,
                    Err(_) => Err(AgentCallError::TimedOut),
                },
            };
            let attempt_duration = started.elapsed();

            match call_result {
                Ok(response) => {
                    return InvokeOutcome::Success {
                        response,
                        attempt_duration,
                    }
                }
                Err(err) => {
                    let category = classify(&err);
                    let message = err.to_string();

                    if category == ErrorCategory::RateLimited {
                        base_delay *= 2.0;
                    }

                    if !category.is_retryable() || attempt >= self.max_retries {
                        return InvokeOutcome::Failed { category, message };
                    }

                    let delay = Duration::from_secs_f64(base_delay * 2f64.powi(attempt as i32));
                    let notice = RetryNotice {
                        attempt: attempt + 1,
                        category,
                        message: message.clone(),
                        next_delay: delay,
                    };
                    warn!(
                        attempt = notice.attempt,
                        category = ?category,
                        delay_secs = delay.as_secs_f64(),
                        "retrying agent call after transient error"
                    );
                    if notice.attempt >= 2 {
                        on_retry(&notice);
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
