//! `echo:` — a built-in reference agent that needs no external provider.
//!
//! Echoes the prompt back after a short simulated delay, synthesizing a
//! token usage shape so the accountant and session summary have something
//! real to chew on without a live LLM in the loop.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Agent, AgentResponse};
use crate::error::AgentCallError;

const SIMULATED_LATENCY: Duration = Duration::from_millis(150);

pub struct EchoAgent {
    name: String,
    turn: u64,
}

impl EchoAgent {
    pub fn new(name: &str) -> Self {
        let name = if name.trim().is_empty() {
            "echo".to_string()
        } else {
            name.trim().to_string()
        };
        Self { name, turn: 0 }
    }
}

struct EchoResponse {
    text: String,
    raw: Value,
}

impl AgentResponse for EchoResponse {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn raw(&self) -> Value {
        self.raw.clone()
    }

    fn model(&self) -> Option<String> {
        Some("echo-1".to_string())
    }
}

#[async_trait]
impl Agent for EchoAgent {
    async fn invoke(&mut self, prompt: &str) -> Result<Box<dyn AgentResponse>, AgentCallError> {
        tokio::time::sleep(SIMULATED_LATENCY).await;
        self.turn += 1;

        let input_tokens = (prompt.split_whitespace().count() as u64).max(1);
        let text = format!("echo: {prompt}");
        let output_tokens = (text.split_whitespace().count() as u64).max(1);

        Ok(Box::new(EchoResponse {
            text,
            raw: json!({
                "usage": {
                    "input_tokens": input_tokens,
                    "output_tokens": output_tokens,
                    "total_tokens": input_tokens + output_tokens,
                }
            }),
        }))
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn model_id(&self) -> Option<String> {
        Some("echo-1".to_string())
    }

    fn description(&self) -> Option<String> {
        Some("Echoes each prompt back; useful for exercising the chat loop without a live provider.".to_string())
    }

    fn tools(&self) -> Vec<String> {
        Vec::new()
    }

    async fn cleanup(&mut self) {}
}
