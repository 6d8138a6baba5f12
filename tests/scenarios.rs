//! End-to-end scenarios driven through a scripted stub agent, composing the
//! invoker, token accountant, session state, and dispatcher the same way
//! the orchestrator does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use chatloop::accounting::TokenAccountant;
use chatloop::agent::{Agent, AgentResponse};
use chatloop::config::BehaviorConfig;
use chatloop::dispatch::{BuiltinCommand, InputClassification};
use chatloop::error::AgentCallError;
use chatloop::invoker::{AgentInvoker, ErrorCategory, InvokeOutcome};
use chatloop::session::SessionState;
use chatloop::template::materialize;

struct StubResponse {
    text: String,
    raw: Value,
}

impl AgentResponse for StubResponse {
    fn text(&self) -> String {
        self.text.clone()
    }
    fn raw(&self) -> Value {
        self.raw.clone()
    }
}

/// An agent whose replies and failures are scripted in advance, recording
/// every prompt it was asked to answer.
struct ScriptedAgent {
    script: Vec<Result<StubResponse, AgentCallError>>,
    cursor: usize,
    received_prompts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedAgent {
    fn new(script: Vec<Result<StubResponse, AgentCallError>>) -> Self {
        Self {
            script,
            cursor: 0,
            received_prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn invoke(&mut self, prompt: &str) -> Result<Box<dyn AgentResponse>, AgentCallError> {
        self.received_prompts.lock().unwrap().push(prompt.to_string());
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let step = self.script.get(self.cursor).expect("script exhausted");
        self.cursor += 1;
        match step {
            Ok(response) => Ok(Box::new(StubResponse {
                text: response.text.clone(),
                raw: response.raw.clone(),
            })),
            Err(e) => Err(AgentCallError::message(e.to_string())),
        }
    }
}

fn behavior(max_retries: u32, retry_delay: f64, timeout: f64) -> BehaviorConfig {
    BehaviorConfig {
        max_retries,
        retry_delay,
        timeout,
        spinner_style: "dots".to_string(),
    }
}

#[tokio::test]
async fn scenario_1_happy_path_with_tokens() {
    let mut agent = ScriptedAgent::new(vec![Ok(StubResponse {
        text: "hi".to_string(),
        raw: json!({"usage": {"input_tokens": 10, "output_tokens": 5, "total_tokens": 15}}),
    })]);
    let invoker = AgentInvoker::new(&behavior(3, 0.01, 5.0));
    let mut session = SessionState::new();

    match invoker.invoke(&mut agent, "hello", |_| {}).await {
        InvokeOutcome::Success { response, .. } => {
            let priced = TokenAccountant::price(&response.raw(), Some("us.amazon.nova-lite-v1:0"));
            assert_eq!(priced.usage.total_tokens, 15);
            assert_eq!(priced.usage.input_tokens, 10);
            assert_eq!(priced.usage.output_tokens, 5);
            session.record_success(&response.text(), priced.usage);
        }
        InvokeOutcome::Failed { .. } => panic!("expected success"),
    }

    assert_eq!(session.query_count(), 1);
    assert_eq!(session.cumulative_usage().total_tokens, 15);

    let classification = InputClassification::parse("exit");
    assert_eq!(classification, InputClassification::Builtin(BuiltinCommand::Exit));
}

#[tokio::test]
async fn scenario_2_retry_then_success() {
    let mut agent = ScriptedAgent::new(vec![
        Err(AgentCallError::message("request timed out")),
        Err(AgentCallError::message("request timed out")),
        Ok(StubResponse {
            text: "ok".to_string(),
            raw: json!({}),
        }),
    ]);
    let call_count = Arc::clone(&agent.call_count);
    let invoker = AgentInvoker::new(&behavior(3, 0.01, 5.0));

    let start = std::time::Instant::now();
    let outcome = invoker.invoke(&mut agent, "hello", |_| {}).await;
    let elapsed = start.elapsed();

    assert!(matches!(outcome, InvokeOutcome::Success { .. }));
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
    // Two backoffs: 0.01 * 2^0 + 0.01 * 2^1 = 0.03s, with headroom for scheduling jitter.
    assert!(elapsed.as_secs_f64() >= 0.025);
}

#[tokio::test]
async fn scenario_3_configuration_error_no_retry() {
    let mut agent = ScriptedAgent::new(vec![Err(AgentCallError::message(
        "model ID 'bogus' isn't supported",
    ))]);
    let call_count = Arc::clone(&agent.call_count);
    let invoker = AgentInvoker::new(&behavior(3, 0.01, 5.0));
    let session = SessionState::new();

    let outcome = invoker.invoke(&mut agent, "hello", |_| {}).await;
    match outcome {
        InvokeOutcome::Failed { category, .. } => assert_eq!(category, ErrorCategory::Configuration),
        InvokeOutcome::Success { .. } => panic!("expected failure"),
    }
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
    assert_eq!(session.query_count(), 0);
}

#[tokio::test]
async fn scenario_4_template_invocation() {
    let classification = InputClassification::parse("/review code X");
    let (name, context) = match classification {
        InputClassification::Template { name, context } => (name, context),
        other => panic!("expected template classification, got {other:?}"),
    };
    assert_eq!(name, "review");
    assert_eq!(context, "code X");

    let body = "Review this:\n{input}";
    let materialized = materialize(body, &context);
    assert_eq!(materialized, "Review this:\ncode X");

    let mut agent = ScriptedAgent::new(vec![Ok(StubResponse {
        text: "looks fine".to_string(),
        raw: json!({}),
    })]);
    let received = Arc::clone(&agent.received_prompts);
    let invoker = AgentInvoker::new(&behavior(3, 0.01, 5.0));
    invoker.invoke(&mut agent, &materialized, |_| {}).await;
    assert_eq!(received.lock().unwrap().as_slice(), ["Review this:\ncode X"]);
}

#[tokio::test]
async fn scenario_5_multiline_input_joins_with_newlines() {
    let lines = vec!["def foo():".to_string(), "    return 1".to_string()];
    let joined = lines.join("\n");
    assert_eq!(joined, "def foo():\n    return 1");

    let mut agent = ScriptedAgent::new(vec![Ok(StubResponse {
        text: "noted".to_string(),
        raw: json!({}),
    })]);
    let received = Arc::clone(&agent.received_prompts);
    let invoker = AgentInvoker::new(&behavior(3, 0.01, 5.0));
    invoker.invoke(&mut agent, &joined, |_| {}).await;
    assert_eq!(received.lock().unwrap().as_slice(), ["def foo():\n    return 1"]);
}

#[tokio::test]
async fn scenario_6_per_agent_override() {
    use chatloop::config::{ConfigLayer, ConfigOrigin, EffectiveConfig};

    let config = EffectiveConfig::new(vec![
        ConfigLayer {
            origin: ConfigOrigin::Defaults,
            content: serde_yaml::from_str("behavior:\n  timeout: 120").unwrap(),
        },
        ConfigLayer {
            origin: ConfigOrigin::Project(std::path::PathBuf::from(".chatrc")),
            content: serde_yaml::from_str(
                "agents:\n  Product Pete:\n    behavior:\n      timeout: 5",
            )
            .unwrap(),
        },
    ]);

    assert_eq!(
        config.get_f64("behavior.timeout", 0.0, Some("Product Pete")),
        5.0
    );
    assert_eq!(
        config.get_f64("behavior.timeout", 0.0, Some("Someone Else")),
        120.0
    );
}

#[tokio::test]
async fn empty_input_never_reaches_the_agent() {
    assert_eq!(InputClassification::parse(""), InputClassification::Empty);
    assert_eq!(InputClassification::parse("   "), InputClassification::Empty);
}
