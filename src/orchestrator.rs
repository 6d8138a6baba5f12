//! Composes the Config Resolver, Terminal I/O, Input Dispatcher, Template
//! Store, Agent Invoker, Token Accountant, Session State, and Conversation
//! Exporter into the main read-classify-dispatch loop.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::accounting::{format_cost_for_turn, format_tokens, TokenAccountant};
use crate::agent::{Agent, AgentFactory};
use crate::colors::{Painter, Role as ColorRole};
use crate::config::{EffectiveConfig, Sections};
use crate::dispatch::{BuiltinCommand, InputClassification};
use crate::export::{default_history_path, ConversationExporter};
use crate::invoker::{configuration_hint, AgentInvoker, ErrorCategory, InvokeOutcome, RetryNotice};
use crate::session::SessionState;
use crate::template::{materialize, short_description, TemplateStore};
use crate::terminal::{ReadOutcome, Spinner, Terminal};

/// A factory that refuses every path; used when no real external agent
/// provider is wired in beyond the built-in `echo:` scheme.
pub struct NoExternalAgents;

impl AgentFactory for NoExternalAgents {
    fn build(&self, path: &str) -> Result<Box<dyn Agent>, crate::error::AgentCallError> {
        Err(crate::error::AgentCallError::message(format!(
            "no agent provider registered for '{path}'; only the built-in echo: scheme is available"
        )))
    }
}

pub struct Orchestrator {
    config: EffectiveConfig,
    agent_path: String,
    agent: Box<dyn Agent>,
    factory: Box<dyn AgentFactory>,
    terminal: Terminal,
    session: SessionState,
}

impl Orchestrator {
    pub fn new(
        config: EffectiveConfig,
        agent_path: String,
        factory: Box<dyn AgentFactory>,
    ) -> Result<Self, crate::error::AppError> {
        let agent = crate::agent::resolve(&agent_path, factory.as_ref())?;

        let interactive = crate::terminal::is_interactive();
        let history_path = if interactive {
            Some(default_history_path())
        } else {
            None
        };
        let terminal = Terminal::new(history_path)?;

        Ok(Self {
            config,
            agent_path,
            agent,
            factory,
            terminal,
            session: SessionState::new(),
        })
    }

    fn sections(&self) -> Sections {
        self.config.sections(Some(&self.agent.display_name()))
    }

    fn print_banner(&self, painter: &Painter) {
        println!(
            "{}",
            painter.paint(
                ColorRole::System,
                &format!("chatloop — talking to {}", self.agent.display_name())
            )
        );
        if let Some(description) = self.agent.description() {
            println!("{}", painter.paint(ColorRole::Dim, &description));
        }
        println!(
            "{}",
            painter.paint(
                ColorRole::Dim,
                "Type 'help' for commands, '\\' then blank line for multi-line input."
            )
        );
    }

    fn print_help(&self, painter: &Painter) {
        let lines = [
            "help       show this message",
            "info       show agent name, model, tools, and enabled features",
            "templates  list discovered templates under ~/.prompts/",
            "clear      reset the session and acquire a fresh agent instance",
            "exit/quit  end the session",
            "/name ...  invoke the named template with trailing context",
            "\\          begin a multi-line input (end with a blank line)",
        ];
        for line in lines {
            println!("{}", painter.paint(ColorRole::System, line));
        }
    }

    fn print_info(&self, painter: &Painter) {
        let sections = self.sections();
        println!(
            "{}",
            painter.paint(ColorRole::System, &format!("agent: {}", self.agent.display_name()))
        );
        if let Some(model) = self.agent.model_id() {
            println!("{}", painter.paint(ColorRole::System, &format!("model: {model}")));
        }
        let tools = self.agent.tools();
        if tools.is_empty() {
            println!("{}", painter.paint(ColorRole::Dim, "tools: none"));
        } else {
            println!(
                "{}",
                painter.paint(ColorRole::System, &format!("tools: {}", tools.join(", ")))
            );
        }
        println!(
            "{}",
            painter.paint(
                ColorRole::Dim,
                &format!(
                    "features: auto_save={} show_tokens={} rich_enabled={}",
                    sections.features.auto_save,
                    sections.features.show_tokens,
                    sections.features.rich_enabled,
                )
            )
        );
    }

    fn print_templates(&self, painter: &Painter) {
        let store = TemplateStore::new(TemplateStore::default_location());
        match store.list() {
            Ok(templates) if templates.is_empty() => {
                println!("{}", painter.paint(ColorRole::Dim, "no templates found under ~/.prompts/"));
            }
            Ok(templates) => {
                for template in templates {
                    println!(
                        "{}",
                        painter.paint(
                            ColorRole::System,
                            &format!("/{}  {}", template.name, short_description(&template.body))
                        )
                    );
                }
            }
            Err(e) => {
                println!("{}", painter.paint(ColorRole::Error, &format!("could not list templates: {e}")));
            }
        }
    }

    /// Runs the full turn/startup/shutdown sequence. Returns the exit code
    /// the process should use (0 clean, 1 on an uncaught error).
    pub async fn run(&mut self) -> i32 {
        let sections = self.sections();
        let painter = Painter::new(sections.colors.clone());

        if sections.ui.show_banner {
            self.print_banner(&painter);
        }

        let exit_code = self.turn_loop(&painter).await;

        self.shutdown(&painter).await;
        exit_code
    }

    async fn turn_loop(&mut self, painter: &Painter) -> i32 {
        let mut pending_interrupt = false;

        loop {
            let sections = self.sections();
            if sections.ui.show_status_bar {
                self.draw_status_bar(painter, &sections);
            }

            let prompt = painter.paint(ColorRole::User, "> ");
            match self.terminal.read_logical_input(&prompt) {
                ReadOutcome::Eof => return 0,
                ReadOutcome::Interrupted => {
                    println!();
                    if pending_interrupt {
                        // Second Ctrl-C in immediate succession: fall through to shutdown.
                        return 0;
                    }
                    pending_interrupt = true;
                    println!(
                        "{}",
                        painter.paint(ColorRole::Dim, "(press Ctrl-C again to exit)")
                    );
                    continue;
                }
                ReadOutcome::Line(line) => {
                    pending_interrupt = false;
                    match self.dispatch(painter, &line).await {
                        TurnOutcome::Continue => {}
                        TurnOutcome::Exit => return 0,
                    }
                }
            }
        }
    }

    fn draw_status_bar(&self, painter: &Painter, sections: &Sections) {
        let usage = self.session.cumulative_usage();
        let token_total = if sections.features.show_tokens {
            Some(format_tokens(usage.total_tokens))
        } else {
            None
        };
        crate::terminal::render_status_bar(
            painter,
            &self.agent.display_name(),
            self.agent.model_id().as_deref(),
            self.session.query_count(),
            token_total.as_deref(),
            &crate::session::format_duration(self.session.elapsed()),
        );
    }

    async fn dispatch(&mut self, painter: &Painter, line: &str) -> TurnOutcome {
        match InputClassification::parse(line) {
            InputClassification::Empty | InputClassification::MultilineStart => TurnOutcome::Continue,
            InputClassification::Builtin(BuiltinCommand::Help) => {
                self.print_help(painter);
                TurnOutcome::Continue
            }
            InputClassification::Builtin(BuiltinCommand::Info) => {
                self.print_info(painter);
                TurnOutcome::Continue
            }
            InputClassification::Builtin(BuiltinCommand::Templates) => {
                self.print_templates(painter);
                TurnOutcome::Continue
            }
            InputClassification::Builtin(BuiltinCommand::Clear) => {
                self.handle_clear(painter).await;
                TurnOutcome::Continue
            }
            InputClassification::Builtin(BuiltinCommand::Exit) => TurnOutcome::Exit,
            InputClassification::Template { name, context } => {
                self.handle_template(painter, &name, &context).await
            }
            InputClassification::Prompt(text) => self.handle_prompt(painter, &text).await,
        }
    }

    async fn handle_clear(&mut self, painter: &Painter) {
        self.agent.cleanup().await;
        match crate::agent::resolve(&self.agent_path, self.factory.as_ref()) {
            Ok(fresh) => {
                self.agent = fresh;
                self.session = SessionState::new();
                print!("\x1b[2J\x1b[H");
                self.print_banner(painter);
            }
            Err(e) => {
                println!(
                    "{}",
                    painter.paint(ColorRole::Error, &format!("could not acquire a fresh agent: {e}"))
                );
            }
        }
    }

    async fn handle_template(&mut self, painter: &Painter, name: &str, context: &str) -> TurnOutcome {
        let store = TemplateStore::new(TemplateStore::default_location());
        match store.get(name) {
            Ok(template) => {
                let prompt = materialize(&template.body, context);
                self.handle_prompt(painter, &prompt).await
            }
            Err(e) => {
                println!("{}", painter.paint(ColorRole::Error, &e.to_string()));
                TurnOutcome::Continue
            }
        }
    }

    async fn handle_prompt(&mut self, painter: &Painter, prompt: &str) -> TurnOutcome {
        self.session.record_user_input(prompt);

        let sections = self.sections();
        let invoker = AgentInvoker::new(&sections.behavior);
        let interactive = crate::terminal::is_interactive();
        let mut spinner = Spinner::start(interactive);

        let outcome = invoker
            .invoke(self.agent.as_mut(), prompt, |notice: &RetryNotice| {
                spinner.stop();
                println!(
                    "{}",
                    painter.paint(
                        ColorRole::Error,
                        &format!(
                            "attempt {} failed ({:?}): {} — retrying in {:.1}s",
                            notice.attempt,
                            notice.category,
                            notice.message,
                            notice.next_delay.as_secs_f64(),
                        )
                    )
                );
                spinner = Spinner::start(interactive);
            })
            .await;
        spinner.stop();

        match outcome {
            InvokeOutcome::Success {
                response,
                attempt_duration,
            } => {
                let model = response.model().or_else(|| self.agent.model_id());
                let priced = TokenAccountant::price(&response.raw(), model.as_deref());
                let cycle_count = response.cycle_count();
                let duration = response.duration().unwrap_or(attempt_duration);
                self.session.record_success(&response.text(), priced.usage);

                println!("{}", painter.paint(ColorRole::Agent, &response.text()));

                let mut parts = Vec::new();
                if sections.ui.show_duration {
                    parts.push(format!("{:.1}s", duration.as_secs_f64()));
                }
                if let Some(cycles) = cycle_count {
                    parts.push(format!("cycles: {cycles}"));
                }
                if sections.features.show_tokens {
                    parts.push(format!(
                        "tokens: {} (in: {}, out: {})",
                        format_tokens(priced.usage.total_tokens),
                        format_tokens(priced.usage.input_tokens),
                        format_tokens(priced.usage.output_tokens),
                    ));
                    if let Some(cost) = format_cost_for_turn(&priced) {
                        parts.push(format!("cost: {cost}"));
                        parts.push(format!(
                            "session cost: ${:.4}",
                            self.session.cumulative_usage().cost
                        ));
                    }
                }
                if !parts.is_empty() {
                    println!("{}", painter.paint(ColorRole::Dim, &parts.join(" | ")));
                }
                TurnOutcome::Continue
            }
            InvokeOutcome::Failed { category, message } => {
                warn!(?category, error = message.as_str(), "agent call failed");
                if category == ErrorCategory::Cancelled {
                    // No visible error beyond the cleared indicator; just reprompt.
                    return TurnOutcome::Continue;
                }
                let mut line = format!("{category:?}: {message}");
                if category == ErrorCategory::Configuration {
                    line.push_str(" — ");
                    line.push_str(configuration_hint(&message));
                }
                println!("{}", painter.paint(ColorRole::Error, &line));
                TurnOutcome::Continue
            }
        }
    }

    async fn shutdown(&mut self, painter: &Painter) {
        let summary = crate::session::render_summary(&self.session);
        println!("{}", painter.paint(ColorRole::System, &summary));

        let sections = self.sections();
        if sections.features.auto_save && !self.session.transcript().is_empty() {
            let exporter = ConversationExporter::new(sections.paths.save_location.clone());
            match exporter.export(
                &self.session,
                &self.agent.display_name(),
                self.agent.model_id().as_deref(),
                chrono::Utc::now(),
            ) {
                Ok(path) => info!(path = %path.display(), "exported conversation"),
                Err(e) => error!(error = %e, "failed to export conversation"),
            }
        }

        self.agent.cleanup().await;
    }
}

enum TurnOutcome {
    Continue,
    Exit,
}

/// Discovers configuration layers, honoring `--config`.
pub fn discover_config(explicit: Option<PathBuf>) -> Result<EffectiveConfig, crate::error::AppError> {
    let layers = crate::config::discover_layers(explicit.as_deref())?;
    Ok(EffectiveConfig::new(layers))
}
