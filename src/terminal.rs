//! Line editing, persistent history, status bar, and the thinking indicator.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{cursor, execute, terminal as ct_terminal};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::{DefaultHistory, History};
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;

use crate::colors::Painter;

const HISTORY_CAP: usize = 1000;
const CONTINUATION_PROMPT: &str = "... ";
const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Completes `/name` against the discovered template names. The set is
/// refreshed by the caller before each read, matching the template store's
/// lazy-discovery contract.
pub struct ChatHelper {
    template_names: Vec<String>,
}

impl ChatHelper {
    pub fn new() -> Self {
        Self {
            template_names: Vec::new(),
        }
    }

    pub fn set_template_names(&mut self, names: Vec<String>) {
        self.template_names = names;
    }
}

impl Default for ChatHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((0, Vec::new()));
        }
        let prefix = &line[1..pos.min(line.len())];
        let matches = self
            .template_names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| Pair {
                display: format!("/{name}"),
                replacement: format!("/{name}"),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for ChatHelper {
    type Hint = String;
}

impl Highlighter for ChatHelper {}
impl Validator for ChatHelper {}
impl Helper for ChatHelper {}

/// Whether the controlling terminal supports interactive line editing, a
/// status bar, and a spinner, or whether the non-TTY fallback applies.
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Wraps a rustyline editor with the chat loop's history and multi-line
/// protocol. Constructed once at startup; `history_path` is `None` in the
/// non-TTY fallback, which disables load/save entirely.
pub struct Terminal {
    editor: Editor<ChatHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
    interactive: bool,
}

/// One submitted logical input, or a request to stop the loop.
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

impl Terminal {
    pub fn new(history_path: Option<PathBuf>) -> Result<Self, ReadlineError> {
        let interactive = is_interactive();
        let mut editor = Editor::<ChatHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(ChatHelper::new()));
        editor.set_max_history_size(HISTORY_CAP)?;

        if interactive {
            if let Some(path) = &history_path {
                let _ = editor.load_history(path);
            }
        }

        Ok(Self {
            editor,
            history_path: if interactive { history_path } else { None },
            interactive,
        })
    }

    pub fn set_template_names(&mut self, names: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_template_names(names);
        }
    }

    fn append_history(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let _ = self.editor.add_history_entry(line);
        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
    }

    /// Read one raw line from the controlling terminal (or stdin, if not a
    /// TTY), recording it in history on success.
    fn read_raw(&mut self, prompt: &str) -> ReadOutcome {
        if !self.interactive {
            let mut buf = String::new();
            return match io::stdin().read_line(&mut buf) {
                Ok(0) => ReadOutcome::Eof,
                Ok(_) => ReadOutcome::Line(buf.trim_end_matches('\n').to_string()),
                Err(_) => ReadOutcome::Eof,
            };
        }
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.append_history(&line);
                ReadOutcome::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadOutcome::Interrupted,
            Err(ReadlineError::Eof) => ReadOutcome::Eof,
            Err(_) => ReadOutcome::Eof,
        }
    }

    /// Read one logical input: a single line, or — if that line is exactly
    /// `\\` — the accumulated body of a multi-line block terminated by a
    /// blank line. Returns the joined text with the trailing empty line
    /// removed.
    pub fn read_logical_input(&mut self, prompt: &str) -> ReadOutcome {
        match self.read_raw(prompt) {
            ReadOutcome::Line(line) if line.trim() == "\\" => self.read_multiline_body(),
            other => other,
        }
    }

    fn read_multiline_body(&mut self) -> ReadOutcome {
        let mut lines = Vec::new();
        loop {
            match self.read_raw(CONTINUATION_PROMPT) {
                ReadOutcome::Line(line) if line.is_empty() => break,
                ReadOutcome::Line(line) => lines.push(line),
                other => return other,
            }
        }
        ReadOutcome::Line(lines.join("\n"))
    }
}

/// Erases the current line and redraws nothing else; used before the
/// spinner writes a frame or before the next prompt is drawn.
fn clear_line() {
    let mut stdout = io::stdout();
    let _ = execute!(
        stdout,
        cursor::MoveToColumn(0),
        ct_terminal::Clear(ct_terminal::ClearType::CurrentLine)
    );
    let _ = stdout.flush();
}

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A thinking indicator: a spinner on an interactive terminal, plain dots
/// otherwise. Guaranteed to erase its row exactly once when stopped, even
/// if stopped more than once.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
    interactive: bool,
}

impl Spinner {
    pub fn start(interactive: bool) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let handle = if interactive {
            let running = Arc::clone(&running);
            Some(
                std::thread::Builder::new()
                    .name("spinner".to_string())
                    .spawn(move || {
                        let mut frame = 0usize;
                        while running.load(Ordering::SeqCst) {
                            clear_line();
                            print!("{} thinking...", SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]);
                            let _ = io::stdout().flush();
                            frame += 1;
                            std::thread::sleep(SPINNER_TICK);
                        }
                    })
                    .expect("spinner thread must spawn"),
            )
        } else {
            print!(".");
            let _ = io::stdout().flush();
            None
        };
        Self {
            running,
            handle,
            interactive,
        }
    }

    /// Stop the ticker and erase its row. Safe to call more than once.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if self.interactive {
            clear_line();
        } else {
            println!();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A single line, rendered at the top of a freshly cleared screen,
/// summarizing the running session. Never redrawn mid-query.
pub fn render_status_bar(
    painter: &Painter,
    agent_name: &str,
    model: Option<&str>,
    query_count: u64,
    token_total: Option<&str>,
    elapsed: &str,
) {
    let mut stdout = io::stdout();
    let _ = execute!(
        stdout,
        ct_terminal::Clear(ct_terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    );

    let model_part = model.map(|m| format!(" [{m}]")).unwrap_or_default();
    let tokens_part = token_total
        .map(|t| format!(" | tokens: {t}"))
        .unwrap_or_default();
    let line = format!(
        "{agent_name}{model_part} | queries: {query_count}{tokens_part} | {elapsed}"
    );
    println!("{}", painter.paint(crate::colors::Role::Dim, &line));
    debug!(line, "rendered status bar");
}
