//! The interactive debugger shell.
pub mod commands;
pub mod output;
pub mod tokens;

use crate::debugger::Machine;
use crate::debugger::breakpoints::Breakpoints;
use crate::debugger::run::{CancellationToken, RunLimit};
use crate::errors::{CommandError, MonitorError};
use commands::Flow;
use output::Printer;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::io;
use std::io::Write;
use std::path::PathBuf;
use tokens::Tokens;

pub const PROMPT: &str = "(lc3) ";

/// Result of reading one line from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// CTRL-C at the prompt.
    Interrupted,
    Eof,
}

/// Where command lines come from.
pub trait LineSource {
    /// # Errors
    /// - The terminal could not be read
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome>;
    fn add_history(&mut self, line: &str);
}

struct CommandCompleter;

impl Completer for CommandCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        if line[..pos].contains(char::is_whitespace) {
            return Ok((pos, vec![]));
        }
        let candidates = commands::spellings()
            .filter(|spelling| spelling.starts_with(&line[..pos]))
            .map(str::to_owned)
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}
impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Line editing with history and command completion.
pub struct Editor {
    editor: rustyline::Editor<CommandCompleter, DefaultHistory>,
    history: Option<PathBuf>,
}

impl Editor {
    /// Loads the history file if one is given, a missing file is not an error.
    ///
    /// # Errors
    /// - The terminal could not be set up for line editing
    pub fn new(history: Option<PathBuf>) -> Result<Self, MonitorError> {
        let mut editor = rustyline::Editor::new()
            .map_err(|e| MonitorError::LineEditor(e.to_string()))?;
        editor.set_helper(Some(CommandCompleter));
        if let Some(path) = &history
            && let Err(e) = editor.load_history(path)
        {
            log::info!("No previous history in '{}': {e}", path.display());
        }
        Ok(Self { editor, history })
    }

    /// Writes the history file, failures are only logged.
    pub fn save_history(&mut self) {
        if let Some(path) = &self.history
            && let Err(e) = self.editor.save_history(path)
        {
            log::warn!("Could not write history to '{}': {e}", path.display());
        }
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            log::debug!("History entry dropped: {e}");
        }
    }
}

/// A debugging session: the machine, its breakpoints and the operator output.
pub struct Shell<W: Write> {
    machine: Machine,
    breakpoints: Breakpoints,
    cancel: CancellationToken,
    printer: Printer<W>,
    /// Hold the terminal in raw mode while the machine runs.
    raw_mode: bool,
}

impl<W: Write> Shell<W> {
    pub fn new(
        machine: Machine,
        cancel: CancellationToken,
        printer: Printer<W>,
        raw_mode: bool,
    ) -> Self {
        Self {
            machine,
            breakpoints: Breakpoints::new(),
            cancel,
            printer,
            raw_mode,
        }
    }

    #[must_use]
    pub const fn machine(&self) -> &Machine {
        &self.machine
    }

    #[must_use]
    pub const fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn into_printer(self) -> Printer<W> {
        self.printer
    }

    /// Reads and executes commands until quit, end of input or a halt with
    /// halt-on-stop. Unless `interactive`, the machine first runs until it
    /// stops by itself. A blank line continues running.
    ///
    /// # Errors
    /// - Reading input or writing output failed
    /// - The machine failed, see [`Machine::step_cycle`]
    pub fn run(
        &mut self,
        lines: &mut dyn LineSource,
        interactive: bool,
    ) -> Result<(), MonitorError> {
        if !interactive && self.continue_running()? == Flow::Quit {
            return Ok(());
        }
        loop {
            let flow = match lines.read_line(PROMPT)? {
                ReadOutcome::Eof => return Ok(()),
                ReadOutcome::Interrupted => {
                    self.printer.plain("CTRL+C caught, press CTRL+D to exit.")?;
                    Flow::Continue
                }
                ReadOutcome::Line(line) if line.trim().is_empty() => self.continue_running()?,
                ReadOutcome::Line(line) => {
                    lines.add_history(&line);
                    self.handle_command(&line)?
                }
            };
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    fn continue_running(&mut self) -> Result<Flow, MonitorError> {
        self.cancel.reset();
        let result = self.run_loop(RunLimit::Unbounded);
        self.report(result, "continue", "")
    }

    /// Dispatches one command line.
    ///
    /// # Errors
    /// - See [`Shell::run`]
    pub fn handle_command(&mut self, line: &str) -> Result<Flow, MonitorError> {
        let mut tokens = Tokens::new(line);
        let spelling = tokens.next_token();
        let Some(command) = commands::lookup(spelling) else {
            self.printer.error("  Unknown command")?;
            return Ok(Flow::Continue);
        };
        self.cancel.reset();
        let result = self.execute(command.kind, &mut tokens);
        self.report(result, spelling, command.usage)
    }

    /// Prints command-local failures, passes on the fatal ones.
    fn report(
        &mut self,
        result: Result<Flow, CommandError>,
        spelling: &str,
        usage: &str,
    ) -> Result<Flow, MonitorError> {
        match result {
            Ok(flow) => Ok(flow),
            Err(CommandError::Machine(e)) => Err(e.into()),
            Err(CommandError::Io(e)) => Err(e.into()),
            Err(e) => {
                self.printer.error(format!("  {e}"))?;
                if e.is_syntax() {
                    self.printer.error("  Invalid syntax")?;
                    self.printer.info(format!("  Usage: {spelling} {usage}"))?;
                }
                Ok(Flow::Continue)
            }
        }
    }
}
