//! The one-shot handle lent to a command handler.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::console::Console;
use crate::shell::Shell;

/// What the dispatch loop should do once a command completes.
#[derive(Debug)]
pub(crate) enum Step {
    /// Prompt for the next line.
    Next,
    /// Re-enter the dispatcher with an already-tokenized command.
    Execute(String, Vec<String>),
}

/// Handle passed to a command handler for exactly one invocation.
///
/// The first of [`end`](Self::end), [`fail`](Self::fail) or
/// [`execute`](Self::execute) consumes the handle's guard and resumes the
/// dispatch loop; every later call on the same context is a no-op, as are
/// `write` and `help` once consumed. The handle may be moved into a spawned
/// task and completed after arbitrary asynchronous work.
pub struct CommandContext {
    command: String,
    args: Vec<String>,
    options: Map<String, Value>,
    console: Arc<Console>,
    shell: Arc<Shell>,
    guard: Mutex<Option<UnboundedSender<Step>>>,
}

impl CommandContext {
    pub(crate) fn new(
        command: impl Into<String>,
        args: Vec<String>,
        options: Map<String, Value>,
        console: Arc<Console>,
        shell: Arc<Shell>,
        done: UnboundedSender<Step>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            options,
            console,
            shell,
            guard: Mutex::new(Some(done)),
        }
    }

    /// The name the command was invoked under. For a fallback invocation this
    /// is the literal unresolved name the user typed.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Positional arguments, in input order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Parsed flags.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    fn active(&self) -> bool {
        self.guard.lock().is_some()
    }

    /// Writes a message through the console. No-op once consumed.
    pub fn write(&self, message: impl fmt::Display) {
        if self.active() {
            self.console.write(message);
        }
    }

    /// Prints the shell's command listing. Does not consume the context.
    pub fn help(&self) {
        if self.active() {
            self.shell.help();
        }
    }

    /// Completes the command; the shell prompts for the next line.
    pub fn end(&self) {
        if let Some(done) = self.guard.lock().take() {
            let _ = done.send(Step::Next);
        }
    }

    /// Writes the error's display form, then completes like [`end`](Self::end).
    pub fn fail(&self, err: impl fmt::Display) {
        if self.active() {
            self.console.write(err);
            self.end();
        }
    }

    /// Completes the command and re-enters the dispatcher with another
    /// command and pre-tokenized arguments; option parsing still applies.
    pub fn execute(&self, command: impl Into<String>, args: Vec<String>) {
        if let Some(done) = self.guard.lock().take() {
            let _ = done.send(Step::Execute(command.into(), args));
        }
    }
}
