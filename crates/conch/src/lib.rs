//! # conch
//!
//! An embeddable interactive command shell: line prompts, masked
//! (password-style) prompts, and a command dispatch loop with aliases, help
//! listing and a fallback handler.
//!
//! ```no_run
//! use conch::PromptOptions;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let shell = conch::shell();
//!
//!     shell
//!         .command_with_help(["greet", "hi"], "says hello", |ctx| {
//!             let name = ctx.args().first().cloned().unwrap_or_else(|| "world".into());
//!             ctx.write(format!("hello, {name}"));
//!             ctx.end();
//!             Ok(())
//!         })
//!         .unwrap();
//!
//!     shell.prompt("> ", PromptOptions::default()).await;
//! }
//! ```
//!
//! Handlers complete through their [`CommandContext`]: the loop prompts again
//! only once `end`, `fail` or `execute` fires, which may happen synchronously
//! or from a spawned task later on. Independent instances bound to arbitrary
//! stream pairs come from [`create`]; tests drive them with a
//! [`ScriptedKeySource`] and an in-memory writer.

use std::io::Write;
use std::sync::{Arc, LazyLock};

pub mod console;
pub mod error;
pub mod shell;

pub use console::{
    BufferedEditor, Console, ConsoleState, EditorSignal, KeySource, LineEditor, LineOptions,
    MaskOptions, ScriptedKeySource, TtyKeySource,
};
pub use error::{ConsoleError, Result};

// Key-event vocabulary used across the public API.
pub use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
pub use shell::{
    Action, CommandContext, CommandNames, FALLBACK_COMMAND, HELP_COMMAND, PromptOptions, Shell,
    TokenizeOptions,
};

static DEFAULT_SHELL: LazyLock<Arc<Shell>> = LazyLock::new(|| Shell::new(Console::stdio()));

/// The process-wide default shell, bound to stdin/stdout. Constructed on
/// first use; torn down with the process.
pub fn shell() -> Arc<Shell> {
    DEFAULT_SHELL.clone()
}

/// Creates an independent shell over an arbitrary stream pair.
pub fn create(source: Box<dyn KeySource>, output: Box<dyn Write + Send>) -> Arc<Shell> {
    Shell::new(Console::new(source, output))
}

/// Terminates the host process.
pub fn exit(code: i32) -> ! {
    std::process::exit(code)
}
