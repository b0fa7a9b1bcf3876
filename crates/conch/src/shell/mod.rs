//! Command registry and the dispatch loop driving it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::console::{Console, LineOptions, MaskOptions};
use crate::error::{ConsoleError, Result};

pub mod context;
pub mod opts;
pub mod words;

pub use context::CommandContext;
use context::Step;
pub use words::TokenizeOptions;

/// Registry key for the handler invoked when no other name matches.
pub const FALLBACK_COMMAND: &str = "_";

/// Name reserved for the built-in command listing when no explicit handler
/// (and no fallback) claims it.
pub const HELP_COMMAND: &str = "help";

const DEFAULT_PROMPT: &str = "> ";

/// A registered command handler. Returning `Err` is reported to the user as
/// `Error: …` and the loop continues; the handler otherwise signals
/// completion through its [`CommandContext`], possibly from a spawned task.
pub type Action = Arc<dyn Fn(CommandContext) -> anyhow::Result<()> + Send + Sync>;

/// One or more names to register a command under.
pub trait CommandNames {
    fn into_names(self) -> Vec<String>;
}

impl CommandNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl CommandNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl CommandNames for &[&str] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> CommandNames for [&str; N] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl CommandNames for Vec<String> {
    fn into_names(self) -> Vec<String> {
        self
    }
}

/// Options for [`Shell::run`] / [`Shell::prompt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOptions {
    /// Passes backslashes through the tokenizer literally.
    pub ignore_backslash: bool,
}

struct CommandEntry {
    action: Option<Action>,
    help: Option<String>,
}

enum Resolution {
    Action(Action),
    Help,
    Unsupported,
}

/// An interactive command shell over a [`Console`].
///
/// The registry is ordinary shared state behind a mutex; handlers may
/// register further commands while the shell runs.
pub struct Shell {
    console: Arc<Console>,
    commands: Mutex<BTreeMap<String, CommandEntry>>,
    prompt: Mutex<String>,
    tokenize: Mutex<TokenizeOptions>,
}

impl Shell {
    pub fn new(console: Arc<Console>) -> Arc<Self> {
        Arc::new(Self {
            console,
            commands: Mutex::new(BTreeMap::new()),
            prompt: Mutex::new(DEFAULT_PROMPT.to_string()),
            tokenize: Mutex::new(TokenizeOptions::default()),
        })
    }

    pub fn console(&self) -> Arc<Console> {
        self.console.clone()
    }

    /// Registers a handler under one or more names.
    pub fn command<N, F>(&self, names: N, action: F) -> Result<&Self>
    where
        N: CommandNames,
        F: Fn(CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(names.into_names(), None, Some(Arc::new(action)))
    }

    /// Registers a handler with help text shown by the command listing.
    pub fn command_with_help<N, F>(&self, names: N, help: &str, action: F) -> Result<&Self>
    where
        N: CommandNames,
        F: Fn(CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(
            names.into_names(),
            Some(help.to_string()),
            Some(Arc::new(action)),
        )
    }

    /// Registers a recognized name with no handler. Such names resolve to the
    /// fallback handler when one is installed.
    pub fn noop<N: CommandNames>(&self, names: N, help: Option<&str>) -> Result<&Self> {
        self.register(names.into_names(), help.map(str::to_string), None)
    }

    /// Installs the handler invoked when no other name matches.
    pub fn fallback<F>(&self, action: F) -> Result<&Self>
    where
        F: Fn(CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(vec![FALLBACK_COMMAND.to_string()], None, Some(Arc::new(action)))
    }

    fn register(
        &self,
        names: Vec<String>,
        help: Option<String>,
        action: Option<Action>,
    ) -> Result<&Self> {
        let mut commands = self.commands.lock();
        for name in names {
            if name.is_empty() {
                return Err(ConsoleError::EmptyCommandName);
            }
            // The fallback entry never appears in the listing, so it carries
            // no help text.
            let help = if name == FALLBACK_COMMAND {
                None
            } else {
                help.clone()
            };
            debug!(command = %name, "registered");
            commands.insert(
                name,
                CommandEntry {
                    action: action.clone(),
                    help,
                },
            );
        }
        Ok(self)
    }

    /// Writes the command listing: every registered name except the fallback
    /// key, sorted, padded to the widest name, followed by its help text.
    pub fn help(&self) {
        let commands = self.commands.lock();
        let width = commands
            .keys()
            .filter(|name| *name != FALLBACK_COMMAND)
            .map(String::len)
            .max()
            .unwrap_or(0);

        for (name, entry) in commands.iter() {
            if name == FALLBACK_COMMAND {
                continue;
            }
            let help = entry.help.as_deref().unwrap_or("");
            self.console.write(format_args!("{name:<width$} {help}"));
        }
    }

    /// Runs the dispatch loop, exiting the process when the console
    /// terminates (interrupt or end of input).
    pub async fn prompt(self: &Arc<Self>, prompt: &str, options: PromptOptions) {
        match self.run(prompt, options).await {
            Err(ConsoleError::Interrupted) | Err(ConsoleError::Eof) => crate::exit(130),
            Err(err) => {
                self.console.write(format_args!("Error: {err}"));
                crate::exit(1);
            }
            Ok(()) => crate::exit(0),
        }
    }

    /// Runs the dispatch loop until the console terminates, surfacing the
    /// terminal condition to the caller instead of exiting the process.
    pub async fn run(self: &Arc<Self>, prompt: &str, options: PromptOptions) -> Result<()> {
        // An empty prompt means "the default", not "keep the previous one".
        *self.prompt.lock() = if prompt.is_empty() {
            DEFAULT_PROMPT.to_string()
        } else {
            prompt.to_string()
        };
        *self.tokenize.lock() = TokenizeOptions {
            ignore_backslash: options.ignore_backslash,
        };

        loop {
            let prompt = self.prompt.lock().clone();
            let line = self
                .console
                .ask_line(&prompt, &LineOptions { no_space: true })
                .await?;

            let mut step = self.dispatch_line(&line).await;
            while let Step::Execute(name, raw_args) = step {
                step = self.dispatch(&name, raw_args).await;
            }
        }
    }

    async fn dispatch_line(self: &Arc<Self>, line: &str) -> Step {
        let options = *self.tokenize.lock();
        let mut tokens = match words::tokenize(line, &options) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.console.write(format_args!("Error: {err}"));
                return Step::Next;
            }
        };

        // Nothing typed: prompt again without invoking anything.
        if tokens.is_empty() {
            return Step::Next;
        }

        let name = tokens.remove(0);
        self.dispatch(&name, tokens).await
    }

    /// One dispatch: option-parse the raw arguments, resolve the name, invoke
    /// the handler, and wait for its context to signal completion.
    async fn dispatch(self: &Arc<Self>, name: &str, raw_args: Vec<String>) -> Step {
        if name.is_empty() {
            return Step::Next;
        }

        let parsed = opts::parse(raw_args);

        match self.resolve(name) {
            Resolution::Action(action) => {
                debug!(command = name, args = ?parsed.positional, "dispatching");
                let (done, mut completed) = mpsc::unbounded_channel();
                let ctx = CommandContext::new(
                    name,
                    parsed.positional,
                    parsed.flags,
                    self.console.clone(),
                    self.clone(),
                    done.clone(),
                );

                if let Err(err) = (action)(ctx) {
                    self.console.write(format_args!("Error: {err}"));
                    let _ = done.send(Step::Next);
                }
                drop(done);

                match completed.recv().await {
                    Some(step) => step,
                    None => {
                        warn!(command = name, "context dropped without completing");
                        Step::Next
                    }
                }
            }
            Resolution::Help => {
                self.help();
                Step::Next
            }
            Resolution::Unsupported => {
                self.console
                    .write(format_args!("Command '{name}' not supported."));
                Step::Next
            }
        }
    }

    fn resolve(&self, name: &str) -> Resolution {
        let commands = self.commands.lock();

        if let Some(action) = commands.get(name).and_then(|entry| entry.action.clone()) {
            return Resolution::Action(action);
        }
        // Recognized-but-empty entries and unknown names both fall back.
        if let Some(fallback) = commands
            .get(FALLBACK_COMMAND)
            .and_then(|entry| entry.action.clone())
        {
            return Resolution::Action(fallback);
        }
        if name == HELP_COMMAND {
            return Resolution::Help;
        }
        Resolution::Unsupported
    }

    /// Ad-hoc line prompt outside the command loop.
    pub async fn question(&self, prompt: &str, options: &LineOptions) -> Result<String> {
        self.console.ask_line(prompt, options).await
    }

    /// Ad-hoc masked prompt outside the command loop.
    pub async fn password(&self, prompt: &str, options: &MaskOptions) -> Result<Option<String>> {
        self.console.ask_masked(prompt, options).await
    }

    pub fn write(&self, message: impl fmt::Display) {
        self.console.write(message);
    }

    pub async fn close(&self) {
        self.console.close().await;
    }
}
