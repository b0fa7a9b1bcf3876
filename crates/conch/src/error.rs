use std::io;
use thiserror::Error;

/// Errors surfaced by the console engine and the shell registry.
///
/// Boundary-validation failures (`Closed`, `PromptPending`, `NotInteractive`,
/// `EmptyCommandName`) propagate directly to the caller. `Interrupted` and
/// `Eof` report why a prompt ended without a line; the shell loop translates
/// them into process termination.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("console already closed")]
    Closed,

    #[error("a prompt is already pending")]
    PromptPending,

    #[error("masked input requires an interactive terminal")]
    NotInteractive,

    #[error("interrupted")]
    Interrupted,

    #[error("input stream closed")]
    Eof,

    #[error("command name must not be empty")]
    EmptyCommandName,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
