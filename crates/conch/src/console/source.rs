//! Key-event sources feeding the console engine.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// A stream of raw keypress events, exclusively owned by the console once it
/// is initialized. `next_key` returning `Ok(None)` means the underlying input
/// has closed for good.
#[async_trait]
pub trait KeySource: Send {
    async fn next_key(&mut self) -> io::Result<Option<KeyEvent>>;

    /// Whether the stream pair supports character-at-a-time delivery.
    fn is_interactive(&self) -> bool;

    /// Enables or disables raw (character-at-a-time) delivery. Only
    /// meaningful for real terminals.
    fn set_raw(&mut self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }

    /// Requests process suspension and returns once the process resumes.
    /// Best-effort; a no-op where the platform has no suspend signal.
    async fn suspend(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A scripted key source: replays a queue of prepared events, then either
/// reports end-of-stream or stays open forever. Used by tests and terminal
/// automation.
pub struct ScriptedKeySource {
    queue: VecDeque<KeyEvent>,
    interactive: bool,
    hold_open: bool,
}

impl ScriptedKeySource {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            interactive: true,
            hold_open: false,
        }
    }

    /// Marks the source as a non-interactive stream pair.
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Keeps the source open once the queue drains instead of reporting
    /// end-of-stream; `next_key` then pends forever.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn push_key(&mut self, event: KeyEvent) -> &mut Self {
        self.queue.push_back(event);
        self
    }

    /// Queues every character of `text` as a plain keypress; `\n` becomes
    /// Enter.
    pub fn push_text(&mut self, text: &str) -> &mut Self {
        for ch in text.chars() {
            let code = if ch == '\n' { KeyCode::Enter } else { KeyCode::Char(ch) };
            self.queue.push_back(KeyEvent::new(code, KeyModifiers::NONE));
        }
        self
    }

    pub fn push_code(&mut self, code: KeyCode) -> &mut Self {
        self.queue.push_back(KeyEvent::new(code, KeyModifiers::NONE));
        self
    }

    /// Queues a Ctrl+`ch` combination.
    pub fn push_ctrl(&mut self, ch: char) -> &mut Self {
        self.queue
            .push_back(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL));
        self
    }
}

impl Default for ScriptedKeySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeySource for ScriptedKeySource {
    async fn next_key(&mut self) -> io::Result<Option<KeyEvent>> {
        match self.queue.pop_front() {
            Some(event) => Ok(Some(event)),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}
