//! The console engine: raw keypress interception, line prompts, masked
//! prompts, and the state machine tying them together.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::{ConsoleError, Result};

pub mod editor;
pub mod source;
pub mod term;

pub use editor::{BufferedEditor, EditorSignal, LineEditor};
pub use source::{KeySource, ScriptedKeySource};
pub use term::TtyKeySource;

/// Lifecycle of a [`Console`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    New,
    Idle,
    PromptingLine,
    PromptingMasked,
    Closed,
}

/// Options for a plain-line prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineOptions {
    /// Suppresses the trailing space normally appended to a non-empty prompt.
    pub no_space: bool,
}

/// Options for a masked prompt.
#[derive(Debug, Clone, Copy)]
pub struct MaskOptions {
    /// Glyph echoed per typed character; `None` renders nothing at all.
    pub glyph: Option<char>,
    pub no_space: bool,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            glyph: Some('*'),
            no_space: false,
        }
    }
}

/// The input collaborators. Released on close so the key source and editor
/// never outlive the console's useful life.
struct Engine {
    source: Box<dyn KeySource>,
    editor: Box<dyn LineEditor>,
}

/// The console engine. Owns the key source and the output sink exclusively;
/// every raw keypress is observed here before the line editor sees it, so
/// control combinations behave the same in every mode and masked input never
/// echoes through the editor.
///
/// The lifecycle state lives outside the engine lock: it stays observable
/// while a prompt pump holds the engine, and `close()` can interrupt a
/// pending ask instead of queueing behind it.
pub struct Console {
    engine: tokio::sync::Mutex<Option<Engine>>,
    output: Mutex<Box<dyn Write + Send>>,
    state: Mutex<ConsoleState>,
    closing: Notify,
    pending: AtomicBool,
    interactive: bool,
}

/// Releases the one-outstanding-ask slot on every pump exit path.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn is_ctrl(key: &KeyEvent, ch: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && !key.modifiers.contains(KeyModifiers::SHIFT)
        && key.code == KeyCode::Char(ch)
}

fn decorate(prompt: &str, no_space: bool) -> String {
    if prompt.is_empty() || no_space {
        prompt.to_string()
    } else {
        format!("{prompt} ")
    }
}

impl Console {
    /// Creates a console over an arbitrary stream pair, with the built-in
    /// buffered editor.
    pub fn new(source: Box<dyn KeySource>, output: Box<dyn Write + Send>) -> Arc<Self> {
        Self::with_editor(source, output, Box::new(BufferedEditor::new()))
    }

    /// Creates a console with a caller-supplied line editor.
    pub fn with_editor(
        source: Box<dyn KeySource>,
        output: Box<dyn Write + Send>,
        editor: Box<dyn LineEditor>,
    ) -> Arc<Self> {
        let interactive = source.is_interactive();
        Arc::new(Self {
            engine: tokio::sync::Mutex::new(Some(Engine { source, editor })),
            output: Mutex::new(output),
            state: Mutex::new(ConsoleState::New),
            closing: Notify::new(),
            pending: AtomicBool::new(false),
            interactive,
        })
    }

    /// Creates a console bound to the process terminal.
    pub fn stdio() -> Arc<Self> {
        Self::new(
            Box::new(TtyKeySource::new()),
            Box::new(std::io::stdout()),
        )
    }

    /// Whether the stream pair supports raw keypress delivery.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn state(&self) -> ConsoleState {
        *self.state.lock()
    }

    /// Lazily brings the engine to `Idle`. Idempotent; fails once closed.
    pub fn initialize(&self) -> Result<()> {
        self.ensure_ready()
    }

    fn ensure_ready(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            ConsoleState::Closed => Err(ConsoleError::Closed),
            ConsoleState::New => {
                debug!("console initialized");
                *state = ConsoleState::Idle;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn set_state(&self, next: ConsoleState) {
        *self.state.lock() = next;
    }

    fn acquire_pending(&self) -> Result<PendingGuard<'_>> {
        if self.pending.swap(true, Ordering::SeqCst) {
            return Err(ConsoleError::PromptPending);
        }
        Ok(PendingGuard(&self.pending))
    }

    /// Prompts for a line of text. At most one ask may be outstanding.
    pub async fn ask_line(&self, prompt: &str, options: &LineOptions) -> Result<String> {
        let _pending = self.acquire_pending()?;
        let mut slot = self.engine.lock().await;
        self.ensure_ready()?;
        let engine = slot.as_mut().ok_or(ConsoleError::Closed)?;

        let prompt = decorate(prompt, options.no_space);
        self.set_state(ConsoleState::PromptingLine);

        let outcome = match engine.source.set_raw(true) {
            Ok(()) => {
                let outcome = self.line_pump(engine, &prompt).await;
                let _ = engine.source.set_raw(false);
                outcome
            }
            Err(err) => Err(err.into()),
        };

        self.settle(&mut slot, outcome)
    }

    /// Prompts for a secret. Returns `Ok(None)` when the entry was aborted
    /// (interrupt, or end-of-stream on an empty buffer); the accumulated
    /// buffer is dropped on abort and never delivered.
    pub async fn ask_masked(&self, prompt: &str, options: &MaskOptions) -> Result<Option<String>> {
        let _pending = self.acquire_pending()?;
        let mut slot = self.engine.lock().await;
        self.ensure_ready()?;
        let engine = slot.as_mut().ok_or(ConsoleError::Closed)?;

        if !self.interactive {
            return Err(ConsoleError::NotInteractive);
        }

        let prompt = decorate(prompt, options.no_space);
        if !prompt.is_empty() {
            self.print(prompt.as_bytes())?;
        }
        self.set_state(ConsoleState::PromptingMasked);

        let outcome = match engine.source.set_raw(true) {
            Ok(()) => {
                let outcome = self.masked_pump(engine, options.glyph).await;
                let _ = engine.source.set_raw(false);
                outcome
            }
            Err(err) => Err(err.into()),
        };

        self.settle(&mut slot, outcome)
    }

    /// Writes a message followed by a newline. Never suspends.
    pub fn write(&self, message: impl fmt::Display) {
        let mut out = self.output.lock();
        let _ = writeln!(out, "{message}");
        let _ = out.flush();
    }

    /// Transitions to `Closed` and releases the key source and editor.
    /// Interrupts a pending ask, which surfaces `Err(ConsoleError::Closed)`;
    /// any later ask fails the same way.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == ConsoleState::Closed {
                return;
            }
            *state = ConsoleState::Closed;
        }
        debug!("console closed");
        self.closing.notify_one();
        self.engine.lock().await.take();
    }

    fn print(&self, bytes: &[u8]) -> Result<()> {
        let mut out = self.output.lock();
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }

    /// Applies a pump outcome to the state machine. Interrupt and
    /// end-of-stream both terminate the console; a concurrent `close()` has
    /// already done so; everything else returns it to `Idle`.
    fn settle<T>(&self, slot: &mut Option<Engine>, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Err(ConsoleError::Interrupted) | Err(ConsoleError::Eof) => {
                debug!("console terminated");
                self.set_state(ConsoleState::Closed);
                slot.take();
                let _ = self.print(b"\n");
            }
            // close() may be parked on the engine lock this pump holds, so
            // the collaborators are released here.
            Err(ConsoleError::Closed) => {
                slot.take();
            }
            _ => self.set_state(ConsoleState::Idle),
        }
        outcome
    }

    /// Waits for the next keypress, or for a concurrent `close()`.
    async fn next_key(&self, engine: &mut Engine) -> Result<KeyEvent> {
        tokio::select! {
            _ = self.closing.notified() => Err(ConsoleError::Closed),
            key = engine.source.next_key() => key?.ok_or(ConsoleError::Eof),
        }
    }

    async fn line_pump(&self, engine: &mut Engine, prompt: &str) -> Result<String> {
        {
            let mut out = self.output.lock();
            engine.editor.begin(prompt, &mut **out)?;
        }

        loop {
            let key = self.next_key(engine).await?;

            // Control combinations are the engine's, in every mode.
            if is_ctrl(&key, 'c') {
                return Err(ConsoleError::Interrupted);
            }
            if is_ctrl(&key, 'z') {
                engine.source.suspend().await?;
                continue;
            }

            // Replay everything else into the editor while prompting.
            let signal = {
                let mut out = self.output.lock();
                engine.editor.keypress(&key, &mut **out)?
            };
            match signal {
                Some(EditorSignal::Line(line)) => return Ok(line),
                Some(EditorSignal::Close) => return Err(ConsoleError::Eof),
                None => {}
            }
        }
    }

    async fn masked_pump(
        &self,
        engine: &mut Engine,
        glyph: Option<char>,
    ) -> Result<Option<String>> {
        let mut buffer = String::new();

        loop {
            let key = self.next_key(engine).await?;

            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
            let shift = key.modifiers.contains(KeyModifiers::SHIFT);
            let meta = key.modifiers.contains(KeyModifiers::ALT);

            if ctrl && !shift {
                match key.code {
                    // Interrupt aborts the entry, not the process.
                    KeyCode::Char('c') => return Ok(None),
                    // End-of-stream aborts only an empty entry.
                    KeyCode::Char('d') if buffer.is_empty() => return Ok(None),
                    KeyCode::Char('z') => engine.source.suspend().await?,
                    KeyCode::Char('h') => self.erase_masked(&mut buffer, glyph)?,
                    _ => {}
                }
                continue;
            }
            if ctrl || meta {
                continue;
            }

            match key.code {
                KeyCode::Enter => {
                    self.print(b"\r\n")?;
                    return Ok(Some(buffer));
                }
                KeyCode::Backspace => self.erase_masked(&mut buffer, glyph)?,
                KeyCode::Char(ch) if ch as u32 >= 0x20 => {
                    buffer.push(ch);
                    if let Some(glyph) = glyph {
                        let mut encoded = [0u8; 4];
                        self.print(glyph.encode_utf8(&mut encoded).as_bytes())?;
                    }
                }
                _ => {}
            }
        }
    }

    fn erase_masked(&self, buffer: &mut String, glyph: Option<char>) -> Result<()> {
        if buffer.pop().is_some() && glyph.is_some() {
            self.print(b"\x08 \x08")?;
        }
        Ok(())
    }
}
