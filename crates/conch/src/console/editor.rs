//! The line-editing collaborator seam.
//!
//! The console engine owns the editor outright: the editor never touches the
//! input stream itself. The engine replays keypresses into `keypress` while a
//! plain-line prompt is active, and the editor answers with the same one-shot
//! signals a readline-style primitive would emit.

use std::io::{self, Write};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Signals a [`LineEditor`] emits back to the engine.
#[derive(Debug, PartialEq, Eq)]
pub enum EditorSignal {
    /// A full line was submitted.
    Line(String),
    /// The editor considers its input closed (end-of-stream).
    Close,
}

pub trait LineEditor: Send {
    /// Starts a new prompt: draws `prompt` and resets the pending buffer.
    fn begin(&mut self, prompt: &str, out: &mut dyn Write) -> io::Result<()>;

    /// Feeds one keypress the engine chose not to consume. Returns a signal
    /// when the keypress completed the line or closed the stream.
    fn keypress(&mut self, key: &KeyEvent, out: &mut dyn Write)
    -> io::Result<Option<EditorSignal>>;
}

/// Minimal buffered editor: append, backspace, submit. Deliberately not a
/// cursor-addressable editor; anything fancier should come from a real
/// line-editing implementation behind the same trait.
#[derive(Default)]
pub struct BufferedEditor {
    buffer: String,
}

impl BufferedEditor {
    pub fn new() -> Self {
        Self::default()
    }

    fn erase_last(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if self.buffer.pop().is_some() {
            out.write_all(b"\x08 \x08")?;
            out.flush()?;
        }
        Ok(())
    }
}

impl LineEditor for BufferedEditor {
    fn begin(&mut self, prompt: &str, out: &mut dyn Write) -> io::Result<()> {
        self.buffer.clear();
        out.write_all(prompt.as_bytes())?;
        out.flush()
    }

    fn keypress(
        &mut self,
        key: &KeyEvent,
        out: &mut dyn Write,
    ) -> io::Result<Option<EditorSignal>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let meta = key.modifiers.contains(KeyModifiers::ALT);

        if ctrl {
            return match key.code {
                // EOF, readline-style: only closes on an empty buffer.
                KeyCode::Char('d') if self.buffer.is_empty() => Ok(Some(EditorSignal::Close)),
                KeyCode::Char('h') => {
                    self.erase_last(out)?;
                    Ok(None)
                }
                _ => Ok(None),
            };
        }
        if meta {
            return Ok(None);
        }

        match key.code {
            KeyCode::Enter => {
                out.write_all(b"\r\n")?;
                out.flush()?;
                Ok(Some(EditorSignal::Line(std::mem::take(&mut self.buffer))))
            }
            KeyCode::Backspace => {
                self.erase_last(out)?;
                Ok(None)
            }
            KeyCode::Char(ch) => {
                self.buffer.push(ch);
                let mut encoded = [0u8; 4];
                out.write_all(ch.encode_utf8(&mut encoded).as_bytes())?;
                out.flush()?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
