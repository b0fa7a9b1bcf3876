//! Terminal-backed key source for the process stdin/stdout pair.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

use super::source::KeySource;

/// Key source bound to the process terminal. On a real TTY it delivers raw
/// keypresses through crossterm; on a piped stdin it falls back to reading
/// whole lines and synthesizing the keypresses they imply.
pub struct TtyKeySource {
    interactive: bool,
    raw: bool,
    events: Option<EventStream>,
    pipe: Option<BufReader<Stdin>>,
    replay: VecDeque<KeyEvent>,
}

impl TtyKeySource {
    pub fn new() -> Self {
        let interactive = atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout);
        Self {
            interactive,
            raw: false,
            events: None,
            pipe: None,
            replay: VecDeque::new(),
        }
    }

    async fn next_tty_key(&mut self) -> io::Result<Option<KeyEvent>> {
        let events = self.events.get_or_insert_with(EventStream::new);
        loop {
            match events.next().await {
                Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                    return Ok(Some(key));
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err),
                None => return Ok(None),
            }
        }
    }

    async fn next_piped_key(&mut self) -> io::Result<Option<KeyEvent>> {
        let pipe = self
            .pipe
            .get_or_insert_with(|| BufReader::new(tokio::io::stdin()));

        let mut line = String::new();
        if pipe.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        for ch in line.trim_end_matches(['\r', '\n']).chars() {
            self.replay
                .push_back(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
        self.replay
            .push_back(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        Ok(self.replay.pop_front())
    }
}

impl Default for TtyKeySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeySource for TtyKeySource {
    async fn next_key(&mut self) -> io::Result<Option<KeyEvent>> {
        if let Some(key) = self.replay.pop_front() {
            return Ok(Some(key));
        }
        if self.interactive {
            self.next_tty_key().await
        } else {
            self.next_piped_key().await
        }
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn set_raw(&mut self, enabled: bool) -> io::Result<()> {
        if !self.interactive || self.raw == enabled {
            return Ok(());
        }
        if enabled {
            terminal::enable_raw_mode()?;
        } else {
            terminal::disable_raw_mode()?;
        }
        self.raw = enabled;
        Ok(())
    }

    #[cfg(unix)]
    async fn suspend(&mut self) -> io::Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;
        use tokio::signal::unix::{SignalKind, signal};
        use tracing::debug;

        debug!("suspending process");
        let was_raw = self.raw;
        self.set_raw(false)?;

        let mut resumed = signal(SignalKind::from_raw(nix::libc::SIGCONT))?;
        kill(Pid::this(), Signal::SIGTSTP).map_err(io::Error::from)?;
        resumed.recv().await;

        debug!("process resumed");
        self.set_raw(was_raw)
    }

    #[cfg(not(unix))]
    async fn suspend(&mut self) -> io::Result<()> {
        // No suspend signal on this platform.
        Ok(())
    }
}
