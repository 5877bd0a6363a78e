use crate::debugger::run::CancellationToken;
use crossterm::event::{KeyCode, KeyModifiers, poll, read};
use std::io;
use std::io::{BufReader, Read};
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// Providing Keyboard Input independent of an implementation.
pub trait KeyboardInputProvider {
    /// Returns a pending character, never blocks.
    fn poll_character(&mut self) -> io::Result<Option<u8>>;
}

/// Polls the controlling terminal through crossterm.
///
/// In raw mode CTRL-C arrives here as a key press instead of a signal, it is
/// turned into a cancellation request.
pub struct TerminalInputProvider {
    cancel: CancellationToken,
    disabled: bool,
}

impl TerminalInputProvider {
    pub const fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            disabled: false,
        }
    }
}

impl KeyboardInputProvider for TerminalInputProvider {
    fn poll_character(&mut self) -> io::Result<Option<u8>> {
        if self.disabled {
            return Ok(None);
        }
        let polled = (|| -> io::Result<Option<u8>> {
            if poll(Duration::ZERO)?
                && let Some(event) = read()?.as_key_press_event()
            {
                if event.code == KeyCode::Char('c') && event.modifiers == KeyModifiers::CONTROL {
                    self.cancel.cancel();
                    return Ok(None);
                }
                return Ok(key_to_ascii(event.code));
            }
            Ok(None)
        })();
        if let Err(e) = &polled {
            // no terminal attached, keep the simulation running without input
            log::warn!("Keyboard polling disabled: {e}");
            self.disabled = true;
        }
        polled
    }
}

fn key_to_ascii(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Char(c) if c.is_ascii() => u8::try_from(c).ok(),
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Backspace => Some(0x08),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Esc => Some(0x1B),
        _ => None,
    }
}

/// Keyboard input from a pipe or a redirected file.
///
/// A reader thread forwards the bytes through a channel so polling never
/// blocks. The thread is started by the first poll, until then the input
/// belongs to the shell.
pub struct ReaderInputProvider {
    source: Option<Box<dyn Read + Send>>,
    receiver: Option<Receiver<u8>>,
}

impl ReaderInputProvider {
    pub fn new(source: impl Read + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            receiver: None,
        }
    }
}

fn spawn_reader(source: Box<dyn Read + Send>) -> Receiver<u8> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for byte in BufReader::new(source).bytes() {
            match byte {
                Ok(byte) => {
                    if sender.send(byte).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Keyboard input failed: {e}");
                    break;
                }
            }
        }
    });
    receiver
}

impl KeyboardInputProvider for ReaderInputProvider {
    fn poll_character(&mut self) -> io::Result<Option<u8>> {
        if let Some(source) = self.source.take() {
            self.receiver = Some(spawn_reader(source));
        }
        let Some(receiver) = &self.receiver else {
            return Ok(None);
        };
        match receiver.try_recv() {
            Ok(byte) => Ok(Some(byte)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                log::debug!("End of keyboard input");
                self.receiver = None;
                Ok(None)
            }
        }
    }
}

/// A keyboard that never has input.
pub struct NoKeyboard;

impl KeyboardInputProvider for NoKeyboard {
    fn poll_character(&mut self) -> io::Result<Option<u8>> {
        Ok(None)
    }
}
