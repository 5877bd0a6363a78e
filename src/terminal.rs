use crossterm::{ExecutableCommand, terminal};
use std::io;
use std::io::{IsTerminal, Write};

pub struct RawLock {}

impl Drop for RawLock {
    fn drop(&mut self) {
        // terminal stays in raw mode but no means to repair
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("Error resetting terminal {e}");
        }
    }
}

fn handle_set_raw_error(e: &io::Error) {
    log::warn!("Could not set terminal to raw mode: {e}");
}

/// Set terminal to raw in best-effort mode, only log on failure, the machine
/// keeps running with a cooked terminal then and CTRL-C arrives as a signal.
pub fn set_terminal_raw(mut stdout: impl Write) -> RawLock {
    if let Err(e) =
        terminal::enable_raw_mode().and_then(|()| stdout.execute(terminal::EnableLineWrap))
    {
        handle_set_raw_error(&e);
    }
    RawLock {}
}

/// True when both stdin and stdout are attached to a terminal.
#[must_use]
pub fn is_interactive_terminal() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Console for the machine's serial output.
///
/// On a terminal every `\n` is written as `\r\n` since raw mode does no
/// output processing. Pipes and files get the bytes unchanged.
pub struct ConsoleOut<W: Write> {
    inner: W,
    on_terminal: bool,
}

impl<W: Write> ConsoleOut<W> {
    pub const fn new(inner: W, on_terminal: bool) -> Self {
        Self { inner, on_terminal }
    }
}

impl<W: Write> Write for ConsoleOut<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.on_terminal {
            return self.inner.write(buf);
        }
        for (index, line) in buf.split(|&byte| byte == b'\n').enumerate() {
            if index > 0 {
                self.inner.write_all(b"\r\n")?;
            }
            self.inner.write_all(line)?;
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
