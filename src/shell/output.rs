//! Operator facing output of the shell.
use ansi_term::{Colour, Style};
use std::fmt::Display;
use std::io;
use std::io::Write;

const BYTES_PER_ROW: usize = 16;
const GROUPING: usize = 2;
const GRAY: Colour = Colour::Fixed(240);

/// Writes lines to the operator, styled when `color` is set.
pub struct Printer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Printer<W> {
    pub const fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, style: Style, text: impl Display) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", style.paint(text.to_string()))
        } else {
            writeln!(self.out, "{text}")
        }
    }

    pub fn plain(&mut self, text: impl Display) -> io::Result<()> {
        self.line(Style::new(), text)
    }

    pub fn info(&mut self, text: impl Display) -> io::Result<()> {
        self.line(Style::new().bold(), text)
    }

    pub fn warn(&mut self, text: impl Display) -> io::Result<()> {
        self.line(Colour::Yellow.bold(), text)
    }

    pub fn error(&mut self, text: impl Display) -> io::Result<()> {
        self.line(Colour::Red.bold(), text)
    }

    fn paint(&self, colour: Colour, text: &str) -> String {
        if self.color {
            colour.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Prints `bytes` in rows of 16, hex grouped by two and an ASCII column.
    /// Rows are labelled with the word address, `base` being the first word.
    /// The last row is padded with dashes.
    pub fn hexdump(&mut self, base: u16, bytes: &[u8]) -> io::Result<()> {
        for (row_index, row) in bytes.chunks(BYTES_PER_ROW).enumerate() {
            let address = usize::from(base) + row_index * BYTES_PER_ROW / 2;
            let mut text = format!("|{}|", self.paint(GRAY, &format!("{address:04x}")));
            for column in 0..BYTES_PER_ROW {
                if column % GROUPING == 0 {
                    text.push(' ');
                }
                text += &match row.get(column) {
                    Some(&byte) => self.paint(byte_colour(byte), &format!("{byte:02X}")),
                    None => self.paint(Colour::Red, "--"),
                };
            }
            text.push_str(" |");
            for column in 0..BYTES_PER_ROW {
                if column != 0 && column % 8 == 0 {
                    text.push(' ');
                }
                text += &match row.get(column) {
                    Some(&byte) => self.paint(byte_colour(byte), &printable(byte).to_string()),
                    None => self.paint(Colour::Red, "-"),
                };
            }
            text.push('|');
            writeln!(self.out, "{text}")?;
        }
        Ok(())
    }
}

const fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

const fn byte_colour(byte: u8) -> Colour {
    match byte {
        b'A'..=b'z' => Colour::Yellow,
        b'!'..=b'~' => Colour::Cyan,
        b'\n' | b'\r' => Colour::Green,
        0x07 | 0x08 | 0x0C | 0x1B => Colour::Red,
        0xFF => Colour::Purple,
        _ => GRAY,
    }
}
