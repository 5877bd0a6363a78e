use displaydoc::Display;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading a binary image into memory.
#[derive(Display, Error, Debug)]
pub enum LoadImageError {
    /// Could not open image file '{path}': {source}
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Image '{path}' is missing its 2 byte origin header
    MissingOrigin { path: PathBuf },
}

/// Access outside of the memory array.
#[derive(Display, Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Address {address:#06x} is out of range, memory holds {size:#x} words
    OutOfRange { address: usize, size: usize },
}

/// Rejected breakpoint index updates.
#[derive(Display, Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointError {
    /// Breakpoint at x{0:04x} already exists
    AlreadySet(u16),
    /// No breakpoint at x{0:04x}
    NotSet(u16),
}

/// Failures of the step engine or its collaborators.
#[derive(Display, Error, Debug)]
pub enum MachineError {
    /// No hardware model is linked into this build, enable the `verilated` feature
    ModelUnavailable,
    /// Hardware model failure: {0}
    Model(String),
    /// Could not write serial output to the console: {0}
    Console(#[source] io::Error),
}

/// Failures of a single shell command, the session continues after reporting them.
#[derive(Display, Error, Debug)]
pub enum CommandError {
    /// '{0}' is not a valid positive hexadecimal integer
    InvalidHex(String),
    /// '{0}' is not a valid positive decimal integer
    InvalidDec(String),
    /// Address x{0:x} is out of range
    AddressOutOfRange(usize),
    /// Byte value x{0:x} is out of range
    ByteOutOfRange(usize),
    /// Interrupt vector x{0:x} is out of range
    VectorOutOfRange(usize),
    /// Priority {0} is out of range, expected 0 to 7
    PriorityOutOfRange(usize),
    /// Interrupt data x{0:x} does not fit into 16 bits
    DataOutOfRange(usize),
    /// {0}
    Breakpoint(#[from] BreakpointError),
    /// {0}
    Machine(#[from] MachineError),
    /// {0}
    Io(#[from] io::Error),
}

impl CommandError {
    /// Malformed input, answered with the command's usage line.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::InvalidHex(_) | Self::InvalidDec(_))
    }
}

/// Fatal start-up and session errors reported by the binary.
#[derive(Display, Error, Debug)]
pub enum MonitorError {
    /// {0}
    LoadImage(#[from] LoadImageError),
    /// {0}
    Machine(#[from] MachineError),
    /// Could not initialize the command line editor: {0}
    LineEditor(String),
    /// Could not register the CTRL+C handler: {0}
    SignalHandler(#[from] ctrlc::Error),
    /// Shell I/O failed: {0}
    Io(#[from] io::Error),
}
