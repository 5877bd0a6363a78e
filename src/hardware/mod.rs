//! The hardware model contract and the peripherals emulated around it.
pub mod model;
pub mod interrupt;
pub mod keyboard;
pub mod memory;
pub mod uart;
#[cfg(feature = "verilated")]
pub mod verilated;

pub use model::{DebugLines, HardwareModel, InputLines, MemoryPort, MemoryRequest, MemoryResponse};
pub use interrupt::InterruptController;
pub use keyboard::{
    KeyboardInputProvider, NoKeyboard, ReaderInputProvider, TerminalInputProvider,
};
pub use memory::{Image, Memory};
pub use uart::{UartReceiver, UartTiming};
