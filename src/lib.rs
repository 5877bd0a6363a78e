//! # LC-3 Monitor.
//!
//! `lc3-monitor` is an interactive debugger for a cycle-stepped LC-3 hardware
//! model. It loads program images into the model's memory, emulates the serial
//! console, the keyboard interrupt and memory around it, and offers a shell to
//! step cycles or instructions, inspect registers and memory, and set breakpoints.
//!
//!  # Example
//! ```
//! use lc3_monitor::debugger::instruction::Instruction;
//! assert_eq!(Instruction::from(0x0FFF).to_string(), "BR (nzp) PCoffset9=-1");
//! assert_eq!(Instruction::from(0xF025).to_string(), "TRAP vec=x25 (HALT)");
//! ```
//! # Errors
//! - Image files that cannot be opened or lack the 2 byte origin header
//! - No hardware model linked into the build, see the `verilated` feature

pub mod config;
pub mod debugger;
pub mod errors;
pub mod hardware;
pub(crate) mod numbers;
pub mod shell;
pub mod terminal;
