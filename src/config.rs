use crate::debugger::MachineConfig;
use clap::Parser;
use std::path::PathBuf;

/// Interactive debugger for the iit3503 LC-3 hardware model
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Options {
    /// Start the debug shell immediately instead of running the program first
    #[arg(short, long)]
    pub interactive: bool,

    /// User program image
    #[arg(short, long, value_name = "PATH")]
    pub binary: PathBuf,

    /// OS image; without it the program runs in supervisor mode
    #[arg(short, long, value_name = "PATH")]
    pub os_image: Option<PathBuf>,

    /// Write a waveform file
    #[arg(short, long, value_name = "PATH")]
    pub trace: Option<PathBuf>,

    /// Quit the simulator when the machine halts
    #[arg(short = 'q', long)]
    pub haltquit: bool,

    /// Keep the shell history in this file
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,
}

impl Options {
    #[must_use]
    pub const fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            halt_on_stop: self.haltquit,
            trace_enabled: self.trace.is_some(),
        }
    }
}
