//! The step engine: drives the hardware model one clock edge at a time and
//! services its peripherals.
pub mod breakpoints;
pub mod instruction;
pub mod run;
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::errors::MachineError;
use crate::hardware::{
    DebugLines, HardwareModel, InterruptController, KeyboardInputProvider, Memory, UartReceiver,
};
use instruction::{FETCH_BOUNDARY, Instruction};
use run::{CancellationToken, StopReason};
use std::io::Write;

/// Number of cycles reset is held.
pub const RESET_CYCLES: usize = 5;

/// Behaviour switches taken from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineConfig {
    /// End the session as soon as the machine halts.
    pub halt_on_stop: bool,
    /// Hand every half edge to the model's waveform sink.
    pub trace_enabled: bool,
}

/// Result of driving the model through a clock period or an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
    /// Halted with halt-on-stop configured, the session has to end.
    Exit,
}

/// The machine state: counters, memory, the model handle and the peripherals
/// emulated around it.
pub struct Machine {
    model: Box<dyn HardwareModel>,
    memory: Memory,
    config: MachineConfig,
    cycles: u64,
    time: u64,
    uart: UartReceiver,
    interrupts: InterruptController,
    keyboard: Box<dyn KeyboardInputProvider>,
    console: Box<dyn Write>,
}

impl Machine {
    /// Wires the model to the memory and peripherals and presents the memory's
    /// entry point on the reset vector lines.
    pub fn new(
        mut model: Box<dyn HardwareModel>,
        memory: Memory,
        config: MachineConfig,
        keyboard: Box<dyn KeyboardInputProvider>,
        console: Box<dyn Write>,
    ) -> Self {
        model.inputs_mut().reset_vector = memory.entry_point();
        if config.trace_enabled {
            log::info!("Enabling timing output.");
        }
        Self {
            model,
            memory,
            config,
            cycles: 0,
            time: 0,
            uart: UartReceiver::default(),
            interrupts: InterruptController::default(),
            keyboard,
            console,
        }
    }

    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }
    #[must_use]
    pub fn lines(&self) -> &DebugLines {
        self.model.outputs()
    }
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }
    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// The instruction at the current PC, see [`instruction::current_instruction`].
    #[must_use]
    pub fn current_instruction(&self) -> Instruction {
        instruction::current_instruction(self.model.outputs(), &self.memory)
    }

    /// True when a new instruction starts with the next cycle.
    #[must_use]
    pub fn at_fetch_boundary(&self) -> bool {
        self.model.outputs().micro_pc == FETCH_BOUNDARY
    }

    pub const fn raise_interrupt(&mut self, vector: u8, priority: u8, data: u16) {
        self.interrupts.raise(vector, priority, data);
    }

    /// Drives one full clock period.
    ///
    /// Outside of reset the serial line of the previous cycle is fed to the
    /// UART receiver and the keyboard is polled. Pending interrupt lines are
    /// driven, then the model is evaluated with clock high and clock low.
    ///
    /// # Errors
    /// - A received serial byte cannot be written to the console
    pub fn step_cycle(&mut self, is_reset: bool) -> Result<Status, MachineError> {
        if !is_reset {
            if let Some(byte) = self.uart.tick(self.model.outputs().uart_txd) {
                self.console
                    .write_all(&[byte])
                    .and_then(|()| self.console.flush())
                    .map_err(MachineError::Console)?;
            }
            match self.keyboard.poll_character() {
                Ok(Some(character)) => self.interrupts.raise_keyboard(character),
                Ok(None) => {}
                Err(e) => log::debug!("Keyboard poll failed: {e}"),
            }
        }
        if self.model.outputs().int_ack {
            self.interrupts.acknowledge();
        }
        self.interrupts.drive(self.model.inputs_mut());

        for clock in [true, false] {
            self.model.inputs_mut().clock = clock;
            self.model.evaluate(&mut self.memory);
            if self.config.trace_enabled {
                self.model.dump_trace(self.time);
            }
            self.time += 1;
        }
        self.cycles += 1;

        if is_reset || !self.model.outputs().halt {
            return Ok(Status::Running);
        }
        log::info!("Machine halted after {} cycles", self.cycles);
        Ok(if self.config.halt_on_stop {
            Status::Exit
        } else {
            Status::Halted
        })
    }

    /// Steps cycles until the micro-sequencer returns to the fetch boundary.
    ///
    /// `cancel` is checked before every cycle. Returns `None` once the
    /// instruction completed, otherwise why it stopped early.
    ///
    /// # Errors
    /// - See [`Machine::step_cycle`]
    pub fn step_instr(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<StopReason>, MachineError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(Some(StopReason::Interrupted));
            }
            let status = self.step_cycle(false)?;
            if status != Status::Running {
                return Ok(run::stop_reason(status));
            }
            if self.at_fetch_boundary() {
                return Ok(None);
            }
        }
    }

    /// Holds reset for [`RESET_CYCLES`] cycles without serial or keyboard feed.
    ///
    /// # Errors
    /// - See [`Machine::step_cycle`]
    pub fn reset(&mut self) -> Result<(), MachineError> {
        log::info!("Reset.");
        self.model.inputs_mut().reset = true;
        for _ in 0..RESET_CYCLES {
            self.step_cycle(true)?;
        }
        self.model.inputs_mut().reset = false;
        Ok(())
    }
}
