//! The command registry and the handlers behind it.
use super::Shell;
use super::tokens::Tokens;
use crate::debugger::run::{RunLimit, StopReason};
use crate::errors::CommandError;
use crate::terminal;
use std::io;
use std::io::Write;

/// Whether the shell keeps reading commands after one ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Step,
    StepInstruction,
    Continue,
    Registers,
    MicroState,
    AllRegisters,
    Peek,
    Poke,
    DumpMemory,
    Quit,
    Irq,
    Print,
    BreakRemove,
    BreakList,
    Break,
}

#[derive(Debug)]
pub struct CommandDescriptor {
    pub kind: CommandKind,
    pub spellings: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        kind: CommandKind::Help,
        spellings: &["help", "?", "h"],
        usage: "",
        description: "Prints a list of the available commands",
    },
    CommandDescriptor {
        kind: CommandKind::Step,
        spellings: &["step", "s"],
        usage: "[dec n] ",
        description: "Steps the CPU by n cycles (default 1)",
    },
    CommandDescriptor {
        kind: CommandKind::StepInstruction,
        spellings: &["stepi", "si"],
        usage: "[dec n] ",
        description: "Steps the CPU by n instructions (default 1)",
    },
    CommandDescriptor {
        kind: CommandKind::Continue,
        spellings: &["continue", "c"],
        usage: "",
        description: "Continues simulation execution",
    },
    CommandDescriptor {
        kind: CommandKind::Registers,
        spellings: &["regs", "r"],
        usage: "",
        description: "Prints the values of all CPU registers",
    },
    CommandDescriptor {
        kind: CommandKind::MicroState,
        spellings: &["ustate", "u"],
        usage: "",
        description: "Prints the values of internal datapath/control registers",
    },
    CommandDescriptor {
        kind: CommandKind::AllRegisters,
        spellings: &["allregs", "ar"],
        usage: "",
        description: "Prints the values of all registers in the machine",
    },
    CommandDescriptor {
        kind: CommandKind::Peek,
        spellings: &["peek", "pk"],
        usage: "<hex16 addr> ",
        description: "Prints the word at addr",
    },
    CommandDescriptor {
        kind: CommandKind::Poke,
        spellings: &["poke", "po"],
        usage: "<hex16 addr> <hex8 value> ",
        description: "Sets the word at addr to value",
    },
    CommandDescriptor {
        kind: CommandKind::DumpMemory,
        spellings: &["dumpmem", "dm"],
        usage: "<hex16 start> <dec count> ",
        description: "Dumps count words of memory starting at start",
    },
    CommandDescriptor {
        kind: CommandKind::Quit,
        spellings: &["quit", "exit", "q"],
        usage: "",
        description: "Terminates the simulation",
    },
    CommandDescriptor {
        kind: CommandKind::Irq,
        spellings: &["irq"],
        usage: "<hex8 vector> <dec priority> <hex16 data> ",
        description: "Raises the specified IRQ",
    },
    CommandDescriptor {
        kind: CommandKind::Print,
        spellings: &["pr", "print"],
        usage: "",
        description: "Prints the current instruction",
    },
    CommandDescriptor {
        kind: CommandKind::BreakRemove,
        spellings: &["break-rm", "b-rm"],
        usage: "<hex16 addr> ",
        description: "Removes a breakpoint at addr",
    },
    CommandDescriptor {
        kind: CommandKind::BreakList,
        spellings: &["break-list", "b-list"],
        usage: "",
        description: "Lists all active breakpoints",
    },
    CommandDescriptor {
        kind: CommandKind::Break,
        spellings: &["break", "b"],
        usage: "<hex16 addr> ",
        description: "Sets a breakpoint at addr",
    },
];

/// The command with the exact `spelling`.
#[must_use]
pub fn lookup(spelling: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS
        .iter()
        .find(|command| command.spellings.contains(&spelling))
}

/// All spellings, for line completion.
pub fn spellings() -> impl Iterator<Item = &'static str> {
    COMMANDS
        .iter()
        .flat_map(|command| command.spellings.iter().copied())
}

const MAX_PRIORITY: u8 = 7;

impl<W: Write> Shell<W> {
    pub(super) fn execute(
        &mut self,
        kind: CommandKind,
        args: &mut Tokens<'_>,
    ) -> Result<Flow, CommandError> {
        match kind {
            CommandKind::Help => self.help()?,
            CommandKind::Step => {
                let count = args.next_count(1)?;
                return self.run_loop(RunLimit::Cycles(count as u64));
            }
            CommandKind::StepInstruction => {
                let count = args.next_count(1)?;
                return self.run_loop(RunLimit::Instructions(count as u64));
            }
            CommandKind::Continue => return self.run_loop(RunLimit::Unbounded),
            CommandKind::Registers => self.registers()?,
            CommandKind::MicroState => self.micro_state()?,
            CommandKind::AllRegisters => {
                self.registers()?;
                self.printer.info("==============================")?;
                self.micro_state()?;
            }
            CommandKind::Peek => self.peek(args)?,
            CommandKind::Poke => self.poke(args)?,
            CommandKind::DumpMemory => self.dump_memory(args)?,
            CommandKind::Quit => {
                self.printer.info("  Quitting. Goodbye.")?;
                return Ok(Flow::Quit);
            }
            CommandKind::Irq => self.irq(args)?,
            CommandKind::Print => {
                let pc = self.machine.lines().pc;
                let instruction = self.machine.current_instruction();
                self.printer.info(format!("  x{pc:04x}: {instruction}"))?;
            }
            CommandKind::BreakRemove => {
                let address = args.next_address()?;
                self.breakpoints.remove(address)?;
                self.printer
                    .info(format!("  Breakpoint at x{address:04x} removed"))?;
            }
            CommandKind::BreakList => {
                self.printer.info("Breakpoint List:")?;
                let addresses: Vec<u16> = self.breakpoints.iter().collect();
                for (index, address) in addresses.into_iter().enumerate() {
                    self.printer.info(format!("  {index}: x{address:04x}"))?;
                }
            }
            CommandKind::Break => {
                let address = args.next_address()?;
                self.breakpoints.insert(address)?;
                self.printer
                    .info(format!("  Breakpoint set at x{address:04x}"))?;
            }
        }
        Ok(Flow::Continue)
    }

    fn help(&mut self) -> io::Result<()> {
        for command in COMMANDS {
            self.printer.info(format!(
                "  {}  {}-- {}",
                command.spellings.join(" or "),
                command.usage,
                command.description
            ))?;
        }
        Ok(())
    }

    /// Runs the machine with the terminal in raw mode, then reports where it stopped.
    pub(super) fn run_loop(&mut self, limit: RunLimit) -> Result<Flow, CommandError> {
        let reason = {
            let _raw = self
                .raw_mode
                .then(|| terminal::set_terminal_raw(io::stdout()));
            self.machine
                .run(limit, &mut self.breakpoints, &self.cancel)?
        };
        match reason {
            StopReason::Completed => {}
            StopReason::Breakpoint(address) => self
                .printer
                .info(format!("Breakpoint at x{address:04x} reached"))?,
            StopReason::Halted => self.printer.info("Machine halted.")?,
            StopReason::Exit => {
                self.printer.info("Machine halted.")?;
                self.printer.info("  Quitting. Goodbye.")?;
                return Ok(Flow::Quit);
            }
            StopReason::Interrupted => self.printer.warn("Execution interrupted by CTRL+C!")?,
        }
        self.print_pc_update()?;
        Ok(Flow::Continue)
    }

    fn print_pc_update(&mut self) -> io::Result<()> {
        let lines = *self.machine.lines();
        let instruction = self.machine.current_instruction();
        self.printer
            .info(format!("  Cycles elapsed: {}", self.machine.cycles()))?;
        self.printer
            .info(format!("  uPC now at {}", lines.micro_pc))?;
        self.printer
            .info(format!("  PC now at x{:04x}: {instruction}", lines.pc))
    }

    fn registers(&mut self) -> io::Result<()> {
        let lines = *self.machine.lines();
        let psr = lines.psr;
        self.printer.info(format!("PC -> x{:04x}", lines.pc))?;
        self.printer.info(format!(
            "PSR -> x{psr:04x}: CC -> [N={}; Z={}; P={}] Priv -> {:x} Priority=x{:x}",
            (psr >> 2) & 1,
            (psr >> 1) & 1,
            psr & 1,
            (psr >> 15) & 1,
            (psr >> 8) & 0x7,
        ))?;
        for (index, values) in lines.registers.chunks(2).enumerate() {
            self.printer.info(format!(
                "R{} -> x{:04x}  ;  R{} -> x{:04x}",
                2 * index,
                values[0],
                2 * index + 1,
                values[1]
            ))?;
        }
        Ok(())
    }

    fn micro_state(&mut self) -> io::Result<()> {
        let lines = *self.machine.lines();
        self.printer
            .info(format!("Bus Output -> x{:04x}", lines.bus))?;
        self.printer
            .info(format!("IR         -> x{:04x}", lines.ir))?;
        self.printer
            .info(format!("uPC        -> {}", lines.micro_pc))?;
        self.printer.info(format!(
            "MAR -> x{:04x}  ;  MDR -> x{:04x}",
            lines.mar, lines.mdr
        ))?;
        self.printer.info(format!(
            "DSR -> x{:04x}  ;  DDR -> x{:04x}",
            lines.dsr, lines.ddr
        ))?;
        self.printer.info(format!("MCR -> x{:04x}", lines.mcr))
    }

    fn peek(&mut self, args: &mut Tokens<'_>) -> Result<(), CommandError> {
        let address = args.next_address()?;
        let word = self
            .machine
            .memory()
            .read_word(usize::from(address))
            .map_err(|_| CommandError::AddressOutOfRange(usize::from(address)))?;
        self.printer
            .info(format!("  x{address:04x}: x{word:04x}"))?;
        Ok(())
    }

    fn poke(&mut self, args: &mut Tokens<'_>) -> Result<(), CommandError> {
        let address = args.next_address()?;
        let value = args.next_hex()?;
        let byte = u8::try_from(value).map_err(|_| CommandError::ByteOutOfRange(value))?;
        self.machine
            .memory_mut()
            .write_word(usize::from(address), u16::from(byte))
            .map_err(|_| CommandError::AddressOutOfRange(usize::from(address)))?;
        Ok(())
    }

    fn dump_memory(&mut self, args: &mut Tokens<'_>) -> Result<(), CommandError> {
        let start = args.next_address()?;
        let count = args.next_dec()?;
        let words = self.machine.memory().words(usize::from(start), count);
        if words.len() < count {
            self.printer.warn(format!(
                "  Only {} words left from x{start:04x}, dump clamped",
                words.len()
            ))?;
        }
        let bytes: Vec<u8> = words.iter().copied().flat_map(u16::to_be_bytes).collect();
        self.printer.hexdump(start, &bytes)?;
        Ok(())
    }

    fn irq(&mut self, args: &mut Tokens<'_>) -> Result<(), CommandError> {
        let vector = args.next_hex()?;
        let priority = args.next_dec()?;
        let data = args.next_hex()?;
        let data = u16::try_from(data).map_err(|_| CommandError::DataOutOfRange(data))?;
        let vector = u8::try_from(vector).map_err(|_| CommandError::VectorOutOfRange(vector))?;
        let priority = u8::try_from(priority)
            .ok()
            .filter(|level| *level <= MAX_PRIORITY)
            .ok_or(CommandError::PriorityOutOfRange(priority))?;
        self.printer.info(format!(
            "Raising IRQ: x{vector:02x}, Priority={priority}, Data=x{data:04x}"
        ))?;
        self.machine.raise_interrupt(vector, priority, data);
        Ok(())
    }
}
