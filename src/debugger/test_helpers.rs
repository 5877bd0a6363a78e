use crate::debugger::run::CancellationToken;
use crate::debugger::{Machine, MachineConfig};
use crate::hardware::uart::UartTiming;
use crate::hardware::uart::tests::frame;
use crate::hardware::{
    DebugLines, HardwareModel, Image, InputLines, KeyboardInputProvider, Memory, MemoryPort,
    MemoryRequest,
};
use crate::shell::LineSource;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::io::Write;
use std::rc::Rc;

pub struct StringWriter {
    vec: Vec<u8>,
}
impl Write for StringWriter {
    fn write(&mut self, data: &[u8]) -> Result<usize, io::Error> {
        self.vec.write(data)
    }
    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}
impl StringWriter {
    pub fn new() -> Self {
        let vec = Vec::<u8>::with_capacity(120);
        Self { vec }
    }
    pub fn get_string(&self) -> String {
        String::from_utf8(self.vec.clone()).unwrap()
    }
}

/// What the fake core and its peripherals observed, shared with the test.
#[derive(Default)]
pub struct Probe {
    pub inputs: InputLines,
    pub evaluations: u64,
    pub reset_edges: u64,
    pub traced: Vec<u64>,
    pub acknowledged: Vec<u16>,
    pub keys: VecDeque<u8>,
    pub polls: u64,
    /// Cancels the token on the given keyboard poll, like CTRL-C typed in raw mode.
    pub cancel_on_poll: Option<(u64, CancellationToken)>,
    pub console: Vec<u8>,
}
impl Probe {
    pub fn console_text(&self) -> String {
        String::from_utf8(self.console.clone()).unwrap()
    }
}

pub type SharedProbe = Rc<RefCell<Probe>>;

/// A micro-sequencer stand-in: every instruction walks uPC 18, 33, 28, 30, 32
/// and back to 18, one state per rising edge. Fetch reads through the memory
/// hook, execute knows two opcodes: `TRAP x25` halts and `0111` stores
/// `store_on_execute`.
pub struct FakeCore {
    pub inputs: InputLines,
    pub lines: DebugLines,
    pub store_on_execute: Option<(u16, u16)>,
    serial: VecDeque<bool>,
    probe: Option<SharedProbe>,
}

impl FakeCore {
    pub const CYCLES_PER_INSTRUCTION: u64 = 5;

    pub fn new() -> Self {
        Self {
            inputs: InputLines::default(),
            lines: DebugLines::default(),
            store_on_execute: None,
            serial: VecDeque::new(),
            probe: None,
        }
    }

    /// Queues serial frames shifted out on the transmit line, one level per cycle.
    pub fn queue_serial(&mut self, timing: UartTiming, bytes: &[u8]) {
        for &byte in bytes {
            self.serial.extend(frame(timing, byte));
        }
    }

    fn rising_edge(&mut self, memory: &mut dyn MemoryPort) {
        if self.inputs.reset {
            self.lines.pc = self.inputs.reset_vector;
            self.lines.micro_pc = 18;
            self.lines.ir = 0;
            self.lines.halt = false;
            return;
        }
        if self.inputs.int_ack_clear {
            self.lines.int_ack = false;
        } else if self.inputs.device_ready && !self.lines.int_ack {
            self.lines.int_ack = true;
            if let Some(probe) = &self.probe {
                probe.borrow_mut().acknowledged.push(self.inputs.int_data);
            }
        }
        self.lines.uart_txd = self.serial.pop_front().unwrap_or(true);
        if self.lines.halt {
            return;
        }
        self.lines.micro_pc = match self.lines.micro_pc {
            18 => {
                self.lines.mar = self.lines.pc;
                self.lines.mdr = memory
                    .access(MemoryRequest {
                        enable: true,
                        address: self.lines.pc,
                        ..MemoryRequest::default()
                    })
                    .data_out;
                self.lines.pc = self.lines.pc.wrapping_add(1);
                33
            }
            33 => 28,
            28 => {
                self.lines.ir = self.lines.mdr;
                30
            }
            30 => 32,
            _ => {
                self.execute(memory);
                18
            }
        };
    }

    fn execute(&mut self, memory: &mut dyn MemoryPort) {
        match self.lines.ir >> 12 {
            0xF if self.lines.ir & 0xFF == 0x25 => self.lines.halt = true,
            0x7 => {
                if let Some((address, data_in)) = self.store_on_execute {
                    memory.access(MemoryRequest {
                        enable: true,
                        write_enable: true,
                        address,
                        data_in,
                    });
                }
            }
            _ => {}
        }
    }
}

impl HardwareModel for FakeCore {
    fn inputs_mut(&mut self) -> &mut InputLines {
        &mut self.inputs
    }
    fn outputs(&self) -> &DebugLines {
        &self.lines
    }
    fn evaluate(&mut self, memory: &mut dyn MemoryPort) {
        if let Some(probe) = &self.probe {
            let mut probe = probe.borrow_mut();
            probe.evaluations += 1;
            probe.inputs = self.inputs;
            if self.inputs.clock && self.inputs.reset {
                probe.reset_edges += 1;
            }
        }
        if self.inputs.clock {
            self.rising_edge(memory);
        }
    }
    fn dump_trace(&mut self, time: u64) {
        if let Some(probe) = &self.probe {
            probe.borrow_mut().traced.push(time);
        }
    }
}

pub struct ScriptedKeyboard {
    probe: SharedProbe,
}
impl KeyboardInputProvider for ScriptedKeyboard {
    fn poll_character(&mut self) -> io::Result<Option<u8>> {
        let mut probe = self.probe.borrow_mut();
        probe.polls += 1;
        if let Some((poll, token)) = &probe.cancel_on_poll
            && *poll == probe.polls
        {
            token.cancel();
        }
        Ok(probe.keys.pop_front())
    }
}

pub struct ProbeConsole {
    probe: SharedProbe,
}
impl Write for ProbeConsole {
    fn write(&mut self, data: &[u8]) -> Result<usize, io::Error> {
        self.probe.borrow_mut().console.write(data)
    }
    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}

/// Image bytes: big-endian origin followed by big-endian words.
pub fn program(origin: u16, words: &[u16]) -> Image {
    let bytes = std::iter::once(origin)
        .chain(words.iter().copied())
        .flat_map(u16::to_be_bytes)
        .collect();
    Image::from_bytes("test.obj", bytes)
}

pub fn machine_with(core: FakeCore, image: &Image) -> (Machine, SharedProbe) {
    machine_with_config(core, image, MachineConfig::default())
}

pub fn machine_with_config(
    mut core: FakeCore,
    image: &Image,
    config: MachineConfig,
) -> (Machine, SharedProbe) {
    let probe = SharedProbe::default();
    core.probe = Some(Rc::clone(&probe));
    let memory = Memory::load(image, None).unwrap();
    let machine = Machine::new(
        Box::new(core),
        memory,
        config,
        Box::new(ScriptedKeyboard {
            probe: Rc::clone(&probe),
        }),
        Box::new(ProbeConsole {
            probe: Rc::clone(&probe),
        }),
    );
    (machine, probe)
}

/// A machine fresh out of reset running `words` from x3000.
pub fn reset_machine(words: &[u16]) -> (Machine, SharedProbe) {
    let (mut machine, probe) = machine_with(FakeCore::new(), &program(0x3000, words));
    machine.reset().unwrap();
    (machine, probe)
}

/// Feeds prepared lines to the shell, `None` entries simulate CTRL-C at the prompt.
pub struct ScriptedLines {
    lines: VecDeque<Option<String>>,
    pub history: Vec<String>,
}
impl ScriptedLines {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|line| Some((*line).to_string())).collect(),
            history: Vec::new(),
        }
    }
    pub fn with_interrupt_after(mut self, count: usize) -> Self {
        self.lines.insert(count, None);
        self
    }
}
impl LineSource for ScriptedLines {
    fn read_line(&mut self, _prompt: &str) -> io::Result<crate::shell::ReadOutcome> {
        use crate::shell::ReadOutcome;
        Ok(match self.lines.pop_front() {
            Some(Some(line)) => ReadOutcome::Line(line),
            Some(None) => ReadOutcome::Interrupted,
            None => ReadOutcome::Eof,
        })
    }
    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}
