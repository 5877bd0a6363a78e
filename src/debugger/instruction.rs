use crate::hardware::{DebugLines, Memory};
use crate::numbers;
use std::fmt::{Debug, Display, Formatter};

/// Micro-state at which a new instruction starts.
pub const FETCH_BOUNDARY: u8 = 18;
/// Micro-states during which the IR still holds the previous instruction.
const IR_NOT_LATCHED: [u8; 4] = [18, 33, 28, 30];

/// The 16 opcodes selected by bits `[15:12]`.
#[repr(u8)]
#[derive(enumn::N, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Br = 0b0000,
    Add = 0b0001,
    Ld = 0b0010,
    St = 0b0011,
    Jsr = 0b0100,
    And = 0b0101,
    Ldr = 0b0110,
    Str = 0b0111,
    Rti = 0b1000,
    Not = 0b1001,
    Ldi = 0b1010,
    Sti = 0b1011,
    Jmp = 0b1100,
    Reserved = 0b1101,
    Lea = 0b1110,
    Trap = 0b1111,
}

/// Service routines with a known trap vector.
#[repr(u8)]
#[derive(enumn::N, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapVector {
    Getc = 0x20,
    Out = 0x21,
    Puts = 0x22,
    In = 0x23,
    Putsp = 0x24,
    Halt = 0x25,
}

impl TrapVector {
    const fn mnemonic(self) -> &'static str {
        match self {
            Self::Getc => "GETC",
            Self::Out => "OUT",
            Self::Puts => "PUTS",
            Self::In => "IN",
            Self::Putsp => "PUTSP",
            Self::Halt => "HALT",
        }
    }
}

/// Wrapper for an LC-3 u16 instruction word.
/// format is: `OOOO_DDD_S_SSSS_SSSS`
///
/// [`Display`] renders the disassembly, e.g. `ADD DR=R1, SR1=R2, imm5=-3`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    /// Gives the value of only the specified bit range.
    ///
    /// # Parameters
    /// - `from`: starting index
    /// - `to`: end index (inclusive), must be greater or equal to `from`
    ///
    /// # Panics
    /// - asserts that to is greater or equal from and both are valid indexes
    #[must_use]
    pub fn get_bit_range(self, from: u8, to: u8) -> u16 {
        debug_assert!(
            to >= from,
            "wrong direction of from: {from:?} and to: {to:?}"
        );
        debug_assert!(
            u32::from(to) < u16::BITS,
            "index: {to:?} to u16 is greater than maximum value {:?}",
            u16::BITS - 1
        );
        (self.0 >> from) & (((1u32 << (to - from + 1)) - 1) as u16)
    }
    #[must_use]
    pub fn get_bit(self, index: u8) -> bool {
        self.get_bit_range(index, index) == 1
    }
    #[must_use]
    pub fn op_code(self) -> Opcode {
        #[expect(clippy::cast_possible_truncation, reason = "4 bit field")]
        let bits = self.get_bit_range(12, 15) as u8;
        Opcode::n(bits).unwrap_or_else(|| unreachable!("every 4 bit value is an opcode"))
    }
    /// Register number in bits `[11:9]`, DR or SR depending on the opcode.
    #[must_use]
    pub fn dr_number(self) -> u16 {
        self.get_bit_range(9, 11)
    }
    /// Register number in bits `[8:6]`, SR1 or BaseR depending on the opcode.
    #[must_use]
    pub fn sr1_number(self) -> u16 {
        self.get_bit_range(6, 8)
    }
    #[must_use]
    pub fn sr2_number(self) -> u16 {
        self.get_bit_range(0, 2)
    }
    #[must_use]
    pub fn is_immediate(self) -> bool {
        self.get_bit(5)
    }
    #[must_use]
    pub const fn get_immediate(self) -> i16 {
        numbers::sign_extend(self.0, 5)
    }
    /// Sign extended offset in the lowest `len` bits.
    #[must_use]
    pub const fn offset(self, len: u8) -> i16 {
        numbers::sign_extend(self.0, len)
    }
    #[must_use]
    pub fn trap_vector(self) -> u8 {
        self.0.to_be_bytes()[1]
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instruction({:#06x}: {self})", self.0)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let i = *self;
        let dr = i.dr_number();
        let sr1 = i.sr1_number();
        match i.op_code() {
            Opcode::Br => write!(
                f,
                "BR ({}{}{}) PCoffset9={}",
                if i.get_bit(11) { "n" } else { "" },
                if i.get_bit(10) { "z" } else { "" },
                if i.get_bit(9) { "p" } else { "" },
                i.offset(9)
            ),
            op @ (Opcode::Add | Opcode::And) => {
                let mnemonic = if op == Opcode::Add { "ADD" } else { "AND" };
                if i.is_immediate() {
                    write!(f, "{mnemonic} DR=R{dr}, SR1=R{sr1}, imm5={}", i.get_immediate())
                } else {
                    write!(f, "{mnemonic} DR=R{dr}, SR1=R{sr1}, SR2=R{}", i.sr2_number())
                }
            }
            Opcode::Ld => write!(f, "LD DR=R{dr}, PCoffset9={}", i.offset(9)),
            Opcode::Ldi => write!(f, "LDI DR=R{dr}, PCoffset9={}", i.offset(9)),
            Opcode::Lea => write!(f, "LEA DR=R{dr}, PCoffset9={}", i.offset(9)),
            Opcode::St => write!(f, "ST SR=R{dr}, PCoffset9={}", i.offset(9)),
            Opcode::Sti => write!(f, "STI SR=R{dr}, PCoffset9={}", i.offset(9)),
            Opcode::Jsr if i.get_bit(11) => write!(f, "JSR PCoffset11={}", i.offset(11)),
            Opcode::Jsr => write!(f, "JSRR BaseR=R{sr1}"),
            Opcode::Ldr => write!(f, "LDR DR=R{dr}, baseR=R{sr1}, offset6={}", i.offset(6)),
            Opcode::Str => write!(f, "STR SR=R{dr}, baseR=R{sr1}, offset6={}", i.offset(6)),
            Opcode::Rti => f.write_str("RTI"),
            Opcode::Not => write!(f, "NOT DR=R{dr}, SR=R{sr1}"),
            Opcode::Jmp if sr1 == 7 => f.write_str("RET"),
            Opcode::Jmp => write!(f, "JMP BaseR=R{sr1}"),
            Opcode::Reserved => f.write_str("Reserved opcode (1101)"),
            Opcode::Trap => {
                let vector = i.trap_vector();
                let name = TrapVector::n(vector).map_or("unknown trap", TrapVector::mnemonic);
                write!(f, "TRAP vec=x{vector:02x} ({name})")
            }
        }
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

/// The instruction at the current PC.
///
/// While the micro-sequencer is in one of the states before the IR latched, the
/// IR still holds the previous instruction, so the word is read from memory at
/// the PC instead.
#[must_use]
pub fn current_instruction(lines: &DebugLines, memory: &Memory) -> Instruction {
    if IR_NOT_LATCHED.contains(&lines.micro_pc) {
        Instruction(memory.read_word(usize::from(lines.pc)).unwrap_or_default())
    } else {
        Instruction(lines.ir)
    }
}
