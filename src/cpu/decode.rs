//! Instruction codec.
//!
//! Every instruction occupies two bytes. The upper byte lives in the lower
//! ROM bank and the payload byte at the same address in the upper bank:
//!
//! ```text
//!   upper byte:  7 6 5 4 | 3 2 | 1 | 0
//!                opcode  | reg | c | 0
//!   lower byte:  payload (address or immediate value)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the four general-purpose registers.
///
/// By microcode convention R1 and R2 are the ALU operands and R3 receives
/// the ALU result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Register {
    #[default]
    R1 = 0,
    R2 = 1,
    R3 = 2,
    R4 = 3,
}

impl Register {
    pub const ALL: [Register; 4] = [Register::R1, Register::R2, Register::R3, Register::R4];

    /// Create from the 2-bit register field.
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0b11) as usize]
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index() + 1)
    }
}

/// Execution condition of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Condition {
    /// Always execute.
    #[default]
    NoCondition = 0,
    /// Execute only while the latched overflow flag is set.
    AluOverflow = 1,
}

impl Condition {
    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            Condition::NoCondition
        } else {
            Condition::AluOverflow
        }
    }
}

/// The operation encoded in the opcode nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operation {
    NoOp = 0,
    /// `[payload] := reg`
    Store = 1,
    /// `reg := [payload]`
    Load = 2,
    /// `reg := payload`
    LoadImmediate = 3,
    /// `R2 := [payload]; R3 := R1 + R2`
    Add = 4,
    /// `R2 := payload; R3 := R1 + R2`
    AddImmediate = 5,
    /// `R2 := [payload]; R3 := R1 - R2`
    Sub = 6,
    /// `R2 := payload; R3 := R1 - R2`
    SubImmediate = 7,
    /// `PC := [payload]`
    Jump = 8,
    /// `PC := payload`
    JumpImmediate = 9,
    /// `display := reg`
    Out = 10,
    Halt = 15,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::NoOp,
        Operation::Store,
        Operation::Load,
        Operation::LoadImmediate,
        Operation::Add,
        Operation::AddImmediate,
        Operation::Sub,
        Operation::SubImmediate,
        Operation::Jump,
        Operation::JumpImmediate,
        Operation::Out,
        Operation::Halt,
    ];

    /// Look up the operation for a 4-bit opcode. Codes 11-14 are reserved.
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.opcode() == opcode)
    }

    #[inline]
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Whether the instruction names a register.
    pub const fn uses_register(self) -> bool {
        matches!(
            self,
            Operation::Store | Operation::Load | Operation::LoadImmediate | Operation::Out
        )
    }

    /// Whether the instruction reads a payload byte from the upper ROM bank.
    pub const fn has_payload(self) -> bool {
        matches!(
            self,
            Operation::Store
                | Operation::Load
                | Operation::LoadImmediate
                | Operation::Add
                | Operation::AddImmediate
                | Operation::Sub
                | Operation::SubImmediate
                | Operation::Jump
                | Operation::JumpImmediate
        )
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Operation::NoOp => "NOP",
            Operation::Store => "STO",
            Operation::Load => "LD",
            Operation::LoadImmediate => "LDI",
            Operation::Add => "ADD",
            Operation::AddImmediate => "ADDI",
            Operation::Sub => "SUB",
            Operation::SubImmediate => "SUBI",
            Operation::Jump => "JMP",
            Operation::JumpImmediate => "JMPI",
            Operation::Out => "OUT",
            Operation::Halt => "HLT",
        }
    }
}

/// A decoded instruction.
///
/// The register field is always carried, R1 (bits `00`) when the operation
/// names none. `payload` is always stored (as 0 for operations that do not
/// read it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub operation: Operation,
    pub register: Register,
    pub condition: Condition,
    pub payload: u8,
}

impl Instruction {
    /// Build an instruction. A missing register encodes as R1.
    pub fn new(operation: Operation, register: Option<Register>, condition: Condition, payload: u8) -> Self {
        Self {
            operation,
            register: register.unwrap_or_default(),
            condition,
            payload,
        }
    }

    /// Whether `Display` shows the register field.
    fn shows_register(&self) -> bool {
        self.operation.uses_register() || self.register != Register::R1
    }

    /// Upper byte: opcode, register and condition fields.
    pub fn upper_byte(&self) -> u8 {
        let op = (self.operation.opcode() << 4) & 0b1111_0000;
        let reg = ((self.register as u8) << 2) & 0b0000_1100;
        let cond = ((self.condition as u8) << 1) & 0b0000_0010;
        op | reg | cond
    }

    /// Lower byte: the payload.
    #[inline]
    pub fn lower_byte(&self) -> u8 {
        self.payload
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation.mnemonic())?;
        let shows_register = self.shows_register();
        if shows_register {
            write!(f, " {}", self.register)?;
        }
        if self.operation.has_payload() {
            let sep = if shows_register { "," } else { "" };
            match self.operation {
                Operation::Store | Operation::Load | Operation::Add | Operation::Sub | Operation::Jump => {
                    write!(f, "{} [{}]", sep, self.payload)?
                }
                _ => write!(f, "{} {}", sep, self.payload)?,
            }
        }
        if self.condition == Condition::AluOverflow {
            f.write_str(" ?OVF")?;
        }
        Ok(())
    }
}

/// Encode an instruction as its (upper, lower) byte pair.
pub fn encode(instr: &Instruction) -> (u8, u8) {
    (instr.upper_byte(), instr.lower_byte())
}

/// Decode an (upper, lower) byte pair.
///
/// Register and condition bits always decode, even for operations that
/// ignore them; only the opcode nibble can be invalid.
pub fn decode(upper: u8, lower: u8) -> Result<Instruction, DecodeError> {
    let opcode = (upper & 0xf0) >> 4;
    let operation = Operation::from_opcode(opcode).ok_or(DecodeError::InvalidMachineCode(opcode))?;
    let register = Register::from_bits((upper & 0b0000_1100) >> 2);
    let condition = Condition::from_bit((upper & 0b0000_0010) >> 1);

    Ok(Instruction {
        operation,
        register,
        condition,
        payload: lower,
    })
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid machine code: opcode {0} is reserved")]
    InvalidMachineCode(u8),
}
