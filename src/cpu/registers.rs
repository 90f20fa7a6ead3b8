//! Register file and flags.
//!
//! The breadboard has:
//! - R1-R4: four 8-bit general-purpose registers
//! - PC: 8-bit program counter (one count per two-byte instruction)
//! - IR: 8-bit instruction register (holds the upper instruction byte)
//! - DO: 8-bit decimal output register driving the 7-segment display
//! - Flags: overflow and zero, latched from the ALU

use crate::cpu::decode::Register;
use serde::{Deserialize, Serialize};

/// The breadboard register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R1-R4, indexed by [`Register::index`].
    pub general: [u8; 4],

    /// PC: address of the next instruction to fetch
    pub pc: u8,

    /// IR: upper byte of the instruction being executed
    pub ir: u8,

    /// DO: value shown on the decimal display
    pub decimal_output: u8,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn get(&self, reg: Register) -> u8 {
        self.general[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Register, value: u8) {
        self.general[reg.index()] = value;
    }

    /// Increment the program counter, wrapping at 256.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u8 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr;
    }
}

/// The flags register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub overflow: bool,
    pub zero: bool,
}
