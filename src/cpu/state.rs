//! Architectural state snapshot.

use crate::cpu::alu::{self, AluResult};
use crate::cpu::control::{ControlLine, ControlLines};
use crate::cpu::memory::{Memory, Rom, SnapshotError, IO_BASE, IO_SIZE, RAM_SIZE};
use crate::cpu::registers::{Flags, Registers};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Number of microcode steps per instruction.
pub const STEPS_PER_INSTRUCTION: u8 = 6;

/// Phase inside one fetch/execute cycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Step(u8);

impl Step {
    pub const FIRST: Step = Step(0);

    /// Create a step, wrapping modulo 6.
    pub const fn new(value: u8) -> Self {
        Step(value % STEPS_PER_INSTRUCTION)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn next(self) -> Self {
        Step::new(self.0 + 1)
    }

    pub const fn previous(self) -> Self {
        Step::new(self.0 + STEPS_PER_INSTRUCTION - 1)
    }

    /// Steps 0 and 1 fetch the instruction byte.
    pub const fn is_fetch(self) -> bool {
        self.0 < 2
    }
}

impl TryFrom<u8> for Step {
    type Error = SnapshotError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value >= STEPS_PER_INSTRUCTION {
            return Err(SnapshotError::StepOutOfRange(value));
        }
        Ok(Step(value))
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.0
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Level of the clock line after the last tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockLevel {
    #[default]
    Low,
    High,
}

impl ClockLevel {
    pub fn toggled(self) -> Self {
        match self {
            ClockLevel::Low => ClockLevel::High,
            ClockLevel::High => ClockLevel::Low,
        }
    }
}

/// Full snapshot of the machine.
///
/// Only the sequencer mutates this; everyone else reads it between ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerState {
    pub finished: bool,
    pub clock: ClockLevel,

    pub regs: Registers,
    pub step: Step,
    pub flags: Flags,
    pub control: ControlLines,

    pub ram_address: u8,
    #[serde(deserialize_with = "ram_cells")]
    pub ram: Memory,
    pub rom_address: u8,
    pub rom: Rom,

    pub memory_mapped_io_active: bool,
    #[serde(deserialize_with = "io_address")]
    pub io_address: u8,
    #[serde(deserialize_with = "io_cells")]
    pub io: Memory,
}

fn ram_cells<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Memory, D::Error> {
    Memory::deserialize(deserializer)?
        .sized("RAM", RAM_SIZE)
        .map_err(de::Error::custom)
}

fn io_cells<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Memory, D::Error> {
    Memory::deserialize(deserializer)?
        .sized("IO", IO_SIZE)
        .map_err(de::Error::custom)
}

fn io_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let addr = u8::deserialize(deserializer)?;
    if addr as usize >= IO_SIZE {
        return Err(de::Error::custom(SnapshotError::IoAddressOutOfRange(addr)));
    }
    Ok(addr)
}

impl ComputerState {
    /// A powered-on machine with empty ROM.
    pub fn new() -> Self {
        Self {
            finished: false,
            clock: ClockLevel::Low,
            regs: Registers::new(),
            step: Step::FIRST,
            flags: Flags::default(),
            control: ControlLines::new(),
            ram_address: 0,
            ram: Memory::ram(),
            rom_address: 0,
            rom: Rom::new(),
            memory_mapped_io_active: true,
            io_address: 0,
            io: Memory::io(),
        }
    }

    /// The ALU result for the current registers and `AluNeg` line.
    pub fn alu(&self) -> AluResult {
        alu::evaluate(
            self.regs.general[0],
            self.regs.general[1],
            self.control.is_on(ControlLine::AluNeg),
        )
    }

    pub fn alu_output(&self) -> u8 {
        self.alu().output
    }

    pub fn current_ram_value(&self) -> u8 {
        self.ram.read(self.ram_address as usize)
    }

    /// ROM value at the address register, honouring the bank select line.
    pub fn current_rom_value(&self) -> u8 {
        self.rom
            .read(self.rom_address, self.control.is_on(ControlLine::RomAddrBit9))
    }

    pub fn current_io_value(&self) -> u8 {
        self.io.read(self.io_address as usize)
    }

    /// Lines asserted during the last tick, ordered by pin.
    pub fn asserted_lines(&self) -> Vec<ControlLine> {
        self.control.asserted()
    }

    /// Write a RAM cell, mirroring into IO when `IoActive` is asserted and
    /// the address is in the upper half.
    pub(crate) fn write_ram(&mut self, value: u8) {
        let addr = self.ram_address;
        self.ram.write(addr as usize, value);

        if self.control.is_on(ControlLine::IoActive) && addr >= IO_BASE {
            self.io_address = addr - IO_BASE;
            self.io.write(self.io_address as usize, value);
        }
    }
}

impl Default for ComputerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_cycle() {
        let mut step = Step::FIRST;
        let mut seen = Vec::new();
        for _ in 0..STEPS_PER_INSTRUCTION {
            seen.push(step.value());
            step = step.next();
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(step, Step::FIRST);
    }

    #[test]
    fn test_step_previous_wraps() {
        assert_eq!(Step::FIRST.previous(), Step::new(5));
        assert_eq!(Step::new(3).previous(), Step::new(2));
        assert_eq!(Step::new(8), Step::new(2));
    }

    #[test]
    fn test_fresh_state_is_zeroed() {
        let state = ComputerState::new();
        assert!(!state.finished);
        assert_eq!(state.step, Step::FIRST);
        assert_eq!(state.regs, Registers::default());
        assert!(state.control.is_empty());
        assert!(state.ram.as_slice().iter().all(|&b| b == 0));
        assert!(state.io.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alu_follows_neg_line() {
        let mut state = ComputerState::new();
        state.regs.general[0] = 10;
        state.regs.general[1] = 3;
        assert_eq!(state.alu_output(), 13);

        state.control.set_on(ControlLine::AluNeg, true);
        assert_eq!(state.alu_output(), 7);
    }

    #[test]
    fn test_current_rom_value_is_banked() {
        let mut state = ComputerState::new();
        state.rom.burn(&[(0x30, 9)]).unwrap();
        assert_eq!(state.current_rom_value(), 0x30);

        state.control.set_on(ControlLine::RomAddrBit9, true);
        assert_eq!(state.current_rom_value(), 9);
    }

    #[test]
    fn test_io_mirror() {
        let mut state = ComputerState::new();
        state.ram_address = 130;
        state.write_ram(0xff);
        assert_eq!(state.io.read(2), 0, "IO untouched without IoActive");

        state.control.set_on(ControlLine::IoActive, true);
        state.write_ram(0xaa);
        assert_eq!(state.ram.read(130), 0xaa);
        assert_eq!(state.io.read(2), 0xaa);
        assert_eq!(state.io_address, 2);
        assert_eq!(state.current_io_value(), 0xaa);

        state.ram_address = 5;
        state.write_ram(1);
        assert_eq!(state.io_address, 2, "lower RAM never reaches IO");
    }

    #[test]
    fn test_json_snapshot_roundtrip() {
        let mut state = ComputerState::new();
        state.regs.pc = 3;
        state.control.set_on(ControlLine::PcOut, true);

        let json = serde_json::to_string(&state).unwrap();
        let back: ComputerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    /// Serialize a fresh state, let `edit` break it, and try to restore it.
    fn restore_edited(edit: impl FnOnce(&mut serde_json::Value)) -> Result<ComputerState, serde_json::Error> {
        let mut value = serde_json::to_value(ComputerState::new()).unwrap();
        edit(&mut value);
        serde_json::from_value(value)
    }

    #[test]
    fn test_snapshot_rejects_step_out_of_range() {
        let err = restore_edited(|v| v["step"] = 251.into()).unwrap_err();
        assert!(err.to_string().contains("step 251"));

        let ok = restore_edited(|v| v["step"] = 5.into()).unwrap();
        assert_eq!(ok.step, Step::new(5));
        assert_eq!(ok.step.previous(), Step::new(4));
    }

    #[test]
    fn test_snapshot_rejects_wrong_memory_sizes() {
        let short_ram = restore_edited(|v| v["ram"] = serde_json::json!([0, 0, 0])).unwrap_err();
        assert!(short_ram.to_string().contains("RAM holds 3 bytes"));

        let long_io = restore_edited(|v| v["io"] = serde_json::json!(vec![0u8; 256])).unwrap_err();
        assert!(long_io.to_string().contains("IO holds 256 bytes"));

        let short_rom = restore_edited(|v| v["rom"] = serde_json::json!([0xf0])).unwrap_err();
        assert!(short_rom.to_string().contains("ROM holds 1 bytes"));
    }

    #[test]
    fn test_snapshot_rejects_io_address_past_array() {
        let err = restore_edited(|v| v["io_address"] = 200.into()).unwrap_err();
        assert!(err.to_string().contains("IO address 200"));
        assert!(restore_edited(|v| v["io_address"] = 127.into()).is_ok());
    }
}
