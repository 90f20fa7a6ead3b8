//! CPU emulation for the breadboard computer.
//!
//! This module implements the complete 8-bit breadboard architecture:
//! - 4 general registers, program counter, instruction register, decimal output
//! - 512-byte banked ROM, 256-byte RAM, 128-byte memory-mapped IO
//! - a 24-line control bus driven by a 6-step microcode sequencer

pub mod alu;
pub mod control;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod microcode;
pub mod registers;
pub mod state;

pub use control::{ControlLine, ControlLines, LineKind};
pub use decode::{decode, encode, Condition, DecodeError, Instruction, Operation, Register};
pub use execute::{Computer, ComputerOptions};
pub use memory::{LoadError, Memory, Rom, SnapshotError};
pub use registers::{Flags, Registers};
pub use state::{ClockLevel, ComputerState, Step};
