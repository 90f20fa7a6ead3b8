//! # Breadboard Emulator
//!
//! An emulator of an 8-bit breadboard computer built from TTL logic.
//!
//! The machine is driven entirely by 24 control lines. Every clock tick the
//! microcode sequencer asserts the lines for the current instruction and
//! step, one value crosses the shared bus, and every asserted input latches
//! it. Programs live in a split ROM (instruction bytes in the low bank,
//! payloads in the high bank), data in 256 bytes of RAM, and the upper half
//! of RAM is mirrored to an IO array that drives a 32x16 LED matrix.

pub mod cpu;
pub mod asm;
pub mod display;
pub mod programs;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{
    Computer, ComputerOptions, ComputerState, Condition, ControlLine, ControlLines, DecodeError, Instruction,
    LoadError, Operation, Register, SnapshotError,
};
pub use asm::{assemble, disassemble, load_image, save_image, AssemblerError, ImageError, RomImage};
pub use display::LedMatrix;
pub use programs::BuiltinProgram;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
