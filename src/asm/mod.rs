//! Assembler and disassembler for breadboard programs.
//!
//! This module provides:
//! - A two-pass assembler (text -> instructions)
//! - A disassembler (encoded bytes -> readable text)
//! - The `.rom` image format holding encoded byte pairs

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use image::{load_image, save_image, ImageError, RomImage};
