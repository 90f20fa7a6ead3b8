//! ROM image file format.
//!
//! A ROM image is a simple text format:
//! - One instruction per line as two hex bytes: `upper lower`
//! - Anything after `;` is a comment
//! - Blank lines are ignored
//!
//! ```text
//! ; Breadboard ROM image
//! 30 02   ; 000: LDI R1, 2
//! f0 00   ; 001: HLT
//! ```

use crate::asm::disasm::disassemble_instruction;
use crate::cpu::decode::{encode, Instruction};
use crate::cpu::memory::{LoadError, ROM_BANK_SIZE};
use crate::cpu::Computer;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Encoded program contents, one (upper, lower) pair per instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomImage {
    pub words: Vec<(u8, u8)>,
}

impl RomImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_program(program: &[Instruction]) -> Self {
        Self {
            words: program.iter().map(encode).collect(),
        }
    }

    pub fn push(&mut self, upper: u8, lower: u8) {
        self.words.push((upper, lower));
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Parse image text.
    pub fn parse(text: &str) -> Result<Self, ImageError> {
        let mut image = RomImage::new();

        for (line_num, line) in text.lines().enumerate() {
            let data = match line.find(';') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let fields: Vec<&str> = data.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 2 {
                return Err(ImageError::ParseError {
                    line: line_num + 1,
                    message: format!("expected 2 bytes, found {}", fields.len()),
                });
            }

            let byte = |field: &str| {
                u8::from_str_radix(field, 16).map_err(|_| ImageError::ParseError {
                    line: line_num + 1,
                    message: format!("invalid hex byte '{}'", field),
                })
            };
            image.push(byte(fields[0])?, byte(fields[1])?);
        }

        if image.len() > ROM_BANK_SIZE {
            return Err(LoadError::ProgramTooLarge {
                size: image.len(),
                available: ROM_BANK_SIZE,
            }
            .into());
        }
        Ok(image)
    }

    /// Render image text, annotating each line with its disassembly.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "; Breadboard ROM image");
        let _ = writeln!(out, "; {} instructions", self.len());
        out.push('\n');

        for (i, &(upper, lower)) in self.words.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:02x} {:02x}   ; {:03}: {}",
                upper,
                lower,
                i,
                disassemble_instruction(upper, lower)
            );
        }
        out
    }
}

/// Load a ROM image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RomImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;
    RomImage::parse(&text)
}

/// Save a ROM image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &RomImage) -> Result<(), ImageError> {
    std::fs::write(path.as_ref(), image.to_text()).map_err(|e| ImageError::IoError(e.to_string()))
}

impl Computer {
    /// Load a ROM image, replacing the whole machine state.
    pub fn load_image(&mut self, image: &RomImage) -> Result<(), LoadError> {
        self.load_words(&image.words)
    }
}

/// Errors that can occur reading or writing ROM images.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs;

    #[test]
    fn test_text_roundtrip() {
        let image = RomImage::from_program(&programs::fibonacci());
        let parsed = RomImage::parse(&image.to_text()).unwrap();
        assert_eq!(parsed, image);
    }

    #[test]
    fn test_parse_ignores_comments() {
        let image = RomImage::parse("; header\n\n30 02 ; LDI\n  F0 00\n").unwrap();
        assert_eq!(image.words, vec![(0x30, 0x02), (0xf0, 0x00)]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RomImage::parse("30\n"),
            Err(ImageError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            RomImage::parse("30 02\nzz 00\n"),
            Err(ImageError::ParseError { line: 2, .. })
        ));
    }

    #[test]
    fn test_oversized_image_rejected() {
        let text = "00 00\n".repeat(ROM_BANK_SIZE + 1);
        assert!(matches!(
            RomImage::parse(&text),
            Err(ImageError::Load(LoadError::ProgramTooLarge { size: 257, .. }))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("breadboard-image-{}.rom", std::process::id()));
        let image = RomImage::from_program(&programs::two_times_tables());

        save_image(&path, &image).unwrap();
        let loaded = load_image(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, image);
    }

    #[test]
    fn test_computer_loads_image() {
        let mut computer = Computer::new();
        let image = RomImage::from_program(&programs::two_times_tables());
        computer.load_image(&image).unwrap();
        assert_eq!(computer.program(), image.words.as_slice());
    }
}
