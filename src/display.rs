//! The 32x16 LED dot-matrix display driven by the IO array.
//!
//! The first 64 IO bytes are split into four sections of 16 columns. Each
//! byte lights one column of eight LEDs, bit 7 at the top of its section:
//!
//! ```text
//!   byte n  ->  section = n / 16, column = n % 16
//!   bit b   ->  row = (7 - b) + 8 * section
//! ```

use crate::cpu::Memory;

pub const ROWS: usize = 32;
pub const COLUMNS: usize = 16;

const ROWS_PER_SECTION: usize = 8;

/// IO bytes consumed by the display.
pub const DISPLAY_BYTES: usize = ROWS * COLUMNS / 8;

/// Snapshot of every LED.
#[derive(Clone, PartialEq, Eq)]
pub struct LedMatrix {
    cells: [[bool; COLUMNS]; ROWS],
}

impl LedMatrix {
    /// Decode the matrix from IO memory. Bytes past the display are ignored.
    pub fn from_io(io: &Memory) -> Self {
        Self::from_bytes(io.as_slice())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut cells = [[false; COLUMNS]; ROWS];
        for (n, &byte) in bytes.iter().take(DISPLAY_BYTES).enumerate() {
            let section = n / COLUMNS;
            let column = n % COLUMNS;
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    cells[(7 - bit) + ROWS_PER_SECTION * section][column] = true;
                }
            }
        }
        Self { cells }
    }

    pub fn is_lit(&self, row: usize, column: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(false)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool; COLUMNS]> {
        self.cells.iter()
    }

    pub fn lit_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&lit| lit).count()
    }

    /// One text line per row, `#` lit and `.` dark.
    pub fn render(&self, lit: char, dark: char) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|&on| if on { lit } else { dark }).collect())
            .collect()
    }
}

impl std::fmt::Debug for LedMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.render('#', '.') {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_io_is_dark() {
        let matrix = LedMatrix::from_io(&Memory::io());
        assert_eq!(matrix.lit_count(), 0);
    }

    #[test]
    fn test_bit_seven_is_top_of_section() {
        let mut bytes = [0u8; DISPLAY_BYTES];
        bytes[0] = 0b1000_0000;
        bytes[17] = 0b0000_0001;
        let matrix = LedMatrix::from_bytes(&bytes);

        assert!(matrix.is_lit(0, 0));
        // section 1, column 1, bottom row of the section
        assert!(matrix.is_lit(15, 1));
        assert_eq!(matrix.lit_count(), 2);
    }

    #[test]
    fn test_last_byte_reaches_bottom_right() {
        let mut bytes = [0u8; DISPLAY_BYTES];
        bytes[DISPLAY_BYTES - 1] = 0b0000_0001;
        let matrix = LedMatrix::from_bytes(&bytes);
        assert!(matrix.is_lit(ROWS - 1, COLUMNS - 1));
    }

    #[test]
    fn test_bytes_past_display_ignored() {
        let mut bytes = vec![0u8; 128];
        bytes[100] = 0xff;
        assert_eq!(LedMatrix::from_bytes(&bytes).lit_count(), 0);
    }

    #[test]
    fn test_out_of_range_is_dark() {
        let matrix = LedMatrix::from_bytes(&[0xff; DISPLAY_BYTES]);
        assert!(!matrix.is_lit(ROWS, 0));
        assert!(!matrix.is_lit(0, COLUMNS));
    }
}
