//! Memory units.
//!
//! - ROM: 512 bytes. Address lines A0-A7 come from the ROM address register,
//!   A8 is the `RomAddrBit9` control line. The lower bank holds instruction
//!   upper bytes, the upper bank holds their payloads at the same offset.
//! - RAM: 256 bytes behind an 8-bit address register.
//! - IO: 128 bytes driven by RAM writes to addresses 128-255 while
//!   memory-mapped IO is active. Read by the LED matrix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes per ROM bank.
pub const ROM_BANK_SIZE: usize = 256;
/// Total ROM size (two banks).
pub const ROM_SIZE: usize = 2 * ROM_BANK_SIZE;
pub const RAM_SIZE: usize = 256;
pub const IO_SIZE: usize = 128;
/// First RAM address mirrored into IO.
pub const IO_BASE: u8 = 128;

/// Program ROM.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Rom {
    cells: Vec<u8>,
}

impl Rom {
    pub fn new() -> Self {
        Self { cells: vec![0; ROM_SIZE] }
    }

    /// Read through the banked address.
    #[inline]
    pub fn read(&self, addr: u8, bit9: bool) -> u8 {
        self.cells[Self::index(addr, bit9)]
    }

    #[inline]
    pub fn write(&mut self, addr: u8, bit9: bool, value: u8) {
        self.cells[Self::index(addr, bit9)] = value;
    }

    #[inline]
    fn index(addr: u8, bit9: bool) -> usize {
        addr as usize + if bit9 { ROM_BANK_SIZE } else { 0 }
    }

    /// Burn a program of (upper, lower) byte pairs starting at address 0.
    pub fn burn(&mut self, words: &[(u8, u8)]) -> Result<(), LoadError> {
        if words.len() > ROM_BANK_SIZE {
            return Err(LoadError::ProgramTooLarge {
                size: words.len(),
                available: ROM_BANK_SIZE,
            });
        }

        self.cells.fill(0);
        for (addr, &(upper, lower)) in words.iter().enumerate() {
            self.cells[addr] = upper;
            self.cells[addr + ROM_BANK_SIZE] = lower;
        }
        Ok(())
    }

    /// The (upper, lower) pair stored at an instruction address.
    pub fn word(&self, addr: u8) -> (u8, u8) {
        (self.read(addr, false), self.read(addr, true))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl TryFrom<Vec<u8>> for Rom {
    type Error = SnapshotError;

    fn try_from(cells: Vec<u8>) -> Result<Self, Self::Error> {
        if cells.len() != ROM_SIZE {
            return Err(SnapshotError::WrongSize {
                unit: "ROM",
                found: cells.len(),
                expected: ROM_SIZE,
            });
        }
        Ok(Self { cells })
    }
}

impl From<Rom> for Vec<u8> {
    fn from(rom: Rom) -> Self {
        rom.cells
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells[..ROM_BANK_SIZE].iter().filter(|&&b| b != 0).count();
        f.debug_struct("Rom")
            .field("non_zero_words", &used)
            .field("total_bytes", &ROM_SIZE)
            .finish()
    }
}

/// Byte-addressed read/write memory, used for both RAM and the IO array.
///
/// The size is not part of the type; [`Memory::sized`] checks it when a
/// snapshot is restored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self { cells: vec![0; size] }
    }

    pub fn ram() -> Self {
        Self::new(RAM_SIZE)
    }

    pub fn io() -> Self {
        Self::new(IO_SIZE)
    }

    /// Accept restored cells only if they fill exactly `expected` bytes.
    pub fn sized(self, unit: &'static str, expected: usize) -> Result<Self, SnapshotError> {
        if self.cells.len() != expected {
            return Err(SnapshotError::WrongSize {
                unit,
                found: self.cells.len(),
                expected,
            });
        }
        Ok(self)
    }

    /// Read a cell.
    ///
    /// # Panics
    /// Panics if `addr` is out of range. An 8-bit address always fits RAM;
    /// IO callers subtract [`IO_BASE`] first.
    #[inline]
    pub fn read(&self, addr: usize) -> u8 {
        self.cells[addr]
    }

    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) {
        self.cells[addr] = value;
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Dump a range of cells (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = (start + count).min(self.cells.len());
        (start.min(end)..end).map(|i| (i, self.cells[i])).collect()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();
        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("program size {size} exceeds available ROM space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

/// Errors restoring a machine snapshot whose contents break an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("{unit} holds {found} bytes, expected {expected}")]
    WrongSize { unit: &'static str, found: usize, expected: usize },

    #[error("step {0} is outside T0-T5")]
    StepOutOfRange(u8),

    #[error("IO address {0} is outside the IO array")]
    IoAddressOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_banks() {
        let mut rom = Rom::new();
        rom.write(5, false, 0x11);
        rom.write(5, true, 0x22);

        assert_eq!(rom.read(5, false), 0x11);
        assert_eq!(rom.read(5, true), 0x22);
        assert_eq!(rom.as_slice()[5 + ROM_BANK_SIZE], 0x22);
    }

    #[test]
    fn test_burn_places_payload_in_upper_bank() {
        let mut rom = Rom::new();
        rom.burn(&[(0x31, 7), (0xf0, 0)]).unwrap();

        assert_eq!(rom.word(0), (0x31, 7));
        assert_eq!(rom.word(1), (0xf0, 0));
        assert_eq!(rom.read(0, true), 7);
    }

    #[test]
    fn test_burn_too_large() {
        let mut rom = Rom::new();
        let program = vec![(0u8, 0u8); ROM_BANK_SIZE + 1];
        assert_eq!(
            rom.burn(&program),
            Err(LoadError::ProgramTooLarge { size: 257, available: 256 })
        );
    }

    #[test]
    fn test_burn_clears_previous_program() {
        let mut rom = Rom::new();
        rom.burn(&[(1, 1), (2, 2)]).unwrap();
        rom.burn(&[(3, 3)]).unwrap();
        assert_eq!(rom.word(1), (0, 0));
    }

    #[test]
    fn test_memory_read_write() {
        let mut ram = Memory::ram();
        ram.write(200, 42);
        assert_eq!(ram.read(200), 42);
        assert_eq!(ram.len(), RAM_SIZE);
        assert_eq!(Memory::io().len(), IO_SIZE);
    }

    #[test]
    fn test_dump_clamps() {
        let mut io = Memory::io();
        io.write(127, 9);
        let dump = io.dump(126, 10);
        assert_eq!(dump, vec![(126, 0), (127, 9)]);
    }

    #[test]
    fn test_rom_snapshot_must_fill_both_banks() {
        let short = serde_json::from_str::<Rom>("[1, 2, 3]");
        assert!(short.unwrap_err().to_string().contains("ROM holds 3 bytes, expected 512"));

        let mut rom = Rom::new();
        rom.burn(&[(0x31, 7)]).unwrap();
        let json = serde_json::to_string(&rom).unwrap();
        assert_eq!(serde_json::from_str::<Rom>(&json).unwrap(), rom);
    }

    #[test]
    fn test_memory_sized() {
        assert!(Memory::ram().sized("RAM", RAM_SIZE).is_ok());
        assert_eq!(
            Memory::new(4).sized("IO", IO_SIZE),
            Err(SnapshotError::WrongSize { unit: "IO", found: 4, expected: IO_SIZE })
        );
    }
}
