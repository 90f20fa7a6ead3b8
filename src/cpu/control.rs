//! The 24-line control bus.
//!
//! Every transfer on the breadboard goes through a single shared 8-bit bus.
//! The microcode sequencer asserts a handful of control lines each step:
//! at most one *output* line drives the bus, any number of *input* lines
//! latch it, and *modifier* lines change how a component behaves
//! (ALU subtraction, ROM bank select, halt, memory-mapped IO).
//!
//! Each line is wired to a fixed pin of the control ROMs. The pin only
//! matters for packing the lines into a 24-bit control word for display.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of control lines (and control ROM pins).
pub const NUM_LINES: usize = 24;

/// A single named control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlLine {
    // ==================== Registers ====================
    Reg1In,
    Reg1Out,
    Reg2In,
    Reg2Out,
    Reg3In,
    Reg3Out,
    Reg4In,
    Reg4Out,

    // ==================== ROM ====================
    RomAddrIn,
    RomValueOut,
    RomAddrBit9,

    // ==================== RAM ====================
    RamAddrIn,
    RamValueIn,
    RamValueOut,

    // ==================== Program Counter ====================
    PcIn,
    PcOut,
    PcInc,

    // ==================== ALU ====================
    AluNeg,
    AluOut,
    AluSetFlags,

    // ==================== Other ====================
    IrIn,
    DoIn,
    Halt,
    IoActive,
}

/// How a line participates in a bus transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Latches the bus value into a component.
    Input,
    /// Drives a component's value onto the bus.
    Output,
    /// Changes component behavior without touching the bus.
    Modifier,
}

impl ControlLine {
    /// All lines, in declaration order (index == discriminant).
    pub const ALL: [ControlLine; NUM_LINES] = [
        ControlLine::Reg1In,
        ControlLine::Reg1Out,
        ControlLine::Reg2In,
        ControlLine::Reg2Out,
        ControlLine::Reg3In,
        ControlLine::Reg3Out,
        ControlLine::Reg4In,
        ControlLine::Reg4Out,
        ControlLine::RomAddrIn,
        ControlLine::RomValueOut,
        ControlLine::RomAddrBit9,
        ControlLine::RamAddrIn,
        ControlLine::RamValueIn,
        ControlLine::RamValueOut,
        ControlLine::PcIn,
        ControlLine::PcOut,
        ControlLine::PcInc,
        ControlLine::AluNeg,
        ControlLine::AluOut,
        ControlLine::AluSetFlags,
        ControlLine::IrIn,
        ControlLine::DoIn,
        ControlLine::Halt,
        ControlLine::IoActive,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> LineKind {
        use ControlLine::*;
        match self {
            Reg1In | Reg2In | Reg3In | Reg4In | RomAddrIn | RamAddrIn | RamValueIn | PcIn
            | PcInc | AluSetFlags | IrIn | DoIn => LineKind::Input,
            Reg1Out | Reg2Out | Reg3Out | Reg4Out | RomValueOut | RamValueOut | PcOut
            | AluOut => LineKind::Output,
            RomAddrBit9 | AluNeg | Halt | IoActive => LineKind::Modifier,
        }
    }

    pub fn is_input_line(self) -> bool {
        self.kind() == LineKind::Input
    }

    pub fn is_output_line(self) -> bool {
        self.kind() == LineKind::Output
    }

    /// Control ROM pin (1-24) this line is wired to.
    pub const fn pin(self) -> u8 {
        use ControlLine::*;
        match self {
            RamAddrIn => 1,
            RamValueIn => 2,
            RamValueOut => 3,
            RomAddrIn => 4,
            RomValueOut => 5,
            RomAddrBit9 => 6,
            Halt => 7,
            IrIn => 8,
            DoIn => 9,
            Reg4In => 10,
            Reg4Out => 11,
            Reg3In => 12,
            Reg3Out => 13,
            Reg2In => 14,
            Reg2Out => 15,
            AluNeg => 16,
            AluOut => 17,
            Reg1In => 18,
            Reg1Out => 19,
            PcOut => 20,
            PcInc => 21,
            PcIn => 22,
            AluSetFlags => 23,
            IoActive => 24,
        }
    }

    /// Bit of this line in the packed control word. Pin 1 is the MSB.
    pub const fn mask(self) -> u32 {
        1 << (NUM_LINES as u32 - self.pin() as u32)
    }

    /// Short mnemonic used in traces.
    pub const fn mnemonic(self) -> &'static str {
        use ControlLine::*;
        match self {
            Reg1In => "R1I",
            Reg1Out => "R1O",
            Reg2In => "R2I",
            Reg2Out => "R2O",
            Reg3In => "R3I",
            Reg3Out => "R3O",
            Reg4In => "R4I",
            Reg4Out => "R4O",
            RomAddrIn => "ROMAI",
            RomValueOut => "ROMO",
            RomAddrBit9 => "ROMB9",
            RamAddrIn => "RAMAI",
            RamValueIn => "RAMI",
            RamValueOut => "RAMO",
            PcIn => "PCI",
            PcOut => "PCO",
            PcInc => "PC+",
            AluNeg => "NEG",
            AluOut => "ALUO",
            AluSetFlags => "FLG",
            IrIn => "IRI",
            DoIn => "DOI",
            Halt => "HLT",
            IoActive => "IO",
        }
    }

    pub const fn title(self) -> &'static str {
        use ControlLine::*;
        match self {
            Reg1In => "Register 1 In",
            Reg1Out => "Register 1 Out",
            Reg2In => "Register 2 In",
            Reg2Out => "Register 2 Out",
            Reg3In => "Register 3 In",
            Reg3Out => "Register 3 Out",
            Reg4In => "Register 4 In",
            Reg4Out => "Register 4 Out",
            RomAddrIn => "ROM Address In",
            RomValueOut => "ROM Value Out",
            RomAddrBit9 => "ROM Address 9th Bit",
            RamAddrIn => "RAM Address In",
            RamValueIn => "RAM Value In",
            RamValueOut => "RAM Value Out",
            PcIn => "Program Counter In",
            PcOut => "Program Counter Out",
            PcInc => "Program Counter Increment",
            AluNeg => "ALU Subtraction On",
            AluOut => "ALU Out",
            AluSetFlags => "ALU Set Flags",
            IrIn => "Instruction Register In",
            DoIn => "Decimal Output In",
            Halt => "Halt",
            IoActive => "Memory-Mapped IO Active",
        }
    }

    pub const fn description(self) -> &'static str {
        use ControlLine::*;
        match self {
            Reg1In => "Loads the value on the bus into register 1",
            Reg1Out => "Outputs the value stored in register 1 onto the bus",
            Reg2In => "Loads the value on the bus into register 2",
            Reg2Out => "Outputs the value stored in register 2 onto the bus",
            Reg3In => "Loads the value on the bus into register 3",
            Reg3Out => "Outputs the value stored in register 3 onto the bus",
            Reg4In => "Loads the value on the bus into register 4",
            Reg4Out => "Outputs the value stored in register 4 onto the bus",
            RomAddrIn => "Reads the value on the bus into the ROM address register",
            RomValueOut => {
                "Outputs to the bus the value stored in ROM at the address held in the ROM address register"
            }
            RomAddrBit9 => {
                "Turns on the 9th ROM address bit, switching to the second 256-byte bank that holds instruction payloads"
            }
            RamAddrIn => "Reads the value on the bus into the RAM address register",
            RamValueIn => "Writes the value on the bus into RAM at the address held in the RAM address register",
            RamValueOut => "Outputs to the bus the value stored in RAM at the address held in the RAM address register",
            PcIn => "Loads the value on the bus into the program counter",
            PcOut => "Outputs the value stored in the program counter onto the bus",
            PcInc => "Increments the program counter",
            AluNeg => "Switches the ALU to subtraction, so its output is register 1 minus register 2",
            AluOut => "Outputs the ALU result of register 1 and register 2 onto the bus",
            AluSetFlags => {
                "Latches the overflow and zero flags from the current ALU result"
            }
            IrIn => "Loads the value on the bus into the instruction register",
            DoIn => "Loads the value on the bus into the decimal output register shown on the display",
            Halt => "Stops the clock, ending execution",
            IoActive => "Mirrors RAM writes to the upper 128 addresses into the memory-mapped IO array",
        }
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The on/off value of all 24 lines, indexed directly by [`ControlLine`].
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlLines {
    lines: [bool; NUM_LINES],
}

impl ControlLines {
    /// All lines off.
    pub const fn new() -> Self {
        Self { lines: [false; NUM_LINES] }
    }

    /// Build a set with exactly the given lines asserted.
    pub fn with(asserted: &[ControlLine]) -> Self {
        let mut lines = Self::new();
        for &line in asserted {
            lines.set_on(line, true);
        }
        lines
    }

    #[inline]
    pub fn is_on(&self, line: ControlLine) -> bool {
        self.lines[line.index()]
    }

    #[inline]
    pub fn set_on(&mut self, line: ControlLine, on: bool) {
        self.lines[line.index()] = on;
    }

    pub fn clear(&mut self) {
        self.lines = [false; NUM_LINES];
    }

    pub fn is_empty(&self) -> bool {
        !self.lines.iter().any(|&on| on)
    }

    /// Asserted lines, ordered by pin.
    pub fn asserted(&self) -> Vec<ControlLine> {
        let mut on: Vec<ControlLine> = ControlLine::ALL
            .iter()
            .copied()
            .filter(|&line| self.is_on(line))
            .collect();
        on.sort_by_key(|line| line.pin());
        on
    }

    /// Asserted output lines. More than one means bus contention.
    pub fn outputs(&self) -> impl Iterator<Item = ControlLine> + '_ {
        ControlLine::ALL
            .iter()
            .copied()
            .filter(move |&line| line.is_output_line() && self.is_on(line))
    }

    /// The 24-bit packed control word (pin 1 in bit 23).
    pub fn packed(&self) -> u32 {
        ControlLine::ALL
            .iter()
            .filter(|&&line| self.is_on(line))
            .fold(0, |word, line| word | line.mask())
    }

    /// Inverse of [`ControlLines::packed`]. Bits above 23 are ignored.
    pub fn from_packed(word: u32) -> Self {
        let mut lines = Self::new();
        for line in ControlLine::ALL {
            lines.set_on(line, word & line.mask() != 0);
        }
        lines
    }
}

impl fmt::Debug for ControlLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.asserted()).finish()
    }
}

impl fmt::Display for ControlLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let asserted = self.asserted();
        if asserted.is_empty() {
            return f.write_str("-");
        }
        for (i, line) in asserted.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_is_indexed_by_discriminant() {
        for (i, line) in ControlLine::ALL.iter().enumerate() {
            assert_eq!(line.index(), i);
        }
    }

    #[test]
    fn test_pins_are_unique_and_cover_1_to_24() {
        let pins: HashSet<u8> = ControlLine::ALL.iter().map(|l| l.pin()).collect();
        assert_eq!(pins.len(), NUM_LINES);
        assert_eq!(pins, (1..=24).collect());
    }

    #[test]
    fn test_mask_follows_pin() {
        assert_eq!(ControlLine::RamAddrIn.mask(), 1 << 23);
        assert_eq!(ControlLine::AluSetFlags.mask(), 1 << 1);
        assert_eq!(ControlLine::IoActive.mask(), 1);
    }

    #[test]
    fn test_line_classification() {
        assert!(ControlLine::Reg1In.is_input_line());
        assert!(ControlLine::PcInc.is_input_line());
        assert!(ControlLine::AluSetFlags.is_input_line());
        assert!(ControlLine::AluOut.is_output_line());
        assert!(ControlLine::RomValueOut.is_output_line());

        for line in [ControlLine::AluNeg, ControlLine::RomAddrBit9, ControlLine::Halt, ControlLine::IoActive] {
            assert!(!line.is_input_line());
            assert!(!line.is_output_line());
        }

        let outputs = ControlLine::ALL.iter().filter(|l| l.is_output_line()).count();
        assert_eq!(outputs, 8);
    }

    #[test]
    fn test_set_and_read_lines() {
        let mut lines = ControlLines::new();
        assert!(lines.is_empty());

        lines.set_on(ControlLine::PcOut, true);
        lines.set_on(ControlLine::RomAddrIn, true);
        assert!(lines.is_on(ControlLine::PcOut));
        assert!(!lines.is_on(ControlLine::PcIn));

        // Ordered by pin: ROMAI (4) before PCO (20)
        assert_eq!(lines.asserted(), vec![ControlLine::RomAddrIn, ControlLine::PcOut]);

        lines.clear();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_packed_word() {
        let lines = ControlLines::with(&[ControlLine::PcOut, ControlLine::RomAddrIn]);
        let word = lines.packed();
        assert_eq!(word, (1 << 20) | (1 << 4));
        assert_eq!(ControlLines::from_packed(word), lines);
    }

    #[test]
    fn test_display() {
        let lines = ControlLines::with(&[ControlLine::RomValueOut, ControlLine::IrIn, ControlLine::PcInc]);
        assert_eq!(lines.to_string(), "ROMO IRI PC+");
        assert_eq!(ControlLines::new().to_string(), "-");
    }
}
