//! Built-in demo programs and the instruction helpers they are written with.
//!
//! A program is just a flat `Vec<Instruction>`; the helpers only save
//! spelling out every field.

use crate::cpu::decode::{Condition, Instruction, Operation, Register};

impl Instruction {
    pub fn no_op() -> Self {
        Self::new(Operation::NoOp, None, Condition::NoCondition, 0)
    }

    /// `reg := value`
    pub fn load_immediate(value: u8, reg: Register) -> Self {
        Self::new(Operation::LoadImmediate, Some(reg), Condition::NoCondition, value)
    }

    /// `reg := RAM[address]`
    pub fn load(address: u8, reg: Register) -> Self {
        Self::new(Operation::Load, Some(reg), Condition::NoCondition, address)
    }

    /// `RAM[address] := reg`
    pub fn store(reg: Register, address: u8) -> Self {
        Self::new(Operation::Store, Some(reg), Condition::NoCondition, address)
    }

    /// `R3 := R1 + RAM[address]`
    pub fn add(address: u8) -> Self {
        Self::new(Operation::Add, None, Condition::NoCondition, address)
    }

    /// `R3 := R1 + value`
    pub fn add_immediate(value: u8) -> Self {
        Self::new(Operation::AddImmediate, None, Condition::NoCondition, value)
    }

    /// `R3 := R1 - RAM[address]`
    pub fn sub(address: u8) -> Self {
        Self::new(Operation::Sub, None, Condition::NoCondition, address)
    }

    /// `R3 := R1 - value`
    pub fn sub_immediate(value: u8) -> Self {
        Self::new(Operation::SubImmediate, None, Condition::NoCondition, value)
    }

    /// `PC := RAM[address]`
    pub fn jump(address: u8) -> Self {
        Self::new(Operation::Jump, None, Condition::NoCondition, address)
    }

    /// `PC := target`
    pub fn jump_immediate(target: u8) -> Self {
        Self::new(Operation::JumpImmediate, None, Condition::NoCondition, target)
    }

    pub fn out(reg: Register) -> Self {
        Self::new(Operation::Out, Some(reg), Condition::NoCondition, 0)
    }

    pub fn halt() -> Self {
        Self::new(Operation::Halt, None, Condition::NoCondition, 0)
    }

    /// The same instruction, executed only under `condition`.
    pub fn given(self, condition: Condition) -> Self {
        Self { condition, ..self }
    }
}

/// A named built-in program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinProgram {
    TwoTimesTables,
    Fibonacci,
    BoardOutline,
}

impl BuiltinProgram {
    pub const ALL: [BuiltinProgram; 3] = [
        BuiltinProgram::TwoTimesTables,
        BuiltinProgram::Fibonacci,
        BuiltinProgram::BoardOutline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinProgram::TwoTimesTables => "two-times-tables",
            BuiltinProgram::Fibonacci => "fibonacci",
            BuiltinProgram::BoardOutline => "board-outline",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BuiltinProgram::TwoTimesTables => "Displays 0, 2, 4 ... 30, then halts",
            BuiltinProgram::Fibonacci => "Displays the Fibonacci sequence, restarting on overflow",
            BuiltinProgram::BoardOutline => "Draws a frame on the LED matrix",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn instructions(self) -> Vec<Instruction> {
        match self {
            BuiltinProgram::TwoTimesTables => two_times_tables(),
            BuiltinProgram::Fibonacci => fibonacci(),
            BuiltinProgram::BoardOutline => board_outline(),
        }
    }
}

/// RAM cell holding the running value.
const VALUE: u8 = 0;
/// RAM cell holding the loop counter.
const COUNTER: u8 = 25;

/// Count up in twos for 15 iterations.
///
/// The counter starts at `256 - 15` so the 15th increment overflows and the
/// conditional halt fires.
pub fn two_times_tables() -> Vec<Instruction> {
    use Register::*;

    vec![
        Instruction::load_immediate(u8::MAX - 15 + 1, R1),
        Instruction::store(R1, COUNTER),
        Instruction::load_immediate(0, R1),
        Instruction::store(R1, VALUE),
        Instruction::out(R1),
        // loop: 5
        Instruction::load(VALUE, R1),
        Instruction::add_immediate(2),
        Instruction::out(R3),
        Instruction::store(R3, VALUE),
        Instruction::load(COUNTER, R1),
        Instruction::add_immediate(1),
        Instruction::store(R3, COUNTER),
        Instruction::halt().given(Condition::AluOverflow),
        Instruction::jump_immediate(5),
    ]
}

/// Fibonacci numbers up to 233, then start over.
pub fn fibonacci() -> Vec<Instruction> {
    use Register::*;

    vec![
        Instruction::load_immediate(0, R2),
        Instruction::load_immediate(1, R3),
        // loop: 2
        Instruction::store(R2, 0),
        Instruction::store(R3, 1),
        Instruction::load(0, R1),
        Instruction::add(1),
        Instruction::jump_immediate(0).given(Condition::AluOverflow),
        Instruction::out(R3),
        Instruction::jump_immediate(2),
    ]
}

/// IO bytes (column index, LED bits) forming a frame on the LED matrix.
pub const BOARD_OUTLINE: [(u8, u8); 28] = [
    // top
    (2, 0b0000_0111),
    (3, 0b0000_0100),
    (4, 0b0000_0100),
    (5, 0b0000_0100),
    (6, 0b0000_0100),
    (7, 0b0000_0100),
    (8, 0b0000_0100),
    (9, 0b0000_0100),
    (10, 0b0000_0100),
    (11, 0b0000_0100),
    (12, 0b0000_0100),
    (13, 0b0000_0111),
    // middle
    (18, 0b1111_1111),
    (29, 0b1111_1111),
    (34, 0b1111_1111),
    (45, 0b1111_1111),
    // bottom
    (50, 0b1110_0000),
    (51, 0b0010_0000),
    (52, 0b0010_0000),
    (53, 0b0010_0000),
    (54, 0b0010_0000),
    (55, 0b0010_0000),
    (56, 0b0010_0000),
    (57, 0b0010_0000),
    (58, 0b0010_0000),
    (59, 0b0010_0000),
    (60, 0b0010_0000),
    (61, 0b1110_0000),
];

/// Write [`BOARD_OUTLINE`] through memory-mapped IO, then halt.
pub fn board_outline() -> Vec<Instruction> {
    let mut program: Vec<Instruction> = BOARD_OUTLINE
        .iter()
        .flat_map(|&(offset, bits)| {
            [
                Instruction::load_immediate(bits, Register::R1),
                Instruction::store(Register::R1, crate::cpu::memory::IO_BASE + offset),
            ]
        })
        .collect();
    program.push(Instruction::halt());
    program
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_given_sets_condition() {
        let jmp = Instruction::jump_immediate(4).given(Condition::AluOverflow);
        assert_eq!(jmp.operation, Operation::JumpImmediate);
        assert_eq!(jmp.condition, Condition::AluOverflow);
        assert_eq!(jmp.payload, 4);
    }

    #[test]
    fn test_helpers_set_registers() {
        assert_eq!(Instruction::out(Register::R3).register, Register::R3);
        assert_eq!(Instruction::add(1).register, Register::R1);
    }

    #[test]
    fn test_builtin_lookup() {
        for program in BuiltinProgram::ALL {
            assert_eq!(BuiltinProgram::from_name(program.name()), Some(program));
            assert!(!program.instructions().is_empty());
        }
        assert_eq!(BuiltinProgram::from_name("nope"), None);
    }

    #[test]
    fn test_board_outline_fits_rom() {
        assert_eq!(board_outline().len(), 2 * BOARD_OUTLINE.len() + 1);
    }
}
