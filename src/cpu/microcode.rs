//! Microcode table: (instruction, step) -> asserted control lines.
//!
//! Every instruction takes all six steps. Steps 0-1 fetch:
//!
//! ```text
//!   T0  PCO ROMAI          ROM address := PC
//!   T1  ROMO IRI PC+       IR := ROM[addr]; PC += 1
//! ```
//!
//! Steps 2-5 execute. Any step that needs the payload reads it through the
//! upper ROM bank (`ROMB9 ROMO`) at the address still latched from T0.
//! Steps past the end of an instruction's routine assert nothing.

use crate::cpu::control::{ControlLine, ControlLines};
use crate::cpu::decode::{Condition, Instruction, Operation, Register};
use crate::cpu::state::Step;

use crate::cpu::control::ControlLine::*;

/// Execute-phase routine: one word per step starting at T2.
type Routine = &'static [&'static [ControlLine]];

const FETCH: [&[ControlLine]; 2] = [&[PcOut, RomAddrIn], &[RomValueOut, IrIn, PcInc]];

static STORE: [Routine; 4] = [
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[Reg1Out, RamValueIn]],
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[Reg2Out, RamValueIn]],
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[Reg3Out, RamValueIn]],
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[Reg4Out, RamValueIn]],
];

static LOAD: [Routine; 4] = [
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[RamValueOut, Reg1In]],
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[RamValueOut, Reg2In]],
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[RamValueOut, Reg3In]],
    &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[RamValueOut, Reg4In]],
];

static LOAD_IMMEDIATE: [Routine; 4] = [
    &[&[RomAddrBit9, RomValueOut, Reg1In]],
    &[&[RomAddrBit9, RomValueOut, Reg2In]],
    &[&[RomAddrBit9, RomValueOut, Reg3In]],
    &[&[RomAddrBit9, RomValueOut, Reg4In]],
];

static OUT: [Routine; 4] = [
    &[&[Reg1Out, DoIn]],
    &[&[Reg2Out, DoIn]],
    &[&[Reg3Out, DoIn]],
    &[&[Reg4Out, DoIn]],
];

static ADD: Routine = &[
    &[RomAddrBit9, RomValueOut, RamAddrIn],
    &[RamValueOut, Reg2In],
    &[AluOut, AluSetFlags, Reg3In],
];

static SUB: Routine = &[
    &[RomAddrBit9, RomValueOut, RamAddrIn],
    &[RamValueOut, Reg2In],
    &[AluNeg, AluOut, AluSetFlags, Reg3In],
];

static ADD_IMMEDIATE: Routine = &[&[RomAddrBit9, RomValueOut, Reg2In], &[AluOut, AluSetFlags, Reg3In]];

static SUB_IMMEDIATE: Routine = &[&[RomAddrBit9, RomValueOut, Reg2In], &[AluNeg, AluOut, AluSetFlags, Reg3In]];

static JUMP: Routine = &[&[RomAddrBit9, RomValueOut, RamAddrIn], &[RamValueOut, PcIn]];

static JUMP_IMMEDIATE: Routine = &[&[RomAddrBit9, RomValueOut, PcIn]];

static HALT: Routine = &[&[Halt]];

/// Machine switches that influence the microcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicrocodeInputs {
    /// Latched overflow flag.
    pub overflow: bool,
    /// Memory-mapped IO enabled.
    pub io_active: bool,
}

/// Control lines for one step.
///
/// `instr` is the decoded instruction register, or `None` when it holds a
/// reserved opcode; that is executed as a no-op.
pub fn control_lines(instr: Option<&Instruction>, step: Step, inputs: MicrocodeInputs) -> ControlLines {
    if step.is_fetch() {
        return ControlLines::with(FETCH[step.value() as usize]);
    }

    let Some(instr) = instr else {
        return ControlLines::new();
    };

    if instr.condition == Condition::AluOverflow && !inputs.overflow {
        return ControlLines::new();
    }

    let index = (step.value() - 2) as usize;
    let Some(word) = routine(instr.operation, instr.register).get(index) else {
        return ControlLines::new();
    };

    let mut lines = ControlLines::with(word);
    // RAM writes are mirrored into IO while the switch is on
    if inputs.io_active && lines.is_on(RamValueIn) {
        lines.set_on(IoActive, true);
    }
    lines
}

/// Table lookup of the execute-phase routine.
fn routine(op: Operation, reg: Register) -> Routine {
    match op {
        Operation::NoOp => &[],
        Operation::Store => STORE[reg.index()],
        Operation::Load => LOAD[reg.index()],
        Operation::LoadImmediate => LOAD_IMMEDIATE[reg.index()],
        Operation::Add => ADD,
        Operation::AddImmediate => ADD_IMMEDIATE,
        Operation::Sub => SUB,
        Operation::SubImmediate => SUB_IMMEDIATE,
        Operation::Jump => JUMP,
        Operation::JumpImmediate => JUMP_IMMEDIATE,
        Operation::Out => OUT[reg.index()],
        Operation::Halt => HALT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::state::STEPS_PER_INSTRUCTION;

    const PLAIN: MicrocodeInputs = MicrocodeInputs { overflow: false, io_active: true };

    fn lines(instr: &Instruction, step: u8, inputs: MicrocodeInputs) -> Vec<ControlLine> {
        control_lines(Some(instr), Step::new(step), inputs).asserted()
    }

    fn every_instruction() -> Vec<Instruction> {
        let mut all = Vec::new();
        for op in Operation::ALL {
            for reg in Register::ALL {
                for cond in [Condition::NoCondition, Condition::AluOverflow] {
                    all.push(Instruction::new(op, Some(reg), cond, 0));
                }
            }
        }
        all
    }

    #[test]
    fn test_fetch_is_shared() {
        let halt = Instruction::new(Operation::Halt, None, Condition::NoCondition, 0);
        assert_eq!(lines(&halt, 0, PLAIN), vec![RomAddrIn, PcOut]);
        assert_eq!(lines(&halt, 1, PLAIN), vec![RomValueOut, IrIn, PcInc]);
        assert_eq!(control_lines(None, Step::new(1), PLAIN).asserted(), vec![RomValueOut, IrIn, PcInc]);
    }

    #[test]
    fn test_invalid_opcode_is_inert() {
        for step in 2..STEPS_PER_INSTRUCTION {
            assert!(control_lines(None, Step::new(step), PLAIN).is_empty());
        }
    }

    #[test]
    fn test_add_immediate_routine() {
        let addi = Instruction::new(Operation::AddImmediate, None, Condition::NoCondition, 2);
        assert_eq!(lines(&addi, 2, PLAIN), vec![RomValueOut, RomAddrBit9, Reg2In]);
        assert_eq!(lines(&addi, 3, PLAIN), vec![Reg3In, AluOut, AluSetFlags]);
        assert!(lines(&addi, 4, PLAIN).is_empty());
    }

    #[test]
    fn test_sub_asserts_negate() {
        let sub = Instruction::new(Operation::Sub, None, Condition::NoCondition, 2);
        assert!(lines(&sub, 4, PLAIN).contains(&AluNeg));
        let add = Instruction::new(Operation::Add, None, Condition::NoCondition, 2);
        assert!(!lines(&add, 4, PLAIN).contains(&AluNeg));
    }

    #[test]
    fn test_store_io_line_follows_switch() {
        let store = Instruction::new(Operation::Store, Some(Register::R1), Condition::NoCondition, 130);
        assert!(lines(&store, 3, PLAIN).contains(&IoActive));
        let no_io = MicrocodeInputs { overflow: false, io_active: false };
        assert!(!lines(&store, 3, no_io).contains(&IoActive));
    }

    #[test]
    fn test_condition_gates_execute_phase() {
        let jmp = Instruction::new(Operation::JumpImmediate, None, Condition::AluOverflow, 0);
        assert!(lines(&jmp, 2, PLAIN).is_empty());

        let set = MicrocodeInputs { overflow: true, io_active: true };
        assert_eq!(lines(&jmp, 2, set), vec![RomValueOut, RomAddrBit9, PcIn]);

        // Fetch is never gated
        assert_eq!(lines(&jmp, 0, PLAIN), vec![RomAddrIn, PcOut]);
    }

    #[test]
    fn test_no_bus_contention() {
        for instr in every_instruction() {
            for overflow in [false, true] {
                let inputs = MicrocodeInputs { overflow, io_active: true };
                for step in 0..STEPS_PER_INSTRUCTION {
                    let word = control_lines(Some(&instr), Step::new(step), inputs);
                    assert!(
                        word.outputs().count() <= 1,
                        "{} at T{} drives the bus twice: {}",
                        instr, step, word
                    );
                }
            }
        }
    }

    #[test]
    fn test_routines_fit_in_six_steps() {
        for instr in every_instruction() {
            let inputs = MicrocodeInputs { overflow: true, io_active: true };
            assert!(routine(instr.operation, instr.register).len() <= (STEPS_PER_INSTRUCTION - 2) as usize);
        }
    }

    #[test]
    fn test_table_rows_follow_register() {
        let pairs = [
            (Register::R1, Reg1In, Reg1Out),
            (Register::R2, Reg2In, Reg2Out),
            (Register::R3, Reg3In, Reg3Out),
            (Register::R4, Reg4In, Reg4Out),
        ];
        for (reg, reg_in, reg_out) in pairs {
            let with = |op| Instruction::new(op, Some(reg), Condition::NoCondition, 7);
            assert_eq!(lines(&with(Operation::Store), 3, PLAIN), vec![RamValueIn, reg_out, IoActive]);
            assert_eq!(lines(&with(Operation::Load), 3, PLAIN), vec![RamValueOut, reg_in]);
            assert_eq!(lines(&with(Operation::LoadImmediate), 2, PLAIN), vec![RomValueOut, RomAddrBit9, reg_in]);
            assert_eq!(lines(&with(Operation::Out), 2, PLAIN), vec![DoIn, reg_out]);
        }
    }

    #[test]
    fn test_lookup_is_shared() {
        let a = Instruction::new(Operation::Store, Some(Register::R2), Condition::NoCondition, 1);
        let b = Instruction::new(Operation::Store, Some(Register::R2), Condition::NoCondition, 200);
        assert!(std::ptr::eq(routine(a.operation, a.register), routine(b.operation, b.register)));
        assert!(std::ptr::eq(routine(Operation::Sub, Register::R1), routine(Operation::Sub, Register::R4)));
    }
}
