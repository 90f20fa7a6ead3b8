//! Two-pass assembler for breadboard programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LOOP:               ; Define a label (its instruction index)
//!     LDI R1, 2       ; R1 := 2
//!     STO R1, [25]    ; RAM[25] := R1
//!     ADD [25]        ; R3 := R1 + RAM[25]
//!     ADDI 0x10       ; R3 := R1 + 16
//!     JMPI LOOP ?OVF  ; Jump only when the overflow flag is set
//!     OUT R3
//!     HLT
//! ```
//!
//! Brackets mark a RAM address and are optional on the operations that take
//! one (`STO`, `LD`, `ADD`, `SUB`, `JMP`).

use crate::cpu::decode::{Condition, Instruction, Operation, Register};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a program.
pub fn assemble(source: &str) -> Result<Vec<Instruction>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// An operand as written, before labels are known.
#[derive(Debug, Clone)]
enum Operand {
    Value(u8),
    Label(String),
}

/// One parsed source line awaiting label resolution.
#[derive(Debug)]
struct Pending {
    line: usize,
    operation: Operation,
    register: Option<Register>,
    condition: Condition,
    operand: Option<Operand>,
}

struct Assembler {
    /// Label -> instruction index.
    symbols: HashMap<String, u8>,
    pending: Vec<Pending>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<Instruction>, AssemblerError> {
        // Pass 1: parse lines and record labels
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: resolve operands
        self.pending.iter().map(|p| self.resolve(p)).collect()
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return Ok(());
        }

        let rest = match line.find(':') {
            Some(colon_idx) => {
                let label = line[..colon_idx].trim().to_uppercase();
                self.define_label(label, line_num)?;
                line[colon_idx + 1..].trim()
            }
            None => line,
        };

        if rest.is_empty() {
            return Ok(());
        }
        let pending = self.parse_instruction(rest, line_num)?;
        self.pending.push(pending);
        Ok(())
    }

    fn define_label(&mut self, label: String, line_num: usize) -> Result<(), AssemblerError> {
        if label.is_empty() || label.contains(char::is_whitespace) {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label '{}'", label),
            });
        }
        let index = u8::try_from(self.pending.len()).map_err(|_| AssemblerError::ValueOutOfRange {
            line: line_num,
            value: self.pending.len() as i64,
        })?;
        if self.symbols.insert(label.clone(), index).is_some() {
            return Err(AssemblerError::DuplicateLabel { line: line_num, label });
        }
        Ok(())
    }

    fn parse_instruction(&self, text: &str, line_num: usize) -> Result<Pending, AssemblerError> {
        let mut tokens = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty());

        let mnemonic = tokens.next().unwrap_or_default().to_uppercase();
        let operation = parse_mnemonic(&mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
            line: line_num,
            mnemonic: mnemonic.clone(),
        })?;

        let mut register = None;
        let mut condition = Condition::NoCondition;
        let mut operand = None;

        for token in tokens {
            if token.eq_ignore_ascii_case("?OVF") {
                condition = Condition::AluOverflow;
            } else if let Some(reg) = parse_register(token) {
                if register.replace(reg).is_some() {
                    return Err(syntax(line_num, "more than one register"));
                }
            } else if operand.is_some() {
                return Err(syntax(line_num, &format!("unexpected '{}'", token)));
            } else {
                operand = Some(parse_operand(token, operation, line_num)?);
            }
        }

        // Operations that ignore the register still encode one if given
        if operation.uses_register() && register.is_none() {
            return Err(AssemblerError::MissingRegister { line: line_num, mnemonic });
        }
        match (operation.has_payload(), &operand) {
            (true, None) => return Err(syntax(line_num, &format!("{} requires an operand", mnemonic))),
            (false, Some(_)) => return Err(syntax(line_num, &format!("{} takes no operand", mnemonic))),
            _ => {}
        }

        Ok(Pending {
            line: line_num,
            operation,
            register,
            condition,
            operand,
        })
    }

    fn resolve(&self, p: &Pending) -> Result<Instruction, AssemblerError> {
        let payload = match &p.operand {
            None => 0,
            Some(Operand::Value(v)) => *v,
            Some(Operand::Label(label)) => *self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: p.line,
                label: label.clone(),
            })?,
        };
        Ok(Instruction::new(p.operation, p.register, p.condition, payload))
    }
}

fn syntax(line: usize, message: &str) -> AssemblerError {
    AssemblerError::SyntaxError {
        line,
        message: message.to_string(),
    }
}

fn parse_mnemonic(mnemonic: &str) -> Option<Operation> {
    let op = match mnemonic {
        "HALT" => Operation::Halt,
        "LOAD" => Operation::Load,
        "STORE" => Operation::Store,
        "JUMP" => Operation::Jump,
        _ => return Operation::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic),
    };
    Some(op)
}

fn parse_register(token: &str) -> Option<Register> {
    match token.to_uppercase().as_str() {
        "R1" => Some(Register::R1),
        "R2" => Some(Register::R2),
        "R3" => Some(Register::R3),
        "R4" => Some(Register::R4),
        _ => None,
    }
}

/// Operations whose payload is a RAM address.
fn takes_address(op: Operation) -> bool {
    matches!(
        op,
        Operation::Store | Operation::Load | Operation::Add | Operation::Sub | Operation::Jump
    )
}

fn parse_operand(token: &str, op: Operation, line_num: usize) -> Result<Operand, AssemblerError> {
    let inner = match token.strip_prefix('[') {
        Some(rest) => {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| syntax(line_num, &format!("unclosed bracket in '{}'", token)))?;
            if !takes_address(op) {
                return Err(syntax(line_num, &format!("{} takes an immediate value", op.mnemonic())));
            }
            inner
        }
        None => token,
    };

    match parse_number(inner) {
        Some(Ok(value)) => u8::try_from(value)
            .map(Operand::Value)
            .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value }),
        Some(Err(())) => Err(syntax(line_num, &format!("invalid number '{}'", inner))),
        None => Ok(Operand::Label(inner.to_uppercase())),
    }
}

/// `None` when the token is not numeric at all (so it is a label).
fn parse_number(token: &str) -> Option<Result<i64, ()>> {
    let (digits, radix) = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = token.strip_prefix("0b").or_else(|| token.strip_prefix("0B")) {
        (bin, 2)
    } else if token.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        (token, 10)
    } else {
        return None;
    };
    Some(i64::from_str_radix(&digits.replace('_', ""), radix).map_err(|_| ()))
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label defined twice on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("{mnemonic} on line {line} needs a register")]
    MissingRegister { line: usize, mnemonic: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::programs;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LDI R1, 200
            ADDI 100
            OUT R3
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(
            result,
            vec![
                Instruction::load_immediate(200, Register::R1),
                Instruction::add_immediate(100),
                Instruction::out(Register::R3),
                Instruction::halt(),
            ]
        );
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:
            LDI R1, 1
            JMPI END ?ovf
            NOP
        END: HLT
            JMPI START
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(result[1], Instruction::jump_immediate(3).given(Condition::AluOverflow));
        assert_eq!(result[4], Instruction::jump_immediate(0));
    }

    #[test]
    fn test_address_brackets_optional() {
        let a = assemble("STO R2, [0x80]").unwrap();
        let b = assemble("sto r2 128").unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], Instruction::store(Register::R2, 128));
    }

    #[test]
    fn test_disassembly_reassembles() {
        let program = programs::two_times_tables();
        let text: String = program.iter().map(|i| format!("{}\n", i)).collect();
        assert_eq!(assemble(&text).unwrap(), program);
    }

    #[test]
    fn test_register_on_any_operation() {
        let program = assemble("ADDI R3, 4\nJMPI R4, 0 ?OVF").unwrap();
        assert_eq!(program[0].register, Register::R3);
        assert_eq!(encode(&program[0]), (0x58, 4));
        assert_eq!(encode(&program[1]), (0x9e, 0));
        assert_eq!(assemble("ADDI 4").unwrap()[0].register, Register::R1);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(assemble("FOO 1"), Err(AssemblerError::UnknownMnemonic { line: 1, .. })));
        assert!(matches!(assemble("\nJMPI NOWHERE"), Err(AssemblerError::UndefinedLabel { line: 2, .. })));
        assert!(matches!(assemble("LDI R1, 256"), Err(AssemblerError::ValueOutOfRange { value: 256, .. })));
        assert!(matches!(assemble("LDI 4"), Err(AssemblerError::MissingRegister { .. })));
        assert!(matches!(assemble("LDI R1, [4]"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("HLT 3"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("A:\nA: HLT"), Err(AssemblerError::DuplicateLabel { line: 2, .. })));
    }
}
