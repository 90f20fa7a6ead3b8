//! Disassembler for breadboard programs.
//!
//! Converts encoded (upper, lower) byte pairs back to assembly text that
//! [`super::assemble`] accepts.

use crate::cpu::decode::decode;

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(upper: u8, lower: u8) -> String {
    match decode(upper, lower) {
        Ok(decoded) => decoded.to_string(),
        Err(_) => format!("??? ; {:02x} {:02x}", upper, lower),
    }
}

/// Disassemble a program, one line per instruction index.
pub fn disassemble(words: &[(u8, u8)]) -> String {
    let mut output = String::new();
    output.push_str("; Breadboard Disassembly\n");
    output.push_str("; ----------------------\n\n");

    for (addr, &(upper, lower)) in words.iter().enumerate() {
        let line = disassemble_instruction(upper, lower);
        output.push_str(&format!("{:<20} ; {:03}: {:02x} {:02x}\n", line, addr, upper, lower));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::cpu::decode::{encode, Instruction, Register};

    #[test]
    fn test_disassemble_hlt() {
        let (upper, lower) = encode(&Instruction::halt());
        assert_eq!(disassemble_instruction(upper, lower), "HLT");
    }

    #[test]
    fn test_disassemble_store() {
        let (upper, lower) = encode(&Instruction::store(Register::R2, 130));
        assert_eq!(disassemble_instruction(upper, lower), "STO R2, [130]");
    }

    #[test]
    fn test_reserved_opcode_marked() {
        let text = disassemble_instruction(0xc0, 7);
        assert!(text.starts_with("???"));
        assert!(text.contains("c0 07"));
    }

    #[test]
    fn test_listing_reassembles() {
        let program = crate::programs::fibonacci();
        let words: Vec<(u8, u8)> = program.iter().map(encode).collect();
        let listing = disassemble(&words);
        assert_eq!(assemble(&listing).unwrap(), program);
    }

    #[test]
    fn test_unused_register_bits_survive_listing() {
        let words: [(u8, u8); 2] = [(0x9e, 0), (0x48, 1)];
        let listing = disassemble(&words);
        assert!(listing.contains("JMPI R4, 0 ?OVF"));
        assert!(listing.contains("ADD R3, [1]"));

        let reassembled: Vec<(u8, u8)> = assemble(&listing).unwrap().iter().map(encode).collect();
        assert_eq!(reassembled, words);
    }
}
