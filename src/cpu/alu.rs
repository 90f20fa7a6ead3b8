//! The arithmetic logic unit.
//!
//! The ALU is purely combinational: it continuously computes R1 + R2 (or
//! R1 - R2 while the subtraction line is held) and exposes the result and
//! the flags that result would produce. Nothing is stored here; the flags
//! register only latches [`AluResult::overflow`] and [`AluResult::zero`]
//! on a step that asserts `AluSetFlags`.

use serde::{Deserialize, Serialize};

/// Output of one ALU evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AluResult {
    /// Low 8 bits of the result.
    pub output: u8,
    /// The untruncated result fell outside 0..=255.
    pub overflow: bool,
    /// The truncated output is zero.
    pub zero: bool,
}

/// Evaluate the ALU for operands `a` (R1) and `b` (R2).
pub fn evaluate(a: u8, b: u8, negate: bool) -> AluResult {
    let full = if negate {
        a as i16 - b as i16
    } else {
        a as i16 + b as i16
    };
    let output = (full & 0xff) as u8;

    AluResult {
        output,
        overflow: !(0..=255).contains(&full),
        zero: output == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add() {
        let r = evaluate(3, 4, false);
        assert_eq!(r, AluResult { output: 7, overflow: false, zero: false });
    }

    #[test]
    fn test_add_overflow_to_zero() {
        let r = evaluate(255, 1, false);
        assert_eq!(r, AluResult { output: 0, overflow: true, zero: true });
    }

    #[test]
    fn test_sub_wraps() {
        let r = evaluate(1, 2, true);
        assert_eq!(r.output, 255);
        assert!(r.overflow);
        assert!(!r.zero);
    }

    #[test]
    fn test_sub_equal_is_zero() {
        let r = evaluate(42, 42, true);
        assert_eq!(r, AluResult { output: 0, overflow: false, zero: true });
    }

    proptest! {
        #[test]
        fn prop_add_matches_modular_sum(a in any::<u8>(), b in any::<u8>()) {
            let r = evaluate(a, b, false);
            prop_assert_eq!(r.output, a.wrapping_add(b));
            prop_assert_eq!(r.overflow, a as u16 + b as u16 > 255);
            prop_assert_eq!(r.zero, r.output == 0);
        }

        #[test]
        fn prop_sub_matches_twos_complement(a in any::<u8>(), b in any::<u8>()) {
            let r = evaluate(a, b, true);
            prop_assert_eq!(r.output, a.wrapping_sub(b));
            prop_assert_eq!(r.overflow, a < b);
        }
    }
}
