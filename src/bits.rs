//! Helpers for pulling register indices and immediates out of raw words.
//!
//! Bit positions are counted from the least significant bit, as in the Arm
//! Architecture Reference Manual encoding diagrams. For a 32-bit instruction
//! the first halfword occupies bits 31..16.

use crate::Register;

/// Bits 15..11 of a halfword which mark the start of a 32-bit instruction.
const WIDE_PREFIX_MASK: u16 = 0xF800;

/// The three `op1` values (`0b11101`, `0b11110`, `0b11111`) from ARMv7-M ARM A5.1.
const WIDE_PREFIXES: [u16; 3] = [0xE800, 0xF000, 0xF800];

/// Does this halfword start a 32-bit instruction?
pub fn is_wide_prefix(halfword: u16) -> bool {
    WIDE_PREFIXES.contains(&(halfword & WIDE_PREFIX_MASK))
}

/// Extract `width` bits starting at bit `lsb`.
pub fn field(word: u32, lsb: u32, width: u32) -> u32 {
    (word >> lsb) & ((1 << width) - 1)
}

/// Is bit `n` set?
pub fn bit(word: u32, n: u32) -> bool {
    (word >> n) & 1 != 0
}

/// A three bit register field (R0 to R7).
pub fn low_register(word: u32, lsb: u32) -> Register {
    Register::from(field(word, lsb, 3) as u8)
}

/// A four bit register field (R0 to PC).
pub fn register(word: u32, lsb: u32) -> Register {
    Register::from(field(word, lsb, 4) as u8)
}

/// A register split into a high bit and a three bit low field, like the
/// `D:Rd` and `DN:Rdn` fields of the 16-bit high register instructions.
pub fn split_register(word: u32, high: u32, lsb: u32) -> Register {
    let high = u8::from(bit(word, high)) << 3;
    Register::from(high | field(word, lsb, 3) as u8)
}


// End of file
