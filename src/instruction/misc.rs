//! IT, and the hints that share its encoding space.
//!
//! See ARMv7-M ARM A7.7.38 and A7.7.88.

use super::Instruction;
use crate::bits::field;
use crate::RawWord;

/// IT{<x>{<y>{<z>}}} <firstcond>, or a hint if the mask is zero.
///
/// `1011 1111 cccc mmmm`. The hints (NOP, YIELD, WFE, WFI and SEV) have
/// no effect on the register file, so they all come out as a NOP.
pub fn it_hint(raw: RawWord) -> Instruction {
    let word = raw.value();
    let firstcond = field(word, 4, 4) as u8;
    let mask = field(word, 0, 4) as u8;
    if mask == 0 {
        return Instruction::Nop;
    }
    if firstcond == 0b1111 || (firstcond == 0b1110 && mask.count_ones() != 1) {
        return Instruction::Unpredictable { word: raw };
    }
    Instruction::It { firstcond, mask }
}

/// Spell out an IT instruction's mnemonic, like `itte`.
///
/// Each mask bit above the lowest set bit adds one more instruction to the
/// block. It runs when the condition matches (`t`) if the bit equals the
/// bottom bit of `firstcond`, and when it doesn't (`e`) otherwise.
pub fn it_mnemonic(firstcond: u8, mask: u8) -> String {
    let mut result = String::from("it");
    let length = 4u32.saturating_sub(u32::from(mask & 0x0F).trailing_zeros());
    for k in 1..length {
        let bit = (mask >> (4 - k)) & 1;
        result.push(if bit == firstcond & 1 { 't' } else { 'e' });
    }
    result
}


// End of file
