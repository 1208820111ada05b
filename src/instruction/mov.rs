//! MOV (immediate) and MOV (register).
//!
//! See ARMv7-M ARM A7.7.75 and A7.7.76.

use super::{Instruction, SetFlags};
use crate::bits::{bit, field, low_register, register, split_register};
use crate::{RawWord, Register, Registers};

/// MOVS <Rd>,#<imm8>
///
/// `0010 0ddd iiii iiii`
pub fn mov_imm(raw: RawWord) -> Instruction {
    let word = raw.value();
    Instruction::MovImm {
        rd: low_register(word, 8),
        imm: field(word, 0, 8),
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// MOV <Rd>,<Rm>
///
/// `0100 0110 Dmmm mddd`
pub fn mov_reg_t1(raw: RawWord) -> Instruction {
    let word = raw.value();
    Instruction::MovRegT1 {
        rd: split_register(word, 7, 0),
        rm: register(word, 3),
        setflags: SetFlags::Never,
    }
}

/// MOVS <Rd>,<Rm>
///
/// `0000 0000 00mm mddd`
pub fn mov_reg_t2(raw: RawWord) -> Instruction {
    let word = raw.value();
    Instruction::MovRegT2 {
        rd: low_register(word, 0),
        rm: low_register(word, 3),
        setflags: SetFlags::Always,
    }
}

/// MOV{S}.W <Rd>,<Rm>
///
/// `1110 1010 010S 1111 | 0000 dddd 0000 mmmm`
pub fn mov_reg_t3(raw: RawWord) -> Instruction {
    let word = raw.value();
    let rd = register(word, 8);
    let rm = register(word, 0);
    let s = bit(word, 20);
    let unpredictable = if s {
        rd.is_sp_or_pc() || rm.is_sp_or_pc()
    } else {
        rd == Register::Pc || rm == Register::Pc || (rd == Register::Sp && rm == Register::Sp)
    };
    if unpredictable {
        return Instruction::Unpredictable { word: raw };
    }
    Instruction::MovRegT3 {
        rd,
        rm,
        setflags: if s { SetFlags::Always } else { SetFlags::Never },
    }
}

/// Move a value into a register, updating N and Z (and setting C to
/// `carry`) per `setflags`. V is never touched.
pub fn move_value(
    regs: &mut Registers,
    rd: Register,
    value: u32,
    setflags: SetFlags,
    carry: bool,
) {
    regs.write(rd, value);
    if setflags.should_set_flags(regs) {
        regs.set_nz(value);
        regs.apsr.c = carry;
    }
}

/// Copy one register to another. A move to the PC is a branch.
pub fn move_register(
    regs: &mut Registers,
    rd: Register,
    rm: Register,
    setflags: SetFlags,
    carry: bool,
) {
    let value = regs.read(rm);
    if rd == Register::Pc {
        regs.alu_write_pc(value);
    } else {
        move_value(regs, rd, value, setflags, carry);
    }
}


// End of file
