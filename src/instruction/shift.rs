//! LSL, LSR and ASR, by immediate and by register.
//!
//! See ARMv7-M ARM A7.7.67 to A7.7.71 and A7.7.10 to A7.7.11.

use super::{mov, Instruction, SetFlags};
use crate::bits::{bit, field, low_register, register};
use crate::{RawWord, Register, Registers, Shift, ShiftKind};

/// A logical shift left by `amount`
pub fn lsl(amount: u8) -> Shift {
    Shift {
        kind: ShiftKind::Lsl,
        amount,
    }
}

/// A logical shift right by `amount`
pub fn lsr(amount: u8) -> Shift {
    Shift {
        kind: ShiftKind::Lsr,
        amount,
    }
}

/// An arithmetic shift right by `amount`
pub fn asr(amount: u8) -> Shift {
    Shift {
        kind: ShiftKind::Asr,
        amount,
    }
}

/// An `imm5` field of zero means a shift by 32 for LSR and ASR.
fn right_shift_amount(imm5: u32) -> u8 {
    if imm5 == 0 {
        32
    } else {
        imm5 as u8
    }
}

/// LSLS <Rd>,<Rm>,#<imm5>
///
/// `0000 0iii iimm mddd`. A shift of zero is MOVS <Rd>,<Rm>.
pub fn lsl_imm_t1(raw: RawWord) -> Instruction {
    let word = raw.value();
    let imm5 = field(word, 6, 5);
    if imm5 == 0 {
        return mov::mov_reg_t2(raw);
    }
    Instruction::LslImm {
        rd: low_register(word, 0),
        rm: low_register(word, 3),
        imm: imm5 as u8,
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// LSRS <Rd>,<Rm>,#<imm5>
///
/// `0000 1iii iimm mddd`
pub fn lsr_imm_t1(raw: RawWord) -> Instruction {
    let word = raw.value();
    Instruction::LsrImm {
        rd: low_register(word, 0),
        rm: low_register(word, 3),
        imm: right_shift_amount(field(word, 6, 5)),
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// ASRS <Rd>,<Rm>,#<imm5>
///
/// `0001 0iii iimm mddd`
pub fn asr_imm_t1(raw: RawWord) -> Instruction {
    let word = raw.value();
    Instruction::AsrImm {
        rd: low_register(word, 0),
        rm: low_register(word, 3),
        imm: right_shift_amount(field(word, 6, 5)),
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// The `Rdn` and `Rm` fields shared by the 16-bit shift by register forms.
fn narrow_register_fields(word: u32) -> (Register, Register) {
    (low_register(word, 0), low_register(word, 3))
}

/// LSLS <Rdn>,<Rm>
///
/// `0100 0000 10mm mddd`
pub fn lsl_reg_t1(raw: RawWord) -> Instruction {
    let (rdn, rm) = narrow_register_fields(raw.value());
    Instruction::LslReg {
        rd: rdn,
        rn: rdn,
        rm,
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// LSRS <Rdn>,<Rm>
///
/// `0100 0000 11mm mddd`
pub fn lsr_reg_t1(raw: RawWord) -> Instruction {
    let (rdn, rm) = narrow_register_fields(raw.value());
    Instruction::LsrReg {
        rd: rdn,
        rn: rdn,
        rm,
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// ASRS <Rdn>,<Rm>
///
/// `0100 0001 00mm mddd`
pub fn asr_reg_t1(raw: RawWord) -> Instruction {
    let (rdn, rm) = narrow_register_fields(raw.value());
    Instruction::AsrReg {
        rd: rdn,
        rn: rdn,
        rm,
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// The fields of `1110 1010 010S 1111 | 0iii dddd iitt mmmm`, or `None`
/// if the registers make it UNPREDICTABLE.
fn wide_immediate_fields(word: u32) -> Option<(Register, Register, u32, SetFlags)> {
    let rd = register(word, 8);
    let rm = register(word, 0);
    if rd.is_sp_or_pc() || rm.is_sp_or_pc() {
        return None;
    }
    let imm5 = (field(word, 12, 3) << 2) | field(word, 6, 2);
    let setflags = if bit(word, 20) {
        SetFlags::Always
    } else {
        SetFlags::Never
    };
    Some((rd, rm, imm5, setflags))
}

/// LSL{S}.W <Rd>,<Rm>,#<imm5>
///
/// A shift of zero is MOV{S}.W <Rd>,<Rm>.
pub fn lsl_imm_t2(raw: RawWord) -> Instruction {
    let word = raw.value();
    if field(word, 12, 3) == 0 && field(word, 6, 2) == 0 {
        return mov::mov_reg_t3(raw);
    }
    match wide_immediate_fields(word) {
        Some((rd, rm, imm5, setflags)) => Instruction::LslImm {
            rd,
            rm,
            imm: imm5 as u8,
            setflags,
        },
        None => Instruction::Unpredictable { word: raw },
    }
}

/// LSR{S}.W <Rd>,<Rm>,#<imm5>
pub fn lsr_imm_t2(raw: RawWord) -> Instruction {
    match wide_immediate_fields(raw.value()) {
        Some((rd, rm, imm5, setflags)) => Instruction::LsrImm {
            rd,
            rm,
            imm: right_shift_amount(imm5),
            setflags,
        },
        None => Instruction::Unpredictable { word: raw },
    }
}

/// ASR{S}.W <Rd>,<Rm>,#<imm5>
pub fn asr_imm_t2(raw: RawWord) -> Instruction {
    match wide_immediate_fields(raw.value()) {
        Some((rd, rm, imm5, setflags)) => Instruction::AsrImm {
            rd,
            rm,
            imm: right_shift_amount(imm5),
            setflags,
        },
        None => Instruction::Unpredictable { word: raw },
    }
}

/// The fields of `1111 1010 0ttS nnnn | 1111 dddd 0000 mmmm`, or `None`
/// if the registers make it UNPREDICTABLE.
fn wide_register_fields(word: u32) -> Option<(Register, Register, Register, SetFlags)> {
    let rd = register(word, 8);
    let rn = register(word, 16);
    let rm = register(word, 0);
    if rd.is_sp_or_pc() || rn.is_sp_or_pc() || rm.is_sp_or_pc() {
        return None;
    }
    let setflags = if bit(word, 20) {
        SetFlags::Always
    } else {
        SetFlags::Never
    };
    Some((rd, rn, rm, setflags))
}

/// LSL{S}.W <Rd>,<Rn>,<Rm>
pub fn lsl_reg_t2(raw: RawWord) -> Instruction {
    match wide_register_fields(raw.value()) {
        Some((rd, rn, rm, setflags)) => Instruction::LslReg {
            rd,
            rn,
            rm,
            setflags,
        },
        None => Instruction::Unpredictable { word: raw },
    }
}

/// LSR{S}.W <Rd>,<Rn>,<Rm>
pub fn lsr_reg_t2(raw: RawWord) -> Instruction {
    match wide_register_fields(raw.value()) {
        Some((rd, rn, rm, setflags)) => Instruction::LsrReg {
            rd,
            rn,
            rm,
            setflags,
        },
        None => Instruction::Unpredictable { word: raw },
    }
}

/// ASR{S}.W <Rd>,<Rn>,<Rm>
pub fn asr_reg_t2(raw: RawWord) -> Instruction {
    match wide_register_fields(raw.value()) {
        Some((rd, rn, rm, setflags)) => Instruction::AsrReg {
            rd,
            rn,
            rm,
            setflags,
        },
        None => Instruction::Unpredictable { word: raw },
    }
}

/// Shift `value` and store it, updating N, Z and C per `setflags`.
fn shift_op(regs: &mut Registers, rd: Register, value: u32, shift: Shift, setflags: SetFlags) {
    let (result, carry) = shift.evaluate(value, regs.apsr.c);
    regs.write(rd, result);
    if setflags.should_set_flags(regs) {
        regs.set_nz(result);
        regs.apsr.c = carry;
    }
}

/// Shift `rm` by a fixed amount into `rd`.
pub fn shift_immediate(
    regs: &mut Registers,
    rd: Register,
    rm: Register,
    shift: Shift,
    setflags: SetFlags,
) {
    let value = regs.read(rm);
    shift_op(regs, rd, value, shift, setflags);
}

/// Shift `rn` by the bottom byte of `rm` into `rd`.
pub fn shift_register(
    regs: &mut Registers,
    rd: Register,
    rn: Register,
    rm: Register,
    kind: fn(u8) -> Shift,
    setflags: SetFlags,
) {
    let amount = regs.read(rm) as u8;
    let value = regs.read(rn);
    shift_op(regs, rd, value, kind(amount), setflags);
}


// End of file
