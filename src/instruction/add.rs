//! ADD (register), ADD (SP plus register) and SUB (register).
//!
//! See ARMv7-M ARM A7.7.4, A7.7.6 and A7.7.172.

use super::{Instruction, SetFlags};
use crate::arith::{add_with_carry, decode_imm_shift};
use crate::bits::{bit, field, low_register, register, split_register};
use crate::{RawWord, Register, Registers, Shift};

/// ADDS <Rd>,<Rn>,<Rm>
///
/// `0001 100m mmnn nddd`
pub fn add_reg_t1(word: RawWord) -> Instruction {
    let word = word.value();
    Instruction::AddRegT1 {
        rd: low_register(word, 0),
        rn: low_register(word, 3),
        rm: low_register(word, 6),
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// ADD <Rdn>,<Rm>
///
/// `0100 0100 Dmmm mddd`
pub fn add_reg_t2(raw: RawWord) -> Instruction {
    let word = raw.value();
    let rd = split_register(word, 7, 0);
    let rm = register(word, 3);
    if rm == Register::Sp {
        return add_sp_reg_t1(raw);
    }
    if rd == Register::Sp {
        return add_sp_reg_t2(raw);
    }
    if rd == Register::Pc && rm == Register::Pc {
        return Instruction::Unpredictable { word: raw };
    }
    Instruction::AddRegT2 {
        rd,
        rn: rd,
        rm,
        setflags: SetFlags::Never,
    }
}

/// ADD{S}.W <Rd>,<Rn>,<Rm>{,<shift>}
///
/// `1110 1011 000S nnnn | 0iii dddd iitt mmmm`
pub fn add_reg_t3(raw: RawWord) -> Instruction {
    let word = raw.value();
    let rd = register(word, 8);
    let rn = register(word, 16);
    let rm = register(word, 0);
    let s = bit(word, 20);
    if rd == Register::Pc && s {
        // CMN (register), which we don't model
        return Instruction::Undefined { word: raw };
    }
    if rn == Register::Sp {
        return add_sp_reg_t3(raw);
    }
    if rd == Register::Sp || (rd == Register::Pc && !s) || rn == Register::Pc || rm.is_sp_or_pc()
    {
        return Instruction::Unpredictable { word: raw };
    }
    Instruction::AddRegT3 {
        rd,
        rn,
        rm,
        shift: wide_shift(word),
        setflags: if s { SetFlags::Always } else { SetFlags::Never },
    }
}

/// ADD <Rdm>,SP,<Rdm>
///
/// `0100 0100 D110 1ddd`
pub fn add_sp_reg_t1(raw: RawWord) -> Instruction {
    let rd = split_register(raw.value(), 7, 0);
    Instruction::AddSpRegT1 {
        rd,
        rm: rd,
        setflags: SetFlags::Never,
    }
}

/// ADD SP,<Rm>
///
/// `0100 0100 1mmm m101`
pub fn add_sp_reg_t2(raw: RawWord) -> Instruction {
    let rm = register(raw.value(), 3);
    if rm == Register::Sp {
        return add_sp_reg_t1(raw);
    }
    Instruction::AddSpRegT2 {
        rd: Register::Sp,
        rm,
        setflags: SetFlags::Never,
    }
}

/// ADD{S}.W <Rd>,SP,<Rm>{,<shift>}
///
/// `1110 1011 000S 1101 | 0iii dddd iitt mmmm`
pub fn add_sp_reg_t3(raw: RawWord) -> Instruction {
    let word = raw.value();
    let rd = register(word, 8);
    let rm = register(word, 0);
    let s = bit(word, 20);
    let shift = wide_shift(word);
    if rd == Register::Pc && s {
        // CMN (register)
        return Instruction::Undefined { word: raw };
    }
    if rd == Register::Sp && (shift.kind != crate::ShiftKind::Lsl || shift.amount > 3) {
        return Instruction::Unpredictable { word: raw };
    }
    if rd == Register::Pc || rm.is_sp_or_pc() {
        return Instruction::Unpredictable { word: raw };
    }
    Instruction::AddSpRegT3 {
        rd,
        rm,
        shift,
        setflags: if s { SetFlags::Always } else { SetFlags::Never },
    }
}

/// SUBS <Rd>,<Rn>,<Rm>
///
/// `0001 101m mmnn nddd`
pub fn sub_reg_t1(raw: RawWord) -> Instruction {
    let word = raw.value();
    Instruction::SubRegT1 {
        rd: low_register(word, 0),
        rn: low_register(word, 3),
        rm: low_register(word, 6),
        setflags: SetFlags::UnlessInItBlock,
    }
}

/// SUB{S}.W <Rd>,<Rn>,<Rm>{,<shift>}
///
/// `1110 1011 101S nnnn | 0iii dddd iitt mmmm`
pub fn sub_reg_t2(raw: RawWord) -> Instruction {
    let word = raw.value();
    let rd = register(word, 8);
    let rn = register(word, 16);
    let rm = register(word, 0);
    let s = bit(word, 20);
    if (rd == Register::Pc && s) || rn == Register::Sp {
        // CMP (register) and SUB (SP minus register), which we don't model
        return Instruction::Undefined { word: raw };
    }
    if rd == Register::Sp || (rd == Register::Pc && !s) || rn == Register::Pc || rm.is_sp_or_pc()
    {
        return Instruction::Unpredictable { word: raw };
    }
    Instruction::SubRegT2 {
        rd,
        rn,
        rm,
        shift: wide_shift(word),
        setflags: if s { SetFlags::Always } else { SetFlags::Never },
    }
}

/// The `imm3:imm2` and `type` fields of a 32-bit shifted register operand.
fn wide_shift(word: u32) -> Shift {
    let imm5 = (field(word, 12, 3) << 2) | field(word, 6, 2);
    decode_imm_shift(field(word, 4, 2), imm5)
}

/// Add `n` to a shifted register and write the result, updating the flags
/// per `setflags`. A write to the PC is a branch and leaves the flags alone.
pub fn add_register(
    regs: &mut Registers,
    rd: Register,
    n: u32,
    rm: Register,
    shift: Shift,
    setflags: SetFlags,
) {
    let (shifted, _) = shift.evaluate(regs.read(rm), regs.apsr.c);
    let (result, carry, overflow) = add_with_carry(n, shifted, false);
    write_result(regs, rd, result, carry, overflow, setflags);
}

/// Subtract a shifted register from `rn` and write the result, updating the
/// flags per `setflags`.
pub fn sub_register(
    regs: &mut Registers,
    rd: Register,
    rn: Register,
    rm: Register,
    shift: Shift,
    setflags: SetFlags,
) {
    let (shifted, _) = shift.evaluate(regs.read(rm), regs.apsr.c);
    let (result, carry, overflow) = add_with_carry(regs.read(rn), !shifted, true);
    write_result(regs, rd, result, carry, overflow, setflags);
}

fn write_result(
    regs: &mut Registers,
    rd: Register,
    result: u32,
    carry: bool,
    overflow: bool,
    setflags: SetFlags,
) {
    if rd == Register::Pc {
        regs.alu_write_pc(result);
        return;
    }
    regs.write(rd, result);
    if setflags.should_set_flags(regs) {
        regs.set_nz(result);
        regs.apsr.c = carry;
        regs.apsr.v = overflow;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registers::Apsr;
    use crate::{Decoder, Error};
    use pretty_assertions::assert_eq;

    fn regs(general: [u32; 13], apsr: Apsr) -> Registers {
        let mut regs = Registers::with_general(general);
        regs.apsr = apsr;
        regs
    }

    #[test]
    fn identify_add_reg_t1() {
        let decoder = Decoder::default();
        static TEST_CASES: &[(u16, bool)] = &[
            (0x1800, true),  // adds r0, r0, r0
            (0x19ff, true),  // adds r7, r7, r7
            (0x18d1, true),  // adds r1, r2, r3
            (0x0000, false), // mov r0, r0
            (0x001f, false), // mov r7, r3
            (0x2000, false), // mov r0, #0
            (0x2745, false), // mov r7, #0x45
            (0x4080, false), // lsl r0, r0, r0
            (0xffff, false),
        ];
        for &(word, valid) in TEST_CASES {
            let decoded = decoder.decode(RawWord::Half(word));
            let is_add = matches!(decoded, Ok(Instruction::AddRegT1 { .. }));
            assert_eq!(valid, is_add, "{:#06x} gave {:?}", word, decoded);
        }
    }

    #[test]
    fn decode_add_reg_t1() {
        static TEST_CASES: &[(u16, Register, Register, Register)] = &[
            (0x1800, Register::R0, Register::R0, Register::R0),
            (0x19ff, Register::R7, Register::R7, Register::R7),
            (0x18d1, Register::R1, Register::R2, Register::R3),
        ];
        for &(word, rd, rn, rm) in TEST_CASES {
            assert_eq!(
                Instruction::AddRegT1 {
                    rd,
                    rn,
                    rm,
                    setflags: SetFlags::UnlessInItBlock
                },
                add_reg_t1(RawWord::Half(word))
            );
        }
    }

    #[test]
    fn execute_add_reg_t1() {
        let instr = |rd, rn, rm| Instruction::AddRegT1 {
            rd,
            rn,
            rm,
            setflags: SetFlags::UnlessInItBlock,
        };
        use Register::*;
        let test_cases = [
            (
                instr(R0, R0, R0),
                regs([0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13], Apsr::default()),
                regs(
                    [0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13],
                    Apsr {
                        z: true,
                        ..Default::default()
                    },
                ),
            ),
            (
                instr(R0, R0, R0),
                regs(
                    [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13],
                    Apsr {
                        z: true,
                        ..Default::default()
                    },
                ),
                regs([2, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13], Apsr::default()),
            ),
            (
                instr(R1, R2, R3),
                regs([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13], Apsr::default()),
                regs([1, 7, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13], Apsr::default()),
            ),
            (
                instr(R0, R1, R2),
                regs(
                    [0, 0x7fff_ffff, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
                    Apsr::default(),
                ),
                regs(
                    [0x8000_0000, 0x7fff_ffff, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
                    Apsr {
                        n: true,
                        v: true,
                        ..Default::default()
                    },
                ),
            ),
            (
                instr(R0, R1, R1),
                regs(
                    [0, 0x8000_0000, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
                    Apsr::default(),
                ),
                regs(
                    [0, 0x8000_0000, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
                    Apsr {
                        z: true,
                        c: true,
                        v: true,
                        ..Default::default()
                    },
                ),
            ),
        ];
        for (instruction, mut before, after) in test_cases {
            instruction.execute(&mut before).unwrap();
            assert_eq!(after, before, "{}", instruction);
        }
    }

    #[test]
    fn add_reg_t1_in_it_block_keeps_flags() {
        let mut regs = regs([0; 13], Apsr::default());
        regs.epsr.it = 0x08;
        add_reg_t1(RawWord::Half(0x1800)).execute(&mut regs).unwrap();
        assert_eq!(Apsr::default(), regs.apsr);
    }

    #[test]
    fn add_reg_t2_redirects() {
        // add r0, sp -> add r0, sp, r0
        assert_eq!(
            Instruction::AddSpRegT1 {
                rd: Register::R0,
                rm: Register::R0,
                setflags: SetFlags::Never
            },
            add_reg_t2(RawWord::Half(0x4468))
        );
        // add sp, r1
        assert_eq!(
            Instruction::AddSpRegT2 {
                rd: Register::Sp,
                rm: Register::R1,
                setflags: SetFlags::Never
            },
            add_reg_t2(RawWord::Half(0x448d))
        );
        // add r9, r2
        assert_eq!(
            Instruction::AddRegT2 {
                rd: Register::R9,
                rn: Register::R9,
                rm: Register::R2,
                setflags: SetFlags::Never
            },
            add_reg_t2(RawWord::Half(0x4491))
        );
        // add pc, pc
        assert_eq!(
            Instruction::Unpredictable {
                word: RawWord::Half(0x44ff)
            },
            add_reg_t2(RawWord::Half(0x44ff))
        );
    }

    #[test]
    fn add_sp_reg_t2_redirects() {
        // add sp, sp
        assert_eq!(
            Instruction::AddSpRegT1 {
                rd: Register::Sp,
                rm: Register::Sp,
                setflags: SetFlags::Never
            },
            add_sp_reg_t2(RawWord::Half(0x44ed))
        );
    }

    #[test]
    fn add_reg_t2_leaves_flags() {
        let mut regs = Registers::new();
        regs.write(Register::R9, 0xFFFF_FFFF);
        regs.write(Register::R2, 1);
        add_reg_t2(RawWord::Half(0x4491))
            .execute(&mut regs)
            .unwrap();
        assert_eq!(0, regs.read(Register::R9));
        assert_eq!(Apsr::default(), regs.apsr);
    }

    #[test]
    fn add_to_pc_is_a_branch() {
        let mut regs = Registers::new();
        regs.write(Register::Pc, 0x100);
        regs.write(Register::R0, 0x21);
        regs.apsr.z = true;
        // add pc, r0
        let instruction = add_reg_t2(RawWord::Half(0x4487));
        instruction.execute(&mut regs).unwrap();
        assert_eq!(0x120, regs.pc());
        assert!(regs.apsr.z);

        // Not allowed in the middle of an IT block
        regs.epsr.it = 0x04;
        assert_eq!(
            Err(Error::Unpredictable(instruction)),
            instruction.execute(&mut regs)
        );
        assert_eq!(0x120, regs.pc());

        // But fine at the end of one
        regs.epsr.it = 0x08;
        instruction.execute(&mut regs).unwrap();
        assert_eq!(0x140, regs.pc());
    }

    #[test]
    fn add_sp_reg_t1_operation() {
        let mut regs = Registers::new();
        regs.set_msp(1);
        regs.write(Register::R0, 1);
        add_sp_reg_t1(RawWord::Half(0x4468))
            .execute(&mut regs)
            .unwrap();
        assert_eq!(2, regs.read(Register::R0));
    }

    #[test]
    fn add_sp_reg_uses_process_stack() {
        let mut regs = Registers::new();
        regs.set_msp(0x100);
        regs.set_psp(0x200);
        regs.control.spsel = crate::StackSelect::Psp;
        regs.write(Register::R1, 0x10);
        // add sp, r1
        add_sp_reg_t2(RawWord::Half(0x448d))
            .execute(&mut regs)
            .unwrap();
        assert_eq!(0x100, regs.msp());
        assert_eq!(0x210, regs.psp());
    }

    #[test]
    fn sub_reg_t1() {
        assert_eq!(
            Instruction::SubRegT1 {
                rd: Register::R1,
                rn: Register::R2,
                rm: Register::R3,
                setflags: SetFlags::UnlessInItBlock
            },
            super::sub_reg_t1(RawWord::Half(0x1ad1))
        );

        let mut regs = Registers::with_general([0, 0, 5, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        super::sub_reg_t1(RawWord::Half(0x1ad1))
            .execute(&mut regs)
            .unwrap();
        assert_eq!(2, regs.read(Register::R1));
        assert_eq!(
            Apsr {
                c: true,
                ..Default::default()
            },
            regs.apsr
        );

        // subs r1, r3, r2 -> 3 - 5
        super::sub_reg_t1(RawWord::Half(0x1a99))
            .execute(&mut regs)
            .unwrap();
        assert_eq!(0xFFFF_FFFE, regs.read(Register::R1));
        assert_eq!(
            Apsr {
                n: true,
                ..Default::default()
            },
            regs.apsr
        );
    }

    #[test]
    fn wide_add() {
        // add.w r1, r2, r3, lsl #2
        let word = RawWord::Word(0xEB02_0183);
        let instruction = add_reg_t3(word);
        assert_eq!(
            Instruction::AddRegT3 {
                rd: Register::R1,
                rn: Register::R2,
                rm: Register::R3,
                shift: Shift {
                    kind: crate::ShiftKind::Lsl,
                    amount: 2
                },
                setflags: SetFlags::Never
            },
            instruction
        );
        let mut regs = Registers::with_general([0, 0, 100, 5, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        instruction.execute(&mut regs).unwrap();
        assert_eq!(120, regs.read(Register::R1));

        // adds.w r0, sp, r1
        assert_eq!(
            Instruction::AddSpRegT3 {
                rd: Register::R0,
                rm: Register::R1,
                shift: Shift::NONE,
                setflags: SetFlags::Always
            },
            add_reg_t3(RawWord::Word(0xEB1D_0001))
        );

        // cmn.w r2, r3
        assert_eq!(
            Instruction::Undefined {
                word: RawWord::Word(0xEB12_0F03)
            },
            add_reg_t3(RawWord::Word(0xEB12_0F03))
        );

        // add.w r1, r2, sp
        assert_eq!(
            Instruction::Unpredictable {
                word: RawWord::Word(0xEB02_010D)
            },
            add_reg_t3(RawWord::Word(0xEB02_010D))
        );
    }

    #[test]
    fn wide_add_sp_restrictions() {
        // add.w sp, sp, r1, lsl #3 is fine
        assert!(matches!(
            add_sp_reg_t3(RawWord::Word(0xEB0D_0DC1)),
            Instruction::AddSpRegT3 { .. }
        ));
        // add.w sp, sp, r1, lsl #4 is not
        assert_eq!(
            Instruction::Unpredictable {
                word: RawWord::Word(0xEB0D_1D01)
            },
            add_sp_reg_t3(RawWord::Word(0xEB0D_1D01))
        );
    }

    #[test]
    fn wide_sub() {
        // subs.w r4, r5, r6, asr #1
        let instruction = sub_reg_t2(RawWord::Word(0xEBB5_0466));
        assert_eq!(
            Instruction::SubRegT2 {
                rd: Register::R4,
                rn: Register::R5,
                rm: Register::R6,
                shift: Shift {
                    kind: crate::ShiftKind::Asr,
                    amount: 1
                },
                setflags: SetFlags::Always
            },
            instruction
        );
        let mut regs = Registers::new();
        regs.write(Register::R5, 10);
        regs.write(Register::R6, 0xFFFF_FFFC);
        instruction.execute(&mut regs).unwrap();
        // 10 - (-2)
        assert_eq!(12, regs.read(Register::R4));
        assert!(!regs.apsr.c);
        assert!(!regs.apsr.n);

        // cmp.w r5, r6
        assert!(matches!(
            sub_reg_t2(RawWord::Word(0xEBB5_0F06)),
            Instruction::Undefined { .. }
        ));
    }
}

// End of file
