//! Decoded instructions, and what they do to the register file.
//!
//! Each variant of [`Instruction`] is one encoding of one instruction from the
//! ARMv7-M Architecture Reference Manual. The functions that build them from
//! raw words live in the submodules, grouped by instruction family, alongside
//! the helpers that carry out the operation.

use core::fmt;

use crate::{Error, RawWord, Register, Registers, Shift};

pub mod add;
pub mod misc;
pub mod mov;
pub mod shift;

/// When an instruction should update the APSR condition flags
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SetFlags {
    /// Always update the flags
    Always,
    /// Never update the flags
    Never,
    /// Update the flags unless we're in an IT block
    UnlessInItBlock,
}

impl SetFlags {
    /// Should the flags be updated, given the current register state?
    pub fn should_set_flags(self, regs: &Registers) -> bool {
        match self {
            SetFlags::Always => true,
            SetFlags::Never => false,
            SetFlags::UnlessInItBlock => !regs.in_it_block(),
        }
    }

    /// The `s` suffix used in the mnemonic of flag setting instructions
    pub fn suffix(self) -> &'static str {
        match self {
            SetFlags::Always | SetFlags::UnlessInItBlock => "s",
            SetFlags::Never => "",
        }
    }
}

/// A function which decodes one encoding from a raw word
pub type DecodeFn = fn(RawWord) -> Instruction;

/// The ARMv7-M instructions we understand
///
/// Encodings marked T1 and T2 are 16-bit unless noted. The 16-bit forms of the
/// shifts share a variant with their 32-bit forms.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// ADDS <Rd>,<Rn>,<Rm>
    AddRegT1 {
        /// Destination register
        rd: Register,
        /// First operand
        rn: Register,
        /// Second operand
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ADD <Rdn>,<Rm>
    AddRegT2 {
        /// Destination register
        rd: Register,
        /// First operand, always the same as `rd`
        rn: Register,
        /// Second operand
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ADD{S}.W <Rd>,<Rn>,<Rm>{,<shift>} (32-bit)
    AddRegT3 {
        /// Destination register
        rd: Register,
        /// First operand
        rn: Register,
        /// Second operand
        rm: Register,
        /// Shift applied to the second operand
        shift: Shift,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ADD <Rdm>,SP,<Rdm>
    AddSpRegT1 {
        /// Destination register
        rd: Register,
        /// Operand added to SP, always the same as `rd`
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ADD SP,<Rm>
    AddSpRegT2 {
        /// Destination register, always SP
        rd: Register,
        /// Operand added to SP
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ADD{S}.W <Rd>,SP,<Rm>{,<shift>} (32-bit)
    AddSpRegT3 {
        /// Destination register
        rd: Register,
        /// Operand added to SP
        rm: Register,
        /// Shift applied to `rm`
        shift: Shift,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// SUBS <Rd>,<Rn>,<Rm>
    SubRegT1 {
        /// Destination register
        rd: Register,
        /// Value to subtract from
        rn: Register,
        /// Value to subtract
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// SUB{S}.W <Rd>,<Rn>,<Rm>{,<shift>} (32-bit)
    SubRegT2 {
        /// Destination register
        rd: Register,
        /// Value to subtract from
        rn: Register,
        /// Value to subtract
        rm: Register,
        /// Shift applied to `rm`
        shift: Shift,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// MOVS <Rd>,#<imm8>
    MovImm {
        /// Which register to move the value into
        rd: Register,
        /// The zero-extended immediate value
        imm: u32,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// MOV <Rd>,<Rm>
    MovRegT1 {
        /// Which register to move into
        rd: Register,
        /// Which register to move from
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// MOVS <Rd>,<Rm>
    MovRegT2 {
        /// Which register to move into
        rd: Register,
        /// Which register to move from
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// MOV{S}.W <Rd>,<Rm> (32-bit)
    MovRegT3 {
        /// Which register to move into
        rd: Register,
        /// Which register to move from
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// LSL{S} <Rd>,<Rm>,#<imm5>
    LslImm {
        /// Destination register
        rd: Register,
        /// Register to shift
        rm: Register,
        /// Shift amount, 1 to 31
        imm: u8,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// LSL{S} <Rd>,<Rn>,<Rm>
    LslReg {
        /// Destination register
        rd: Register,
        /// Register to shift
        rn: Register,
        /// Register holding the shift amount in its bottom byte
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// LSR{S} <Rd>,<Rm>,#<imm5>
    LsrImm {
        /// Destination register
        rd: Register,
        /// Register to shift
        rm: Register,
        /// Shift amount, 1 to 32
        imm: u8,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// LSR{S} <Rd>,<Rn>,<Rm>
    LsrReg {
        /// Destination register
        rd: Register,
        /// Register to shift
        rn: Register,
        /// Register holding the shift amount in its bottom byte
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ASR{S} <Rd>,<Rm>,#<imm5>
    AsrImm {
        /// Destination register
        rd: Register,
        /// Register to shift
        rm: Register,
        /// Shift amount, 1 to 32
        imm: u8,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// ASR{S} <Rd>,<Rn>,<Rm>
    AsrReg {
        /// Destination register
        rd: Register,
        /// Register to shift
        rn: Register,
        /// Register holding the shift amount in its bottom byte
        rm: Register,
        /// Flag update policy
        setflags: SetFlags,
    },
    /// IT{x{y{z}}} <firstcond>
    It {
        /// Condition of the first instruction in the block
        firstcond: u8,
        /// Block length and then/else pattern
        mask: u8,
    },
    /// NOP, and the hints we treat as NOP
    Nop,
    /// An encoding whose behaviour the architecture leaves UNPREDICTABLE
    Unpredictable {
        /// The word that decoded to this
        word: RawWord,
    },
    /// An encoding we do not implement
    Undefined {
        /// The word that decoded to this
        word: RawWord,
    },
}

impl Instruction {
    /// Execute this instruction against the register file.
    ///
    /// The PC is not advanced; that is up to whoever fetched the instruction.
    /// UNPREDICTABLE and UNDEFINED cases return an error and leave the
    /// registers untouched.
    pub fn execute(self, regs: &mut Registers) -> Result<(), Error> {
        tracing::debug!("Executing {}", self);
        match self {
            Instruction::AddRegT1 {
                rd,
                rn,
                rm,
                setflags,
            } => {
                let n = regs.read(rn);
                add::add_register(regs, rd, n, rm, Shift::NONE, setflags);
            }
            Instruction::AddRegT2 {
                rd,
                rn,
                rm,
                setflags,
            } => {
                self.check_pc_in_it_block(regs, rd)?;
                let n = regs.read(rn);
                add::add_register(regs, rd, n, rm, Shift::NONE, setflags);
            }
            Instruction::AddRegT3 {
                rd,
                rn,
                rm,
                shift,
                setflags,
            } => {
                let n = regs.read(rn);
                add::add_register(regs, rd, n, rm, shift, setflags);
            }
            Instruction::AddSpRegT1 { rd, rm, setflags } => {
                self.check_pc_in_it_block(regs, rd)?;
                let sp = regs.sp();
                add::add_register(regs, rd, sp, rm, Shift::NONE, setflags);
            }
            Instruction::AddSpRegT2 { rd, rm, setflags } => {
                let sp = regs.sp();
                add::add_register(regs, rd, sp, rm, Shift::NONE, setflags);
            }
            Instruction::AddSpRegT3 {
                rd,
                rm,
                shift,
                setflags,
            } => {
                let sp = regs.sp();
                add::add_register(regs, rd, sp, rm, shift, setflags);
            }
            Instruction::SubRegT1 {
                rd,
                rn,
                rm,
                setflags,
            } => {
                add::sub_register(regs, rd, rn, rm, Shift::NONE, setflags);
            }
            Instruction::SubRegT2 {
                rd,
                rn,
                rm,
                shift,
                setflags,
            } => {
                add::sub_register(regs, rd, rn, rm, shift, setflags);
            }
            Instruction::MovImm { rd, imm, setflags } => {
                // A plain move leaves carry alone
                let carry = regs.apsr.c;
                mov::move_value(regs, rd, imm, setflags, carry);
            }
            Instruction::MovRegT1 { rd, rm, setflags } => {
                self.check_pc_in_it_block(regs, rd)?;
                let carry = regs.apsr.c;
                mov::move_register(regs, rd, rm, setflags, carry);
            }
            Instruction::MovRegT2 { rd, rm, setflags } => {
                if regs.in_it_block() {
                    return Err(self.unpredictable());
                }
                let carry = regs.apsr.c;
                mov::move_register(regs, rd, rm, setflags, carry);
            }
            Instruction::MovRegT3 { rd, rm, setflags } => {
                let carry = regs.apsr.c;
                mov::move_register(regs, rd, rm, setflags, carry);
            }
            Instruction::LslImm {
                rd,
                rm,
                imm,
                setflags,
            } => {
                shift::shift_immediate(regs, rd, rm, shift::lsl(imm), setflags);
            }
            Instruction::LsrImm {
                rd,
                rm,
                imm,
                setflags,
            } => {
                shift::shift_immediate(regs, rd, rm, shift::lsr(imm), setflags);
            }
            Instruction::AsrImm {
                rd,
                rm,
                imm,
                setflags,
            } => {
                shift::shift_immediate(regs, rd, rm, shift::asr(imm), setflags);
            }
            Instruction::LslReg {
                rd,
                rn,
                rm,
                setflags,
            } => {
                shift::shift_register(regs, rd, rn, rm, shift::lsl, setflags);
            }
            Instruction::LsrReg {
                rd,
                rn,
                rm,
                setflags,
            } => {
                shift::shift_register(regs, rd, rn, rm, shift::lsr, setflags);
            }
            Instruction::AsrReg {
                rd,
                rn,
                rm,
                setflags,
            } => {
                shift::shift_register(regs, rd, rn, rm, shift::asr, setflags);
            }
            Instruction::It { firstcond, mask } => {
                if regs.in_it_block() {
                    return Err(self.unpredictable());
                }
                regs.epsr.it = (firstcond << 4) | (mask & 0x0F);
            }
            Instruction::Nop => {}
            Instruction::Unpredictable { .. } => {
                return Err(self.unpredictable());
            }
            Instruction::Undefined { word } => {
                tracing::warn!("Executed UNDEFINED instruction {}", word);
                return Err(Error::Undefined(word));
            }
        }
        Ok(())
    }

    /// Writing the PC from inside an IT block is only allowed from the last
    /// instruction in the block.
    fn check_pc_in_it_block(self, regs: &Registers, rd: Register) -> Result<(), Error> {
        if rd == Register::Pc && regs.in_it_block() && !regs.last_in_it_block() {
            Err(self.unpredictable())
        } else {
            Ok(())
        }
    }

    fn unpredictable(self) -> Error {
        tracing::warn!("UNPREDICTABLE: {}", self);
        Error::Unpredictable(self)
    }

    /// The assembler mnemonic, including any `s` suffix
    pub fn mnemonic(&self) -> String {
        let (base, setflags, wide) = match self {
            Instruction::AddRegT1 { setflags, .. }
            | Instruction::AddRegT2 { setflags, .. }
            | Instruction::AddSpRegT1 { setflags, .. }
            | Instruction::AddSpRegT2 { setflags, .. } => ("add", *setflags, false),
            Instruction::AddRegT3 { setflags, .. } | Instruction::AddSpRegT3 { setflags, .. } => {
                ("add", *setflags, true)
            }
            Instruction::SubRegT1 { setflags, .. } => ("sub", *setflags, false),
            Instruction::SubRegT2 { setflags, .. } => ("sub", *setflags, true),
            Instruction::MovImm { setflags, .. }
            | Instruction::MovRegT1 { setflags, .. }
            | Instruction::MovRegT2 { setflags, .. } => ("mov", *setflags, false),
            Instruction::MovRegT3 { setflags, .. } => ("mov", *setflags, true),
            Instruction::LslImm { setflags, .. } | Instruction::LslReg { setflags, .. } => {
                ("lsl", *setflags, false)
            }
            Instruction::LsrImm { setflags, .. } | Instruction::LsrReg { setflags, .. } => {
                ("lsr", *setflags, false)
            }
            Instruction::AsrImm { setflags, .. } | Instruction::AsrReg { setflags, .. } => {
                ("asr", *setflags, false)
            }
            Instruction::It { firstcond, mask } => return misc::it_mnemonic(*firstcond, *mask),
            Instruction::Nop => return String::from("nop"),
            Instruction::Unpredictable { .. } => return String::from("unpredictable"),
            Instruction::Undefined { .. } => return String::from("undefined"),
        };
        format!(
            "{}{}{}",
            base,
            setflags.suffix(),
            if wide { ".w" } else { "" }
        )
    }
}

/// Render an optional shift as an operand suffix, like `, lsl #2`
struct ShiftSuffix(Shift);

impl fmt::Display for ShiftSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shift = self.0;
        match shift.kind {
            _ if shift.is_none() => Ok(()),
            crate::ShiftKind::Rrx => write!(f, ", rrx"),
            kind => write!(f, ", {} #{}", kind.mnemonic(), shift.amount),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match *self {
            Instruction::AddRegT1 { rd, rn, rm, .. }
            | Instruction::AddRegT2 { rd, rn, rm, .. }
            | Instruction::SubRegT1 { rd, rn, rm, .. }
            | Instruction::LslReg { rd, rn, rm, .. }
            | Instruction::LsrReg { rd, rn, rm, .. }
            | Instruction::AsrReg { rd, rn, rm, .. } => {
                write!(f, "{} {}, {}, {}", mnemonic, rd, rn, rm)
            }
            Instruction::AddRegT3 {
                rd, rn, rm, shift, ..
            }
            | Instruction::SubRegT2 {
                rd, rn, rm, shift, ..
            } => write!(
                f,
                "{} {}, {}, {}{}",
                mnemonic,
                rd,
                rn,
                rm,
                ShiftSuffix(shift)
            ),
            Instruction::AddSpRegT1 { rd, rm, .. } | Instruction::AddSpRegT2 { rd, rm, .. } => {
                write!(f, "{} {}, sp, {}", mnemonic, rd, rm)
            }
            Instruction::AddSpRegT3 { rd, rm, shift, .. } => {
                write!(f, "{} {}, sp, {}{}", mnemonic, rd, rm, ShiftSuffix(shift))
            }
            Instruction::MovImm { rd, imm, .. } => write!(f, "{} {}, #{:#x}", mnemonic, rd, imm),
            Instruction::MovRegT1 { rd, rm, .. }
            | Instruction::MovRegT2 { rd, rm, .. }
            | Instruction::MovRegT3 { rd, rm, .. } => write!(f, "{} {}, {}", mnemonic, rd, rm),
            Instruction::LslImm { rd, rm, imm, .. }
            | Instruction::LsrImm { rd, rm, imm, .. }
            | Instruction::AsrImm { rd, rm, imm, .. } => {
                write!(f, "{} {}, {}, #{}", mnemonic, rd, rm, imm)
            }
            Instruction::It { firstcond, .. } => {
                write!(f, "{} {}", mnemonic, crate::Condition::from(firstcond).mnemonic())
            }
            Instruction::Nop => write!(f, "{}", mnemonic),
            Instruction::Unpredictable { word } | Instruction::Undefined { word } => {
                write!(f, "{} {}", mnemonic, word)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flag_policy() {
        let mut regs = Registers::new();
        assert!(SetFlags::Always.should_set_flags(&regs));
        assert!(!SetFlags::Never.should_set_flags(&regs));
        assert!(SetFlags::UnlessInItBlock.should_set_flags(&regs));
        regs.epsr.it = 0x08;
        assert!(SetFlags::Always.should_set_flags(&regs));
        assert!(!SetFlags::Never.should_set_flags(&regs));
        assert!(!SetFlags::UnlessInItBlock.should_set_flags(&regs));
    }

    #[test]
    fn rendering() {
        static TEST_CASES: &[(Instruction, &str)] = &[
            (
                Instruction::AddRegT1 {
                    rd: Register::R1,
                    rn: Register::R2,
                    rm: Register::R3,
                    setflags: SetFlags::UnlessInItBlock,
                },
                "adds r1, r2, r3",
            ),
            (
                Instruction::AddSpRegT1 {
                    rd: Register::R0,
                    rm: Register::R0,
                    setflags: SetFlags::Never,
                },
                "add r0, sp, r0",
            ),
            (
                Instruction::MovImm {
                    rd: Register::R7,
                    imm: 0x45,
                    setflags: SetFlags::UnlessInItBlock,
                },
                "movs r7, #0x45",
            ),
            (
                Instruction::MovRegT1 {
                    rd: Register::Lr,
                    rm: Register::R0,
                    setflags: SetFlags::Never,
                },
                "mov lr, r0",
            ),
            (
                Instruction::LsrImm {
                    rd: Register::R7,
                    rm: Register::R4,
                    imm: 7,
                    setflags: SetFlags::UnlessInItBlock,
                },
                "lsrs r7, r4, #7",
            ),
            (
                Instruction::AddRegT3 {
                    rd: Register::R1,
                    rn: Register::R2,
                    rm: Register::R3,
                    shift: Shift {
                        kind: crate::ShiftKind::Lsl,
                        amount: 2,
                    },
                    setflags: SetFlags::Never,
                },
                "add.w r1, r2, r3, lsl #2",
            ),
            (
                Instruction::SubRegT2 {
                    rd: Register::R1,
                    rn: Register::R2,
                    rm: Register::R3,
                    shift: Shift::NONE,
                    setflags: SetFlags::Always,
                },
                "subs.w r1, r2, r3",
            ),
            (
                Instruction::It {
                    firstcond: 0,
                    mask: 0b1100,
                },
                "ite eq",
            ),
            (Instruction::Nop, "nop"),
        ];
        for (instruction, text) in TEST_CASES {
            assert_eq!(*text, instruction.to_string());
        }
    }

    #[test]
    fn placeholders_do_nothing() {
        let before = Registers::with_general([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13]);
        let mut regs = before.clone();
        let unpredictable = Instruction::Unpredictable {
            word: RawWord::Word(0xEB0D_0F00),
        };
        assert_eq!(
            Err(Error::Unpredictable(unpredictable)),
            unpredictable.execute(&mut regs)
        );
        let undefined = Instruction::Undefined {
            word: RawWord::Half(0xDE00),
        };
        assert_eq!(
            Err(Error::Undefined(RawWord::Half(0xDE00))),
            undefined.execute(&mut regs)
        );
        assert_eq!(before, regs);
        assert_eq!(Ok(()), Instruction::Nop.execute(&mut regs));
        assert_eq!(before, regs);
    }
}

// End of file
