//! Turning a stream of halfwords into [`Instruction`]s.
//!
//! Each encoding we know about is an [`Opcode`] (a mask and a value, exactly
//! as drawn in the encoding diagrams of the Architecture Reference Manual)
//! paired with the function which pulls the fields out. Where two patterns
//! overlap, the decode functions agree on the answer, so the order of the
//! table doesn't matter.

use core::fmt;

use crate::bits::is_wide_prefix;
use crate::instruction::{add, misc, mov, shift, DecodeFn, Instruction};
use crate::Error;

/// A raw instruction encoding, as read from the instruction stream
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RawWord {
    /// A 16-bit Thumb instruction
    Half(u16),
    /// A 32-bit Thumb instruction, with the first halfword in the top half
    Word(u32),
}

impl RawWord {
    /// Join the two halfwords of a 32-bit instruction.
    pub fn extend(upper: u16, lower: u16) -> RawWord {
        RawWord::Word((u32::from(upper) << 16) | u32::from(lower))
    }

    /// The encoding, zero extended to 32 bits
    pub fn value(self) -> u32 {
        match self {
            RawWord::Half(hw) => u32::from(hw),
            RawWord::Word(w) => w,
        }
    }

    /// Is this a 32-bit instruction?
    pub fn is_wide(self) -> bool {
        matches!(self, RawWord::Word(_))
    }
}

impl fmt::Display for RawWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawWord::Half(hw) => write!(f, "0x{:04x}", hw),
            RawWord::Word(w) => write!(f, "0x{:08x}", w),
        }
    }
}

/// A bit pattern which identifies one encoding
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Opcode {
    /// Which bits are fixed by the encoding
    pub mask: u32,
    /// What those bits must be
    pub value: u32,
}

impl Opcode {
    /// Make a new pattern. Bits in `value` outside of `mask` are not allowed.
    pub const fn new(mask: u32, value: u32) -> Opcode {
        Opcode { mask, value }
    }

    /// Does this word have our fixed bits?
    pub fn matches(self, word: u32) -> bool {
        (word & self.mask) == self.value
    }
}

/// One row of an [`OpcodeTable`]
#[derive(Copy, Clone)]
struct Entry {
    opcode: Opcode,
    decode: DecodeFn,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("mask", &format_args!("{:#x}", self.opcode.mask))
            .field("value", &format_args!("{:#x}", self.opcode.value))
            .finish()
    }
}

/// The encodings we can decode, split by instruction width
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    narrow: Vec<Entry>,
    wide: Vec<Entry>,
}

impl OpcodeTable {
    /// An empty table, which decodes nothing.
    pub fn new() -> OpcodeTable {
        OpcodeTable {
            narrow: Vec::new(),
            wide: Vec::new(),
        }
    }

    /// Add a 16-bit encoding.
    pub fn with_narrow(mut self, mask: u16, value: u16, decode: DecodeFn) -> OpcodeTable {
        self.narrow.push(Entry {
            opcode: Opcode::new(u32::from(mask), u32::from(value)),
            decode,
        });
        self
    }

    /// Add a 32-bit encoding.
    pub fn with_wide(mut self, mask: u32, value: u32, decode: DecodeFn) -> OpcodeTable {
        self.wide.push(Entry {
            opcode: Opcode::new(mask, value),
            decode,
        });
        self
    }

    /// Every encoding this simulator supports.
    pub fn armv7m() -> OpcodeTable {
        OpcodeTable::new()
            // Shift (immediate), add, subtract, move and compare
            .with_narrow(0xf800, 0x0000, shift::lsl_imm_t1)
            .with_narrow(0xffc0, 0x0000, mov::mov_reg_t2)
            .with_narrow(0xf800, 0x0800, shift::lsr_imm_t1)
            .with_narrow(0xf800, 0x1000, shift::asr_imm_t1)
            .with_narrow(0xfe00, 0x1800, add::add_reg_t1)
            .with_narrow(0xfe00, 0x1a00, add::sub_reg_t1)
            .with_narrow(0xf800, 0x2000, mov::mov_imm)
            // Data processing
            .with_narrow(0xffc0, 0x4080, shift::lsl_reg_t1)
            .with_narrow(0xffc0, 0x40c0, shift::lsr_reg_t1)
            .with_narrow(0xffc0, 0x4100, shift::asr_reg_t1)
            // Special data instructions
            .with_narrow(0xff00, 0x4400, add::add_reg_t2)
            .with_narrow(0xff78, 0x4468, add::add_sp_reg_t1)
            .with_narrow(0xff87, 0x4485, add::add_sp_reg_t2)
            .with_narrow(0xff00, 0x4600, mov::mov_reg_t1)
            // IT and hints
            .with_narrow(0xff00, 0xbf00, misc::it_hint)
            // Data processing (shifted register)
            .with_wide(0xffe0_8000, 0xeb00_0000, add::add_reg_t3)
            .with_wide(0xffef_8000, 0xeb0d_0000, add::add_sp_reg_t3)
            .with_wide(0xffe0_8000, 0xeba0_0000, add::sub_reg_t2)
            .with_wide(0xffef_f0f0, 0xea4f_0000, mov::mov_reg_t3)
            .with_wide(0xffef_8030, 0xea4f_0000, shift::lsl_imm_t2)
            .with_wide(0xffef_8030, 0xea4f_0010, shift::lsr_imm_t2)
            .with_wide(0xffef_8030, 0xea4f_0020, shift::asr_imm_t2)
            // Data processing (register)
            .with_wide(0xffe0_f0f0, 0xfa00_f000, shift::lsl_reg_t2)
            .with_wide(0xffe0_f0f0, 0xfa20_f000, shift::lsr_reg_t2)
            .with_wide(0xffe0_f0f0, 0xfa40_f000, shift::asr_reg_t2)
    }

    /// The same encodings, tried in the opposite order.
    pub fn reversed(mut self) -> OpcodeTable {
        self.narrow.reverse();
        self.wide.reverse();
        self
    }

    /// Find the decode function for a complete instruction.
    fn lookup(&self, word: RawWord) -> Option<DecodeFn> {
        let entries = if word.is_wide() {
            &self.wide
        } else {
            &self.narrow
        };
        entries
            .iter()
            .find(|entry| entry.opcode.matches(word.value()))
            .map(|entry| entry.decode)
    }
}

impl Default for OpcodeTable {
    fn default() -> OpcodeTable {
        OpcodeTable::armv7m()
    }
}

/// A successfully decoded instruction, and the encoding it came from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The encoding we decoded
    pub word: RawWord,
    /// What it decoded to
    pub instruction: Instruction,
}

/// Decodes Thumb instructions, holding on to the first half of a 32-bit
/// instruction until the second half arrives.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    table: OpcodeTable,
    pending: Option<u16>,
}

impl Decoder {
    /// Make a decoder which uses the given table.
    pub fn new(table: OpcodeTable) -> Decoder {
        Decoder {
            table,
            pending: None,
        }
    }

    /// Decode a complete instruction.
    ///
    /// Gives `Error::Incomplete` if given the first half of a 32-bit
    /// instruction, or `Error::Undefined` if no encoding matches.
    pub fn decode(&self, word: RawWord) -> Result<Instruction, Error> {
        if let RawWord::Half(hw) = word {
            if is_wide_prefix(hw) {
                return Err(Error::Incomplete);
            }
        }
        match self.table.lookup(word) {
            Some(decode) => {
                let instruction = decode(word);
                tracing::trace!("{} => {:?}", word, instruction);
                Ok(instruction)
            }
            None => {
                tracing::debug!("No encoding matches {}", word);
                Err(Error::Undefined(word))
            }
        }
    }

    /// Push the next halfword from the instruction stream.
    ///
    /// The first half of a 32-bit instruction is held until the next call,
    /// and gives `Error::Incomplete`.
    pub fn feed(&mut self, halfword: u16) -> Result<Decoded, Error> {
        let word = match self.pending.take() {
            Some(upper) => RawWord::extend(upper, halfword),
            None if is_wide_prefix(halfword) => {
                self.pending = Some(halfword);
                return Err(Error::Incomplete);
            }
            None => RawWord::Half(halfword),
        };
        let instruction = self.decode(word)?;
        Ok(Decoded { word, instruction })
    }

    /// The first half of a 32-bit instruction, if we're waiting for the
    /// second half.
    pub fn pending(&self) -> Option<u16> {
        self.pending
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::SetFlags;
    use crate::Register;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn raw_words() {
        assert_eq!(RawWord::Word(0xEB02_0183), RawWord::extend(0xEB02, 0x0183));
        assert_eq!("0x0040", RawWord::Half(0x0040).to_string());
        assert_eq!("0xeb020183", RawWord::Word(0xEB02_0183).to_string());
        assert_eq!(0x0040, RawWord::Half(0x0040).value());
        assert!(!RawWord::Half(0xEB02).is_wide());
    }

    #[test]
    fn opcode_match() {
        let opcode = Opcode::new(0xfe00, 0x1800);
        assert!(opcode.matches(0x1800));
        assert!(opcode.matches(0x19ff));
        assert!(!opcode.matches(0x1a00));
    }

    #[test]
    fn every_halfword_decodes() {
        let decoder = Decoder::default();
        for hw in 0..=u16::MAX {
            match decoder.decode(RawWord::Half(hw)) {
                Err(Error::Incomplete) => assert!(is_wide_prefix(hw), "{:#06x}", hw),
                Err(Error::Undefined(word)) => {
                    assert!(!is_wide_prefix(hw), "{:#06x}", hw);
                    assert_eq!(RawWord::Half(hw), word);
                }
                Err(e) => panic!("{:#06x} gave {:?}", hw, e),
                Ok(_) => assert!(!is_wide_prefix(hw), "{:#06x}", hw),
            }
        }
    }

    #[test]
    fn table_order_does_not_matter() {
        let forwards = Decoder::default();
        let backwards = Decoder::new(OpcodeTable::armv7m().reversed());
        for hw in 0..=u16::MAX {
            assert_eq!(
                forwards.decode(RawWord::Half(hw)),
                backwards.decode(RawWord::Half(hw)),
                "{:#06x}",
                hw
            );
        }
    }

    proptest! {
        #[test]
        fn wide_table_order_does_not_matter(
            upper in prop::sample::select(vec![0xEA4Fu16, 0xEA5F, 0xEB0D, 0xEB1D, 0xEB02, 0xEBB5, 0xFA0F, 0xFA51]),
            lower in any::<u16>(),
        ) {
            let forwards = Decoder::default();
            let backwards = Decoder::new(OpcodeTable::armv7m().reversed());
            let word = RawWord::extend(upper, lower);
            prop_assert_eq!(forwards.decode(word), backwards.decode(word));
        }
    }

    #[test]
    fn lsl_zero_is_mov() {
        let decoder = Decoder::default();
        let lsl = decoder.decode(RawWord::Half(0x0000));
        assert_eq!(
            Ok(Instruction::MovRegT2 {
                rd: Register::R0,
                rm: Register::R0,
                setflags: SetFlags::Always
            }),
            lsl
        );
        // Both move r0 into r0
        let mut lsl_regs = crate::Registers::with_general([5; 13]);
        let mut mov_regs = lsl_regs.clone();
        lsl.unwrap().execute(&mut lsl_regs).unwrap();
        decoder
            .decode(RawWord::Half(0x4600))
            .unwrap()
            .execute(&mut mov_regs)
            .unwrap();
        assert_eq!(lsl_regs.read(Register::R0), mov_regs.read(Register::R0));
    }

    #[test]
    fn undefined() {
        let decoder = Decoder::default();
        // udf #0
        assert_eq!(
            Err(Error::Undefined(RawWord::Half(0xDE00))),
            decoder.decode(RawWord::Half(0xDE00))
        );
        // bl
        assert_eq!(
            Err(Error::Undefined(RawWord::Word(0xF000_F800))),
            decoder.decode(RawWord::Word(0xF000_F800))
        );
    }

    #[test]
    fn feed_narrow() {
        let mut decoder = Decoder::default();
        assert_eq!(
            Ok(Decoded {
                word: RawWord::Half(0x18d1),
                instruction: Instruction::AddRegT1 {
                    rd: Register::R1,
                    rn: Register::R2,
                    rm: Register::R3,
                    setflags: SetFlags::UnlessInItBlock
                }
            }),
            decoder.feed(0x18d1)
        );
        assert_eq!(None, decoder.pending());
    }

    #[test]
    fn feed_wide() {
        let mut decoder = Decoder::default();
        assert_eq!(Err(Error::Incomplete), decoder.feed(0xEB02));
        assert_eq!(Some(0xEB02), decoder.pending());
        let decoded = decoder.feed(0x0183).unwrap();
        assert_eq!(RawWord::Word(0xEB02_0183), decoded.word);
        assert!(matches!(decoded.instruction, Instruction::AddRegT3 { .. }));
        assert_eq!(None, decoder.pending());

        // An undefined 32-bit instruction still uses up both halves
        assert_eq!(Err(Error::Incomplete), decoder.feed(0xF000));
        assert_eq!(
            Err(Error::Undefined(RawWord::Word(0xF000_F800))),
            decoder.feed(0xF800)
        );
        assert_eq!(None, decoder.pending());
        assert!(decoder.feed(0x0040).is_ok());
    }

    #[test]
    fn second_half_looks_like_a_prefix() {
        let mut decoder = Decoder::default();
        // lsl.w r0, r1, r2 has a second half of 0xF002
        assert_eq!(Err(Error::Incomplete), decoder.feed(0xFA01));
        let decoded = decoder.feed(0xF002).unwrap();
        assert_eq!(
            Instruction::LslReg {
                rd: Register::R0,
                rn: Register::R1,
                rm: Register::R2,
                setflags: SetFlags::Never
            },
            decoded.instruction
        );
    }
}

// End of file
