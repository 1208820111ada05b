//! An ARMv7-M instruction set simulator.
//!
//! Feed it a stream of Thumb halfwords and it will decode them, and can then
//! execute them against a register file. Only a handful of the data
//! processing instructions are supported so far, but adding one is a matter
//! of adding a variant to [`Instruction`] and a row to the [`OpcodeTable`].
//!
//! There is no memory, and nothing advances the program counter apart from
//! instructions which write to it.

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

pub mod arith;
pub mod bits;
pub mod decode;
pub mod instruction;
pub mod registers;

pub use arith::{Shift, ShiftKind};
pub use decode::{Decoded, Decoder, Opcode, OpcodeTable, RawWord};
pub use instruction::{Instruction, SetFlags};
pub use registers::{Condition, Mode, Register, Registers, StackSelect};

/// All the ways we can fail to decode or execute code
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Got the first half of a 32-bit instruction. Supply the second half.
    #[error("incomplete 32-bit instruction")]
    Incomplete,
    /// Did not understand this instruction
    #[error("undefined instruction {0}")]
    Undefined(RawWord),
    /// The architecture doesn't say what this does in the current state, so
    /// we didn't do anything.
    #[error("unpredictable instruction: {0}")]
    Unpredictable(Instruction),
}

/// An ARMv7-M processor core
#[derive(Debug, Clone, Default)]
pub struct Armv7M {
    regs: Registers,
    decoder: Decoder,
}

impl Armv7M {
    /// Make a new core with every register zeroed.
    pub fn new() -> Armv7M {
        Armv7M::default()
    }

    /// Make a new core with the given register contents.
    pub fn with_registers(regs: Registers) -> Armv7M {
        Armv7M {
            regs,
            decoder: Decoder::default(),
        }
    }

    /// Look at the register file
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Change the register file
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Decode the next halfword from the instruction stream.
    ///
    /// Gives `Error::Incomplete` for the first half of a 32-bit instruction.
    pub fn feed(&mut self, halfword: u16) -> Result<Decoded, Error> {
        self.decoder.feed(halfword)
    }

    /// The first half of a 32-bit instruction, if we're waiting for the
    /// second half.
    pub fn pending(&self) -> Option<u16> {
        self.decoder.pending()
    }

    /// Decode the next halfword and, if that completes an instruction,
    /// execute it.
    pub fn step(&mut self, halfword: u16) -> Result<Decoded, Error> {
        let decoded = self.feed(halfword)?;
        self.execute(decoded.instruction)?;
        Ok(decoded)
    }

    /// Execute an instruction.
    ///
    /// Inside an IT block, the instruction only runs if the current IT
    /// condition passes, and the IT state moves on afterwards either way.
    /// If the instruction is UNPREDICTABLE or UNDEFINED nothing changes,
    /// including the IT state.
    pub fn execute(&mut self, instruction: Instruction) -> Result<(), Error> {
        let conditional =
            self.regs.in_it_block() && !matches!(instruction, Instruction::It { .. });
        if conditional && !self.regs.condition_passed() {
            tracing::debug!(
                "Skipping {}, condition {} failed",
                instruction,
                self.regs.current_condition().mnemonic()
            );
            self.regs.it_advance();
            return Ok(());
        }
        instruction.execute(&mut self.regs)?;
        if conditional {
            self.regs.it_advance();
        }
        Ok(())
    }
}


// End of file
