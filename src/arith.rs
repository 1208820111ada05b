//! Add and shift primitives that produce a result plus carry and overflow.
//!
//! These follow the pseudocode functions of the same name in the ARMv7-M
//! Architecture Reference Manual (A2.2.1).

/// Adds two 32-bit numbers, with carry in, producing a result, carry out, and overflow.
pub fn add_with_carry(x: u32, y: u32, carry_in: bool) -> (u32, bool, bool) {
    let unsigned_sum = u64::from(x) + u64::from(y) + u64::from(carry_in);
    let signed_sum = i64::from(x as i32) + i64::from(y as i32) + i64::from(carry_in);
    let result = unsigned_sum as u32;
    // Did we carry into the 33rd bit?
    let carry_out = u64::from(result) != unsigned_sum;
    // Does the signed result still fit in 32 bits?
    let overflow = i64::from(result as i32) != signed_sum;
    tracing::trace!(
        "add_with_carry {:#x} + {:#x} + {} -> {:#x} {} {}",
        x,
        y,
        carry_in,
        result,
        carry_out,
        overflow
    );
    (result, carry_out, overflow)
}

/// Logical shift left by a non-zero amount, producing a result and carry out.
pub fn lsl_c(value: u32, amount: u8) -> (u32, bool) {
    debug_assert!(amount > 0);
    if amount > 32 {
        return (0, false);
    }
    let extended = u64::from(value) << amount;
    (extended as u32, extended & (1 << 32) != 0)
}

/// Logical shift right by a non-zero amount, producing a result and carry out.
pub fn lsr_c(value: u32, amount: u8) -> (u32, bool) {
    debug_assert!(amount > 0);
    match amount {
        33.. => (0, false),
        32 => (0, value & 0x8000_0000 != 0),
        _ => {
            // The last bit shifted out becomes the carry
            let carry_out = (value >> (amount - 1)) & 1 != 0;
            (value >> amount, carry_out)
        }
    }
}

/// Arithmetic shift right by a non-zero amount, producing a result and carry out.
pub fn asr_c(value: u32, amount: u8) -> (u32, bool) {
    debug_assert!(amount > 0);
    if amount >= 32 {
        // Everything shifted out, only copies of the sign bit remain
        let negative = value & 0x8000_0000 != 0;
        return (if negative { 0xFFFF_FFFF } else { 0 }, negative);
    }
    let carry_out = (value >> (amount - 1)) & 1 != 0;
    (((value as i32) >> amount) as u32, carry_out)
}

/// Rotate right by a non-zero amount, producing a result and carry out.
pub fn ror_c(value: u32, amount: u8) -> (u32, bool) {
    debug_assert!(amount > 0);
    let result = value.rotate_right(u32::from(amount % 32));
    (result, result & 0x8000_0000 != 0)
}

/// Rotate right by one through the carry flag.
pub fn rrx_c(value: u32, carry_in: bool) -> (u32, bool) {
    let result = (u32::from(carry_in) << 31) | (value >> 1);
    (result, value & 1 != 0)
}

/// The kinds of shift an instruction can apply to a register operand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShiftKind {
    /// Logical shift left
    Lsl,
    /// Logical shift right
    Lsr,
    /// Arithmetic shift right
    Asr,
    /// Rotate right
    Ror,
    /// Rotate right by one, through carry
    Rrx,
}

impl ShiftKind {
    /// The assembler name for this shift
    pub fn mnemonic(self) -> &'static str {
        match self {
            ShiftKind::Lsl => "lsl",
            ShiftKind::Lsr => "lsr",
            ShiftKind::Asr => "asr",
            ShiftKind::Ror => "ror",
            ShiftKind::Rrx => "rrx",
        }
    }
}

/// A shift to apply to an operand, evaluated when the instruction executes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Shift {
    /// Which shift function to apply
    pub kind: ShiftKind,
    /// How far to shift
    pub amount: u8,
}

impl Shift {
    /// A shift that leaves the operand alone.
    pub const NONE: Shift = Shift {
        kind: ShiftKind::Lsl,
        amount: 0,
    };

    /// Shift `value`, producing a result and carry out.
    ///
    /// A zero amount gives back `value` and passes `carry_in` straight
    /// through, so the shift primitives never see a zero amount.
    pub fn evaluate(self, value: u32, carry_in: bool) -> (u32, bool) {
        if self.amount == 0 {
            return (value, carry_in);
        }
        match self.kind {
            ShiftKind::Lsl => lsl_c(value, self.amount),
            ShiftKind::Lsr => lsr_c(value, self.amount),
            ShiftKind::Asr => asr_c(value, self.amount),
            ShiftKind::Ror => ror_c(value, self.amount),
            ShiftKind::Rrx => rrx_c(value, carry_in),
        }
    }

    /// Is this a shift that changes nothing?
    pub fn is_none(self) -> bool {
        self.amount == 0
    }
}

/// Decode the two bit shift type and five bit immediate used by the
/// shifted-register operands of 32-bit instructions (`DecodeImmShift`).
pub fn decode_imm_shift(shift_type: u32, imm5: u32) -> Shift {
    let imm5 = (imm5 & 0x1F) as u8;
    let (kind, amount) = match shift_type & 0b11 {
        0b00 => (ShiftKind::Lsl, imm5),
        0b01 => (ShiftKind::Lsr, if imm5 == 0 { 32 } else { imm5 }),
        0b10 => (ShiftKind::Asr, if imm5 == 0 { 32 } else { imm5 }),
        _ if imm5 == 0 => (ShiftKind::Rrx, 1),
        _ => (ShiftKind::Ror, imm5),
    };
    Shift { kind, amount }
}


// End of file
