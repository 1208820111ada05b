//! The ARMv7-M register file.
//!
//! R0 to R12 are plain storage. R13 (SP) is banked between the Main and
//! Process stack pointers, and R15 (PC) always has bit 0 clear. Everything goes
//! through [`Registers::read`] and [`Registers::write`] so that these rules
//! can't be skipped.

use core::fmt;

/// Identifies a register in our CPU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    /// Register R0
    R0,
    /// Register R1
    R1,
    /// Register R2
    R2,
    /// Register R3
    R3,
    /// Register R4
    R4,
    /// Register R5
    R5,
    /// Register R6
    R6,
    /// Register R7
    R7,
    /// Register R8
    R8,
    /// Register R9
    R9,
    /// Register R10
    R10,
    /// Register R11
    R11,
    /// Register R12
    R12,
    /// Stack Pointer (R13)
    Sp,
    /// Link Register (R14)
    Lr,
    /// Program Counter (R15)
    Pc,
}

impl From<u8> for Register {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            7 => Register::R7,
            8 => Register::R8,
            9 => Register::R9,
            10 => Register::R10,
            11 => Register::R11,
            12 => Register::R12,
            13 => Register::Sp,
            14 => Register::Lr,
            _ => Register::Pc,
        }
    }
}

impl Register {
    /// The logical index, 0 to 15
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Is this R13 or R15, which most 32-bit encodings refuse?
    pub fn is_sp_or_pc(self) -> bool {
        matches!(self, Register::Sp | Register::Pc)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Sp => write!(f, "sp"),
            Register::Lr => write!(f, "lr"),
            Register::Pc => write!(f, "pc"),
            other => write!(f, "r{}", other.index()),
        }
    }
}

/// Conditions that can be applied to an operation, or to an IT block
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Equal (Z == 1)
    Eq = 0,
    /// Not Equal (Z == 0)
    Ne = 1,
    /// Carry Set (C == 1)
    Cs = 2,
    /// Carry Clear (C == 0)
    Cc = 3,
    /// Minus, negative (N == 1)
    Mi = 4,
    /// Plus, positive (N == 0)
    Pl = 5,
    /// Overflow (V == 1)
    Vs = 6,
    /// No overflow (V == 0)
    Vc = 7,
    /// Unsigned higher (C == 1 and Z == 0)
    Hi = 8,
    /// Unsigned lower or same (C == 0 or Z == 1)
    Ls = 9,
    /// Signed greater than or equal (N == V)
    Ge = 10,
    /// Signed less than (N != V)
    Lt = 11,
    /// Signed greater than (Z == 0 and N == V)
    Gt = 12,
    /// Signed less than or equal (Z == 1 or N != V)
    Le = 13,
    /// Always executes
    Always = 14,
    /// The `0b1111` encoding. Executes unconditionally where it is allowed.
    Never = 15,
}

impl From<u8> for Condition {
    fn from(value: u8) -> Condition {
        match value & 0x0F {
            0 => Condition::Eq,
            1 => Condition::Ne,
            2 => Condition::Cs,
            3 => Condition::Cc,
            4 => Condition::Mi,
            5 => Condition::Pl,
            6 => Condition::Vs,
            7 => Condition::Vc,
            8 => Condition::Hi,
            9 => Condition::Ls,
            10 => Condition::Ge,
            11 => Condition::Lt,
            12 => Condition::Gt,
            13 => Condition::Le,
            14 => Condition::Always,
            _ => Condition::Never,
        }
    }
}

impl Condition {
    /// The assembler suffix for this condition
    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Cs => "cs",
            Condition::Cc => "cc",
            Condition::Mi => "mi",
            Condition::Pl => "pl",
            Condition::Vs => "vs",
            Condition::Vc => "vc",
            Condition::Hi => "hi",
            Condition::Ls => "ls",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Gt => "gt",
            Condition::Le => "le",
            Condition::Always => "al",
            Condition::Never => "nv",
        }
    }
}

/// Which of the two banked stack pointers CONTROL.SPSEL picks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StackSelect {
    /// Main Stack Pointer
    #[default]
    Msp = 0,
    /// Process Stack Pointer
    Psp = 1,
}

/// CPU execution modes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Not executing an exception or interrupt handler
    #[default]
    Thread,
    /// Executing an exception or interrupt handler
    Handler,
}

/// Application Program Status Register
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Apsr {
    /// Negative
    pub n: bool,
    /// Zero
    pub z: bool,
    /// Carry
    pub c: bool,
    /// Overflow
    pub v: bool,
    /// Saturation
    pub q: bool,
    /// Greater than or Equal flags, one per byte lane
    pub ge: u8,
}

/// Interrupt Program Status Register
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ipsr {
    /// Number of the exception being handled, or zero in Thread mode
    pub exception_number: u16,
}

/// Execution Program Status Register
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Epsr {
    /// Thumb state
    pub t: bool,
    /// Interrupt-continuable instruction state
    pub ici: u16,
    /// IT block state. Bits 7..5 hold the base condition, bits 4..0 the
    /// condition LSB and remaining-instruction mask.
    pub it: u8,
}

/// The CONTROL special register
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    /// Thread mode is unprivileged
    pub npriv: bool,
    /// Which stack pointer Thread mode uses
    pub spsel: StackSelect,
    /// Floating point context active
    pub fpca: bool,
}

/// Represents the register state of an ARMv7-M processor.
///
/// A zeroed register file (the `Default`) is in Thread mode using the Main
/// Stack Pointer, outside any IT block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registers {
    regs: [u32; 13],
    /// Indexed by [`StackSelect`]
    sp: [u32; 2],
    lr: u32,
    pc: u32,
    /// Condition flags
    pub apsr: Apsr,
    /// Exception number
    pub ipsr: Ipsr,
    /// Execution state
    pub epsr: Epsr,
    /// Thread or Handler
    pub mode: Mode,
    /// Stack selection and privilege
    pub control: Control,
    /// Masks all exceptions with configurable priority
    pub primask: bool,
    /// Masks all exceptions except NMI
    pub faultmask: bool,
    /// Base priority mask
    pub basepri: u8,
}

impl Registers {
    /// Create a zeroed register file.
    pub fn new() -> Registers {
        Registers::default()
    }

    /// Create a register file with R0 to R12 set, and everything else zero.
    pub fn with_general(regs: [u32; 13]) -> Registers {
        Registers {
            regs,
            ..Default::default()
        }
    }

    /// Get the contents of a register
    pub fn read(&self, reg: Register) -> u32 {
        match reg {
            Register::Sp => self.sp[self.lookup_sp() as usize],
            Register::Lr => self.lr,
            Register::Pc => self.pc,
            general => self.regs[usize::from(general.index())],
        }
    }

    /// Store a value into the given register.
    ///
    /// Writes to the PC have bit 0 cleared.
    pub fn write(&mut self, reg: Register, value: u32) {
        match reg {
            Register::Sp => {
                let sp = self.lookup_sp();
                self.sp[sp as usize] = value;
            }
            Register::Lr => self.lr = value,
            Register::Pc => self.pc = value & !1,
            general => self.regs[usize::from(general.index())] = value,
        }
    }

    /// Which stack pointer does R13 currently refer to?
    pub fn lookup_sp(&self) -> StackSelect {
        if self.control.spsel == StackSelect::Psp && self.mode == Mode::Thread {
            StackSelect::Psp
        } else {
            StackSelect::Msp
        }
    }

    /// The current stack pointer
    pub fn sp(&self) -> u32 {
        self.read(Register::Sp)
    }

    /// The link register
    pub fn lr(&self) -> u32 {
        self.lr
    }

    /// The program counter
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// The Main Stack Pointer, whichever stack is selected
    pub fn msp(&self) -> u32 {
        self.sp[StackSelect::Msp as usize]
    }

    /// The Process Stack Pointer, whichever stack is selected
    pub fn psp(&self) -> u32 {
        self.sp[StackSelect::Psp as usize]
    }

    /// Set the Main Stack Pointer directly
    pub fn set_msp(&mut self, value: u32) {
        self.sp[StackSelect::Msp as usize] = value;
    }

    /// Set the Process Stack Pointer directly
    pub fn set_psp(&mut self, value: u32) {
        self.sp[StackSelect::Psp as usize] = value;
    }

    /// Jump to an address.
    pub fn branch_write_pc(&mut self, addr: u32) {
        self.write(Register::Pc, addr);
    }

    /// Jump to an address calculated by a data-processing instruction.
    pub fn alu_write_pc(&mut self, addr: u32) {
        self.branch_write_pc(addr);
    }

    /// Are we executing inside an IT block?
    pub fn in_it_block(&self) -> bool {
        self.epsr.it & 0x0F != 0
    }

    /// Is this the last instruction of an IT block?
    pub fn last_in_it_block(&self) -> bool {
        self.epsr.it & 0x0F == 0b1000
    }

    /// The condition the current instruction executes under.
    pub fn current_condition(&self) -> Condition {
        if self.in_it_block() {
            Condition::from(self.epsr.it >> 4)
        } else {
            Condition::Always
        }
    }

    /// Move the IT block on to the next instruction (`ITAdvance`).
    pub fn it_advance(&mut self) {
        if self.epsr.it & 0b111 == 0 {
            self.epsr.it = 0;
        } else {
            let base = self.epsr.it & 0b1110_0000;
            let rest = (self.epsr.it << 1) & 0b1_1111;
            self.epsr.it = base | rest;
        }
    }

    /// Check whether the APSR flags match the given condition.
    pub fn check_condition(&self, cond: Condition) -> bool {
        let Apsr { n, z, c, v, .. } = self.apsr;
        match cond {
            Condition::Eq => z,
            Condition::Ne => !z,
            Condition::Cs => c,
            Condition::Cc => !c,
            Condition::Mi => n,
            Condition::Pl => !n,
            Condition::Vs => v,
            Condition::Vc => !v,
            Condition::Hi => c && !z,
            Condition::Ls => !c || z,
            Condition::Ge => n == v,
            Condition::Lt => n != v,
            Condition::Gt => !z && (n == v),
            Condition::Le => z || (n != v),
            Condition::Always | Condition::Never => true,
        }
    }

    /// Does the current instruction pass its condition check?
    pub fn condition_passed(&self) -> bool {
        self.check_condition(self.current_condition())
    }

    /// Set N and Z from a result.
    pub fn set_nz(&mut self, result: u32) {
        self.apsr.n = result & 0x8000_0000 != 0;
        self.apsr.z = result == 0;
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, value) in self.regs.iter().enumerate() {
            if idx != 0 {
                if idx % 4 == 0 {
                    writeln!(f)?;
                } else {
                    write!(f, "\t")?;
                }
            }
            write!(f, "R{:<2} = {:#x}", idx, value)?;
        }
        writeln!(
            f,
            "\tSP (R13) = {:#x}\tLR (R14) = {:#x}\tPC (R15) = {:#x}",
            self.sp(),
            self.lr,
            self.pc
        )?;
        writeln!(f, "MSP = {:#x}\tPSP = {:#x}", self.msp(), self.psp())?;
        writeln!(
            f,
            "BASEPRI = {}\tPRIMASK = {}\tFAULTMASK = {}",
            self.basepri,
            u8::from(self.primask),
            u8::from(self.faultmask)
        )?;
        writeln!(
            f,
            "CONTROL: nPRIV = {} SPSEL = {} FPCA = {}",
            u8::from(self.control.npriv),
            self.control.spsel as u8,
            u8::from(self.control.fpca)
        )?;
        writeln!(
            f,
            "APSR: N = {} Z = {} C = {} V = {} Q = {} GE = {}",
            u8::from(self.apsr.n),
            u8::from(self.apsr.z),
            u8::from(self.apsr.c),
            u8::from(self.apsr.v),
            u8::from(self.apsr.q),
            self.apsr.ge
        )?;
        writeln!(
            f,
            "EPSR: T = {} ICI = {:#x} IT = {:#x}",
            u8::from(self.epsr.t),
            self.epsr.ici,
            self.epsr.it
        )?;
        write!(f, "IPSR: EXCPNUM = {}", self.ipsr.exception_number)
    }
}


// End of file
