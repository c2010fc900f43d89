// bolt-vm - Instruction encoding
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Fixed-width 32-bit instructions.
//!
//! ```text
//!  31      24 23      16 15       8 7        0
//! +----------+----------+----------+----------+
//! |    rs    |    rt    |    rd    |  opcode  |
//! +----------+----------+----------+----------+
//! |        imm16        |
//! ```
//!
//! Instructions that carry a 16-bit immediate (constant index, jump offset,
//! argument count, prototype or primitive id, global register) store it in
//! bytes 2-3. All addressing is register-relative.

use std::fmt;

/// Operation codes. The discriminant is the encoded byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Add = 0,
    Div = 1,
    Mul = 2,
    Sub = 3,
    Mov = 4,
    /// Reserved for a scheduler; never emitted, always rejected.
    Schedule = 5,
    Ret = 6,
    Jmp = 7,
    Eq = 8,
    Ne = 9,
    /// Bigger than.
    Bt = 10,
    Lt = 11,
    /// Bigger than or equal.
    Bte = 12,
    Lte = 13,
    JmpIfFalse = 14,
    Const = 15,
    Call = 16,
    CallNative = 17,
    Closure = 18,
    Native = 19,
    GetGlobal = 20,
}

/// How an opcode uses the operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    /// No operands.
    None,
    /// `rd`.
    A,
    /// `rd, rt`.
    AB,
    /// `rd, rt, rs`.
    ABC,
    /// `rd, imm16`.
    AImm,
    /// `imm16`.
    Imm,
}

impl Opcode {
    /// Every opcode, in encoding order.
    pub const ALL: [Opcode; 21] = [
        Opcode::Add,
        Opcode::Div,
        Opcode::Mul,
        Opcode::Sub,
        Opcode::Mov,
        Opcode::Schedule,
        Opcode::Ret,
        Opcode::Jmp,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::Bt,
        Opcode::Lt,
        Opcode::Bte,
        Opcode::Lte,
        Opcode::JmpIfFalse,
        Opcode::Const,
        Opcode::Call,
        Opcode::CallNative,
        Opcode::Closure,
        Opcode::Native,
        Opcode::GetGlobal,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Div => "div",
            Opcode::Mul => "mul",
            Opcode::Sub => "sub",
            Opcode::Mov => "mov",
            Opcode::Schedule => "schedule",
            Opcode::Ret => "ret",
            Opcode::Jmp => "jmp",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Bt => "bt",
            Opcode::Lt => "lt",
            Opcode::Bte => "bte",
            Opcode::Lte => "lte",
            Opcode::JmpIfFalse => "jmp_if_false",
            Opcode::Const => "const",
            Opcode::Call => "call",
            Opcode::CallNative => "call_native",
            Opcode::Closure => "closure",
            Opcode::Native => "native",
            Opcode::GetGlobal => "get_global",
        }
    }

    pub fn operands(self) -> Operands {
        match self {
            Opcode::Add
            | Opcode::Div
            | Opcode::Mul
            | Opcode::Sub
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Bt
            | Opcode::Lt
            | Opcode::Bte
            | Opcode::Lte
            | Opcode::CallNative => Operands::ABC,
            Opcode::Mov => Operands::AB,
            Opcode::Ret => Operands::A,
            Opcode::Schedule => Operands::None,
            Opcode::Jmp => Operands::Imm,
            Opcode::JmpIfFalse
            | Opcode::Const
            | Opcode::Call
            | Opcode::Closure
            | Opcode::Native
            | Opcode::GetGlobal => Operands::AImm,
        }
    }

    /// Whether this opcode's immediate is a forward jump offset.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::JmpIfFalse)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Opcode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One encoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u32);

impl Instruction {
    pub fn from_raw(word: u32) -> Self {
        Instruction(word)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Encode `op rd, rt, rs`.
    pub fn abc(op: Opcode, rd: u8, rt: u8, rs: u8) -> Self {
        Instruction((op as u32) | ((rd as u32) << 8) | ((rt as u32) << 16) | ((rs as u32) << 24))
    }

    /// Encode `op rd, imm16`.
    pub fn wide(op: Opcode, rd: u8, imm: u16) -> Self {
        Instruction((op as u32) | ((rd as u32) << 8) | ((imm as u32) << 16))
    }

    pub fn mov(rd: u8, rt: u8) -> Self {
        Self::abc(Opcode::Mov, rd, rt, 0)
    }

    pub fn ret(rd: u8) -> Self {
        Self::abc(Opcode::Ret, rd, 0, 0)
    }

    pub fn jmp(offset: u16) -> Self {
        Self::wide(Opcode::Jmp, 0, offset)
    }

    pub fn jmp_if_false(rd: u8, offset: u16) -> Self {
        Self::wide(Opcode::JmpIfFalse, rd, offset)
    }

    pub fn load_const(rd: u8, index: u16) -> Self {
        Self::wide(Opcode::Const, rd, index)
    }

    pub fn call(rd: u8, argc: u16) -> Self {
        Self::wide(Opcode::Call, rd, argc)
    }

    pub fn call_native(rd: u8, argc: u8, primitive: u8) -> Self {
        Self::abc(Opcode::CallNative, rd, argc, primitive)
    }

    pub fn closure(rd: u8, prototype: u16) -> Self {
        Self::wide(Opcode::Closure, rd, prototype)
    }

    pub fn native(rd: u8, primitive: u16) -> Self {
        Self::wide(Opcode::Native, rd, primitive)
    }

    pub fn get_global(rd: u8, register: u16) -> Self {
        Self::wide(Opcode::GetGlobal, rd, register)
    }

    /// The opcode byte, whether or not it names a known opcode.
    pub fn opcode_byte(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Decode the opcode; unknown bytes are returned as the error.
    pub fn opcode(self) -> Result<Opcode, u8> {
        Opcode::try_from(self.opcode_byte())
    }

    pub fn rd(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub fn rt(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub fn rs(self) -> u8 {
        ((self.0 >> 24) & 0xff) as u8
    }

    pub fn imm16(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Same instruction with a new immediate (jump backpatching).
    pub fn with_imm16(self, imm: u16) -> Self {
        Instruction((self.0 & 0xffff) | ((imm as u32) << 16))
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction({:#010x} {})", self.0, self)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.opcode() {
            Ok(op) => op,
            Err(byte) => return write!(f, ".byte {:#04x}", byte),
        };
        match op.operands() {
            Operands::None => write!(f, "{}", op),
            Operands::A => write!(f, "{} r{}", op, self.rd()),
            Operands::AB => write!(f, "{} r{}, r{}", op, self.rd(), self.rt()),
            Operands::ABC if op == Opcode::CallNative => {
                write!(f, "{} r{}, {}, {}", op, self.rd(), self.rt(), self.rs())
            }
            Operands::ABC => write!(
                f,
                "{} r{}, r{}, r{}",
                op,
                self.rd(),
                self.rt(),
                self.rs()
            ),
            Operands::AImm if op == Opcode::GetGlobal => {
                write!(f, "{} r{}, g{}", op, self.rd(), self.imm16())
            }
            Operands::AImm => write!(f, "{} r{}, {}", op, self.rd(), self.imm16()),
            Operands::Imm => write!(f, "{} {}", op, self.imm16()),
        }
    }
}
