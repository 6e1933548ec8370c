#![forbid(unsafe_code)]

//! Shared 8086 vocabulary types: register identities, operand sizes and the
//! direction of data flow between the REG and R/M operands.

use core::fmt;

pub mod convert;

/// Operand width selected by the W bit of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSize {
    Byte,
    Word,
}

impl DataSize {
    #[must_use]
    pub const fn bytes(self) -> u16 {
        match self {
            DataSize::Byte => 1,
            DataSize::Word => 2,
        }
    }

    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            DataSize::Byte => 0x00ff,
            DataSize::Word => 0xffff,
        }
    }

    #[must_use]
    pub const fn sign_bit(self) -> u16 {
        match self {
            DataSize::Byte => 0x0080,
            DataSize::Word => 0x8000,
        }
    }

    /// Size keyword used when an operand's width can't be inferred from a register.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            DataSize::Byte => "byte",
            DataSize::Word => "word",
        }
    }
}

/// Whether the REG field of a MOD-REG-R/M byte names the source or the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    RegIsSource,
    RegIsDestination,
}

/// 16-bit general registers in hardware encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg16 {
    Ax = 0,
    Cx = 1,
    Dx = 2,
    Bx = 3,
    Sp = 4,
    Bp = 5,
    Si = 6,
    Di = 7,
}

impl Reg16 {
    pub const ALL: [Reg16; 8] = [
        Reg16::Ax,
        Reg16::Cx,
        Reg16::Dx,
        Reg16::Bx,
        Reg16::Sp,
        Reg16::Bp,
        Reg16::Si,
        Reg16::Di,
    ];

    /// Map a 3-bit register field. Only the low three bits are considered.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => Reg16::Ax,
            1 => Reg16::Cx,
            2 => Reg16::Dx,
            3 => Reg16::Bx,
            4 => Reg16::Sp,
            5 => Reg16::Bp,
            6 => Reg16::Si,
            _ => Reg16::Di,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Reg16::Ax => "ax",
            Reg16::Cx => "cx",
            Reg16::Dx => "dx",
            Reg16::Bx => "bx",
            Reg16::Sp => "sp",
            Reg16::Bp => "bp",
            Reg16::Si => "si",
            Reg16::Di => "di",
        }
    }
}

impl fmt::Display for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which part of a 16-bit register an operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterPart {
    Full,
    Low,
    High,
}

/// A concrete register operand: a 16-bit slot plus the part of it being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterId {
    pub reg: Reg16,
    pub part: RegisterPart,
}

impl RegisterId {
    #[must_use]
    pub const fn full(reg: Reg16) -> Self {
        Self {
            reg,
            part: RegisterPart::Full,
        }
    }

    /// Resolve a 3-bit REG or R/M field for the given operand size.
    ///
    /// Word operands select the full register. Byte operands 0-3 select the low
    /// halves of AX/CX/DX/BX and 4-7 the high halves of the same four.
    #[must_use]
    pub const fn from_field(bits: u8, size: DataSize) -> Self {
        let bits = bits & 0x7;
        match size {
            DataSize::Word => Self::full(Reg16::from_bits(bits)),
            DataSize::Byte if bits < 4 => Self {
                reg: Reg16::from_bits(bits),
                part: RegisterPart::Low,
            },
            DataSize::Byte => Self {
                reg: Reg16::from_bits(bits - 4),
                part: RegisterPart::High,
            },
        }
    }

    #[must_use]
    pub const fn size(self) -> DataSize {
        match self.part {
            RegisterPart::Full => DataSize::Word,
            RegisterPart::Low | RegisterPart::High => DataSize::Byte,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match (self.part, self.reg) {
            (RegisterPart::Full, reg) => reg.name(),
            (RegisterPart::Low, Reg16::Ax) => "al",
            (RegisterPart::Low, Reg16::Cx) => "cl",
            (RegisterPart::Low, Reg16::Dx) => "dl",
            (RegisterPart::Low, Reg16::Bx) => "bl",
            (RegisterPart::High, Reg16::Ax) => "ah",
            (RegisterPart::High, Reg16::Cx) => "ch",
            (RegisterPart::High, Reg16::Dx) => "dh",
            (RegisterPart::High, Reg16::Bx) => "bh",
            // SP/BP/SI/DI have no byte halves on the 8086.
            _ => "??",
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegReg {
    Es = 0,
    Cs = 1,
    Ss = 2,
    Ds = 3,
}

impl SegReg {
    pub const ALL: [SegReg; 4] = [SegReg::Es, SegReg::Cs, SegReg::Ss, SegReg::Ds];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SegReg::Es => "es",
            SegReg::Cs => "cs",
            SegReg::Ss => "ss",
            SegReg::Ds => "ds",
        }
    }
}

impl fmt::Display for SegReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_fields_split_into_low_and_high_halves() {
        assert_eq!(RegisterId::from_field(0b000, DataSize::Byte).name(), "al");
        assert_eq!(RegisterId::from_field(0b011, DataSize::Byte).name(), "bl");
        assert_eq!(RegisterId::from_field(0b100, DataSize::Byte).name(), "ah");
        assert_eq!(RegisterId::from_field(0b111, DataSize::Byte).name(), "bh");
    }

    #[test]
    fn word_fields_cover_all_eight_registers() {
        let names: Vec<_> = (0..8)
            .map(|bits| RegisterId::from_field(bits, DataSize::Word).name())
            .collect();
        assert_eq!(names, ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"]);
    }

    #[test]
    fn register_size_follows_part() {
        assert_eq!(RegisterId::full(Reg16::Si).size(), DataSize::Word);
        assert_eq!(
            RegisterId::from_field(5, DataSize::Byte).size(),
            DataSize::Byte
        );
    }
}
