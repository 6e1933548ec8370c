//! The MOD-REG-R/M addressing byte.
//!
//! Layout, most significant first: `MOD(2) REG(3) R/M(3)`.
//!
//! | MOD | meaning                                                        |
//! |-----|----------------------------------------------------------------|
//! | 00  | memory, no displacement (except R/M=110: 16-bit direct address) |
//! | 01  | memory, signed 8-bit displacement                              |
//! | 10  | memory, 16-bit displacement                                    |
//! | 11  | R/M names a register                                           |

use core::fmt;

use emu86_types::convert::bits;
use emu86_types::{DataSize, Reg16, RegisterId, RegisterPart, SegReg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    NoDisplacement,
    ByteDisplacement,
    WordDisplacement,
    RegisterAddressing,
}

/// Base/index register combination selected by R/M in the memory modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplacementType {
    BxSi,
    BxDi,
    BpSi,
    BpDi,
    Si,
    Di,
    Bp,
    Bx,
}

impl DisplacementType {
    #[must_use]
    pub const fn from_rm(rm: u8) -> Self {
        match rm & 0x7 {
            0 => DisplacementType::BxSi,
            1 => DisplacementType::BxDi,
            2 => DisplacementType::BpSi,
            3 => DisplacementType::BpDi,
            4 => DisplacementType::Si,
            5 => DisplacementType::Di,
            6 => DisplacementType::Bp,
            _ => DisplacementType::Bx,
        }
    }

    #[must_use]
    pub const fn registers(self) -> (Reg16, Option<Reg16>) {
        match self {
            DisplacementType::BxSi => (Reg16::Bx, Some(Reg16::Si)),
            DisplacementType::BxDi => (Reg16::Bx, Some(Reg16::Di)),
            DisplacementType::BpSi => (Reg16::Bp, Some(Reg16::Si)),
            DisplacementType::BpDi => (Reg16::Bp, Some(Reg16::Di)),
            DisplacementType::Si => (Reg16::Si, None),
            DisplacementType::Di => (Reg16::Di, None),
            DisplacementType::Bp => (Reg16::Bp, None),
            DisplacementType::Bx => (Reg16::Bx, None),
        }
    }

    /// BP-based addressing defaults to the stack segment, everything else to DS.
    #[must_use]
    pub const fn default_segment(self) -> SegReg {
        match self {
            DisplacementType::BpSi | DisplacementType::BpDi | DisplacementType::Bp => SegReg::Ss,
            _ => SegReg::Ds,
        }
    }
}

impl fmt::Display for DisplacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registers() {
            (base, Some(index)) => write!(f, "{base}+{index}"),
            (base, None) => write!(f, "{base}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModRegRm(u8);

impl ModRegRm {
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn mod_bits(self) -> u8 {
        bits(self.0, 6, 2)
    }

    #[must_use]
    pub const fn reg_bits(self) -> u8 {
        bits(self.0, 3, 3)
    }

    #[must_use]
    pub const fn rm_bits(self) -> u8 {
        bits(self.0, 0, 3)
    }

    #[must_use]
    pub const fn addressing_mode(self) -> AddressingMode {
        match self.mod_bits() {
            0b00 => AddressingMode::NoDisplacement,
            0b01 => AddressingMode::ByteDisplacement,
            0b10 => AddressingMode::WordDisplacement,
            _ => AddressingMode::RegisterAddressing,
        }
    }

    /// `MOD=00, R/M=110`: the operand is a 16-bit absolute offset, not `[bp]`.
    #[must_use]
    pub const fn is_direct_address(self) -> bool {
        self.mod_bits() == 0b00 && self.rm_bits() == 0b110
    }

    /// Number of displacement bytes following this byte in the instruction stream.
    #[must_use]
    pub const fn displacement_read_length(self) -> usize {
        match self.addressing_mode() {
            AddressingMode::NoDisplacement if self.is_direct_address() => 2,
            AddressingMode::NoDisplacement => 0,
            AddressingMode::ByteDisplacement => 1,
            AddressingMode::WordDisplacement => 2,
            AddressingMode::RegisterAddressing => 0,
        }
    }

    /// True for the byte- and word-displacement modes only.
    #[must_use]
    pub const fn is_displacement_used(self) -> bool {
        matches!(
            self.addressing_mode(),
            AddressingMode::ByteDisplacement | AddressingMode::WordDisplacement
        )
    }

    /// Only meaningful in the memory addressing modes.
    #[must_use]
    pub const fn displacement_type(self) -> DisplacementType {
        DisplacementType::from_rm(self.rm_bits())
    }

    #[must_use]
    pub const fn register_from_reg(self, size: DataSize) -> RegisterId {
        RegisterId::from_field(self.reg_bits(), size)
    }

    #[must_use]
    pub const fn register_index_from_reg(self, size: DataSize) -> Reg16 {
        self.register_from_reg(size).reg
    }

    #[must_use]
    pub const fn register_part_from_reg(self, size: DataSize) -> RegisterPart {
        self.register_from_reg(size).part
    }

    #[must_use]
    pub const fn register_name_from_reg(self, size: DataSize) -> &'static str {
        self.register_from_reg(size).name()
    }

    /// Only meaningful in register addressing mode.
    #[must_use]
    pub const fn register_from_rm(self, size: DataSize) -> RegisterId {
        RegisterId::from_field(self.rm_bits(), size)
    }

    #[must_use]
    pub const fn register_index_from_rm(self, size: DataSize) -> Reg16 {
        self.register_from_rm(size).reg
    }

    #[must_use]
    pub const fn register_part_from_rm(self, size: DataSize) -> RegisterPart {
        self.register_from_rm(size).part
    }

    #[must_use]
    pub const fn register_name_from_rm(self, size: DataSize) -> &'static str {
        self.register_from_rm(size).name()
    }
}
