//! Operand values decoded after the MOD-REG-R/M byte and the locations they
//! resolve to at execution time.

use core::fmt;

use emu86_mem::{Memory, MemoryError};
use emu86_types::convert::{high_byte, low_byte, to_hex};
use emu86_types::{DataSize, RegisterId, SegReg};

use crate::modrm::DisplacementType;
use crate::state::CpuState;

/// A displacement literal, sign-extended to 16 bits and tagged with the width
/// it was encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Displacement {
    value: i16,
    width: DataSize,
}

impl Displacement {
    #[must_use]
    pub const fn from_byte(raw: u8) -> Self {
        Self {
            value: raw as i8 as i16,
            width: DataSize::Byte,
        }
    }

    #[must_use]
    pub const fn from_word(raw: u16) -> Self {
        Self {
            value: raw as i16,
            width: DataSize::Word,
        }
    }

    #[must_use]
    pub const fn value(self) -> i16 {
        self.value
    }

    #[must_use]
    pub const fn width(self) -> DataSize {
        self.width
    }

    /// The displacement as an unsigned 16-bit offset (two's complement).
    #[must_use]
    pub const fn offset(self) -> u16 {
        self.value as u16
    }

    /// The bytes this displacement was decoded from.
    pub fn raw_bytes(self) -> impl Iterator<Item = u8> {
        let word = self.offset();
        let len = self.width.bytes() as usize;
        [low_byte(word), high_byte(word)].into_iter().take(len)
    }
}

/// An immediate operand.
///
/// `value` is already extended to the operand size; `encoded` records how many
/// bytes the instruction stream carried (opcode `0x83` sign-extends one byte
/// to a word operand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Immediate {
    value: u16,
    size: DataSize,
    encoded: DataSize,
}

impl Immediate {
    #[must_use]
    pub const fn byte(raw: u8) -> Self {
        Self {
            value: raw as u16,
            size: DataSize::Byte,
            encoded: DataSize::Byte,
        }
    }

    #[must_use]
    pub const fn word(raw: u16) -> Self {
        Self {
            value: raw,
            size: DataSize::Word,
            encoded: DataSize::Word,
        }
    }

    /// A byte immediate sign-extended to a word operand.
    #[must_use]
    pub const fn sign_extended(raw: u8) -> Self {
        Self {
            value: raw as i8 as i16 as u16,
            size: DataSize::Word,
            encoded: DataSize::Byte,
        }
    }

    #[must_use]
    pub const fn value(self) -> u16 {
        self.value
    }

    #[must_use]
    pub const fn size(self) -> DataSize {
        self.size
    }

    pub fn raw_bytes(self) -> impl Iterator<Item = u8> {
        let len = self.encoded.bytes() as usize;
        [low_byte(self.value), high_byte(self.value)]
            .into_iter()
            .take(len)
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(self.value))
    }
}

/// A memory operand as encoded: either a base/index combination plus optional
/// displacement, or a 16-bit direct address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOperand {
    Based {
        base: DisplacementType,
        displacement: Option<Displacement>,
    },
    Direct(u16),
}

impl MemoryOperand {
    /// Offset within the operand's segment.
    pub fn effective_address(&self, cpu: &CpuState) -> u16 {
        match *self {
            MemoryOperand::Direct(addr) => addr,
            MemoryOperand::Based { base, displacement } => {
                let (first, second) = base.registers();
                let mut offset = cpu.reg16(first);
                if let Some(index) = second {
                    offset = offset.wrapping_add(cpu.reg16(index));
                }
                let disp = displacement.map_or(0, Displacement::offset);
                offset.wrapping_add(disp)
            }
        }
    }

    pub fn segment(&self) -> SegReg {
        match self {
            MemoryOperand::Direct(_) => SegReg::Ds,
            MemoryOperand::Based { base, .. } => base.default_segment(),
        }
    }

    pub fn physical_address(&self, cpu: &CpuState) -> u32 {
        cpu.physical(self.segment(), self.effective_address(cpu))
    }
}

impl fmt::Display for MemoryOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryOperand::Direct(addr) => write!(f, "[{}]", to_hex(*addr)),
            MemoryOperand::Based { base, displacement } => {
                write!(f, "[{base}")?;
                match displacement.map(Displacement::value) {
                    Some(0) | None => {}
                    Some(v) if v < 0 => write!(f, "-{}", v.unsigned_abs())?,
                    Some(v) => write!(f, "+{v}")?,
                }
                f.write_str("]")
            }
        }
    }
}

/// What the R/M field refers to once the addressing mode has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RmOperand {
    Register(RegisterId),
    Memory(MemoryOperand),
}

impl RmOperand {
    /// Resolve against the current register values.
    pub fn locate(&self, cpu: &CpuState) -> Location {
        match self {
            RmOperand::Register(id) => Location::Register(*id),
            RmOperand::Memory(mem) => Location::Memory(mem.physical_address(cpu)),
        }
    }
}

impl fmt::Display for RmOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RmOperand::Register(id) => write!(f, "{id}"),
            RmOperand::Memory(mem) => write!(f, "{mem}"),
        }
    }
}

/// A concrete place an instruction reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Register(RegisterId),
    /// Physical address.
    Memory(u32),
}

impl Location {
    pub fn read(
        self,
        size: DataSize,
        cpu: &CpuState,
        mem: &dyn Memory,
    ) -> Result<u16, MemoryError> {
        match self {
            Location::Register(id) => Ok(cpu.read(id)),
            Location::Memory(addr) => read_memory(mem, addr, size),
        }
    }

    pub fn write(
        self,
        size: DataSize,
        value: u16,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), MemoryError> {
        match self {
            Location::Register(id) => {
                cpu.write(id, value);
                Ok(())
            }
            Location::Memory(addr) => write_memory(mem, addr, size, value),
        }
    }
}

pub(crate) fn read_memory(mem: &dyn Memory, addr: u32, size: DataSize) -> Result<u16, MemoryError> {
    match size {
        DataSize::Byte => mem.read_u8(addr).map(u16::from),
        DataSize::Word => mem.read_u16(addr),
    }
}

pub(crate) fn write_memory(
    mem: &mut dyn Memory,
    addr: u32,
    size: DataSize,
    value: u16,
) -> Result<(), MemoryError> {
    match size {
        DataSize::Byte => mem.write_u8(addr, low_byte(value)),
        DataSize::Word => mem.write_u16(addr, value),
    }
}
