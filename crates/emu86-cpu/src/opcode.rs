use core::fmt;

use emu86_types::convert::{bit, to_binary_u8};
use emu86_types::{DataSize, Direction, Reg16};

/// The instruction-identifying byte.
///
/// Bit 0 is the W (word) bit and bit 1 the D (direction) bit for the families
/// that use them; the remaining six bits identify the operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u8);

impl Opcode {
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The opcode with its D and W bits masked off.
    #[must_use]
    pub const fn unique_value(self) -> u8 {
        self.0 & 0b1111_1100
    }

    #[must_use]
    pub const fn word_bit(self) -> bool {
        bit(self.0, 0)
    }

    #[must_use]
    pub const fn data_size(self) -> DataSize {
        if self.word_bit() {
            DataSize::Word
        } else {
            DataSize::Byte
        }
    }

    #[must_use]
    pub const fn direction_bit(self) -> bool {
        bit(self.0, 1)
    }

    #[must_use]
    pub const fn direction(self) -> Direction {
        if self.direction_bit() {
            Direction::RegIsDestination
        } else {
            Direction::RegIsSource
        }
    }

    /// Number of bytes in an immediate operand of this opcode's data size.
    ///
    /// Displacement lengths come from the MOD field, not from here.
    #[must_use]
    pub const fn immediate_read_length(self) -> usize {
        self.data_size().bytes() as usize
    }

    /// Register encoded in the low three bits (PUSH/POP/MOV reg, imm).
    #[must_use]
    pub const fn embedded_register(self) -> Reg16 {
        Reg16::from_bits(self.0)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (d={}, w={})",
            to_binary_u8(self.0),
            u8::from(self.direction_bit()),
            u8::from(self.word_bit())
        )
    }
}
