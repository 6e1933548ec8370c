use core::fmt;

use emu86_types::DataSize;

use crate::state::Flags;

/// Two-operand arithmetic/logic operations.
///
/// The discriminants of the first eight match the 3-bit operation field shared
/// by opcodes `00..=3F` (bits 3-5) and the REG extension of group-1 (`80/81/83`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Add = 0,
    Or = 1,
    Adc = 2,
    Sbb = 3,
    And = 4,
    Sub = 5,
    Xor = 6,
    Cmp = 7,
    Test,
}

impl AluOp {
    #[must_use]
    pub const fn from_ext(ext: u8) -> Self {
        match ext & 0x7 {
            0 => AluOp::Add,
            1 => AluOp::Or,
            2 => AluOp::Adc,
            3 => AluOp::Sbb,
            4 => AluOp::And,
            5 => AluOp::Sub,
            6 => AluOp::Xor,
            _ => AluOp::Cmp,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Or => "or",
            AluOp::Adc => "adc",
            AluOp::Sbb => "sbb",
            AluOp::And => "and",
            AluOp::Sub => "sub",
            AluOp::Xor => "xor",
            AluOp::Cmp => "cmp",
            AluOp::Test => "test",
        }
    }

    /// CMP and TEST only update flags.
    #[must_use]
    pub const fn writes_result(self) -> bool {
        !matches!(self, AluOp::Cmp | AluOp::Test)
    }

    /// Compute `dest op src` at `size`, updating the arithmetic flags.
    pub fn perform_operation(self, flags: &mut Flags, size: DataSize, dest: u16, src: u16) -> u16 {
        let carry = flags.contains(Flags::CF);
        match self {
            AluOp::Add => add_with_flags(flags, dest, src, false, size),
            AluOp::Adc => add_with_flags(flags, dest, src, carry, size),
            AluOp::Sub | AluOp::Cmp => sub_with_flags(flags, dest, src, false, size),
            AluOp::Sbb => sub_with_flags(flags, dest, src, carry, size),
            AluOp::And | AluOp::Test => logic_with_flags(flags, dest & src, size),
            AluOp::Or => logic_with_flags(flags, dest | src, size),
            AluOp::Xor => logic_with_flags(flags, dest ^ src, size),
        }
    }
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

fn parity(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

fn set_result_flags(flags: &mut Flags, result: u16, size: DataSize) {
    flags.set(Flags::ZF, result == 0);
    flags.set(Flags::SF, result & size.sign_bit() != 0);
    flags.set(Flags::PF, parity(result as u8));
}

pub fn add_with_flags(flags: &mut Flags, dest: u16, src: u16, carry_in: bool, size: DataSize) -> u16 {
    let mask = size.mask();
    let dest = dest & mask;
    let src = src & mask;
    let full = u32::from(dest) + u32::from(src) + u32::from(carry_in);
    let result = (full as u16) & mask;

    let sb = size.sign_bit();
    flags.set(Flags::CF, full > u32::from(mask));
    flags.set(Flags::OF, (dest ^ result) & (src ^ result) & sb != 0);
    flags.set(Flags::AF, (dest ^ src ^ result) & 0x10 != 0);
    set_result_flags(flags, result, size);
    result
}

pub fn sub_with_flags(flags: &mut Flags, dest: u16, src: u16, borrow_in: bool, size: DataSize) -> u16 {
    let mask = size.mask();
    let dest = dest & mask;
    let src = src & mask;
    let subtrahend = u32::from(src) + u32::from(borrow_in);
    let result = (u32::from(dest).wrapping_sub(subtrahend) as u16) & mask;

    let sb = size.sign_bit();
    flags.set(Flags::CF, u32::from(dest) < subtrahend);
    flags.set(Flags::OF, (dest ^ src) & (dest ^ result) & sb != 0);
    flags.set(Flags::AF, (dest ^ src ^ result) & 0x10 != 0);
    set_result_flags(flags, result, size);
    result
}

pub fn logic_with_flags(flags: &mut Flags, result: u16, size: DataSize) -> u16 {
    let result = result & size.mask();
    flags.remove(Flags::CF | Flags::OF | Flags::AF);
    set_result_flags(flags, result, size);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sets_carry_and_zero_on_wrap() {
        let mut flags = Flags::default();
        let r = AluOp::Add.perform_operation(&mut flags, DataSize::Byte, 0xff, 0x01);
        assert_eq!(r, 0);
        assert!(flags.contains(Flags::CF | Flags::ZF | Flags::AF | Flags::PF));
        assert!(!flags.contains(Flags::OF));
    }

    #[test]
    fn add_signed_overflow() {
        let mut flags = Flags::default();
        let r = AluOp::Add.perform_operation(&mut flags, DataSize::Word, 0x7fff, 1);
        assert_eq!(r, 0x8000);
        assert!(flags.contains(Flags::OF | Flags::SF));
        assert!(!flags.contains(Flags::CF));
    }

    #[test]
    fn sub_borrow_sets_carry() {
        let mut flags = Flags::default();
        let r = AluOp::Sub.perform_operation(&mut flags, DataSize::Word, 1, 2);
        assert_eq!(r, 0xffff);
        assert!(flags.contains(Flags::CF | Flags::SF));
    }

    #[test]
    fn adc_and_sbb_consume_carry() {
        let mut flags = Flags::default() | Flags::CF;
        assert_eq!(
            AluOp::Adc.perform_operation(&mut flags, DataSize::Word, 1, 1),
            3
        );
        flags.insert(Flags::CF);
        assert_eq!(
            AluOp::Sbb.perform_operation(&mut flags, DataSize::Word, 5, 1),
            3
        );
    }

    #[test]
    fn logic_ops_clear_carry_and_overflow() {
        let mut flags = Flags::default() | Flags::CF | Flags::OF;
        let r = AluOp::Xor.perform_operation(&mut flags, DataSize::Word, 0x1234, 0x1234);
        assert_eq!(r, 0);
        assert!(flags.contains(Flags::ZF | Flags::PF));
        assert!(!flags.intersects(Flags::CF | Flags::OF));
    }

    #[test]
    fn group_extension_maps_to_operations() {
        let ops: Vec<_> = (0..8).map(|ext| AluOp::from_ext(ext).mnemonic()).collect();
        assert_eq!(ops, ["add", "or", "adc", "sbb", "and", "sub", "xor", "cmp"]);
        assert!(!AluOp::Cmp.writes_result());
        assert!(!AluOp::Test.writes_result());
    }
}
