//! Bit extraction and number formatting helpers.

/// Returns bit `index` of `value` (0 is the least significant bit).
#[must_use]
pub const fn bit(value: u8, index: u32) -> bool {
    (value >> index) & 1 != 0
}

/// Returns `count` bits of `value` starting at bit `index`.
#[must_use]
pub const fn bits(value: u8, index: u32, count: u32) -> u8 {
    let mask = ((1u16 << count) - 1) as u8;
    (value >> index) & mask
}

#[must_use]
pub const fn low_byte(value: u16) -> u8 {
    (value & 0xff) as u8
}

#[must_use]
pub const fn high_byte(value: u16) -> u8 {
    (value >> 8) as u8
}

#[must_use]
pub const fn word_from_bytes(low: u8, high: u8) -> u16 {
    (low as u16) | ((high as u16) << 8)
}

/// `0x`-prefixed lowercase hex, as used for immediates and absolute addresses.
#[must_use]
pub fn to_hex(value: u16) -> String {
    format!("0x{value:x}")
}

/// `0b`-prefixed, zero-padded 8-bit binary.
#[must_use]
pub fn to_binary_u8(value: u8) -> String {
    format!("0b{value:08b}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_hex_and_binary() {
        assert_eq!(to_hex(0x1234), "0x1234");
        assert_eq!(to_hex(0), "0x0");
        assert_eq!(to_binary_u8(0x05), "0b00000101");
    }

    #[test]
    fn extracts_bit_ranges() {
        assert_eq!(bits(0b1101_1000, 6, 2), 0b11);
        assert_eq!(bits(0b1101_1000, 3, 3), 0b011);
        assert_eq!(bits(0b1101_1000, 0, 3), 0b000);
        assert!(bit(0b10, 1));
        assert!(!bit(0b10, 0));
    }

    proptest! {
        #[test]
        fn word_splits_and_rejoins(value in any::<u16>()) {
            prop_assert_eq!(word_from_bytes(low_byte(value), high_byte(value)), value);
        }
    }
}
