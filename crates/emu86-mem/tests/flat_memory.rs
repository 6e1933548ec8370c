use emu86_mem::{FlatMemory, Memory, MemoryError, REAL_MODE_MEMORY_SIZE};
use proptest::prelude::*;

#[test]
fn words_are_little_endian() {
    let mut mem = FlatMemory::new(16);
    mem.write_u16(4, 0xbeef).unwrap();
    assert_eq!(mem.read_u8(4).unwrap(), 0xef);
    assert_eq!(mem.read_u8(5).unwrap(), 0xbe);
    assert_eq!(mem.read_u16(4).unwrap(), 0xbeef);
}

#[test]
fn out_of_range_byte_access_fails() {
    let mut mem = FlatMemory::new(8);
    assert_eq!(
        mem.read_u8(8),
        Err(MemoryError::OutOfRange {
            addr: 8,
            len: 1,
            size: 8
        })
    );
    assert!(mem.write_u8(100, 1).is_err());
}

#[test]
fn word_straddling_the_end_fails_without_partial_write() {
    let mut mem = FlatMemory::new(8);
    let err = mem.write_u16(7, 0x1234).unwrap_err();
    assert_eq!(
        err,
        MemoryError::OutOfRange {
            addr: 7,
            len: 2,
            size: 8
        }
    );
    assert_eq!(mem.read_u8(7).unwrap(), 0);
}

#[test]
fn bulk_load_is_all_or_nothing() {
    let mut mem = FlatMemory::new(8);
    assert!(mem.load(6, &[1, 2, 3]).is_err());
    assert_eq!(mem.as_slice(), &[0; 8]);

    mem.load(5, &[1, 2, 3]).unwrap();
    let mut buf = [0u8; 3];
    mem.read_into(5, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3]);
}

#[test]
fn real_mode_memory_is_one_mebibyte() {
    let mem = FlatMemory::default();
    assert_eq!(mem.size(), REAL_MODE_MEMORY_SIZE);
    assert!(mem.read_u8(0xf_ffff).is_ok());
    assert!(mem.read_u8(0x10_0000).is_err());
}

proptest! {
    #[test]
    fn word_write_then_read_matches(addr in 0u32..62, value in any::<u16>()) {
        let mut mem = FlatMemory::new(64);
        mem.write_u16(addr, value).unwrap();
        prop_assert_eq!(mem.read_u16(addr).unwrap(), value);
    }
}
