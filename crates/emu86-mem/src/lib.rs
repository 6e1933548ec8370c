#![forbid(unsafe_code)]

//! Flat, byte-addressable guest memory.
//!
//! Addresses are absolute (already segment-translated) 32-bit values. Every
//! access is bounds-checked; an out-of-range access is reported to the caller
//! instead of wrapping or panicking.

use thiserror::Error;

/// Size of the 8086 real-mode address space (20 address lines).
pub const REAL_MODE_MEMORY_SIZE: u32 = 0x10_0000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory access out of range: addr=0x{addr:05x} len={len} size=0x{size:x}")]
    OutOfRange { addr: u32, len: usize, size: u32 },
}

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Byte-granular guest memory.
///
/// Implementations only need to provide single-byte access; wider and bulk
/// accessors are built on top of it.
pub trait Memory {
    fn size(&self) -> u32;

    fn read_u8(&self, addr: u32) -> MemoryResult<u8>;

    fn write_u8(&mut self, addr: u32, value: u8) -> MemoryResult<()>;

    fn check_range(&self, addr: u32, len: usize) -> MemoryResult<()> {
        let size = self.size();
        let end = u64::from(addr) + len as u64;
        if end > u64::from(size) {
            return Err(MemoryError::OutOfRange { addr, len, size });
        }
        Ok(())
    }

    fn read_u16(&self, addr: u32) -> MemoryResult<u16> {
        self.check_range(addr, 2)?;
        let lo = self.read_u8(addr)?;
        let hi = self.read_u8(addr + 1)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn write_u16(&mut self, addr: u32, value: u16) -> MemoryResult<()> {
        self.check_range(addr, 2)?;
        let [lo, hi] = value.to_le_bytes();
        self.write_u8(addr, lo)?;
        self.write_u8(addr + 1, hi)
    }

    /// Reads `dst.len()` bytes starting at `addr`.
    fn read_into(&self, addr: u32, dst: &mut [u8]) -> MemoryResult<()> {
        self.check_range(addr, dst.len())?;
        for (i, slot) in dst.iter_mut().enumerate() {
            *slot = self.read_u8(addr + i as u32)?;
        }
        Ok(())
    }

    /// Copies `data` into memory at `addr`. Nothing is written unless the whole
    /// range fits.
    fn load(&mut self, addr: u32, data: &[u8]) -> MemoryResult<()> {
        self.check_range(addr, data.len())?;
        for (i, byte) in data.iter().enumerate() {
            self.write_u8(addr + i as u32, *byte)?;
        }
        Ok(())
    }
}

/// Contiguous zero-initialised memory backed by a `Vec<u8>`.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    bytes: Vec<u8>,
}

impl FlatMemory {
    pub fn new(size: u32) -> Self {
        Self {
            bytes: vec![0; size as usize],
        }
    }

    /// A full 1 MiB real-mode address space.
    pub fn real_mode() -> Self {
        Self::new(REAL_MODE_MEMORY_SIZE)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::real_mode()
    }
}

impl Memory for FlatMemory {
    fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn read_u8(&self, addr: u32) -> MemoryResult<u8> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::OutOfRange {
                addr,
                len: 1,
                size: self.size(),
            })
    }

    fn write_u8(&mut self, addr: u32, value: u8) -> MemoryResult<()> {
        let size = self.size();
        let slot = self
            .bytes
            .get_mut(addr as usize)
            .ok_or(MemoryError::OutOfRange { addr, len: 1, size })?;
        *slot = value;
        Ok(())
    }

    fn read_into(&self, addr: u32, dst: &mut [u8]) -> MemoryResult<()> {
        self.check_range(addr, dst.len())?;
        let start = addr as usize;
        dst.copy_from_slice(&self.bytes[start..start + dst.len()]);
        Ok(())
    }

    fn load(&mut self, addr: u32, data: &[u8]) -> MemoryResult<()> {
        self.check_range(addr, data.len())?;
        let start = addr as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        tracing::debug!(addr, len = data.len(), "loaded bytes into memory");
        Ok(())
    }
}
