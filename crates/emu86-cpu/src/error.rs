use emu86_mem::MemoryError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("instruction truncated: needed {needed} bytes, only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    #[error("unknown instruction: opcode 0x{opcode:02x}")]
    UnknownOpcode { opcode: u8 },

    #[error("unknown instruction: opcode 0x{opcode:02x} /{ext}")]
    UnknownExtension { opcode: u8, ext: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("cpu is halted")]
    Halted,
}
