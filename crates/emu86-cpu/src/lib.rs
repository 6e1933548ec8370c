#![forbid(unsafe_code)]

//! 8086 instruction core: decode a byte window into an [`Instruction`], run it
//! against a [`CpuState`] and guest memory, and disassemble it back to text.

pub mod cpu;
pub mod error;
pub mod instr;
pub mod modrm;
pub mod opcode;
pub mod operand;
pub mod state;

pub use cpu::{Cpu, RunSummary, StepOutcome, MAX_INSTRUCTION_LEN};
pub use error::{CpuError, DecodeError};
pub use instr::{decode, Instruction};
pub use modrm::{AddressingMode, DisplacementType, ModRegRm};
pub use opcode::Opcode;
pub use operand::{Displacement, Immediate, Location, MemoryOperand, RmOperand};
pub use state::{CpuState, Flags};

pub use emu86_mem::{FlatMemory, Memory, MemoryError};
pub use emu86_types::{DataSize, Direction, Reg16, RegisterId, RegisterPart, SegReg};
