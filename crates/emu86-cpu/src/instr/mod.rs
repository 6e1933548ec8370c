//! Decoded instructions.
//!
//! [`decode`] turns a byte window starting at IP into one [`Instruction`]. An
//! instruction is immutable once decoded: [`Instruction::execute`] applies it
//! to the register file and memory, while [`Instruction::to_assembly`] and
//! [`Instruction::raw_data`] are pure queries over the bytes it was decoded from.

use core::fmt;

use emu86_mem::Memory;

use crate::error::CpuError;
use crate::opcode::Opcode;
use crate::state::CpuState;

pub mod alu;
pub mod complex;
mod decode;
pub mod fetch;
pub mod immediate;
pub mod modrm;
pub mod stack;

pub use alu::AluOp;
pub use complex::ComplexInstruction;
pub use decode::decode;
pub use fetch::ByteFetcher;
pub use immediate::{AccumulatorImmediate, MovRegImmediate};
pub use modrm::{ModRmFamily, ModRmFields, ModRmHandler, ModRmInstruction, Mov};
pub use stack::{StackInstruction, StackOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// REG and R/M operands: ALU families, `TEST`, `MOV`.
    ModRm(ModRmInstruction),
    /// R/M destination with an immediate source.
    Complex(ComplexInstruction),
    AccumulatorImmediate(AccumulatorImmediate),
    MovRegImmediate(MovRegImmediate),
    Stack(StackInstruction),
    Nop(Opcode),
    Hlt(Opcode),
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::ModRm(inst) => inst.fields.opcode,
            Instruction::Complex(inst) => inst.fields.opcode,
            Instruction::AccumulatorImmediate(inst) => inst.opcode,
            Instruction::MovRegImmediate(inst) => inst.opcode,
            Instruction::Stack(inst) => inst.opcode,
            Instruction::Nop(opcode) | Instruction::Hlt(opcode) => *opcode,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::ModRm(inst) => inst.family.mnemonic(),
            Instruction::Complex(inst) => inst.family.mnemonic(),
            Instruction::AccumulatorImmediate(inst) => inst.op.mnemonic(),
            Instruction::MovRegImmediate(_) => "mov",
            Instruction::Stack(inst) => inst.op.mnemonic(),
            Instruction::Nop(_) => "nop",
            Instruction::Hlt(_) => "hlt",
        }
    }

    /// Applies the instruction and returns the IP of the next one.
    ///
    /// `ip` is the offset this instruction was fetched from. Register and memory
    /// faults propagate unchanged.
    pub fn execute(
        &self,
        ip: u16,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<u16, CpuError> {
        match self {
            Instruction::ModRm(inst) => inst.execute(cpu, mem)?,
            Instruction::Complex(inst) => inst.execute(cpu, mem)?,
            Instruction::AccumulatorImmediate(inst) => inst.execute(cpu),
            Instruction::MovRegImmediate(inst) => inst.execute(cpu),
            Instruction::Stack(inst) => inst.execute(cpu, mem)?,
            Instruction::Nop(_) | Instruction::Hlt(_) => {}
        }
        Ok(ip.wrapping_add(self.raw_size()))
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Instruction::Hlt(_))
    }

    /// Intel-syntax disassembly.
    pub fn to_assembly(&self) -> String {
        match self {
            Instruction::ModRm(inst) => inst.to_assembly(),
            Instruction::Complex(inst) => inst.to_assembly(),
            Instruction::AccumulatorImmediate(inst) => inst.to_assembly(),
            Instruction::MovRegImmediate(inst) => inst.to_assembly(),
            Instruction::Stack(inst) => inst.to_assembly(),
            Instruction::Nop(_) | Instruction::Hlt(_) => self.mnemonic().to_string(),
        }
    }

    /// The exact bytes this instruction was decoded from.
    pub fn raw_data(&self) -> Vec<u8> {
        match self {
            Instruction::ModRm(inst) => inst.raw_data(),
            Instruction::Complex(inst) => inst.raw_data(),
            Instruction::AccumulatorImmediate(inst) => inst.raw_data(),
            Instruction::MovRegImmediate(inst) => inst.raw_data(),
            Instruction::Stack(inst) => inst.raw_data(),
            Instruction::Nop(opcode) | Instruction::Hlt(opcode) => vec![opcode.value()],
        }
    }

    /// Encoded length in bytes.
    pub fn raw_size(&self) -> u16 {
        self.raw_data().len() as u16
    }

    /// Raw bytes as `0x..` hex joined by `separator`.
    pub fn raw_data_string(&self, separator: &str) -> String {
        self.raw_data()
            .iter()
            .map(|b| format!("0x{b:02x}"))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_assembly())
    }
}
