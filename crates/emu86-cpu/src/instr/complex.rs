//! R/M instructions with a trailing immediate: group-1 ALU (`80`, `81`, `83`)
//! and `MOV r/m, imm` (`C6`, `C7`). The REG field is an operation selector
//! rather than an operand, and the R/M operand is always the destination.

use emu86_mem::Memory;

use crate::error::{CpuError, DecodeError};
use crate::instr::fetch::ByteFetcher;
use crate::instr::modrm::{ModRmFamily, ModRmFields};
use crate::opcode::Opcode;
use crate::operand::{Immediate, RmOperand};
use crate::state::CpuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComplexInstruction {
    pub family: ModRmFamily,
    pub fields: ModRmFields,
    pub immediate: Immediate,
}

impl ComplexInstruction {
    /// Decodes the MOD-REG-R/M byte, its displacement, then the immediate.
    ///
    /// `sign_extend_imm8` selects the `83` encoding: a single immediate byte
    /// widened to a word operand.
    pub fn decode(
        family: ModRmFamily,
        opcode: Opcode,
        sign_extend_imm8: bool,
        fetch: &mut ByteFetcher<'_>,
    ) -> Result<Self, DecodeError> {
        let fields = ModRmFields::decode(opcode, fetch)?;
        let immediate = match opcode.immediate_read_length() {
            _ if sign_extend_imm8 => Immediate::sign_extended(fetch.next_u8()?),
            1 => Immediate::byte(fetch.next_u8()?),
            _ => Immediate::word(fetch.next_u16()?),
        };
        Ok(Self {
            family,
            fields,
            immediate,
        })
    }

    pub(crate) fn execute(&self, cpu: &mut CpuState, mem: &mut dyn Memory) -> Result<(), CpuError> {
        let size = self.fields.size();
        let dest = self.fields.rm_operand().locate(cpu);
        let src = self.immediate.value();
        match self.family {
            ModRmFamily::Alu(op) => {
                let lhs = dest.read(size, cpu, mem)?;
                let result = op.perform_operation(&mut cpu.flags, size, lhs, src);
                if op.writes_result() {
                    dest.write(size, result, cpu, mem)?;
                }
            }
            ModRmFamily::Mov => dest.write(size, src, cpu, mem)?,
        }
        Ok(())
    }

    pub fn to_assembly(&self) -> String {
        let rm = match self.fields.rm_operand() {
            RmOperand::Register(reg) => reg.to_string(),
            RmOperand::Memory(mem) => format!("{} {mem}", self.fields.size().keyword()),
        };
        format!("{} {rm}, {}", self.family.mnemonic(), self.immediate)
    }

    /// Opcode, MOD-REG-R/M, displacement, then immediate bytes.
    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = self.fields.raw_data();
        out.extend(self.immediate.raw_bytes());
        out
    }
}
