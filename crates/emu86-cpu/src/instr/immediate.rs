//! Register + immediate instructions without a MOD-REG-R/M byte.

use emu86_types::{DataSize, RegisterId};

use crate::error::DecodeError;
use crate::instr::alu::AluOp;
use crate::instr::fetch::ByteFetcher;
use crate::opcode::Opcode;
use crate::operand::Immediate;
use crate::state::CpuState;

fn read_immediate(size: DataSize, fetch: &mut ByteFetcher<'_>) -> Result<Immediate, DecodeError> {
    Ok(match size {
        DataSize::Byte => Immediate::byte(fetch.next_u8()?),
        DataSize::Word => Immediate::word(fetch.next_u16()?),
    })
}

/// `op AL, imm8` / `op AX, imm16` (`04`, `05`, `0C`, `0D`, ... `3C`, `3D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccumulatorImmediate {
    pub opcode: Opcode,
    pub op: AluOp,
    pub immediate: Immediate,
}

impl AccumulatorImmediate {
    pub fn decode(op: AluOp, opcode: Opcode, fetch: &mut ByteFetcher<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            opcode,
            op,
            immediate: read_immediate(opcode.data_size(), fetch)?,
        })
    }

    fn accumulator(&self) -> RegisterId {
        RegisterId::from_field(0, self.opcode.data_size())
    }

    pub(crate) fn execute(&self, cpu: &mut CpuState) {
        let acc = self.accumulator();
        let size = self.opcode.data_size();
        let lhs = cpu.read(acc);
        let result = self
            .op
            .perform_operation(&mut cpu.flags, size, lhs, self.immediate.value());
        if self.op.writes_result() {
            cpu.write(acc, result);
        }
    }

    pub fn to_assembly(&self) -> String {
        format!("{} {}, {}", self.op, self.accumulator(), self.immediate)
    }

    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = vec![self.opcode.value()];
        out.extend(self.immediate.raw_bytes());
        out
    }
}

/// `MOV reg, imm` (`B0..=BF`): bit 3 is the W bit, bits 0-2 the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovRegImmediate {
    pub opcode: Opcode,
    pub immediate: Immediate,
}

impl MovRegImmediate {
    pub fn decode(opcode: Opcode, fetch: &mut ByteFetcher<'_>) -> Result<Self, DecodeError> {
        let size = Self::size_of(opcode);
        Ok(Self {
            opcode,
            immediate: read_immediate(size, fetch)?,
        })
    }

    fn size_of(opcode: Opcode) -> DataSize {
        if opcode.value() & 0x08 != 0 {
            DataSize::Word
        } else {
            DataSize::Byte
        }
    }

    pub fn destination(&self) -> RegisterId {
        RegisterId::from_field(self.opcode.value(), Self::size_of(self.opcode))
    }

    pub(crate) fn execute(&self, cpu: &mut CpuState) {
        cpu.write(self.destination(), self.immediate.value());
    }

    pub fn to_assembly(&self) -> String {
        format!("mov {}, {}", self.destination(), self.immediate)
    }

    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = vec![self.opcode.value()];
        out.extend(self.immediate.raw_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu86_types::Reg16;

    #[test]
    fn mov_byte_immediate_targets_high_half() {
        let mut fetch = ByteFetcher::new(&[0x7f]);
        // b4 = mov ah, imm8
        let inst = MovRegImmediate::decode(Opcode::new(0xb4), &mut fetch).unwrap();
        let mut cpu = CpuState::new();
        cpu.set_reg16(Reg16::Ax, 0x0011);
        inst.execute(&mut cpu);
        assert_eq!(cpu.reg16(Reg16::Ax), 0x7f11);
        assert_eq!(inst.to_assembly(), "mov ah, 0x7f");
        assert_eq!(inst.raw_data(), [0xb4, 0x7f]);
    }

    #[test]
    fn mov_word_immediate() {
        let mut fetch = ByteFetcher::new(&[0x34, 0x12]);
        // bf = mov di, imm16
        let inst = MovRegImmediate::decode(Opcode::new(0xbf), &mut fetch).unwrap();
        let mut cpu = CpuState::new();
        inst.execute(&mut cpu);
        assert_eq!(cpu.reg16(Reg16::Di), 0x1234);
        assert_eq!(inst.to_assembly(), "mov di, 0x1234");
    }

    #[test]
    fn accumulator_immediate_uses_al_or_ax() {
        let mut cpu = CpuState::new();
        cpu.set_reg16(Reg16::Ax, 0x01f0);

        let mut fetch = ByteFetcher::new(&[0x0f]);
        let inst = AccumulatorImmediate::decode(AluOp::And, Opcode::new(0x24), &mut fetch).unwrap();
        inst.execute(&mut cpu);
        assert_eq!(cpu.reg16(Reg16::Ax), 0x0100);
        assert_eq!(inst.to_assembly(), "and al, 0xf");

        let mut fetch = ByteFetcher::new(&[0x00, 0x01]);
        let inst = AccumulatorImmediate::decode(AluOp::Cmp, Opcode::new(0x3d), &mut fetch).unwrap();
        inst.execute(&mut cpu);
        assert_eq!(cpu.reg16(Reg16::Ax), 0x0100);
        assert!(cpu.flag(crate::state::Flags::ZF));
        assert_eq!(inst.raw_data(), [0x3d, 0x00, 0x01]);
    }
}
