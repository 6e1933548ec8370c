use emu86_mem::Memory;
use emu86_types::{Reg16, RegisterId, SegReg};

use crate::error::CpuError;
use crate::opcode::Opcode;
use crate::state::CpuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackOp {
    Push,
    Pop,
}

impl StackOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            StackOp::Push => "push",
            StackOp::Pop => "pop",
        }
    }
}

/// `PUSH reg` (`50..=57`) / `POP reg` (`58..=5F`). The register lives in the
/// opcode's low three bits, so the encoding is a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackInstruction {
    pub opcode: Opcode,
    pub op: StackOp,
}

impl StackInstruction {
    pub fn new(opcode: Opcode) -> Self {
        let op = if opcode.value() & 0x08 == 0 {
            StackOp::Push
        } else {
            StackOp::Pop
        };
        Self { opcode, op }
    }

    pub fn register(&self) -> Reg16 {
        self.opcode.embedded_register()
    }

    pub(crate) fn execute(&self, cpu: &mut CpuState, mem: &mut dyn Memory) -> Result<(), CpuError> {
        let reg = RegisterId::full(self.register());
        match self.op {
            StackOp::Push => {
                // `push sp` stores the decremented value. SP only moves once
                // the write has landed.
                let sp = cpu.reg16(Reg16::Sp).wrapping_sub(2);
                let value = if self.register() == Reg16::Sp {
                    sp
                } else {
                    cpu.read(reg)
                };
                mem.write_u16(cpu.physical(SegReg::Ss, sp), value)?;
                cpu.set_reg16(Reg16::Sp, sp);
            }
            StackOp::Pop => {
                let value = mem.read_u16(cpu.stack_address())?;
                let sp = cpu.reg16(Reg16::Sp).wrapping_add(2);
                cpu.set_reg16(Reg16::Sp, sp);
                cpu.write(reg, value);
            }
        }
        Ok(())
    }

    pub fn to_assembly(&self) -> String {
        format!("{} {}", self.op.mnemonic(), self.register())
    }

    pub fn raw_data(&self) -> Vec<u8> {
        vec![self.opcode.value()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu86_mem::FlatMemory;

    #[test]
    fn push_then_pop_restores_value_and_sp() {
        let mut cpu = CpuState::new();
        let mut mem = FlatMemory::new(0x2_0000);
        cpu.set_segment(SegReg::Ss, 0x1000);
        cpu.set_reg16(Reg16::Sp, 0x0100);
        cpu.set_reg16(Reg16::Dx, 0xcafe);

        let push = StackInstruction::new(Opcode::new(0x52));
        assert_eq!(push.to_assembly(), "push dx");
        push.execute(&mut cpu, &mut mem).unwrap();
        assert_eq!(cpu.reg16(Reg16::Sp), 0x00fe);
        assert_eq!(mem.read_u16(0x1_00fe).unwrap(), 0xcafe);

        cpu.set_reg16(Reg16::Dx, 0);
        let pop = StackInstruction::new(Opcode::new(0x5a));
        assert_eq!(pop.to_assembly(), "pop dx");
        pop.execute(&mut cpu, &mut mem).unwrap();
        assert_eq!(cpu.reg16(Reg16::Dx), 0xcafe);
        assert_eq!(cpu.reg16(Reg16::Sp), 0x0100);
    }

    #[test]
    fn push_sp_stores_decremented_value() {
        let mut cpu = CpuState::new();
        let mut mem = FlatMemory::new(0x200);
        cpu.set_reg16(Reg16::Sp, 0x100);
        StackInstruction::new(Opcode::new(0x54))
            .execute(&mut cpu, &mut mem)
            .unwrap();
        assert_eq!(mem.read_u16(0xfe).unwrap(), 0xfe);
    }

    #[test]
    fn stack_fault_propagates() {
        let mut cpu = CpuState::new();
        let mut mem = FlatMemory::new(0x10);
        cpu.set_reg16(Reg16::Sp, 0x100);
        let err = StackInstruction::new(Opcode::new(0x50))
            .execute(&mut cpu, &mut mem)
            .unwrap_err();
        assert!(matches!(err, CpuError::Memory(_)));
        assert_eq!(cpu.reg16(Reg16::Sp), 0x100);
    }

    #[test]
    fn pop_fault_leaves_sp_and_register_untouched() {
        let mut cpu = CpuState::new();
        let mut mem = FlatMemory::new(0x10);
        cpu.set_reg16(Reg16::Sp, 0x100);
        cpu.set_reg16(Reg16::Bx, 0x1234);
        let err = StackInstruction::new(Opcode::new(0x5b))
            .execute(&mut cpu, &mut mem)
            .unwrap_err();
        assert!(matches!(err, CpuError::Memory(_)));
        assert_eq!(cpu.reg16(Reg16::Sp), 0x100);
        assert_eq!(cpu.reg16(Reg16::Bx), 0x1234);
    }
}
