//! Instructions carrying a MOD-REG-R/M byte with a register on one side and a
//! register or memory operand on the other (`ADD r/m, reg`, `MOV reg, r/m`, ...).

use emu86_mem::Memory;
use emu86_types::{DataSize, Direction, RegisterId};

use crate::error::{CpuError, DecodeError};
use crate::instr::alu::AluOp;
use crate::instr::fetch::ByteFetcher;
use crate::modrm::{AddressingMode, ModRegRm};
use crate::opcode::Opcode;
use crate::operand::{Displacement, Location, MemoryOperand, RmOperand};
use crate::state::CpuState;

/// Opcode, MOD-REG-R/M byte and displacement: the part of the encoding shared
/// by every R/M-operand instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModRmFields {
    pub opcode: Opcode,
    pub modrm: ModRegRm,
    pub displacement: Option<Displacement>,
}

impl ModRmFields {
    /// Pulls the MOD-REG-R/M byte and however many displacement bytes it asks for.
    pub fn decode(opcode: Opcode, fetch: &mut ByteFetcher<'_>) -> Result<Self, DecodeError> {
        let modrm = ModRegRm::new(fetch.next_u8()?);
        let displacement = match modrm.displacement_read_length() {
            0 => None,
            1 => Some(Displacement::from_byte(fetch.next_u8()?)),
            _ => Some(Displacement::from_word(fetch.next_u16()?)),
        };
        Ok(Self {
            opcode,
            modrm,
            displacement,
        })
    }

    pub fn size(&self) -> DataSize {
        self.opcode.data_size()
    }

    pub fn reg_operand(&self) -> RegisterId {
        self.modrm.register_from_reg(self.size())
    }

    pub fn rm_operand(&self) -> RmOperand {
        self.rm_operand_for(self.modrm.addressing_mode())
    }

    /// Interpret the R/M field under `mode`. Every addressing mode is handled
    /// here so that execution and disassembly always agree.
    fn rm_operand_for(&self, mode: AddressingMode) -> RmOperand {
        let base = self.modrm.displacement_type();
        match mode {
            AddressingMode::RegisterAddressing => {
                RmOperand::Register(self.modrm.register_from_rm(self.size()))
            }
            AddressingMode::NoDisplacement => match self.displacement {
                Some(direct) if self.modrm.is_direct_address() => {
                    RmOperand::Memory(MemoryOperand::Direct(direct.offset()))
                }
                _ => RmOperand::Memory(MemoryOperand::Based {
                    base,
                    displacement: None,
                }),
            },
            AddressingMode::ByteDisplacement | AddressingMode::WordDisplacement => {
                RmOperand::Memory(MemoryOperand::Based {
                    base,
                    displacement: self.displacement,
                })
            }
        }
    }

    /// Order the REG and R/M assembly arguments by the opcode's direction bit.
    pub fn arguments_by_direction(&self, reg: &str, rm: &str) -> String {
        match self.opcode.direction() {
            Direction::RegIsDestination => format!("{reg}, {rm}"),
            Direction::RegIsSource => format!("{rm}, {reg}"),
        }
    }

    /// Opcode, MOD-REG-R/M, then 0-2 displacement bytes.
    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = vec![self.opcode.value(), self.modrm.value()];
        if let Some(disp) = self.displacement {
            out.extend(disp.raw_bytes());
        }
        out
    }

    /// Invoke exactly one of `handler`'s operand-shape hooks, with operands
    /// ordered `(destination, source)` according to the direction bit.
    pub fn dispatch<H: ModRmHandler + ?Sized>(
        &self,
        handler: &H,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError> {
        let size = self.size();
        let reg = self.reg_operand();
        match (self.rm_operand(), self.opcode.direction()) {
            (RmOperand::Register(rm), Direction::RegIsSource) => {
                handler.reg_reg(size, rm, reg, cpu)
            }
            (RmOperand::Register(rm), Direction::RegIsDestination) => {
                handler.reg_reg(size, reg, rm, cpu)
            }
            (RmOperand::Memory(operand), Direction::RegIsSource) => {
                let addr = operand.physical_address(cpu);
                handler.mem_reg(size, addr, reg, cpu, mem)
            }
            (RmOperand::Memory(operand), Direction::RegIsDestination) => {
                let addr = operand.physical_address(cpu);
                handler.reg_mem(size, reg, addr, cpu, mem)
            }
        }
    }
}

/// Semantics of a REG/R-M instruction family, one hook per operand shape.
///
/// Memory operands are passed as physical addresses.
pub trait ModRmHandler {
    fn reg_reg(
        &self,
        size: DataSize,
        dest: RegisterId,
        src: RegisterId,
        cpu: &mut CpuState,
    ) -> Result<(), CpuError>;

    fn reg_mem(
        &self,
        size: DataSize,
        dest: RegisterId,
        src: u32,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError>;

    fn mem_reg(
        &self,
        size: DataSize,
        dest: u32,
        src: RegisterId,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError>;
}

impl AluOp {
    pub(crate) fn apply(
        self,
        size: DataSize,
        dest: Location,
        src: Location,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError> {
        let lhs = dest.read(size, cpu, mem)?;
        let rhs = src.read(size, cpu, mem)?;
        let result = self.perform_operation(&mut cpu.flags, size, lhs, rhs);
        if self.writes_result() {
            dest.write(size, result, cpu, mem)?;
        }
        Ok(())
    }
}

impl ModRmHandler for AluOp {
    fn reg_reg(
        &self,
        size: DataSize,
        dest: RegisterId,
        src: RegisterId,
        cpu: &mut CpuState,
    ) -> Result<(), CpuError> {
        let lhs = cpu.read(dest);
        let rhs = cpu.read(src);
        let result = self.perform_operation(&mut cpu.flags, size, lhs, rhs);
        if self.writes_result() {
            cpu.write(dest, result);
        }
        Ok(())
    }

    fn reg_mem(
        &self,
        size: DataSize,
        dest: RegisterId,
        src: u32,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError> {
        self.apply(size, Location::Register(dest), Location::Memory(src), cpu, mem)
    }

    fn mem_reg(
        &self,
        size: DataSize,
        dest: u32,
        src: RegisterId,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError> {
        self.apply(size, Location::Memory(dest), Location::Register(src), cpu, mem)
    }
}

/// `MOV` between a register and a register or memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mov;

impl ModRmHandler for Mov {
    fn reg_reg(
        &self,
        _size: DataSize,
        dest: RegisterId,
        src: RegisterId,
        cpu: &mut CpuState,
    ) -> Result<(), CpuError> {
        let value = cpu.read(src);
        cpu.write(dest, value);
        Ok(())
    }

    fn reg_mem(
        &self,
        size: DataSize,
        dest: RegisterId,
        src: u32,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError> {
        let value = Location::Memory(src).read(size, cpu, mem)?;
        cpu.write(dest, value);
        Ok(())
    }

    fn mem_reg(
        &self,
        size: DataSize,
        dest: u32,
        src: RegisterId,
        cpu: &mut CpuState,
        mem: &mut dyn Memory,
    ) -> Result<(), CpuError> {
        let value = cpu.read(src);
        Location::Memory(dest).write(size, value, cpu, mem)?;
        Ok(())
    }
}

/// Operation performed by a REG/R-M instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModRmFamily {
    Alu(AluOp),
    Mov,
}

impl ModRmFamily {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ModRmFamily::Alu(op) => op.mnemonic(),
            ModRmFamily::Mov => "mov",
        }
    }
}

/// A REG/R-M instruction: `family` applied to the operands in `fields`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModRmInstruction {
    pub family: ModRmFamily,
    pub fields: ModRmFields,
}

impl ModRmInstruction {
    pub fn decode(
        family: ModRmFamily,
        opcode: Opcode,
        fetch: &mut ByteFetcher<'_>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            family,
            fields: ModRmFields::decode(opcode, fetch)?,
        })
    }

    pub(crate) fn execute(&self, cpu: &mut CpuState, mem: &mut dyn Memory) -> Result<(), CpuError> {
        match self.family {
            ModRmFamily::Alu(op) => self.fields.dispatch(&op, cpu, mem),
            ModRmFamily::Mov => self.fields.dispatch(&Mov, cpu, mem),
        }
    }

    pub fn to_assembly(&self) -> String {
        let reg = self.fields.reg_operand().to_string();
        let rm = self.fields.rm_operand().to_string();
        format!(
            "{} {}",
            self.family.mnemonic(),
            self.fields.arguments_by_direction(&reg, &rm)
        )
    }

    pub fn raw_data(&self) -> Vec<u8> {
        self.fields.raw_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu86_mem::FlatMemory;
    use emu86_types::Reg16;

    #[derive(Default)]
    struct Recorder {
        calls: std::cell::RefCell<Vec<String>>,
    }

    impl ModRmHandler for Recorder {
        fn reg_reg(
            &self,
            _size: DataSize,
            dest: RegisterId,
            src: RegisterId,
            _cpu: &mut CpuState,
        ) -> Result<(), CpuError> {
            self.calls.borrow_mut().push(format!("reg_reg {dest} {src}"));
            Ok(())
        }

        fn reg_mem(
            &self,
            _size: DataSize,
            dest: RegisterId,
            src: u32,
            _cpu: &mut CpuState,
            _mem: &mut dyn Memory,
        ) -> Result<(), CpuError> {
            self.calls
                .borrow_mut()
                .push(format!("reg_mem {dest} 0x{src:x}"));
            Ok(())
        }

        fn mem_reg(
            &self,
            _size: DataSize,
            dest: u32,
            src: RegisterId,
            _cpu: &mut CpuState,
            _mem: &mut dyn Memory,
        ) -> Result<(), CpuError> {
            self.calls
                .borrow_mut()
                .push(format!("mem_reg 0x{dest:x} {src}"));
            Ok(())
        }
    }

    fn fields(bytes: &[u8]) -> ModRmFields {
        let mut fetch = ByteFetcher::new(&bytes[1..]);
        ModRmFields::decode(Opcode::new(bytes[0]), &mut fetch).unwrap()
    }

    fn dispatched(bytes: &[u8], cpu: &mut CpuState) -> Vec<String> {
        let recorder = Recorder::default();
        let mut mem = FlatMemory::new(0x100);
        fields(bytes).dispatch(&recorder, cpu, &mut mem).unwrap();
        recorder.calls.into_inner()
    }

    #[test]
    fn direction_bit_orders_register_operands() {
        let mut cpu = CpuState::new();
        // d=0: R/M is the destination.
        assert_eq!(dispatched(&[0x01, 0xd8], &mut cpu), ["reg_reg ax bx"]);
        // d=1: REG is the destination.
        assert_eq!(dispatched(&[0x03, 0xd8], &mut cpu), ["reg_reg bx ax"]);
    }

    #[test]
    fn memory_operand_goes_to_the_matching_hook() {
        let mut cpu = CpuState::new();
        cpu.set_reg16(Reg16::Si, 0x40);
        // 00 000 100: [si]
        assert_eq!(dispatched(&[0x01, 0x04], &mut cpu), ["mem_reg 0x40 ax"]);
        assert_eq!(dispatched(&[0x03, 0x04], &mut cpu), ["reg_mem ax 0x40"]);
    }

    #[test]
    fn direct_address_is_not_added_to_bp() {
        let mut cpu = CpuState::new();
        cpu.set_reg16(Reg16::Bp, 0x10);
        // 00 001 110 + disp16 0x0020: [0x20], reg=cx
        let f = fields(&[0x8b, 0x0e, 0x20, 0x00]);
        assert_eq!(f.rm_operand(), RmOperand::Memory(MemoryOperand::Direct(0x20)));
        assert_eq!(dispatched(&[0x8b, 0x0e, 0x20, 0x00], &mut cpu), ["reg_mem cx 0x20"]);
    }

    #[test]
    fn raw_data_reproduces_consumed_bytes() {
        for bytes in [
            &[0x01, 0xd8][..],
            &[0x03, 0x04][..],
            &[0x02, 0x47, 0xfe][..],
            &[0x89, 0x87, 0x34, 0x12][..],
            &[0x8b, 0x1e, 0x00, 0x80][..],
        ] {
            let f = fields(bytes);
            assert_eq!(f.raw_data(), bytes);
        }
    }

    #[test]
    fn assembly_argument_order_matches_execution_order() {
        let add = ModRmInstruction {
            family: ModRmFamily::Alu(AluOp::Add),
            fields: fields(&[0x01, 0xd8]),
        };
        assert_eq!(add.to_assembly(), "add ax, bx");

        let mov = ModRmInstruction {
            family: ModRmFamily::Mov,
            fields: fields(&[0x8a, 0x40, 0x04]),
        };
        assert_eq!(mov.to_assembly(), "mov al, [bx+si+4]");
    }
}
