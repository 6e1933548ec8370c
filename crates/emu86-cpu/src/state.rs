use bitflags::bitflags;
use emu86_types::{Reg16, RegisterId, RegisterPart, SegReg};

bitflags! {
    /// The 8086 FLAGS register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u16 {
        const CF = 1 << 0;
        const RESERVED_1 = 1 << 1;
        const PF = 1 << 2;
        const AF = 1 << 4;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const TF = 1 << 8;
        const IF = 1 << 9;
        const DF = 1 << 10;
        const OF = 1 << 11;
    }
}

impl Flags {
    pub const ARITH: Flags = Flags::CF
        .union(Flags::PF)
        .union(Flags::AF)
        .union(Flags::ZF)
        .union(Flags::SF)
        .union(Flags::OF);
}

impl Default for Flags {
    fn default() -> Self {
        // Bit 1 always reads as set.
        Flags::RESERVED_1
    }
}

/// Architectural register file of one 8086.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuState {
    gpr: [u16; 8],
    segments: [u16; 4],
    pub ip: u16,
    pub flags: Flags,
}

impl CpuState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reg16(&self, reg: Reg16) -> u16 {
        self.gpr[reg.index()]
    }

    pub fn set_reg16(&mut self, reg: Reg16, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Reads a register operand. Byte parts are returned zero-extended.
    pub fn read(&self, id: RegisterId) -> u16 {
        let full = self.reg16(id.reg);
        match id.part {
            RegisterPart::Full => full,
            RegisterPart::Low => full & 0x00ff,
            RegisterPart::High => full >> 8,
        }
    }

    /// Writes a register operand. Byte parts only replace their own half.
    pub fn write(&mut self, id: RegisterId, value: u16) {
        let slot = &mut self.gpr[id.reg.index()];
        *slot = match id.part {
            RegisterPart::Full => value,
            RegisterPart::Low => (*slot & 0xff00) | (value & 0x00ff),
            RegisterPart::High => (*slot & 0x00ff) | ((value & 0x00ff) << 8),
        };
    }

    pub fn segment(&self, seg: SegReg) -> u16 {
        self.segments[seg.index()]
    }

    pub fn set_segment(&mut self, seg: SegReg, value: u16) {
        self.segments[seg.index()] = value;
    }

    /// Translate `seg:offset` to a 20-bit physical address, wrapping at 1 MiB.
    pub fn physical(&self, seg: SegReg, offset: u16) -> u32 {
        ((u32::from(self.segment(seg)) << 4) + u32::from(offset)) & 0xf_ffff
    }

    /// Physical address of the next instruction (CS:IP).
    pub fn code_address(&self) -> u32 {
        self.physical(SegReg::Cs, self.ip)
    }

    /// Physical address of the top of stack (SS:SP).
    pub fn stack_address(&self) -> u32 {
        self.physical(SegReg::Ss, self.reg16(Reg16::Sp))
    }

    pub fn flag(&self, flag: Flags) -> bool {
        self.flags.contains(flag)
    }
}
