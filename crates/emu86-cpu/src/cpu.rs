//! Fetch-decode-execute stepping.

use emu86_mem::{Memory, MemoryError};
use emu86_types::SegReg;

use crate::error::CpuError;
use crate::instr::{decode, Instruction};
use crate::state::CpuState;

/// Longest encoding handled by the decoder: opcode, MOD-REG-R/M,
/// 16-bit displacement, 16-bit immediate.
pub const MAX_INSTRUCTION_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// CS:IP the instruction was fetched from.
    pub cs: u16,
    pub ip: u16,
    pub instruction: Instruction,
    pub next_ip: u16,
    pub halted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub executed: u64,
    pub halted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Cpu {
    pub state: CpuState,
    halted: bool,
}

impl Cpu {
    pub fn new(state: CpuState) -> Self {
        Self {
            state,
            halted: false,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Bytes at CS:IP, at most [`MAX_INSTRUCTION_LEN`], cut short at the end of memory.
    ///
    /// The offset wraps inside the code segment, so an instruction starting
    /// near CS:FFFF continues at CS:0000.
    pub fn fetch_window(&self, mem: &dyn Memory) -> Result<Vec<u8>, MemoryError> {
        let ip = self.state.ip;
        let mut window = Vec::with_capacity(MAX_INSTRUCTION_LEN);
        for i in 0..MAX_INSTRUCTION_LEN as u16 {
            let addr = self.state.physical(SegReg::Cs, ip.wrapping_add(i));
            if i > 0 && addr >= mem.size() {
                break;
            }
            window.push(mem.read_u8(addr)?);
        }
        Ok(window)
    }

    /// Decode and execute the instruction at CS:IP, then advance IP.
    pub fn step(&mut self, mem: &mut dyn Memory) -> Result<StepOutcome, CpuError> {
        if self.halted {
            return Err(CpuError::Halted);
        }

        let cs = self.state.segment(SegReg::Cs);
        let ip = self.state.ip;
        let window = self.fetch_window(mem)?;
        let instruction = decode(&window)?;

        tracing::trace!(
            cs,
            ip,
            bytes = %instruction.raw_data_string(" "),
            asm = %instruction,
            "execute"
        );

        let next_ip = instruction.execute(ip, &mut self.state, mem)?;
        self.state.ip = next_ip;

        if instruction.is_halt() {
            tracing::debug!(cs, ip, "cpu halted");
            self.halted = true;
        }

        Ok(StepOutcome {
            cs,
            ip,
            instruction,
            next_ip,
            halted: self.halted,
        })
    }

    /// Execute up to `count` instructions, stopping early on `HLT`.
    pub fn run_cycles(&mut self, mem: &mut dyn Memory, count: u64) -> Result<RunSummary, CpuError> {
        self.run_cycles_with(mem, count, |_| Ok(()))
    }

    /// Like [`Cpu::run_cycles`], calling `on_step` after every executed
    /// instruction. An error from `on_step` ends the run.
    pub fn run_cycles_with<E, F>(
        &mut self,
        mem: &mut dyn Memory,
        count: u64,
        mut on_step: F,
    ) -> Result<RunSummary, E>
    where
        E: From<CpuError>,
        F: FnMut(&StepOutcome) -> Result<(), E>,
    {
        let mut summary = RunSummary::default();
        while summary.executed < count && !self.halted {
            let outcome = match self.step(mem) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(
                        cs = self.state.segment(SegReg::Cs),
                        ip = self.state.ip,
                        executed = summary.executed,
                        error = %err,
                        "run stopped"
                    );
                    return Err(err.into());
                }
            };
            summary.executed += 1;
            on_step(&outcome)?;
        }
        summary.halted = self.halted;
        Ok(summary)
    }
}
