#![forbid(unsafe_code)]

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use emu86_cpu::{Cpu, CpuState, Reg16, RunSummary, SegReg, StepOutcome};
use emu86_mem::{FlatMemory, Memory, REAL_MODE_MEMORY_SIZE};
use tracing_subscriber::EnvFilter;

const INITIAL_SP: u16 = 0xfffe;

#[derive(Debug, Parser)]
#[command(name = "emu86", about = "Run a flat 8086 binary image in real mode")]
struct Args {
    /// Flat binary image, loaded verbatim at LOAD_SEGMENT:LOAD_OFFSET.
    program: PathBuf,

    /// Guest memory size in bytes (at most 1 MiB).
    #[arg(long, env = "EMU86_MEMORY_SIZE", default_value = "1048576", value_parser = parse_u32)]
    memory_size: u32,

    /// Segment the image is loaded into. CS, DS, ES and SS all start here.
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    load_segment: u16,

    /// Offset of the first instruction; IP starts here.
    #[arg(long, default_value = "0x100", value_parser = parse_u16)]
    load_offset: u16,

    /// Stop after executing at most N instructions.
    #[arg(long, env = "EMU86_CYCLES", default_value = "10000", value_parser = parse_u64)]
    cycles: u64,

    /// Print every executed instruction as `ssss:oooo  bytes  asm`.
    #[arg(long)]
    disassemble: bool,

    /// Print the register file once execution stops.
    #[arg(long)]
    dump_registers: bool,

    /// Log every executed instruction (overrides RUST_LOG).
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.memory_size == 0 || args.memory_size > REAL_MODE_MEMORY_SIZE {
        bail!(
            "memory size {} out of range (1..={REAL_MODE_MEMORY_SIZE})",
            args.memory_size
        );
    }

    let program = std::fs::read(&args.program)
        .with_context(|| format!("failed to read program: {}", args.program.display()))?;
    if program.is_empty() {
        bail!("program is empty: {}", args.program.display());
    }

    let state = initial_state(args.load_segment, args.load_offset);
    let load_addr = state.code_address();
    let mut mem = FlatMemory::new(args.memory_size);
    mem.load(load_addr, &program).with_context(|| {
        format!(
            "failed to load {} bytes at {:04x}:{:04x}",
            program.len(),
            args.load_segment,
            args.load_offset
        )
    })?;

    let mut cpu = Cpu::new(state);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let result: Result<RunSummary> = if args.disassemble {
        run_disassembling(&mut cpu, &mut mem, args.cycles, &mut out)
    } else {
        cpu.run_cycles(&mut mem, args.cycles).map_err(Into::into)
    };

    if args.dump_registers {
        dump_registers(&mut out, &cpu.state)?;
    }
    out.flush()?;

    let summary = result.with_context(|| {
        format!(
            "execution stopped at {:04x}:{:04x}",
            cpu.state.segment(SegReg::Cs),
            cpu.state.ip
        )
    })?;

    if summary.halted {
        tracing::info!("guest halted after {} instructions", summary.executed);
    } else {
        tracing::info!("cycle budget exhausted after {} instructions", summary.executed);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn initial_state(segment: u16, offset: u16) -> CpuState {
    let mut state = CpuState::new();
    for seg in SegReg::ALL {
        state.set_segment(seg, segment);
    }
    state.ip = offset;
    state.set_reg16(Reg16::Sp, INITIAL_SP);
    state
}

fn run_disassembling(
    cpu: &mut Cpu,
    mem: &mut dyn Memory,
    cycles: u64,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    cpu.run_cycles_with(mem, cycles, |outcome| {
        write_step(out, outcome).context("failed to write disassembly")
    })
}

fn write_step(out: &mut dyn Write, outcome: &StepOutcome) -> io::Result<()> {
    writeln!(
        out,
        "{:04x}:{:04x}  {:<30}  {}",
        outcome.cs,
        outcome.ip,
        outcome.instruction.raw_data_string(" "),
        outcome.instruction
    )
}

fn dump_registers(out: &mut dyn Write, state: &CpuState) -> io::Result<()> {
    let gprs = Reg16::ALL
        .iter()
        .map(|&reg| format!("{}={:04x}", reg.name().to_uppercase(), state.reg16(reg)))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{gprs}")?;
    writeln!(
        out,
        "CS={:04x} DS={:04x} ES={:04x} SS={:04x} IP={:04x} FLAGS={:04x}",
        state.segment(SegReg::Cs),
        state.segment(SegReg::Ds),
        state.segment(SegReg::Es),
        state.segment(SegReg::Ss),
        state.ip,
        state.flags.bits()
    )
}

fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_u64(s: &str) -> Result<u64, String> {
    parse_number(s)
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let v = parse_number(s)?;
    u32::try_from(v).map_err(|_| format!("{v} does not fit in 32 bits"))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let v = parse_number(s)?;
    u16::try_from(v).map_err(|_| format!("{v:#x} does not fit in 16 bits"))
}
