#![forbid(unsafe_code)]

//! Native runner for the tracing/disassembly core: loads a flat code image,
//! fabricates the CPU state the matcher needs, and drives the same walk the
//! emulator runs at translation-block boundaries.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use mirage_cpu::ArmCpuState;
use mirage_disas::{disassemble_host_region, DisasFlags, Disassembler, SymbolMap, TargetArch};
use mirage_mem::{ContextId, FlatMemory};
use mirage_trace::{TracerConfig, TracerContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ArchArg {
    Arm,
    I386,
    X86_64,
    Sparc,
    Mips,
}

impl From<ArchArg> for TargetArch {
    fn from(arch: ArchArg) -> Self {
        match arch {
            ArchArg::Arm => TargetArch::Arm,
            ArchArg::I386 => TargetArch::I386,
            ArchArg::X86_64 => TargetArch::X86_64,
            ArchArg::Sparc => TargetArch::Sparc,
            ArchArg::Mips => TargetArch::Mips,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Disassemble a flat guest code image through the tracing core")]
struct Args {
    /// Flat binary image holding guest (or host) code.
    image: PathBuf,

    /// Guest instruction set of the image.
    #[arg(long, value_enum, default_value = "arm")]
    arch: ArchArg,

    /// The image holds Thumb code (ARM only).
    #[arg(long)]
    thumb: bool,

    /// Fetch guest words with the opposite byte order.
    #[arg(long)]
    reverse_endian: bool,

    /// 16-bit (real-mode) code (i386 only).
    #[arg(long)]
    bits16: bool,

    /// Guest address the image is mapped at (hex accepted).
    #[arg(long, default_value = "0x8000")]
    base: String,

    /// Context id the fabricated CPU claims to be running.
    #[arg(long, default_value_t = 1)]
    ctx: u32,

    /// Context ids to watch. Defaults to the fabricated context so the walk
    /// prints something.
    #[arg(long)]
    watch: Vec<u32>,

    /// Tracer configuration as JSON (overrides --watch).
    #[arg(long, conflicts_with = "watch")]
    config: Option<PathBuf>,

    /// Treat the image as host-native code: no tracer, no guest bus.
    #[arg(long)]
    host: bool,

    /// Walk N instructions monitor-style instead of the whole region.
    #[arg(long)]
    insns: Option<usize>,

    /// Name the image region for symbol lookups.
    #[arg(long)]
    symbol: Option<String>,

    /// Where to write the listing (`stdout` or a file path).
    #[arg(long, default_value = "stdout")]
    out: String,
}

fn parse_address(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.with_context(|| format!("invalid address {text:?}"))
}

fn open_sink(spec: &str) -> Result<Box<dyn Write>> {
    if spec == "stdout" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file = File::create(spec).with_context(|| format!("creating {spec}"))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn load_config(args: &Args) -> Result<TracerConfig> {
    if let Some(path) = &args.config {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: TracerConfig =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        return Ok(config);
    }
    let mut config = TracerConfig::default();
    config.toggles.cpu = true;
    config.watch = if args.watch.is_empty() {
        vec![args.ctx]
    } else {
        args.watch.clone()
    };
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let image = fs::read(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;
    if image.is_empty() {
        bail!("{} is empty", args.image.display());
    }
    let mut out = open_sink(&args.out)?;

    if args.host {
        disassemble_host_region(&mut out, &image)?;
        out.flush()?;
        return Ok(());
    }

    let base = parse_address(&args.base)?;
    let size = image.len() as u64;
    let mut flags = DisasFlags::empty();
    if args.thumb {
        flags |= DisasFlags::THUMB;
    }
    if args.reverse_endian {
        flags |= DisasFlags::REVERSE_ENDIAN;
    }
    if args.bits16 {
        flags |= DisasFlags::BITS16;
    }

    let config = load_config(&args)?;
    let mut tracer = TracerContext::new(config).context("tracer configuration rejected")?;

    let mut disas = Disassembler::new(args.arch.into());
    if let Some(name) = &args.symbol {
        let mut map = SymbolMap::new();
        map.insert(base, size, name.clone());
        disas.register_symbols(Box::new(map));
    }

    let mut mem = FlatMemory::new(base, image);
    let cpu = ArmCpuState::at(ContextId(args.ctx), base as u32);

    let label = disas.lookup_symbol(base);
    if !label.is_empty() {
        writeln!(out, "{label}:")?;
    }

    match args.insns {
        Some(count) => {
            disas.disassemble_target_insns(&mut out, &cpu, &mut mem, base, count, flags)?;
        }
        None => {
            disas.disassemble_target_region(
                &mut out, &mut tracer, &cpu, &mut mem, base, size, flags,
            )?;
        }
    }

    let seen: Vec<u32> = tracer.all_pids().iter().map(|id| id.0).collect();
    writeln!(out, "contexts seen: {seen:?}")?;
    out.flush()?;
    Ok(())
}
