//! On-demand disassembly of guest and host code.
//!
//! The target-region entry point is the diagnostics pipeline: it asks the
//! tracer whether the current context is watched, dumps the changed
//! registers, consults the printed-block cache, and only then walks the
//! region instruction by instruction through the debug bus. Decoder
//! trouble (truncated fetch, invalid encoding, a length that crosses the
//! region end) is reported on the output stream and never propagated: this
//! is a best-effort diagnostic tool layered over the emulation path.

mod arm;
mod decoder;
mod dedup;
mod hexdump;
mod symbols;
mod thumb;
mod x86;

use std::io::{self, Write};

use mirage_cpu::ArmCpuState;
use mirage_mem::{DebugBus, RequestOrigin};
use mirage_trace::TracerContext;

pub use decoder::{host_decoder, target_decoder, DecodedInsn, DisasFlags, InsnDecoder, TargetArch};
pub use dedup::{PrintedBlocks, ResourceError};
pub use symbols::{SymbolMap, SymbolRegistry, SymbolSource};

/// Largest single-instruction fetch any decoder needs (x86's 15 plus one).
const FETCH_WINDOW: usize = 16;

/// Per-call bundle of everything one region walk needs.
struct CpuDebugView<'a, B: DebugBus> {
    cpu: &'a ArmCpuState,
    bus: &'a mut B,
    decoder: Box<dyn InsnDecoder>,
}

impl<'a, B: DebugBus> CpuDebugView<'a, B> {
    fn new(cpu: &'a ArmCpuState, bus: &'a mut B, arch: TargetArch, flags: DisasFlags) -> Self {
        Self {
            cpu,
            bus,
            decoder: target_decoder(arch, flags),
        }
    }

    /// Fetch one instruction window at `pc`. Deliberately not clipped to the
    /// region being walked: the decoder may legitimately read past the
    /// block boundary, and reporting that disagreement is the point.
    /// Shrinks the window when it runs off the end of mapped memory so the
    /// boundary instruction still decodes.
    fn fetch<'b>(
        &mut self,
        pc: u64,
        buf: &'b mut [u8; FETCH_WINDOW],
    ) -> Result<&'b [u8], mirage_mem::BusError> {
        let mut want = FETCH_WINDOW;
        loop {
            match self.bus.read_debug(pc, &mut buf[..want], RequestOrigin::Disas) {
                Ok(()) => return Ok(&buf[..want]),
                Err(err) => {
                    if want <= 1 {
                        return Err(err);
                    }
                    want /= 2;
                }
            }
        }
    }
}

/// The disassembly front-end for one configured guest target.
pub struct Disassembler {
    arch: TargetArch,
    printed: PrintedBlocks,
    symbols: SymbolRegistry,
}

impl Disassembler {
    pub fn new(arch: TargetArch) -> Self {
        Self {
            arch,
            printed: PrintedBlocks::new(),
            symbols: SymbolRegistry::new(),
        }
    }

    /// Cap the printed-block cache at `budget` blocks; past that the cache
    /// degrades to printing every region in full.
    pub fn with_block_budget(arch: TargetArch, budget: usize) -> Self {
        Self {
            arch,
            printed: PrintedBlocks::with_budget(budget),
            symbols: SymbolRegistry::new(),
        }
    }

    pub fn arch(&self) -> TargetArch {
        self.arch
    }

    pub fn register_symbols(&mut self, source: Box<dyn SymbolSource>) {
        self.symbols.register(source);
    }

    /// Best-effort symbol resolution; `""` when unknown.
    pub fn lookup_symbol(&self, addr: u64) -> &str {
        self.symbols.lookup_symbol(addr)
    }

    /// Render the guest code block at `[addr, addr+size)` if the tracer
    /// matches the current context.
    ///
    /// A matched call dumps the changed registers, then either the full
    /// instruction walk or, for a block already printed, a one-line lookup
    /// summary. Unmatched calls print nothing.
    pub fn disassemble_target_region<W: Write, B: DebugBus>(
        &mut self,
        out: &mut W,
        tracer: &mut TracerContext,
        cpu: &ArmCpuState,
        bus: &mut B,
        addr: u64,
        size: u64,
        flags: DisasFlags,
    ) -> io::Result<()> {
        if !tracer.match_context(Some(cpu)).is_match() {
            return Ok(());
        }
        tracer.dump_registers(out, cpu, "before entering:")?;

        let mut view = CpuDebugView::new(cpu, bus, self.arch, flags);
        let context = view.cpu.context_id();
        match self.printed.check_and_insert(addr, size) {
            Ok(true) => {
                writeln!(out, "{context}, Lookup: {addr:x} {size}")?;
                return out.flush();
            }
            Ok(false) => {}
            Err(err) => writeln!(out, "{err}")?,
        }

        let mut window = [0u8; FETCH_WINDOW];
        let mut pc = addr;
        let mut remaining = size;
        while remaining > 0 {
            let bytes = match view.fetch(pc, &mut window) {
                Ok(bytes) => bytes,
                Err(_) => {
                    writeln!(out, "Address 0x{pc:x} is out of bounds.")?;
                    break;
                }
            };
            let Some(insn) = view.decoder.decode(pc, bytes) else {
                writeln!(out, "{context} {pc:x} (unable to decode)")?;
                break;
            };
            writeln!(out, "{context} {pc:x} {}", insn.text)?;
            let len = insn.len as u64;
            if len > remaining {
                writeln!(
                    out,
                    "Disassembler disagrees with translator over instruction decoding"
                )?;
                break;
            }
            pc += len;
            remaining -= len;
        }
        writeln!(out, "***end***")?;
        out.flush()
    }

    /// Render `count` instructions starting at `pc`, unconditionally.
    ///
    /// The monitor-style walk: no context filtering, no block cache.
    pub fn disassemble_target_insns<W: Write, B: DebugBus>(
        &mut self,
        out: &mut W,
        cpu: &ArmCpuState,
        bus: &mut B,
        pc: u64,
        count: usize,
        flags: DisasFlags,
    ) -> io::Result<()> {
        let mut view = CpuDebugView::new(cpu, bus, self.arch, flags);
        let mut window = [0u8; FETCH_WINDOW];
        let mut pc = pc;
        for _ in 0..count {
            let bytes = match view.fetch(pc, &mut window) {
                Ok(bytes) => bytes,
                Err(_) => {
                    writeln!(out, "Address 0x{pc:x} is out of bounds.")?;
                    break;
                }
            };
            let Some(insn) = view.decoder.decode(pc, bytes) else {
                break;
            };
            writeln!(out, "0x{pc:x}:  {}", insn.text)?;
            pc += insn.len as u64;
        }
        out.flush()
    }
}

/// Render host code from a directly addressable buffer.
///
/// The host-native counterpart of the target walk: same iteration, no
/// context matching, no block cache, no soft-MMU indirection.
pub fn disassemble_host_region<W: Write>(out: &mut W, code: &[u8]) -> io::Result<()> {
    let mut decoder = host_decoder();
    let base = code.as_ptr() as u64;
    let mut offset = 0usize;
    while offset < code.len() {
        let pc = base + offset as u64;
        let Some(insn) = decoder.decode(pc, &code[offset..]) else {
            break;
        };
        writeln!(out, "0x{pc:08x}:  {}", insn.text)?;
        offset += insn.len;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_region_walks_whole_buffer() {
        let mut out = Vec::new();
        // Three NOPs and a RET on x86 hosts; any host still produces output
        // via the hex-dump fallback.
        disassemble_host_region(&mut out, &[0x90, 0x90, 0x90, 0xc3]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.is_empty());

        #[cfg(target_arch = "x86_64")]
        {
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines.len(), 4);
            assert!(lines[0].ends_with("nop"), "got: {}", lines[0]);
            assert!(lines[3].ends_with("ret"), "got: {}", lines[3]);
        }
    }

    #[test]
    fn host_region_empty_buffer_prints_nothing() {
        let mut out = Vec::new();
        disassemble_host_region(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }
}
