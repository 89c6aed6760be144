//! Decoder selection.
//!
//! One decoder is selected per configured target from a closed table; a
//! target with no dedicated decoder falls back to the raw hex dump so a
//! disassembly request always produces output.

use bitflags::bitflags;

use crate::arm::ArmDecoder;
use crate::hexdump::HexDump;
use crate::thumb::ThumbDecoder;
use crate::x86::X86Decoder;

/// Guest instruction sets the emulator can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
    Arm,
    I386,
    X86_64,
    Sparc,
    Mips,
}

bitflags! {
    /// Per-call decode modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DisasFlags: u32 {
        /// ARM: the region holds Thumb code.
        const THUMB = 1 << 0;
        /// ARM: fetch with the opposite byte order.
        const REVERSE_ENDIAN = 1 << 1;
        /// x86: 16-bit (real/virtual-8086) code.
        const BITS16 = 1 << 2;
    }
}

/// One decoded instruction: rendered text plus the bytes it consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInsn {
    pub text: String,
    pub len: usize,
}

/// A single-instruction decoder.
///
/// `None` means the bytes at `addr` cannot be decoded (truncated or
/// invalid); region walks stop there and report it, they do not fail.
pub trait InsnDecoder {
    fn decode(&mut self, addr: u64, bytes: &[u8]) -> Option<DecodedInsn>;
}

/// Decoder for guest code of `arch` under `flags`.
pub fn target_decoder(arch: TargetArch, flags: DisasFlags) -> Box<dyn InsnDecoder> {
    let reverse = flags.contains(DisasFlags::REVERSE_ENDIAN);
    match arch {
        TargetArch::Arm if flags.contains(DisasFlags::THUMB) => {
            Box::new(ThumbDecoder::new(reverse))
        }
        TargetArch::Arm => Box::new(ArmDecoder::new(reverse)),
        TargetArch::I386 if flags.contains(DisasFlags::BITS16) => Box::new(X86Decoder::new(16)),
        TargetArch::I386 => Box::new(X86Decoder::new(32)),
        TargetArch::X86_64 => Box::new(X86Decoder::new(64)),
        // No dedicated decoder yet: raw bytes are better than nothing.
        TargetArch::Sparc | TargetArch::Mips => Box::new(HexDump::target()),
    }
}

/// Decoder for code generated for the host this process runs on.
pub fn host_decoder() -> Box<dyn InsnDecoder> {
    #[cfg(target_arch = "x86_64")]
    {
        Box::new(X86Decoder::new(64))
    }
    #[cfg(target_arch = "x86")]
    {
        Box::new(X86Decoder::new(32))
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
    {
        Box::new(HexDump::host())
    }
}
