use core::fmt;

/// Why a memory access was issued.
///
/// The taxonomy is closed and purely advisory: it is consulted to decide
/// whether instrumentation should run, never to change what an access does.
/// Adding a variant requires no change to existing call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestOrigin {
    /// Instruction fetch on the execution path.
    Exec,
    /// Debugger (gdb stub) probe.
    Debugger,
    /// Soft-MMU slow path.
    SoftMmu,
    /// Disassembler reading guest code.
    Disas,
    /// Semihosting call servicing.
    Semihost,
    /// Guest context switch bookkeeping.
    ContextSwitch,
    /// TLB fill/flush maintenance.
    Tlb,
    /// Code translation (block build).
    Translate,
    /// Dirty-bitmap scan.
    DirtyBitmap,
    /// Emulated helper routine doing architecture-specific slow-path operand
    /// access. The only origin the access layer will emit diagnostics for.
    CpuHelper,
    /// PCI device model DMA.
    PciHw,
    /// Network device model DMA.
    Net,
    /// Virtual-memory management outside the TLB.
    Vmem,
    /// In-kernel accelerator synchronization.
    Kvm,
    /// Anything not yet classified.
    Other,
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestOrigin::Exec => "exec",
            RequestOrigin::Debugger => "debugger",
            RequestOrigin::SoftMmu => "softmmu",
            RequestOrigin::Disas => "disas",
            RequestOrigin::Semihost => "semihost",
            RequestOrigin::ContextSwitch => "context-switch",
            RequestOrigin::Tlb => "tlb",
            RequestOrigin::Translate => "translate",
            RequestOrigin::DirtyBitmap => "dirty-bitmap",
            RequestOrigin::CpuHelper => "cpu-helper",
            RequestOrigin::PciHw => "pci-hw",
            RequestOrigin::Net => "net",
            RequestOrigin::Vmem => "vmem",
            RequestOrigin::Kvm => "kvm",
            RequestOrigin::Other => "other",
        };
        f.write_str(name)
    }
}

/// Identifier of a guest execution context (thread or process).
///
/// Extracted from CPU-specific control-register state; the meaning is
/// emulator-specific and not guaranteed unique across architectures.
/// `ContextId::UNSET` (zero) is reserved and never a valid watch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl ContextId {
    /// Reserved "no context" sentinel.
    pub const UNSET: ContextId = ContextId(0);

    #[inline]
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ContextId {
    fn from(raw: u32) -> Self {
        ContextId(raw)
    }
}
