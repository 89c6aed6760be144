//! Guest ARM CPU state as seen by the tracing and disassembly core.
//!
//! This is the view the context matcher and the register-diff dump consume:
//! the general registers, the banked sets, the cp15 block that carries the
//! guest context id, and the VFP file. The execution core owns the real
//! state; this crate only defines its debug-visible shape.

pub mod semihost;

use mirage_mem::ContextId;

/// cp15 (system control coprocessor) registers the tracing core reads or
/// dumps. `c13_context` is the designated context-id slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cp15State {
    pub c0_cpuid: u32,
    pub c1_sys: u32,
    pub c2_base0: u32,
    pub c2_base1: u32,
    pub c2_control: u32,
    pub c5_insn: u32,
    pub c5_data: u32,
    pub c12_vbar: u32,
    pub c13_fcse: u32,
    /// Context ID register (CONTEXTIDR). The guest kernel writes the
    /// scheduled thread/process identifier here on every context switch.
    pub c13_context: u32,
    pub c13_tls1: u32,
    pub c13_tls2: u32,
    pub c13_tls3: u32,
    pub c15_threadid: u32,
}

/// VFP register file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfpState {
    pub regs: [f64; 32],
    pub xregs: [u32; 16],
    pub scratch: [u32; 8],
    pub vec_len: u32,
    pub vec_stride: u32,
}

impl Default for VfpState {
    fn default() -> Self {
        Self {
            regs: [0.0; 32],
            xregs: [0; 16],
            scratch: [0; 8],
            vec_len: 0,
            vec_stride: 0,
        }
    }
}

/// Debug-visible ARM CPU state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArmCpuState {
    /// r0-r12, sp (r13), lr (r14), pc (r15).
    pub regs: [u32; 16],
    pub cpsr: u32,
    pub spsr: u32,
    pub banked_spsr: [u32; 7],
    pub banked_r13: [u32; 7],
    pub banked_r14: [u32; 7],
    pub usr_regs: [u32; 5],
    pub fiq_regs: [u32; 5],
    pub cp15: Cp15State,
    pub vfp: VfpState,
}

impl ArmCpuState {
    /// Current guest context identifier, read from CONTEXTIDR.
    #[inline]
    pub fn context_id(&self) -> ContextId {
        ContextId(self.cp15.c13_context)
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.regs[15]
    }

    /// Convenience constructor for a state scheduled on `context` at `pc`.
    pub fn at(context: ContextId, pc: u32) -> Self {
        let mut state = Self::default();
        state.cp15.c13_context = context.0;
        state.regs[15] = pc;
        state
    }
}
