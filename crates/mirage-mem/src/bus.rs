//! Origin-tagged guest memory access for debug consumers.
//!
//! [`DebugBus`] is the read/write primitive the disassembler and semihosting
//! helpers go through. Unlike the raw typed access layer it is fallible:
//! debug reads can run off the end of mapped guest memory.

use core::fmt;

use crate::origin::RequestOrigin;

/// Errors returned by [`DebugBus`] backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The requested range is outside the mapped guest region.
    OutOfRange { vaddr: u64, len: usize, size: u64 },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::OutOfRange { vaddr, len, size } => write!(
                f,
                "guest debug access out of range: vaddr=0x{vaddr:x} len={len} size=0x{size:x}"
            ),
        }
    }
}

impl std::error::Error for BusError {}

pub type BusResult<T> = Result<T, BusError>;

/// Guest memory as seen by debug consumers (disassembly, semihosting,
/// debugger probes). Every access carries the [`RequestOrigin`] that caused
/// it; backends may hand the tag to instrumentation but must not let it
/// change the access.
pub trait DebugBus {
    /// Copy `dst.len()` bytes of guest memory starting at `vaddr` into `dst`.
    fn read_debug(&mut self, vaddr: u64, dst: &mut [u8], origin: RequestOrigin) -> BusResult<()>;

    /// Copy `src` into guest memory starting at `vaddr`.
    fn write_debug(&mut self, vaddr: u64, src: &[u8], origin: RequestOrigin) -> BusResult<()>;
}

impl<T: DebugBus + ?Sized> DebugBus for &mut T {
    #[inline]
    fn read_debug(&mut self, vaddr: u64, dst: &mut [u8], origin: RequestOrigin) -> BusResult<()> {
        <T as DebugBus>::read_debug(&mut **self, vaddr, dst, origin)
    }

    #[inline]
    fn write_debug(&mut self, vaddr: u64, src: &[u8], origin: RequestOrigin) -> BusResult<()> {
        <T as DebugBus>::write_debug(&mut **self, vaddr, src, origin)
    }
}

/// A contiguous guest region backed by host memory, mapped at a fixed base
/// address. Reference backend for tests and the CLI runner.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    base: u64,
    data: Vec<u8>,
}

impl FlatMemory {
    pub fn new(base: u64, data: Vec<u8>) -> Self {
        Self { base, data }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, vaddr: u64, len: usize) -> BusResult<usize> {
        let size = self.data.len() as u64;
        let err = BusError::OutOfRange {
            vaddr,
            len,
            size,
        };
        let off = vaddr.checked_sub(self.base).ok_or_else(|| err.clone())?;
        let end = off.checked_add(len as u64).ok_or_else(|| err.clone())?;
        if end > size {
            return Err(err);
        }
        Ok(off as usize)
    }
}

impl DebugBus for FlatMemory {
    fn read_debug(&mut self, vaddr: u64, dst: &mut [u8], _origin: RequestOrigin) -> BusResult<()> {
        let off = self.offset(vaddr, dst.len())?;
        dst.copy_from_slice(&self.data[off..off + dst.len()]);
        Ok(())
    }

    fn write_debug(&mut self, vaddr: u64, src: &[u8], _origin: RequestOrigin) -> BusResult<()> {
        let off = self.offset(vaddr, src.len())?;
        self.data[off..off + src.len()].copy_from_slice(src);
        Ok(())
    }
}
