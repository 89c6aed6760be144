//! Guest memory helpers for semihosting syscalls in system emulation mode.
//!
//! Layered over [`DebugBus`] with the soft-MMU origin tag, so every access
//! made on behalf of a semihosted call shows up in the instrumentation like
//! any other slow-path access. Word values use the guest's (little) byte
//! order regardless of the host.

use mirage_mem::{
    load_u32_le, store_u32_le, BusResult, DebugBus, HelperTap, RequestOrigin,
};

/// Longest guest string a semihosting call may hand us.
pub const MAX_STRING: usize = 1024;

pub fn tget8<B: DebugBus>(bus: &mut B, addr: u32) -> BusResult<u8> {
    let mut raw = [0u8; 1];
    bus.read_debug(addr as u64, &mut raw, RequestOrigin::SoftMmu)?;
    Ok(raw[0])
}

pub fn tget32<B: DebugBus>(bus: &mut B, addr: u32) -> BusResult<u32> {
    let mut raw = [0u8; 4];
    bus.read_debug(addr as u64, &mut raw, RequestOrigin::SoftMmu)?;
    Ok(load_u32_le(&raw, RequestOrigin::SoftMmu, &mut HelperTap::off()))
}

pub fn tput32<B: DebugBus>(bus: &mut B, addr: u32, value: u32) -> BusResult<()> {
    let mut raw = [0u8; 4];
    store_u32_le(&mut raw, value, RequestOrigin::SoftMmu, &mut HelperTap::off());
    bus.write_debug(addr as u64, &raw, RequestOrigin::SoftMmu)
}

/// Copy `len` guest bytes into a host buffer.
pub fn read_buf<B: DebugBus>(bus: &mut B, addr: u32, len: usize) -> BusResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    bus.read_debug(addr as u64, &mut buf, RequestOrigin::SoftMmu)?;
    Ok(buf)
}

/// Copy a host buffer back into guest memory.
pub fn write_buf<B: DebugBus>(bus: &mut B, addr: u32, data: &[u8]) -> BusResult<()> {
    bus.write_debug(addr as u64, data, RequestOrigin::SoftMmu)
}

/// Read a NUL-terminated guest string, capped at [`MAX_STRING`] bytes.
/// The terminator is not included in the result.
pub fn read_string<B: DebugBus>(bus: &mut B, addr: u32) -> BusResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut addr = addr as u64;
    while out.len() < MAX_STRING {
        let mut byte = [0u8; 1];
        bus.read_debug(addr, &mut byte, RequestOrigin::SoftMmu)?;
        if byte[0] == 0 {
            break;
        }
        out.push(byte[0]);
        addr += 1;
    }
    Ok(out)
}
