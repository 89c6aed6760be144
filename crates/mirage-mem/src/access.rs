//! Endian-aware typed loads and stores over host-addressable buffers.
//!
//! The caller (soft-MMU translation layer) guarantees the buffer covers the
//! access; these primitives never fail. Each takes the [`RequestOrigin`] of
//! the access and a [`HelperTap`]: when the tap is armed and the origin is
//! [`RequestOrigin::CpuHelper`], one diagnostic line is written before the
//! value is returned. No other origin produces output, and the tap never
//! changes the returned value.

use std::io::Write;

use crate::origin::{ContextId, RequestOrigin};

/// Diagnostic hook consulted by the typed access layer.
///
/// Built by the tracer from its watch state; call sites without a tracer use
/// [`HelperTap::off`]. Sink write errors are swallowed: the tap must never
/// alter control flow.
pub struct HelperTap<'a> {
    armed: bool,
    context: ContextId,
    out: Option<&'a mut dyn Write>,
}

impl<'a> HelperTap<'a> {
    /// A tap that never emits. For call sites with no tracer in scope.
    pub fn off<'b>() -> HelperTap<'b> {
        HelperTap {
            armed: false,
            context: ContextId::UNSET,
            out: None,
        }
    }

    /// A tap that reports helper-origin accesses on behalf of `context`.
    pub fn armed(context: ContextId, out: &'a mut dyn Write) -> HelperTap<'a> {
        HelperTap {
            armed: true,
            context,
            out: Some(out),
        }
    }

    #[inline]
    fn note(&mut self, origin: RequestOrigin, op: &str, addr: usize, value: u64) {
        if !self.armed || origin != RequestOrigin::CpuHelper {
            return;
        }
        if let Some(out) = self.out.as_mut() {
            let _ = writeln!(out, "@@ {}, {op} {addr:x}={value:x} {origin}", self.context);
        }
    }
}

macro_rules! load_int {
    ($name:ident, $op:literal, $ty:ty, $from:ident) => {
        #[inline]
        pub fn $name(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> $ty {
            const N: usize = core::mem::size_of::<$ty>();
            let mut raw = [0u8; N];
            raw.copy_from_slice(&bytes[..N]);
            let value = <$ty>::$from(raw);
            tap.note(origin, $op, bytes.as_ptr() as usize, value as u64);
            value
        }
    };
}

macro_rules! store_int {
    ($name:ident, $op:literal, $ty:ty, $to:ident) => {
        #[inline]
        pub fn $name(bytes: &mut [u8], value: $ty, origin: RequestOrigin, tap: &mut HelperTap<'_>) {
            const N: usize = core::mem::size_of::<$ty>();
            tap.note(origin, $op, bytes.as_ptr() as usize, value as u64);
            bytes[..N].copy_from_slice(&value.$to());
        }
    };
}

#[inline]
pub fn load_u8(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> u8 {
    let value = bytes[0];
    tap.note(origin, "ldub", bytes.as_ptr() as usize, value as u64);
    value
}

#[inline]
pub fn load_i8(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> i8 {
    let value = bytes[0] as i8;
    tap.note(origin, "ldsb", bytes.as_ptr() as usize, value as u8 as u64);
    value
}

#[inline]
pub fn store_u8(bytes: &mut [u8], value: u8, origin: RequestOrigin, tap: &mut HelperTap<'_>) {
    tap.note(origin, "stb", bytes.as_ptr() as usize, value as u64);
    bytes[0] = value;
}

load_int!(load_u16_le, "lduw", u16, from_le_bytes);
load_int!(load_u16_be, "lduw", u16, from_be_bytes);
load_int!(load_u16_ne, "lduw", u16, from_ne_bytes);
load_int!(load_i16_le, "ldsw", i16, from_le_bytes);
load_int!(load_i16_be, "ldsw", i16, from_be_bytes);
load_int!(load_i16_ne, "ldsw", i16, from_ne_bytes);
load_int!(load_u32_le, "ldl", u32, from_le_bytes);
load_int!(load_u32_be, "ldl", u32, from_be_bytes);
load_int!(load_u32_ne, "ldl", u32, from_ne_bytes);
load_int!(load_i32_le, "ldl", i32, from_le_bytes);
load_int!(load_i32_be, "ldl", i32, from_be_bytes);
load_int!(load_i32_ne, "ldl", i32, from_ne_bytes);
load_int!(load_u64_le, "ldq", u64, from_le_bytes);
load_int!(load_u64_be, "ldq", u64, from_be_bytes);
load_int!(load_u64_ne, "ldq", u64, from_ne_bytes);
load_int!(load_i64_le, "ldq", i64, from_le_bytes);
load_int!(load_i64_be, "ldq", i64, from_be_bytes);
load_int!(load_i64_ne, "ldq", i64, from_ne_bytes);

store_int!(store_u16_le, "stw", u16, to_le_bytes);
store_int!(store_u16_be, "stw", u16, to_be_bytes);
store_int!(store_u16_ne, "stw", u16, to_ne_bytes);
store_int!(store_u32_le, "stl", u32, to_le_bytes);
store_int!(store_u32_be, "stl", u32, to_be_bytes);
store_int!(store_u32_ne, "stl", u32, to_ne_bytes);
store_int!(store_u64_le, "stq", u64, to_le_bytes);
store_int!(store_u64_be, "stq", u64, to_be_bytes);
store_int!(store_u64_ne, "stq", u64, to_ne_bytes);

// Float access reinterprets the integer loads bit-for-bit.

#[inline]
pub fn load_f32_le(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> f32 {
    f32::from_bits(load_u32_le(bytes, origin, tap))
}

#[inline]
pub fn load_f32_be(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> f32 {
    f32::from_bits(load_u32_be(bytes, origin, tap))
}

#[inline]
pub fn store_f32_le(bytes: &mut [u8], value: f32, origin: RequestOrigin, tap: &mut HelperTap<'_>) {
    store_u32_le(bytes, value.to_bits(), origin, tap)
}

#[inline]
pub fn store_f32_be(bytes: &mut [u8], value: f32, origin: RequestOrigin, tap: &mut HelperTap<'_>) {
    store_u32_be(bytes, value.to_bits(), origin, tap)
}

#[inline]
pub fn load_f64_le(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> f64 {
    f64::from_bits(load_u64_le(bytes, origin, tap))
}

#[inline]
pub fn load_f64_be(bytes: &[u8], origin: RequestOrigin, tap: &mut HelperTap<'_>) -> f64 {
    f64::from_bits(load_u64_be(bytes, origin, tap))
}

#[inline]
pub fn store_f64_le(bytes: &mut [u8], value: f64, origin: RequestOrigin, tap: &mut HelperTap<'_>) {
    store_u64_le(bytes, value.to_bits(), origin, tap)
}

#[inline]
pub fn store_f64_be(bytes: &mut [u8], value: f64, origin: RequestOrigin, tap: &mut HelperTap<'_>) {
    store_u64_be(bytes, value.to_bits(), origin, tap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order_round_trips() {
        let mut buf = [0u8; 8];
        let mut tap = HelperTap::off();

        store_u32_le(&mut buf, 0xdead_beef, RequestOrigin::SoftMmu, &mut tap);
        assert_eq!(buf[..4], [0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(
            load_u32_le(&buf, RequestOrigin::SoftMmu, &mut tap),
            0xdead_beef
        );

        store_u32_be(&mut buf, 0xdead_beef, RequestOrigin::SoftMmu, &mut tap);
        assert_eq!(buf[..4], [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            load_u32_be(&buf, RequestOrigin::SoftMmu, &mut tap),
            0xdead_beef
        );
    }

    #[test]
    fn signed_loads_sign_extend() {
        let buf = [0xff, 0xff];
        let mut tap = HelperTap::off();
        assert_eq!(load_i8(&buf, RequestOrigin::Exec, &mut tap), -1);
        assert_eq!(load_i16_le(&buf, RequestOrigin::Exec, &mut tap), -1);
    }

    #[test]
    fn float_access_reinterprets_bits() {
        let mut buf = [0u8; 8];
        let mut tap = HelperTap::off();
        store_f64_le(&mut buf, 2.5, RequestOrigin::SoftMmu, &mut tap);
        assert_eq!(load_f64_le(&buf, RequestOrigin::SoftMmu, &mut tap), 2.5);
        assert_eq!(
            load_u64_le(&buf, RequestOrigin::SoftMmu, &mut tap),
            2.5f64.to_bits()
        );
    }

    #[test]
    fn helper_origin_emits_one_line() {
        let buf = [0x2a, 0, 0, 0];
        let mut sink = Vec::new();
        let mut tap = HelperTap::armed(ContextId(42), &mut sink);
        let value = load_u32_le(&buf, RequestOrigin::CpuHelper, &mut tap);
        assert_eq!(value, 0x2a);

        let line = String::from_utf8(sink).unwrap();
        assert!(line.starts_with("@@ 42, ldl "), "got: {line}");
        assert!(line.trim_end().ends_with("cpu-helper"), "got: {line}");
        assert_eq!(line.lines().count(), 1);
    }

    #[test]
    fn non_helper_origins_are_silent_even_when_armed() {
        let mut buf = [0u8; 8];
        let mut sink = Vec::new();
        let mut tap = HelperTap::armed(ContextId(7), &mut sink);
        for origin in [
            RequestOrigin::Exec,
            RequestOrigin::Debugger,
            RequestOrigin::SoftMmu,
            RequestOrigin::Disas,
            RequestOrigin::Semihost,
            RequestOrigin::ContextSwitch,
            RequestOrigin::Tlb,
            RequestOrigin::Translate,
            RequestOrigin::DirtyBitmap,
            RequestOrigin::PciHw,
            RequestOrigin::Net,
            RequestOrigin::Vmem,
            RequestOrigin::Kvm,
            RequestOrigin::Other,
        ] {
            let _ = load_u64_le(&buf, origin, &mut tap);
            store_u16_be(&mut buf, 0x1234, origin, &mut tap);
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn disarmed_tap_is_silent_for_helper_origin() {
        let buf = [0u8; 4];
        let mut tap = HelperTap::off();
        let _ = load_u32_le(&buf, RequestOrigin::CpuHelper, &mut tap);
    }
}
