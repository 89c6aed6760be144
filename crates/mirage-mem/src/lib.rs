//! Guest memory primitives: the request-origin taxonomy, the endian-aware
//! typed load/store layer, and the origin-tagged debug bus used by the
//! disassembler and semihosting helpers.
//!
//! Everything here sits below the soft-MMU: callers hand in host-addressable
//! buffers that have already been translated from guest addresses. The only
//! side effect in this crate is the [`HelperTap`] diagnostic line emitted for
//! helper-origin accesses, which never changes a returned value.

mod access;
mod bus;
mod origin;

pub use access::{
    load_f32_be, load_f32_le, load_f64_be, load_f64_le, load_i16_be, load_i16_le, load_i16_ne,
    load_i32_be, load_i32_le, load_i32_ne, load_i64_be, load_i64_le, load_i64_ne, load_i8,
    load_u16_be, load_u16_le, load_u16_ne, load_u32_be, load_u32_le, load_u32_ne, load_u64_be,
    load_u64_le, load_u64_ne, load_u8, store_f32_be, store_f32_le, store_f64_be, store_f64_le,
    store_u16_be, store_u16_le, store_u16_ne, store_u32_be, store_u32_le, store_u32_ne,
    store_u64_be, store_u64_le, store_u64_ne, store_u8, HelperTap,
};
pub use bus::{BusError, BusResult, DebugBus, FlatMemory};
pub use origin::{ContextId, RequestOrigin};
