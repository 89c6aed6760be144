//! Raw-byte fallback "decoder": renders the whole remaining region as hex in
//! fixed-width groups, consuming everything in one step.

use crate::decoder::{DecodedInsn, InsnDecoder};

const BYTES_PER_LINE: usize = 32;

#[derive(Debug, Clone)]
pub struct HexDump {
    prefix: &'static str,
}

impl HexDump {
    /// Dump of guest (target) code.
    pub fn target() -> Self {
        Self { prefix: "OBJD-T" }
    }

    /// Dump of host code.
    pub fn host() -> Self {
        Self { prefix: "OBJD-H" }
    }
}

impl InsnDecoder for HexDump {
    fn decode(&mut self, _addr: u64, bytes: &[u8]) -> Option<DecodedInsn> {
        if bytes.is_empty() {
            return None;
        }
        let mut text = String::new();
        for chunk in bytes.chunks(BYTES_PER_LINE) {
            text.push('\n');
            text.push_str(self.prefix);
            text.push_str(": ");
            for byte in chunk {
                text.push_str(&format!("{byte:02x}"));
            }
        }
        Some(DecodedInsn {
            text,
            len: bytes.len(),
        })
    }
}
