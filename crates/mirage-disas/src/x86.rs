//! x86/x86-64 decoder, backed by iced-x86.
//!
//! The backend stays an implementation detail of this module: the rest of
//! the crate (and everything above it) only sees [`InsnDecoder`].

use iced_x86::{Decoder, DecoderOptions, Formatter, Instruction, IntelFormatter};

use crate::decoder::{DecodedInsn, InsnDecoder};

pub struct X86Decoder {
    bitness: u32,
    formatter: IntelFormatter,
}

impl X86Decoder {
    /// `bitness` is 16, 32, or 64.
    pub fn new(bitness: u32) -> Self {
        let mut formatter = IntelFormatter::new();
        formatter.options_mut().set_space_after_operand_separator(true);
        Self { bitness, formatter }
    }
}

impl InsnDecoder for X86Decoder {
    fn decode(&mut self, addr: u64, bytes: &[u8]) -> Option<DecodedInsn> {
        if bytes.is_empty() {
            return None;
        }
        let mut decoder = Decoder::with_ip(self.bitness, bytes, addr, DecoderOptions::NONE);
        let mut insn = Instruction::default();
        decoder.decode_out(&mut insn);
        if insn.is_invalid() {
            return None;
        }
        let mut text = String::new();
        self.formatter.format(&insn, &mut text);
        Some(DecodedInsn {
            text,
            len: insn.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_64_bit_instructions() {
        let mut dec = X86Decoder::new(64);

        let nop = dec.decode(0x1000, &[0x90]).unwrap();
        assert_eq!(nop.text, "nop");
        assert_eq!(nop.len, 1);

        let ret = dec.decode(0x1000, &[0xc3]).unwrap();
        assert_eq!(ret.text, "ret");
        assert_eq!(ret.len, 1);

        // mov eax, 1
        let mov = dec.decode(0x1000, &[0xb8, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert!(mov.text.starts_with("mov eax, "), "got: {}", mov.text);
        assert_eq!(mov.len, 5);
    }

    #[test]
    fn truncated_instruction_is_a_decode_failure() {
        let mut dec = X86Decoder::new(64);
        // mov eax, imm32 cut short.
        assert!(dec.decode(0x1000, &[0xb8, 0x01]).is_none());
        assert!(dec.decode(0x1000, &[]).is_none());
    }

    #[test]
    fn bitness_changes_operand_width() {
        let mut dec32 = X86Decoder::new(32);
        let mut dec16 = X86Decoder::new(16);
        let bytes = [0xb8, 0x01, 0x00, 0x00, 0x00];

        let in32 = dec32.decode(0, &bytes).unwrap();
        assert_eq!(in32.len, 5);

        // In 16-bit mode b8 takes a 2-byte immediate.
        let in16 = dec16.decode(0, &bytes).unwrap();
        assert_eq!(in16.len, 3);
        assert!(in16.text.starts_with("mov ax, "), "got: {}", in16.text);
    }
}
