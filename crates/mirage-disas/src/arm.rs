//! ARM (A32) instruction decoder.
//!
//! Covers the instruction classes a kernel + userspace trace actually hits:
//! data processing, multiplies, single/halfword/block transfers, branches,
//! status-register moves, coprocessor transfers, and supervisor calls.
//! Anything else renders as `.word`, with the fixed 4-byte width — only a
//! truncated fetch is a decode failure.

use mirage_mem::{load_u32_be, load_u32_le, HelperTap, RequestOrigin};

use crate::decoder::{DecodedInsn, InsnDecoder};

const COND: [&str; 16] = [
    "eq", "ne", "cs", "cc", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt", "le", "", "nv",
];

const REG: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr",
    "pc",
];

const DATA_OPS: [&str; 16] = [
    "and", "eor", "sub", "rsb", "add", "adc", "sbc", "rsc", "tst", "teq", "cmp", "cmn", "orr",
    "mov", "bic", "mvn",
];

const SHIFTS: [&str; 4] = ["lsl", "lsr", "asr", "ror"];

#[inline]
fn reg(bits: u32) -> &'static str {
    REG[(bits & 0xf) as usize]
}

#[derive(Debug, Clone)]
pub struct ArmDecoder {
    reverse: bool,
}

impl ArmDecoder {
    pub fn new(reverse: bool) -> Self {
        Self { reverse }
    }
}

impl InsnDecoder for ArmDecoder {
    fn decode(&mut self, addr: u64, bytes: &[u8]) -> Option<DecodedInsn> {
        if bytes.len() < 4 {
            return None;
        }
        let mut tap = HelperTap::off();
        let word = if self.reverse {
            load_u32_be(bytes, RequestOrigin::Disas, &mut tap)
        } else {
            load_u32_le(bytes, RequestOrigin::Disas, &mut tap)
        };
        Some(DecodedInsn {
            text: disasm_word(addr, word),
            len: 4,
        })
    }
}

fn data_word(w: u32) -> String {
    format!(".word 0x{w:08x}")
}

/// Rotated 8-bit immediate of a data-processing instruction.
fn dp_immediate(w: u32) -> u32 {
    let imm = w & 0xff;
    let rot = ((w >> 8) & 0xf) * 2;
    imm.rotate_right(rot)
}

/// Shifted-register operand: `rm`, `rm, lsl #3`, `rm, asr r4`, `rm, rrx`.
fn shifted_register(w: u32) -> String {
    let rm = reg(w);
    let shift = SHIFTS[((w >> 5) & 3) as usize];
    if w & (1 << 4) != 0 {
        let rs = reg(w >> 8);
        return format!("{rm}, {shift} {rs}");
    }
    let amount = (w >> 7) & 0x1f;
    match ((w >> 5) & 3, amount) {
        (0, 0) => rm.to_string(),
        (3, 0) => format!("{rm}, rrx"),
        (1, 0) | (2, 0) => format!("{rm}, {shift} #32"),
        _ => format!("{rm}, {shift} #{amount}"),
    }
}

fn data_processing(cond: &str, w: u32) -> String {
    let op = ((w >> 21) & 0xf) as usize;
    let name = DATA_OPS[op];
    let s = if w & (1 << 20) != 0 { "s" } else { "" };
    let rn = reg(w >> 16);
    let rd = reg(w >> 12);
    let op2 = if w & (1 << 25) != 0 {
        format!("#{}", dp_immediate(w))
    } else {
        shifted_register(w)
    };
    match op {
        8..=11 => format!("{name}{cond} {rn}, {op2}"),
        13 | 15 => format!("{name}{cond}{s} {rd}, {op2}"),
        _ => format!("{name}{cond}{s} {rd}, {rn}, {op2}"),
    }
}

fn multiply(cond: &str, w: u32) -> String {
    let s = if w & (1 << 20) != 0 { "s" } else { "" };
    let rd = reg(w >> 16);
    let rn = reg(w >> 12);
    let rs = reg(w >> 8);
    let rm = reg(w);
    if w & (1 << 21) != 0 {
        format!("mla{cond}{s} {rd}, {rm}, {rs}, {rn}")
    } else {
        format!("mul{cond}{s} {rd}, {rm}, {rs}")
    }
}

fn multiply_long(cond: &str, w: u32) -> String {
    let sign = if w & (1 << 22) != 0 { "s" } else { "u" };
    let acc = if w & (1 << 21) != 0 { "mlal" } else { "mull" };
    let s = if w & (1 << 20) != 0 { "s" } else { "" };
    let rd_hi = reg(w >> 16);
    let rd_lo = reg(w >> 12);
    let rs = reg(w >> 8);
    let rm = reg(w);
    format!("{sign}{acc}{cond}{s} {rd_lo}, {rd_hi}, {rm}, {rs}")
}

fn halfword_transfer(cond: &str, w: u32) -> String {
    let load = w & (1 << 20) != 0;
    let name = match ((w >> 5) & 3, load) {
        (1, false) => "strh",
        (1, true) => "ldrh",
        (2, true) => "ldrsb",
        (3, true) => "ldrsh",
        _ => return data_word(w),
    };
    let rd = reg(w >> 12);
    let rn = reg(w >> 16);
    let sign = if w & (1 << 23) != 0 { "" } else { "-" };
    let offset = if w & (1 << 22) != 0 {
        let imm = ((w >> 4) & 0xf0) | (w & 0xf);
        if imm == 0 {
            String::new()
        } else {
            format!(", #{sign}{imm}")
        }
    } else {
        format!(", {sign}{}", reg(w))
    };
    let writeback = if w & (1 << 21) != 0 { "!" } else { "" };
    if w & (1 << 24) != 0 {
        format!("{name}{cond} {rd}, [{rn}{offset}]{writeback}")
    } else {
        format!("{name}{cond} {rd}, [{rn}]{offset}")
    }
}

fn single_transfer(cond: &str, w: u32) -> String {
    let name = if w & (1 << 20) != 0 { "ldr" } else { "str" };
    let byte = if w & (1 << 22) != 0 { "b" } else { "" };
    let rd = reg(w >> 12);
    let rn = reg(w >> 16);
    let sign = if w & (1 << 23) != 0 { "" } else { "-" };
    let offset = if w & (1 << 25) != 0 {
        format!(", {sign}{}", shifted_register(w & !(1 << 4)))
    } else {
        let imm = w & 0xfff;
        if imm == 0 {
            String::new()
        } else {
            format!(", #{sign}{imm}")
        }
    };
    let writeback = if w & (1 << 21) != 0 { "!" } else { "" };
    if w & (1 << 24) != 0 {
        format!("{name}{byte}{cond} {rd}, [{rn}{offset}]{writeback}")
    } else {
        format!("{name}{byte}{cond} {rd}, [{rn}]{offset}")
    }
}

fn register_list(mask: u32) -> String {
    let mut out = String::from("{");
    let mut first = true;
    for i in 0..16 {
        if mask & (1 << i) != 0 {
            if !first {
                out.push_str(", ");
            }
            out.push_str(REG[i]);
            first = false;
        }
    }
    out.push('}');
    out
}

fn block_transfer(cond: &str, w: u32) -> String {
    let name = if w & (1 << 20) != 0 { "ldm" } else { "stm" };
    let mode = match ((w >> 24) & 1, (w >> 23) & 1) {
        (0, 0) => "da",
        (0, 1) => "ia",
        (1, 0) => "db",
        _ => "ib",
    };
    let rn = reg(w >> 16);
    let writeback = if w & (1 << 21) != 0 { "!" } else { "" };
    let user = if w & (1 << 22) != 0 { "^" } else { "" };
    format!(
        "{name}{mode}{cond} {rn}{writeback}, {}{user}",
        register_list(w & 0xffff)
    )
}

fn branch(cond: &str, addr: u64, w: u32) -> String {
    let link = if w & (1 << 24) != 0 { "l" } else { "" };
    let offset = ((w & 0x00ff_ffff) as i32) << 8 >> 6;
    let target = (addr as u32).wrapping_add(8).wrapping_add(offset as u32);
    format!("b{link}{cond} 0x{target:x}")
}

fn status_register(cond: &str, w: u32) -> Option<String> {
    let psr = if w & (1 << 22) != 0 { "spsr" } else { "cpsr" };
    if w & 0x0fbf_0fff == 0x010f_0000 {
        return Some(format!("mrs{cond} {}, {psr}", reg(w >> 12)));
    }
    let is_reg = w & 0x0fb0_fff0 == 0x0120_f000;
    let is_imm = w & 0x0fb0_f000 == 0x0320_f000;
    if !is_reg && !is_imm {
        return None;
    }
    let mut fields = String::new();
    for (bit, ch) in [(16, 'c'), (17, 'x'), (18, 's'), (19, 'f')] {
        if w & (1 << bit) != 0 {
            fields.push(ch);
        }
    }
    let value = if is_imm {
        format!("#{}", dp_immediate(w))
    } else {
        reg(w).to_string()
    };
    Some(format!("msr{cond} {psr}_{fields}, {value}"))
}

fn coprocessor(cond: &str, w: u32) -> String {
    let cp = (w >> 8) & 0xf;
    if w & (1 << 4) != 0 {
        let name = if w & (1 << 20) != 0 { "mrc" } else { "mcr" };
        let opc1 = (w >> 21) & 7;
        let rd = reg(w >> 12);
        let crn = (w >> 16) & 0xf;
        let crm = w & 0xf;
        let opc2 = (w >> 5) & 7;
        format!("{name}{cond} p{cp}, {opc1}, {rd}, c{crn}, c{crm}, {opc2}")
    } else {
        let opc1 = (w >> 20) & 0xf;
        let crd = (w >> 12) & 0xf;
        let crn = (w >> 16) & 0xf;
        let crm = w & 0xf;
        let opc2 = (w >> 5) & 7;
        format!("cdp{cond} p{cp}, {opc1}, c{crd}, c{crn}, c{crm}, {opc2}")
    }
}

fn coprocessor_transfer(cond: &str, w: u32) -> String {
    let name = if w & (1 << 20) != 0 { "ldc" } else { "stc" };
    let long = if w & (1 << 22) != 0 { "l" } else { "" };
    let cp = (w >> 8) & 0xf;
    let crd = (w >> 12) & 0xf;
    let rn = reg(w >> 16);
    format!("{name}{long}{cond} p{cp}, c{crd}, [{rn}]")
}

pub(crate) fn disasm_word(addr: u64, w: u32) -> String {
    let cond_bits = (w >> 28) as usize;
    if cond_bits == 0xf {
        // Unconditional space: only BLX(imm) is rendered.
        if (w >> 25) & 7 == 0b101 {
            let h = (w >> 24) & 1;
            let offset = (((w & 0x00ff_ffff) as i32) << 8 >> 6) as u32 | (h << 1);
            let target = (addr as u32).wrapping_add(8).wrapping_add(offset);
            return format!("blx 0x{target:x}");
        }
        return data_word(w);
    }
    let cond = COND[cond_bits];

    match (w >> 25) & 7 {
        0b000 | 0b001 => {
            if w & 0x0fff_fff0 == 0x012f_ff10 {
                return format!("bx{cond} {}", reg(w));
            }
            if w & 0x0fff_fff0 == 0x012f_ff30 {
                return format!("blx{cond} {}", reg(w));
            }
            if w & 0x0fc0_00f0 == 0x0000_0090 {
                return multiply(cond, w);
            }
            if w & 0x0f80_00f0 == 0x0080_0090 {
                return multiply_long(cond, w);
            }
            if w & 0x0fb0_0ff0 == 0x0100_0090 {
                let b = if w & (1 << 22) != 0 { "b" } else { "" };
                return format!("swp{b}{cond} {}, {}, [{}]", reg(w >> 12), reg(w), reg(w >> 16));
            }
            if w & (1 << 25) == 0 && w & 0x90 == 0x90 && (w >> 5) & 3 != 0 {
                return halfword_transfer(cond, w);
            }
            if let Some(text) = status_register(cond, w) {
                return text;
            }
            data_processing(cond, w)
        }
        0b010 => single_transfer(cond, w),
        0b011 => {
            if w & (1 << 4) != 0 {
                // Media / undefined space.
                return data_word(w);
            }
            single_transfer(cond, w)
        }
        0b100 => block_transfer(cond, w),
        0b101 => branch(cond, addr, w),
        0b110 => coprocessor_transfer(cond, w),
        _ => {
            if w & (1 << 24) != 0 {
                format!("svc{cond} 0x{:06x}", w & 0x00ff_ffff)
            } else {
                coprocessor(cond, w)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dis(word: u32) -> String {
        disasm_word(0x8000, word)
    }

    #[test]
    fn data_processing_forms() {
        assert_eq!(dis(0xe3a00000), "mov r0, #0");
        assert_eq!(dis(0xe0810002), "add r0, r1, r2");
        assert_eq!(dis(0xe1500001), "cmp r0, r1");
        assert_eq!(dis(0xe2522001), "subs r2, r2, #1");
        assert_eq!(dis(0xe1a01102), "mov r1, r2, lsl #2");
        assert_eq!(dis(0x13a00001), "movne r0, #1");
    }

    #[test]
    fn rotated_immediates() {
        // 0xe3a004ff: mov r0, #0xff000000 (0xff ror 8).
        assert_eq!(dis(0xe3a004ff), format!("mov r0, #{}", 0xff00_0000u32));
    }

    #[test]
    fn multiplies() {
        assert_eq!(dis(0xe0000291), "mul r0, r1, r2");
        assert_eq!(dis(0xe0213392), "mla r1, r2, r3, r3");
        assert_eq!(dis(0xe0832291), "umull r2, r3, r1, r2");
    }

    #[test]
    fn single_transfers() {
        assert_eq!(dis(0xe59f1004), "ldr r1, [pc, #4]");
        assert_eq!(dis(0xe5801000), "str r1, [r0]");
        assert_eq!(dis(0xe5d12003), "ldrb r2, [r1, #3]");
        assert_eq!(dis(0xe4912004), "ldr r2, [r1], #4");
        assert_eq!(dis(0xe7910002), "ldr r0, [r1, r2]");
    }

    #[test]
    fn halfword_transfers() {
        assert_eq!(dis(0xe1d130b2), "ldrh r3, [r1, #2]");
        assert_eq!(dis(0xe1c130b2), "strh r3, [r1, #2]");
        assert_eq!(dis(0xe1d130d2), "ldrsb r3, [r1, #2]");
    }

    #[test]
    fn block_transfers() {
        assert_eq!(dis(0xe92d4010), "stmdb sp!, {r4, lr}");
        assert_eq!(dis(0xe8bd8010), "ldmia sp!, {r4, pc}");
    }

    #[test]
    fn branches() {
        assert_eq!(dis(0xeb000000), "bl 0x8008");
        assert_eq!(dis(0xea000002), "b 0x8010");
        assert_eq!(dis(0x0afffffe), "beq 0x8000");
        assert_eq!(dis(0xe12fff1e), "bx lr");
        assert_eq!(dis(0xe12fff33), "blx r3");
    }

    #[test]
    fn system_instructions() {
        assert_eq!(dis(0xef000000), "svc 0x000000");
        assert_eq!(dis(0xe10f0000), "mrs r0, cpsr");
        assert_eq!(dis(0xe129f000), "msr cpsr_cf, r0");
        // CONTEXTIDR read, the context-switch tell.
        assert_eq!(dis(0xee1d3f70), "mrc p15, 0, r3, c13, c0, 3");
        assert_eq!(dis(0xee0d3f70), "mcr p15, 0, r3, c13, c0, 3");
    }

    #[test]
    fn undefined_words_render_as_data() {
        assert_eq!(dis(0xe7f000f0), ".word 0xe7f000f0");
        assert_eq!(dis(0xf57ff04f), ".word 0xf57ff04f");
    }

    #[test]
    fn truncated_fetch_fails() {
        let mut dec = ArmDecoder::new(false);
        assert!(dec.decode(0x8000, &[0x00, 0x00]).is_none());
    }

    #[test]
    fn reverse_endian_fetch() {
        let mut dec = ArmDecoder::new(true);
        // mov r0, #0 stored big-endian.
        let out = dec.decode(0, &[0xe3, 0xa0, 0x00, 0x00]).unwrap();
        assert_eq!(out.text, "mov r0, #0");
        assert_eq!(out.len, 4);
    }
}
