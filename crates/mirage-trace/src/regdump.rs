//! Differential register dump.
//!
//! Prints only the registers whose value changed since the previous dump.
//! The previous-state snapshot is allocated zeroed on first use and lives as
//! long as the owning [`crate::TracerContext`], so the first dump reports
//! every nonzero register and later dumps only the deltas.

use std::io::{self, Write};

use mirage_cpu::ArmCpuState;

#[derive(Debug, Default)]
pub(crate) struct RegDump {
    prev: Option<Box<ArmCpuState>>,
}

fn diff_u32<W: Write>(out: &mut W, name: &str, prev: &mut u32, cur: u32) -> io::Result<()> {
    if *prev != cur {
        write!(out, "{name} = {cur:x} ")?;
        *prev = cur;
    }
    Ok(())
}

fn diff_u32_dec<W: Write>(out: &mut W, name: &str, prev: &mut u32, cur: u32) -> io::Result<()> {
    if *prev != cur {
        write!(out, "{name} = {cur} ")?;
        *prev = cur;
    }
    Ok(())
}

fn diff_f64<W: Write>(out: &mut W, name: &str, prev: &mut f64, cur: f64) -> io::Result<()> {
    if prev.to_bits() != cur.to_bits() {
        write!(out, "{name} = {cur:.4} ")?;
        *prev = cur;
    }
    Ok(())
}

impl RegDump {
    /// Write `label` followed by every register whose value differs from the
    /// snapshot, then refresh the snapshot.
    pub(crate) fn dump<W: Write>(
        &mut self,
        out: &mut W,
        cpu: &ArmCpuState,
        label: &str,
    ) -> io::Result<()> {
        let prev = self.prev.get_or_insert_with(Default::default);

        write!(out, "{label}")?;
        for i in 0..16 {
            diff_u32(out, &format!("r{i}"), &mut prev.regs[i], cpu.regs[i])?;
        }
        diff_u32(out, "cpsr", &mut prev.cpsr, cpu.cpsr)?;
        diff_u32(out, "spsr", &mut prev.spsr, cpu.spsr)?;
        for i in 0..7 {
            diff_u32(
                out,
                &format!("b_spsr{i}"),
                &mut prev.banked_spsr[i],
                cpu.banked_spsr[i],
            )?;
            diff_u32(
                out,
                &format!("b_r13_{i}"),
                &mut prev.banked_r13[i],
                cpu.banked_r13[i],
            )?;
            diff_u32(
                out,
                &format!("b_r14_{i}"),
                &mut prev.banked_r14[i],
                cpu.banked_r14[i],
            )?;
        }
        for i in 0..5 {
            diff_u32(
                out,
                &format!("usr_regs[{i}]"),
                &mut prev.usr_regs[i],
                cpu.usr_regs[i],
            )?;
            diff_u32(
                out,
                &format!("fiq_regs[{i}]"),
                &mut prev.fiq_regs[i],
                cpu.fiq_regs[i],
            )?;
        }

        diff_u32_dec(out, "cp15.c0_cpuid", &mut prev.cp15.c0_cpuid, cpu.cp15.c0_cpuid)?;
        diff_u32_dec(out, "cp15.c1_sys", &mut prev.cp15.c1_sys, cpu.cp15.c1_sys)?;
        diff_u32_dec(out, "cp15.c2_base0", &mut prev.cp15.c2_base0, cpu.cp15.c2_base0)?;
        diff_u32_dec(out, "cp15.c2_base1", &mut prev.cp15.c2_base1, cpu.cp15.c2_base1)?;
        diff_u32_dec(
            out,
            "cp15.c2_control",
            &mut prev.cp15.c2_control,
            cpu.cp15.c2_control,
        )?;
        diff_u32_dec(out, "cp15.c5_insn", &mut prev.cp15.c5_insn, cpu.cp15.c5_insn)?;
        diff_u32_dec(out, "cp15.c5_data", &mut prev.cp15.c5_data, cpu.cp15.c5_data)?;
        diff_u32_dec(out, "cp15.c12_vbar", &mut prev.cp15.c12_vbar, cpu.cp15.c12_vbar)?;
        diff_u32_dec(out, "cp15.c13_fcse", &mut prev.cp15.c13_fcse, cpu.cp15.c13_fcse)?;
        diff_u32_dec(
            out,
            "cp15.c13_context",
            &mut prev.cp15.c13_context,
            cpu.cp15.c13_context,
        )?;
        diff_u32_dec(out, "cp15.c13_tls1", &mut prev.cp15.c13_tls1, cpu.cp15.c13_tls1)?;
        diff_u32_dec(out, "cp15.c13_tls2", &mut prev.cp15.c13_tls2, cpu.cp15.c13_tls2)?;
        diff_u32_dec(out, "cp15.c13_tls3", &mut prev.cp15.c13_tls3, cpu.cp15.c13_tls3)?;
        diff_u32_dec(
            out,
            "cp15.c15_threadid",
            &mut prev.cp15.c15_threadid,
            cpu.cp15.c15_threadid,
        )?;

        diff_u32_dec(out, "vfp.vec_len", &mut prev.vfp.vec_len, cpu.vfp.vec_len)?;
        diff_u32_dec(
            out,
            "vfp.vec_stride",
            &mut prev.vfp.vec_stride,
            cpu.vfp.vec_stride,
        )?;
        for i in 0..32 {
            diff_f64(out, &format!("d{i}"), &mut prev.vfp.regs[i], cpu.vfp.regs[i])?;
        }
        for i in 0..16 {
            diff_u32(
                out,
                &format!("xr{i}"),
                &mut prev.vfp.xregs[i],
                cpu.vfp.xregs[i],
            )?;
        }
        for i in 0..8 {
            diff_u32(
                out,
                &format!("scratch{i}"),
                &mut prev.vfp.scratch[i],
                cpu.vfp.scratch[i],
            )?;
        }
        writeln!(out)
    }
}
