//! End-to-end walks of guest regions through the tracer gate, the debug bus,
//! and the printed-block cache.

use mirage_cpu::ArmCpuState;
use mirage_disas::{Disassembler, DisasFlags, TargetArch};
use mirage_mem::{ContextId, FlatMemory};
use mirage_trace::{TraceToggles, TracerConfig, TracerContext};

const BASE: u64 = 0x8000;

fn arm_image() -> FlatMemory {
    let words: [u32; 3] = [
        0xe3a0_0000, // mov r0, #0
        0xe280_0001, // add r0, r0, #1
        0xe12f_ff1e, // bx lr
    ];
    let mut bytes = Vec::new();
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    FlatMemory::new(BASE, bytes)
}

fn tracer(watch: &[u32]) -> TracerContext {
    TracerContext::new(TracerConfig {
        toggles: TraceToggles {
            cpu: true,
            ..Default::default()
        },
        watch: watch.to_vec(),
    })
    .unwrap()
}

fn run(
    disas: &mut Disassembler,
    tracer: &mut TracerContext,
    mem: &mut FlatMemory,
    context: u32,
    size: u64,
) -> String {
    let cpu = ArmCpuState::at(ContextId(context), BASE as u32);
    let mut out = Vec::new();
    disas
        .disassemble_target_region(
            &mut out,
            tracer,
            &cpu,
            mem,
            BASE,
            size,
            DisasFlags::empty(),
        )
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn matched_walk_then_lookup_summary() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = tracer(&[42]);
    let mut mem = arm_image();

    let first = run(&mut disas, &mut tracer, &mut mem, 42, 12);
    assert!(first.starts_with("before entering:"), "got: {first}");
    assert!(first.contains("42 8000 mov r0, #0"), "got: {first}");
    assert!(first.contains("42 8004 add r0, r0, #1"), "got: {first}");
    assert!(first.contains("42 8008 bx lr"), "got: {first}");
    assert!(first.contains("***end***"));
    assert!(!first.contains("Lookup"));

    let second = run(&mut disas, &mut tracer, &mut mem, 42, 12);
    assert!(second.contains("42, Lookup: 8000 12"), "got: {second}");
    assert!(!second.contains("***end***"));
    assert!(!second.contains("mov r0"));
}

#[test]
fn unmatched_context_prints_nothing() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = tracer(&[42]);
    let mut mem = arm_image();

    let out = run(&mut disas, &mut tracer, &mut mem, 7, 12);
    assert!(out.is_empty(), "got: {out}");
}

#[test]
fn disabled_tracing_prints_nothing() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = TracerContext::new(TracerConfig {
        toggles: TraceToggles::default(),
        watch: vec![42],
    })
    .unwrap();
    let mut mem = arm_image();

    let out = run(&mut disas, &mut tracer, &mut mem, 42, 12);
    assert!(out.is_empty(), "got: {out}");
}

#[test]
fn zero_length_region_has_no_instruction_lines() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = tracer(&[42]);
    let mut mem = arm_image();

    let out = run(&mut disas, &mut tracer, &mut mem, 42, 0);
    assert!(out.contains("***end***"));
    assert!(!out.contains("42 8000 "), "got: {out}");
}

#[test]
fn length_disagreement_is_warned_not_fatal() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = tracer(&[42]);
    let mut mem = arm_image();

    // The translator claims the block is 6 bytes; the second instruction
    // decodes to 4 and crosses the boundary.
    let out = run(&mut disas, &mut tracer, &mut mem, 42, 6);
    assert!(out.contains("42 8004 add r0, r0, #1"), "got: {out}");
    assert!(
        out.contains("Disassembler disagrees with translator"),
        "got: {out}"
    );
    assert!(out.contains("***end***"));
}

#[test]
fn truncated_image_reports_decode_failure() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = tracer(&[42]);
    // Two mapped bytes cannot hold an ARM instruction.
    let mut mem = FlatMemory::new(BASE, vec![0x00, 0x00]);

    let cpu = ArmCpuState::at(ContextId(42), BASE as u32);
    let mut out = Vec::new();
    disas
        .disassemble_target_region(
            &mut out,
            &mut tracer,
            &cpu,
            &mut mem,
            BASE,
            4,
            DisasFlags::empty(),
        )
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("unable to decode"), "got: {text}");
    assert!(text.contains("***end***"));
}

#[test]
fn exhausted_block_budget_degrades_to_full_walks() {
    let mut disas = Disassembler::with_block_budget(TargetArch::Arm, 1);
    let mut tracer = tracer(&[42]);
    let mut mem = arm_image();

    let first = run(&mut disas, &mut tracer, &mut mem, 42, 12);
    assert!(first.contains("***end***"));

    // Second distinct region exhausts the one-block budget: reported once,
    // then the walk still happens.
    let second = run(&mut disas, &mut tracer, &mut mem, 42, 8);
    assert!(second.contains("budget"), "got: {second}");
    assert!(second.contains("***end***"));

    // The first region is no longer deduplicated either.
    let third = run(&mut disas, &mut tracer, &mut mem, 42, 12);
    assert!(!third.contains("Lookup"), "got: {third}");
    assert!(third.contains("42 8000 mov r0, #0"), "got: {third}");
}

#[test]
fn thumb_flag_selects_the_thumb_decoder() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut tracer = tracer(&[42]);
    let halves: [u16; 2] = [0x2005, 0x4770]; // mov r0, #5 ; bx lr
    let mut bytes = Vec::new();
    for h in halves {
        bytes.extend_from_slice(&h.to_le_bytes());
    }
    let mut mem = FlatMemory::new(BASE, bytes);

    let cpu = ArmCpuState::at(ContextId(42), BASE as u32);
    let mut out = Vec::new();
    disas
        .disassemble_target_region(
            &mut out,
            &mut tracer,
            &cpu,
            &mut mem,
            BASE,
            4,
            DisasFlags::THUMB,
        )
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("42 8000 mov r0, #5"), "got: {text}");
    assert!(text.contains("42 8002 bx lr"), "got: {text}");
}

#[test]
fn monitor_walk_ignores_matching_and_dedup() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut mem = arm_image();
    let cpu = ArmCpuState::at(ContextId(7), BASE as u32);

    let mut out = Vec::new();
    disas
        .disassemble_target_insns(&mut out, &cpu, &mut mem, BASE, 2, DisasFlags::empty())
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("0x8000:  mov r0, #0"), "got: {text}");
    assert!(text.contains("0x8004:  add r0, r0, #1"), "got: {text}");
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn symbols_resolve_through_registered_chain() {
    let mut disas = Disassembler::new(TargetArch::Arm);
    let mut map = mirage_disas::SymbolMap::new();
    map.insert(BASE, 12, "reset_handler");
    disas.register_symbols(Box::new(map));

    assert_eq!(disas.lookup_symbol(BASE + 4), "reset_handler");
    assert_eq!(disas.lookup_symbol(0x100), "");
}
