use validator_core::memmap::{MemoryMapProvider, MemoryRange};
use validator_core::report::{log_cascades, log_coverage, Verbosity};
use validator_core::{Severity, ValidatorEngine};
use validator_wire::event::InstructionState;
use validator_wire::state::x86_64::{FprState, GprState};

struct StubMaps {
    debugged: Vec<MemoryRange>,
    instrumented: Vec<MemoryRange>,
}

impl MemoryMapProvider for StubMaps {
    fn maps(&self, pid: i32) -> Vec<MemoryRange> {
        match pid {
            1 => self.debugged.clone(),
            2 => self.instrumented.clone(),
            _ => Vec::new(),
        }
    }
}

fn engine_with_maps(debugged: Vec<MemoryRange>, instrumented: Vec<MemoryRange>) -> ValidatorEngine {
    ValidatorEngine::new(1, 2, Box::new(StubMaps { debugged, instrumented }))
}

fn zero_gpr() -> GprState {
    GprState {
        rax: 0,
        rbx: 0,
        rcx: 0,
        rdx: 0,
        rsi: 0,
        rdi: 0,
        r8: 0,
        r9: 0,
        r10: 0,
        r11: 0,
        r12: 0,
        r13: 0,
        r14: 0,
        r15: 0,
        rbp: 0,
        rsp: 0,
        eflags: 0,
    }
}

fn zero_fpr() -> FprState {
    FprState {
        st: [Default::default(); 8],
        xmm: [[0; 16]; 16],
        fcw: 0,
        fsw: 0,
        ftw: 0,
        fop: 0,
        mxcsr: 0,
        mxcsrmask: 0,
    }
}

fn state(gpr: GprState, fpr: FprState) -> InstructionState {
    InstructionState::X86_64 { gpr, fpr }
}

#[test]
fn a_clean_run_produces_no_errors_or_cascades() {
    let mut engine = engine_with_maps(vec![], vec![]);
    let clean = state(zero_gpr(), zero_fpr());
    for addr in 0..5u64 {
        engine.signal_new_state(addr, "nop", "nop", &clean, &clean);
    }
    engine.flush_last_log();

    assert!(engine.errors().is_empty());
    let mut out = Vec::new();
    log_cascades(&engine, Verbosity::Detail, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Encountered 0 errors"));
}

#[test]
fn a_consistently_shifted_pointer_is_explained_by_a_diffmap() {
    // Both processes' rax holds an address into their own (differently
    // based) heap region, shifted by a constant amount — the signature
    // of an address-space relocation, not a real divergence.
    let mut engine = engine_with_maps(
        vec![MemoryRange { start: 0x1000, end: 0x2000 }],
        vec![MemoryRange { start: 0x5000, end: 0x6000 }],
    );
    let clean = state(zero_gpr(), zero_fpr());
    engine.signal_new_state(0, "nop", "nop", &clean, &clean);

    let mut dbg_gpr = zero_gpr();
    dbg_gpr.rax = 0x1010;
    let mut instr_gpr = zero_gpr();
    instr_gpr.rax = 0x5010;
    let dbg = state(dbg_gpr, zero_fpr());
    let instr = state(instr_gpr, zero_fpr());
    engine.signal_new_state(1, "lea", "lea rax, [heap]", &dbg, &instr);

    assert!(engine.errors().is_empty());
    assert_eq!(engine.diff_maps().len(), 1);

    // A later instance of the *same* relocation is explained by the
    // diffmap we just learned, without growing it.
    let mut dbg_gpr2 = zero_gpr();
    dbg_gpr2.rax = 0x1020;
    let mut instr_gpr2 = zero_gpr();
    instr_gpr2.rax = 0x5020;
    let dbg2 = state(dbg_gpr2, zero_fpr());
    let instr2 = state(instr_gpr2, zero_fpr());
    engine.signal_new_state(2, "mov", "mov rax, [rax+0x10]", &dbg2, &instr2);

    assert!(engine.errors().is_empty());
    assert_eq!(engine.diff_maps().len(), 1);
}

#[test]
fn a_real_divergence_escalates_the_register_that_caused_it() {
    let mut engine = engine_with_maps(vec![], vec![]);
    let clean = state(zero_gpr(), zero_fpr());
    engine.signal_new_state(0, "nop", "nop", &clean, &clean);
    engine.signal_new_state(1, "nop", "nop", &clean, &clean);

    let mut dbg_gpr = zero_gpr();
    dbg_gpr.rax = 1;
    let mut instr_gpr = zero_gpr();
    instr_gpr.rax = 2;
    engine.signal_new_state(
        2,
        "mov",
        "mov rax, 1",
        &state(dbg_gpr, zero_fpr()),
        &state(instr_gpr, zero_fpr()),
    );
    assert_eq!(engine.errors().len(), 1);
    assert_eq!(engine.errors()[0].severity, Severity::NoImpact);

    let mut dbg_gpr2 = zero_gpr();
    dbg_gpr2.rax = 1;
    dbg_gpr2.rbx = 7;
    let mut instr_gpr2 = zero_gpr();
    instr_gpr2.rax = 1;
    instr_gpr2.rbx = 8;
    engine.signal_new_state(
        3,
        "mov",
        "mov rbx, 7",
        &state(dbg_gpr2, zero_fpr()),
        &state(instr_gpr2, zero_fpr()),
    );

    assert_eq!(engine.errors().len(), 2);
    assert_eq!(engine.errors()[0].severity, Severity::NonCritical);
    assert_eq!(engine.errors()[1].cascade_id, engine.errors()[0].cascade_id);
}

#[test]
fn a_crash_marks_the_outstanding_errors_critical() {
    let mut engine = engine_with_maps(vec![], vec![]);
    let clean = state(zero_gpr(), zero_fpr());
    engine.signal_new_state(0, "nop", "nop", &clean, &clean);
    engine.signal_new_state(1, "nop", "nop", &clean, &clean);

    let mut dbg_gpr = zero_gpr();
    dbg_gpr.rax = 1;
    let mut instr_gpr = zero_gpr();
    instr_gpr.rax = 2;
    engine.signal_new_state(
        2,
        "ud2",
        "ud2",
        &state(dbg_gpr, zero_fpr()),
        &state(instr_gpr, zero_fpr()),
    );
    assert_eq!(engine.errors()[0].severity, Severity::NoImpact);

    // The reference process then crashed before another instruction
    // could be observed.
    engine.signal_critical_state();
    assert_eq!(engine.errors()[0].severity, Severity::Critical);
}

#[test]
fn the_alignment_check_flag_alone_does_not_produce_an_error() {
    let mut engine = engine_with_maps(vec![], vec![]);
    let mut dbg_gpr = zero_gpr();
    dbg_gpr.eflags = 0x202;
    let mut instr_gpr = zero_gpr();
    instr_gpr.eflags = 0x206; // AC bit (0x4) set, nothing else differs
    let dbg = state(dbg_gpr, zero_fpr());
    let instr = state(instr_gpr, zero_fpr());

    engine.signal_new_state(0, "nop", "nop", &dbg, &instr);
    engine.signal_new_state(1, "nop", "nop", &dbg, &instr);

    assert!(engine.errors().is_empty());
}

#[test]
fn coverage_counts_each_mnemonic_and_sorts_by_frequency() {
    let mut engine = engine_with_maps(vec![], vec![]);
    let clean = state(zero_gpr(), zero_fpr());
    for (addr, mnemonic) in [(0, "nop"), (1, "mov"), (2, "nop"), (3, "nop")] {
        engine.signal_new_state(addr, mnemonic, mnemonic, &clean, &clean);
    }
    engine.flush_last_log();

    assert_eq!(engine.coverage().get("nop"), Some(&3));
    assert_eq!(engine.coverage().get("mov"), Some(&1));

    let mut out = Vec::new();
    log_coverage(&engine, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let nop_line = text.lines().position(|l| l.starts_with("nop")).unwrap();
    let mov_line = text.lines().position(|l| l.starts_with("mov")).unwrap();
    assert!(nop_line < mov_line);
}
