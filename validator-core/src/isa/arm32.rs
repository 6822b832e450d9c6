use validator_wire::state::arm32::{FprState, GprState};

use super::RegisterDiff;
use crate::types::RegisterClass;

struct GprDescriptor {
    name: &'static str,
    get: fn(&GprState) -> u64,
}

struct FprDescriptor {
    name: &'static str,
    get: fn(&FprState) -> u64,
}

macro_rules! r {
    ($i:expr) => {
        GprDescriptor {
            name: concat!("r", $i),
            get: |s| s.r[$i] as u64,
        }
    };
}

static GPR_TABLE: &[GprDescriptor] = &[
    r!(0),
    r!(1),
    r!(2),
    r!(3),
    r!(4),
    r!(5),
    r!(6),
    r!(7),
    r!(8),
    r!(9),
    r!(10),
    r!(11),
    r!(12),
    GprDescriptor {
        name: "sp",
        get: |s| s.sp as u64,
    },
    GprDescriptor {
        name: "lr",
        get: |s| s.lr as u64,
    },
    GprDescriptor {
        name: "cpsr",
        get: |s| s.cpsr as u64,
    },
];

macro_rules! s {
    ($i:expr) => {
        FprDescriptor {
            name: concat!("s", $i),
            get: |s| s.s[$i] as u64,
        }
    };
}

static FPR_TABLE: &[FprDescriptor] = &[
    s!(0),
    s!(1),
    s!(2),
    s!(3),
    s!(4),
    s!(5),
    s!(6),
    s!(7),
    s!(8),
    s!(9),
    s!(10),
    s!(11),
    s!(12),
    s!(13),
    s!(14),
    s!(15),
    s!(16),
    s!(17),
    s!(18),
    s!(19),
    s!(20),
    s!(21),
    s!(22),
    s!(23),
    s!(24),
    s!(25),
    s!(26),
    s!(27),
    s!(28),
    s!(29),
    s!(30),
    s!(31),
];

pub fn compare(
    dbg_gpr: &GprState,
    dbg_fpr: &FprState,
    instr_gpr: &GprState,
    instr_fpr: &FprState,
) -> Vec<RegisterDiff> {
    let mut out = Vec::with_capacity(GPR_TABLE.len() + FPR_TABLE.len() + 1);
    for d in GPR_TABLE {
        out.push(RegisterDiff {
            name: d.name.to_string(),
            class: RegisterClass::Gpr,
            reference: (d.get)(dbg_gpr),
            instrumented: (d.get)(instr_gpr),
        });
    }
    for d in FPR_TABLE {
        out.push(RegisterDiff {
            name: d.name.to_string(),
            class: RegisterClass::Spr,
            reference: (d.get)(dbg_fpr),
            instrumented: (d.get)(instr_fpr),
        });
    }
    out.push(RegisterDiff {
        name: "fpscr".to_string(),
        class: RegisterClass::Spr,
        reference: dbg_fpr.fpscr as u64,
        instrumented: instr_fpr.fpscr as u64,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_states_produce_no_surviving_differences() {
        let gpr = GprState {
            r: [1; 13],
            sp: 2,
            lr: 3,
            cpsr: 0x6000_0010,
        };
        let fpr = FprState {
            s: [0; 32],
            fpscr: 0,
        };
        let diffs = compare(&gpr, &fpr, &gpr, &fpr);
        assert!(diffs.iter().all(|d| d.reference == d.instrumented));
    }

    #[test]
    fn cpsr_is_compared_in_full() {
        let gpr = GprState {
            r: [0; 13],
            sp: 0,
            lr: 0,
            cpsr: 0x6000_0010,
        };
        let mut instr = gpr;
        instr.cpsr = 0x6000_001f; // differs only in mode bits, still a real divergence
        let fpr = FprState {
            s: [0; 32],
            fpscr: 0,
        };
        let diffs = compare(&gpr, &fpr, &instr, &fpr);
        let cpsr = diffs.iter().find(|d| d.name == "cpsr").unwrap();
        assert_ne!(cpsr.reference, cpsr.instrumented);
    }

    #[test]
    fn fpscr_is_compared() {
        let gpr = GprState {
            r: [0; 13],
            sp: 0,
            lr: 0,
            cpsr: 0,
        };
        let dbg_fpr = FprState {
            s: [0; 32],
            fpscr: 0x1000_0000,
        };
        let instr_fpr = FprState {
            s: [0; 32],
            fpscr: 0,
        };
        let diffs = compare(&gpr, &dbg_fpr, &gpr, &instr_fpr);
        let fpscr = diffs.iter().find(|d| d.name == "fpscr").unwrap();
        assert_ne!(fpscr.reference, fpscr.instrumented);
    }
}
