use validator_wire::state::x86_64::{FprState, GprState};

use super::RegisterDiff;
use crate::types::RegisterClass;

fn clear_ac(eflags: u64) -> u64 {
    eflags & (eflags ^ 0x4)
}

struct GprDescriptor {
    name: &'static str,
    get: fn(&GprState) -> u64,
}

static GPR_TABLE: &[GprDescriptor] = &[
    GprDescriptor {
        name: "rax",
        get: |s| s.rax,
    },
    GprDescriptor {
        name: "rbx",
        get: |s| s.rbx,
    },
    GprDescriptor {
        name: "rcx",
        get: |s| s.rcx,
    },
    GprDescriptor {
        name: "rdx",
        get: |s| s.rdx,
    },
    GprDescriptor {
        name: "rsi",
        get: |s| s.rsi,
    },
    GprDescriptor {
        name: "rdi",
        get: |s| s.rdi,
    },
    GprDescriptor {
        name: "r8",
        get: |s| s.r8,
    },
    GprDescriptor {
        name: "r9",
        get: |s| s.r9,
    },
    GprDescriptor {
        name: "r10",
        get: |s| s.r10,
    },
    GprDescriptor {
        name: "r11",
        get: |s| s.r11,
    },
    GprDescriptor {
        name: "r12",
        get: |s| s.r12,
    },
    GprDescriptor {
        name: "r13",
        get: |s| s.r13,
    },
    GprDescriptor {
        name: "r14",
        get: |s| s.r14,
    },
    GprDescriptor {
        name: "r15",
        get: |s| s.r15,
    },
    GprDescriptor {
        name: "rbp",
        get: |s| s.rbp,
    },
    GprDescriptor {
        name: "rsp",
        get: |s| s.rsp,
    },
];

pub fn compare(
    dbg_gpr: &GprState,
    dbg_fpr: &FprState,
    instr_gpr: &GprState,
    instr_fpr: &FprState,
) -> Vec<RegisterDiff> {
    let mut out = Vec::with_capacity(GPR_TABLE.len() + 1 + 8 * 3 + 16 * 4 + 6);

    for d in GPR_TABLE {
        out.push(RegisterDiff {
            name: d.name.to_string(),
            class: RegisterClass::Gpr,
            reference: (d.get)(dbg_gpr),
            instrumented: (d.get)(instr_gpr),
        });
    }
    out.push(RegisterDiff {
        name: "eflags".to_string(),
        class: RegisterClass::Gpr,
        reference: clear_ac(dbg_gpr.eflags),
        instrumented: clear_ac(instr_gpr.eflags),
    });

    for i in 0..8 {
        let d = dbg_fpr.st[i];
        let q = instr_fpr.st[i];
        out.push(RegisterDiff {
            name: format!("st{i}.m[0:32]"),
            class: RegisterClass::Spr,
            reference: d.m0 as u64,
            instrumented: q.m0 as u64,
        });
        out.push(RegisterDiff {
            name: format!("st{i}.m[32:64]"),
            class: RegisterClass::Spr,
            reference: d.m1 as u64,
            instrumented: q.m1 as u64,
        });
        out.push(RegisterDiff {
            name: format!("st{i}.e"),
            class: RegisterClass::Spr,
            reference: d.e as u64,
            instrumented: q.e as u64,
        });
    }

    for i in 0..16 {
        let d = dbg_fpr.xmm[i];
        let q = instr_fpr.xmm[i];
        for chunk in 0..4 {
            let lo = chunk * 4;
            let dv = u32::from_le_bytes(d[lo..lo + 4].try_into().unwrap());
            let qv = u32::from_le_bytes(q[lo..lo + 4].try_into().unwrap());
            out.push(RegisterDiff {
                name: format!("xmm{i}[{}:{}]", lo * 8, (lo + 4) * 8),
                class: RegisterClass::Spr,
                reference: dv as u64,
                instrumented: qv as u64,
            });
        }
    }

    out.push(direct("fcw", dbg_fpr.fcw as u64, instr_fpr.fcw as u64));
    out.push(direct("fsw", dbg_fpr.fsw as u64, instr_fpr.fsw as u64));
    out.push(direct("ftw", dbg_fpr.ftw as u64, instr_fpr.ftw as u64));
    out.push(direct("fop", dbg_fpr.fop as u64, instr_fpr.fop as u64));
    out.push(direct("mxcsr", dbg_fpr.mxcsr as u64, instr_fpr.mxcsr as u64));
    out.push(direct(
        "mxcsrmask",
        dbg_fpr.mxcsrmask as u64,
        instr_fpr.mxcsrmask as u64,
    ));

    out
}

fn direct(name: &str, reference: u64, instrumented: u64) -> RegisterDiff {
    RegisterDiff {
        name: name.to_string(),
        class: RegisterClass::Direct,
        reference,
        instrumented,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_check_flag_noise_is_masked() {
        assert_eq!(clear_ac(0x206), clear_ac(0x202));
    }
}
