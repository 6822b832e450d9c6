use validator_wire::state::aarch64::{FprState, GprState};

use super::RegisterDiff;
use crate::types::RegisterClass;

const NZCV_MASK: u64 = 0xF000_0000;
const NZCV_MASK32: u32 = 0xF000_0000;
/// fpcr bits compared: rounding mode, exception-enable and AHP/DN/FZ mode
/// bits. Reserved/implementation-defined bits are masked out on the
/// instrumented side, which zero-initializes them.
const FPCR_MASK: u32 = 0x07F7_9F00;
/// fpsr when its NZCV aliasing bits agree with the GPR-side NZCV: only
/// the IDC/IXC/UFC/OFC/DZC/IOC exception bits are compared.
const FPSR_MASK_NARROW: u32 = 0x0800_009F;
/// Otherwise the NZCV alias bits are compared too.
const FPSR_MASK_WIDE: u32 = 0xF800_009F;

static X_NAMES: [&str; 30] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14",
    "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27",
    "x28", "x29",
];

pub fn compare(
    dbg_gpr: &GprState,
    dbg_fpr: &FprState,
    instr_gpr: &GprState,
    instr_fpr: &FprState,
) -> Vec<RegisterDiff> {
    let mut out = Vec::with_capacity(30 + 3 + 32 * 2 + 2);

    for (i, name) in X_NAMES.iter().enumerate() {
        out.push(RegisterDiff {
            name: name.to_string(),
            class: RegisterClass::Gpr,
            reference: dbg_gpr.x[i],
            instrumented: instr_gpr.x[i],
        });
    }
    out.push(RegisterDiff {
        name: "lr".to_string(),
        class: RegisterClass::Gpr,
        reference: dbg_gpr.lr,
        instrumented: instr_gpr.lr,
    });
    out.push(RegisterDiff {
        name: "sp".to_string(),
        class: RegisterClass::Gpr,
        reference: dbg_gpr.sp,
        instrumented: instr_gpr.sp,
    });
    out.push(RegisterDiff {
        name: "nzcv".to_string(),
        class: RegisterClass::Gpr,
        reference: dbg_gpr.nzcv & NZCV_MASK,
        instrumented: instr_gpr.nzcv & NZCV_MASK,
    });

    for i in 0..32 {
        out.push(RegisterDiff {
            name: format!("v{i}[0:64]"),
            class: RegisterClass::Spr,
            reference: dbg_fpr.v[i][0],
            instrumented: instr_fpr.v[i][0],
        });
        out.push(RegisterDiff {
            name: format!("v{i}[64:128]"),
            class: RegisterClass::Spr,
            reference: dbg_fpr.v[i][1],
            instrumented: instr_fpr.v[i][1],
        });
    }

    out.push(RegisterDiff {
        name: "fpcr".to_string(),
        class: RegisterClass::Direct,
        reference: dbg_fpr.fpcr as u64,
        instrumented: (instr_fpr.fpcr & FPCR_MASK) as u64,
    });

    // fpsr aliases the NZCV bits on some implementations; only compare
    // them if the instrumented side's fpsr agrees with its own nzcv,
    // otherwise they're almost certainly noise from differing FP
    // exception state rather than a real divergence.
    let fpsr_mask = if (dbg_fpr.fpsr & NZCV_MASK32) == 0
        && (instr_fpr.fpsr & NZCV_MASK32) == (instr_gpr.nzcv as u32 & NZCV_MASK32)
    {
        FPSR_MASK_NARROW
    } else {
        FPSR_MASK_WIDE
    };
    out.push(RegisterDiff {
        name: "fpsr".to_string(),
        class: RegisterClass::Direct,
        reference: dbg_fpr.fpsr as u64,
        instrumented: (instr_fpr.fpsr & fpsr_mask) as u64,
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_gpr() -> GprState {
        GprState {
            x: [0; 30],
            lr: 0,
            sp: 0,
            nzcv: 0,
        }
    }

    fn zero_fpr() -> FprState {
        FprState {
            v: [[0, 0]; 32],
            fpcr: 0,
            fpsr: 0,
        }
    }

    #[test]
    fn nzcv_reserved_bits_are_masked_out() {
        let mut dbg = zero_gpr();
        dbg.nzcv = 0x2000_0000;
        let mut instr = zero_gpr();
        instr.nzcv = 0x2000_0001;
        let diffs = compare(&dbg, &zero_fpr(), &instr, &zero_fpr());
        let nzcv = diffs.iter().find(|d| d.name == "nzcv").unwrap();
        assert_eq!(nzcv.reference, nzcv.instrumented);
    }

    #[test]
    fn fpcr_reserved_bits_masked_only_on_instrumented_side() {
        let mut dbg_fpr = zero_fpr();
        dbg_fpr.fpcr = 0;
        let mut instr_fpr = zero_fpr();
        instr_fpr.fpcr = 0xFF00_0000; // outside FPCR_MASK
        let diffs = compare(&zero_gpr(), &dbg_fpr, &zero_gpr(), &instr_fpr);
        let fpcr = diffs.iter().find(|d| d.name == "fpcr").unwrap();
        assert_eq!(fpcr.reference, fpcr.instrumented);
    }

    #[test]
    fn fpsr_uses_wide_mask_when_nzcv_alias_disagrees() {
        let dbg_gpr = zero_gpr();
        let mut instr_gpr = zero_gpr();
        instr_gpr.nzcv = 0x8000_0000;
        let dbg_fpr = zero_fpr();
        let mut instr_fpr = zero_fpr();
        instr_fpr.fpsr = 0x4000_0000; // disagrees with instr_gpr.nzcv
        let diffs = compare(&dbg_gpr, &dbg_fpr, &instr_gpr, &instr_fpr);
        let fpsr = diffs.iter().find(|d| d.name == "fpsr").unwrap();
        assert_ne!(fpsr.reference, fpsr.instrumented);
    }
}
