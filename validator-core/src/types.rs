//! Core data model: severities, recorded differences, address-space
//! explanations and per-instruction log entries.

/// Impact classification of a single register difference, escalated as
/// evidence accumulates: a difference starts as `NoImpact`, is promoted to
/// `NonCritical` the moment it causes a later difference (a cascade), and
/// to `Critical` only if the reference process crashes or exits while it
/// was still the most recent difference outstanding.
///
/// Declaration order doubles as severity order (`NoImpact < NonCritical <
/// Critical`) so escalation is a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    NoImpact,
    NonCritical,
    Critical,
}

/// How a register is compared, and how its differences may be explained
/// away. Chosen per register by the ISA descriptor tables in [`crate::isa`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    /// General-purpose/integer registers and flag words treated as
    /// address-like: a consistent offset between the two processes'
    /// values, within the bounds of the memory region each value points
    /// into, is accepted as a benign relocation (see [`crate::DiffMap`]).
    Gpr,
    /// SIMD/FPU data registers: only an *exact* repeated value pair is
    /// accepted as already-explained; no address-window tolerance.
    Spr,
    /// Status/control words compared for bit-exact equality with no
    /// explanation mechanism at all (FPU control/status, MXCSR and
    /// friends).
    Direct,
}

/// A single register difference recorded for one executed instruction.
#[derive(Debug, Clone)]
pub struct DiffError {
    pub reg_name: String,
    pub reference: u64,
    pub instrumented: u64,
    pub severity: Severity,
    pub cascade_id: u64,
    pub cause_exec_id: u64,
}

/// A learned, benign address-space offset between the reference and
/// instrumented processes (e.g. differing load addresses for the same
/// shared object). `lower_offset`/`upper_offset` bound how far a later
/// value may drift from the pair that created the map and still be
/// considered the same relocation; both zero means only the exact pair
/// is accepted (used for SIMD/FPU register explanations).
#[derive(Debug, Clone, Copy)]
pub struct DiffMap {
    pub reference: u64,
    pub instrumented: u64,
    pub lower_offset: u64,
    pub upper_offset: u64,
    pub cause_exec_id: u64,
}

/// A causal chain of register differences rooted at the instruction that
/// first diverged.
#[derive(Debug, Clone)]
pub struct Cascade {
    pub cascade_id: u64,
    pub cause_address: u64,
    pub severity: Severity,
    pub exec_ids: Vec<u64>,
    pub similar_cascades: Vec<u64>,
}

/// A record of one executed instruction: its disassembly, whether it
/// caused a control-flow transfer, and the indices of any [`DiffError`]s
/// attributed to it.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub exec_id: u64,
    pub address: u64,
    pub disassembly: String,
    pub transfer: Option<u64>,
    pub error_ids: Vec<usize>,
}

impl LogEntry {
    pub fn new(exec_id: u64, address: u64, disassembly: impl Into<String>) -> Self {
        LogEntry {
            exec_id,
            address,
            disassembly: disassembly.into(),
            transfer: None,
            error_ids: Vec::new(),
        }
    }
}
