//! C2: Diff Core.
//!
//! [`ValidatorEngine`] is the only stateful, mutating piece of
//! `validator-core`. It has no I/O of its own — callers drive it with
//! decoded wire events and get back the log entries/log data it produces,
//! which `validator-core::report` then renders to a `Write` sink at the
//! caller's chosen verbosity.

use indexmap::IndexMap;
use validator_wire::event::InstructionState;

use crate::isa;
use crate::memmap::{valid_offset_range, MemoryMapProvider};
use crate::types::{DiffError, DiffMap, LogEntry, RegisterClass, Severity};

pub struct ValidatorEngine {
    last_log_entry: Option<LogEntry>,
    cur_log_entry: Option<LogEntry>,
    diff_maps: Vec<DiffMap>,
    saved_logs: Vec<LogEntry>,
    errors: Vec<DiffError>,
    coverage: IndexMap<String, u64>,
    debugged_pid: i32,
    instrumented_pid: i32,
    exec_id: u64,
    memmap: Box<dyn MemoryMapProvider>,
}

impl ValidatorEngine {
    pub fn new(debugged_pid: i32, instrumented_pid: i32, memmap: Box<dyn MemoryMapProvider>) -> Self {
        ValidatorEngine {
            last_log_entry: None,
            cur_log_entry: None,
            diff_maps: Vec::new(),
            saved_logs: Vec::new(),
            errors: Vec::new(),
            coverage: IndexMap::new(),
            debugged_pid,
            instrumented_pid,
            exec_id: 0,
            memmap,
        }
    }

    pub fn errors(&self) -> &[DiffError] {
        &self.errors
    }

    pub fn diff_maps(&self) -> &[DiffMap] {
        &self.diff_maps
    }

    pub fn saved_logs(&self) -> &[LogEntry] {
        &self.saved_logs
    }

    pub fn coverage(&self) -> &IndexMap<String, u64> {
        &self.coverage
    }

    pub fn exec_id(&self) -> u64 {
        self.exec_id
    }

    /// Records the register state resulting from the instruction the
    /// engine is currently tracking, then rotates to a new entry for
    /// `address`/`disassembly`, the instruction about to execute.
    /// `mnemonic` is only used as the coverage table key; `disassembly`
    /// (the fuller text) is what the log entry carries for reporting.
    ///
    /// Returns the log entry that was displaced by the rotation (the one
    /// two calls back), if any — the caller decides whether to render it
    /// at `Full` verbosity.
    pub fn signal_new_state(
        &mut self,
        address: u64,
        mnemonic: &str,
        disassembly: &str,
        dbg: &InstructionState,
        instr: &InstructionState,
    ) -> Option<LogEntry> {
        if self.cur_log_entry.is_some() {
            let diffs = isa::compare(dbg, instr);
            let mut newly_caused = false;
            let mut error_ids = Vec::new();
            for rd in diffs {
                let id = match rd.class {
                    RegisterClass::Gpr => self.diff_gpr(&rd.name, rd.reference, rd.instrumented),
                    RegisterClass::Spr => self.diff_spr(&rd.name, rd.reference, rd.instrumented),
                    RegisterClass::Direct => self.diff(&rd.name, rd.reference, rd.instrumented),
                };
                if let Some(id) = id {
                    if self.errors[id].cause_exec_id == self.exec_id {
                        newly_caused = true;
                    }
                    error_ids.push(id);
                }
            }
            let cur = self.cur_log_entry.as_mut().expect("checked above");
            cur.error_ids.extend(error_ids);
            if newly_caused {
                self.saved_logs.push(self.cur_log_entry.clone().expect("checked above"));
            }
        }

        let rotated_out = self.last_log_entry.take();
        self.last_log_entry = self.cur_log_entry.take();
        self.exec_id += 1;
        *self.coverage.entry(mnemonic.to_string()).or_insert(0) += 1;
        self.cur_log_entry = Some(LogEntry::new(self.exec_id, address, disassembly));
        rotated_out
    }

    /// The instruction currently being tracked caused a jump away from
    /// the expected linear flow (a call, branch, signal handler, ...).
    /// Disables the "new diffmap" path's assumption of contiguous
    /// execution for the next comparison.
    pub fn signal_exec_transfer(&mut self, address: u64) {
        if let Some(cur) = self.cur_log_entry.as_mut() {
            cur.transfer = Some(address);
        }
    }

    /// The reference process crashed or exited while its most recent
    /// comparison still had outstanding errors: those errors are the
    /// direct cause, so they're marked `Critical` regardless of whether
    /// they later would have been explained as a cascade.
    pub fn signal_critical_state(&mut self) {
        if let Some(last) = &self.last_log_entry {
            for &eid in &last.error_ids {
                self.errors[eid].severity = Severity::Critical;
            }
        }
    }

    /// Drains the two in-flight log entries at end of run. Returns them
    /// oldest-first so a `Full`-verbosity caller can render them in
    /// order.
    pub fn flush_last_log(&mut self) -> Vec<LogEntry> {
        let mut out = Vec::new();
        if let Some(l) = self.last_log_entry.take() {
            out.push(l);
        }
        if let Some(c) = self.cur_log_entry.take() {
            out.push(c);
        }
        out
    }

    fn is_new_diffmap_region(&self) -> bool {
        self.last_log_entry.is_none()
            || self
                .cur_log_entry
                .as_ref()
                .map_or(false, |c| c.transfer.is_some())
    }

    fn propagated_error(&self, reg_name: &str, reference: u64, instrumented: u64) -> Option<usize> {
        let last = self.last_log_entry.as_ref()?;
        for &eid in &last.error_ids {
            let e = &self.errors[eid];
            if e.reg_name == reg_name && e.reference == reference && e.instrumented == instrumented
            {
                return Some(eid);
            }
        }
        None
    }

    /// General-purpose/flag-word registers: differences are first tried
    /// against the learned address-space offsets in `diff_maps`, with an
    /// allowed drift bounded by how close each value sits to the edge of
    /// its containing memory region.
    fn diff_gpr(&mut self, reg_name: &str, reference: u64, instrumented: u64) -> Option<usize> {
        if reference == instrumented {
            return None;
        }

        for d in &self.diff_maps {
            if reference.wrapping_sub(d.reference) == instrumented.wrapping_sub(d.instrumented)
                && ((d.reference >= reference && d.reference - reference <= d.lower_offset)
                    || (reference >= d.reference && reference - d.reference <= d.upper_offset))
            {
                return None;
            }
        }

        if let Some(id) = self.propagated_error(reg_name, reference, instrumented) {
            return Some(id);
        }

        if self.is_new_diffmap_region() {
            let (lower_dbg, upper_dbg) =
                valid_offset_range(self.memmap.as_ref(), self.debugged_pid, reference);
            let (lower_instr, upper_instr) =
                valid_offset_range(self.memmap.as_ref(), self.instrumented_pid, instrumented);
            self.diff_maps.push(DiffMap {
                reference,
                instrumented,
                lower_offset: lower_dbg.min(lower_instr),
                upper_offset: upper_dbg.min(upper_instr),
                cause_exec_id: self.exec_id,
            });
            return None;
        }

        self.diff(reg_name, reference, instrumented)
    }

    /// SIMD/FPU data registers: only an exact, previously-learned (value,
    /// value) pair explains a difference — no address-window tolerance,
    /// since these rarely hold pointers.
    fn diff_spr(&mut self, reg_name: &str, reference: u64, instrumented: u64) -> Option<usize> {
        if reference == instrumented {
            return None;
        }

        for d in &self.diff_maps {
            if d.lower_offset == 0
                && d.upper_offset == 0
                && reference == d.reference
                && instrumented == d.instrumented
            {
                return None;
            }
        }

        if let Some(id) = self.propagated_error(reg_name, reference, instrumented) {
            return Some(id);
        }

        if self.is_new_diffmap_region() {
            self.diff_maps.push(DiffMap {
                reference,
                instrumented,
                lower_offset: 0,
                upper_offset: 0,
                cause_exec_id: self.exec_id,
            });
            return None;
        }

        self.diff(reg_name, reference, instrumented)
    }

    /// Records a bare difference with no explanation mechanism: links it
    /// into the current cascade (the most recent still-open error chain)
    /// if one exists, otherwise checks whether an identical (reference,
    /// instrumented) pair has been seen anywhere before and, if so, folds
    /// this one into that cascade too.
    fn diff(&mut self, reg_name: &str, reference: u64, instrumented: u64) -> Option<usize> {
        if reference == instrumented {
            return None;
        }

        let mut cascade_id = self.exec_id;
        let severity = Severity::NoImpact;

        let last_error_ids = self.last_log_entry.as_ref().map(|l| l.error_ids.clone());
        match last_error_ids {
            Some(ids) if !ids.is_empty() => {
                cascade_id = self.errors[ids[0]].cascade_id;
                for id in ids {
                    self.errors[id].severity = Severity::NonCritical;
                }
            }
            _ => {
                for prev in &mut self.errors {
                    if prev.reference == reference && prev.instrumented == instrumented {
                        cascade_id = prev.cascade_id;
                        prev.severity = Severity::NonCritical;
                        break;
                    }
                }
            }
        }

        self.errors.push(DiffError {
            reg_name: reg_name.to_string(),
            reference,
            instrumented,
            severity,
            cascade_id,
            cause_exec_id: self.exec_id,
        });
        Some(self.errors.len() - 1)
    }
}
