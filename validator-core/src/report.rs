//! C3 (part two): rendering cascades, run statistics and mnemonic
//! coverage at a chosen verbosity.
//!
//! Every function here takes an explicit `Write` sink rather than
//! printing directly, so the formatting can be exercised in tests
//! without a global logger or captured stdio.

use std::io::{self, Write};

use crate::cascade;
use crate::engine::ValidatorEngine;
use crate::types::{DiffError, LogEntry, Severity};

/// How much the master loop prints at the end of a run. Ordered, coarsest
/// first: each level is a superset of the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Stat,
    Summary,
    Detail,
    Full,
}

fn severity_label(s: Severity) -> &'static str {
    match s {
        Severity::NoImpact => "No impact",
        Severity::NonCritical => "Non critical impact",
        Severity::Critical => "Critical impact",
    }
}

/// Renders one instruction's disassembly, any transfer it caused, and
/// the differences attributed to it.
pub fn write_log_entry(
    w: &mut impl Write,
    entry: &LogEntry,
    errors: &[DiffError],
) -> io::Result<()> {
    writeln!(w, "ExecID: {} \t{:#018x}: {}", entry.exec_id, entry.address, entry.disassembly)?;
    if let Some(transfer) = entry.transfer {
        writeln!(w, "\tCaused a transfer to address {transfer:#018x}")?;
    }
    for &eid in &entry.error_ids {
        let e = &errors[eid];
        writeln!(
            w,
            "\tError with {} on {}: {:#018x} (reference) != {:#018x} (instrumented)",
            match e.severity {
                Severity::NoImpact => "no impact",
                Severity::NonCritical => "non critical impact",
                Severity::Critical => "critical impact",
            },
            e.reg_name,
            e.reference,
            e.instrumented,
        )?;
    }
    Ok(())
}

/// Renders the run's cascades at `verbosity`, matching the original
/// tool's sections: aggregate stats at `Stat` and above, then the
/// deduplicated, severity-sorted cascade list at `Summary` and above,
/// with the full causal chain of each cascade shown at `Detail` and
/// above.
pub fn log_cascades(
    engine: &ValidatorEngine,
    verbosity: Verbosity,
    w: &mut impl Write,
) -> io::Result<()> {
    let cascades = cascade::assemble(engine.errors(), engine.saved_logs());

    if verbosity >= Verbosity::Stat {
        let mut no_impact = 0usize;
        let mut non_critical = 0usize;
        let mut critical = 0usize;
        writeln!(w, "Stats")?;
        writeln!(w, "=====\n")?;
        writeln!(w, "Executed {} total instructions", engine.exec_id())?;
        writeln!(w, "Executed {} unique instructions", engine.coverage().len())?;
        writeln!(w, "Encountered {} difference mappings", engine.diff_maps().len())?;
        writeln!(w, "Encountered {} errors:", engine.errors().len())?;
        for e in engine.errors() {
            match e.severity {
                Severity::NoImpact => no_impact += 1,
                Severity::NonCritical => non_critical += 1,
                Severity::Critical => critical += 1,
            }
        }
        writeln!(w, "\tNo impact errors: {no_impact}")?;
        writeln!(w, "\tNon critical errors: {non_critical}")?;
        writeln!(w, "\tCritical errors: {critical}")?;

        let (mut c_no, mut c_non, mut c_crit) = (0usize, 0usize, 0usize);
        for c in &cascades {
            match c.severity {
                Severity::NoImpact => c_no += 1,
                Severity::NonCritical => c_non += 1,
                Severity::Critical => c_crit += 1,
            }
        }
        writeln!(w, "Encountered {} error cascades:", cascades.len())?;
        writeln!(w, "\tNo impact cascades: {c_no}")?;
        writeln!(w, "\tNon critical cascades: {c_non}")?;
        writeln!(w, "\tCritical cascades: {c_crit}")?;
    }

    if verbosity >= Verbosity::Summary {
        let cascades = cascade::dedup_and_sort(cascades);
        writeln!(w, "\n\nError cascades:")?;
        writeln!(w, "==============\n")?;
        for c in &cascades {
            writeln!(w, "Cascade {}:", c.cascade_id)?;
            writeln!(w, "--------------------\n")?;
            writeln!(w, "{} other similar cascade(s) encountered", c.similar_cascades.len())?;
            writeln!(w, "Cascade length: {}", c.exec_ids.len())?;
            writeln!(w, "{} classification", severity_label(c.severity))?;

            if verbosity == Verbosity::Summary {
                writeln!(w, "Cause:")?;
                if let Some(entry) = find_log_entry(engine.saved_logs(), c.cascade_id) {
                    write_log_entry(w, entry, engine.errors())?;
                }
            } else if verbosity >= Verbosity::Detail {
                writeln!(w, "Chain:")?;
                for &exec_id in &c.exec_ids {
                    if let Some(entry) = find_log_entry(engine.saved_logs(), exec_id) {
                        write_log_entry(w, entry, engine.errors())?;
                    }
                }
            }
            writeln!(w, "\n")?;
        }
    }

    Ok(())
}

fn find_log_entry(saved_logs: &[LogEntry], exec_id: u64) -> Option<&LogEntry> {
    saved_logs
        .binary_search_by_key(&exec_id, |e| e.exec_id)
        .ok()
        .map(|i| &saved_logs[i])
}

/// Writes the mnemonic coverage table, most-executed first.
pub fn log_coverage(engine: &ValidatorEngine, w: &mut impl Write) -> io::Result<()> {
    let mut entries: Vec<(&String, &u64)> = engine.coverage().iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    for (mnemonic, count) in entries {
        writeln!(w, "{mnemonic}: {count}")?;
    }
    Ok(())
}
