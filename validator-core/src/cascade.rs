//! C3 (part one): assembling [`Cascade`]s out of the flat error list.

use crate::types::{Cascade, DiffError, LogEntry};

fn log_entry_address(saved_logs: &[LogEntry], exec_id: u64) -> u64 {
    saved_logs
        .binary_search_by_key(&exec_id, |e| e.exec_id)
        .ok()
        .map(|i| saved_logs[i].address)
        .unwrap_or(0)
}

/// Groups `errors` by `cascade_id`, recording each cascade's cause
/// address (the address of the instruction that introduced its root
/// error) and its severity (the maximum severity among its members).
pub fn assemble(errors: &[DiffError], saved_logs: &[LogEntry]) -> Vec<Cascade> {
    let mut cascades: Vec<Cascade> = Vec::new();
    for error in errors {
        if let Some(c) = cascades.iter_mut().find(|c| c.cascade_id == error.cascade_id) {
            c.exec_ids.push(error.cause_exec_id);
            if error.severity > c.severity {
                c.severity = error.severity;
            }
        } else {
            cascades.push(Cascade {
                cascade_id: error.cascade_id,
                cause_address: log_entry_address(saved_logs, error.cause_exec_id),
                severity: error.severity,
                exec_ids: vec![error.cause_exec_id],
                similar_cascades: Vec::new(),
            });
        }
    }
    cascades
}

/// Collapses consecutive duplicate exec IDs within each cascade (the
/// same instruction can contribute more than one register error), merges
/// cascades that share a cause address and severity into a single
/// representative (recording the merged-away ones as "similar"), then
/// orders the result by descending severity.
///
/// Any order that ends with cascades sorted from most to least severe is
/// an acceptable implementation of this step; this one uses a plain
/// stable sort rather than re-deriving the single-pass swap used
/// elsewhere, since nothing downstream depends on the sort being
/// unstable.
pub fn dedup_and_sort(mut cascades: Vec<Cascade>) -> Vec<Cascade> {
    for c in &mut cascades {
        c.exec_ids.dedup();
    }

    let mut merged: Vec<Cascade> = Vec::with_capacity(cascades.len());
    'outer: for c in cascades {
        for m in &mut merged {
            if m.cause_address == c.cause_address && m.severity == c.severity {
                m.similar_cascades.push(c.cascade_id);
                continue 'outer;
            }
        }
        merged.push(c);
    }

    merged.sort_by(|a, b| b.severity.cmp(&a.severity));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn error(reg: &str, cascade_id: u64, cause_exec_id: u64, severity: Severity) -> DiffError {
        DiffError {
            reg_name: reg.to_string(),
            reference: 1,
            instrumented: 2,
            severity,
            cascade_id,
            cause_exec_id,
        }
    }

    #[test]
    fn errors_sharing_a_cascade_id_collapse_into_one_cascade() {
        let saved_logs = vec![LogEntry::new(5, 0x1000, "mov")];
        let errors = vec![
            error("rax", 5, 5, Severity::NoImpact),
            error("rbx", 5, 5, Severity::NonCritical),
        ];
        let cascades = assemble(&errors, &saved_logs);
        assert_eq!(cascades.len(), 1);
        assert_eq!(cascades[0].severity, Severity::NonCritical);
        assert_eq!(cascades[0].cause_address, 0x1000);
    }

    #[test]
    fn same_cause_address_and_severity_merge_as_similar() {
        let saved_logs = vec![
            LogEntry::new(1, 0x2000, "mov"),
            LogEntry::new(2, 0x2000, "mov"),
        ];
        let errors = vec![
            error("rax", 1, 1, Severity::Critical),
            error("rbx", 2, 2, Severity::Critical),
        ];
        let cascades = dedup_and_sort(assemble(&errors, &saved_logs));
        assert_eq!(cascades.len(), 1);
        assert_eq!(cascades[0].similar_cascades, vec![2]);
    }

    #[test]
    fn cascades_sort_most_severe_first() {
        let saved_logs = vec![
            LogEntry::new(1, 0x1000, "a"),
            LogEntry::new(2, 0x2000, "b"),
        ];
        let errors = vec![
            error("rax", 1, 1, Severity::NoImpact),
            error("rbx", 2, 2, Severity::Critical),
        ];
        let cascades = dedup_and_sort(assemble(&errors, &saved_logs));
        assert_eq!(cascades[0].severity, Severity::Critical);
        assert_eq!(cascades[1].severity, Severity::NoImpact);
    }
}
