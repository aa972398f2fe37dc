use std::collections::BTreeMap;

use serde::Serialize;

use crate::anomaly::AnomalyLog;
use crate::engine::Stages;
use crate::matcher::MatchStatus;

/// Headline counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarnessSummary {
    pub nominal_records: usize,
    pub cavern_records: usize,
    pub consolidated_records: usize,
    pub splices_merged: usize,
    pub splices_unresolved: usize,
    pub matched: usize,
    pub not_found: usize,
    pub ambiguous: usize,
    pub wrong_position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flipped_wrong_position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_to_move: Option<usize>,
    pub coverage_gaps: usize,
    pub load_mismatches: usize,
    pub sense_lines: usize,
    pub sense_mismatches: usize,
    pub label_mismatches: usize,
    pub cable_test_mismatches: usize,
    pub anomalies: usize,
    pub unresolved_anomalies: usize,
    pub anomaly_counts: BTreeMap<String, usize>,
}

impl HarnessSummary {
    /// Findings that need a physical fix or a schematic correction.
    pub fn discrepancies(&self) -> usize {
        self.wrong_position
            + self.load_mismatches
            + self.sense_mismatches
            + self.label_mismatches
            + self.cable_test_mismatches
    }
}

fn count<T>(findings: &Option<Vec<T>>) -> usize {
    findings.as_ref().map_or(0, Vec::len)
}

/// Compute summary statistics from stage outputs. Skipped stages count zero.
pub fn compute_summary(stages: &Stages, log: &AnomalyLog) -> HarnessSummary {
    let recon = &stages.recon;
    let cavern = &stages.consolidation.lines;

    let flipped_wrong_position = stages.flipped.as_ref().map(|flipped| {
        recon
            .matches
            .iter()
            .filter_map(|m| Some((flipped.get(m.cavern)?, recon.counterpart(m)?)))
            .filter(|(f, n)| f.full_key() != n.full_key())
            .count()
    });

    let (moved, labels_to_move) = match &stages.swap {
        Some((swapped, slots)) => {
            let moved = swapped.iter().filter(|s| s.moved).count();
            let relabel = slots
                .iter()
                .filter_map(|m| Some((&swapped.get(m.swapped)?.line, recon.nominal.get(m.nominal?)?)))
                .filter(|(s, n)| s.identity_key() != n.identity_key())
                .count();
            (Some(moved), Some(relabel))
        }
        None => (None, None),
    };

    HarnessSummary {
        nominal_records: stages.nominal_records,
        cavern_records: stages.cavern_records,
        consolidated_records: cavern.len(),
        splices_merged: stages.consolidation.merged,
        splices_unresolved: stages.consolidation.unresolved,
        matched: recon.count(|s| *s == MatchStatus::Matched),
        not_found: recon.count(|s| *s == MatchStatus::NotFound),
        ambiguous: recon.count(|s| matches!(s, MatchStatus::Ambiguous { .. })),
        wrong_position: recon.wrong_positions(cavern),
        flipped_wrong_position,
        moved,
        labels_to_move,
        coverage_gaps: count(&stages.coverage_gaps),
        load_mismatches: count(&stages.load_mismatches),
        sense_lines: count(&stages.sense_lines),
        sense_mismatches: count(&stages.sense_findings),
        label_mismatches: count(&stages.label_mismatches),
        cable_test_mismatches: count(&stages.cable_test_misses),
        anomalies: log.len(),
        unresolved_anomalies: log.unresolved(),
        anomaly_counts: log.counts_by_kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrepancies_sum_finding_counts() {
        let summary = HarnessSummary {
            wrong_position: 2,
            load_mismatches: 1,
            sense_mismatches: 3,
            label_mismatches: 0,
            cable_test_mismatches: 1,
            not_found: 9,
            ..HarnessSummary::default()
        };
        assert_eq!(summary.discrepancies(), 7);
    }
}
