use std::collections::BTreeMap;

use crate::anomaly::{AnomalyKind, AnomalyLog, Stage};
use crate::model::{CableLine, IdentityKey};

/// Cavern records after splice stubs have been folded into their runs.
#[derive(Debug)]
pub struct Consolidation {
    pub lines: Vec<CableLine>,
    pub merged: usize,
    pub unresolved: usize,
}

/// Fold every `splice` stub into the single non-splice record sharing its
/// identity-minus-position.
///
/// The target's channel list and LVR labels gain the stub's; the stub is
/// dropped. A stub with zero or several candidates is left in place and
/// recorded as an anomaly. The input slice is not modified.
pub fn consolidate_splices(lines: &[CableLine], log: &mut AnomalyLog) -> Consolidation {
    let mut runs: BTreeMap<IdentityKey<'_>, Vec<usize>> = BTreeMap::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.is_splice() {
            runs.entry(line.identity_key()).or_default().push(i);
        }
    }

    let mut out: Vec<CableLine> = lines.to_vec();
    let mut absorbed = vec![false; lines.len()];
    let mut merged = 0;
    let mut unresolved = 0;

    for (i, stub) in lines.iter().enumerate().filter(|(_, l)| l.is_splice()) {
        let candidates = runs
            .get(&stub.identity_key())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        match (candidates, stub.wiring.as_ref()) {
            ([target], Some(stub_wiring)) => {
                if let Some(wiring) = out[*target].wiring.as_mut() {
                    wiring.absorb_splice(stub_wiring);
                    absorbed[i] = true;
                    merged += 1;
                    continue;
                }
                log.record(
                    AnomalyKind::SpliceResolution,
                    Stage::Splice,
                    stub.describe(),
                    "splice sibling carries no LVR wiring",
                );
                unresolved += 1;
            }
            _ => {
                log.record(
                    AnomalyKind::SpliceResolution,
                    Stage::Splice,
                    stub.describe(),
                    format!("expected one splice sibling, found {}", candidates.len()),
                );
                unresolved += 1;
            }
        }
    }

    let lines: Vec<CableLine> = out
        .into_iter()
        .zip(absorbed)
        .filter_map(|(line, gone)| (!gone).then_some(line))
        .collect();

    log::info!("splice consolidation: {merged} merged, {unresolved} unresolved, {} records", lines.len());

    Consolidation { lines, merged, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, Length, Region, Role, Side, Wiring};

    fn line(flex: &str, channel: u8, length: &str, label: &str) -> CableLine {
        CableLine {
            side: Side::C,
            layer: Layer::Bot,
            region: Region::Mag,
            backplane: "beta".into(),
            bp_connector: "JP4".into(),
            secondary_connector: "J3".into(),
            flex: flex.into(),
            load_group: "grp2".into(),
            role: Role::Master,
            ppp: "P7".into(),
            pin: 2,
            wiring: Some(Wiring {
                lvr: 7,
                channels: vec![channel],
                length_c: Length::parse(length),
                length_a: Length::parse("1.5"),
                ppp_label: "P7 - 2/10 | PT_beta_X1M".into(),
                lvr_labels: vec![label.into()],
            }),
        }
    }

    #[test]
    fn stub_folds_into_sibling() {
        let lines = vec![
            line("X1M", 7, "12.0", "7 - J13 - 4/3 CB | PT_beta_X1M"),
            line("X1M", 3, "splice", "7 - J12 - 4/3 CB | PT_beta_X1M"),
        ];
        let mut log = AnomalyLog::new();
        let out = consolidate_splices(&lines, &mut log);

        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.merged, 1);
        assert!(log.is_empty());
        let w = out.lines[0].wiring.as_ref().unwrap();
        assert_eq!(w.channel_text(), "7 Y 3");
        assert_eq!(w.length_c.to_string(), "12.0");
        assert_eq!(
            w.lvr_label_text(),
            "7 - J13 - 4/3 CB | PT_beta_X1M   Y   7 - J12 - 4/3 CB | PT_beta_X1M"
        );
        assert!(out.lines.iter().all(|l| !l.is_splice()));
        // source untouched
        assert_eq!(lines[0].wiring.as_ref().unwrap().channel_text(), "7");
    }

    #[test]
    fn sibling_found_at_a_different_position() {
        let mut stub = line("X1M", 3, "splice", "b");
        stub.ppp = "P9".into();
        let lines = vec![line("X1M", 7, "12.0", "a"), stub];
        let mut log = AnomalyLog::new();
        let out = consolidate_splices(&lines, &mut log);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.merged, 1);
    }

    #[test]
    fn orphan_stub_is_reported_and_kept() {
        let lines = vec![line("X1M", 7, "12.0", "a"), line("S1S", 3, "splice", "b")];
        let mut log = AnomalyLog::new();
        let out = consolidate_splices(&lines, &mut log);

        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.unresolved, 1);
        assert_eq!(log.count(AnomalyKind::SpliceResolution), 1);
        assert!(out.lines[1].is_splice());
    }

    #[test]
    fn two_siblings_is_ambiguous() {
        let lines = vec![
            line("X1M", 7, "12.0", "a"),
            line("X1M", 8, "11.0", "b"),
            line("X1M", 3, "splice", "c"),
        ];
        let mut log = AnomalyLog::new();
        let out = consolidate_splices(&lines, &mut log);

        assert_eq!(out.lines.len(), 3);
        assert_eq!(out.merged, 0);
        assert_eq!(log.count(AnomalyKind::SpliceResolution), 1);
    }
}
