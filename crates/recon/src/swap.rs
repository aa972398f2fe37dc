use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyKind, AnomalyLog, Stage};
use crate::matcher::MatchStatus;
use crate::model::{CableLine, Layer, Region, Side, SlotKey};

// ---------------------------------------------------------------------------
// Swap table + policy
// ---------------------------------------------------------------------------

/// Planned PPP connector moves, old position → new position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapTable {
    moves: BTreeMap<String, String>,
}

impl SwapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous target if `old` was already listed.
    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) -> Option<String> {
        self.moves.insert(old.into(), new.into())
    }

    pub fn target(&self, position: &str) -> Option<&str> {
        self.moves.get(position).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.moves.iter().map(|(o, n)| (o.as_str(), n.as_str()))
    }
}

/// Physical subregion eligible for moves. Unset fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SwapScope {
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub region: Option<Region>,
    /// Leave DCB records in place.
    #[serde(default = "default_hybrids_only")]
    pub hybrids_only: bool,
}

fn default_hybrids_only() -> bool {
    true
}

impl SwapScope {
    pub fn contains(&self, line: &CableLine) -> bool {
        self.side.map_or(true, |s| s == line.side)
            && self.layer.map_or(true, |l| l == line.layer)
            && self.region.map_or(true, |r| r == line.region)
            && (!self.hybrids_only || line.is_hybrid())
    }

    pub fn is_unconstrained(&self) -> bool {
        self.side.is_none() && self.layer.is_none() && self.region.is_none() && !self.hybrids_only
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapPolicy {
    Unconditional,
    Scoped(SwapScope),
}

impl SwapPolicy {
    pub fn allows(&self, line: &CableLine) -> bool {
        match self {
            Self::Unconditional => true,
            Self::Scoped(scope) => scope.contains(line),
        }
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// A cavern record after the swap, with its pre-swap position.
#[derive(Debug, Clone)]
pub struct SwappedLine {
    pub line: CableLine,
    pub from: String,
    pub moved: bool,
}

/// Relabel positions per the table. Only `ppp` changes; wiring, lengths and
/// labels stay as they were before the move. Each record looks its original
/// position up once, so two-way swaps do not chain.
pub fn apply_swap(lines: &[CableLine], table: &SwapTable, policy: &SwapPolicy) -> Vec<SwappedLine> {
    let out: Vec<SwappedLine> = lines
        .iter()
        .map(|line| {
            let mut swapped = line.clone();
            let target = table.target(&line.ppp).filter(|_| policy.allows(line));
            if let Some(new) = target {
                swapped.ppp = new.to_string();
            }
            SwappedLine {
                line: swapped,
                from: line.ppp.clone(),
                moved: target.is_some(),
            }
        })
        .collect();
    log::info!(
        "swap: {} of {} records moved",
        out.iter().filter(|s| s.moved).count(),
        out.len()
    );
    out
}

/// Outcome of re-matching one swapped record by PPP slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotMatch {
    pub swapped: usize,
    pub nominal: Option<usize>,
    pub status: MatchStatus,
}

/// Re-match swapped records to nominal by slot (side, layer, region,
/// position, pin); identity fields no longer decide the counterpart.
pub fn rematch_by_slot(swapped: &[SwappedLine], nominal: &[CableLine], log: &mut AnomalyLog) -> Vec<SlotMatch> {
    let mut index: BTreeMap<SlotKey<'_>, Vec<usize>> = BTreeMap::new();
    for (i, n) in nominal.iter().enumerate() {
        index.entry(n.slot_key()).or_default().push(i);
    }

    swapped
        .iter()
        .enumerate()
        .map(|(si, s)| {
            let candidates = index.get(&s.line.slot_key()).map(Vec::as_slice).unwrap_or(&[]);
            let subject = || {
                format!("{}{}{} {}:{}", s.line.side, s.line.layer, s.line.region, s.line.ppp, s.line.pin)
            };
            let (nominal, status) = match candidates {
                [only] => (Some(*only), MatchStatus::Matched),
                [] => {
                    log.record(
                        AnomalyKind::MatchNotFound,
                        Stage::Swap,
                        subject(),
                        "no nominal record at this slot",
                    );
                    (None, MatchStatus::NotFound)
                }
                many => {
                    log.record(
                        AnomalyKind::MatchAmbiguous,
                        Stage::Swap,
                        subject(),
                        format!("{} nominal records at this slot", many.len()),
                    );
                    (None, MatchStatus::Ambiguous { candidates: many.len(), tolerated: false })
                }
            };
            SlotMatch { swapped: si, nominal, status }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Length, Role, Wiring};

    fn line(side: Side, layer: Layer, flex: &str, ppp: &str) -> CableLine {
        CableLine {
            side,
            layer,
            region: Region::Mag,
            backplane: "gamma".into(),
            bp_connector: "JP2".into(),
            secondary_connector: "J4".into(),
            flex: flex.into(),
            load_group: "grp3".into(),
            role: Role::Alone,
            ppp: ppp.into(),
            pin: 5,
            wiring: Some(Wiring {
                lvr: 3,
                channels: vec![4],
                length_c: Length::parse("9"),
                length_a: Length::parse("1"),
                ppp_label: format!("{ppp} - 5/13 | PT_gamma"),
                lvr_labels: vec!["3 - J12 - 2/1 CT | PT_gamma".into()],
            }),
        }
    }

    fn table() -> SwapTable {
        let mut t = SwapTable::new();
        t.insert("P10", "P14");
        t.insert("P14", "P10");
        t
    }

    fn bottom_magnet_hybrids() -> SwapPolicy {
        SwapPolicy::Scoped(SwapScope {
            side: Some(Side::C),
            layer: Some(Layer::Bot),
            region: Some(Region::Mag),
            hybrids_only: true,
        })
    }

    #[test]
    fn unconditional_moves_every_listed_record_once() {
        let lines = vec![
            line(Side::C, Layer::Top, "X0M", "P10"),
            line(Side::C, Layer::Top, "X0M", "P14"),
            line(Side::C, Layer::Top, "X0M", "P3"),
        ];
        let out = apply_swap(&lines, &table(), &SwapPolicy::Unconditional);
        let positions: Vec<&str> = out.iter().map(|s| s.line.ppp.as_str()).collect();
        assert_eq!(positions, vec!["P14", "P10", "P3"]);
        assert!(out[0].moved && out[1].moved && !out[2].moved);
        assert_eq!(out[2].line, lines[2]);
    }

    #[test]
    fn scoped_policy_leaves_out_of_scope_records() {
        let lines = vec![
            line(Side::C, Layer::Bot, "X0M", "P10"),
            line(Side::C, Layer::Top, "X0M", "P10"),
            line(Side::C, Layer::Bot, "n/a", "P10"),
        ];
        let out = apply_swap(&lines, &table(), &bottom_magnet_hybrids());
        assert_eq!(out[0].line.ppp, "P14");
        assert_eq!(out[1].line.ppp, "P10");
        assert_eq!(out[2].line.ppp, "P10");
        assert_eq!(out[1].line, lines[1]);
    }

    #[test]
    fn swap_preserves_wiring_and_labels() {
        let lines = vec![line(Side::C, Layer::Bot, "X0M", "P10")];
        let out = apply_swap(&lines, &table(), &SwapPolicy::Unconditional);
        assert_eq!(out[0].line.wiring, lines[0].wiring);
        assert_eq!(out[0].from, "P10");
    }

    #[test]
    fn rematch_uses_slot_not_identity() {
        let mut nominal = line(Side::C, Layer::Bot, "S2S", "P14");
        nominal.wiring = None;
        nominal.backplane = "alpha".into();
        let swapped = apply_swap(
            &[line(Side::C, Layer::Bot, "X0M", "P10")],
            &table(),
            &SwapPolicy::Unconditional,
        );
        let mut log = AnomalyLog::new();
        let m = rematch_by_slot(&swapped, &[nominal], &mut log);
        assert_eq!(m[0].nominal, Some(0));
        assert!(log.is_empty());
    }

    #[test]
    fn rematch_reports_empty_slot() {
        let swapped = apply_swap(
            &[line(Side::C, Layer::Bot, "X0M", "P3")],
            &table(),
            &SwapPolicy::Unconditional,
        );
        let mut log = AnomalyLog::new();
        let m = rematch_by_slot(&swapped, &[], &mut log);
        assert_eq!(m[0].status, MatchStatus::NotFound);
        assert_eq!(log.entries()[0].stage, Stage::Swap);
    }
}
