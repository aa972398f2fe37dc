use std::collections::BTreeMap;

use serde::Serialize;

use crate::anomaly::{AnomalyKind, AnomalyLog, Stage};
use crate::model::{CableLine, IdentityKey, Wiring};
use crate::naming::return_pin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum MatchStatus {
    Matched,
    NotFound,
    Ambiguous { candidates: usize, tolerated: bool },
}

/// Outcome for one cavern record. Indices point into the cavern slice given
/// to the matcher and into [`Reconciliation::nominal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    pub cavern: usize,
    pub nominal: Option<usize>,
    pub status: MatchStatus,
}

/// Matcher output: the annotated nominal set plus one outcome per cavern
/// record, in cavern order.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub nominal: Vec<CableLine>,
    pub matches: Vec<LineMatch>,
}

impl Reconciliation {
    pub fn counterpart(&self, m: &LineMatch) -> Option<&CableLine> {
        m.nominal.and_then(|i| self.nominal.get(i))
    }

    /// Matched pairs whose PPP position or pin disagree.
    pub fn wrong_positions(&self, cavern: &[CableLine]) -> usize {
        self.matches
            .iter()
            .filter_map(|m| Some((cavern.get(m.cavern)?, self.counterpart(m)?)))
            .filter(|(c, n)| c.full_key() != n.full_key())
            .count()
    }

    pub fn count(&self, pred: impl Fn(&MatchStatus) -> bool) -> usize {
        self.matches.iter().filter(|m| pred(&m.status)).count()
    }

    /// Nominal indices with a cavern counterpart, each once, in nominal order.
    pub fn matched_nominal(&self) -> Vec<usize> {
        let mut seen = vec![false; self.nominal.len()];
        for m in &self.matches {
            if let Some(i) = m.nominal {
                seen[i] = true;
            }
        }
        seen.iter()
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
            .collect()
    }
}

fn index_by_identity(lines: &[CableLine]) -> BTreeMap<IdentityKey<'_>, Vec<usize>> {
    let mut index: BTreeMap<IdentityKey<'_>, Vec<usize>> = BTreeMap::new();
    for (i, line) in lines.iter().enumerate() {
        index.entry(line.identity_key()).or_default().push(i);
    }
    index
}

/// Wiring a nominal record takes from its cavern counterpart.
///
/// The PPP label keeps the nominal position and pin; the part after `" | "`
/// (the wiring side) comes from the cavern label.
pub fn annotation_for(nominal: &CableLine, cavern: &Wiring) -> Wiring {
    let fragment = cavern
        .ppp_label
        .split_once(" | ")
        .map(|(_, wiring_side)| wiring_side)
        .unwrap_or(&cavern.ppp_label);
    Wiring {
        ppp_label: format!(
            "{} - {}/{} | {}",
            nominal.ppp,
            nominal.pin,
            return_pin(nominal.pin),
            fragment
        ),
        ..cavern.clone()
    }
}

/// Match every cavern record to nominal records under identity-minus-position.
///
/// Exactly one candidate is a match and annotates that nominal record (first
/// match wins). No candidate is `MatchNotFound`. Several candidates are
/// `MatchAmbiguous`; for master/slave records this is the known dual-channel
/// pattern and resolves to the first candidate, otherwise the record stays
/// unresolved.
pub fn reconcile(nominal: &[CableLine], cavern: &[CableLine], log: &mut AnomalyLog) -> Reconciliation {
    let index = index_by_identity(nominal);
    let mut annotated: Vec<CableLine> = nominal.to_vec();
    let mut matches = Vec::with_capacity(cavern.len());

    for (ci, cav) in cavern.iter().enumerate() {
        let candidates = index
            .get(&cav.identity_key())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let (chosen, status) = match candidates {
            [] => {
                log.record(
                    AnomalyKind::MatchNotFound,
                    Stage::Match,
                    cav.describe(),
                    "no nominal record with this identity",
                );
                (None, MatchStatus::NotFound)
            }
            [only] => (Some(*only), MatchStatus::Matched),
            many if cav.role.is_dual_channel() => {
                log.tolerate(
                    AnomalyKind::MatchAmbiguous,
                    Stage::Match,
                    cav.describe(),
                    format!("{} nominal candidates (master/slave run)", many.len()),
                );
                (
                    Some(many[0]),
                    MatchStatus::Ambiguous { candidates: many.len(), tolerated: true },
                )
            }
            many => {
                log.record(
                    AnomalyKind::MatchAmbiguous,
                    Stage::Match,
                    cav.describe(),
                    format!("{} nominal candidates", many.len()),
                );
                (None, MatchStatus::Ambiguous { candidates: many.len(), tolerated: false })
            }
        };

        if let (Some(ni), Some(wiring)) = (chosen, cav.wiring.as_ref()) {
            let target = &mut annotated[ni];
            let wiring = annotation_for(target, wiring);
            if !target.annotate(wiring) {
                log::debug!("{} already annotated, keeping first match", target.describe());
            }
        }

        matches.push(LineMatch { cavern: ci, nominal: chosen, status });
    }

    let out = Reconciliation { nominal: annotated, matches };
    log::info!(
        "matched {} of {} cavern records ({} wrong position)",
        out.count(|s| *s != MatchStatus::NotFound),
        cavern.len(),
        out.wrong_positions(cavern)
    );
    out
}

/// Nominal records with no cavern counterpart under identity-minus-position.
pub fn coverage_gaps(nominal: &[CableLine], cavern: &[CableLine], log: &mut AnomalyLog) -> Vec<usize> {
    let index = index_by_identity(cavern);
    let gaps: Vec<usize> = nominal
        .iter()
        .enumerate()
        .filter(|(_, n)| !index.contains_key(&n.identity_key()))
        .map(|(i, _)| i)
        .collect();
    for &i in &gaps {
        log.record(
            AnomalyKind::MatchNotFound,
            Stage::Coverage,
            nominal[i].describe(),
            "nominal record missing from cavern mapping",
        );
    }
    gaps
}
