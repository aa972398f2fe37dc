use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Recoverable conditions. None of these stop a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MatchNotFound,
    MatchAmbiguous,
    SpliceResolution,
    RoutingUndefined,
    SchemaLookupMiss,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchNotFound => write!(f, "match_not_found"),
            Self::MatchAmbiguous => write!(f, "match_ambiguous"),
            Self::SpliceResolution => write!(f, "splice_resolution"),
            Self::RoutingUndefined => write!(f, "routing_undefined"),
            Self::SchemaLookupMiss => write!(f, "schema_lookup_miss"),
        }
    }
}

/// Pipeline stage that raised an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Splice,
    Coverage,
    Match,
    Swap,
    LineCheck,
    Trace,
    SenseCheck,
    Compare,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Splice => write!(f, "splice"),
            Self::Coverage => write!(f, "coverage"),
            Self::Match => write!(f, "match"),
            Self::Swap => write!(f, "swap"),
            Self::LineCheck => write!(f, "line_check"),
            Self::Trace => write!(f, "trace"),
            Self::SenseCheck => write!(f, "sense_check"),
            Self::Compare => write!(f, "compare"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub stage: Stage,
    pub subject: String,
    pub detail: String,
    /// Known-benign pattern (master/slave records sharing one identity).
    pub tolerated: bool,
}

/// Ordered anomaly collection. Recording an anomaly also logs it.
#[derive(Debug, Default)]
pub struct AnomalyLog {
    entries: Vec<Anomaly>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        kind: AnomalyKind,
        stage: Stage,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(kind, stage, subject.into(), detail.into(), false);
    }

    pub fn tolerate(
        &mut self,
        kind: AnomalyKind,
        stage: Stage,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(kind, stage, subject.into(), detail.into(), true);
    }

    fn push(&mut self, kind: AnomalyKind, stage: Stage, subject: String, detail: String, tolerated: bool) {
        if tolerated {
            log::debug!("[{stage}] {kind} (tolerated): {subject}: {detail}");
        } else {
            log::warn!("[{stage}] {kind}: {subject}: {detail}");
        }
        self.entries.push(Anomaly { kind, stage, subject, detail, tolerated });
    }

    pub fn entries(&self) -> &[Anomaly] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.entries.iter().filter(|a| a.kind == kind).count()
    }

    pub fn unresolved(&self) -> usize {
        self.entries.iter().filter(|a| !a.tolerated).count()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for a in &self.entries {
            *counts.entry(a.kind.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_entries(self) -> Vec<Anomaly> {
        self.entries
    }
}
