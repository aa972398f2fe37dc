//! Backward trace of voltage-sense lines from an LVR sense connector through
//! the splitter network to the backplane-side coupler.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::anomaly::{AnomalyKind, AnomalyLog, Stage};
use crate::error::FieldError;
use crate::loads::LoadMap;
use crate::model::SenseLine;
use crate::naming::ChannelPin;
use crate::topology::{SenseConnector, SplitterKind, TwistedPair};

/// Upper bound on splitter hops for one trace. The installed network has at
/// most two tiers; anything deeper is a loop in the layout table.
pub const MAX_HOPS: usize = 8;

// ---------------------------------------------------------------------------
// Layout table
// ---------------------------------------------------------------------------

/// One row of the underground sense layout table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutRow {
    /// `<lvr>_<J10|J16>` for rows that start at an LVR, otherwise empty.
    pub lvr_port: String,
    pub crate_no: String,
    pub slot: String,
    pub label: String,
    pub output: String,
    pub input: String,
    pub sense_label: String,
    pub ppp_true: String,
    pub ppp_mirror: String,
    pub tbb_port: String,
}

/// Layout rows with the three lookups the tracer needs. The first row wins
/// when a key repeats.
#[derive(Debug, Default)]
pub struct SenseLayout {
    rows: Vec<LayoutRow>,
    by_lvr_port: HashMap<String, usize>,
    by_input: HashMap<String, usize>,
    by_label_output: HashMap<(String, String), usize>,
}

impl SenseLayout {
    pub fn new(rows: Vec<LayoutRow>) -> Self {
        let mut by_lvr_port = HashMap::new();
        let mut by_input = HashMap::new();
        let mut by_label_output = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            if !row.lvr_port.is_empty() {
                by_lvr_port.entry(row.lvr_port.clone()).or_insert(i);
            }
            if !row.input.is_empty() {
                by_input.entry(row.input.clone()).or_insert(i);
            }
            by_label_output
                .entry((row.label.clone(), row.output.clone()))
                .or_insert(i);
        }
        Self { rows, by_lvr_port, by_input, by_label_output }
    }

    pub fn rows(&self) -> &[LayoutRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lvr_row(&self, lvr: u32, connector: SenseConnector) -> Option<&LayoutRow> {
        self.by_lvr_port
            .get(&format!("{lvr}_{connector}"))
            .map(|&i| &self.rows[i])
    }

    /// Row feeding splitter `label` at input `port`.
    ///
    /// Single-input boards (types 1 and 4) are fed through their own row with
    /// output `a`; multi-input boards through the row whose input column
    /// reads `<label>_<port>`.
    pub fn upstream(&self, label: &str, kind: SplitterKind, port: Option<u8>) -> Option<&LayoutRow> {
        let index = if kind.has_indexed_inputs() {
            self.by_input.get(&format!("{label}_{}", port?))
        } else {
            self.by_label_output.get(&(label.to_string(), "a".to_string()))
        };
        index.map(|&i| &self.rows[i])
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("no layout row for LVR port {0}")]
    MissingLvrPort(String),
    #[error(transparent)]
    UnknownSplitter(#[from] FieldError),
    #[error("splitter {splitter} (type {kind}) has no route for output '{port}' pair {pair}")]
    RoutingUndefined {
        splitter: String,
        kind: SplitterKind,
        port: String,
        pair: TwistedPair,
    },
    #[error("no layout row feeds splitter {splitter} input {port:?}")]
    MissingUpstream { splitter: String, port: Option<u8> },
    #[error("trace through {splitter} exceeded {} hops", MAX_HOPS)]
    TooDeep { splitter: String },
}

impl TraceError {
    pub fn anomaly_kind(&self) -> AnomalyKind {
        match self {
            Self::MissingLvrPort(_) | Self::MissingUpstream { .. } => AnomalyKind::SchemaLookupMiss,
            Self::UnknownSplitter(_) | Self::RoutingUndefined { .. } | Self::TooDeep { .. } => {
                AnomalyKind::RoutingUndefined
            }
        }
    }
}

/// Trace one LVR sense pair back to its backplane-side row.
///
/// The first hop (at the LVR end) fixes the splitter, egress port and ingress
/// port recorded on the sense line; the ingress pair is the one arriving
/// after the last hop. A hop ends the trace when its upstream row is a plain
/// cable or belongs to the same splitter.
pub fn trace_channel(
    layout: &SenseLayout,
    lvr: u32,
    connector: SenseConnector,
    pair: TwistedPair,
) -> Result<SenseLine, TraceError> {
    let start = layout
        .lvr_row(lvr, connector)
        .ok_or_else(|| TraceError::MissingLvrPort(format!("{lvr}_{connector}")))?;
    let first_kind = SplitterKind::from_label(&start.label)?;

    let mut row = start;
    let mut kind = first_kind;
    let mut current_pair = pair;
    let mut first_ingress_port = None;
    let mut hops = 0;

    while kind != SplitterKind::Direct {
        if hops == MAX_HOPS {
            return Err(TraceError::TooDeep { splitter: start.label.clone() });
        }
        let undefined = || TraceError::RoutingUndefined {
            splitter: row.label.clone(),
            kind,
            port: row.output.clone(),
            pair: current_pair,
        };
        let port = row.output.trim().chars().next().ok_or_else(undefined)?;
        let ingress = kind.route(port, current_pair).ok_or_else(undefined)?;
        let upstream = layout.upstream(&row.label, kind, ingress.port).ok_or_else(|| {
            TraceError::MissingUpstream { splitter: row.label.clone(), port: ingress.port }
        })?;

        if hops == 0 {
            first_ingress_port = ingress.port;
        }
        hops += 1;
        current_pair = ingress.pair;

        let same_board = upstream.label == row.label;
        row = upstream;
        if same_board {
            break;
        }
        kind = SplitterKind::from_label(&row.label)?;
    }

    Ok(SenseLine {
        crate_no: start.crate_no.clone(),
        slot: start.slot.clone(),
        lvr,
        connector,
        pair,
        splitter: start.label.clone(),
        kind: first_kind,
        egress_port: start.output.clone(),
        ingress_port: first_ingress_port,
        ingress_pair: current_pair,
        hops,
        sense_label: row.sense_label.clone(),
        ppp_true: row.ppp_true.clone(),
        ppp_mirror: row.ppp_mirror.clone(),
        tbb_port: row.tbb_port.clone(),
    })
}

// ---------------------------------------------------------------------------
// Channel membership
// ---------------------------------------------------------------------------

/// Which LVR sense pairs carry a primary power channel.
///
/// A pair is active when its channel pin is a key of the power map and not
/// listed as a slave output.
pub struct ActiveChannels<'a> {
    pub power: &'a LoadMap,
    pub slaves: &'a BTreeSet<String>,
}

impl ActiveChannels<'_> {
    pub fn is_active(&self, lvr: u32, connector: SenseConnector, pair: TwistedPair) -> bool {
        let key = ChannelPin::for_sense(lvr, connector, pair).key();
        self.power.contains(&key) && !self.slaves.contains(&key)
    }
}

/// Trace every active sense pair of LVRs `1..=lvr_count`.
///
/// A failed trace is recorded and skipped; the remaining pairs still trace.
pub fn trace_all(
    layout: &SenseLayout,
    active: &ActiveChannels<'_>,
    lvr_count: u32,
    log: &mut AnomalyLog,
) -> Vec<SenseLine> {
    let mut lines = Vec::new();
    let mut skipped = 0;
    for lvr in 1..=lvr_count {
        for connector in SenseConnector::ALL {
            for pair in TwistedPair::ALL {
                if !active.is_active(lvr, connector, pair) {
                    skipped += 1;
                    continue;
                }
                match trace_channel(layout, lvr, connector, pair) {
                    Ok(line) => lines.push(line),
                    Err(e) => log.record(
                        e.anomaly_kind(),
                        Stage::Trace,
                        format!("{lvr}_{connector} {pair}"),
                        e.to_string(),
                    ),
                }
            }
        }
    }
    log::info!("traced {} sense lines ({skipped} inactive pairs)", lines.len());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lvr_port: &str, label: &str, output: &str, input: &str, sense: &str) -> LayoutRow {
        LayoutRow {
            lvr_port: lvr_port.into(),
            crate_no: "1".into(),
            slot: "4".into(),
            label: label.into(),
            output: output.into(),
            input: input.into(),
            sense_label: sense.into(),
            ppp_true: format!("T{sense}"),
            ppp_mirror: format!("M{sense}"),
            tbb_port: "J3".into(),
        }
    }

    fn layout() -> SenseLayout {
        SenseLayout::new(vec![
            row("5_J10", "C5", "a", "", "alpha_X0M_P1"),
            row("6_J10", "S2a", "a", "", ""),
            row("", "C9", "a", "S2a_2", "beta_X1S_P2"),
            row("7_J16", "S1b", "b", "", ""),
            row("", "S1b", "a", "", "gamma_S0S_P3"),
            row("8_J10", "S3c", "a", "", ""),
        ])
    }

    #[test]
    fn direct_cable_keeps_pair() {
        let line = trace_channel(&layout(), 5, SenseConnector::J10, TwistedPair::P45).unwrap();
        assert_eq!(line.kind, SplitterKind::Direct);
        assert_eq!(line.ingress_pair, TwistedPair::P45);
        assert_eq!(line.hops, 0);
        assert_eq!(line.backplane(), "alpha");
        assert_eq!(line.input_label(), "-");
    }

    #[test]
    fn type2_follows_indexed_input() {
        let line = trace_channel(&layout(), 6, SenseConnector::J10, TwistedPair::P36).unwrap();
        assert_eq!(line.ingress_port, Some(2));
        assert_eq!(line.ingress_pair, TwistedPair::P36);
        assert_eq!(line.sense_label, "beta_X1S_P2");
        assert_eq!(line.input_label(), "S2a_2");
        assert_eq!(line.output_label(), "Type 2 - OUT a");
        assert_eq!(line.telemetry_key(), "J3_3-6");
    }

    #[test]
    fn type1_uses_own_a_row() {
        let line = trace_channel(&layout(), 7, SenseConnector::J16, TwistedPair::P12).unwrap();
        assert_eq!(line.ingress_pair, TwistedPair::P45);
        assert_eq!(line.ppp_true, "Tgamma_S0S_P3");
        assert_eq!(line.hops, 1);
    }

    #[test]
    fn undefined_route_is_an_error() {
        let err = trace_channel(&layout(), 6, SenseConnector::J10, TwistedPair::P12)
            .map(|_| ())
            .unwrap_err();
        // type 2 port a pair 1-2 enters input 1, which no row feeds
        assert_eq!(err.anomaly_kind(), AnomalyKind::SchemaLookupMiss);

        let err = trace_channel(&layout(), 7, SenseConnector::J16, TwistedPair::P45).unwrap_err();
        assert!(matches!(err, TraceError::RoutingUndefined { .. }));
    }

    fn looped_layout() -> SenseLayout {
        SenseLayout::new(vec![
            row("5_J10", "C5", "a", "", "alpha_X0M_P1"),
            row("9_J10", "S2a", "a", "", ""),
            row("", "S2b", "a", "S2a_1", ""),
            row("", "S2a", "a", "S2b_1", ""),
        ])
    }

    #[test]
    fn splitter_loop_stops_at_hop_limit() {
        let err = trace_channel(&looped_layout(), 9, SenseConnector::J10, TwistedPair::P12)
            .unwrap_err();
        assert_eq!(err, TraceError::TooDeep { splitter: "S2a".into() });
        assert_eq!(err.anomaly_kind(), AnomalyKind::RoutingUndefined);
    }

    #[test]
    fn trace_all_records_loop_and_continues() {
        let mut power = LoadMap::default();
        for lvr in [5, 9] {
            let key = ChannelPin::for_sense(lvr, SenseConnector::J10, TwistedPair::P12).key();
            power.insert(key, "PT_C_alpha_X0M_P1");
        }
        let slaves = BTreeSet::new();
        let active = ActiveChannels { power: &power, slaves: &slaves };
        let mut log = AnomalyLog::new();

        let lines = trace_all(&looped_layout(), &active, 9, &mut log);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].lvr, 5);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].kind, AnomalyKind::RoutingUndefined);
        assert_eq!(log.entries()[0].subject, "9_J10 1-2");
    }

    #[test]
    fn trace_all_skips_inactive_and_slaves() {
        let mut power = LoadMap::default();
        power.insert("5_J12_8", "PT_C_alpha_X0M_P1");
        power.insert("5_J12_6", "PT_C_alpha_X0M_P1");
        power.insert("8_J12_8", "PT_C_delta_X0M_P1");
        let slaves: BTreeSet<String> = ["5_J12_6".to_string()].into();
        let active = ActiveChannels { power: &power, slaves: &slaves };
        let mut log = AnomalyLog::new();

        let lines = trace_all(&layout(), &active, 8, &mut log);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].lvr, 5);
        assert_eq!(lines[0].pair, TwistedPair::P12);
        // LVR 8 starts on an S3c board whose input 1 has no row
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].stage, Stage::Trace);
    }
}
