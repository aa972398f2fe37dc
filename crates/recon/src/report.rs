//! Ordered, grouped report tables built from matcher, swap, check and trace
//! output. Writers only serialize what is assembled here.

use std::collections::HashMap;

use serde::Serialize;

use crate::anomaly::Anomaly;
use crate::compare::LabelMismatch;
use crate::loads::{LoadMismatch, SenseFinding};
use crate::matcher::{MatchStatus, Reconciliation};
use crate::model::CableLine;
use crate::naming::pin_pair;
use crate::swap::{SlotMatch, SwappedLine};

/// Cell text for a nominal counterpart that does not exist.
pub const NOT_FOUND: &str = "na";
/// Cell text for an unresolved ambiguous counterpart.
pub const UNRESOLVED: &str = "??";

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportRow {
    Data(Vec<String>),
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn new(name: impl Into<String>, header: &[&str]) -> Self {
        Self {
            name: name.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_data(name: impl Into<String>, header: &[&str], rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new(name, header);
        table.rows = rows.into_iter().map(ReportRow::Data).collect();
        table
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().filter_map(|r| match r {
            ReportRow::Data(cells) => Some(cells.as_slice()),
            ReportRow::Separator => None,
        })
    }

    /// Number of data rows, separators excluded.
    pub fn data_len(&self) -> usize {
        self.data_rows().count()
    }
}

// ---------------------------------------------------------------------------
// Ordering and grouping
// ---------------------------------------------------------------------------

/// Columns driving the pin / position / discriminator sort.
#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub position: usize,
    pub pins: usize,
    pub discriminator: usize,
    /// Compare discriminator initials case-insensitively.
    pub fold_case: bool,
}

fn leading_number(cell: &str) -> Option<u32> {
    let digits: String = cell.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Numeric position of a `P<n>` cell; cells without one sort last.
fn position_rank(cell: &str) -> (bool, u32) {
    match crate::naming::position_number(cell.trim()) {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

fn pin_rank(cell: &str) -> (bool, u32) {
    match leading_number(cell) {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

fn initial(cell: &str, fold_case: bool) -> Option<char> {
    let c = cell.chars().next()?;
    Some(if fold_case { c.to_ascii_lowercase() } else { c })
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// Orders rows by discriminator initial, then numeric position, then pin.
///
/// Done as three stable passes in reverse key order, so the last pass
/// (discriminator) is the primary key.
pub fn order_rows(rows: &mut [Vec<String>], spec: SortSpec) {
    rows.sort_by_key(|r| pin_rank(cell(r, spec.pins)));
    rows.sort_by_key(|r| position_rank(cell(r, spec.position)));
    rows.sort_by_key(|r| initial(cell(r, spec.discriminator), spec.fold_case));
}

/// Indices where the value in `col` differs from the previous row. The first
/// row always starts a group.
pub fn group_boundaries(rows: &[Vec<String>], col: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut prev: Option<&str> = None;
    for (i, row) in rows.iter().enumerate() {
        let value = cell(row, col);
        if prev != Some(value) {
            out.push(i);
        }
        prev = Some(value);
    }
    out
}

/// One separator before each group of equal `col` values.
pub fn with_separators(rows: Vec<Vec<String>>, col: usize) -> Vec<ReportRow> {
    let boundaries = group_boundaries(&rows, col);
    let mut next = boundaries.iter().peekable();
    let mut out = Vec::with_capacity(rows.len() + boundaries.len());
    for (i, row) in rows.into_iter().enumerate() {
        if next.peek() == Some(&&i) {
            out.push(ReportRow::Separator);
            next.next();
        }
        out.push(ReportRow::Data(row));
    }
    out
}

/// Per row, how many non-splice rows share its position.
pub fn population_column(rows: &[Vec<String>], pos_col: usize, len_col: usize) -> Vec<usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        if cell(row, len_col) != "splice" {
            *counts.entry(cell(row, pos_col)).or_insert(0) += 1;
        }
    }
    rows.iter()
        .map(|row| counts.get(cell(row, pos_col)).copied().unwrap_or(0))
        .collect()
}

fn sort_and_group(mut rows: Vec<Vec<String>>, spec: SortSpec) -> Vec<ReportRow> {
    order_rows(&mut rows, spec);
    with_separators(rows, spec.position)
}

// ---------------------------------------------------------------------------
// Shared cells
// ---------------------------------------------------------------------------

/// Orientation, region and the identity fields after side/layer.
fn identity_cells(line: &CableLine) -> Vec<String> {
    vec![
        line.orientation().to_string(),
        line.region.to_string(),
        line.backplane.clone(),
        line.bp_connector.clone(),
        line.secondary_connector.clone(),
        line.flex.clone(),
        line.load_group.clone(),
        line.role.to_string(),
    ]
}

/// LVR, channel, C length and A length; `-1` when unwired.
fn wiring_cells(line: &CableLine) -> [String; 4] {
    match &line.wiring {
        Some(w) => [
            w.lvr.to_string(),
            w.channel_text(),
            w.length_c.to_string(),
            w.length_a.to_string(),
        ],
        None => std::array::from_fn(|_| "-1".to_string()),
    }
}

fn label_cells(line: &CableLine) -> [String; 2] {
    match &line.wiring {
        Some(w) => [w.ppp_label.clone(), w.lvr_label_text()],
        None => ["NA".to_string(), "NA".to_string()],
    }
}

fn placeholder(status: &MatchStatus) -> &'static str {
    match status {
        MatchStatus::Ambiguous { .. } => UNRESOLVED,
        _ => NOT_FOUND,
    }
}

// ---------------------------------------------------------------------------
// PPP fixes
// ---------------------------------------------------------------------------

pub const PPP_FIX_HEADER: [&str; 18] = [
    "True/Mir",
    "Mag/IP",
    "BP",
    "BP Con.",
    "iBB/P2B2 Con.",
    "SBC Flex Name",
    "4-asic group / DCB power",
    "M/S/A",
    "Cav. Map. PPP Pos.",
    "Cav. Map. PPP Pins",
    "Surf. Map. PPP Pos.",
    "Surf. Map. PPP Pins",
    "LVR",
    "LVR Ch.",
    "C Len (m)",
    "A Len (m)",
    "Cav. Map. PPP Pop.",
    "Surf. Map. PPP Pop.",
];

const FIX_CAV_POS: usize = 8;
const FIX_SURF_POS: usize = 10;
const FIX_SURF_PINS: usize = 11;
const FIX_C_LEN: usize = 14;
const FIX_FLEX: usize = 5;

/// Every cavern record beside the nominal position it should occupy.
///
/// `cavern` must be the slice the reconciliation was computed over, or a
/// per-record transform of it (the flipped hypothesis).
pub fn ppp_fix_report(name: &str, cavern: &[CableLine], recon: &Reconciliation) -> ReportTable {
    let mut rows: Vec<Vec<String>> = recon
        .matches
        .iter()
        .filter_map(|m| {
            let cav = cavern.get(m.cavern)?;
            let mut row = identity_cells(cav);
            row.push(cav.ppp.clone());
            row.push(pin_pair(cav.pin));
            match recon.counterpart(m) {
                Some(nom) => {
                    row.push(nom.ppp.clone());
                    row.push(pin_pair(nom.pin));
                }
                None => {
                    let text = placeholder(&m.status);
                    row.push(text.to_string());
                    row.push(text.to_string());
                }
            }
            row.extend(wiring_cells(cav));
            Some(row)
        })
        .collect();

    let cav_pop = population_column(&rows, FIX_CAV_POS, FIX_C_LEN);
    let surf_pop = population_column(&rows, FIX_SURF_POS, FIX_C_LEN);
    for ((row, c), s) in rows.iter_mut().zip(cav_pop).zip(surf_pop) {
        row.push(c.to_string());
        row.push(s.to_string());
    }

    let mut table = ReportTable::new(name, &PPP_FIX_HEADER);
    table.rows = sort_and_group(
        rows,
        SortSpec {
            position: FIX_SURF_POS,
            pins: FIX_SURF_PINS,
            discriminator: FIX_FLEX,
            fold_case: false,
        },
    );
    table
}

// ---------------------------------------------------------------------------
// Label moves
// ---------------------------------------------------------------------------

pub const MOVE_LABELS_HEADER: [&str; 20] = [
    "True/Mir",
    "Mag/IP",
    "BP",
    "BP Con.",
    "iBB/P2B2 Con.",
    "SBC Flex Name",
    "4-asic group / DCB power",
    "M/S/A",
    "PPP Pos. (Correct)",
    "PPP Pins (Correct)",
    "LVR",
    "LVR Ch.",
    "Actual C L (m)",
    "Actual A L (m)",
    "C Len (m)",
    "A Len (m)",
    "Cav. Map. PPP Label (After Moving Pos.)",
    "Replace w/ PPP Label",
    "Cav. Map. LVR Label (After Moving Pos.)",
    "Replace w/ LVR Label",
];

/// Where each label has to go once the planned connector moves are done.
///
/// Rows pair the record now sitting in a slot (with its pre-move labels and
/// installed lengths) with the nominal record that slot serves.
pub fn move_labels_report(swapped: &[SwappedLine], matches: &[SlotMatch], nominal: &[CableLine]) -> ReportTable {
    let rows: Vec<Vec<String>> = matches
        .iter()
        .filter_map(|m| {
            let cl = &swapped.get(m.swapped)?.line;
            let nl = m.nominal.and_then(|i| nominal.get(i));
            let [_, _, cl_c, cl_a] = wiring_cells(cl);
            let [cl_ppp_label, cl_lvr_label] = label_cells(cl);

            let row = match nl {
                Some(nl) => {
                    let mut row = identity_cells(nl);
                    let [lvr, ch, c, a] = wiring_cells(nl);
                    let [ppp_label, lvr_label] = label_cells(nl);
                    row.extend([nl.ppp.clone(), pin_pair(nl.pin), lvr, ch]);
                    row.extend([cl_c, cl_a, c, a]);
                    row.extend([cl_ppp_label, ppp_label, cl_lvr_label, lvr_label]);
                    row
                }
                None => {
                    let text = placeholder(&m.status).to_string();
                    let mut row = vec![text.clone(); 12];
                    row.extend([cl_c, cl_a, text.clone(), text.clone()]);
                    row.extend([cl_ppp_label, text.clone(), cl_lvr_label, text]);
                    row
                }
            };
            Some(row)
        })
        .collect();

    let mut table = ReportTable::new("move_labels", &MOVE_LABELS_HEADER);
    table.rows = sort_and_group(
        rows,
        SortSpec { position: 8, pins: 9, discriminator: 5, fold_case: false },
    );
    table
}

// ---------------------------------------------------------------------------
// Coverage, anomalies and check findings
// ---------------------------------------------------------------------------

pub const LINE_HEADER: [&str; 11] = [
    "Side",
    "Top/Bot",
    "Mag/IP",
    "BP",
    "BP Con.",
    "iBB/P2B2 Con.",
    "SBC Flex Name",
    "4-asic group / DCB power",
    "M/S/A",
    "Surf. Map. PPP Pos.",
    "Surf. Map. PPP Pins",
];

fn line_cells(line: &CableLine) -> Vec<String> {
    vec![
        line.side.to_string(),
        line.layer.to_string(),
        line.region.to_string(),
        line.backplane.clone(),
        line.bp_connector.clone(),
        line.secondary_connector.clone(),
        line.flex.clone(),
        line.load_group.clone(),
        line.role.to_string(),
        line.ppp.clone(),
        pin_pair(line.pin),
    ]
}

/// Nominal records missing from the cavern mapping.
pub fn coverage_report(nominal: &[CableLine], gaps: &[usize]) -> ReportTable {
    let rows = gaps
        .iter()
        .filter_map(|&i| nominal.get(i))
        .map(line_cells)
        .collect();
    ReportTable::with_data("coverage_gaps", &LINE_HEADER, rows)
}

pub fn cable_test_report(misses: &[&CableLine]) -> ReportTable {
    let rows = misses.iter().map(|l| line_cells(l)).collect();
    ReportTable::with_data("cable_test_mismatches", &LINE_HEADER, rows)
}

pub fn anomalies_report(anomalies: &[Anomaly]) -> ReportTable {
    let rows = anomalies
        .iter()
        .map(|a| {
            vec![
                a.kind.to_string(),
                a.stage.to_string(),
                a.subject.clone(),
                a.detail.clone(),
                a.tolerated.to_string(),
            ]
        })
        .collect();
    ReportTable::with_data(
        "anomalies",
        &["Kind", "Stage", "Subject", "Detail", "Tolerated"],
        rows,
    )
}

pub fn load_mismatch_report(findings: &[LoadMismatch]) -> ReportTable {
    let rows = findings
        .iter()
        .map(|f| {
            vec![
                f.region.to_string(),
                f.orientation.to_string(),
                f.backplane.clone(),
                f.role.to_string(),
                f.channel.clone(),
                f.cavern_load.clone(),
                f.schematic_load.clone(),
            ]
        })
        .collect();
    ReportTable::with_data(
        "lvr_load_mapping_errors",
        &[
            "Mag/IP",
            "True/Mir",
            "BP",
            "M/S/A",
            "LVR + Src Pin",
            "Cav. Map. Load",
            "LV Schem. Load",
        ],
        rows,
    )
}

pub fn sense_report(findings: &[SenseFinding]) -> ReportTable {
    let rows = findings
        .iter()
        .map(|f| {
            vec![
                f.channel.clone(),
                f.power_load.clone(),
                f.sense_load.clone(),
                f.status.to_string(),
            ]
        })
        .collect();
    ReportTable::with_data(
        "sense_power_mismatches",
        &["LVR + Src Pin", "Power Load", "Sense Load", "Status"],
        rows,
    )
}

pub fn label_check_report(findings: &[LabelMismatch]) -> ReportTable {
    let rows = findings
        .iter()
        .map(|f| {
            vec![
                f.subject.clone(),
                f.field.to_string(),
                f.expected.clone(),
                f.found.clone(),
            ]
        })
        .collect();
    ReportTable::with_data(
        "label_check_mismatches",
        &["Record", "Field", "Expected", "Found"],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyLog;
    use crate::matcher::reconcile;
    use crate::model::{Layer, Length, Region, Role, Side, Wiring};

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn nominal(flex: &str, ppp: &str, pin: u8) -> CableLine {
        CableLine {
            side: Side::C,
            layer: Layer::Top,
            region: Region::Mag,
            backplane: "alpha".into(),
            bp_connector: "JP0".into(),
            secondary_connector: "J1".into(),
            flex: flex.into(),
            load_group: "grp1".into(),
            role: Role::Alone,
            ppp: ppp.into(),
            pin,
            wiring: None,
        }
    }

    fn cavern(flex: &str, ppp: &str, pin: u8, length: &str) -> CableLine {
        let mut l = nominal(flex, ppp, pin);
        l.wiring = Some(Wiring {
            lvr: 3,
            channels: vec![1],
            length_c: Length::parse(length),
            length_a: Length::parse("1"),
            ppp_label: format!("{ppp} - {pin}/{} | PT_alpha_{flex}", pin + 8),
            lvr_labels: vec![format!("3 - J12 - 8/7 CB | PT_alpha_{flex}")],
        });
        l
    }

    #[test]
    fn sort_is_discriminator_then_position_then_pin() {
        let mut rows = vec![
            strings(&["P10", "2,10", "X0M"]),
            strings(&["P2", "3,11", "X0M"]),
            strings(&["P2", "1,9", "S0S"]),
            strings(&["P2", "1,9", "X0S"]),
            strings(&["na", "na", "X1M"]),
        ];
        order_rows(&mut rows, SortSpec { position: 0, pins: 1, discriminator: 2, fold_case: false });
        let order: Vec<String> = rows.iter().map(|r| r.join(" ")).collect();
        assert_eq!(
            order,
            vec!["P2 1,9 S0S", "P2 1,9 X0S", "P2 3,11 X0M", "P10 2,10 X0M", "na na X1M"]
        );
    }

    #[test]
    fn separators_precede_every_group() {
        let rows = vec![
            strings(&["P1", "a"]),
            strings(&["P1", "b"]),
            strings(&["P4", "c"]),
        ];
        assert_eq!(group_boundaries(&rows, 0), vec![0, 2]);
        let out = with_separators(rows, 0);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], ReportRow::Separator);
        assert_eq!(out[3], ReportRow::Separator);
        assert!(with_separators(Vec::new(), 0).is_empty());
    }

    #[test]
    fn population_skips_splices() {
        let rows = vec![
            strings(&["P1", "12.0"]),
            strings(&["P1", "splice"]),
            strings(&["P1", "3.0"]),
            strings(&["P2", "3.0"]),
        ];
        assert_eq!(population_column(&rows, 0, 1), vec![2, 2, 2, 1]);
    }

    #[test]
    fn ppp_fix_shows_cavern_and_surface_slots() {
        let nom = vec![nominal("X0M", "P1", 1)];
        let cav = vec![cavern("X0M", "P5", 3, "8")];
        let mut log = AnomalyLog::new();
        let recon = reconcile(&nom, &cav, &mut log);

        let table = ppp_fix_report("ppp_fixes", &cav, &recon);
        assert_eq!(table.width(), 18);
        assert_eq!(table.rows[0], ReportRow::Separator);
        let row = table.data_rows().next().unwrap();
        assert_eq!(row[0], "True");
        assert_eq!(&row[8..12], &["P5", "3,11", "P1", "1,9"]);
        assert_eq!(&row[12..16], &["3", "1", "8.0", "1.0"]);
        assert_eq!(&row[16..], &["1", "1"]);
    }

    #[test]
    fn ppp_fix_marks_orphans() {
        let nom = vec![nominal("X0M", "P1", 1)];
        let cav = vec![cavern("S0S", "P5", 3, "8")];
        let mut log = AnomalyLog::new();
        let recon = reconcile(&nom, &cav, &mut log);

        let table = ppp_fix_report("ppp_fixes", &cav, &recon);
        let row = table.data_rows().next().unwrap();
        assert_eq!(&row[10..12], &[NOT_FOUND, NOT_FOUND]);
    }

    #[test]
    fn anomaly_rows_carry_every_field() {
        let mut log = AnomalyLog::new();
        log.record(
            crate::anomaly::AnomalyKind::RoutingUndefined,
            crate::anomaly::Stage::Trace,
            "6_J10 1-2",
            "no route",
        );
        let table = anomalies_report(log.entries());
        assert_eq!(
            table.data_rows().next().unwrap(),
            &strings(&["routing_undefined", "trace", "6_J10 1-2", "no route", "false"])[..]
        );
    }
}
