//! Cross-checks of the corrected mapping against independently produced
//! tables: printed label sheets and cable-test records.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::anomaly::{AnomalyKind, AnomalyLog, Stage};
use crate::loads::LvrLabel;
use crate::model::{CableLine, Layer, Length, Region, Side};
use crate::naming::ppp_colour;

// ---------------------------------------------------------------------------
// Label check
// ---------------------------------------------------------------------------

/// One printed LVR label line: `<ch> <J12_8/7> <P5> <3..> <blu> <CB> <12.0>`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    pub lvr: u32,
    pub channel: u8,
    pub lvr_pin: String,
    pub ppp: String,
    pub pin: u8,
    pub colour: String,
    pub sbc: String,
    pub length_c: Length,
}

/// A label sheet for one side/layer/region.
#[derive(Debug, Clone)]
pub struct LabelSheet {
    pub side: Side,
    pub layer: Layer,
    pub region: Region,
    pub records: Vec<LabelRecord>,
}

/// One channel of an annotated record, with its part of a spliced label.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRun<'a> {
    pub line: &'a CableLine,
    pub lvr: u32,
    pub channel: u8,
    pub lvr_label: &'a str,
}

/// Split spliced records back into one run per LVR channel.
pub fn unsplice(lines: &[CableLine]) -> Vec<ChannelRun<'_>> {
    lines
        .iter()
        .filter_map(|line| Some((line, line.wiring.as_ref()?)))
        .flat_map(|(line, w)| {
            w.channels.iter().enumerate().map(move |(i, &channel)| ChannelRun {
                line,
                lvr: w.lvr,
                channel,
                lvr_label: w.lvr_labels.get(i).map(String::as_str).unwrap_or(""),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelMismatch {
    pub subject: String,
    pub field: &'static str,
    pub expected: String,
    pub found: String,
}

/// Check a label sheet against the annotated nominal records.
pub fn check_labels(sheet: &LabelSheet, nominal: &[CableLine], log: &mut AnomalyLog) -> Vec<LabelMismatch> {
    let runs = unsplice(nominal);
    let mut index: BTreeMap<(u32, u8), Vec<&ChannelRun<'_>>> = BTreeMap::new();
    for run in runs.iter().filter(|r| {
        r.line.side == sheet.side && r.line.layer == sheet.layer && r.line.region == sheet.region
    }) {
        index.entry((run.lvr, run.channel)).or_default().push(run);
    }

    let mut out = Vec::new();
    for rec in &sheet.records {
        let subject = format!(
            "{}{}{} LVR{} ch{}",
            sheet.side, sheet.layer, sheet.region, rec.lvr, rec.channel
        );
        let run = match index.get(&(rec.lvr, rec.channel)).map(Vec::as_slice) {
            Some([run]) => *run,
            None | Some([]) => {
                log.record(AnomalyKind::MatchNotFound, Stage::Compare, subject, "no annotated record");
                continue;
            }
            Some(many) => {
                log.record(
                    AnomalyKind::MatchAmbiguous,
                    Stage::Compare,
                    subject,
                    format!("{} annotated records", many.len()),
                );
                continue;
            }
        };

        let label = LvrLabel::parse(run.lvr_label);
        let length = run.line.wiring.as_ref().map(|w| &w.length_c);
        let expected_colour = ppp_colour(sheet.region, &rec.ppp).unwrap_or("?");
        let checks: [(&'static str, String, String); 6] = [
            ("ppp", run.line.ppp.clone(), rec.ppp.clone()),
            ("pin", run.line.pin.to_string(), rec.pin.to_string()),
            ("colour", expected_colour.to_string(), rec.colour.clone()),
            (
                "lvr_pin",
                label.as_ref().map(LvrLabel::pin_text).unwrap_or_default(),
                rec.lvr_pin.clone(),
            ),
            ("sbc", label.map(|l| l.sbc).unwrap_or_default(), rec.sbc.clone()),
            (
                "length_c",
                length.map(Length::to_string).unwrap_or_default(),
                rec.length_c.to_string(),
            ),
        ];
        for (field, expected, found) in checks {
            let agrees = match field {
                "length_c" => length == Some(&rec.length_c),
                _ => expected == found,
            };
            if !agrees {
                out.push(LabelMismatch {
                    subject: subject.clone(),
                    field,
                    expected,
                    found,
                });
            }
        }
    }
    log::info!(
        "label check {}{}{}: {} records, {} mismatches",
        sheet.side,
        sheet.layer,
        sheet.region,
        sheet.records.len(),
        out.len()
    );
    out
}

// ---------------------------------------------------------------------------
// Cable test
// ---------------------------------------------------------------------------

/// Cable-test records with no annotated nominal record under full identity.
pub fn check_cable_test<'a>(records: &'a [CableLine], nominal: &[CableLine]) -> Vec<&'a CableLine> {
    let known: HashSet<_> = nominal.iter().map(CableLine::full_key).collect();
    let misses: Vec<&CableLine> = records
        .iter()
        .filter(|r| !known.contains(&r.full_key()))
        .collect();
    for m in &misses {
        log::warn!("cable test: {} {}:{} not in corrected mapping", m.describe(), m.ppp, m.pin);
    }
    misses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, Wiring};

    fn annotated(ppp: &str, channels: &[u8], labels: &[&str]) -> CableLine {
        CableLine {
            side: Side::C,
            layer: Layer::Bot,
            region: Region::Mag,
            backplane: "beta".into(),
            bp_connector: "JP4".into(),
            secondary_connector: "J3".into(),
            flex: "X1M".into(),
            load_group: "P2".into(),
            role: Role::Alone,
            ppp: ppp.into(),
            pin: 3,
            wiring: Some(Wiring {
                lvr: 7,
                channels: channels.to_vec(),
                length_c: Length::parse("12"),
                length_a: Length::parse("2"),
                ppp_label: format!("{ppp} - 3/11 | PT_C_beta_X1M_P2"),
                lvr_labels: labels.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    fn record(channel: u8, lvr_pin: &str, ppp: &str, colour: &str) -> LabelRecord {
        LabelRecord {
            lvr: 7,
            channel,
            lvr_pin: lvr_pin.into(),
            ppp: ppp.into(),
            pin: 3,
            colour: colour.into(),
            sbc: "CB".into(),
            length_c: Length::parse("12.0"),
        }
    }

    fn sheet(records: Vec<LabelRecord>) -> LabelSheet {
        LabelSheet { side: Side::C, layer: Layer::Bot, region: Region::Mag, records }
    }

    #[test]
    fn unsplice_yields_one_run_per_channel() {
        let line = annotated("P5", &[7, 3], &["7 - J13 - 4/3 CB | x", "7 - J12 - 4/3 CB | x"]);
        let runs = unsplice(std::slice::from_ref(&line));
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].channel, 3);
        assert_eq!(runs[1].lvr_label, "7 - J12 - 4/3 CB | x");
    }

    #[test]
    fn agreeing_labels_produce_nothing() {
        let nominal = vec![annotated("P5", &[7, 3], &["7 - J13 - 4/3 CB | x", "7 - J12 - 4/3 CB | x"])];
        let s = sheet(vec![record(7, "J13_4/3", "P5", "blu"), record(3, "J12_4/3", "P5", "blu")]);
        let mut log = AnomalyLog::new();
        assert!(check_labels(&s, &nominal, &mut log).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn wrong_fields_are_listed() {
        let nominal = vec![annotated("P5", &[1], &["7 - J12 - 8/7 CB | x"])];
        let s = sheet(vec![record(1, "J12_6/5", "P20", "blu")]);
        let mut log = AnomalyLog::new();
        let out = check_labels(&s, &nominal, &mut log);
        let fields: Vec<&str> = out.iter().map(|m| m.field).collect();
        // P20 on the magnet side should be red
        assert_eq!(fields, vec!["ppp", "colour", "lvr_pin"]);
        assert_eq!(out[1].expected, "red");
    }

    #[test]
    fn missing_channel_is_an_anomaly() {
        let nominal = vec![annotated("P5", &[1], &["7 - J12 - 8/7 CB | x"])];
        let s = sheet(vec![record(2, "J12_6/5", "P5", "blu")]);
        let mut log = AnomalyLog::new();
        assert!(check_labels(&s, &nominal, &mut log).is_empty());
        assert_eq!(log.count(AnomalyKind::MatchNotFound), 1);
    }

    #[test]
    fn cable_test_requires_full_identity() {
        let nominal = vec![annotated("P5", &[1], &["7 - J12 - 8/7 CB | x"])];
        let mut moved = nominal[0].clone();
        moved.ppp = "P6".into();
        moved.wiring = None;
        let mut same = nominal[0].clone();
        same.wiring = None;
        let tested = vec![same, moved];
        let misses = check_cable_test(&tested, &nominal);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].ppp, "P6");
    }
}
