//! LVR channel → load maps and the two checks built on them: cavern LVR
//! labels against the power schematics, and traced sense lines against the
//! power channel they should be sensing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::anomaly::{AnomalyKind, AnomalyLog, Stage};
use crate::model::{CableLine, Layer, Orientation, Region, Role, SenseLine};
use crate::naming::{schematic_load_to_sense, ChannelPin};

/// Placeholder load for a channel pin the power schematics do not list.
pub const DEPOPULATED: &str = "Depopulated in LV Schem.!";

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// Key → load name.
///
/// Power maps are keyed by channel pin (`12_J12_8`); telemetry maps by
/// `<tBB port>_<twisted pair>` (`J3_1-2`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LoadMap {
    entries: BTreeMap<String, String>,
}

pub type TelemetryMap = LoadMap;

impl LoadMap {
    pub fn insert(&mut self, key: impl Into<String>, load: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), load.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` in; its entries replace existing ones.
    pub fn merge(&mut self, other: &LoadMap) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for LoadMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

// ---------------------------------------------------------------------------
// LVR labels
// ---------------------------------------------------------------------------

/// A printed LVR label, `"12 - J12 - 8/7 CB | PT_C_alpha_X0M_P1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvrLabel {
    pub lvr: u32,
    pub connector: String,
    pub source: u8,
    pub ret: u8,
    pub sbc: String,
    pub load: String,
}

impl LvrLabel {
    pub fn parse(raw: &str) -> Option<Self> {
        let (head, load) = raw.split_once(" | ").unwrap_or((raw, ""));
        let mut parts = head.splitn(3, " - ");
        let lvr = parts.next()?.trim().parse().ok()?;
        let connector = parts.next()?.trim().to_string();
        let mut tail = parts.next()?.split_whitespace();
        let (source, ret) = tail.next()?.split_once('/')?;
        Some(Self {
            lvr,
            connector,
            source: source.parse().ok()?,
            ret: ret.parse().ok()?,
            sbc: tail.next().unwrap_or("").to_string(),
            load: load.trim().to_string(),
        })
    }

    /// Channel pin key, `<lvr>_<Jcc>_<src>`.
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.lvr, self.connector, self.source)
    }

    /// Pin notation used by the label-check printouts, `J12_8/7`.
    pub fn pin_text(&self) -> String {
        format!("{}_{}/{}", self.connector, self.source, self.ret)
    }
}

/// Channel-pin map derived from annotated records, for runs without power
/// schematics. Each channel of each wired record maps to its label's load.
pub fn derive_power_map(lines: &[CableLine]) -> LoadMap {
    let mut map = LoadMap::default();
    for line in lines {
        let Some(w) = &line.wiring else { continue };
        for (i, &ch) in w.channels.iter().enumerate() {
            let Some(pin) = ChannelPin::new(w.lvr, ch) else { continue };
            let load = w
                .lvr_labels
                .get(i)
                .and_then(|l| l.split_once(" | "))
                .map(|(_, load)| load.trim())
                .unwrap_or_default();
            map.insert(pin.key(), load);
        }
    }
    log::debug!("derived power map with {} channel pins", map.len());
    map
}

// ---------------------------------------------------------------------------
// LVR-load line check
// ---------------------------------------------------------------------------

/// A cavern LVR label naming a different load than the power schematic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadMismatch {
    pub region: Region,
    pub orientation: Orientation,
    pub layer: Layer,
    pub backplane: String,
    pub role: Role,
    pub channel: String,
    pub cavern_load: String,
    pub schematic_load: String,
}

/// Check every LVR label of every cavern record against the power map.
pub fn check_line_loads(cavern: &[CableLine], power: &LoadMap, log: &mut AnomalyLog) -> Vec<LoadMismatch> {
    let mut out = Vec::new();
    for line in cavern {
        let Some(w) = &line.wiring else { continue };
        for raw in &w.lvr_labels {
            let Some(label) = LvrLabel::parse(raw) else {
                log.record(
                    AnomalyKind::SchemaLookupMiss,
                    Stage::LineCheck,
                    line.describe(),
                    format!("unreadable LVR label '{raw}'"),
                );
                continue;
            };
            let key = label.key();
            let schematic = match power.get(&key) {
                Some(load) => load,
                None => {
                    log.record(
                        AnomalyKind::SchemaLookupMiss,
                        Stage::LineCheck,
                        key.clone(),
                        "channel pin not in power schematics",
                    );
                    DEPOPULATED
                }
            };
            if schematic != label.load {
                out.push(LoadMismatch {
                    region: line.region,
                    orientation: line.orientation(),
                    layer: line.layer,
                    backplane: line.backplane.clone(),
                    role: line.role,
                    channel: key,
                    cavern_load: label.load.clone(),
                    schematic_load: schematic.to_string(),
                });
            }
        }
    }
    log::info!("line check: {} LVR-load mismatches", out.len());
    out
}

// ---------------------------------------------------------------------------
// Sense vs power
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenseStatus {
    Mismatch,
    MissingTelemetry,
    MissingPower,
}

impl std::fmt::Display for SenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch => write!(f, "mismatch"),
            Self::MissingTelemetry => write!(f, "missing_telemetry"),
            Self::MissingPower => write!(f, "missing_power"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenseFinding {
    pub channel: String,
    pub power_load: String,
    pub sense_load: String,
    pub status: SenseStatus,
}

/// Compare what each sense line's tBB port senses with what its LVR channel
/// powers. Only disagreements and lookup misses are returned.
pub fn check_sense_loads(
    lines: &[SenseLine],
    power: &LoadMap,
    telemetry: &TelemetryMap,
    log: &mut AnomalyLog,
) -> Vec<SenseFinding> {
    let mut out = Vec::new();
    for sl in lines {
        let channel = sl.channel_pin().key();
        let tbb_key = sl.telemetry_key();

        let Some(sensed) = telemetry.get(&tbb_key) else {
            log.record(
                AnomalyKind::SchemaLookupMiss,
                Stage::SenseCheck,
                tbb_key.clone(),
                "tBB port not in telemetry netlist",
            );
            out.push(SenseFinding {
                channel,
                power_load: "n/a".into(),
                sense_load: tbb_key,
                status: SenseStatus::MissingTelemetry,
            });
            continue;
        };
        let sense_load = format!("{}_{sensed}", sl.backplane());

        let Some(powered) = power.get(&channel) else {
            log.record(
                AnomalyKind::SchemaLookupMiss,
                Stage::SenseCheck,
                channel.clone(),
                "channel pin not in power map",
            );
            out.push(SenseFinding {
                channel,
                power_load: "n/a".into(),
                sense_load,
                status: SenseStatus::MissingPower,
            });
            continue;
        };
        let power_load = schematic_load_to_sense(powered).unwrap_or_else(|| powered.to_string());

        if power_load != sense_load {
            log::warn!("{channel}: power {power_load} != sense {sense_load}");
            out.push(SenseFinding {
                channel,
                power_load,
                sense_load,
                status: SenseStatus::Mismatch,
            });
        }
    }
    log::info!("sense check: {} of {} sense lines disagree", out.len(), lines.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Length, Side, Wiring};
    use crate::topology::{SenseConnector, SplitterKind, TwistedPair};

    fn cavern(labels: &[&str], channels: &[u8]) -> CableLine {
        CableLine {
            side: Side::C,
            layer: Layer::Top,
            region: Region::Mag,
            backplane: "alpha".into(),
            bp_connector: "JP0".into(),
            secondary_connector: "J1".into(),
            flex: "X0M".into(),
            load_group: "P1".into(),
            role: Role::Master,
            ppp: "P1".into(),
            pin: 1,
            wiring: Some(Wiring {
                lvr: 12,
                channels: channels.to_vec(),
                length_c: Length::parse("4"),
                length_a: Length::parse("1"),
                ppp_label: "P1 - 1/9 | PT_C_alpha_X0M_P1".into(),
                lvr_labels: labels.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    fn sense(lvr: u32, tbb: &str, label: &str) -> SenseLine {
        SenseLine {
            crate_no: "1".into(),
            slot: "2".into(),
            lvr,
            connector: SenseConnector::J10,
            pair: TwistedPair::P12,
            splitter: "C1".into(),
            kind: SplitterKind::Direct,
            egress_port: "a".into(),
            ingress_port: None,
            ingress_pair: TwistedPair::P12,
            hops: 0,
            sense_label: label.into(),
            ppp_true: "P1".into(),
            ppp_mirror: "P2".into(),
            tbb_port: tbb.into(),
        }
    }

    #[test]
    fn lvr_label_parses() {
        let l = LvrLabel::parse("12 - J12 - 8/7 CB | PT_C_alpha_X0M_P1").unwrap();
        assert_eq!(l.key(), "12_J12_8");
        assert_eq!(l.pin_text(), "J12_8/7");
        assert_eq!(l.sbc, "CB");
        assert_eq!(l.load, "PT_C_alpha_X0M_P1");
        assert!(LvrLabel::parse("no label").is_none());
    }

    #[test]
    fn line_check_flags_wrong_and_missing_loads() {
        let mut power = LoadMap::default();
        power.insert("12_J12_8", "PT_C_alpha_X0M_P1");
        power.insert("12_J13_8", "PT_C_alpha_X0M_P2");
        let line = cavern(
            &[
                "12 - J12 - 8/7 CB | PT_C_alpha_X0M_P1",
                "12 - J13 - 8/7 CB | PT_C_alpha_X0M_P1",
                "12 - J12 - 6/5 CB | PT_C_alpha_X0M_P1",
            ],
            &[1, 5, 2],
        );
        let mut log = AnomalyLog::new();
        let out = check_line_loads(&[line], &power, &mut log);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].channel, "12_J13_8");
        assert_eq!(out[0].schematic_load, "PT_C_alpha_X0M_P2");
        assert_eq!(out[1].schematic_load, DEPOPULATED);
        assert_eq!(out[1].orientation, Orientation::True);
        assert_eq!(log.count(AnomalyKind::SchemaLookupMiss), 1);
    }

    #[test]
    fn derived_map_covers_every_spliced_channel() {
        let line = cavern(
            &["12 - J13 - 4/3 CB | PT_C_alpha_X0M_P1", "12 - J12 - 4/3 CB | PT_C_alpha_X0M_P1"],
            &[7, 3],
        );
        let map = derive_power_map(&[line]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("12_J13_4"), Some("PT_C_alpha_X0M_P1"));
        assert!(map.contains("12_J12_4"));
    }

    #[test]
    fn sense_check_reports_mismatch_and_misses() {
        let mut power = LoadMap::default();
        power.insert("5_J12_8", "PT_C_alpha_X0M_P1W");
        power.insert("6_J12_8", "PT_C_alpha_X0M_P1W");
        let mut tbb = TelemetryMap::default();
        tbb.insert("J3_1-2", "X0M_P1W");
        tbb.insert("J4_1-2", "X0S_P1W");

        let lines = vec![
            sense(5, "J3", "alpha_7"),
            sense(6, "J4", "alpha_8"),
            sense(7, "J3", "alpha_9"),
            sense(5, "J9", "alpha_7"),
        ];
        let mut log = AnomalyLog::new();
        let out = check_sense_loads(&lines, &power, &tbb, &mut log);

        let statuses: Vec<SenseStatus> = out.iter().map(|f| f.status).collect();
        assert_eq!(
            statuses,
            vec![SenseStatus::Mismatch, SenseStatus::MissingPower, SenseStatus::MissingTelemetry]
        );
        assert_eq!(out[0].power_load, "alpha_X0M_P1W");
        assert_eq!(out[0].sense_load, "alpha_X0S_P1W");
        assert_eq!(log.count(AnomalyKind::SchemaLookupMiss), 2);
    }
}
