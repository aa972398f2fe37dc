use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::FieldError;
use crate::naming;
use crate::topology::{SenseConnector, SplitterKind, TwistedPair};

// ---------------------------------------------------------------------------
// Physical location vocabulary
// ---------------------------------------------------------------------------

/// Detector side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    C,
    A,
}

/// Top or bottom half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Top,
    Bot,
}

/// Magnet side or interaction-point side of the load being powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Mag,
    Ip,
}

/// Master/slave/alone role of a load on a shared run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "M")]
    Master,
    #[serde(rename = "S")]
    Slave,
    #[serde(rename = "A")]
    Alone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    True,
    Mirror,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::C, Side::A];
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Top, Layer::Bot];
}

impl Region {
    /// Interaction point first, matching the cable-test table order.
    pub const ALL: [Region; 2] = [Region::Ip, Region::Mag];
}

impl Role {
    /// Master and slave records may legitimately share one identity.
    pub fn is_dual_channel(&self) -> bool {
        matches!(self, Role::Master | Role::Slave)
    }
}

impl Orientation {
    pub fn of(side: Side, layer: Layer, region: Region) -> Self {
        naming::orientation_of(side, layer, region)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::C => write!(f, "C"),
            Self::A => write!(f, "A"),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bot => write!(f, "bot"),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mag => write!(f, "mag"),
            Self::Ip => write!(f, "ip"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "M"),
            Self::Slave => write!(f, "S"),
            Self::Alone => write!(f, "A"),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::Mirror => write!(f, "Mirror"),
        }
    }
}

impl FromStr for Side {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Self::C),
            "A" => Ok(Self::A),
            _ => Err(FieldError::new("side", s)),
        }
    }
}

impl FromStr for Layer {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" | "t" => Ok(Self::Top),
            "bot" | "bottom" | "b" => Ok(Self::Bot),
            _ => Err(FieldError::new("top/bot", s)),
        }
    }
}

impl FromStr for Region {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mag" | "m" => Ok(Self::Mag),
            "ip" | "i" => Ok(Self::Ip),
            _ => Err(FieldError::new("mag/ip", s)),
        }
    }
}

impl FromStr for Role {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" | "MASTER" => Ok(Self::Master),
            "S" | "SLAVE" => Ok(Self::Slave),
            "A" | "ALONE" => Ok(Self::Alone),
            _ => Err(FieldError::new("M/S/A", s)),
        }
    }
}

impl FromStr for Orientation {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Self::True),
            "mirror" => Ok(Self::Mirror),
            _ => Err(FieldError::new("true/mirror", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Lengths
// ---------------------------------------------------------------------------

/// Installed cable length at one end.
///
/// Numeric lengths are kept to one decimal. `splice` marks a stub that shares
/// its run with a sibling record; values containing `|` are free text.
#[derive(Debug, Clone, PartialEq)]
pub enum Length {
    Meters(f64),
    Splice,
    Text(String),
}

impl Length {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "splice" {
            return Self::Splice;
        }
        if raw.contains('|') {
            return Self::Text(raw.to_string());
        }
        match raw.parse::<f64>() {
            Ok(m) => Self::Meters((m * 10.0).round() / 10.0),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    pub fn is_splice(&self) -> bool {
        matches!(self, Self::Splice)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meters(m) => write!(f, "{m:.1}"),
            Self::Splice => write!(f, "splice"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Cable records
// ---------------------------------------------------------------------------

/// LVR assignment, installed lengths and printed labels of one cable.
///
/// Spliced runs carry several channels; `lvr_labels` holds one label per
/// channel in the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wiring {
    pub lvr: u32,
    pub channels: Vec<u8>,
    pub length_c: Length,
    pub length_a: Length,
    pub ppp_label: String,
    pub lvr_labels: Vec<String>,
}

impl Wiring {
    pub fn channel_text(&self) -> String {
        self.channels
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" Y ")
    }

    pub fn lvr_label_text(&self) -> String {
        self.lvr_labels.join("   Y   ")
    }

    /// Fold a splice stub's channel and label into this run.
    pub fn absorb_splice(&mut self, stub: &Wiring) {
        self.channels.extend_from_slice(&stub.channels);
        self.lvr_labels.extend(stub.lvr_labels.iter().cloned());
    }
}

/// One power cable: identity fields, PPP position and optional wiring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CableLine {
    pub side: Side,
    pub layer: Layer,
    pub region: Region,
    pub backplane: String,
    pub bp_connector: String,
    pub secondary_connector: String,
    /// Flex name for hybrids, `n/a` for DCBs.
    pub flex: String,
    pub load_group: String,
    pub role: Role,
    pub ppp: String,
    pub pin: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiring: Option<Wiring>,
}

impl CableLine {
    pub fn identity_key(&self) -> IdentityKey<'_> {
        IdentityKey {
            side: self.side,
            layer: self.layer,
            region: self.region,
            backplane: &self.backplane,
            bp_connector: &self.bp_connector,
            secondary_connector: &self.secondary_connector,
            flex: &self.flex,
            load_group: &self.load_group,
            role: self.role,
        }
    }

    pub fn full_key(&self) -> FullKey<'_> {
        FullKey {
            identity: self.identity_key(),
            ppp: &self.ppp,
            pin: self.pin,
        }
    }

    pub fn slot_key(&self) -> SlotKey<'_> {
        SlotKey {
            side: self.side,
            layer: self.layer,
            region: self.region,
            ppp: &self.ppp,
            pin: self.pin,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.side, self.layer, self.region)
    }

    pub fn position_number(&self) -> Option<u32> {
        naming::position_number(&self.ppp)
    }

    pub fn is_dcb(&self) -> bool {
        self.bp_connector.contains("JD")
    }

    pub fn is_hybrid(&self) -> bool {
        self.flex != "n/a"
    }

    pub fn is_splice(&self) -> bool {
        self.wiring.as_ref().is_some_and(|w| w.length_c.is_splice())
    }

    /// Set wiring if none is present yet. Returns whether it was set.
    pub fn annotate(&mut self, wiring: Wiring) -> bool {
        if self.wiring.is_some() {
            return false;
        }
        self.wiring = Some(wiring);
        true
    }

    /// Short human description used in log lines and anomaly subjects.
    pub fn describe(&self) -> String {
        format!(
            "{}{}{} {} {} {} {} {} {}",
            self.side,
            self.layer,
            self.region,
            self.backplane,
            self.bp_connector,
            self.secondary_connector,
            self.flex,
            self.load_group,
            self.role
        )
    }
}

// ---------------------------------------------------------------------------
// Key projections
// ---------------------------------------------------------------------------

/// Identity-minus-position: every identity field, no PPP slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey<'a> {
    pub side: Side,
    pub layer: Layer,
    pub region: Region,
    pub backplane: &'a str,
    pub bp_connector: &'a str,
    pub secondary_connector: &'a str,
    pub flex: &'a str,
    pub load_group: &'a str,
    pub role: Role,
}

/// Identity plus PPP position and pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullKey<'a> {
    pub identity: IdentityKey<'a>,
    pub ppp: &'a str,
    pub pin: u8,
}

/// The physical PPP slot: side, layer, region, position and pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey<'a> {
    pub side: Side,
    pub layer: Layer,
    pub region: Region,
    pub ppp: &'a str,
    pub pin: u8,
}

// ---------------------------------------------------------------------------
// Sense records
// ---------------------------------------------------------------------------

/// One traced voltage-sense tap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenseLine {
    pub crate_no: String,
    pub slot: String,
    pub lvr: u32,
    pub connector: SenseConnector,
    pub pair: TwistedPair,
    /// Splitter (or cable) label at the LVR end.
    pub splitter: String,
    pub kind: SplitterKind,
    pub egress_port: String,
    pub ingress_port: Option<u8>,
    /// Pair arriving at the backplane end after every splitter hop.
    pub ingress_pair: TwistedPair,
    pub hops: usize,
    pub sense_label: String,
    pub ppp_true: String,
    pub ppp_mirror: String,
    pub tbb_port: String,
}

impl SenseLine {
    pub fn channel(&self) -> u8 {
        naming::sense_channel(self.connector, self.pair)
    }

    pub fn channel_pin(&self) -> naming::ChannelPin {
        naming::ChannelPin::for_sense(self.lvr, self.connector, self.pair)
    }

    /// Backplane named by the sense label prefix.
    pub fn backplane(&self) -> &str {
        self.sense_label.split('_').next().unwrap_or("")
    }

    pub fn coupler(&self, orientation: Orientation) -> &str {
        match orientation {
            Orientation::True => &self.ppp_true,
            Orientation::Mirror => &self.ppp_mirror,
        }
    }

    pub fn input_label(&self) -> String {
        self.kind.input_label(&self.splitter, self.ingress_port)
    }

    pub fn output_label(&self) -> String {
        self.kind.output_label(&self.egress_port)
    }

    /// Key into the telemetry-board map: `<tBB port>_<ingress pair>`.
    pub fn telemetry_key(&self) -> String {
        format!("{}_{}", self.tbb_port, self.ingress_pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ppp: &str, pin: u8) -> CableLine {
        CableLine {
            side: Side::C,
            layer: Layer::Top,
            region: Region::Mag,
            backplane: "alpha".into(),
            bp_connector: "JP0".into(),
            secondary_connector: "J1".into(),
            flex: "X0M".into(),
            load_group: "grp1".into(),
            role: Role::Alone,
            ppp: ppp.into(),
            pin,
            wiring: None,
        }
    }

    fn wiring(channel: u8, label: &str) -> Wiring {
        Wiring {
            lvr: 7,
            channels: vec![channel],
            length_c: Length::parse("12"),
            length_a: Length::parse("3.04"),
            ppp_label: "P5 - 3/11 | PT_C_alpha_X0M_grp1".into(),
            lvr_labels: vec![label.into()],
        }
    }

    #[test]
    fn identity_ignores_position() {
        let a = line("P1", 1);
        let b = line("P5", 3);
        assert_eq!(a.identity_key(), b.identity_key());
        assert_ne!(a.full_key(), b.full_key());
        assert_ne!(a.slot_key(), b.slot_key());
    }

    #[test]
    fn slot_ignores_identity() {
        let a = line("P5", 3);
        let mut b = line("P5", 3);
        b.flex = "S0S".into();
        assert_eq!(a.slot_key(), b.slot_key());
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn lengths_normalise_to_one_decimal() {
        assert_eq!(Length::parse("12").to_string(), "12.0");
        assert_eq!(Length::parse("3.04").to_string(), "3.0");
        assert_eq!(Length::parse("2.25 ").to_string(), "2.3");
        assert_eq!(Length::parse("splice"), Length::Splice);
        assert_eq!(Length::parse("4.5 | 5.5").to_string(), "4.5 | 5.5");
        assert_eq!(Length::parse("tbd"), Length::Text("tbd".into()));
    }

    #[test]
    fn annotation_is_write_once() {
        let mut l = line("P1", 1);
        assert!(l.annotate(wiring(7, "first")));
        assert!(!l.annotate(wiring(3, "second")));
        assert_eq!(l.wiring.as_ref().map(|w| w.channel_text()).as_deref(), Some("7"));
    }

    #[test]
    fn splice_absorb_joins_channels_and_labels() {
        let mut w = wiring(7, "7 - J13 - 4/3 CB | load");
        w.absorb_splice(&wiring(3, "7 - J12 - 4/3 CB | load"));
        assert_eq!(w.channel_text(), "7 Y 3");
        assert_eq!(
            w.lvr_label_text(),
            "7 - J13 - 4/3 CB | load   Y   7 - J12 - 4/3 CB | load"
        );
    }

    #[test]
    fn vocabulary_parses_loosely() {
        assert_eq!("bottom".parse::<Layer>(), Ok(Layer::Bot));
        assert_eq!(" IP".parse::<Region>(), Ok(Region::Ip));
        assert_eq!("m".parse::<Role>(), Ok(Role::Master));
        assert!("Q".parse::<Side>().is_err());
    }
}
