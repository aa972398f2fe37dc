//! Naming conventions shared by the installation's tables: orientation,
//! pin arithmetic, LVR channel pins and backplane connector notation.

use std::fmt;

use serde::Serialize;

use crate::model::{Layer, Orientation, Region, Side};
use crate::topology::{SenseConnector, TwistedPair};

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// True/Mirror orientation of the module serving a (side, layer, region).
pub fn orientation_of(side: Side, layer: Layer, region: Region) -> Orientation {
    use Orientation::{Mirror, True};
    match (side, layer, region) {
        (Side::C, Layer::Top, Region::Mag) => True,
        (Side::C, Layer::Top, Region::Ip) => Mirror,
        (Side::C, Layer::Bot, Region::Mag) => Mirror,
        (Side::C, Layer::Bot, Region::Ip) => True,
        (Side::A, Layer::Top, Region::Mag) => Mirror,
        (Side::A, Layer::Top, Region::Ip) => True,
        (Side::A, Layer::Bot, Region::Mag) => True,
        (Side::A, Layer::Bot, Region::Ip) => Mirror,
    }
}

/// C-side layer holding `region` modules of the given orientation.
pub fn layer_for(region: Region, orientation: Orientation) -> Layer {
    match (region, orientation) {
        (Region::Mag, Orientation::True) => Layer::Top,
        (Region::Mag, Orientation::Mirror) => Layer::Bot,
        (Region::Ip, Orientation::True) => Layer::Bot,
        (Region::Ip, Orientation::Mirror) => Layer::Top,
    }
}

/// Whether the straight/stereo flip mirrors the backplane connector table.
pub fn flip_mirrors(side: Side, layer: Layer, region: Region) -> bool {
    match side {
        Side::C => matches!(
            (layer, region),
            (Layer::Bot, Region::Mag) | (Layer::Top, Region::Ip)
        ),
        Side::A => matches!(
            (layer, region),
            (Layer::Bot, Region::Ip) | (Layer::Top, Region::Mag)
        ),
    }
}

// ---------------------------------------------------------------------------
// PPP pins
// ---------------------------------------------------------------------------

/// PPP return pin paired with a source pin.
pub fn return_pin(source: u8) -> u8 {
    source + 8
}

/// Return pin of an RJ45 twisted pair given its source pin.
pub fn twisted_return(source: u8) -> Option<u8> {
    TwistedPair::from_source(source).map(|pair| match pair {
        TwistedPair::P12 => 2,
        TwistedPair::P45 => 5,
        TwistedPair::P36 => 6,
        TwistedPair::P78 => 8,
    })
}

/// `"<src>,<ret>"` as printed in the fix reports.
pub fn pin_pair(source: u8) -> String {
    format!("{},{}", source, return_pin(source))
}

/// Numeric part of a `P<n>` position label.
pub fn position_number(position: &str) -> Option<u32> {
    position.get(1..)?.parse().ok()
}

/// Normalise a position given as `5`, `5.0` or `P5` to `P5`.
pub fn normalize_position(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix('P')
        .or_else(|| raw.strip_prefix('p'))
        .unwrap_or(raw);
    let number = digits.strip_suffix(".0").unwrap_or(digits).parse::<u32>().ok()?;
    Some(format!("P{number}"))
}

/// PPP colour code expected at a position.
pub fn ppp_colour(region: Region, position: &str) -> Option<&'static str> {
    let number = position_number(position)?;
    Some(match (number <= 18, region) {
        (true, Region::Mag) => "blu",
        (true, Region::Ip) => "grn",
        (false, Region::Mag) => "red",
        (false, Region::Ip) => "yel",
    })
}

// ---------------------------------------------------------------------------
// LVR channels
// ---------------------------------------------------------------------------

/// An LVR output source pin, e.g. `12_J12_8`.
///
/// This is the key of the LVR-channel → load map. Channels 1-4 leave on J12,
/// channels 5-8 on J13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelPin {
    pub lvr: u32,
    pub connector: &'static str,
    pub pin: u8,
}

impl ChannelPin {
    pub fn new(lvr: u32, channel: u8) -> Option<Self> {
        match channel {
            1..=4 => Some(Self { lvr, connector: "J12", pin: 10 - 2 * channel }),
            5..=8 => Some(Self { lvr, connector: "J13", pin: 18 - 2 * channel }),
            _ => None,
        }
    }

    /// The channel sensed by a twisted pair on an LVR sense connector.
    pub fn for_sense(lvr: u32, connector: SenseConnector, pair: TwistedPair) -> Self {
        let channel = sense_channel(connector, pair);
        if channel < 5 {
            Self { lvr, connector: "J12", pin: 10 - 2 * channel }
        } else {
            Self { lvr, connector: "J13", pin: 18 - 2 * channel }
        }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChannelPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.lvr, self.connector, self.pin)
    }
}

/// LVR channel monitored by a sense connector twisted pair.
pub fn sense_channel(connector: SenseConnector, pair: TwistedPair) -> u8 {
    let offset = match connector {
        SenseConnector::J10 => 0,
        SenseConnector::J16 => 4,
    };
    let index = match pair {
        TwistedPair::P12 => 1,
        TwistedPair::P45 => 2,
        TwistedPair::P36 => 3,
        TwistedPair::P78 => 4,
    };
    offset + index
}

/// `"<lvr> - <Jcc> - <src>/<ret>"` per channel, joined with `"  Y  "`.
pub fn lvr_pins(lvr: u32, channels: &[u8]) -> String {
    channels
        .iter()
        .map(|&ch| match ChannelPin::new(lvr, ch) {
            Some(cp) => format!("{lvr} - {} - {}/{}", cp.connector, cp.pin, cp.pin - 1),
            None => format!("{lvr} - n/a - n/a"),
        })
        .collect::<Vec<_>>()
        .join("  Y  ")
}

// ---------------------------------------------------------------------------
// Backplane connectors
// ---------------------------------------------------------------------------

const ALT_LABELS: [&str; 12] = [
    "X0M", "X0S", "S0S", "S0M", "X1M", "X1S", "S1S", "S1M", "X2M", "X2S", "S2S", "S2M",
];

/// `JP<n>` to the flex-style notation, shifted by two on mirrored boards.
pub fn jp_to_alt(jp: &str, mirror: bool) -> Option<&'static str> {
    let mut index: usize = jp.strip_prefix("JP")?.parse().ok()?;
    if mirror {
        if (index / 2) % 2 == 0 {
            index += 2;
        } else {
            index -= 2;
        }
    }
    ALT_LABELS.get(index).copied()
}

/// Inverse of [`jp_to_alt`].
pub fn alt_to_jp(alt: &str, mirror: bool) -> Option<String> {
    (0..ALT_LABELS.len())
        .map(|n| format!("JP{n}"))
        .find(|jp| jp_to_alt(jp, mirror) == Some(alt))
}

// ---------------------------------------------------------------------------
// Load names
// ---------------------------------------------------------------------------

/// Rewrite a power-schematic load name into the sense-side convention.
///
/// `DCB_<a>_<b>_<c>` (2V5 when it mentions 25) → `<c>_2V5_<b>-<a>`,
/// `DCB_<a>_<b>` → `<b>_1V5_<a>`, hybrids `PT_<..>_<bp>_<flex>_<load>` →
/// `<bp>_<flex>_<load>`.
pub fn schematic_load_to_sense(label: &str) -> Option<String> {
    let parts: Vec<&str> = label.split('_').collect();
    if label.to_lowercase().contains("dcb") {
        if label.contains("25") {
            Some(format!("{}_2V5_{}-{}", parts.get(3)?, parts.get(2)?, parts.get(1)?))
        } else {
            Some(format!("{}_1V5_{}", parts.get(2)?, parts.get(1)?))
        }
    } else {
        Some(format!("{}_{}_{}", parts.get(2)?, parts.get(3)?, parts.get(4)?))
    }
}
