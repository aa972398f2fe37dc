//! Passive splitter boards in the voltage-sense chain.
//!
//! Every splitter type is a fixed, pure table from (egress port, egress
//! twisted pair) to (ingress port, ingress twisted pair). Combinations the
//! board does not wire are `None`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::FieldError;

// ---------------------------------------------------------------------------
// Twisted pairs and sense connectors
// ---------------------------------------------------------------------------

/// RJ45 twisted pair, named by its pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TwistedPair {
    #[serde(rename = "1-2")]
    P12,
    #[serde(rename = "4-5")]
    P45,
    #[serde(rename = "3-6")]
    P36,
    #[serde(rename = "7-8")]
    P78,
}

impl TwistedPair {
    /// Channel order on an LVR sense connector.
    pub const ALL: [TwistedPair; 4] = [Self::P12, Self::P45, Self::P36, Self::P78];

    pub fn label(&self) -> &'static str {
        match self {
            Self::P12 => "1-2",
            Self::P45 => "4-5",
            Self::P36 => "3-6",
            Self::P78 => "7-8",
        }
    }

    /// Source pin of the pair; the return pin is the other half.
    pub fn from_source(source: u8) -> Option<Self> {
        match source {
            1 => Some(Self::P12),
            4 => Some(Self::P45),
            3 => Some(Self::P36),
            7 => Some(Self::P78),
            _ => None,
        }
    }
}

impl fmt::Display for TwistedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TwistedPair {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1-2" => Ok(Self::P12),
            "4-5" => Ok(Self::P45),
            "3-6" => Ok(Self::P36),
            "7-8" => Ok(Self::P78),
            _ => Err(FieldError::new("twisted pair", s)),
        }
    }
}

/// LVR sense connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SenseConnector {
    J10,
    J16,
}

impl SenseConnector {
    pub const ALL: [SenseConnector; 2] = [Self::J10, Self::J16];
}

impl fmt::Display for SenseConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::J10 => write!(f, "J10"),
            Self::J16 => write!(f, "J16"),
        }
    }
}

// ---------------------------------------------------------------------------
// Splitter types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitterKind {
    Direct,
    Type1,
    Type2,
    Type3,
    Type4,
    Type6,
}

/// Where an egress pair enters a splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingress {
    /// Input port index; `None` for single-input boards and direct cables.
    pub port: Option<u8>,
    pub pair: TwistedPair,
}

fn via(port: u8, pair: TwistedPair) -> Option<Ingress> {
    Some(Ingress { port: Some(port), pair })
}

fn single(pair: TwistedPair) -> Option<Ingress> {
    Some(Ingress { port: None, pair })
}

impl SplitterKind {
    /// Labels without an `S` are plain cables; otherwise the second character
    /// is the board type.
    pub fn from_label(label: &str) -> Result<Self, FieldError> {
        if !label.contains('S') {
            return Ok(Self::Direct);
        }
        match label.chars().nth(1) {
            Some('1') => Ok(Self::Type1),
            Some('2') => Ok(Self::Type2),
            Some('3') => Ok(Self::Type3),
            Some('4') => Ok(Self::Type4),
            Some('6') => Ok(Self::Type6),
            _ => Err(FieldError::new("splitter type", label)),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Type1 => "1",
            Self::Type2 => "2",
            Self::Type3 => "3",
            Self::Type4 => "4",
            Self::Type6 => "6",
        }
    }

    /// Boards with several numbered inputs. Their upstream row is found by
    /// `<label>_<port>` in the layout's input column.
    pub fn has_indexed_inputs(&self) -> bool {
        matches!(self, Self::Type2 | Self::Type3 | Self::Type6)
    }

    pub fn route(&self, port: char, pair: TwistedPair) -> Option<Ingress> {
        use TwistedPair::{P12, P36, P45, P78};
        match self {
            Self::Direct => single(pair),
            Self::Type1 => match (port, pair) {
                ('a', P12) => single(P12),
                ('a', P36) => single(P36),
                ('b', P12) => single(P45),
                ('b', P36) => single(P78),
                _ => None,
            },
            // Type 4 is a type 1 board with the 7-8 input unwired.
            Self::Type4 => Self::Type1.route(port, pair).filter(|i| i.pair != P78),
            Self::Type2 => match (port, pair) {
                ('a', P12) => via(1, P12),
                ('a', P45) => via(1, P45),
                ('a', P36) => via(2, P36),
                ('a', P78) => via(1, P78),
                ('b', P12) => via(3, P12),
                ('b', P45) => via(3, P45),
                ('b', P36) => via(2, P78),
                ('b', P78) => via(3, P78),
                _ => None,
            },
            Self::Type3 => match (port, pair) {
                ('a', P12) => via(1, P12),
                ('a', P45) => via(2, P12),
                ('a', P36) => via(1, P36),
                ('b', P12) => via(1, P45),
                ('b', P45) => via(2, P45),
                ('b', P36) => via(1, P78),
                ('b', P78) => via(2, P78),
                _ => None,
            },
            Self::Type6 => match (port, pair) {
                ('a', P12) => via(1, P45),
                ('a', P36) => via(1, P78),
                ('b', P12) => via(1, P12),
                ('b', P45) => via(3, P12),
                ('b', P36) => via(1, P36),
                ('b', P78) => via(2, P12),
                ('c', P12) => via(2, P45),
                ('c', P36) => via(2, P78),
                ('d', P12) => via(3, P45),
                ('d', P36) => via(3, P78),
                _ => None,
            },
        }
    }

    /// Splitter input as printed in the sense tables.
    pub fn input_label(&self, label: &str, port: Option<u8>) -> String {
        match (self, port) {
            (Self::Direct, _) => "-".to_string(),
            (kind, Some(port)) if kind.has_indexed_inputs() => format!("{label}_{port}"),
            _ => label.to_string(),
        }
    }

    /// Splitter output as printed in the sense tables.
    pub fn output_label(&self, port: &str) -> String {
        match self {
            Self::Direct => "direct".to_string(),
            kind => format!("Type {} - OUT {port}", kind.tag()),
        }
    }
}

impl fmt::Display for SplitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
