//! Input registry: one parser per input kind, built once and handed to
//! whatever loads a dataset.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use lvmap_recon::compare::LabelRecord;
use lvmap_recon::loads::{LoadMap, TelemetryMap};
use lvmap_recon::model::CableLine;
use lvmap_recon::swap::SwapTable;
use lvmap_recon::trace::SenseLayout;

use crate::error::IoError;
use crate::table::Table;
use crate::{cable, labels, layout, netlist, swap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetlistKind {
    Power,
    Telemetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Surface,
    Cavern,
    SwapTable,
    CableTest,
    Netlist(NetlistKind),
    SenseLayout,
    LabelCheck,
}

impl InputKind {
    pub const ALL: [InputKind; 8] = [
        Self::Surface,
        Self::Cavern,
        Self::SwapTable,
        Self::CableTest,
        Self::Netlist(NetlistKind::Power),
        Self::Netlist(NetlistKind::Telemetry),
        Self::SenseLayout,
        Self::LabelCheck,
    ];
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Surface => "surface mapping",
            Self::Cavern => "cavern mapping",
            Self::SwapTable => "swap table",
            Self::CableTest => "cable test",
            Self::Netlist(NetlistKind::Power) => "power netlist",
            Self::Netlist(NetlistKind::Telemetry) => "telemetry netlist",
            Self::SenseLayout => "sense layout",
            Self::LabelCheck => "label check",
        };
        f.write_str(name)
    }
}

/// A parsed input, tagged by kind.
#[derive(Debug)]
pub enum Parsed {
    Lines(Vec<CableLine>),
    Swap(SwapTable),
    Power(LoadMap),
    Telemetry(TelemetryMap),
    Layout(SenseLayout),
    Labels(Vec<LabelRecord>),
}

impl Parsed {
    fn variant(&self) -> &'static str {
        match self {
            Self::Lines(_) => "cable records",
            Self::Swap(_) => "swap table",
            Self::Power(_) => "power map",
            Self::Telemetry(_) => "telemetry map",
            Self::Layout(_) => "sense layout",
            Self::Labels(_) => "label records",
        }
    }

    fn mismatch(self, expected: &'static str) -> IoError {
        IoError::UnexpectedInput {
            expected,
            found: self.variant(),
        }
    }

    pub fn into_lines(self) -> Result<Vec<CableLine>, IoError> {
        match self {
            Self::Lines(lines) => Ok(lines),
            other => Err(other.mismatch("cable records")),
        }
    }

    pub fn into_swap(self) -> Result<SwapTable, IoError> {
        match self {
            Self::Swap(table) => Ok(table),
            other => Err(other.mismatch("swap table")),
        }
    }

    pub fn into_power(self) -> Result<LoadMap, IoError> {
        match self {
            Self::Power(map) => Ok(map),
            other => Err(other.mismatch("power map")),
        }
    }

    pub fn into_telemetry(self) -> Result<TelemetryMap, IoError> {
        match self {
            Self::Telemetry(map) => Ok(map),
            other => Err(other.mismatch("telemetry map")),
        }
    }

    pub fn into_layout(self) -> Result<SenseLayout, IoError> {
        match self {
            Self::Layout(layout) => Ok(layout),
            other => Err(other.mismatch("sense layout")),
        }
    }

    pub fn into_labels(self) -> Result<Vec<LabelRecord>, IoError> {
        match self {
            Self::Labels(records) => Ok(records),
            other => Err(other.mismatch("label records")),
        }
    }
}

pub type ParseFn = fn(&Path) -> Result<Parsed, IoError>;

/// Parsers keyed by input kind.
pub struct Registry {
    parsers: HashMap<InputKind, ParseFn>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registry with the built-in parser for every input kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(InputKind::Surface, |p| {
            cable::parse_identity_table(&Table::read(p)?).map(Parsed::Lines)
        });
        registry.register(InputKind::CableTest, |p| {
            cable::parse_identity_table(&Table::read(p)?).map(Parsed::Lines)
        });
        registry.register(InputKind::Cavern, |p| {
            cable::parse_cavern_table(&Table::read(p)?).map(Parsed::Lines)
        });
        registry.register(InputKind::SwapTable, |p| {
            swap::parse_swap_table(&Table::read(p)?).map(Parsed::Swap)
        });
        registry.register(InputKind::SenseLayout, |p| {
            layout::parse_layout(&Table::read(p)?).map(Parsed::Layout)
        });
        registry.register(InputKind::Netlist(NetlistKind::Power), |p| {
            netlist::read_power(&[p]).map(Parsed::Power)
        });
        registry.register(InputKind::Netlist(NetlistKind::Telemetry), |p| {
            netlist::read_telemetry(p).map(Parsed::Telemetry)
        });
        registry.register(InputKind::LabelCheck, |p| {
            labels::read_label_records(p).map(Parsed::Labels)
        });
        registry
    }

    /// Register a parser, replacing any previous one for `kind`.
    pub fn register(&mut self, kind: InputKind, parser: ParseFn) {
        self.parsers.insert(kind, parser);
    }

    pub fn load(&self, kind: InputKind, path: &Path) -> Result<Parsed, IoError> {
        let parser = self.parsers.get(&kind).ok_or_else(|| IoError::NoParser {
            kind: kind.to_string(),
        })?;
        log::debug!("loading {kind} from {}", path.display());
        parser(path)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_covers_every_kind() {
        let registry = Registry::standard();
        for kind in InputKind::ALL {
            assert!(registry.parsers.contains_key(&kind), "{kind}");
        }
    }

    #[test]
    fn unregistered_kind_is_reported() {
        let registry = Registry::new();
        let err = registry
            .load(InputKind::SwapTable, Path::new("swap.csv"))
            .unwrap_err();
        assert_eq!(err.to_string(), "no parser registered for swap table inputs");
        assert!(!err.is_parse());
    }

    #[test]
    fn custom_parser_replaces_builtin() {
        let mut registry = Registry::standard();
        registry.register(InputKind::SwapTable, |_| Ok(Parsed::Swap(SwapTable::new())));
        let parsed = registry
            .load(InputKind::SwapTable, Path::new("unused.csv"))
            .unwrap();
        assert!(parsed.into_swap().unwrap().is_empty());
    }

    #[test]
    fn wrong_accessor_is_an_error() {
        let err = Parsed::Labels(Vec::new()).into_lines().unwrap_err();
        assert_eq!(err.to_string(), "expected cable records, parser produced label records");
    }
}
