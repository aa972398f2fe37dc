use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{Layer, Region, Side};
use crate::swap::{SwapPolicy, SwapScope};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// LVRs visited by the sense tracer, numbered from 1.
    #[serde(default = "default_lvr_count")]
    pub lvr_count: u32,
    /// LVRs up to this number power magnet-side loads.
    #[serde(default = "default_mag_lvr_max")]
    pub mag_lvr_max: u32,
    /// Channel pins (`<lvr>_<Jcc>_<pin>`) wired to slave loads. Their sense
    /// pairs are not traced.
    #[serde(default)]
    pub slave_channels: Vec<String>,
    #[serde(default)]
    pub swap: SwapConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub schematics: SchematicsConfig,
    #[serde(default)]
    pub compare: Vec<CompareConfig>,
}

fn default_name() -> String {
    "lvmap".to_string()
}

fn default_lvr_count() -> u32 {
    67
}

fn default_mag_lvr_max() -> u32 {
    36
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            lvr_count: default_lvr_count(),
            mag_lvr_max: default_mag_lvr_max(),
            slave_channels: Vec::new(),
            swap: SwapConfig::default(),
            checks: ChecksConfig::default(),
            schematics: SchematicsConfig::default(),
            compare: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Without a scope every listed position moves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwapConfig {
    #[serde(default)]
    pub scope: Option<SwapScope>,
}

impl SwapConfig {
    pub fn policy(&self) -> SwapPolicy {
        match &self.scope {
            Some(scope) => SwapPolicy::Scoped(scope.clone()),
            None => SwapPolicy::Unconditional,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecksConfig {
    #[serde(default)]
    pub flipped_orientation: bool,
    #[serde(default = "default_true")]
    pub coverage: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            flipped_orientation: false,
            coverage: true,
        }
    }
}

/// Netlist paths, relative to the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchematicsConfig {
    #[serde(default)]
    pub power: Vec<String>,
    #[serde(default)]
    pub telemetry: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareKind {
    LabelCheck,
    CableTest,
}

impl std::fmt::Display for CompareKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LabelCheck => write!(f, "label_check"),
            Self::CableTest => write!(f, "cable_test"),
        }
    }
}

/// One comparison input. Label sheets cover a single side/layer/region.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    pub kind: CompareKind,
    pub file: String,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub region: Option<Region>,
}

impl CompareConfig {
    pub fn location(&self) -> Option<(Side, Layer, Region)> {
        Some((self.side?, self.layer?, self.region?))
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

/// `<lvr>_<J12|J13>_<2|4|6|8>`
fn is_channel_pin_key(key: &str) -> bool {
    let parts: Vec<&str> = key.split('_').collect();
    match parts.as_slice() {
        [lvr, con, pin] => {
            lvr.parse::<u32>().is_ok()
                && matches!(*con, "J12" | "J13")
                && matches!(*pin, "2" | "4" | "6" | "8")
        }
        _ => false,
    }
}

impl HarnessConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: HarnessConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.lvr_count == 0 {
            return Err(ReconError::ConfigValidation("lvr_count must be at least 1".into()));
        }

        if self.mag_lvr_max > self.lvr_count {
            return Err(ReconError::ConfigValidation(format!(
                "mag_lvr_max ({}) exceeds lvr_count ({})",
                self.mag_lvr_max, self.lvr_count
            )));
        }

        if let Some(bad) = self.slave_channels.iter().find(|k| !is_channel_pin_key(k)) {
            return Err(ReconError::ConfigValidation(format!(
                "slave channel '{bad}' is not of the form <lvr>_<J12|J13>_<pin>"
            )));
        }

        if let Some(scope) = &self.swap.scope {
            if scope.is_unconstrained() {
                return Err(ReconError::ConfigValidation(
                    "[swap.scope] must constrain side, layer, region or hybrids_only".into(),
                ));
            }
        }

        for (i, c) in self.compare.iter().enumerate() {
            if c.kind == CompareKind::LabelCheck && c.location().is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "compare entry {} ({}): label checks need side, layer and region",
                    i + 1,
                    c.file
                )));
            }
        }

        Ok(())
    }

    pub fn slave_set(&self) -> BTreeSet<String> {
        self.slave_channels.iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
