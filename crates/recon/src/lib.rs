//! `lvmap-recon`: LV harness mapping reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded cable, layout and netlist tables,
//! returns report tables, an anomaly log and a summary. No CLI or IO
//! dependencies.

pub mod anomaly;
pub mod cctb;
pub mod compare;
pub mod config;
pub mod consolidate;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod flip;
pub mod loads;
pub mod matcher;
pub mod model;
pub mod naming;
pub mod report;
pub mod swap;
pub mod topology;
pub mod trace;

pub use anomaly::{Anomaly, AnomalyKind, AnomalyLog, Stage};
pub use config::HarnessConfig;
pub use engine::{run, HarnessInput, HarnessResult};
pub use error::{FieldError, ReconError};
pub use evidence::HarnessSummary;
pub use model::{CableLine, Layer, Length, Region, Role, SenseLine, Side, Wiring};
pub use report::{ReportRow, ReportTable};
