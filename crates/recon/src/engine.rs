use std::borrow::Cow;

use serde::Serialize;

use crate::anomaly::{Anomaly, AnomalyLog};
use crate::cctb::{power_tables, sense_tables};
use crate::compare::{check_cable_test, check_labels, LabelMismatch, LabelSheet};
use crate::config::HarnessConfig;
use crate::consolidate::{consolidate_splices, Consolidation};
use crate::error::ReconError;
use crate::evidence::{compute_summary, HarnessSummary};
use crate::flip::flip_all;
use crate::loads::{
    check_line_loads, check_sense_loads, derive_power_map, LoadMap, LoadMismatch, SenseFinding,
    TelemetryMap,
};
use crate::matcher::{coverage_gaps, reconcile, Reconciliation};
use crate::model::{CableLine, SenseLine};
use crate::report::{
    anomalies_report, cable_test_report, coverage_report, label_check_report,
    load_mismatch_report, move_labels_report, ppp_fix_report, sense_report, ReportTable,
};
use crate::swap::{apply_swap, rematch_by_slot, SlotMatch, SwapPolicy, SwapTable, SwappedLine};
use crate::trace::{trace_all, ActiveChannels, SenseLayout};

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

/// Pre-loaded tables for one run. Optional inputs switch their stages on.
#[derive(Debug, Default)]
pub struct HarnessInput {
    pub nominal: Vec<CableLine>,
    pub cavern: Vec<CableLine>,
    pub swap: Option<SwapTable>,
    pub power: Option<LoadMap>,
    pub telemetry: Option<TelemetryMap>,
    pub layout: Option<SenseLayout>,
    pub label_sheets: Vec<LabelSheet>,
    pub cable_tests: Vec<CableLine>,
    /// Check cavern LVR labels against the power netlist.
    pub check_lines: bool,
    /// Run the label-sheet and cable-test comparisons.
    pub compare: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub swap_policy: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessResult {
    pub meta: HarnessMeta,
    pub summary: HarnessSummary,
    pub anomalies: Vec<Anomaly>,
    pub reports: Vec<ReportTable>,
}

impl HarnessResult {
    pub fn report(&self, name: &str) -> Option<&ReportTable> {
        self.reports.iter().find(|r| r.name == name)
    }
}

/// Stage outputs. `None` marks a stage that did not run.
#[derive(Debug)]
pub struct Stages {
    pub nominal_records: usize,
    pub cavern_records: usize,
    pub consolidation: Consolidation,
    pub recon: Reconciliation,
    pub coverage_gaps: Option<Vec<usize>>,
    pub flipped: Option<Vec<CableLine>>,
    pub swap: Option<(Vec<SwappedLine>, Vec<SlotMatch>)>,
    pub load_mismatches: Option<Vec<LoadMismatch>>,
    pub sense_lines: Option<Vec<SenseLine>>,
    pub sense_findings: Option<Vec<SenseFinding>>,
    pub label_mismatches: Option<Vec<LabelMismatch>>,
    pub cable_test_misses: Option<Vec<CableLine>>,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the harness per config. Returns the report tables, the anomaly log
/// and a summary.
pub fn run(config: &HarnessConfig, input: &HarnessInput) -> Result<HarnessResult, ReconError> {
    config.validate()?;

    if input.check_lines && input.power.is_none() {
        return Err(ReconError::MissingInput {
            check: "line check",
            input: "a power netlist",
        });
    }
    if input.compare && input.label_sheets.is_empty() && input.cable_tests.is_empty() {
        return Err(ReconError::MissingInput {
            check: "compare",
            input: "a label sheet or cable-test table",
        });
    }

    let mut log = AnomalyLog::new();
    let stages = run_stages(config, input, &mut log);
    let reports = build_reports(config, input, &stages, &log);
    let summary = compute_summary(&stages, &log);

    log::info!(
        "{}: {} matched, {} not found, {} wrong position, {} anomalies",
        config.name,
        summary.matched,
        summary.not_found,
        summary.wrong_position,
        summary.anomalies
    );

    Ok(HarnessResult {
        meta: HarnessMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            swap_policy: match config.swap.policy() {
                SwapPolicy::Unconditional => "unconditional",
                SwapPolicy::Scoped(_) => "scoped",
            },
        },
        summary,
        anomalies: log.into_entries(),
        reports,
    })
}

fn run_stages(config: &HarnessConfig, input: &HarnessInput, log: &mut AnomalyLog) -> Stages {
    let consolidation = consolidate_splices(&input.cavern, log);
    let cavern = &consolidation.lines;

    let gaps = config
        .checks
        .coverage
        .then(|| coverage_gaps(&input.nominal, cavern, log));
    let recon = reconcile(&input.nominal, cavern, log);

    let flipped = config.checks.flipped_orientation.then(|| flip_all(cavern));

    let swap = input.swap.as_ref().map(|table| {
        let swapped = apply_swap(cavern, table, &config.swap.policy());
        let slots = rematch_by_slot(&swapped, &recon.nominal, log);
        (swapped, slots)
    });

    let load_mismatches = match &input.power {
        Some(power) if input.check_lines => Some(check_line_loads(cavern, power, log)),
        _ => None,
    };

    let mut sense_findings = None;
    let sense_lines = input.layout.as_ref().map(|layout| {
        // Without netlists the annotated nominal wiring stands in.
        let power: Cow<'_, LoadMap> = match &input.power {
            Some(power) => Cow::Borrowed(power),
            None => Cow::Owned(derive_power_map(&recon.nominal)),
        };
        let slaves = config.slave_set();
        let active = ActiveChannels {
            power: &power,
            slaves: &slaves,
        };
        let lines = trace_all(layout, &active, config.lvr_count, log);
        if let Some(telemetry) = &input.telemetry {
            sense_findings = Some(check_sense_loads(&lines, &power, telemetry, log));
        }
        lines
    });

    let (label_mismatches, cable_test_misses) = if input.compare {
        let labels = (!input.label_sheets.is_empty()).then(|| {
            input
                .label_sheets
                .iter()
                .flat_map(|sheet| check_labels(sheet, &recon.nominal, log))
                .collect::<Vec<_>>()
        });
        let cable = (!input.cable_tests.is_empty()).then(|| {
            check_cable_test(&input.cable_tests, &recon.nominal)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>()
        });
        (labels, cable)
    } else {
        (None, None)
    };

    Stages {
        nominal_records: input.nominal.len(),
        cavern_records: input.cavern.len(),
        consolidation,
        recon,
        coverage_gaps: gaps,
        flipped,
        swap,
        load_mismatches,
        sense_lines,
        sense_findings,
        label_mismatches,
        cable_test_misses,
    }
}

/// Report tables in catalogue order; the anomaly table always comes last.
fn build_reports(
    config: &HarnessConfig,
    input: &HarnessInput,
    stages: &Stages,
    log: &AnomalyLog,
) -> Vec<ReportTable> {
    let recon = &stages.recon;
    let cavern = &stages.consolidation.lines;

    let mut reports = vec![ppp_fix_report("ppp_fixes", cavern, recon)];
    if let Some(flipped) = &stages.flipped {
        reports.push(ppp_fix_report("ppp_fixes_flipped", flipped, recon));
    }
    if let Some((swapped, slots)) = &stages.swap {
        reports.push(move_labels_report(swapped, slots, &recon.nominal));
    }
    if let Some(gaps) = &stages.coverage_gaps {
        reports.push(coverage_report(&input.nominal, gaps));
    }
    if let Some(mismatches) = &stages.load_mismatches {
        reports.push(load_mismatch_report(mismatches));
    }

    let matched: Vec<&CableLine> = recon
        .matched_nominal()
        .into_iter()
        .filter_map(|i| recon.nominal.get(i))
        .collect();
    reports.extend(power_tables(&matched));

    if let Some(findings) = &stages.sense_findings {
        reports.push(sense_report(findings));
    }
    if let Some(lines) = &stages.sense_lines {
        reports.extend(sense_tables(lines, config.mag_lvr_max));
    }
    if let Some(mismatches) = &stages.label_mismatches {
        reports.push(label_check_report(mismatches));
    }
    if let Some(misses) = &stages.cable_test_misses {
        let misses: Vec<&CableLine> = misses.iter().collect();
        reports.push(cable_test_report(&misses));
    }

    reports.push(anomalies_report(log.entries()));
    reports
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
