//! `lvmap run` and `lvmap validate`: load the mapping tables through the
//! input registry, reconcile, write the report CSVs.

use std::path::{Path, PathBuf};

use clap::Args;
use lvmap_io::csv::write_reports;
use lvmap_io::labels::label_sheet;
use lvmap_io::{InputKind, NetlistKind, Registry};
use lvmap_recon::config::CompareKind;
use lvmap_recon::engine::HarnessResult;
use lvmap_recon::loads::LoadMap;
use lvmap_recon::{HarnessConfig, HarnessInput};

use crate::exit_codes::{
    summary_exit_code, EXIT_DISCREPANCIES, EXIT_INVALID_CONFIG, EXIT_IO, EXIT_SUCCESS,
};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Nominal (surface) mapping table (.csv, .xlsx, .ods)
    pub nominal: PathBuf,

    /// As-installed (cavern) mapping table
    pub cavern: PathBuf,

    /// Compare against the label sheets and cable tests listed in the config
    #[arg(long)]
    pub compare: bool,

    /// Check cavern LVR labels against the power netlists
    #[arg(long)]
    pub check_lines: bool,

    /// Sense layout table; enables the sense-line trace
    #[arg(long, value_name = "LAYOUT")]
    pub sense: Option<PathBuf>,

    /// Planned PPP moves (Positronic, Swap to)
    #[arg(long, value_name = "TABLE")]
    pub swap: Option<PathBuf>,

    /// Harness config (TOML). Netlist and compare paths are relative to it.
    #[arg(long, env = "LVMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for report CSVs
    #[arg(long, default_value = "fixme")]
    pub out: PathBuf,

    /// Print the JSON result to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the JSON result to a file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Read and validate a config. Returns it with the directory its relative
/// paths resolve against.
fn load_config(path: Option<&Path>) -> Result<(HarnessConfig, PathBuf), CliError> {
    let Some(path) = path else {
        return Ok((HarnessConfig::default(), PathBuf::from(".")));
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_IO, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = HarnessConfig::from_toml(&text).map_err(|e| CliError::from_recon(&e))?;
    let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    Ok((config, base))
}

fn load_input(
    args: &RunArgs,
    config: &HarnessConfig,
    base: &Path,
    registry: &Registry,
) -> Result<HarnessInput, CliError> {
    let load = |kind: InputKind, path: &Path| {
        registry.load(kind, path).map_err(|e| CliError::from_io(&e))
    };
    let lines = |kind: InputKind, path: &Path| {
        load(kind, path)?.into_lines().map_err(|e| CliError::from_io(&e))
    };

    let mut input = HarnessInput {
        nominal: lines(InputKind::Surface, &args.nominal)?,
        cavern: lines(InputKind::Cavern, &args.cavern)?,
        check_lines: args.check_lines,
        compare: args.compare,
        ..HarnessInput::default()
    };

    if let Some(path) = &args.swap {
        let swap = load(InputKind::SwapTable, path)?.into_swap();
        input.swap = Some(swap.map_err(|e| CliError::from_io(&e))?);
    }
    if let Some(path) = &args.sense {
        let layout = load(InputKind::SenseLayout, path)?.into_layout();
        input.layout = Some(layout.map_err(|e| CliError::from_io(&e))?);
    }

    if !config.schematics.power.is_empty() {
        let mut power = LoadMap::default();
        for file in &config.schematics.power {
            let map = load(InputKind::Netlist(NetlistKind::Power), &base.join(file))?
                .into_power()
                .map_err(|e| CliError::from_io(&e))?;
            power.merge(&map);
        }
        input.power = Some(power);
    }
    if let Some(file) = &config.schematics.telemetry {
        let map = load(InputKind::Netlist(NetlistKind::Telemetry), &base.join(file))?
            .into_telemetry()
            .map_err(|e| CliError::from_io(&e))?;
        input.telemetry = Some(map);
    }

    if args.compare {
        for entry in &config.compare {
            let path = base.join(&entry.file);
            match entry.kind {
                CompareKind::LabelCheck => {
                    let records = load(InputKind::LabelCheck, &path)?
                        .into_labels()
                        .map_err(|e| CliError::from_io(&e))?;
                    let sheet = label_sheet(entry, records).map_err(|e| CliError::from_io(&e))?;
                    input.label_sheets.push(sheet);
                }
                CompareKind::CableTest => {
                    input.cable_tests.extend(lines(InputKind::CableTest, &path)?);
                }
            }
        }
    }

    Ok(input)
}

fn print_summary(result: &HarnessResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} nominal, {} cavern ({} after splices), {} matched, {} wrong position, {} not found, {} ambiguous",
        result.meta.config_name,
        s.nominal_records,
        s.cavern_records,
        s.consolidated_records,
        s.matched,
        s.wrong_position,
        s.not_found,
        s.ambiguous,
    );
    if let Some(moved) = s.moved {
        eprintln!("swap ({}): {moved} moved", result.meta.swap_policy);
    }
    if s.load_mismatches + s.sense_mismatches + s.label_mismatches + s.cable_test_mismatches > 0 {
        eprintln!(
            "checks: {} load, {} sense, {} label, {} cable-test mismatches",
            s.load_mismatches, s.sense_mismatches, s.label_mismatches, s.cable_test_mismatches,
        );
    }
    if s.anomalies > 0 {
        eprintln!("anomalies: {} ({} unresolved)", s.anomalies, s.unresolved_anomalies);
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, base) = load_config(args.config.as_deref())?;
    let registry = Registry::standard();
    let input = load_input(&args, &config, &base, &registry)?;

    let result = lvmap_recon::run(&config, &input).map_err(|e| {
        let err = CliError::from_recon(&e);
        match e {
            lvmap_recon::ReconError::MissingInput { .. } => {
                err.with_hint("list the input in the config file passed with --config")
            }
            _ => err,
        }
    })?;

    let written = write_reports(&result.reports, &args.out).map_err(|e| CliError::from_io(&e))?;
    for path in &written {
        log::debug!("wrote report {}", path.display());
    }

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_IO, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
        log::debug!("result document written to {}", path.display());
    }
    if args.json {
        log::debug!("result document written to stdout");
        println!("{json_str}");
    }

    print_summary(&result);
    eprintln!("{} reports in {}", written.len(), args.out.display());

    match summary_exit_code(&result.summary) {
        EXIT_SUCCESS => Ok(()),
        EXIT_DISCREPANCIES => Err(CliError::new(
            EXIT_DISCREPANCIES,
            format!("{} discrepancies found", result.summary.discrepancies()),
        )
        .with_hint(format!("fixes are listed in {}", args.out.join("ppp_fixes.csv").display()))),
        code => Err(CliError::new(
            code,
            format!("{} unresolved anomalies", result.summary.unresolved_anomalies),
        )
        .with_hint(format!("see {}", args.out.join("anomalies.csv").display()))),
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base) = load_config(Some(&config_path))?;

    let referenced = config
        .schematics
        .power
        .iter()
        .chain(&config.schematics.telemetry)
        .chain(config.compare.iter().map(|c| &c.file));
    let missing: Vec<String> = referenced
        .filter(|file| !base.join(file).is_file())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(CliError::new(
            EXIT_INVALID_CONFIG,
            format!("config references missing files: {}", missing.join(", ")),
        )
        .with_hint(format!("paths are resolved against {}", base.display())));
    }

    eprintln!(
        "valid: '{}' with {} LVRs, {} slave channel(s), {} power netlist(s), {} compare input(s), {} swap",
        config.name,
        config.lvr_count,
        config.slave_channels.len(),
        config.schematics.power.len(),
        config.compare.len(),
        match config.swap.scope {
            Some(_) => "scoped",
            None => "unconditional",
        },
    );
    Ok(())
}
