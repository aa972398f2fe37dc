// lvmap CLI - LV harness mapping reconciliation
// Compares the as-installed cavern mapping with the nominal mapping and
// writes fix reports and cable-test worksheets as CSV.

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lvmap_io::IoError;
use lvmap_recon::topology::{SplitterKind, TwistedPair};
use lvmap_recon::{FieldError, ReconError};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "lvmap")]
#[command(about = "Reconcile LV harness mappings and write fix reports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only on stderr
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a cavern mapping against the nominal mapping
    #[command(after_help = "\
Examples:
  lvmap run surface.csv cavern.xlsx
  lvmap run surface.csv cavern.xlsx --swap moves.csv --out fixes
  lvmap run surface.csv cavern.xlsx --config lvmap.toml --check-lines --sense layout.csv
  lvmap run surface.csv cavern.xlsx --config lvmap.toml --compare --json > result.json")]
    Run(run::RunArgs),

    /// Validate a harness config without running
    #[command(after_help = "\
Examples:
  lvmap validate config/lvmap.toml")]
    Validate {
        /// Path to the harness .toml config
        config: PathBuf,
    },

    /// Look up which splitter input feeds an output pair
    #[command(after_help = "\
Examples:
  lvmap splitter 2 b 3-6
  lvmap splitter direct a 1-2 --json")]
    Splitter {
        /// Board type: 1, 2, 3, 4, 6 or direct
        kind: String,

        /// Output port letter
        port: char,

        /// Twisted pair on the output port (1-2, 4-5, 3-6, 7-8)
        pair: String,

        /// Print the route as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  lvmap-recon ",
        env!("CARGO_PKG_VERSION"),
        "\nreports: csv",
    )
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,lvmap_recon=info,lvmap_io=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Validate { config } => run::cmd_validate(config),
        Commands::Splitter { kind, port, pair, json } => cmd_splitter(&kind, port, &pair, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn from_io(err: &IoError) -> Self {
        let hint = match err {
            IoError::UnsupportedExtension { .. } => {
                Some("save the table as .csv or .xlsx".to_string())
            }
            IoError::MissingColumn { .. } => {
                Some("header names must match exactly (surrounding spaces are ignored)".to_string())
            }
            _ => None,
        };
        Self { code: io_exit_code(err), message: err.to_string(), hint }
    }

    pub fn from_recon(err: &ReconError) -> Self {
        Self::new(recon_exit_code(err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// splitter
// ============================================================================

#[derive(Serialize)]
struct SplitterRoute {
    kind: SplitterKind,
    port: char,
    pair: TwistedPair,
    input_port: Option<u8>,
    input_pair: TwistedPair,
}

fn cmd_splitter(kind: &str, port: char, pair: &str, json: bool) -> Result<(), CliError> {
    let kind = match kind {
        "direct" => SplitterKind::Direct,
        t => SplitterKind::from_label(&format!("S{t}"))
            .map_err(|e| CliError::usage(e.to_string()))?,
    };
    let pair: TwistedPair = pair
        .parse()
        .map_err(|e: FieldError| CliError::usage(e.to_string()))?;

    let output = kind.output_label(&port.to_string());
    let ingress = kind
        .route(port, pair)
        .ok_or_else(|| CliError::usage(format!("{output} does not wire pair {pair}")))?;

    if json {
        let route = SplitterRoute {
            kind,
            port,
            pair,
            input_port: ingress.port,
            input_pair: ingress.pair,
        };
        let json_str = serde_json::to_string_pretty(&route)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        let input = match ingress.port {
            Some(p) => format!("IN {p}"),
            None => "IN".to_string(),
        };
        println!("{output} {pair} <- {input} {}", ingress.pair);
    }
    Ok(())
}
