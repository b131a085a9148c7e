//! Command-line front end for the capability harness.
//!
//! `capprobe run` loads a namespace document and a check manifest, runs every
//! check once, and prints the report as text or JSON. `capprobe listen` reads
//! a JSON report from stdin and prints the text rendering, so the two compose
//! as `capprobe run --format json ... | capprobe listen`. Logs go to stderr;
//! stdout only ever carries the report.

use anyhow::{Context, Result, bail};
use capprobe::{
    CheckManifest, Harness, JsonNamespace, RankPolicy, Report, ReportSummary, RunOptions,
    render_report, summarize,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "capprobe", version, about = "Probe an environment for capabilities and score the result")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a check manifest against a namespace document.
    Run(RunArgs),
    /// Render a JSON report read from stdin.
    Listen(ListenArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// JSON object whose keys are the capabilities the environment provides.
    #[arg(long, value_name = "PATH")]
    namespace: PathBuf,

    /// Check manifest (schema_version capprobe_manifest_v1).
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,

    /// Rank policy JSON overriding the default thresholds.
    #[arg(long, value_name = "PATH", env = "CAPPROBE_RANKS")]
    ranks: Option<PathBuf>,

    /// Per-probe timeout in milliseconds; 0 disables the timeout.
    #[arg(long, value_name = "MS", env = "CAPPROBE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// How long a timed-out probe may take to stop before the next check
    /// starts, in milliseconds.
    #[arg(long, value_name = "MS", env = "CAPPROBE_GRACE_MS")]
    grace_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Exit with status 1 when any check failed.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct ListenArgs {
    /// Rank policy JSON overriding the default thresholds.
    #[arg(long, value_name = "PATH", env = "CAPPROBE_RANKS")]
    ranks: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct RunDocument<'a> {
    report: &'a Report,
    summary: &'a ReportSummary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("capprobe=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("capprobe=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(command: Command) -> Result<ExitCode> {
    match command {
        Command::Run(args) => run(args),
        Command::Listen(args) => listen(args),
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let policy = load_policy(args.ranks.as_deref())?;
    let namespace = JsonNamespace::load(&args.namespace)?;
    let manifest = CheckManifest::load(&args.manifest)?;
    tracing::debug!(
        globals = namespace.len(),
        checks = manifest.checks.len(),
        "loaded namespace and manifest"
    );

    let mut options = RunOptions {
        timeout: args
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis),
        ..RunOptions::default()
    };
    if let Some(grace_ms) = args.grace_ms {
        options = options.grace(Duration::from_millis(grace_ms));
    }
    let mut harness = Harness::new(Arc::new(namespace)).with_options(options);
    manifest.register_into(&mut harness);

    let report = harness.run();
    let summary = summarize(&report, &policy);
    print_report(&report, &summary, args.format)?;

    if args.strict && summary.overall.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn listen(args: ListenArgs) -> Result<ExitCode> {
    let policy = load_policy(args.ranks.as_deref())?;
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!(
            "capprobe listen expects a JSON report on stdin (e.g. capprobe run --format json ... | capprobe listen)"
        );
    }

    let mut input = String::new();
    stdin
        .lock()
        .read_to_string(&mut input)
        .context("reading report from stdin")?;
    let report = parse_report(&input)?;
    let summary = summarize(&report, &policy);
    print_report(&report, &summary, OutputFormat::Text)?;
    Ok(ExitCode::SUCCESS)
}

/// Accept either the `{"report": ..., "summary": ...}` document `run` prints
/// or a bare report object.
fn parse_report(input: &str) -> Result<Report> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("No input provided on stdin");
    }
    let value: Value = serde_json::from_str(trimmed).context("parsing report JSON")?;
    let report: Report = serde_json::from_value(value.get("report").cloned().unwrap_or(value))
        .context("Unable to parse report")?;
    report.ensure_consistent()?;
    Ok(report)
}

fn load_policy(path: Option<&Path>) -> Result<RankPolicy> {
    match path {
        Some(path) => RankPolicy::load(path),
        None => Ok(RankPolicy::default()),
    }
}

fn print_report(report: &Report, summary: &ReportSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            render_report(report, summary, &mut output).context("rendering report")?;
            print!("{output}");
        }
        OutputFormat::Json => {
            let document = RunDocument { report, summary };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}
