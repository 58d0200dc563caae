// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use streamio_config::{BenchScript, ParamOverrides};
use streamio_core::{
    builtin_scenarios, run_batch, BatchReport, ErrorKind, IoController, IoParams, MetricsSummary,
    RunMetrics, RunOptions, Scenario, Testbench,
};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "StreamIO verification runner",
    long_about = None
)]
struct Cli {
    /// Log every streamed word and register access
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in regression batch.
    Builtin(RunArgs),

    /// Run the scenarios of a bench script (YAML).
    Run(ScriptArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Base seed. Scenario i of the batch runs with seed + i.
    #[arg(long)]
    seed: Option<u64>,

    /// Ceiling on streaming ticks spent waiting for the done pulse
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Hardware parameter override (repeatable), e.g. BANK_ADDR_WIDTH=12
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Keep running the remaining scenarios after a failure
    #[arg(long)]
    continue_on_failure: bool,

    /// Directory to write run artifacts (result.json)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write the final testbench state (JSON) to this path
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ScriptArgs {
    /// Path to the bench script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    #[command(flatten)]
    run: RunArgs,
}

/// Everything needed to start a batch, resolved from script and flags.
#[derive(Debug)]
struct Batch {
    params: IoParams,
    scenarios: Vec<Scenario>,
    options: RunOptions,
}

#[derive(Debug, Serialize)]
struct RunResult<'a> {
    result_schema_version: &'static str,
    status: &'static str,
    duration_ms: u128,
    ticks_per_second: f64,
    metrics: MetricsSummary,
    report: &'a BatchReport,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let (batch, args) = match &cli.command {
        Commands::Builtin(args) => (builtin_batch(args), args),
        Commands::Run(args) => (script_batch(args), &args.run),
    };

    match batch {
        Ok(batch) => execute(batch, args),
        Err(e) => {
            error!("Configuration error: {:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn parse_overrides(assignments: &[String]) -> Result<ParamOverrides> {
    let mut overrides = ParamOverrides::default();
    for assignment in assignments {
        overrides
            .apply_assignment(assignment)
            .with_context(|| format!("Invalid --param '{}'", assignment))?;
    }
    Ok(overrides)
}

fn resolve_params(overrides: &ParamOverrides) -> Result<IoParams> {
    let params = IoParams::with_overrides(overrides);
    params.validate().context("Invalid hardware parameters")?;
    Ok(params)
}

/// Command-line flags win over the script, which wins over the defaults.
fn resolve_options(args: &RunArgs, base: RunOptions) -> Result<RunOptions> {
    let options = RunOptions {
        seed: args.seed.unwrap_or(base.seed),
        max_ticks: args.max_ticks.unwrap_or(base.max_ticks),
        continue_on_failure: base.continue_on_failure || args.continue_on_failure,
    };
    if options.max_ticks == 0 {
        anyhow::bail!("--max-ticks must be greater than zero");
    }
    Ok(options)
}

fn builtin_batch(args: &RunArgs) -> Result<Batch> {
    let params = resolve_params(&parse_overrides(&args.params)?)?;
    Ok(Batch {
        params,
        scenarios: builtin_scenarios(&params),
        options: resolve_options(args, RunOptions::default())?,
    })
}

fn script_batch(args: &ScriptArgs) -> Result<Batch> {
    let script = BenchScript::from_file(&args.script)?;

    let mut overrides = script.params.clone();
    overrides.merge(&parse_overrides(&args.run.params)?);
    let params = resolve_params(&overrides)?;

    let mut scenarios = if script.include_builtin {
        builtin_scenarios(&params)
    } else {
        Vec::new()
    };
    scenarios.extend(script.scenarios.iter().map(Scenario::from_spec));

    let base = RunOptions {
        seed: script.seed.unwrap_or(RunOptions::default().seed),
        max_ticks: script.limits.max_ticks,
        continue_on_failure: script.limits.continue_on_failure,
    };
    Ok(Batch {
        params,
        scenarios,
        options: resolve_options(&args.run, base)?,
    })
}

fn execute(batch: Batch, args: &RunArgs) -> ExitCode {
    let mut tb = match Testbench::new(IoController::new(&batch.params), &batch.params) {
        Ok(tb) => tb,
        Err(e) => {
            error!("Failed to build testbench: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let metrics = Arc::new(RunMetrics::new());
    tb.add_observer(metrics.clone());

    info!(
        "Running {} scenario(s): {} channels, {} banks, seed {}",
        batch.scenarios.len(),
        batch.params.channel_count,
        batch.params.bank_count,
        batch.options.seed
    );
    let started = Instant::now();
    let report = run_batch(&mut tb, &batch.scenarios, &batch.options);
    let duration = started.elapsed();

    for s in &report.scenarios {
        let status = if s.passed { "PASS" } else { "FAIL" };
        match &s.error {
            Some(e) => info!("[{}] {} ({} ticks): {}", status, s.name, s.ticks, e),
            None => info!("[{}] {} ({} ticks)", status, s.name, s.ticks),
        }
    }
    let skipped = batch.scenarios.len() - report.scenarios.len();
    if skipped > 0 {
        info!("{} scenario(s) not run", skipped);
    }

    let summary = metrics.summary();
    info!(
        "{} ticks ({} stalled) in {:.2?}, {:.0} ticks/s",
        summary.ticks,
        summary.stall_ticks,
        duration,
        metrics.get_tps()
    );

    if let Some(output_dir) = &args.output_dir {
        let result = RunResult {
            result_schema_version: RESULT_SCHEMA_VERSION,
            status: if report.passed { "pass" } else { "fail" },
            duration_ms: duration.as_millis(),
            ticks_per_second: metrics.get_tps(),
            metrics: summary,
            report: &report,
        };
        if let Err(e) = write_result(output_dir, &result) {
            error!("{:#}", e);
        }
    }

    if let Some(path) = &args.snapshot {
        if let Err(e) = write_json(path, &tb.snapshot()) {
            error!("{:#}", e);
        }
    }

    ExitCode::from(exit_code_for(&report))
}

fn exit_code_for(report: &BatchReport) -> u8 {
    if report.passed {
        return EXIT_PASS;
    }
    match report.failure_kind() {
        Some(ErrorKind::Verification) => EXIT_ASSERT_FAIL,
        Some(ErrorKind::Configuration) => EXIT_CONFIG_ERROR,
        Some(ErrorKind::Runtime) | None => EXIT_RUNTIME_ERROR,
    }
}

fn write_result(output_dir: &Path, result: &RunResult<'_>) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    write_json(&output_dir.join("result.json"), result)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Wrote {:?}", path);
    Ok(())
}
