// crates/phasebench-cli/src/main.rs
// ============================================================================
// Module: Phasebench CLI Entry Point
// Description: Command dispatcher for planning, running, validating, and
//              comparing phased load-test runs.
// Purpose: Provide a localized CLI with one exit-code translation point.
// Dependencies: clap, phasebench-config, phasebench-contract, phasebench-core,
//               phasebench-generator, serde, serde_jcs, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! Every command returns a [`CliResult`]. Failures carry the exit code of
//! their [`FailureKind`] and are converted into a process [`ExitCode`] in
//! exactly one place, [`main`]. All user-facing strings are routed through
//! the i18n catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap::error::ErrorKind;
use phasebench_cli::documents::DocumentError;
use phasebench_cli::documents::EXTENDED_FILE_NAME;
use phasebench_cli::documents::METRICS_FILE_NAME;
use phasebench_cli::documents::discover;
use phasebench_cli::documents::load_result_set;
use phasebench_cli::documents::read_json;
use phasebench_cli::documents::read_metrics_document;
use phasebench_cli::i18n::Locale;
use phasebench_cli::i18n::set_locale;
use phasebench_cli::t;
use phasebench_config::BenchConfig;
use phasebench_config::ConfigOverrides;
use phasebench_config::default_thresholds;
use phasebench_config::load_thresholds;
use phasebench_contract::DocumentKind;
use phasebench_contract::SchemaBackend;
use phasebench_contract::SchemaValidator;
use phasebench_contract::build_validator;
use phasebench_contract::load_validator;
use phasebench_core::CompareOutcome;
use phasebench_core::ComparisonReport;
use phasebench_core::EventSink;
use phasebench_core::FailureKind;
use phasebench_core::InvariantValidator;
use phasebench_core::LoadProfile;
use phasebench_core::MetricStatus;
use phasebench_core::MetricsDocument;
use phasebench_core::Phase;
use phasebench_core::PhasedRunner;
use phasebench_core::ToleranceMode;
use phasebench_core::TreeSummary;
use phasebench_core::runtime::FileEventSink;
use phasebench_core::runtime::StderrEventSink;
use phasebench_core::runtime::Metric;
use phasebench_core::runtime::compare_runs;
use phasebench_core::runtime::plan_phases;
use phasebench_core::runtime::planned_duration;
use phasebench_core::runtime::rfc3339_now;
use phasebench_generator::PerfOptions;
use phasebench_generator::PerfProfiler;
use phasebench_generator::WrkGenerator;
use phasebench_generator::WrkOptions;
use phasebench_generator::merge_side_channels;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "PHASEBENCH_LANG";
/// Subdirectory of a scenario directory receiving raw generator output.
const RAW_SUBDIR: &str = "raw";
/// Subdirectory of a scenario directory receiving profiler captures.
const PROFILE_SUBDIR: &str = "profiles";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "phasebench", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `PHASEBENCH_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved configuration and phase plan without running.
    Plan(PlanCommand),
    /// Execute a phased run and write its metrics documents.
    Run(RunCommand),
    /// Validate metrics documents against schema and invariants.
    Validate(ValidateCommand),
    /// Compare two result sets and flag regressions.
    Compare(CompareCommand),
    /// Merge per-phase side-channel documents into one summary.
    MergeMetrics(MergeMetricsCommand),
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Debug)]
struct OverrideArgs {
    /// Run for 5 seconds instead of the configured duration.
    #[arg(long, action = ArgAction::SetTrue)]
    quick: bool,
    /// Override the rate tolerance mode.
    #[arg(long, value_enum, value_name = "MODE")]
    tolerance: Option<ToleranceArg>,
    /// Override the results root directory.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

impl OverrideArgs {
    /// Converts the flags into configuration overrides.
    fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            quick: self.quick,
            tolerance: self.tolerance.map(Into::into),
            output_dir: self.output_dir.clone(),
        }
    }
}

/// Schema selection shared by `run` and `validate`.
#[derive(Args, Debug)]
struct SchemaArgs {
    /// Contract directory containing `schemas/`; built-in schemas when unset.
    #[arg(long, value_name = "DIR")]
    schema_dir: Option<PathBuf>,
    /// Schema validator backend.
    #[arg(long, value_enum, default_value_t = BackendArg::Jsonschema)]
    backend: BackendArg,
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
struct PlanCommand {
    /// Config file path (defaults to phasebench.toml or `PHASEBENCH_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Configuration overrides.
    #[command(flatten)]
    overrides: OverrideArgs,
    /// Emit the plan as canonical JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config file path (defaults to phasebench.toml or `PHASEBENCH_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Configuration overrides.
    #[command(flatten)]
    overrides: OverrideArgs,
    /// Schema selection.
    #[command(flatten)]
    schema: SchemaArgs,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// A metrics document or a directory searched non-recursively.
    #[arg(value_name = "PATH", required_unless_present = "all")]
    path: Option<PathBuf>,
    /// Search a directory tree recursively.
    #[arg(long, value_name = "DIR", conflicts_with = "path")]
    all: Option<PathBuf>,
    /// Also validate `metrics-extended.json` documents.
    #[arg(long, action = ArgAction::SetTrue)]
    extended: bool,
    /// Schema selection.
    #[command(flatten)]
    schema: SchemaArgs,
}

/// Arguments for `compare`.
#[derive(Args, Debug)]
struct CompareCommand {
    /// Base result set (document or results tree).
    #[arg(value_name = "BASE")]
    base: PathBuf,
    /// New result set (document or results tree).
    #[arg(value_name = "NEW")]
    new: PathBuf,
    /// Emit the comparison as canonical JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Threshold file (TOML or JSON); documented defaults when unset.
    #[arg(long, value_name = "FILE")]
    threshold: Option<PathBuf>,
}

/// Arguments for `merge-metrics`.
#[derive(Args, Debug)]
struct MergeMetricsCommand {
    /// Output path for the merged document.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
    /// Side-channel documents to merge.
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Tolerance modes accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum ToleranceArg {
    /// Abort on the first rate miss.
    Strict,
    /// Record rate misses and continue.
    Warn,
}

impl From<ToleranceArg> for ToleranceMode {
    fn from(value: ToleranceArg) -> Self {
        match value {
            ToleranceArg::Strict => Self::Strict,
            ToleranceArg::Warn => Self::Warn,
        }
    }
}

/// Schema validator backends accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum BackendArg {
    /// Full JSON Schema implementation.
    Jsonschema,
    /// Field-by-field fallback.
    Manual,
}

impl From<BackendArg> for SchemaBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Jsonschema => Self::JsonSchema,
            BackendArg::Manual => Self::Manual,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a localized message and its exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Process exit code.
    code: u8,
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs an error for a classified failure.
    const fn from_kind(kind: FailureKind, message: String) -> Self {
        Self {
            code: kind.exit_code(),
            message,
        }
    }

    /// Constructs an error for unclassified failures (exit code 1).
    const fn general(message: String) -> Self {
        Self {
            code: 1,
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let Some(cli) = parse_cli(std::env::args_os())? else {
        return Ok(ExitCode::SUCCESS);
    };
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        stderr_line(&t!("i18n.disclaimer.machine_translated"))?;
    }

    if cli.show_version {
        stdout_line(&t!("main.version", version = env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Plan(command) => command_plan(&command),
        Commands::Run(command) => command_run(&command),
        Commands::Validate(command) => command_validate(&command),
        Commands::Compare(command) => command_compare(&command),
        Commands::MergeMetrics(command) => command_merge_metrics(&command),
    }
}

/// Parses command-line arguments without letting clap exit the process.
///
/// Help and version requests are printed and yield `None`; every usage error
/// becomes a general failure so exit codes stay reserved for failure kinds.
fn parse_cli<I, T>(args: I) -> CliResult<Option<Cli>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                stdout_line(err.render().to_string().trim_end())?;
                Ok(None)
            }
            _ => Err(CliError::general(err.render().to_string().trim_end().to_string())),
        },
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::general(output_error("stdout", &err)))?;
    stdout_line("")
}

// ============================================================================
// SECTION: Plan Command
// ============================================================================

/// Machine-readable plan output.
#[derive(Serialize)]
struct PlanOutput<'a> {
    /// Scenario name.
    scenario: &'a str,
    /// Load profile.
    profile: LoadProfile,
    /// Tolerance mode.
    tolerance: ToleranceMode,
    /// Sum of phase durations.
    total_duration_seconds: u64,
    /// Planned phases in order.
    phases: &'a [Phase],
}

/// Executes the `plan` command.
fn command_plan(command: &PlanCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), &command.overrides)?;
    let phases = plan_phases(config.load.profile, &config.load.profile_params()).map_err(|err| {
        CliError::from_kind(FailureKind::Configuration, t!("plan.failed", error = err))
    })?;
    let total = planned_duration(&phases);

    if command.json {
        write_json_stdout(&PlanOutput {
            scenario: &config.scenario.name,
            profile: config.load.profile,
            tolerance: config.verification.tolerance,
            total_duration_seconds: total,
            phases: &phases,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    stdout_line(&t!(
        "plan.header",
        scenario = config.scenario.name,
        profile = config.load.profile,
        tolerance = config.verification.tolerance.as_str()
    ))?;
    stdout_line(&t!(
        "plan.target",
        url = config.target.url,
        threads = config.load.threads,
        connections = config.load.connections
    ))?;
    stdout_line(&t!("plan.phases", count = phases.len(), duration = total))?;
    for (index, phase) in phases.iter().enumerate() {
        stdout_line(&t!(
            "plan.phase",
            index = index,
            label = phase.label,
            rate = phase.target_rate,
            duration = phase.duration_seconds
        ))?;
    }
    if config.profiling.enabled {
        let target = config.profiling.phase.clone().unwrap_or_else(|| t!("plan.profiling.last"));
        stdout_line(&t!("plan.profiling", phase = target))?;
    }
    stdout_line(&t!("plan.output", dir = config.scenario_dir().display()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), &command.overrides)?;
    let backend = SchemaBackend::from(command.schema.backend);
    let schema_dir = command.schema.schema_dir.as_deref();
    let metrics_schema = schema_validator(backend, schema_dir, DocumentKind::Metrics)?;
    let extended_schema = schema_validator(backend, schema_dir, DocumentKind::Extended)?;

    let settings = config.to_run_settings();
    let scenario_dir = config.scenario_dir();
    fs::create_dir_all(&scenario_dir).map_err(|err| {
        CliError::from_kind(
            FailureKind::Configuration,
            t!("run.output_dir_failed", path = scenario_dir.display(), error = err),
        )
    })?;
    let sink = open_event_sink(&config)?;
    let mut generator = WrkGenerator::new(wrk_options(&config, &scenario_dir));
    let mut profiler = config.profiling.enabled.then(|| {
        PerfProfiler::new(PerfOptions {
            binary: PathBuf::from(&config.profiling.binary),
            frequency: config.profiling.frequency,
            output_dir: scenario_dir.join(PROFILE_SUBDIR),
        })
    });

    let mut runner = PhasedRunner::new(&mut generator, sink.as_ref());
    if let Some(profiler) = profiler.as_mut() {
        runner = runner.with_profiler(profiler);
    }
    let record = runner.run(&settings, &rfc3339_now()).map_err(|err| {
        let kind = err.kind();
        CliError::from_kind(kind, t!("run.failed", kind = kind.as_str(), error = err))
    })?;

    let metrics_path = scenario_dir.join(METRICS_FILE_NAME);
    let metrics_value = document_value(&record.document, &t!("schema.kind.metrics"))?;
    write_document(&metrics_path, &metrics_value)?;
    let mut recording = Vec::new();
    recording.extend(metrics_schema.validate(&metrics_value));
    let invariants = InvariantValidator::default().validate(&record.document);
    recording.extend(
        invariants
            .violations
            .iter()
            .map(|violation| format!("{}: {}", violation.invariant, violation.message)),
    );
    let mut written = vec![metrics_path];

    if let Some(extended) = &record.extended {
        let extended_path = scenario_dir.join(EXTENDED_FILE_NAME);
        let extended_value = document_value(extended, &t!("schema.kind.extended"))?;
        write_document(&extended_path, &extended_value)?;
        recording.extend(
            extended_schema
                .validate(&extended_value)
                .into_iter()
                .map(|issue| format!("{EXTENDED_FILE_NAME}: {issue}")),
        );
        written.push(extended_path);
    }
    for path in &written {
        stdout_line(&t!("run.written", path = path.display()))?;
    }

    if !recording.is_empty() {
        let mut message =
            t!("run.recording_failed", path = scenario_dir.display(), count = recording.len());
        for issue in &recording {
            message.push('\n');
            message.push_str(&t!("run.reason", reason = issue));
        }
        return Err(CliError::from_kind(FailureKind::Recording, message));
    }

    stdout_line(&run_summary(&record.document))?;
    if record.document.status.is_failed() {
        let mut message = t!("run.measurement_failed");
        for reason in &record.document.status.reasons {
            message.push('\n');
            message.push_str(&t!("run.reason", reason = reason));
        }
        return Err(CliError::from_kind(FailureKind::Measurement, message));
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds generator options from the configuration.
fn wrk_options(config: &BenchConfig, scenario_dir: &Path) -> WrkOptions {
    let mut options = WrkOptions::new(&config.generator.binary, scenario_dir.join(RAW_SUBDIR));
    options.grace_seconds = config.generator.grace_seconds;
    options.floor_rate = config.generator.floor_rate;
    options.side_channel = config.generator.side_channel;
    options
}

/// Opens the configured event sink: the event log when set, else stderr.
fn open_event_sink(config: &BenchConfig) -> CliResult<Box<dyn EventSink>> {
    let Some(path) = &config.output.event_log else {
        return Ok(Box::new(StderrEventSink));
    };
    let open = || -> std::io::Result<FileEventSink> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        FileEventSink::new(path)
    };
    let sink = open().map_err(|err| {
        CliError::from_kind(
            FailureKind::Configuration,
            t!("run.event_log_failed", path = path.display(), error = err),
        )
    })?;
    Ok(Box::new(sink))
}

/// Serializes a produced document.
fn document_value<T: Serialize>(document: &T, kind: &str) -> CliResult<Value> {
    serde_json::to_value(document).map_err(|err| {
        CliError::from_kind(
            FailureKind::Recording,
            t!("run.serialize_failed", kind = kind, error = err),
        )
    })
}

/// Writes a produced document to disk.
fn write_document(path: &Path, value: &Value) -> CliResult<()> {
    write_json_file(path, value).map_err(|err| {
        CliError::from_kind(
            FailureKind::Recording,
            t!("run.write_failed", path = path.display(), error = err),
        )
    })
}

/// Renders the one-line run summary.
fn run_summary(document: &MetricsDocument) -> String {
    let results = &document.results;
    t!(
        "run.summary",
        outcome = document.status.outcome.as_str(),
        requests = results.requests,
        rps = format!("{:.2}", results.rps),
        p99 = results
            .latency_ms
            .p99
            .map_or_else(|| t!("compare.delta.unavailable"), |p99| format!("{p99:.2}ms")),
        error_rate = results
            .error_rate
            .map_or_else(|| t!("compare.delta.unavailable"), |rate| format!("{rate:.4}"))
    )
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes the `validate` command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let targets = validation_targets(command)?;
    let root = command.all.as_deref().or(command.path.as_deref()).unwrap_or_else(|| Path::new("."));
    if targets.is_empty() {
        stderr_line(&t!("validate.none_found", path = root.display()))?;
        return Ok(ExitCode::FAILURE);
    }

    let backend = SchemaBackend::from(command.schema.backend);
    let schema_dir = command.schema.schema_dir.as_deref();
    let metrics_schema = schema_validator(backend, schema_dir, DocumentKind::Metrics)?;
    let extended_schema = if targets.iter().any(|(_, kind)| *kind == DocumentKind::Extended) {
        Some(schema_validator(backend, schema_dir, DocumentKind::Extended)?)
    } else {
        None
    };
    let invariants = InvariantValidator::default();

    let mut summary = TreeSummary::default();
    for (path, kind) in &targets {
        let issues = match (kind, &extended_schema) {
            (DocumentKind::Extended, Some(schema)) => check_extended(path, schema.as_ref()),
            _ => check_metrics(path, metrics_schema.as_ref(), &invariants),
        };
        summary.record(issues.is_empty());
        if issues.is_empty() {
            stdout_line(&t!("validate.pass", path = path.display()))?;
        } else {
            stdout_line(&t!("validate.fail", path = path.display()))?;
            for issue in &issues {
                stdout_line(&t!("validate.issue", message = issue))?;
            }
        }
    }
    stdout_line(&t!("validate.summary", passed = summary.passed, failed = summary.failed))?;
    Ok(if summary.all_passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Resolves the documents to validate with their kinds, sorted by path.
fn validation_targets(command: &ValidateCommand) -> CliResult<Vec<(PathBuf, DocumentKind)>> {
    let (root, recursive) = match (&command.all, &command.path) {
        (Some(dir), _) => (dir.as_path(), true),
        (None, Some(path)) => (path.as_path(), false),
        (None, None) => return Ok(Vec::new()),
    };
    if root.is_file() {
        let kind = if root.file_name().is_some_and(|name| name == EXTENDED_FILE_NAME) {
            DocumentKind::Extended
        } else {
            DocumentKind::Metrics
        };
        return Ok(vec![(root.to_path_buf(), kind)]);
    }
    let missing =
        |err: DocumentError| CliError::from_kind(FailureKind::MissingInput, err.to_string());
    let mut targets: Vec<(PathBuf, DocumentKind)> = discover(root, METRICS_FILE_NAME, recursive)
        .map_err(missing)?
        .into_iter()
        .map(|path| (path, DocumentKind::Metrics))
        .collect();
    if command.extended {
        targets.extend(
            discover(root, EXTENDED_FILE_NAME, recursive)
                .map_err(missing)?
                .into_iter()
                .map(|path| (path, DocumentKind::Extended)),
        );
    }
    targets.sort_by(|left, right| left.0.cmp(&right.0));
    Ok(targets)
}

/// Returns every schema and invariant problem of a metrics document.
fn check_metrics(
    path: &Path,
    schema: &dyn SchemaValidator,
    invariants: &InvariantValidator,
) -> Vec<String> {
    let value = match read_json(path) {
        Ok(value) => value,
        Err(err) => return vec![err.to_string()],
    };
    let mut issues = schema.validate(&value);
    match serde_json::from_value::<MetricsDocument>(value) {
        Ok(document) => issues.extend(
            invariants
                .validate(&document)
                .violations
                .into_iter()
                .map(|violation| format!("{}: {}", violation.invariant, violation.message)),
        ),
        Err(err) if issues.is_empty() => issues.push(err.to_string()),
        Err(_) => {}
    }
    issues
}

/// Returns every schema problem of an extended document.
fn check_extended(path: &Path, schema: &dyn SchemaValidator) -> Vec<String> {
    match read_json(path) {
        Ok(value) => schema.validate(&value),
        Err(err) => vec![err.to_string()],
    }
}

// ============================================================================
// SECTION: Compare Command
// ============================================================================

/// Machine-readable comparison output.
#[derive(Serialize)]
struct CompareOutput<'a> {
    /// Terminal outcome.
    outcome: CompareOutcome,
    /// Full report.
    #[serde(flatten)]
    report: &'a ComparisonReport,
}

/// Executes the `compare` command.
fn command_compare(command: &CompareCommand) -> CliResult<ExitCode> {
    let thresholds = match &command.threshold {
        Some(path) => load_thresholds(path).map_err(|err| {
            CliError::from_kind(
                FailureKind::Configuration,
                t!("compare.threshold_failed", error = err),
            )
        })?,
        None => default_thresholds(),
    };
    let base = load_side(&command.base, &t!("compare.side.base"))?;
    let new = load_side(&command.new, &t!("compare.side.new"))?;
    let report = compare_runs(&base, &new, &thresholds);
    let outcome = report.outcome();

    if command.json {
        write_json_stdout(&CompareOutput {
            outcome,
            report: &report,
        })?;
    } else {
        render_comparison(&report, outcome)?;
    }
    Ok(outcome.failure_kind().map_or(ExitCode::SUCCESS, |kind| ExitCode::from(kind.exit_code())))
}

/// Loads one side of a comparison, warning about duplicate scenarios.
fn load_side(
    path: &Path,
    side: &str,
) -> CliResult<BTreeMap<String, MetricsDocument>> {
    let set = load_result_set(path).map_err(|err| {
        CliError::from_kind(
            FailureKind::MissingInput,
            t!("compare.input_failed", side = side, error = err),
        )
    })?;
    for duplicate in &set.duplicates {
        let scenario = read_metrics_document(duplicate)
            .map(|document| document.scenario.name)
            .unwrap_or_default();
        stderr_line(&t!("compare.duplicate", path = duplicate.display(), scenario = scenario))?;
    }
    Ok(set.documents)
}

/// Renders the text comparison report.
fn render_comparison(report: &ComparisonReport, outcome: CompareOutcome) -> CliResult<()> {
    for result in &report.results {
        stdout_line(&t!(
            "compare.scenario",
            scenario = result.scenario,
            status = status_label(result.worst_status())
        ))?;
        if result.new_run_failed {
            stdout_line(&t!("compare.new_failed"))?;
        }
        for delta in &result.deltas {
            stdout_line(&t!(
                "compare.metric",
                metric = delta.metric.as_str(),
                delta = format_delta(delta.metric, delta.delta),
                status = status_label(delta.status)
            ))?;
        }
    }
    if !report.only_in_base.is_empty() {
        stdout_line(&t!("compare.only_base", scenarios = report.only_in_base.join(", ")))?;
    }
    if !report.only_in_new.is_empty() {
        stdout_line(&t!("compare.only_new", scenarios = report.only_in_new.join(", ")))?;
    }
    let closing = match outcome {
        CompareOutcome::Success | CompareOutcome::MissingInput => t!("compare.outcome.success"),
        CompareOutcome::NoComparableResults => t!("compare.outcome.no_comparable"),
        CompareOutcome::RegressionDetected => t!("compare.outcome.regression"),
    };
    stdout_line(&closing)
}

/// Formats a signed delta; error rate is in percentage points.
fn format_delta(metric: Metric, delta: Option<f64>) -> String {
    let Some(delta) = delta else {
        return t!("compare.delta.unavailable");
    };
    match metric {
        Metric::ErrorRate => format!("{delta:+.2}pp"),
        Metric::P90 | Metric::P99 | Metric::Rps => format!("{delta:+.2}%"),
    }
}

/// Returns the stable label for a metric status.
const fn status_label(status: MetricStatus) -> &'static str {
    match status {
        MetricStatus::Ok => "ok",
        MetricStatus::Warning => "warning",
        MetricStatus::Error => "error",
    }
}

// ============================================================================
// SECTION: Merge Metrics Command
// ============================================================================

/// Executes the `merge-metrics` command.
fn command_merge_metrics(command: &MergeMetricsCommand) -> CliResult<ExitCode> {
    let report = merge_side_channels(&command.inputs)
        .map_err(|err| CliError::general(t!("merge.failed", error = err)))?;
    for warning in &report.warnings {
        stderr_line(&t!("merge.warning", message = warning))?;
    }
    write_json_file(&command.output, &report.merged).map_err(|err| {
        CliError::general(t!("merge.write_failed", path = command.output.display(), error = err))
    })?;
    stdout_line(&t!(
        "merge.summary",
        accepted = report.accepted.len(),
        total = command.inputs.len(),
        path = command.output.display()
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Loads configuration and applies command-line overrides.
fn load_config(path: Option<&Path>, overrides: &OverrideArgs) -> CliResult<BenchConfig> {
    let config = BenchConfig::load(path).map_err(|err| {
        CliError::from_kind(FailureKind::Configuration, t!("config.load_failed", error = err))
    })?;
    config.with_overrides(&overrides.to_overrides()).map_err(|err| {
        CliError::from_kind(FailureKind::Configuration, t!("config.override_failed", error = err))
    })
}

/// Compiles the schema for a document kind from a directory or the built-ins.
fn schema_validator(
    backend: SchemaBackend,
    schema_dir: Option<&Path>,
    kind: DocumentKind,
) -> CliResult<Box<dyn SchemaValidator>> {
    let compiled = match schema_dir {
        Some(dir) => load_validator(backend, dir, kind),
        None => build_validator(backend, &kind.builtin_schema()),
    };
    compiled.map_err(|err| {
        let label = match kind {
            DocumentKind::Metrics => t!("schema.kind.metrics"),
            DocumentKind::Extended => t!("schema.kind.extended"),
        };
        CliError::from_kind(
            FailureKind::Configuration,
            t!("schema.load_failed", kind = label, error = err),
        )
    })
}

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::general(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

/// Writes pretty JSON with a trailing newline, creating parent directories.
fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|err| err.to_string())?;
    bytes.push(b'\n');
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    fs::write(path, bytes).map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes canonical JSON to stdout.
fn write_json_stdout<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::general(t!("compare.render_failed", error = err)))?;
    bytes.push(b'\n');
    std::io::stdout()
        .write_all(&bytes)
        .map_err(|err| CliError::general(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::general(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
        .map_err(|err| CliError::general(output_error("stderr", &err)))
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns its exit code.
fn emit_error(error: &CliError) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "{}", error.message);
    ExitCode::from(error.code)
}
