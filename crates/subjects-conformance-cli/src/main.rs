// crates/subjects-conformance-cli/src/main.rs
// ============================================================================
// Module: Subjects Conformance CLI Entry Point
// Description: Runs the conformance scenario suite against a live API.
// Purpose: Provide a localized runner with scenario selection and reports.
// Dependencies: clap, subjects-conformance-config, subjects-conformance-core, thiserror.
// ============================================================================

//! ## Overview
//! `subjects-conformance` loads the harness configuration, selects scenarios
//! by exact name or substring, runs them in order and prints one verdict line
//! per scenario plus a summary. The exit code is success only when no
//! scenario failed or errored; skips do not affect it.
//!
//! Security posture: the configuration carries a client secret; it is never
//! echoed and harness events are redacted by the engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Parser;
use clap::ValueEnum;
use subjects_conformance_cli::i18n::Locale;
use subjects_conformance_cli::i18n::SUPPORTED_LOCALES;
use subjects_conformance_cli::i18n::set_locale;
use subjects_conformance_cli::t;
use subjects_conformance_config::HarnessConfig;
use subjects_conformance_core::EventSink;
use subjects_conformance_core::FileEventSink;
use subjects_conformance_core::NoopEventSink;
use subjects_conformance_core::ScenarioId;
use subjects_conformance_core::ScenarioResult;
use subjects_conformance_core::ScenarioStatus;
use subjects_conformance_core::StderrEventSink;
use subjects_conformance_core::SuiteContext;
use subjects_conformance_core::SuiteReport;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "SUBJECTS_CONFORMANCE_LANG";
/// `--events` value that routes harness events to stderr.
const EVENTS_STDERR: &str = "-";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "subjects-conformance", disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Path to the harness configuration (JSON or TOML).
    #[arg(short = 'i', long = "config-path", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// List the available scenarios and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,
    /// Directory receiving `summary.json` and `summary.md`.
    #[arg(long, value_name = "DIR")]
    report: Option<PathBuf>,
    /// Append harness events as JSON lines to PATH (`-` for stderr).
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,
    /// Preferred output language (overrides `SUBJECTS_CONFORMANCE_LANG`).
    #[arg(long, value_enum, value_name = "LANG")]
    lang: Option<LangArg>,
    /// Scenario names or substrings to run (default: all).
    #[arg(value_name = "SCENARIO")]
    scenarios: Vec<String>,
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

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
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
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches to listing or a suite run.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.list {
        command_list()?;
        return Ok(ExitCode::SUCCESS);
    }

    command_run(&cli)
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints every scenario with its description.
fn command_list() -> CliResult<()> {
    write_stdout_line(&t!("list.header"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    for scenario in ScenarioId::ALL {
        write_stdout_line(&t!(
            "list.entry",
            name = scenario.name(),
            description = scenario.description()
        ))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(())
}

/// Loads configuration, runs the selected scenarios and writes reports.
fn command_run(cli: &Cli) -> CliResult<ExitCode> {
    let scenarios = ScenarioId::select(&cli.scenarios)
        .map_err(|err| CliError::new(t!("select.unknown", filter = err.0)))?;
    let config = HarnessConfig::load(cli.config_path.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let events = open_event_sink(cli.events.as_deref())?;

    write_stdout_line(&t!(
        "suite.target",
        url = config.resource_url(),
        count = scenarios.len()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    let mut suite = SuiteContext::new(&config, events.as_ref())
        .map_err(|err| CliError::new(t!("suite.init_failed", error = err)))?;
    let report = suite.run_all(&scenarios);
    for result in &report.results {
        for line in render_result(result) {
            write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    write_stdout_line(&t!("suite.summary", summary = report.summary_line()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    if let Some(dir) = &cli.report {
        write_report(&report, dir)?;
    }

    let verdict = if report.success() {
        t!("suite.verdict.passed")
    } else {
        t!("suite.verdict.failed")
    };
    write_stdout_line(&verdict).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(if report.success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the output locale from the flag, then the environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            let expected = SUPPORTED_LOCALES
                .iter()
                .map(|locale| format!("'{}'", locale.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            CliError::new(t!(
                "i18n.lang.invalid_env",
                env = LANG_ENV,
                value = value,
                expected = expected
            ))
        });
    }
    Ok(Locale::En)
}

/// Opens the event sink selected by `--events`.
fn open_event_sink(target: Option<&Path>) -> CliResult<Box<dyn EventSink>> {
    match target {
        None => Ok(Box::new(NoopEventSink)),
        Some(path) if path.as_os_str() == EVENTS_STDERR => Ok(Box::new(StderrEventSink)),
        Some(path) => FileEventSink::new(path)
            .map(|sink| Box::new(sink) as Box<dyn EventSink>)
            .map_err(|err| {
                CliError::new(t!("events.open_failed", path = path.display(), error = err))
            }),
    }
}

/// Renders the output lines for one scenario result.
fn render_result(result: &ScenarioResult) -> Vec<String> {
    let mut lines = vec![t!(
        "scenario.result",
        status = status_label(result.status),
        scenario = result.scenario.name(),
        duration_ms = result.duration_ms
    )];
    if let Some(schema) = &result.schema {
        if let Some(message) = &schema.top_level {
            lines.push(t!("scenario.schema.top_level", message = message));
        }
        for violation in &schema.violations {
            lines.push(t!(
                "scenario.schema.record",
                index = violation.index,
                reason = violation.reason
            ));
        }
        if !schema.missing_subjects.is_empty() {
            lines.push(t!("scenario.schema.missing", codes = schema.missing_subjects.join(", ")));
        }
    } else if let Some(message) = &result.message {
        lines.push(t!("scenario.detail", message = message));
    }
    lines
}

/// Returns the localized label for a scenario status.
fn status_label(status: ScenarioStatus) -> String {
    match status {
        ScenarioStatus::Passed => t!("status.passed"),
        ScenarioStatus::Failed => t!("status.failed"),
        ScenarioStatus::Errored => t!("status.errored"),
        ScenarioStatus::Skipped => t!("status.skipped"),
    }
}

/// Writes the JSON and Markdown summaries into `dir`.
fn write_report(report: &SuiteReport, dir: &Path) -> CliResult<()> {
    let written = report.write_to_dir(dir).map_err(|err| {
        CliError::new(t!("report.write_failed", path = dir.display(), error = err))
    })?;
    for path in written {
        write_stdout_line(&t!("report.written", path = path.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(())
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
