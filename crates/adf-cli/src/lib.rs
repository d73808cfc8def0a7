#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use adf_diff::report::{comparison_header, diagnostic_line, write_norms};
use adf_diff::{
    ArraySource, ComparisonLogEntry, ComparisonReport, ComparisonRequest, DiffError,
    ElementDiagnostic, FAILURE_MESSAGE, Thresholds, Verdict, compare, maybe_append_comparison_log,
    resolve_arrays, write_report,
};
use clap::Parser;

pub const EXIT_PASS: u8 = 0;
pub const EXIT_FAIL: u8 = 1;

/// Compare two numeric data arrays under absolute and relative error
/// thresholds.
///
/// The comparison fails when the largest absolute error and the largest
/// relative error both exceed their thresholds.
#[derive(Debug, Clone, Parser)]
#[command(name = "arraydiff", version)]
pub struct Cli {
    /// Path to the first dataset (.npz, .npy, .txt, .dat or .csv).
    #[arg(value_name = "INPUT_A")]
    pub input_a: PathBuf,

    /// Path to the second dataset. Defaults to the first.
    #[arg(value_name = "INPUT_B")]
    pub input_b: Option<PathBuf>,

    /// First data array name for comparison.
    #[arg(short = 'a', long = "first_data_array", value_name = "NAME")]
    pub first_data_array: String,

    /// Second data array name for comparison.
    #[arg(short = 'b', long = "second_data_array", value_name = "NAME")]
    pub second_data_array: String,

    /// Suppress all but error output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Also print which values differ.
    #[arg(short, long)]
    pub verbose: bool,

    /// Tolerance for the absolute error in the maximum norm.
    #[arg(
        long = "abs",
        value_name = "FLOAT",
        default_value_t = f64::EPSILON,
        allow_negative_numbers = true
    )]
    pub abs_err_thr: f64,

    /// Tolerance for the componentwise relative error.
    #[arg(
        long = "rel",
        value_name = "FLOAT",
        default_value_t = f64::EPSILON,
        allow_negative_numbers = true
    )]
    pub rel_err_thr: f64,

    /// Write the full norm report as JSON.
    #[arg(long = "report", value_name = "PATH")]
    pub report_path: Option<PathBuf>,

    /// Append a JSONL record of this run (falls back to ADF_COMPARISON_LOG_PATH).
    #[arg(long = "log-path", value_name = "PATH")]
    pub log_path: Option<PathBuf>,
}

/// Everything one comparison run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    pub request: ComparisonRequest,
    pub thresholds: Thresholds,
    pub quiet: bool,
    pub verbose: bool,
    pub report_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
}

impl TryFrom<Cli> for DiffOptions {
    type Error = DiffError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        Ok(Self {
            thresholds: Thresholds::new(cli.abs_err_thr, cli.rel_err_thr)?,
            request: ComparisonRequest {
                input_a: cli.input_a,
                input_b: cli.input_b,
                array_a: cli.first_data_array,
                array_b: cli.second_data_array,
            },
            quiet: cli.quiet,
            verbose: cli.verbose,
            report_path: cli.report_path,
            log_path: cli.log_path,
        })
    }
}

/// Run one comparison, writing human output to `out`.
///
/// A finished comparison returns its verdict whether it passed or not; the
/// caller maps that to an exit code. The run is logged even when it errors.
pub fn run<S, W>(source: &S, options: &DiffOptions, out: &mut W) -> Result<Verdict, DiffError>
where
    S: ArraySource + ?Sized,
    W: Write,
{
    let mut entry = ComparisonLogEntry::new(&options.request, &options.thresholds);
    let result = compare_inputs(source, options, out, &mut entry);
    match &result {
        Ok(verdict) => entry.record_verdict(verdict),
        Err(err) => entry.record_error(err),
    }
    let logged = maybe_append_comparison_log(options.log_path.as_deref(), &entry);
    let verdict = result?;
    logged?;
    Ok(verdict)
}

fn compare_inputs<S, W>(
    source: &S,
    options: &DiffOptions,
    out: &mut W,
    entry: &mut ComparisonLogEntry,
) -> Result<Verdict, DiffError>
where
    S: ArraySource + ?Sized,
    W: Write,
{
    let resolved = resolve_arrays(source, &options.request)?;
    entry.record_arrays(&resolved);

    if !options.quiet {
        writeln!(out, "{}", comparison_header(&options.request)).map_err(stdout_failure)?;
    }

    let mut write_failure: Option<io::Error> = None;
    let verdict = if options.verbose {
        let mut print = |diagnostic: ElementDiagnostic| {
            if write_failure.is_none() {
                if let Err(err) = writeln!(out, "{}", diagnostic_line(&diagnostic)) {
                    write_failure = Some(err);
                }
            }
        };
        compare(&resolved.a, &resolved.b, &options.thresholds, Some(&mut print))?
    } else {
        compare(&resolved.a, &resolved.b, &options.thresholds, None)?
    };
    if let Some(err) = write_failure {
        return Err(stdout_failure(err));
    }

    if !options.quiet {
        write_norms(out, &verdict).map_err(stdout_failure)?;
        if !verdict.passed {
            writeln!(out, "{FAILURE_MESSAGE}").map_err(stdout_failure)?;
        }
    }

    if let Some(path) = &options.report_path {
        let report =
            ComparisonReport::new(&options.request, &resolved, options.thresholds, &verdict);
        write_report(path, &report)?;
    }
    Ok(verdict)
}

fn stdout_failure(err: io::Error) -> DiffError {
    DiffError::OutputWrite(err.to_string())
}
