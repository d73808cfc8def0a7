use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::compute::ElementDiagnostic;
use crate::error::DiffError;
use crate::source::{ComparisonRequest, ResolvedArrays};
use crate::verdict::{Thresholds, Verdict};

pub const FAILURE_MESSAGE: &str =
    "Absolute and relative error (maximum norm) are larger than the corresponding thresholds.";

pub const REPORT_SCHEMA_VERSION: u8 = 1;

/// Scientific notation with 15 fractional digits and an exponent of at least
/// two digits, e.g. `1.000000000000000e-01`.
#[must_use]
pub fn format_scientific(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let raw = format!("{value:.15e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i32>().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
        }
        None => raw,
    }
}

#[must_use]
pub fn format_vector(values: &[f64]) -> String {
    let items = values
        .iter()
        .map(|value| format_scientific(*value))
        .collect::<Vec<_>>();
    format!("[{}]", items.join(", "))
}

#[must_use]
pub fn comparison_header(request: &ComparisonRequest) -> String {
    format!(
        "Comparing data array `{}' from file `{}' to data array `{}' from file `{}'.",
        request.array_a,
        request.input_a.display(),
        request.array_b,
        request.second_input().display()
    )
}

#[must_use]
pub fn diagnostic_line(diagnostic: &ElementDiagnostic) -> String {
    format!(
        "tuple: {:4} component: {:2}: abs err = {:>22}, rel err = {:>22}",
        diagnostic.tuple,
        diagnostic.component,
        format_scientific(diagnostic.abs_err),
        format_scientific(diagnostic.rel_err)
    )
}

pub fn write_norms<W: Write>(out: &mut W, verdict: &Verdict) -> io::Result<()> {
    writeln!(out, "Computed difference between data arrays:")?;
    for (family, l1, l2sq, l2, max) in [
        ("abs", &verdict.abs_l1, &verdict.abs_l2sq, &verdict.abs_l2, &verdict.abs_max),
        ("rel", &verdict.rel_l1, &verdict.rel_l2sq, &verdict.rel_l2, &verdict.rel_max),
    ] {
        if family == "rel" {
            writeln!(out)?;
        }
        writeln!(out, "{family} l1 norm      = {}", format_vector(l1))?;
        writeln!(out, "{family} l2-norm^2    = {}", format_vector(l2sq))?;
        writeln!(out, "{family} l2-norm      = {}", format_vector(l2))?;
        writeln!(out, "{family} maximum norm = {}", format_vector(max))?;
    }
    Ok(())
}

/// Machine-readable record of one finished comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport<'a> {
    pub schema_version: u8,
    pub input_a: String,
    pub input_b: String,
    pub array_a: &'a str,
    pub array_b: &'a str,
    pub association: &'static str,
    pub tuple_count: usize,
    pub arity: usize,
    pub thresholds: Thresholds,
    pub outcome: &'static str,
    pub verdict: &'a Verdict,
}

impl<'a> ComparisonReport<'a> {
    #[must_use]
    pub fn new(
        request: &'a ComparisonRequest,
        resolved: &ResolvedArrays,
        thresholds: Thresholds,
        verdict: &'a Verdict,
    ) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            input_a: request.input_a.display().to_string(),
            input_b: request.second_input().display().to_string(),
            array_a: &request.array_a,
            array_b: &request.array_b,
            association: resolved.association.as_str(),
            tuple_count: resolved.a.tuple_count(),
            arity: resolved.a.arity(),
            thresholds,
            outcome: verdict.outcome(),
            verdict,
        }
    }
}

pub fn write_report(path: &Path, report: &ComparisonReport<'_>) -> Result<(), DiffError> {
    let failure = |detail: String| DiffError::ReportWrite {
        path: path.display().to_string(),
        detail,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| failure(format!("failed creating {}: {err}", parent.display())))?;
    }
    let raw = serde_json::to_string_pretty(report)
        .map_err(|err| failure(format!("failed serializing report: {err}")))?;
    fs::write(path, raw).map_err(|err| failure(err.to_string()))
}
