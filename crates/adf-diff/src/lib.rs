#![forbid(unsafe_code)]

pub mod compute;
pub mod error;
pub mod log;
pub mod norms;
pub mod report;
pub mod source;
pub mod validate;
pub mod verdict;

use adf_io::DataArray;

pub use compute::{ElementDiagnostic, TupleView, compute};
pub use error::{DIFF_REASON_CODES, DiffError};
pub use log::{COMPARISON_LOG_PATH_ENV, ComparisonLogEntry, maybe_append_comparison_log};
pub use norms::{PerComponentNorms, element_errors, relative_error};
pub use report::{ComparisonReport, FAILURE_MESSAGE, write_report};
pub use source::{ArraySource, ComparisonRequest, FileArraySource, ResolvedArrays, resolve_arrays};
pub use validate::validate_pair;
pub use verdict::{Thresholds, Verdict, decide};

/// Validate, scan and judge two arrays.
///
/// Nothing is computed when the arrays are non-numeric or differ in tuple
/// count or arity.
pub fn compare(
    a: &DataArray,
    b: &DataArray,
    thresholds: &Thresholds,
    on_out_of_tolerance: Option<&mut dyn FnMut(ElementDiagnostic)>,
) -> Result<Verdict, DiffError> {
    validate_pair(a, b)?;
    let norms = compute(a, b, thresholds, on_out_of_tolerance);
    Ok(decide(norms, thresholds))
}
