use serde::Serialize;

use crate::error::DiffError;
use crate::norms::PerComponentNorms;

/// Absolute and relative error tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    abs_err_thr: f64,
    rel_err_thr: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            abs_err_thr: f64::EPSILON,
            rel_err_thr: f64::EPSILON,
        }
    }
}

impl Thresholds {
    /// Both thresholds must be non-negative; `+inf` disables one.
    pub fn new(abs_err_thr: f64, rel_err_thr: f64) -> Result<Self, DiffError> {
        for (name, value) in [("absolute", abs_err_thr), ("relative", rel_err_thr)] {
            if value.is_nan() || value < 0.0 {
                return Err(DiffError::InvalidThreshold { name, value });
            }
        }
        Ok(Self {
            abs_err_thr,
            rel_err_thr,
        })
    }

    #[must_use]
    pub fn abs_err_thr(&self) -> f64 {
        self.abs_err_thr
    }

    #[must_use]
    pub fn rel_err_thr(&self) -> f64 {
        self.rel_err_thr
    }

    /// A value is out of tolerance only when it exceeds both thresholds.
    #[must_use]
    pub fn exceeded_by(&self, abs_err: f64, rel_err: f64) -> bool {
        abs_err > self.abs_err_thr && rel_err > self.rel_err_thr
    }
}

/// Final norms of a comparison and its pass/fail outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub max_abs_error: f64,
    pub max_rel_error: f64,
    pub abs_l1: Vec<f64>,
    pub abs_l2sq: Vec<f64>,
    pub abs_l2: Vec<f64>,
    pub abs_max: Vec<f64>,
    pub rel_l1: Vec<f64>,
    pub rel_l2sq: Vec<f64>,
    pub rel_l2: Vec<f64>,
    pub rel_max: Vec<f64>,
}

impl Verdict {
    #[must_use]
    pub fn arity(&self) -> usize {
        self.abs_l1.len()
    }

    #[must_use]
    pub fn outcome(&self) -> &'static str {
        if self.passed { "pass" } else { "fail" }
    }

    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        if self.passed {
            "diff_within_tolerance"
        } else {
            "diff_tolerance_exceeded"
        }
    }
}

/// Turn accumulated norms into a verdict.
///
/// The comparison fails when the largest per-component absolute maximum and
/// the largest per-component relative maximum both exceed their thresholds.
#[must_use]
pub fn decide(norms: PerComponentNorms, thresholds: &Thresholds) -> Verdict {
    let PerComponentNorms {
        abs_l1,
        abs_l2sq,
        abs_max,
        rel_l1,
        rel_l2sq,
        rel_max,
        ..
    } = norms;

    let max_abs_error = abs_max.iter().copied().fold(0.0, f64::max);
    let max_rel_error = rel_max.iter().copied().fold(0.0, f64::max);

    Verdict {
        passed: !thresholds.exceeded_by(max_abs_error, max_rel_error),
        max_abs_error,
        max_rel_error,
        abs_l2: abs_l2sq.iter().map(|v| v.sqrt()).collect(),
        rel_l2: rel_l2sq.iter().map(|v| v.sqrt()).collect(),
        abs_l1,
        abs_l2sq,
        abs_max,
        rel_l1,
        rel_l2sq,
        rel_max,
    }
}
