/// Absolute and relative error of one element pair.
///
/// The relative error is measured against the smaller magnitude of the two
/// operands. Equal values are exact (`0`), and a nonzero difference against
/// a zero operand is unbounded (`+inf`).
#[must_use]
pub fn element_errors(a: f64, b: f64) -> (f64, f64) {
    let abs_err = (a - b).abs();
    (abs_err, relative_error(a, b, abs_err))
}

#[must_use]
pub fn relative_error(a: f64, b: f64, abs_err: f64) -> f64 {
    if abs_err == 0.0 {
        0.0
    } else if a == 0.0 || b == 0.0 {
        f64::INFINITY
    } else {
        abs_err / a.abs().min(b.abs())
    }
}

/// Running per-component error totals of one comparison.
///
/// Every vector has one slot per component. Maxima start at zero and ignore
/// NaN errors; the L1 and squared-L2 sums do not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerComponentNorms {
    pub(crate) abs_l1: Vec<f64>,
    pub(crate) abs_l2sq: Vec<f64>,
    pub(crate) abs_max: Vec<f64>,
    pub(crate) rel_l1: Vec<f64>,
    pub(crate) rel_l2sq: Vec<f64>,
    pub(crate) rel_max: Vec<f64>,
    pub(crate) elements: usize,
}

impl PerComponentNorms {
    #[must_use]
    pub fn new(arity: usize) -> Self {
        Self {
            abs_l1: vec![0.0; arity],
            abs_l2sq: vec![0.0; arity],
            abs_max: vec![0.0; arity],
            rel_l1: vec![0.0; arity],
            rel_l2sq: vec![0.0; arity],
            rel_max: vec![0.0; arity],
            elements: 0,
        }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.abs_l1.len()
    }

    /// Number of element pairs folded in so far.
    #[must_use]
    pub fn elements(&self) -> usize {
        self.elements
    }

    /// Fold one element's errors into component `component`.
    pub fn record(&mut self, component: usize, abs_err: f64, rel_err: f64) {
        self.abs_l1[component] += abs_err;
        self.abs_l2sq[component] += abs_err * abs_err;
        self.abs_max[component] = self.abs_max[component].max(abs_err);

        self.rel_l1[component] += rel_err;
        self.rel_l2sq[component] += rel_err * rel_err;
        self.rel_max[component] = self.rel_max[component].max(rel_err);

        self.elements += 1;
    }

    #[must_use]
    pub fn abs_l1(&self) -> &[f64] {
        &self.abs_l1
    }

    #[must_use]
    pub fn abs_l2sq(&self) -> &[f64] {
        &self.abs_l2sq
    }

    #[must_use]
    pub fn abs_max(&self) -> &[f64] {
        &self.abs_max
    }

    #[must_use]
    pub fn rel_l1(&self) -> &[f64] {
        &self.rel_l1
    }

    #[must_use]
    pub fn rel_l2sq(&self) -> &[f64] {
        &self.rel_l2sq
    }

    #[must_use]
    pub fn rel_max(&self) -> &[f64] {
        &self.rel_max
    }
}
