use adf_io::DataArray;
use serde::Serialize;

use crate::norms::{PerComponentNorms, element_errors};
use crate::verdict::Thresholds;

/// Read access to an array laid out as tuples of equal arity.
pub trait TupleView {
    fn tuple_count(&self) -> usize;
    fn arity(&self) -> usize;
    fn component(&self, tuple: usize, component: usize) -> f64;

    /// First tuple whose length differs from `arity()`, as `(tuple, length)`.
    fn ragged_tuple(&self) -> Option<(usize, usize)> {
        None
    }
}

impl TupleView for DataArray {
    fn tuple_count(&self) -> usize {
        DataArray::tuple_count(self)
    }

    fn arity(&self) -> usize {
        DataArray::arity(self)
    }

    fn component(&self, tuple: usize, component: usize) -> f64 {
        DataArray::component(self, tuple, component)
    }
}

/// Rows as tuples. Arity is taken from the first row; other lengths are
/// reported by `ragged_tuple`.
impl TupleView for [Vec<f64>] {
    fn tuple_count(&self) -> usize {
        self.len()
    }

    fn arity(&self) -> usize {
        self.first().map_or(0, Vec::len)
    }

    fn component(&self, tuple: usize, component: usize) -> f64 {
        self[tuple][component]
    }

    fn ragged_tuple(&self) -> Option<(usize, usize)> {
        let arity = self.arity();
        self.iter()
            .enumerate()
            .find(|(_, row)| row.len() != arity)
            .map(|(tuple, row)| (tuple, row.len()))
    }
}

/// One element whose errors exceed both thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElementDiagnostic {
    pub tuple: usize,
    pub component: usize,
    pub abs_err: f64,
    pub rel_err: f64,
}

/// Scan both arrays tuple by tuple and fold every element into the norms.
///
/// Both arrays must have the same tuple count and arity; see
/// [`crate::validate::check_shapes`]. When `on_out_of_tolerance` is given it
/// is called, in scan order, for every element whose absolute error exceeds
/// the absolute threshold and whose relative error exceeds the relative one.
pub fn compute<A, B>(
    a: &A,
    b: &B,
    thresholds: &Thresholds,
    mut on_out_of_tolerance: Option<&mut dyn FnMut(ElementDiagnostic)>,
) -> PerComponentNorms
where
    A: TupleView + ?Sized,
    B: TupleView + ?Sized,
{
    debug_assert_eq!(a.tuple_count(), b.tuple_count());
    debug_assert_eq!(a.arity(), b.arity());

    let arity = a.arity();
    let mut norms = PerComponentNorms::new(arity);
    for tuple in 0..a.tuple_count() {
        for component in 0..arity {
            let (abs_err, rel_err) =
                element_errors(a.component(tuple, component), b.component(tuple, component));
            norms.record(component, abs_err, rel_err);

            if let Some(callback) = on_out_of_tolerance.as_deref_mut() {
                if thresholds.exceeded_by(abs_err, rel_err) {
                    callback(ElementDiagnostic {
                        tuple,
                        component,
                        abs_err,
                        rel_err,
                    });
                }
            }
        }
    }
    norms
}
