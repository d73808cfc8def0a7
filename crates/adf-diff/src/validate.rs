use adf_io::DataArray;

use crate::compute::TupleView;
use crate::error::DiffError;

pub fn check_numeric(array: &DataArray, label: char) -> Result<(), DiffError> {
    if array.is_numeric() {
        Ok(())
    } else {
        Err(DiffError::NonNumeric {
            label,
            dtype: array.dtype().name(),
        })
    }
}

fn check_uniform<V: TupleView + ?Sized>(view: &V, label: char) -> Result<(), DiffError> {
    match view.ragged_tuple() {
        Some((tuple, found)) => Err(DiffError::RaggedTuples {
            label,
            tuple,
            expected: view.arity(),
            found,
        }),
        None => Ok(()),
    }
}

/// Tuple counts are compared first, then each array's own arity is checked
/// for uniformity, then the two arities are compared.
pub fn check_shapes<A, B>(a: &A, b: &B) -> Result<(), DiffError>
where
    A: TupleView + ?Sized,
    B: TupleView + ?Sized,
{
    if a.tuple_count() != b.tuple_count() {
        return Err(DiffError::TupleCountMismatch {
            a: a.tuple_count(),
            b: b.tuple_count(),
        });
    }
    check_uniform(a, 'a')?;
    check_uniform(b, 'b')?;
    if a.arity() != b.arity() {
        return Err(DiffError::ArityMismatch {
            a: a.arity(),
            b: b.arity(),
        });
    }
    Ok(())
}

/// All preconditions of an element-wise comparison.
pub fn validate_pair(a: &DataArray, b: &DataArray) -> Result<(), DiffError> {
    check_numeric(a, 'a')?;
    check_numeric(b, 'b')?;
    check_shapes(a, b)
}
