use std::path::{Path, PathBuf};

use adf_io::{Association, DataArray, Dataset, IOError};

use crate::error::DiffError;

/// Opens a dataset by location.
pub trait ArraySource {
    fn open(&self, location: &Path) -> Result<Dataset, IOError>;
}

/// Reads datasets from the filesystem, picking the decoder per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileArraySource;

impl ArraySource for FileArraySource {
    fn open(&self, location: &Path) -> Result<Dataset, IOError> {
        adf_io::load_dataset(location)
    }
}

/// Which two arrays to compare and where they live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub input_a: PathBuf,
    /// Defaults to `input_a`.
    pub input_b: Option<PathBuf>,
    pub array_a: String,
    pub array_b: String,
}

impl ComparisonRequest {
    #[must_use]
    pub fn second_input(&self) -> &Path {
        self.input_b.as_deref().unwrap_or(&self.input_a)
    }

    #[must_use]
    pub fn reads_single_input(&self) -> bool {
        self.second_input() == self.input_a
    }

    #[must_use]
    pub fn is_self_comparison(&self) -> bool {
        self.reads_single_input() && self.array_a == self.array_b
    }
}

/// The two arrays selected for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArrays {
    pub association: Association,
    pub a: DataArray,
    pub b: DataArray,
}

/// Locate both arrays of `request`.
///
/// Array A is looked up in point data, then cell data, of the first dataset.
/// Array B must live in the same association, in the second dataset when one
/// is given and in the first otherwise.
pub fn resolve_arrays<S>(
    source: &S,
    request: &ComparisonRequest,
) -> Result<ResolvedArrays, DiffError>
where
    S: ArraySource + ?Sized,
{
    let not_found_a = || DiffError::ArrayNotFound {
        array: request.array_a.clone(),
        file: request.input_a.display().to_string(),
        searched: "point or cell",
    };

    let mut dataset_a = source.open(&request.input_a)?;
    let association = dataset_a.locate(&request.array_a).ok_or_else(not_found_a)?;

    if request.is_self_comparison() {
        return Err(DiffError::SelfComparison {
            array: request.array_a.clone(),
            file: request.input_a.display().to_string(),
        });
    }

    let a = dataset_a
        .remove(association, &request.array_a)
        .ok_or_else(not_found_a)?;

    let mut dataset_b = if request.reads_single_input() {
        dataset_a
    } else {
        source.open(request.second_input())?
    };
    let b = dataset_b
        .remove(association, &request.array_b)
        .ok_or_else(|| DiffError::ArrayNotFound {
            array: request.array_b.clone(),
            file: request.second_input().display().to_string(),
            searched: association.as_str(),
        })?;

    Ok(ResolvedArrays { association, a, b })
}
