use adf_io::IOError;
use thiserror::Error;

pub const DIFF_REASON_CODES: [&str; 11] = [
    "diff_within_tolerance",
    "diff_tolerance_exceeded",
    "diff_self_comparison",
    "diff_invalid_threshold",
    "diff_array_not_found",
    "diff_non_numeric",
    "diff_tuple_count_mismatch",
    "diff_arity_mismatch",
    "diff_report_write_failed",
    "diff_output_write_failed",
    "diff_log_write_failed",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiffError {
    #[error("You are trying to compare data array `{array}' from file `{file}' to itself.")]
    SelfComparison { array: String, file: String },
    #[error("{name} error threshold must be a non-negative number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Scalars data array '{array}' not found in {searched} data of file `{file}'.")]
    ArrayNotFound {
        array: String,
        file: String,
        searched: &'static str,
    },
    #[error("{0}")]
    Read(#[from] IOError),
    #[error("Data in data array {label} is not numeric: data type is {dtype}")]
    NonNumeric { label: char, dtype: &'static str },
    #[error("Number of tuples differ: {a} in data array a and {b} in data array b")]
    TupleCountMismatch { a: usize, b: usize },
    #[error("Number of components differ: {a} in data array a and {b} in data array b")]
    ArityMismatch { a: usize, b: usize },
    #[error(
        "Tuple {tuple} of data array {label} has {found} components, expected {expected}"
    )]
    RaggedTuples {
        label: char,
        tuple: usize,
        expected: usize,
        found: usize,
    },
    #[error("failed writing report {path}: {detail}")]
    ReportWrite { path: String, detail: String },
    #[error("failed writing comparison output to stdout: {0}")]
    OutputWrite(String),
    #[error("failed appending comparison log {path}: {detail}")]
    LogWrite { path: String, detail: String },
}

impl DiffError {
    /// Stable snake_case code; read failures report the underlying IO code.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::SelfComparison { .. } => "diff_self_comparison",
            Self::InvalidThreshold { .. } => "diff_invalid_threshold",
            Self::ArrayNotFound { .. } => "diff_array_not_found",
            Self::Read(err) => err.reason_code(),
            Self::NonNumeric { .. } => "diff_non_numeric",
            Self::TupleCountMismatch { .. } => "diff_tuple_count_mismatch",
            Self::ArityMismatch { .. } | Self::RaggedTuples { .. } => "diff_arity_mismatch",
            Self::ReportWrite { .. } => "diff_report_write_failed",
            Self::OutputWrite(_) => "diff_output_write_failed",
            Self::LogWrite { .. } => "diff_log_write_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DIFF_REASON_CODES, DiffError};
    use adf_io::{IO_REASON_CODES, IOError};

    #[test]
    fn every_variant_maps_to_a_registered_code() {
        let errors = [
            DiffError::SelfComparison {
                array: "u".to_string(),
                file: "a.npz".to_string(),
            },
            DiffError::InvalidThreshold {
                name: "absolute",
                value: -1.0,
            },
            DiffError::ArrayNotFound {
                array: "u".to_string(),
                file: "a.npz".to_string(),
                searched: "point",
            },
            DiffError::NonNumeric {
                label: 'a',
                dtype: "str",
            },
            DiffError::TupleCountMismatch { a: 10, b: 11 },
            DiffError::ArityMismatch { a: 3, b: 2 },
            DiffError::RaggedTuples {
                label: 'b',
                tuple: 1,
                expected: 2,
                found: 1,
            },
            DiffError::ReportWrite {
                path: "r.json".to_string(),
                detail: "denied".to_string(),
            },
            DiffError::OutputWrite("broken pipe".to_string()),
            DiffError::LogWrite {
                path: "l.jsonl".to_string(),
                detail: "denied".to_string(),
            },
        ];
        for err in errors {
            assert!(DIFF_REASON_CODES.contains(&err.reason_code()));
        }

        let read = DiffError::from(IOError::MagicInvalid);
        assert!(IO_REASON_CODES.contains(&read.reason_code()));
    }

    #[test]
    fn shape_messages_carry_both_values() {
        let err = DiffError::TupleCountMismatch { a: 10, b: 11 };
        assert_eq!(
            err.to_string(),
            "Number of tuples differ: 10 in data array a and 11 in data array b"
        );
    }
}
