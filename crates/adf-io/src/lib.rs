#![forbid(unsafe_code)]

//! Array sources for `arraydiff`.
//!
//! A dataset file is decoded into a [`Dataset`]: named numeric arrays grouped
//! into point-associated and cell-associated storage. Three containers are
//! understood:
//!
//! * `.npz` archives (uncompressed ZIP of `.npy` members). Members named
//!   `point_data/<name>` or `cell_data/<name>` select the association, bare
//!   names are point data.
//! * single `.npy` files, holding one point-associated array named after the
//!   file stem.
//! * delimited text (`.txt`, `.dat`, `.csv`), one row per tuple.

mod dataset;
mod npy;
mod npz;
mod text;

use std::fs;
use std::path::Path;

use thiserror::Error;

pub use dataset::{Association, DataArray, Dataset};
pub use npy::{
    NpyArrayBytes, NpyHeader, decode_numeric_payload, encode_f64_payload, read_npy_bytes,
    validate_header_schema, validate_magic_version, validate_read_payload, write_npy_bytes,
    write_npy_bytes_with_version,
};
pub use npz::{NpzEntry, read_npz_bytes, write_npz_bytes};
pub use text::{TextArrayData, loadtxt};

pub const NPY_MAGIC_PREFIX: [u8; 6] = [0x93, b'N', b'U', b'M', b'P', b'Y'];
pub const NPZ_MAGIC_PREFIX: [u8; 4] = [b'P', b'K', 0x03, 0x04];

pub const MAX_HEADER_BYTES: usize = 65_536;
pub const MAX_SHAPE_RANK: usize = 32;
pub const MAX_ARCHIVE_MEMBERS: usize = 4_096;
pub const MAX_ARCHIVE_UNCOMPRESSED_BYTES: usize = 2 * 1024 * 1024 * 1024;

pub const IO_REASON_CODES: [&str; 10] = [
    "io_file_unreadable",
    "io_magic_invalid",
    "io_header_schema_invalid",
    "io_dtype_descriptor_invalid",
    "io_write_contract_violation",
    "io_read_payload_incomplete",
    "io_pickle_policy_violation",
    "io_load_dispatch_invalid",
    "io_npz_archive_contract_violation",
    "io_text_parse_failed",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IOError {
    #[error("failed reading `{path}': {detail}")]
    FileUnreadable { path: String, detail: String },
    #[error("invalid or unsupported npy/npz magic/version")]
    MagicInvalid,
    #[error("{0}")]
    HeaderSchemaInvalid(&'static str),
    #[error("dtype descriptor '{0}' is invalid or unsupported")]
    DTypeDescriptorInvalid(String),
    #[error("{0}")]
    WriteContractViolation(&'static str),
    #[error("{0}")]
    ReadPayloadIncomplete(&'static str),
    #[error("pickle/object payload rejected by policy")]
    PicklePolicyViolation,
    #[error("{0}")]
    LoadDispatchInvalid(&'static str),
    #[error("{0}")]
    NpzArchiveContractViolation(&'static str),
    #[error("array '{name}' is stored more than once in {association} data")]
    DuplicateArray { name: String, association: &'static str },
    #[error("text line {line}: {detail}")]
    TextParseFailed { line: usize, detail: &'static str },
}

impl IOError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::FileUnreadable { .. } => "io_file_unreadable",
            Self::MagicInvalid => "io_magic_invalid",
            Self::HeaderSchemaInvalid(_) => "io_header_schema_invalid",
            Self::DTypeDescriptorInvalid(_) => "io_dtype_descriptor_invalid",
            Self::WriteContractViolation(_) => "io_write_contract_violation",
            Self::ReadPayloadIncomplete(_) => "io_read_payload_incomplete",
            Self::PicklePolicyViolation => "io_pickle_policy_violation",
            Self::LoadDispatchInvalid(_) => "io_load_dispatch_invalid",
            Self::NpzArchiveContractViolation(_) | Self::DuplicateArray { .. } => {
                "io_npz_archive_contract_violation"
            }
            Self::TextParseFailed { .. } => "io_text_parse_failed",
        }
    }
}

/// Element types an `.npy` descriptor can name.
///
/// Only little-endian and byte-order-free descriptors are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IOSupportedDType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Object,
    /// Fixed-width UCS-4 string, `n` code points.
    Unicode(usize),
    /// Fixed-width byte string, `n` bytes.
    Bytes(usize),
}

/// Fixed descriptors in the spelling `numpy.save` writes them.
const FIXED_DESCRIPTORS: [(&str, IOSupportedDType); 12] = [
    ("|b1", IOSupportedDType::Bool),
    ("|i1", IOSupportedDType::I8),
    ("<i2", IOSupportedDType::I16),
    ("<i4", IOSupportedDType::I32),
    ("<i8", IOSupportedDType::I64),
    ("|u1", IOSupportedDType::U8),
    ("<u2", IOSupportedDType::U16),
    ("<u4", IOSupportedDType::U32),
    ("<u8", IOSupportedDType::U64),
    ("<f4", IOSupportedDType::F32),
    ("<f8", IOSupportedDType::F64),
    ("|O", IOSupportedDType::Object),
];

impl IOSupportedDType {
    #[must_use]
    pub fn descr(self) -> String {
        match self {
            Self::Unicode(width) => format!("<U{width}"),
            Self::Bytes(width) => format!("|S{width}"),
            fixed => FIXED_DESCRIPTORS
                .iter()
                .find(|(_, dtype)| *dtype == fixed)
                .map_or_else(String::new, |(descr, _)| (*descr).to_string()),
        }
    }

    pub fn decode(descr: &str) -> Result<Self, IOError> {
        if let Some((_, dtype)) = FIXED_DESCRIPTORS.iter().find(|(known, _)| *known == descr) {
            return Ok(*dtype);
        }
        let width = |digits: &str| digits.parse::<usize>().ok().filter(|w| *w > 0);
        if let Some(w) = descr.strip_prefix("<U").and_then(width) {
            Ok(Self::Unicode(w))
        } else if let Some(w) = descr.strip_prefix("|S").and_then(width) {
            Ok(Self::Bytes(w))
        } else {
            Err(IOError::DTypeDescriptorInvalid(descr.to_string()))
        }
    }

    #[must_use]
    pub const fn item_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::Unicode(width) => width.checked_mul(4),
            Self::Bytes(width) => Some(width),
            Self::Object => None,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Object => "object",
            Self::Unicode(_) => "str",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Integers and floats are numeric; bool, strings and objects are not.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::F32
                | Self::F64
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDispatch {
    Npy,
    Npz,
    /// Delimited text; `None` splits on any whitespace.
    Text(Option<char>),
}

/// Pick a decoder from the leading bytes, falling back to the extension.
pub fn classify_load_dispatch(payload_prefix: &[u8], path: &Path) -> Result<LoadDispatch, IOError> {
    if payload_prefix.len() >= 4 && payload_prefix[..4] == NPZ_MAGIC_PREFIX {
        return Ok(LoadDispatch::Npz);
    }

    if payload_prefix.len() >= 6 && payload_prefix[..6] == NPY_MAGIC_PREFIX {
        return Ok(LoadDispatch::Npy);
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => Ok(LoadDispatch::Text(Some(','))),
        Some("txt" | "dat") => Ok(LoadDispatch::Text(None)),
        _ => Err(IOError::LoadDispatchInvalid(
            "unsupported file type; expected .npz, .npy, .txt, .dat or .csv",
        )),
    }
}

/// Read and decode one dataset file.
pub fn load_dataset(path: &Path) -> Result<Dataset, IOError> {
    let bytes = fs::read(path).map_err(|err| IOError::FileUnreadable {
        path: path.display().to_string(),
        detail: err.to_string(),
    })?;

    let stem = path
        .file_stem()
        .map_or_else(|| "array".to_string(), |s| s.to_string_lossy().into_owned());

    match classify_load_dispatch(&bytes, path)? {
        LoadDispatch::Npz => Dataset::from_npz_entries(read_npz_bytes(&bytes)?),
        LoadDispatch::Npy => {
            let array = read_npy_bytes(&bytes)?;
            let mut dataset = Dataset::new();
            dataset.insert(Association::Point, DataArray::from_npy(stem, &array)?)?;
            Ok(dataset)
        }
        LoadDispatch::Text(delimiter) => {
            let text = String::from_utf8(bytes).map_err(|_| IOError::TextParseFailed {
                line: 0,
                detail: "text payload is not valid utf-8",
            })?;
            let data = loadtxt(&text, delimiter, '#')?;
            let mut dataset = Dataset::new();
            dataset.insert(Association::Point, DataArray::from_text(stem, data)?)?;
            Ok(dataset)
        }
    }
}
