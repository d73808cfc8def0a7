use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use adf_io::DataArray;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::DiffError;
use crate::source::{ComparisonRequest, ResolvedArrays};
use crate::verdict::{Thresholds, Verdict};

pub const COMPARISON_LOG_PATH_ENV: &str = "ADF_COMPARISON_LOG_PATH";

const TOOL_NAME: &str = "arraydiff";

/// One JSONL line describing a comparison run, including failed ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonLogEntry {
    pub tool: &'static str,
    pub ts_unix_ms: u128,
    pub input_a: String,
    pub input_b: String,
    pub array_a: String,
    pub array_b: String,
    pub association: Option<&'static str>,
    pub input_digest: Option<String>,
    pub tuple_count: Option<usize>,
    pub arity: Option<usize>,
    pub abs_err_thr: f64,
    pub rel_err_thr: f64,
    pub max_abs_error: Option<f64>,
    pub max_rel_error: Option<f64>,
    pub outcome: &'static str,
    pub reason_code: &'static str,
}

impl ComparisonLogEntry {
    #[must_use]
    pub fn new(request: &ComparisonRequest, thresholds: &Thresholds) -> Self {
        Self {
            tool: TOOL_NAME,
            ts_unix_ms: now_unix_ms(),
            input_a: request.input_a.display().to_string(),
            input_b: request.second_input().display().to_string(),
            array_a: request.array_a.clone(),
            array_b: request.array_b.clone(),
            association: None,
            input_digest: None,
            tuple_count: None,
            arity: None,
            abs_err_thr: thresholds.abs_err_thr(),
            rel_err_thr: thresholds.rel_err_thr(),
            max_abs_error: None,
            max_rel_error: None,
            outcome: "error",
            reason_code: "",
        }
    }

    pub fn record_arrays(&mut self, resolved: &ResolvedArrays) {
        self.association = Some(resolved.association.as_str());
        self.input_digest = Some(input_digest(&resolved.a, &resolved.b));
        self.tuple_count = Some(resolved.a.tuple_count());
        self.arity = Some(resolved.a.arity());
    }

    pub fn record_verdict(&mut self, verdict: &Verdict) {
        self.max_abs_error = Some(verdict.max_abs_error);
        self.max_rel_error = Some(verdict.max_rel_error);
        self.outcome = verdict.outcome();
        self.reason_code = verdict.reason_code();
    }

    pub fn record_error(&mut self, err: &DiffError) {
        self.outcome = "error";
        self.reason_code = err.reason_code();
    }
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

/// SHA-256 over the little-endian `f64` values of both arrays, A first.
#[must_use]
pub fn input_digest(a: &DataArray, b: &DataArray) -> String {
    let mut hasher = Sha256::new();
    for value in a.values().iter().chain(b.values()) {
        hasher.update(value.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// The explicit path wins over `ADF_COMPARISON_LOG_PATH`.
#[must_use]
pub fn resolve_log_path(configured: Option<&Path>) -> Option<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(COMPARISON_LOG_PATH_ENV).map(PathBuf::from))
}

/// Append `entry` when a log path is configured; otherwise do nothing.
pub fn maybe_append_comparison_log(
    configured: Option<&Path>,
    entry: &ComparisonLogEntry,
) -> Result<(), DiffError> {
    let Some(path) = resolve_log_path(configured) else {
        return Ok(());
    };
    append_comparison_log(&path, entry)
}

pub fn append_comparison_log(path: &Path, entry: &ComparisonLogEntry) -> Result<(), DiffError> {
    let failure = |detail: String| DiffError::LogWrite {
        path: path.display().to_string(),
        detail,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| failure(format!("failed creating {}: {err}", parent.display())))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| failure(format!("failed opening: {err}")))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| failure(format!("failed serializing comparison log entry: {err}")))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload).map_err(|err| failure(err.to_string()))
}
