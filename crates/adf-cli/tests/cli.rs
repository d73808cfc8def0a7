//! End-to-end tests of the `arraydiff` binary.

use adf_io::{
    Association, DataArray, Dataset, IOSupportedDType, NpyHeader, encode_f64_payload,
    write_npy_bytes, write_npz_bytes,
};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAILURE_MESSAGE: &str =
    "Absolute and relative error (maximum norm) are larger than the corresponding thresholds.";

fn arraydiff() -> Command {
    Command::cargo_bin("arraydiff").expect("arraydiff binary")
}

fn write_dataset(dir: &TempDir, file: &str, arrays: Vec<(Association, DataArray)>) -> PathBuf {
    let mut dataset = Dataset::new();
    for (association, array) in arrays {
        dataset.insert(association, array).expect("insert");
    }
    let path = dir.path().join(file);
    fs::write(&path, dataset.to_npz_bytes().expect("encode npz")).expect("write npz");
    path
}

fn entry(
    association: Association,
    name: &str,
    shape: &[usize],
    values: &[f64],
) -> (Association, DataArray) {
    let array = DataArray::from_values(name, shape.to_vec(), values.to_vec()).expect("array");
    (association, array)
}

fn point(name: &str, values: &[f64]) -> (Association, DataArray) {
    entry(Association::Point, name, &[values.len()], values)
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn help_lists_array_options() {
    arraydiff()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--first_data_array"))
        .stdout(predicate::str::contains("--second_data_array"))
        .stdout(predicate::str::contains("--abs"));
}

#[test]
fn missing_array_option_is_a_usage_error() {
    arraydiff().args(["a.npz", "-a", "u"]).assert().code(1);
}

#[test]
fn equal_arrays_in_two_files_pass() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write_dataset(&dir, "a.npz", vec![point("u", &[1.0, 2.0, 3.0])]);
    let b = write_dataset(&dir, "b.npz", vec![point("u", &[1.0, 2.0, 3.0])]);

    arraydiff()
        .args([arg(&a), arg(&b), "-a", "u", "-b", "u"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "Comparing data array `u' from file `{}' to data array `u' from file `{}'.",
            a.display(),
            b.display()
        )))
        .stdout(predicate::str::contains("abs l2-norm      = [0.000000000000000e+00]"))
        .stdout(predicate::str::contains(FAILURE_MESSAGE).not());
}

#[test]
fn differing_arrays_fail_unless_thresholds_are_loosened() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_dataset(
        &dir,
        "run.npz",
        vec![point("p", &[1.0, 2.0, 3.0]), point("p_ref", &[1.0, 2.1, 3.0])],
    );

    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "p_ref"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("rel maximum norm = [5.0000000000000"))
        .stdout(predicate::str::contains(FAILURE_MESSAGE));

    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "p_ref", "--abs", "0.2", "--rel", "1"])
        .assert()
        .success();

    // Either threshold alone is enough to pass.
    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "p_ref", "--abs", "0.5"])
        .assert()
        .success();
}

#[test]
fn quiet_mode_prints_nothing_on_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_dataset(&dir, "run.npz", vec![point("p", &[1.0]), point("q", &[2.0])]);

    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "q", "-q"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn verbose_mode_lists_out_of_tolerance_elements() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write_dataset(
        &dir,
        "a.npz",
        vec![entry(Association::Point, "v", &[2, 2], &[1.0, 2.0, 3.0, 4.0])],
    );
    let b = write_dataset(
        &dir,
        "b.npz",
        vec![entry(Association::Point, "v", &[2, 2], &[1.0, 2.0, 3.0, 0.0])],
    );

    arraydiff()
        .args([arg(&a), arg(&b), "-a", "v", "-b", "v", "-q", "-v"])
        .assert()
        .code(1)
        .stdout(
            "tuple:    1 component:  1: abs err =  4.000000000000000e+00, rel err =                    inf\n",
        );
}

#[test]
fn comparing_an_array_with_itself_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_dataset(&dir, "run.npz", vec![point("p", &[1.0])]);

    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "p"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("to itself"));
}

#[test]
fn missing_arrays_are_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write_dataset(&dir, "a.npz", vec![point("p", &[1.0])]);
    let b = write_dataset(&dir, "b.npz", vec![entry(Association::Cell, "p", &[1], &[1.0])]);

    arraydiff()
        .args([arg(&a), arg(&b), "-a", "missing", "-b", "p"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'missing' not found in point or cell data"));

    // Array B is only searched where array A was found.
    arraydiff()
        .args([arg(&a), arg(&b), "-a", "p", "-b", "p"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found in point data"));
}

#[test]
fn cell_arrays_are_compared_across_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write_dataset(
        &dir,
        "a.npz",
        vec![entry(Association::Cell, "pressure", &[2], &[5.0, 6.0])],
    );
    let b = write_dataset(
        &dir,
        "b.npz",
        vec![
            entry(Association::Point, "pressure", &[3], &[0.0, 0.0, 0.0]),
            entry(Association::Cell, "pressure", &[2], &[5.0, 6.0]),
        ],
    );

    arraydiff()
        .args([arg(&a), arg(&b), "-a", "pressure", "-b", "pressure"])
        .assert()
        .success();
}

#[test]
fn tuple_count_mismatch_is_reported_before_comparison() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = dir.path().join("ten.csv");
    let b = dir.path().join("eleven.csv");
    fs::write(&a, "1.0\n".repeat(10)).expect("write");
    fs::write(&b, "1.0\n".repeat(11)).expect("write");

    arraydiff()
        .args([arg(&a), arg(&b), "-a", "ten", "-b", "eleven"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Computed difference").not())
        .stderr(predicate::str::contains(
            "Number of tuples differ: 10 in data array a and 11 in data array b",
        ));
}

#[test]
fn component_count_mismatch_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = dir.path().join("xy.dat");
    let b = dir.path().join("xyz.dat");
    fs::write(&a, "1 2\n3 4\n").expect("write");
    fs::write(&b, "1 2 0\n3 4 0\n").expect("write");

    arraydiff()
        .args([arg(&a), arg(&b), "-a", "xy", "-b", "xyz"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Number of components differ: 2"));
}

#[test]
fn string_arrays_are_not_numeric() {
    let dir = tempfile::tempdir().expect("tempdir");
    let labels = NpyHeader {
        shape: vec![2],
        fortran_order: false,
        descr: IOSupportedDType::Unicode(3),
    };
    let values = NpyHeader {
        shape: vec![2],
        fortran_order: false,
        descr: IOSupportedDType::F64,
    };
    let label_payload = vec![0u8; 24];
    let value_payload = encode_f64_payload(&[1.0, 2.0]);
    let archive = write_npz_bytes(&[
        ("labels", &labels, label_payload.as_slice()),
        ("values", &values, value_payload.as_slice()),
    ])
    .expect("npz");
    let path = dir.path().join("mixed.npz");
    fs::write(&path, archive).expect("write");

    arraydiff()
        .args([arg(&path), "-a", "labels", "-b", "values"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Data in data array a is not numeric: data type is str",
        ));
}

#[test]
fn npy_and_csv_inputs_compare_by_file_stem() {
    let dir = tempfile::tempdir().expect("tempdir");
    let header = NpyHeader {
        shape: vec![2, 2],
        fortran_order: false,
        descr: IOSupportedDType::F64,
    };
    let npy = dir.path().join("displacement.npy");
    let payload = encode_f64_payload(&[0.5, 1.5, 2.5, 3.5]);
    fs::write(&npy, write_npy_bytes(&header, &payload).expect("npy")).expect("write");
    let csv = dir.path().join("reference.csv");
    fs::write(&csv, "# ux,uy\n0.5,1.5\n2.5,3.5\n").expect("write");

    arraydiff()
        .args([arg(&npy), arg(&csv), "-a", "displacement", "-b", "reference"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "abs maximum norm = [0.000000000000000e+00, 0.000000000000000e+00]",
        ));
}

#[test]
fn unreadable_and_unsupported_inputs_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mesh = dir.path().join("mesh.vtu");
    fs::write(&mesh, "<VTKFile/>").expect("write");

    arraydiff()
        .args([arg(&mesh), "-a", "u", "-b", "v"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported file type"));

    arraydiff()
        .args([arg(&dir.path().join("absent.npz")), "-a", "u", "-b", "v"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.npz"));
}

#[test]
fn negative_threshold_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_dataset(&dir, "run.npz", vec![point("p", &[1.0]), point("q", &[1.0])]);

    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "q", "--rel", "-0.5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("relative error threshold"));
}

#[test]
fn report_and_log_record_the_comparison() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_dataset(
        &dir,
        "run.npz",
        vec![point("p", &[0.0, 2.0]), point("p_ref", &[1.0, 2.0])],
    );
    let report = dir.path().join("out/report.json");
    let log = dir.path().join("out/comparisons.jsonl");

    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "p_ref", "-q"])
        .args(["--report", arg(&report), "--log-path", arg(&log)])
        .assert()
        .code(1);
    arraydiff()
        .args([arg(&data), "-a", "p", "-b", "p", "--log-path", arg(&log)])
        .assert()
        .code(1);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(report["outcome"], "fail");
    assert_eq!(report["association"], "point");
    assert_eq!(report["verdict"]["abs_max"][0], 1.0);
    assert!(report["verdict"]["rel_max"][0].is_null());

    let raw = fs::read_to_string(&log).expect("log");
    let entries = raw
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("jsonl"))
        .collect::<Vec<_>>();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["reason_code"], "diff_tolerance_exceeded");
    assert_eq!(entries[0]["tuple_count"], 2);
    assert_eq!(entries[1]["outcome"], "error");
    assert_eq!(entries[1]["reason_code"], "diff_self_comparison");
}

#[test]
fn log_path_falls_back_to_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = write_dataset(&dir, "run.npz", vec![point("p", &[1.0]), point("q", &[1.0])]);
    let log = dir.path().join("env.jsonl");

    arraydiff()
        .env("ADF_COMPARISON_LOG_PATH", &log)
        .args([arg(&data), "-a", "p", "-b", "q"])
        .assert()
        .success();

    let raw = fs::read_to_string(&log).expect("log");
    assert!(raw.contains("\"outcome\":\"pass\""));
}
