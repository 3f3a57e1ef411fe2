use std::fs;
use std::path::{Path, PathBuf};

use faultline::config::{CoverageFormat, RunConfig};
use faultline::controller;
use faultline::error::{Error, Result};
use faultline::git::DiffSource;
use faultline::proposer::RuleBasedProposer;
use faultline::store::{MutantStatus, MutationStore};
use tempfile::TempDir;

const CALC_SOURCE: &str = "\
def add(a, b):
    return a + b

def is_positive(x):
    return x > 0
";

const CALC_COVERAGE: &str = "\
SF:calc.py
DA:2,1
DA:5,1
end_of_record
";

struct FakeDiff {
    files: Vec<String>,
    lines: Vec<usize>,
}

impl FakeDiff {
    fn empty() -> FakeDiff {
        FakeDiff {
            files: Vec::new(),
            lines: Vec::new(),
        }
    }
}

impl DiffSource for FakeDiff {
    fn modified_files(&self) -> Result<Vec<String>> {
        Ok(self.files.clone())
    }

    fn modified_lines(&self, _path: &str) -> Result<Vec<usize>> {
        Ok(self.lines.clone())
    }
}

fn workspace() -> (TempDir, RunConfig) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("calc.py"), CALC_SOURCE).unwrap();
    fs::write(dir.path().join("coverage.info"), CALC_COVERAGE).unwrap();

    let mut config = RunConfig::new(
        dir.path().join("coverage.info"),
        CoverageFormat::Lcov,
        "true",
    );
    config.workdir = dir.path().to_path_buf();
    config.db_path = dir.path().join("faultline.db");
    (dir, config)
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

#[test]
fn weak_suite_lets_every_mutant_survive() {
    let (dir, config) = workspace();

    let summary =
        controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();
    // One arithmetic mutant at line 2 and one boundary mutant at line 5.
    assert_eq!(summary.total, 2);
    assert_eq!(summary.survived, 2);
    assert_eq!(summary.killed, 0);
    assert_eq!(summary.score, 0.0);

    // The workspace source is byte-identical after the run.
    assert_eq!(
        fs::read_to_string(dir.path().join("calc.py")).unwrap(),
        CALC_SOURCE
    );
}

#[test]
fn checking_suite_kills_every_mutant() {
    let (dir, mut config) = workspace();
    let script = write_script(
        dir.path(),
        "check.sh",
        "grep -q 'return a + b' calc.py || exit 1\n\
         grep -q 'return x > 0' calc.py || exit 1\n\
         exit 0",
    );
    config.test_command = script.to_string_lossy().into_owned();

    let summary =
        controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.killed, 2);
    assert_eq!(summary.survived, 0);
    assert!((summary.score - 100.0).abs() < f64::EPSILON);
    assert_eq!(
        fs::read_to_string(dir.path().join("calc.py")).unwrap(),
        CALC_SOURCE
    );
}

#[test]
fn rerunning_on_unchanged_sources_is_idempotent() {
    let (_dir, config) = workspace();

    let first =
        controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();
    let second =
        controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();
    assert_eq!(first.total, second.total);
    assert_eq!(second.total, 2);
}

#[test]
fn mutants_land_on_executed_lines_only() {
    let (_dir, config) = workspace();

    controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();

    let store = MutationStore::open(&config.db_path).unwrap();
    let mutants = store.mutants_for("calc.py").unwrap();
    let lines: Vec<usize> = mutants.iter().map(|m| m.line_number).collect();
    assert_eq!(lines, vec![2, 5]);
}

#[test]
fn diff_scope_restricts_to_modified_lines() {
    let (_dir, mut config) = workspace();
    config.modified_only = true;
    let diff = FakeDiff {
        files: vec!["calc.py".to_string()],
        lines: vec![5],
    };

    let summary = controller::run(&config, &RuleBasedProposer, &diff, true).unwrap();
    assert_eq!(summary.total, 1);

    let store = MutationStore::open(&config.db_path).unwrap();
    let mutants = store.mutants_for("calc.py").unwrap();
    assert_eq!(mutants.len(), 1);
    assert_eq!(mutants[0].line_number, 5);
    assert_eq!(mutants[0].status, MutantStatus::Survived);
}

#[test]
fn unsupported_covered_files_are_skipped_not_fatal() {
    let (dir, config) = workspace();
    fs::write(dir.path().join("data.lua"), "x = 1\n").unwrap();
    fs::write(
        dir.path().join("coverage.info"),
        format!("{CALC_COVERAGE}SF:data.lua\nDA:1,1\nend_of_record\n"),
    )
    .unwrap();

    let summary =
        controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();
    assert_eq!(summary.total, 2);
}

#[test]
fn json_report_is_written_next_to_the_store() {
    let (dir, config) = workspace();

    controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();

    let report = fs::read_to_string(dir.path().join("faultline-report.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(value["total"], 2);
    assert_eq!(value["survived"], 2);
    assert!(value["score"].is_number());
}

#[test]
fn missing_coverage_report_is_fatal() {
    let (_dir, mut config) = workspace();
    config.coverage_report = PathBuf::from("no-such-report.info");

    let err = controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true)
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn failing_baseline_suite_is_fatal() {
    let (_dir, mut config) = workspace();
    config.test_command = "false".to_string();

    let err = controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true)
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn explicit_mutants_dir_keeps_candidates_on_disk() {
    let (dir, mut config) = workspace();
    config.mutants_dir = Some(dir.path().join("mutants"));

    controller::run(&config, &RuleBasedProposer, &FakeDiff::empty(), true).unwrap();

    let kept = fs::read_dir(dir.path().join("mutants")).unwrap().count();
    assert_eq!(kept, 2);
}
