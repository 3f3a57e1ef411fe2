use std::fs;

use faultline::config::CoverageFormat;
use faultline::coverage;
use faultline::error::Error;
use tempfile::TempDir;

// --- format selector ---

#[test]
fn format_parses_known_selectors() {
    assert_eq!("lcov".parse::<CoverageFormat>().unwrap(), CoverageFormat::Lcov);
    assert_eq!(
        "cobertura".parse::<CoverageFormat>().unwrap(),
        CoverageFormat::Cobertura
    );
    assert_eq!(
        "jacoco".parse::<CoverageFormat>().unwrap(),
        CoverageFormat::Jacoco
    );
}

#[test]
fn format_rejects_unknown_selector() {
    let err = "gcov".parse::<CoverageFormat>().unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// --- lcov ---

#[test]
fn lcov_partitions_executed_and_unexecuted_lines() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.info");
    fs::write(
        &report,
        "TN:\nSF:src/app.py\nDA:1,3\nDA:2,0\nDA:3,1\nend_of_record\nSF:src/util.py\nDA:5,0\nend_of_record\n",
    )
    .unwrap();

    let map = coverage::parse(&report, CoverageFormat::Lcov).unwrap();
    let app = &map.files["src/app.py"];
    assert_eq!(app.executed.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(app.unexecuted.iter().copied().collect::<Vec<_>>(), vec![2]);
    let util = &map.files["src/util.py"];
    assert!(util.executed.is_empty());
    assert_eq!(util.unexecuted.len(), 1);
    // 2 executed / 4 total, rounded to two decimals
    assert_eq!(map.line_rate, 0.5);
}

#[test]
fn lcov_hit_records_outside_a_section_are_ignored() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.info");
    fs::write(&report, "DA:1,1\nSF:a.py\nDA:2,1\nend_of_record\nDA:3,1\n").unwrap();

    let map = coverage::parse(&report, CoverageFormat::Lcov).unwrap();
    assert_eq!(map.files.len(), 1);
    assert_eq!(map.files["a.py"].executed.len(), 1);
}

#[test]
fn lcov_empty_report_has_zero_rate() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.info");
    fs::write(&report, "").unwrap();

    let map = coverage::parse(&report, CoverageFormat::Lcov).unwrap();
    assert!(map.files.is_empty());
    assert_eq!(map.line_rate, 0.0);
}

#[test]
fn lcov_malformed_hit_record_is_an_error() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.info");
    fs::write(&report, "SF:a.py\nDA:not_a_number\nend_of_record\n").unwrap();

    let err = coverage::parse(&report, CoverageFormat::Lcov).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn lcov_rejects_wrong_extension() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.xml");
    fs::write(&report, "SF:a.py\nend_of_record\n").unwrap();

    let err = coverage::parse(&report, CoverageFormat::Lcov).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn missing_report_file_is_an_error() {
    let err = coverage::parse(std::path::Path::new("no/such/report.info"), CoverageFormat::Lcov)
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// --- cobertura ---

#[test]
fn cobertura_partitions_lines_and_computes_rate() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.xml");
    fs::write(
        &report,
        r#"<?xml version="1.0"?>
<coverage>
  <packages><package><classes>
    <class filename="src/app.py"><lines>
      <line number="1" hits="1"/>
      <line number="2" hits="0"/>
      <line number="3" hits="1"/>
    </lines></class>
  </classes></package></packages>
</coverage>"#,
    )
    .unwrap();

    let map = coverage::parse(&report, CoverageFormat::Cobertura).unwrap();
    let app = &map.files["src/app.py"];
    assert_eq!(app.executed.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(app.unexecuted.iter().copied().collect::<Vec<_>>(), vec![2]);
    assert_eq!(map.line_rate, 0.67);
}

#[test]
fn cobertura_prefers_report_level_line_rate() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.xml");
    fs::write(
        &report,
        r#"<coverage line-rate="0.5">
  <packages><package><classes>
    <class filename="a.py"><lines><line number="1" hits="1"/></lines></class>
  </classes></package></packages>
</coverage>"#,
    )
    .unwrap();

    let map = coverage::parse(&report, CoverageFormat::Cobertura).unwrap();
    assert_eq!(map.line_rate, 0.5);
}

#[test]
fn cobertura_malformed_xml_is_an_error() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("coverage.xml");
    fs::write(&report, "<coverage><class></coverage>").unwrap();

    let err = coverage::parse(&report, CoverageFormat::Cobertura).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// --- jacoco ---

#[test]
fn jacoco_rebuilds_paths_with_the_maven_layout() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("jacoco.xml");
    fs::write(
        &report,
        r#"<report>
  <package name="com/example">
    <sourcefile name="Calculator.java">
      <line nr="4" mi="0" ci="2"/>
      <line nr="5" mi="1" ci="0"/>
      <line nr="6" mi="0" ci="1"/>
    </sourcefile>
  </package>
</report>"#,
    )
    .unwrap();

    let map = coverage::parse(&report, CoverageFormat::Jacoco).unwrap();
    let cov = &map.files["src/main/java/com/example/Calculator.java"];
    assert_eq!(cov.executed.iter().copied().collect::<Vec<_>>(), vec![4, 6]);
    assert_eq!(cov.unexecuted.iter().copied().collect::<Vec<_>>(), vec![5]);
    assert_eq!(map.line_rate, 0.67);
}

#[test]
fn jacoco_missing_line_attribute_is_an_error() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("jacoco.xml");
    fs::write(
        &report,
        r#"<report><package name="p"><sourcefile name="A.java"><line nr="1"/></sourcefile></package></report>"#,
    )
    .unwrap();

    let err = coverage::parse(&report, CoverageFormat::Jacoco).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}
