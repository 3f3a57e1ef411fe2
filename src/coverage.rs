use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::CoverageFormat;
use crate::error::{Error, Result};

/// Executed/unexecuted line partition for one source file.
#[derive(Debug, Clone, Default)]
pub struct FileCoverage {
    pub executed: BTreeSet<usize>,
    pub unexecuted: BTreeSet<usize>,
}

/// Per-file line coverage plus the aggregate rate across the whole
/// report. Built all-or-nothing: parse errors never leak a partial map.
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    pub files: BTreeMap<String, FileCoverage>,
    pub line_rate: f64,
}

impl CoverageMap {
    pub fn covered_files(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    pub fn executed_lines(&self, path: &str) -> Option<&BTreeSet<usize>> {
        self.files.get(path).map(|f| &f.executed)
    }
}

pub fn parse(report_path: &Path, format: CoverageFormat) -> Result<CoverageMap> {
    check_report_file(report_path, format)?;
    let raw = std::fs::read_to_string(report_path)?;
    match format {
        CoverageFormat::Lcov => parse_lcov(&raw),
        CoverageFormat::Cobertura => parse_cobertura(&raw),
        CoverageFormat::Jacoco => parse_jacoco(&raw),
    }
}

fn check_report_file(path: &Path, format: CoverageFormat) -> Result<()> {
    if !path.exists() {
        return Err(Error::Configuration(format!(
            "coverage report '{}' not found",
            path.display()
        )));
    }
    let expected = match format {
        CoverageFormat::Lcov => "info",
        CoverageFormat::Cobertura | CoverageFormat::Jacoco => "xml",
    };
    let actual = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if actual != expected {
        return Err(Error::Configuration(format!(
            "coverage report '{}' is not a .{} file (required for {} format)",
            path.display(),
            expected,
            format.as_str()
        )));
    }
    Ok(())
}

/// Line-oriented state machine: `SF:` opens a file section, `DA:` adds
/// a hit record to it, `end_of_record` closes it.
fn parse_lcov(raw: &str) -> Result<CoverageMap> {
    let mut map = CoverageMap::default();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        let line = line.trim();
        if let Some(path) = line.strip_prefix("SF:") {
            map.files.entry(path.to_string()).or_default();
            current = Some(path.to_string());
        } else if let Some(record) = line.strip_prefix("DA:") {
            let Some(file) = current.as_deref() else {
                continue;
            };
            let (number, hits) = record.split_once(',').ok_or_else(|| {
                Error::Configuration(format!("malformed lcov hit record 'DA:{record}'"))
            })?;
            let number: usize = number.trim().parse().map_err(|_| {
                Error::Configuration(format!("malformed lcov line number in 'DA:{record}'"))
            })?;
            let hits: u64 = hits.trim().parse().map_err(|_| {
                Error::Configuration(format!("malformed lcov hit count in 'DA:{record}'"))
            })?;
            if let Some(cov) = map.files.get_mut(file) {
                if hits > 0 {
                    cov.executed.insert(number);
                } else {
                    cov.unexecuted.insert(number);
                }
            }
        } else if line.starts_with("end_of_record") {
            current = None;
        }
    }

    map.line_rate = aggregate_rate(&map.files);
    Ok(map)
}

/// Class-line schema: every `<class filename=..>` node with nested
/// `<line number=.. hits=..>` records.
fn parse_cobertura(raw: &str) -> Result<CoverageMap> {
    let doc = roxmltree::Document::parse(raw)
        .map_err(|e| Error::Configuration(format!("malformed cobertura report: {e}")))?;
    let mut map = CoverageMap::default();

    for class in doc.descendants().filter(|n| n.has_tag_name("class")) {
        let Some(filename) = class.attribute("filename") else {
            continue;
        };
        let cov = map.files.entry(filename.to_string()).or_default();
        for line in class.descendants().filter(|n| n.has_tag_name("line")) {
            let number = numeric_attribute(&line, "number")?;
            let hits = numeric_attribute(&line, "hits")?;
            if hits > 0 {
                cov.executed.insert(number);
            } else {
                cov.unexecuted.insert(number);
            }
        }
    }

    // Prefer the report's own aggregate when it carries one.
    let rate = doc
        .root_element()
        .attribute("line-rate")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or_else(|| aggregate_rate(&map.files));
    map.line_rate = rate;
    Ok(map)
}

/// Package-sourcefile schema. Paths are rebuilt with the fixed Maven
/// layout `src/main/java/<package>/<sourcefile>`; other layouts surface
/// as unmatched coverage paths rather than guessed ones.
fn parse_jacoco(raw: &str) -> Result<CoverageMap> {
    let doc = roxmltree::Document::parse(raw)
        .map_err(|e| Error::Configuration(format!("malformed jacoco report: {e}")))?;
    let mut map = CoverageMap::default();

    for package in doc.descendants().filter(|n| n.has_tag_name("package")) {
        let Some(package_name) = package.attribute("name") else {
            continue;
        };
        for sourcefile in package
            .descendants()
            .filter(|n| n.has_tag_name("sourcefile"))
        {
            let Some(name) = sourcefile.attribute("name") else {
                continue;
            };
            let path = format!("src/main/java/{package_name}/{name}");
            let cov = map.files.entry(path).or_default();
            for line in sourcefile.descendants().filter(|n| n.has_tag_name("line")) {
                let number = numeric_attribute(&line, "nr")?;
                let covered = numeric_attribute(&line, "ci")?;
                if covered > 0 {
                    cov.executed.insert(number);
                } else {
                    cov.unexecuted.insert(number);
                }
            }
        }
    }

    map.line_rate = aggregate_rate(&map.files);
    Ok(map)
}

fn numeric_attribute(node: &roxmltree::Node, name: &str) -> Result<usize> {
    node.attribute(name)
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| {
            Error::Configuration(format!(
                "coverage report <{}> node has a missing or non-numeric '{}' attribute",
                node.tag_name().name(),
                name
            ))
        })
}

fn aggregate_rate(files: &BTreeMap<String, FileCoverage>) -> f64 {
    let executed: usize = files.values().map(|f| f.executed.len()).sum();
    let missed: usize = files.values().map(|f| f.unexecuted.len()).sum();
    if executed + missed == 0 {
        return 0.0;
    }
    let rate = executed as f64 / (executed + missed) as f64;
    (rate * 100.0).round() / 100.0
}
