use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Format selector for the coverage report handed to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    Lcov,
    Cobertura,
    Jacoco,
}

impl CoverageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverageFormat::Lcov => "lcov",
            CoverageFormat::Cobertura => "cobertura",
            CoverageFormat::Jacoco => "jacoco",
        }
    }
}

impl FromStr for CoverageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lcov" => Ok(CoverageFormat::Lcov),
            "cobertura" => Ok(CoverageFormat::Cobertura),
            "jacoco" => Ok(CoverageFormat::Jacoco),
            other => Err(Error::Configuration(format!(
                "unknown coverage format '{other}', expected lcov, cobertura or jacoco"
            ))),
        }
    }
}

/// Everything one run needs. Components receive this explicitly; there
/// is no process-global configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Coverage report produced by a prior run of the test suite.
    pub coverage_report: PathBuf,
    pub coverage_format: CoverageFormat,
    /// Opaque command line that runs the whole suite.
    pub test_command: String,
    /// Wall-clock budget for one test invocation.
    pub timeout: Duration,
    /// Restrict scope to lines changed relative to the last commit.
    pub modified_only: bool,
    /// Paths excluded from mutation (exact matches against scope keys).
    pub exclude_files: Vec<String>,
    /// When non-empty, mutate only these paths. Each must exist.
    pub only_mutate: Vec<String>,
    /// Mutation store location.
    pub db_path: PathBuf,
    /// Where mutant candidate files are kept. `None` means an ephemeral
    /// directory that is dropped when the run ends.
    pub mutants_dir: Option<PathBuf>,
    /// Directory the test command runs from; scope keys resolve
    /// against it.
    pub workdir: PathBuf,
}

impl RunConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_DB_PATH: &'static str = "faultline.db";

    pub fn new(
        coverage_report: impl Into<PathBuf>,
        coverage_format: CoverageFormat,
        test_command: impl Into<String>,
    ) -> Self {
        RunConfig {
            coverage_report: coverage_report.into(),
            coverage_format,
            test_command: test_command.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            modified_only: false,
            exclude_files: Vec::new(),
            only_mutate: Vec::new(),
            db_path: PathBuf::from(Self::DEFAULT_DB_PATH),
            mutants_dir: None,
            workdir: PathBuf::from("."),
        }
    }
}
