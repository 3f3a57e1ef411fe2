use std::collections::{BTreeMap, BTreeSet};

use crate::config::RunConfig;
use crate::coverage::CoverageMap;
use crate::error::{Error, Result};
use crate::git::DiffSource;

/// Name fragments that mark a file as test code rather than a mutation
/// target.
pub const TEST_FILE_PATTERNS: &[&str] = &[
    "test_", "_test", ".test", ".spec", ".tests", ".Test", "tests/", "test/",
];

/// The file/line universe eligible for mutation in one run. The two
/// selection modes feed the same downstream pipeline; only this mapping
/// differs.
#[derive(Debug, Clone, Default)]
pub struct MutationScope {
    pub targets: BTreeMap<String, BTreeSet<usize>>,
}

/// Full scope: every covered file minus excludes and test files, with
/// its executed-line set as targets. Files with nothing executed are
/// skipped.
pub fn full_scope(coverage: &CoverageMap, config: &RunConfig) -> Result<MutationScope> {
    let mut scope = MutationScope::default();
    for (path, file) in &coverage.files {
        if should_skip_file(path, config)? {
            continue;
        }
        if file.executed.is_empty() {
            continue;
        }
        scope.targets.insert(path.clone(), file.executed.clone());
    }
    Ok(scope)
}

/// Diff scope: files changed relative to the last commit, intersected
/// with the covered-file set, with the changed lines as targets.
pub fn diff_scope(
    coverage: &CoverageMap,
    config: &RunConfig,
    diff: &dyn DiffSource,
) -> Result<MutationScope> {
    let mut scope = MutationScope::default();
    for path in diff.modified_files()? {
        if !coverage.files.contains_key(&path) {
            continue;
        }
        if should_skip_file(&path, config)? {
            continue;
        }
        let lines: BTreeSet<usize> = diff.modified_lines(&path)?.into_iter().collect();
        if lines.is_empty() {
            log::debug!("no modified lines found in {path}, skipping");
            continue;
        }
        scope.targets.insert(path, lines);
    }
    Ok(scope)
}

/// An explicit include list overrides everything else; a listed file
/// missing on disk is fatal.
fn should_skip_file(path: &str, config: &RunConfig) -> Result<bool> {
    if !config.only_mutate.is_empty() {
        for listed in &config.only_mutate {
            if !config.workdir.join(listed).exists() {
                return Err(Error::Configuration(format!(
                    "file {listed} does not exist"
                )));
            }
        }
        return Ok(config.only_mutate.iter().all(|listed| listed != path));
    }
    if config.exclude_files.iter().any(|excluded| excluded == path) {
        return Ok(true);
    }
    Ok(TEST_FILE_PATTERNS.iter().any(|pattern| path.contains(pattern)))
}
