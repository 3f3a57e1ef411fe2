use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};

/// Version-control collaborator: which files changed relative to the
/// last commit, and which lines within one of them.
pub trait DiffSource {
    fn modified_files(&self) -> Result<Vec<String>>;
    fn modified_lines(&self, path: &str) -> Result<Vec<usize>>;
}

/// `DiffSource` backed by the `git` binary.
pub struct GitDiff {
    workdir: PathBuf,
}

impl GitDiff {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        GitDiff {
            workdir: workdir.into(),
        }
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()?;
        if !output.status.success() {
            return Err(Error::Configuration(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DiffSource for GitDiff {
    fn modified_files(&self) -> Result<Vec<String>> {
        let out = self.run_git(&["diff", "--name-only", "HEAD"])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    fn modified_lines(&self, path: &str) -> Result<Vec<usize>> {
        let out = self.run_git(&["diff", "-U0", "HEAD", "--", path])?;
        Ok(parse_hunk_lines(&out))
    }
}

/// Recover the added/modified line numbers in the new file from unified
/// diff hunk headers `@@ -a,b +c,d @@`: the range is `[c, c + d)`. An
/// omitted count means 1; a zero count (pure deletion) contributes
/// nothing.
pub fn parse_hunk_lines(diff_output: &str) -> Vec<usize> {
    let mut lines = Vec::new();
    for line in diff_output.lines() {
        if !line.starts_with("@@") {
            continue;
        }
        let Some(new_part) = line.split_whitespace().nth(2) else {
            continue;
        };
        let Some(spec) = new_part.strip_prefix('+') else {
            continue;
        };
        let (start, count) = match spec.split_once(',') {
            Some((s, c)) => (s, c),
            None => (spec, "1"),
        };
        let (Ok(start), Ok(count)) = (start.parse::<usize>(), count.parse::<usize>()) else {
            continue;
        };
        lines.extend(start..start + count);
    }
    lines
}
