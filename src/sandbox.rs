use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

pub const BACKUP_SUFFIX: &str = "flbak";

/// Terminal classification of one sandboxed test invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestVerdict {
    /// Tests passed despite the injected fault.
    Survived,
    /// Tests detected the fault (exit code 1).
    Killed { output: String },
    /// Exit code outside {0, 1}, or death by signal.
    Unexpected { output: String },
    /// Wall-clock budget expired; the subprocess was killed.
    TimedOut,
}

/// Scoped swap of a mutant over the original file. Restoration runs on
/// Drop, so the working tree is whole on every exit path, panics
/// included.
#[derive(Debug)]
pub struct SourceSwapper {
    original: PathBuf,
    backup: PathBuf,
}

pub fn backup_path(original: &Path) -> PathBuf {
    let mut backup = original.as_os_str().to_owned();
    backup.push(".");
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

impl SourceSwapper {
    /// Move the original aside and copy the mutant into its place.
    /// Precondition: the backup slot for this path is free. At most one
    /// swap may be in flight per path; a taken slot is a caller bug,
    /// not a recoverable run state.
    pub fn swap(original: &Path, mutant: &Path) -> Result<SourceSwapper> {
        let backup = backup_path(original);
        if backup.exists() {
            return Err(Error::SandboxProtocol(format!(
                "backup {} already exists; another swap is in flight for {}",
                backup.display(),
                original.display()
            )));
        }
        std::fs::rename(original, &backup)?;
        let swapper = SourceSwapper {
            original: original.to_path_buf(),
            backup,
        };
        // The guard exists from here on, so a failed copy still
        // restores the original.
        std::fs::copy(mutant, original)?;
        Ok(swapper)
    }
}

impl Drop for SourceSwapper {
    fn drop(&mut self) {
        if self.original.exists() {
            let _ = std::fs::remove_file(&self.original);
        }
        if self.backup.exists() {
            let _ = std::fs::rename(&self.backup, &self.original);
        }
        let _ = std::fs::remove_file(&self.backup);
    }
}

pub fn parse_test_cmd(cmd: &str) -> (String, Vec<String>) {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    if parts.len() > 1 {
        (
            parts[0].to_string(),
            parts[1..].iter().map(|s| s.to_string()).collect(),
        )
    } else {
        (cmd.to_string(), vec![])
    }
}

/// Swap `mutant` in for `original`, run the test command under the
/// timeout, classify the outcome, and restore the original.
pub fn run_mutant(
    original: &Path,
    mutant: &Path,
    test_cmd: &str,
    workdir: &Path,
    timeout: Duration,
) -> Result<TestVerdict> {
    let _swap = SourceSwapper::swap(original, mutant)?;
    run_test_command(test_cmd, workdir, timeout)
}

/// Run the suite against the unmutated tree. A failing baseline means
/// no mutant verdict could be trusted.
pub fn dry_run(test_cmd: &str, workdir: &Path) -> Result<()> {
    let (program, args) = parse_test_cmd(test_cmd);
    let output = Command::new(&program)
        .args(&args)
        .current_dir(workdir)
        .output()?;
    if output.status.success() {
        return Ok(());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(Error::Configuration(format!(
        "tests fail before mutation; fix failing tests first\n{stdout}\n{stderr}"
    )))
}

fn run_test_command(test_cmd: &str, workdir: &Path, timeout: Duration) -> Result<TestVerdict> {
    let (program, args) = parse_test_cmd(test_cmd);
    let mut child = Command::new(&program)
        .args(&args)
        .current_dir(workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes off-thread so a chatty suite cannot deadlock us.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break Some(status),
            None => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
    };

    let mut output = stdout.join().unwrap_or_default();
    output.push_str(&stderr.join().unwrap_or_default());

    let Some(status) = status else {
        return Ok(TestVerdict::TimedOut);
    };
    Ok(match status.code() {
        Some(0) => TestVerdict::Survived,
        Some(1) => TestVerdict::Killed { output },
        _ => TestVerdict::Unexpected { output },
    })
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_string(&mut buf);
        }
        buf
    })
}
