use std::path::PathBuf;

use thiserror::Error;

/// Engine-level error taxonomy. Per-mutant failures are recorded as
/// mutant statuses, not errors; these variants cover everything that
/// escapes a single mutant.
#[derive(Debug, Error)]
pub enum Error {
    /// Unusable input: bad format selector, unreadable or malformed
    /// coverage report, include-listed file missing on disk, or a test
    /// suite that fails before any mutation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No grammar is registered for the file's extension.
    #[error("no grammar registered for {}", path.display())]
    UnsupportedLanguage { path: PathBuf },

    /// A mutated candidate failed reparse under the file's grammar.
    #[error("mutant for {} failed syntax validation", path.display())]
    Syntax { path: PathBuf },

    /// The single-backup-slot invariant was violated. This is a bug in
    /// the caller, not a recoverable run state.
    #[error("sandbox protocol violation: {0}")]
    SandboxProtocol(String),

    /// Mutation store failure.
    #[error("store error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// A mutation proposer rejected a block or produced garbage.
    #[error("proposer error: {0}")]
    Proposer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
