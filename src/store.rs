use std::path::Path;
use std::str::FromStr;
use std::time::UNIX_EPOCH;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS source_files (
    id             INTEGER PRIMARY KEY,
    file_path      TEXT UNIQUE NOT NULL,
    last_modified  INTEGER
);

CREATE TABLE IF NOT EXISTS file_versions (
    id              INTEGER PRIMARY KEY,
    source_file_id  INTEGER NOT NULL REFERENCES source_files(id),
    content_hash    TEXT NOT NULL,
    content         TEXT NOT NULL,
    created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (source_file_id, content_hash)
);

CREATE TABLE IF NOT EXISTS mutants (
    id               INTEGER PRIMARY KEY,
    file_version_id  INTEGER NOT NULL REFERENCES file_versions(id),
    status           TEXT NOT NULL,
    operator         TEXT NOT NULL,
    line_number      INTEGER NOT NULL,
    original_code    TEXT NOT NULL,
    mutated_code     TEXT NOT NULL,
    description      TEXT NOT NULL,
    error_msg        TEXT NOT NULL,
    created_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

const EXPECTED_TABLES: &[(&str, &[&str])] = &[
    ("source_files", &["id", "file_path", "last_modified"]),
    (
        "file_versions",
        &[
            "id",
            "source_file_id",
            "content_hash",
            "content",
            "created_at",
        ],
    ),
    (
        "mutants",
        &[
            "id",
            "file_version_id",
            "status",
            "operator",
            "line_number",
            "original_code",
            "mutated_code",
            "description",
            "error_msg",
            "created_at",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutantStatus {
    Pending,
    Killed,
    Survived,
    Timeout,
    SyntaxError,
    UnexpectedError,
}

impl MutantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MutantStatus::Pending => "PENDING",
            MutantStatus::Killed => "KILLED",
            MutantStatus::Survived => "SURVIVED",
            MutantStatus::Timeout => "TIMEOUT",
            MutantStatus::SyntaxError => "SYNTAX_ERROR",
            MutantStatus::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }
}

impl FromStr for MutantStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(MutantStatus::Pending),
            "KILLED" => Ok(MutantStatus::Killed),
            "SURVIVED" => Ok(MutantStatus::Survived),
            "TIMEOUT" => Ok(MutantStatus::Timeout),
            "SYNTAX_ERROR" => Ok(MutantStatus::SyntaxError),
            "UNEXPECTED_ERROR" => Ok(MutantStatus::UnexpectedError),
            other => Err(Error::Configuration(format!(
                "unknown mutant status '{other}'"
            ))),
        }
    }
}

/// Mutant record as handed to the store. Status is terminal on insert;
/// rows are never updated.
#[derive(Debug, Clone)]
pub struct MutantRecord {
    pub status: MutantStatus,
    pub operator: String,
    pub line_number: usize,
    pub original_code: String,
    pub mutated_code: String,
    pub description: String,
    pub error_msg: String,
}

/// A committed mutant row.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMutant {
    pub id: i64,
    pub status: MutantStatus,
    pub operator: String,
    pub line_number: usize,
    pub original_code: String,
    pub mutated_code: String,
    pub description: String,
    pub error_msg: String,
    pub created_at: String,
}

/// Result of `get_or_create_file_version`.
#[derive(Debug, Clone, Copy)]
pub struct FileVersion {
    pub version_id: i64,
    pub source_file_id: i64,
    /// True when the current content digest matched a stored snapshot.
    pub is_existing: bool,
}

/// The latest stored snapshot of a file.
#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub version_id: i64,
    pub content_hash: String,
    pub created_at: String,
}

/// Aggregate counts over committed mutant rows. The score counts only
/// killed and survived mutants; the other states reflect tooling or
/// proposal issues, not test-suite strength.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub killed: usize,
    pub survived: usize,
    pub timeout: usize,
    pub syntax_error: usize,
    pub unexpected_error: usize,
    /// killed / (killed + survived), as a percentage. 0.0 when no
    /// mutant reached a verdict.
    pub score: f64,
}

/// Durable, content-hashed record of source-file versions and mutants.
/// Single-writer, auto-committing: readers only ever observe committed
/// rows.
pub struct MutationStore {
    conn: Connection,
}

impl MutationStore {
    pub fn open(path: &Path) -> Result<MutationStore> {
        let existed = path.exists();
        let conn = Connection::open(path)?;
        if existed && !schema_matches(&conn)? {
            log::warn!(
                "schema mismatch in {}, rebuilding mutation store",
                path.display()
            );
            conn.execute_batch(
                "DROP TABLE IF EXISTS mutants;
                 DROP TABLE IF EXISTS file_versions;
                 DROP TABLE IF EXISTS source_files;",
            )?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(MutationStore { conn })
    }

    pub fn in_memory() -> Result<MutationStore> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(MutationStore { conn })
    }

    /// Hash the file's current content and return the matching stored
    /// version, or insert a new snapshot. `key` is the stable path
    /// string rows are keyed by; `path` is where the bytes live now.
    pub fn get_or_create_file_version(&self, key: &str, path: &Path) -> Result<FileVersion> {
        let content = std::fs::read_to_string(path)?;
        let digest = hex::encode(Sha256::digest(content.as_bytes()));
        let mtime = std::fs::metadata(path)?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        self.conn.execute(
            "INSERT INTO source_files (file_path, last_modified) VALUES (?1, ?2)
             ON CONFLICT(file_path) DO UPDATE SET last_modified = ?2",
            params![key, mtime],
        )?;
        let source_file_id: i64 = self.conn.query_row(
            "SELECT id FROM source_files WHERE file_path = ?1",
            params![key],
            |row| row.get(0),
        )?;

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM file_versions
                 WHERE source_file_id = ?1 AND content_hash = ?2",
                params![source_file_id, digest],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(version_id) = existing {
            return Ok(FileVersion {
                version_id,
                source_file_id,
                is_existing: true,
            });
        }

        self.conn.execute(
            "INSERT INTO file_versions (source_file_id, content_hash, content)
             VALUES (?1, ?2, ?3)",
            params![source_file_id, digest, content],
        )?;
        Ok(FileVersion {
            version_id: self.conn.last_insert_rowid(),
            source_file_id,
            is_existing: false,
        })
    }

    /// Delete a version's mutants. Invoked before re-inserting a batch
    /// for unchanged content, which keeps repeated runs idempotent
    /// rather than cumulative.
    pub fn prune_mutants(&self, version_id: i64) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM mutants WHERE file_version_id = ?1",
            params![version_id],
        )?;
        Ok(deleted)
    }

    pub fn add_mutant(&self, version_id: i64, record: &MutantRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO mutants (file_version_id, status, operator, line_number,
                                  original_code, mutated_code, description, error_msg)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                version_id,
                record.status.as_str(),
                record.operator,
                record.line_number as i64,
                record.original_code,
                record.mutated_code,
                record.description,
                record.error_msg,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn summary(&self) -> Result<RunSummary> {
        let (total, killed, survived, timeout, syntax_error, unexpected_error) =
            self.conn.query_row(
                "SELECT COUNT(*),
                        SUM(CASE WHEN status = 'KILLED' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN status = 'SURVIVED' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN status = 'TIMEOUT' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN status = 'SYNTAX_ERROR' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN status = 'UNEXPECTED_ERROR' THEN 1 ELSE 0 END)
                 FROM mutants",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                        row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                    ))
                },
            )?;

        let score = if killed + survived > 0 {
            killed as f64 / (killed + survived) as f64 * 100.0
        } else {
            0.0
        };
        Ok(RunSummary {
            total: total as usize,
            killed: killed as usize,
            survived: survived as usize,
            timeout: timeout as usize,
            syntax_error: syntax_error as usize,
            unexpected_error: unexpected_error as usize,
            score,
        })
    }

    /// All mutants for a path across its stored versions, ordered by
    /// line number.
    pub fn mutants_for(&self, path: &str) -> Result<Vec<StoredMutant>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.status, m.operator, m.line_number, m.original_code,
                    m.mutated_code, m.description, m.error_msg, m.created_at
             FROM mutants m
             JOIN file_versions fv ON m.file_version_id = fv.id
             JOIN source_files sf ON fv.source_file_id = sf.id
             WHERE sf.file_path = ?1
             ORDER BY m.line_number",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            let status_text: String = row.get(1)?;
            let status = MutantStatus::from_str(&status_text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
            Ok(StoredMutant {
                id: row.get(0)?,
                status,
                operator: row.get(2)?,
                line_number: row.get::<_, i64>(3)? as usize,
                original_code: row.get(4)?,
                mutated_code: row.get(5)?,
                description: row.get(6)?,
                error_msg: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// The latest stored version of a path, if any.
    pub fn file_version_for(&self, path: &str) -> Result<Option<StoredVersion>> {
        self.conn
            .query_row(
                "SELECT fv.id, fv.content_hash, fv.created_at
                 FROM file_versions fv
                 JOIN source_files sf ON fv.source_file_id = sf.id
                 WHERE sf.file_path = ?1
                 ORDER BY fv.id DESC
                 LIMIT 1",
                params![path],
                |row| {
                    Ok(StoredVersion {
                        version_id: row.get(0)?,
                        content_hash: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Error::from)
    }
}

fn schema_matches(conn: &Connection) -> Result<bool> {
    for (table, expected) in EXPECTED_TABLES {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let mut columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<_>>()?;
        columns.sort();
        let mut wanted: Vec<String> = expected.iter().map(|c| c.to_string()).collect();
        wanted.sort();
        if columns != wanted {
            return Ok(false);
        }
    }
    Ok(true)
}
