use std::path::{Path, PathBuf};

use crate::blocks;
use crate::error::{Error, Result};

/// A single textual edit against one file's current content.
#[derive(Debug, Clone)]
pub enum SourceEdit {
    /// Replace one 1-based line's text, keeping the line's original
    /// leading whitespace.
    ReplaceLine { line: usize, text: String },
    /// Splice `text` over the byte range `[start_byte, end_byte)`.
    ReplaceRange {
        start_byte: usize,
        end_byte: usize,
        text: String,
    },
}

pub fn apply(original: &str, edit: &SourceEdit) -> Result<String> {
    match edit {
        SourceEdit::ReplaceLine { line, text } => replace_line(original, *line, text),
        SourceEdit::ReplaceRange {
            start_byte,
            end_byte,
            text,
        } => replace_range(original, *start_byte, *end_byte, text),
    }
}

/// Apply the edit, validate the candidate's syntax, and persist it to
/// an isolated mutant file. A candidate that fails reparse is never
/// written or scheduled for execution.
pub fn prepare_candidate(
    source_path: &Path,
    original: &str,
    edit: &SourceEdit,
    mutants_dir: &Path,
) -> Result<PathBuf> {
    let candidate = apply(original, edit)?;
    if !blocks::check_syntax(source_path, &candidate)? {
        return Err(Error::Syntax {
            path: source_path.to_path_buf(),
        });
    }
    write_candidate(mutants_dir, source_path, &candidate)
}

/// Persist candidate bytes under `<fresh 8-hex id>_<original basename>`
/// so concurrently generated candidates for different files cannot
/// collide.
pub fn write_candidate(mutants_dir: &Path, source_path: &Path, candidate: &str) -> Result<PathBuf> {
    let base = source_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let name = format!("{:08x}_{}", fastrand::u32(..), base);
    let path = mutants_dir.join(name);
    std::fs::write(&path, candidate)?;
    Ok(path)
}

fn replace_line(original: &str, line: usize, text: &str) -> Result<String> {
    let count = original.lines().count();
    if line == 0 || line > count {
        return Err(Error::Proposer(format!(
            "line {line} is outside the file (1..={count})"
        )));
    }

    let mut out = String::with_capacity(original.len() + text.len());
    for (idx, current) in original.lines().enumerate() {
        if idx + 1 == line {
            let indent_len = current.len() - current.trim_start().len();
            out.push_str(&current[..indent_len]);
            out.push_str(text.trim());
        } else {
            out.push_str(current);
        }
        out.push('\n');
    }
    if !original.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

fn replace_range(original: &str, start: usize, end: usize, text: &str) -> Result<String> {
    if start > end || end > original.len() {
        return Err(Error::Proposer(format!(
            "byte range {start}..{end} is outside the file ({} bytes)",
            original.len()
        )));
    }
    if !original.is_char_boundary(start) || !original.is_char_boundary(end) {
        return Err(Error::Proposer(format!(
            "byte range {start}..{end} splits a character"
        )));
    }
    let mut out = String::with_capacity(original.len() + text.len());
    out.push_str(&original[..start]);
    out.push_str(text);
    out.push_str(&original[end..]);
    Ok(out)
}
