use std::path::Path;

use console::Style;
use similar::{ChangeTag, TextDiff};

use crate::error::Result;
use crate::store::{MutantStatus, MutationStore, RunSummary, StoredMutant};

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

pub fn print_summary(summary: &RunSummary, duration_ms: u64) {
    let scored = summary.killed + summary.survived;

    if summary.survived == 0 {
        let style = Style::new().green().bold();
        println!(
            "{} {} mutants, all killed ({:.1}%) in {:.1}s",
            style.apply_to("✓"),
            scored,
            summary.score,
            duration_ms as f64 / 1000.0,
        );
    } else {
        let style = Style::new().yellow().bold();
        println!(
            "{} {} survived / {} scored ({:.1}% killed) in {:.1}s",
            style.apply_to("!"),
            summary.survived,
            scored,
            summary.score,
            duration_ms as f64 / 1000.0,
        );
    }

    let dim = Style::new().dim();
    if summary.timeout > 0 {
        println!("  {} {} mutants timed out", dim.apply_to("·"), summary.timeout);
    }
    if summary.syntax_error > 0 {
        println!(
            "  {} {} mutants failed syntax validation",
            dim.apply_to("·"),
            summary.syntax_error
        );
    }
    if summary.unexpected_error > 0 {
        println!(
            "  {} {} mutants ended with unexpected test results",
            dim.apply_to("·"),
            summary.unexpected_error
        );
    }
}

pub fn print_status(summary: &RunSummary) {
    println!(
        "Stored mutants: {} total, {} killed, {} survived ({:.1}% score)",
        summary.total, summary.killed, summary.survived, summary.score,
    );
    if summary.timeout + summary.syntax_error + summary.unexpected_error > 0 {
        println!(
            "  excluded from score: {} timeout, {} syntax error, {} unexpected",
            summary.timeout, summary.syntax_error, summary.unexpected_error,
        );
    }
}

/// List surviving mutants for the files a run touched.
pub fn print_survivors(store: &MutationStore, files: &[String]) -> Result<()> {
    let loc_style = Style::new().dim();
    let op_style = Style::new().magenta();

    let mut any = false;
    for file in files {
        for m in store.mutants_for(file)? {
            if m.status != MutantStatus::Survived {
                continue;
            }
            if !any {
                println!();
                any = true;
            }
            println!(
                "  {}:{} {} {} → {}",
                file,
                m.line_number,
                loc_style.apply_to(format!("[{}]", m.operator)),
                op_style.apply_to(&m.original_code),
                op_style.apply_to(&m.mutated_code),
            );
        }
    }
    Ok(())
}

pub fn print_mutant_detail(path: &str, m: &StoredMutant) {
    let head_style = Style::new().cyan().bold();
    println!(
        "{} {}:{} [{}] {}",
        head_style.apply_to(m.status.as_str()),
        path,
        m.line_number,
        m.operator,
        m.description,
    );

    for line in render_diff(&m.original_code, &m.mutated_code).lines() {
        if line.starts_with('-') {
            println!("  {}", Style::new().red().apply_to(line));
        } else if line.starts_with('+') {
            println!("  {}", Style::new().green().apply_to(line));
        }
    }

    if !m.error_msg.is_empty() {
        let dim = Style::new().dim();
        for line in m.error_msg.lines().take(10) {
            println!("  {}", dim.apply_to(line));
        }
    }
}

pub fn render_diff(original: &str, mutated: &str) -> String {
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => {
                output.push_str(&format!("- {}", change));
            }
            ChangeTag::Insert => {
                output.push_str(&format!("+ {}", change));
            }
            _ => {}
        }
    }
    output
}

/// Best-effort machine summary next to the store.
pub fn write_json_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        std::fs::write(path, json)?;
    }
    Ok(())
}
