use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::apply::{self, SourceEdit};
use crate::blocks;
use crate::config::RunConfig;
use crate::coverage;
use crate::detect_language;
use crate::error::{Error, Result};
use crate::git::DiffSource;
use crate::proposer::{MutationProposal, MutationProposer, ProposalContext};
use crate::report;
use crate::sandbox::{self, TestVerdict};
use crate::scope;
use crate::store::{MutantRecord, MutantStatus, MutationStore, RunSummary};

/// Drive the full pipeline: coverage analysis, scoped mutation testing,
/// report. Stage 1 failure is fatal; stage 2 and 3 failures are logged
/// and the run still ends with a summary.
pub fn run(
    config: &RunConfig,
    proposer: &dyn MutationProposer,
    diff: &dyn DiffSource,
    json_mode: bool,
) -> Result<RunSummary> {
    let start = Instant::now();

    log::info!("starting coverage analysis");
    sandbox::dry_run(&config.test_command, &config.workdir)?;
    let coverage = coverage::parse(&config.coverage_report, config.coverage_format)?;
    log::info!(
        "line coverage rate {:.2} across {} file(s)",
        coverage.line_rate,
        coverage.files.len()
    );

    let store = MutationStore::open(&config.db_path)?;

    // The ephemeral mutants workspace must outlive stage 2.
    let mut _ephemeral: Option<tempfile::TempDir> = None;
    let mutants_dir: PathBuf = match &config.mutants_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => {
            let tmp = tempfile::Builder::new().prefix("faultline-").tempdir()?;
            let path = tmp.path().to_path_buf();
            _ephemeral = Some(tmp);
            path
        }
    };

    let mut files: Vec<String> = Vec::new();
    if let Err(e) = run_mutation_stage(config, proposer, diff, &coverage, &store, &mutants_dir, &mut files)
    {
        log::error!("mutation testing stage failed: {e}");
    }

    let summary = match store.summary() {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("failed to aggregate mutant summary: {e}");
            RunSummary::default()
        }
    };
    let duration_ms = start.elapsed().as_millis() as u64;
    emit_report(&store, &summary, config, &files, json_mode, duration_ms);
    log::info!("mutation testing ended, took {duration_ms}ms");
    Ok(summary)
}

fn run_mutation_stage(
    config: &RunConfig,
    proposer: &dyn MutationProposer,
    diff: &dyn DiffSource,
    coverage: &coverage::CoverageMap,
    store: &MutationStore,
    mutants_dir: &Path,
    files: &mut Vec<String>,
) -> Result<()> {
    let scope = if config.modified_only {
        log::info!("running mutation testing on modified files");
        scope::diff_scope(coverage, config, diff)?
    } else {
        log::info!("running mutation testing on the covered codebase");
        scope::full_scope(coverage, config)?
    };
    log::info!("{} file(s) in scope", scope.targets.len());

    for (key, target_lines) in &scope.targets {
        files.push(key.clone());
        if let Err(e) = process_file(config, proposer, store, mutants_dir, key, target_lines) {
            // A violated backup-slot invariant is a bug, not a per-file
            // condition; stop the stage instead of corrupting more swaps.
            if matches!(e, Error::SandboxProtocol(_)) {
                return Err(e);
            }
            log::error!("skipping {key}: {e}");
        }
    }
    Ok(())
}

fn process_file(
    config: &RunConfig,
    proposer: &dyn MutationProposer,
    store: &MutationStore,
    mutants_dir: &Path,
    key: &str,
    target_lines: &BTreeSet<usize>,
) -> Result<()> {
    let path = config.workdir.join(key);
    let source = std::fs::read_to_string(&path)?;
    let language = detect_language(&path).ok_or_else(|| Error::UnsupportedLanguage {
        path: path.clone(),
    })?;

    let version = store.get_or_create_file_version(key, &path)?;
    if version.is_existing {
        let pruned = store.prune_mutants(version.version_id)?;
        if pruned > 0 {
            log::debug!("pruned {pruned} stale mutant(s) for unchanged {key}");
        }
    }

    let covered = blocks::covered_blocks(&path, &source, target_lines)?;
    log::info!("{key}: {} covered block(s)", covered.len());

    for covered_block in &covered {
        let block = &covered_block.block;
        let snippet = &source[block.start_byte..block.end_byte];
        let ctx = ProposalContext {
            path: &path,
            language: language.tag(),
            block_source: snippet,
            covered_offsets: &covered_block.executed_offsets,
        };
        let proposals = match proposer.propose(&ctx) {
            Ok(proposals) => proposals,
            Err(e) => {
                log::error!("proposer failed on {key}:{}: {e}", block.start_line);
                continue;
            }
        };

        for proposal in &proposals {
            if !covered_block.executed_offsets.contains(&proposal.line) {
                log::warn!(
                    "dropping proposal for uncovered offset {} in {key}",
                    proposal.line
                );
                continue;
            }
            let file_line = block.start_line + proposal.line - 1;
            run_one_mutant(config, store, mutants_dir, &path, version.version_id, file_line, proposal, &source)?;
        }
    }
    Ok(())
}

/// Apply, validate, execute, and persist one proposal. Every per-mutant
/// failure maps to a stored status; only a sandbox protocol violation
/// escapes.
#[allow(clippy::too_many_arguments)]
fn run_one_mutant(
    config: &RunConfig,
    store: &MutationStore,
    mutants_dir: &Path,
    path: &Path,
    version_id: i64,
    file_line: usize,
    proposal: &MutationProposal,
    source: &str,
) -> Result<()> {
    let mut record = MutantRecord {
        status: MutantStatus::Pending,
        operator: proposal.operator.clone(),
        line_number: file_line,
        original_code: proposal.original.clone(),
        mutated_code: proposal.mutated.clone(),
        description: proposal.description.clone(),
        error_msg: String::new(),
    };

    let edit = SourceEdit::ReplaceLine {
        line: file_line,
        text: proposal.mutated.clone(),
    };
    let (status, error_msg) = match apply::prepare_candidate(path, source, &edit, mutants_dir) {
        Ok(mutant_path) => match sandbox::run_mutant(
            path,
            &mutant_path,
            &config.test_command,
            &config.workdir,
            config.timeout,
        ) {
            Ok(TestVerdict::Survived) => (MutantStatus::Survived, String::new()),
            Ok(TestVerdict::Killed { output }) => (MutantStatus::Killed, output),
            Ok(TestVerdict::Unexpected { output }) => (MutantStatus::UnexpectedError, output),
            Ok(TestVerdict::TimedOut) => (
                MutantStatus::Timeout,
                format!("test run exceeded {}s", config.timeout.as_secs()),
            ),
            Err(e @ Error::SandboxProtocol(_)) => return Err(e),
            Err(e) => (MutantStatus::UnexpectedError, e.to_string()),
        },
        Err(Error::Syntax { .. }) => (
            MutantStatus::SyntaxError,
            "candidate failed syntax validation".to_string(),
        ),
        Err(e) => (MutantStatus::UnexpectedError, e.to_string()),
    };
    record.status = status;
    record.error_msg = error_msg;
    store.add_mutant(version_id, &record)?;

    match record.status {
        MutantStatus::Survived => {
            log::info!("mutant survived at {}:{file_line}", path.display());
        }
        MutantStatus::Killed => {
            log::info!("mutant killed at {}:{file_line}", path.display());
        }
        _ => {
            log::debug!(
                "mutant {} at {}:{file_line}",
                record.status.as_str(),
                path.display()
            );
        }
    }
    Ok(())
}

fn emit_report(
    store: &MutationStore,
    summary: &RunSummary,
    config: &RunConfig,
    files: &[String],
    json_mode: bool,
    duration_ms: u64,
) {
    if json_mode {
        match serde_json::to_string(summary) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to serialize summary: {e}"),
        }
    } else {
        report::print_summary(summary, duration_ms);
        if let Err(e) = report::print_survivors(store, files) {
            log::error!("report generation failed: {e}");
        }
    }

    let json_path = config.db_path.with_file_name("faultline-report.json");
    if let Err(e) = report::write_json_summary(summary, &json_path) {
        log::error!("failed to write {}: {e}", json_path.display());
    }
}
