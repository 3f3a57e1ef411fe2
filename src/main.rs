use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};

use faultline::config::{CoverageFormat, RunConfig};
use faultline::controller;
use faultline::error::Error;
use faultline::git::GitDiff;
use faultline::proposer::RuleBasedProposer;
use faultline::report;
use faultline::store::MutationStore;

#[derive(Parser)]
#[command(name = "faultline", version, about = "Coverage-guided mutation testing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run mutation testing over the covered codebase
    Run {
        /// Coverage report produced by a prior run of the test suite
        #[arg(long)]
        coverage: PathBuf,
        /// Coverage report format: lcov, cobertura or jacoco
        #[arg(long, default_value = "lcov")]
        format: String,
        /// Command that runs the whole test suite
        #[arg(long)]
        test_cmd: String,
        /// Per-mutant timeout in seconds
        #[arg(long, default_value_t = RunConfig::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        /// Only mutate lines changed relative to the last commit
        #[arg(long)]
        diff: bool,
        /// Paths to exclude from mutation
        #[arg(long)]
        exclude: Vec<String>,
        /// Mutate only these paths
        #[arg(long)]
        only: Vec<String>,
        /// Mutation store location
        #[arg(long, default_value = RunConfig::DEFAULT_DB_PATH)]
        db: PathBuf,
        /// Keep mutant candidate files here instead of a temp dir
        #[arg(long)]
        mutants_dir: Option<PathBuf>,
        /// Directory the test command runs from
        #[arg(long, default_value = ".")]
        workdir: PathBuf,
        /// Print a machine-readable summary on stdout
        #[arg(long)]
        json: bool,
    },
    /// Summary of the stored mutants
    Status {
        /// Mutation store location
        #[arg(long, default_value = RunConfig::DEFAULT_DB_PATH)]
        db: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show stored mutants for one file
    Show {
        /// Path the mutants were recorded under
        path: String,
        /// Mutation store location
        #[arg(long, default_value = RunConfig::DEFAULT_DB_PATH)]
        db: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run {
            coverage,
            format,
            test_cmd,
            timeout,
            diff,
            exclude,
            only,
            db,
            mutants_dir,
            workdir,
            json,
        } => cmd_run(
            coverage, format, test_cmd, timeout, diff, exclude, only, db, mutants_dir, workdir,
            json,
        ),
        Commands::Status { db, json } => cmd_status(db, json),
        Commands::Show { path, db, json } => cmd_show(path, db, json),
    };

    process::exit(exit_code);
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    coverage: PathBuf,
    format: String,
    test_cmd: String,
    timeout: u64,
    diff: bool,
    exclude: Vec<String>,
    only: Vec<String>,
    db: PathBuf,
    mutants_dir: Option<PathBuf>,
    workdir: PathBuf,
    json: bool,
) -> i32 {
    let format = match format.parse::<CoverageFormat>() {
        Ok(format) => format,
        Err(e) => {
            report::print_error(&e.to_string());
            return 2;
        }
    };

    let mut config = RunConfig::new(coverage, format, test_cmd);
    config.timeout = Duration::from_secs(timeout);
    config.modified_only = diff;
    config.exclude_files = exclude;
    config.only_mutate = only;
    config.db_path = db;
    config.mutants_dir = mutants_dir;
    config.workdir = workdir;

    let diff_source = GitDiff::new(config.workdir.clone());
    match controller::run(&config, &RuleBasedProposer, &diff_source, json) {
        Ok(summary) => {
            if summary.survived > 0 {
                1
            } else {
                0
            }
        }
        Err(Error::Configuration(msg)) => {
            report::print_error(&msg);
            2
        }
        Err(e) => {
            report::print_error(&e.to_string());
            3
        }
    }
}

fn cmd_status(db: PathBuf, json: bool) -> i32 {
    let store = match MutationStore::open(&db) {
        Ok(store) => store,
        Err(e) => {
            report::print_error(&format!("failed to open {}: {}", db.display(), e));
            return 3;
        }
    };
    match store.summary() {
        Ok(summary) => {
            if json {
                match serde_json::to_string(&summary) {
                    Ok(out) => println!("{out}"),
                    Err(e) => {
                        report::print_error(&e.to_string());
                        return 3;
                    }
                }
            } else {
                report::print_status(&summary);
            }
            0
        }
        Err(e) => {
            report::print_error(&e.to_string());
            3
        }
    }
}

fn cmd_show(path: String, db: PathBuf, json: bool) -> i32 {
    let store = match MutationStore::open(&db) {
        Ok(store) => store,
        Err(e) => {
            report::print_error(&format!("failed to open {}: {}", db.display(), e));
            return 3;
        }
    };
    let mutants = match store.mutants_for(&path) {
        Ok(mutants) => mutants,
        Err(e) => {
            report::print_error(&e.to_string());
            return 3;
        }
    };
    if mutants.is_empty() {
        report::print_error(&format!(
            "no mutants stored for {path}; run `faultline run` first"
        ));
        return 2;
    }
    if json {
        match serde_json::to_string(&mutants) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                report::print_error(&e.to_string());
                return 3;
            }
        }
    } else {
        for m in &mutants {
            report::print_mutant_detail(&path, m);
        }
    }
    0
}
