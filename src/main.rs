//! topomine CLI - Microservice Topology Miner
//!
//! Snapshots a Java/Spring microservice repository, diffs snapshots
//! between commits and analyzes the resulting call graph for
//! architectural smells. Extraction runs in parallel across files.
//!
//! Usage:
//!   topomine extract -c config.json -r ./repo -o system.json
//!   topomine delta -c config.json -r ./repo --old old.json --new new.json --changes changes.json
//!   topomine graph -s system.json
//!   topomine analyze -s system.json

use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use topomine::{
    ConfigError, DeltaError, Diagnostic, FileChange, MicroserviceSystem, analyze,
    build_call_graph, build_system, extract_system_change, load_config,
};

/// topomine - Mine microservice topology from source
#[derive(Parser, Debug)]
#[command(name = "topomine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Number of threads for parallel extraction (default: all CPU cores)
    #[arg(long, short = 'j', global = true, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a system snapshot from a checked-out repository
    Extract {
        /// Run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Root of the checked-out repository
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Commit identifier recorded in the snapshot
        /// (default: baseCommit from the configuration)
        #[arg(long)]
        commit: Option<String>,

        /// Output file for the snapshot (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a typed change set from a version-control change list
    Delta {
        /// Run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Root of the repository checked out at the new commit
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Snapshot of the system at the old commit
        #[arg(long = "old")]
        old_system: PathBuf,

        /// Snapshot of the system at the new commit
        #[arg(long = "new")]
        new_system: PathBuf,

        /// JSON list of file changes between the two commits
        #[arg(long)]
        changes: PathBuf,

        /// Output file for the change set (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Project a snapshot onto its service call graph
    Graph {
        /// Snapshot file produced by `extract`
        #[arg(short, long)]
        system: PathBuf,

        /// Output file for the graph (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a snapshot's call graph for architectural smells
    Analyze {
        /// Snapshot file produced by `extract`
        #[arg(short, long)]
        system: PathBuf,

        /// Output file for the report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(e) => e.exit_code(),
            CliError::Delta(e) => e.exit_code(),
            CliError::Io(_) => 5,
            CliError::Json(_) => 6,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .unwrap_or_else(|e| eprintln!("Warning: could not set thread count: {e}"));
    }

    match cli.command {
        Commands::Extract {
            config,
            repo,
            commit,
            output,
        } => {
            let config = load_config(&config)?;
            let commit = commit.unwrap_or_else(|| config.base_commit.clone());
            let build = build_system(&config, &repo, &commit);
            report_diagnostics(&build.diagnostics);
            write_json(&build.system, output.as_deref())
        }
        Commands::Delta {
            config,
            repo,
            old_system,
            new_system,
            changes,
            output,
        } => {
            let config = load_config(&config)?;
            let old: MicroserviceSystem = read_json(&old_system)?;
            let new: MicroserviceSystem = read_json(&new_system)?;
            let changes: Vec<FileChange> = read_json(&changes)?;
            let build = extract_system_change(
                &config,
                &repo,
                &old,
                &new,
                &changes,
                &old.commit_id,
                &new.commit_id,
            )?;
            report_diagnostics(&build.diagnostics);
            write_json(&build.change, output.as_deref())
        }
        Commands::Graph { system, output } => {
            let system: MicroserviceSystem = read_json(&system)?;
            write_json(&build_call_graph(&system), output.as_deref())
        }
        Commands::Analyze { system, output } => {
            let system: MicroserviceSystem = read_json(&system)?;
            let report = analyze(&build_call_graph(&system));
            write_json(&report, output.as_deref())
        }
    }
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        eprintln!("Warning: {}: {}", diag.path, diag.message);
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), CliError> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(stdout()),
    };
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    if let Some(path) = output {
        eprintln!("Written to: {}", path.display());
    }
    Ok(())
}
