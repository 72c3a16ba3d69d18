// crates/fl_cli/src/args.rs
//
// Offline CLI argument parsing & validation.
// - Strictly local: the store is a file path, never a URL
// - `diff` requires --first (the only comparison mode; flag reserved for more)
// - `--canon` accepts only the `strict` profile

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_DB: &str = "./forkline.jsonl";

#[derive(Debug, Parser)]
#[command(
    name = "forkline",
    about = "Record agentic runs locally and find where two of them first diverge"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare two recorded runs and report the first divergence.
    Diff(DiffArgs),
    /// List runs in the store, in file order.
    List(ListArgs),
    /// Show one recorded run.
    Show(ShowArgs),
    /// Record a run by replaying a JSONL event script.
    Record(RecordArgs),
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Report the first divergence. Required; reserved for future modes.
    #[arg(long)]
    pub first: bool,

    pub run_a: String,
    pub run_b: String,

    /// Resync search window (steps ahead on each side).
    #[arg(long, default_value_t = 10)]
    pub window: usize,

    /// Context radius around the divergence (up to 2N+1 steps per run).
    #[arg(long, default_value_t = 2)]
    pub context: usize,

    #[arg(long, default_value = "text", value_parser = ["json", "text"])]
    pub format: String,

    /// Which explanatory diffs to include.
    #[arg(long, default_value = "both", value_parser = ["input", "output", "both"])]
    pub show: String,

    /// Canonicalization profile (only `strict` exists).
    #[arg(long, default_value = "strict", value_parser = ["strict"])]
    pub canon: String,

    #[arg(long, default_value = DEFAULT_DB)]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value = "text", value_parser = ["json", "text"])]
    pub format: String,

    #[arg(long, default_value = DEFAULT_DB)]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub run_id: String,

    #[arg(long, default_value = "text", value_parser = ["json", "text"])]
    pub format: String,

    #[arg(long, default_value = DEFAULT_DB)]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Name of the workflow entrypoint to record under.
    #[arg(long)]
    pub entrypoint: String,

    /// JSONL script: {"step": NAME} opens a step, {"type": T, "payload": V}
    /// logs an event into the open step.
    #[arg(long)]
    pub events: PathBuf,

    /// Terminal status to close the run with.
    #[arg(long, default_value = "success", value_parser = ["success", "failure", "error"])]
    pub status: String,

    /// Redaction mode at the storage boundary.
    #[arg(long, default_value = "safe", value_parser = ["safe", "debug"])]
    pub mode: String,

    /// Allow `--mode debug` (persists raw payloads).
    #[arg(long)]
    pub allow_raw: bool,

    #[arg(long, default_value = DEFAULT_DB)]
    pub db: PathBuf,
}

#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Missing(s) => write!(f, "missing required flag: {}", s),
            CliError::NotFound(p) => write!(f, "file not found: {}", p),
        }
    }
}
impl std::error::Error for CliError {}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Cli, CliError> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Diff(d) => {
            // Only first-divergence comparison exists; make the selector explicit.
            if !d.first {
                return Err(CliError::Missing("--first"));
            }
        }
        Command::Record(r) => {
            if !r.events.is_file() {
                return Err(CliError::NotFound(r.events.display().to_string()));
            }
        }
        Command::List(_) | Command::Show(_) => {}
    }

    Ok(cli)
}
