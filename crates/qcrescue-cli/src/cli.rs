use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "qcrescue - Automated error detection and input correction for failed Q-Chem runs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the results of the last run and report the first failing step.
    Check(CheckArgs),
    /// Archive the failed run and rewrite the input deck with the next fix.
    Correct(CorrectArgs),
}

/// Options shared by every command that operates on a job directory.
#[derive(Args, Debug, Clone, Default)]
pub struct JobArgs {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Job directory holding the input deck and the run results.
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Input deck file name, relative to the job directory (e.g., mol.qcinp).
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<String>,

    /// Structured results file name, relative to the job directory (e.g., mol.qcout.json).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Runner state file. Defaults to `runner.toml` inside the job directory.
    #[arg(short, long, value_name = "PATH")]
    pub runner: Option<PathBuf>,

    /// Override the CPU count assumed for the current cluster.
    #[arg(long, value_name = "NUM")]
    pub cluster_cpus: Option<usize>,

    /// Energy change below which the SCF strategy switches from DIIS to RCA/GDM.
    #[arg(long, value_name = "FLOAT")]
    pub rca_gdm_thresh: Option<f64>,

    /// Maximum SCF cycles written into corrected decks.
    #[arg(long, value_name = "NUM")]
    pub scf_max_cycles: Option<usize>,

    /// Maximum geometry optimization cycles written into corrected decks.
    #[arg(long, value_name = "NUM")]
    pub geom_max_cycles: Option<usize>,

    /// Additional job files to include in every backup archive. Can be specified multiple times.
    #[arg(long = "backup", value_name = "FILE")]
    pub extra_backup: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

/// Arguments for the `correct` subcommand.
#[derive(Args, Debug)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Write the handler state to this JSON file after the correction.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Replay a correction from a saved handler snapshot instead of reading the job files.
    #[arg(long, value_name = "PATH", conflicts_with = "config")]
    pub from_snapshot: Option<PathBuf>,
}
