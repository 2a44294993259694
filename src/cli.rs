//! CLI argument parsing for the field-pool workflow.
//!
//! Argument structs carry paths and switches only; merge and validation
//! policy lives in the workflow and core modules.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "fpool",
    version,
    about = "Priority-merging compiler and validator for YAML field pools",
    after_help = "Commands:\n  merge --fields-dir <dir> --out <file>      Merge fragments into one pool\n  validate --pool <file> --docs <dir>        Check the pool against a corpus\n  run --fields-dir <dir> --docs <dir> --out <file>  Merge, then validate\n\nExamples:\n  fpool merge --fields-dir fields/ --out fields.yaml\n  fpool merge --fields-dir fields/ --out fields.yaml --analysis-report analysis.json\n  fpool validate --pool fields.yaml --docs modules/ --out-report report.json\n  fpool run --fields-dir fields/ --docs modules/ --out fields.yaml",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Merge(MergeArgs),
    Validate(ValidateArgs),
    Run(RunArgs),
}

/// Merge command inputs.
#[derive(Parser, Debug)]
#[command(about = "Merge field fragments into one prioritized pool")]
pub struct MergeArgs {
    /// Directory holding the field fragment files
    #[arg(long, value_name = "DIR")]
    pub fields_dir: PathBuf,

    /// Output path for the merged pool document
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Optional output path for the JSON analysis report
    #[arg(long, value_name = "FILE")]
    pub analysis_report: Option<PathBuf>,

    /// Optional orchestrator file whose global_config is embedded in _meta
    #[arg(long, value_name = "FILE")]
    pub orchestrator: Option<PathBuf>,

    /// Suppress the statistics summary on stdout
    #[arg(long)]
    pub quiet: bool,
}

/// Validate command inputs.
#[derive(Parser, Debug)]
#[command(about = "Validate a merged pool against a document corpus")]
pub struct ValidateArgs {
    /// Path to the merged pool document
    #[arg(long, value_name = "FILE")]
    pub pool: PathBuf,

    /// Root of the document corpus holding field references
    #[arg(long, value_name = "DIR")]
    pub docs: PathBuf,

    /// Optional output path for the JSON validation report
    #[arg(long, value_name = "FILE")]
    pub out_report: Option<PathBuf>,
}

/// Run command inputs: merge followed by validate.
#[derive(Parser, Debug)]
#[command(about = "Merge fragments, then validate the result in one pass")]
pub struct RunArgs {
    /// Directory holding the field fragment files
    #[arg(long, value_name = "DIR")]
    pub fields_dir: PathBuf,

    /// Root of the document corpus holding field references
    #[arg(long, value_name = "DIR")]
    pub docs: PathBuf,

    /// Output path for the merged pool document
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Optional output path for the JSON analysis report
    #[arg(long, value_name = "FILE")]
    pub analysis_report: Option<PathBuf>,

    /// Optional output path for the JSON validation report
    #[arg(long, value_name = "FILE")]
    pub out_report: Option<PathBuf>,

    /// Optional orchestrator file whose global_config is embedded in _meta
    #[arg(long, value_name = "FILE")]
    pub orchestrator: Option<PathBuf>,

    /// Suppress the statistics summary on stdout
    #[arg(long)]
    pub quiet: bool,
}
