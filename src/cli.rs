use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "wrkbox")]
#[command(about = "wrk report parser and performance goal checker", long_about = None)]
pub struct Cli {
    /// Path to config directory
    #[arg(short, long, default_value = "./config", global = true)]
    pub config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse one wrk report and print it as JSON
    #[command(arg_required_else_help = true)]
    Parse {
        file: PathBuf,

        /// Run start time (RFC 3339), defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Run end time (RFC 3339), defaults to now
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
    /// Check a suite's goals against wrk reports, one report per config in order
    #[command(arg_required_else_help = true)]
    Evaluate {
        /// Suite name
        #[arg(short, long)]
        suite: String,

        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report file name, defaults to a timestamped name
        #[arg(short, long)]
        out: Option<String>,

        /// Directory the report file is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Report file format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Yaml)]
        format: ReportFormat,

        /// Exit with an error when any goal fails
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Run start time (RFC 3339), defaults to the suite's or now
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Run end time (RFC 3339), defaults to the suite's or now
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Yaml,
    Xlsx,
}
