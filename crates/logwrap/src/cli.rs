//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logwrap")]
#[command(version, about = "Run a program with rotating log capture")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working directory holding the logs and the control socket
    #[arg(short = 'w', long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program under supervision; its exit code is propagated
    Run(RunArgs),

    /// Ask the running instance to terminate its child
    Kill,

    /// Change rotation settings of the running instance
    Set(SetArgs),

    /// Show rotation settings of the running instance
    Get,
}

#[derive(Args)]
pub struct RunArgs {
    /// Program to run
    pub app: String,

    /// Arguments passed to the program
    #[arg(last = true)]
    pub args: Vec<String>,

    /// File name for captured stdout (default: output.log)
    #[arg(long)]
    pub out: Option<String>,

    /// File name for a separate stderr stream (default: error.log)
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = logwrap_core::constants::DEFAULT_ERR_FILE
    )]
    pub err: Option<String>,

    /// Keep stderr out of the stdout log (requires --err)
    #[arg(long, requires = "err")]
    pub err_only: bool,

    /// Echo captured output to the terminal as well
    #[arg(short, long)]
    pub screen: bool,

    /// Max active file size before rotation (e.g. 1M, 512K)
    #[arg(long)]
    pub max_size: Option<String>,

    /// Max backup age before expiry (e.g. 30d, 12h)
    #[arg(long)]
    pub duration: Option<String>,

    /// Max number of retained backup files
    #[arg(long)]
    pub logs: Option<usize>,

    /// Maintenance interval (e.g. 10m)
    #[arg(long)]
    pub check_interval: Option<String>,

    /// Gzip rotated backups
    #[arg(long)]
    pub zip: bool,
}

#[derive(Args)]
pub struct SetArgs {
    /// Max active file size before rotation (e.g. 1M, 512K)
    #[arg(long)]
    pub max_size: Option<String>,

    /// Max backup age before expiry (e.g. 30d, 12h)
    #[arg(long)]
    pub duration: Option<String>,

    /// Max number of retained backup files
    #[arg(long)]
    pub logs: Option<usize>,

    /// Maintenance interval (e.g. 10m)
    #[arg(long)]
    pub check_interval: Option<String>,

    /// Gzip rotated backups (true/false)
    #[arg(long)]
    pub zip: Option<bool>,
}
