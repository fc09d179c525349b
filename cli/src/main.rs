//! pagedb command-line shell
//!
//! ```bash
//! # Open (or create) a database file and start the shell
//! pagedb mydb.db
//!
//! # Run a script
//! printf 'insert 1 alice alice@example.com\nselect\n.exit\n' | pagedb mydb.db
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use storage::Table;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod repl;
mod statement;

/// pagedb command-line shell
#[derive(Parser, Debug)]
#[command(
    name = "pagedb",
    version,
    about = "Interactive shell for a single-file pagedb database"
)]
struct Args {
    /// Database file to open, created when missing
    #[arg(value_name = "FILE")]
    filename: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let table = Table::open(&args.filename)
        .with_context(|| format!("unable to open {}", args.filename.display()))?;
    info!("opened {}", args.filename.display());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run(table, stdin.lock(), &mut stdout)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
