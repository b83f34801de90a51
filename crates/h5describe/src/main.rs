//! h5describe CLI: find detector master files and describe each one.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use h5describe::{describe, find_master_files, DescribeOptions, Report, MASTER_SUFFIX};

#[derive(Debug, Parser)]
#[command(name = "h5describe", version, about = "Describe and checksum HDF5 master files")]
struct Args {
    /// Directory to search
    #[arg(default_value = ".")]
    root: PathBuf,

    /// File name suffix identifying master files
    #[arg(long, default_value = MASTER_SUFFIX)]
    suffix: String,

    /// Print one JSON object per file instead of text
    #[arg(long)]
    json: bool,

    /// Worker threads (defaults to one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Do not open data files reached through external links
    #[arg(long)]
    no_follow_external: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print(out: &mut impl Write, report: &Report, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{report}")?;
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn describe_all(
    files: &[PathBuf],
    options: &DescribeOptions,
    jobs: Option<usize>,
) -> Result<Vec<h5describe::error::Result<Report>>> {
    use anyhow::Context;
    use rayon::prelude::*;
    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure worker pool")?;
    }
    Ok(files.par_iter().map(|p| describe(p, options)).collect())
}

#[cfg(not(feature = "parallel"))]
fn describe_all(
    files: &[PathBuf],
    options: &DescribeOptions,
    _jobs: Option<usize>,
) -> Result<Vec<h5describe::error::Result<Report>>> {
    Ok(files.iter().map(|p| describe(p, options)).collect())
}

fn run(args: Args) -> Result<bool> {
    let options = DescribeOptions {
        follow_external: !args.no_follow_external,
        ..DescribeOptions::default()
    };
    let files = find_master_files(&args.root, &args.suffix);
    let results = describe_all(&files, &options, args.jobs)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut all_ok = true;

    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(report) => {
                all_ok &= report.is_consistent();
                print(&mut out, &report, args.json)?;
            }
            Err(e) => {
                all_ok = false;
                error!(file = %path.display(), "{e}");
            }
        }
    }
    Ok(all_ok)
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}
