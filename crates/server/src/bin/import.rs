//! Reference file generator.
//!
//! Reads MAME's machine list and software list XML and writes the flat
//! `<sha1> <archive>:<file>` reference consumed by the `romcheck` server.
//!
//! # Usage
//!
//! ```bash
//! mame -listxml > mame.xml
//! romcheck-import --mame mame.xml --software hash/sms.xml --software hash/nes.xml -o roms.txt
//! ```
//!
//! Logs go to stderr so the reference can be written to stdout.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::{error, info};

use romcheck_core::{import_mame, import_software, write_reference, ImportError, RomRecord};

/// Build a romcheck reference file from MAME XML listings
#[derive(Parser)]
#[command(name = "romcheck-import")]
#[command(about = "Build a romcheck reference file from MAME XML listings")]
#[command(version)]
#[command(group(ArgGroup::new("input").required(true).multiple(true).args(["mame", "software"])))]
struct Args {
    /// Machine list, as written by `mame -listxml`
    #[arg(short, long)]
    mame: Option<PathBuf>,

    /// Software list file (repeatable)
    #[arg(short, long)]
    software: Vec<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut records: Vec<RomRecord> = Vec::new();

    if let Some(path) = &args.mame {
        records.extend(read_with(path, import_mame)?);
    }
    for path in &args.software {
        records.extend(read_with(path, import_software)?);
    }

    let count = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {:?}", path))?;
            write_reference(&records, BufWriter::new(file))
        }
        None => write_reference(&records, std::io::stdout().lock()),
    }
    .context("Failed to write reference")?;

    info!(records = count, "Reference written");
    Ok(())
}

fn read_with(
    path: &Path,
    import: fn(BufReader<File>) -> Result<Vec<RomRecord>, ImportError>,
) -> Result<Vec<RomRecord>> {
    info!("Reading {:?}", path);
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    import(BufReader::new(file)).with_context(|| format!("Failed to import {:?}", path))
}
