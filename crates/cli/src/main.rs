use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use sift_code_chunker::{Chunker, ChunkerConfig, SignalCatalog};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

mod pipeline;
mod report;
mod scanner;

use pipeline::process_files;
use report::{render_file, FileReport, RunSummary};
use scanner::FileScanner;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Chunk source trees and tag generated boilerplate", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk files and directories and print chunk descriptors
    Chunk(ChunkArgs),

    /// Print the built-in signal catalog as TOML
    Catalog,
}

#[derive(Args)]
struct ChunkArgs {
    /// Files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Chunker configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signal catalog file (TOML), appended to the built-in catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Use only the catalog given with --catalog
    #[arg(long, requires = "catalog")]
    replace_catalog: bool,

    /// Output one JSON object per file (stdout is reserved for JSON)
    #[arg(long)]
    json: bool,

    /// With --json, print one pretty-printed array instead of JSON lines
    #[arg(long, requires = "json")]
    pretty: bool,

    /// Print only the run summary
    #[arg(long, conflicts_with = "json")]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    if matches!(&cli.command, Commands::Chunk(args) if args.json) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Chunk(args) => run_chunk(args).await?,
        Commands::Catalog => run_catalog()?,
    }

    Ok(())
}

async fn run_chunk(args: ChunkArgs) -> Result<()> {
    for path in &args.paths {
        if !path.exists() {
            bail!("Path not found: {}", path.display());
        }
    }

    let config = match &args.config {
        Some(path) => ChunkerConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ChunkerConfig::default(),
    };
    let catalog = load_catalog(&args)?;
    let chunker = Arc::new(
        Chunker::new(config, &catalog).context("Invalid chunker configuration or catalog")?,
    );

    let files = FileScanner::new(&args.paths).scan();
    if files.is_empty() {
        log::warn!("No source files found");
    }

    let started = Instant::now();
    let outcomes = process_files(chunker, &files).await;
    let summary = RunSummary::from_outcomes(&outcomes, started.elapsed());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.pretty {
        let reports: Vec<FileReport<'_>> = outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .map(FileReport::new)
            .collect();
        serde_json::to_writer_pretty(&mut out, &reports)?;
        writeln!(out)?;
        log::info!("{}", summary.render().trim_end());
        out.flush()?;
        return Ok(());
    }

    for outcome in &outcomes {
        let analysis = match &outcome.result {
            Ok(analysis) => analysis,
            Err(e) => {
                if !args.json && !args.summary {
                    writeln!(out, "{} [error] {e}", outcome.path.display())?;
                }
                continue;
            }
        };
        if args.json {
            serde_json::to_writer(&mut out, &FileReport::new(analysis))?;
            writeln!(out)?;
        } else if !args.summary {
            out.write_all(render_file(analysis).as_bytes())?;
        }
    }

    if args.json {
        log::info!("{}", summary.render().trim_end());
    } else {
        out.write_all(summary.render().as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

fn load_catalog(args: &ChunkArgs) -> Result<SignalCatalog> {
    let Some(path) = &args.catalog else {
        return Ok(SignalCatalog::builtin());
    };
    let extra = SignalCatalog::from_toml_file(path)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;
    if args.replace_catalog {
        return Ok(extra);
    }
    let mut catalog = SignalCatalog::builtin();
    catalog.extend(extra);
    Ok(catalog)
}

fn run_catalog() -> Result<()> {
    let toml = SignalCatalog::builtin()
        .to_toml_string()
        .context("Failed to render catalog")?;
    print!("{toml}");
    Ok(())
}
