use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::HumanDuration;

use za_hansard::akn::xml::{to_json, to_xml};
use za_hansard::batch::{self, Selection};
use za_hansard::{parse_file, parse_text, ParseOptions, Settings};

#[derive(Parser)]
#[command(name = "za_hansard", about = "Hansard transcripts to Akoma Ntoso debate XML")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one document and print (or write) the result
    Parse {
        path: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "xml")]
        format: Format,
        /// Input is already plain text; skip the converter
        #[arg(long)]
        text: bool,
    },
    /// Parse source documents in a directory, writing <source>.xml next to each
    Run {
        dir: PathBuf,
        /// Max documents to parse (default: `limit` setting)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Include documents that were attempted but never parsed
        #[arg(long)]
        retry: bool,
        /// Re-parse everything, including completed documents
        #[arg(long, conflicts_with = "retry")]
        redo: bool,
    },
    /// Show parsing statistics for a directory
    Stats { dir: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Xml,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Parse {
            path,
            output,
            format,
            text,
        } => {
            let doc = if text {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                parse_text(&raw, &ParseOptions::from_settings(&settings))?
            } else {
                parse_file(&path, &settings)?
            };
            let rendered = match format {
                Format::Xml => to_xml(&doc)?,
                Format::Json => serde_json::to_string_pretty(&to_json(&doc))?,
            };
            match output {
                Some(out) => std::fs::write(&out, rendered)
                    .with_context(|| format!("Failed to write {}", out.display()))?,
                None => println!("{}", rendered),
            }
            Ok(())
        }
        Commands::Run {
            dir,
            limit,
            retry,
            redo,
        } => {
            let selection = if redo {
                Selection::Redo
            } else if retry {
                Selection::Retry
            } else {
                Selection::Pending
            };
            let limit = limit.unwrap_or(settings.limit);
            let stats = batch::run(&dir, &settings, selection, limit)?;
            if stats.total == 0 {
                println!("Nothing to parse. Use --retry or --redo to revisit documents.");
                return Ok(());
            }
            println!(
                "Done: {} documents ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Stats { dir } => {
            let s = batch::dir_stats(&dir, &settings)?;
            println!("Total:       {}", s.total);
            println!("Parsed:      {}", s.parsed);
            println!("Failed:      {}", s.failed);
            println!("Unattempted: {}", s.unattempted);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", HumanDuration(elapsed));
    }

    result
}
