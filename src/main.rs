//! # Blake Fragments CLI (`blakefx`)
//!
//! ## Usage
//!
//! ```bash
//! blakefx --config ./config/blakefx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `blakefx extract` | Write one `.txt` transcription per object in the XML files |
//! | `blakefx export` | Export matched fragments from Superfastmatch as CSV |
//! | `blakefx fetch <doctype> <docid>` | Save one document record as JSON |
//! | `blakefx status` | Print the Superfastmatch status page |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blake_fragments::config::{self, Config};
use blake_fragments::error::Error;
use blake_fragments::export::{self, ExportOptions};
use blake_fragments::extract;
use blake_fragments::matrix::MatrixIndex;
use blake_fragments::progress::ProgressMode;
use blake_fragments::source::{Catalog, SuperfastClient};

/// Blake Archive transcription extraction and fragment-match export.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with the Superfastmatch address and the working paths.
#[derive(Parser)]
#[command(
    name = "blakefx",
    about = "Extract Blake Archive transcriptions and export Superfastmatch fragment matches",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/blakefx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract transcriptions from every XML file in a directory.
    ///
    /// Writes `<desc_id>.txt` for every object, without a trailing newline.
    Extract {
        /// Directory of XML files (overrides `paths.xml_dir`).
        #[arg(long)]
        xml_dir: Option<PathBuf>,

        /// Output directory (overrides `paths.text_dir`).
        #[arg(long)]
        text_dir: Option<PathBuf>,
    },

    /// Export every matched fragment to CSV.
    ///
    /// Matches between copies from the same matrix are skipped when the
    /// relations file exists; without it, every match is exported.
    Export {
        /// Output CSV (overrides `paths.output_csv`).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Matrix relations CSV (overrides `paths.relations_csv`).
        #[arg(long)]
        relations: Option<PathBuf>,

        /// Export every match, ignoring matrix relations.
        #[arg(long)]
        no_exclusions: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Fetch one document record and save it as JSON.
    Fetch {
        doctype: u64,
        docid: u64,

        /// Output file; prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the Superfastmatch status page.
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Extract { xml_dir, text_dir } => {
            let xml_dir = xml_dir.unwrap_or_else(|| cfg.paths.xml_dir.clone());
            let text_dir = text_dir.unwrap_or_else(|| cfg.paths.text_dir.clone());
            let summary = extract::extract_directory(&xml_dir, &text_dir).with_context(|| {
                format!("Failed to extract transcriptions from {}", xml_dir.display())
            })?;
            println!(
                "extracted {} objects from {} files into {}",
                summary.objects,
                summary.files,
                text_dir.display()
            );
        }
        Commands::Export {
            output,
            relations,
            no_exclusions,
            progress,
        } => {
            let output = output.unwrap_or_else(|| cfg.paths.output_csv.clone());
            let relations = relations.unwrap_or_else(|| cfg.paths.relations_csv.clone());
            let index = if no_exclusions {
                None
            } else {
                load_relations(&relations)?
            };
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();

            let catalog = Catalog::new(client(&cfg)?);
            let options = ExportOptions {
                exclusions: index.as_ref(),
                page_size: cfg.api.page_size,
                request_delay: cfg.api.request_delay(),
                progress: reporter.as_ref(),
            };
            info!(output = %output.display(), "exporting matches/fragments");
            let summary = export::export_to_path(&catalog, &output, &options)
                .with_context(|| format!("Failed to export fragments to {}", output.display()))?;
            println!(
                "documents: {}\nmatches: {}\nexcluded (same matrix): {}\nfragments: {}",
                summary.documents, summary.matches, summary.excluded, summary.fragments
            );
        }
        Commands::Fetch {
            doctype,
            docid,
            output,
        } => {
            let catalog = Catalog::new(client(&cfg)?);
            let doc = catalog
                .document(doctype, docid)
                .with_context(|| format!("Failed to fetch document {}/{}", doctype, docid))?;
            match output {
                Some(path) => {
                    doc.write_json(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Saved {} to {}", doc.title(), path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(doc.record())?),
            }
        }
        Commands::Status => {
            let body = client(&cfg)?
                .status()
                .context("Failed to reach Superfastmatch")?;
            println!("{}", body);
        }
    }

    Ok(())
}

fn client(cfg: &Config) -> Result<SuperfastClient> {
    SuperfastClient::from_config(&cfg.api).context("Failed to build HTTP client")
}

/// Relations for exclusion, or `None` (with a warning) when the file is absent.
fn load_relations(path: &Path) -> Result<Option<MatrixIndex>> {
    match MatrixIndex::load_path(path) {
        Ok(index) => {
            info!(path = %path.display(), entries = index.len(), "loaded matrix relations");
            Ok(Some(index))
        }
        Err(Error::MissingResource(_)) => {
            warn!(
                path = %path.display(),
                "matrix relations file not found; not excluding matches from the same matrix"
            );
            Ok(None)
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to load relations from {}", path.display()))
        }
    }
}
