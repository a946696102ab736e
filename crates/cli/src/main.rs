//! CLI tool for round-tripping PowerPoint text through translation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use textmap_core::json::write_json_file;
use textmap_core::{flatten, merge_translations, parse_translated_values, TextMap};
use textmap_pptx::{apply_text_map, build_text_map};

/// Extract, translate and re-apply the text of .pptx presentations.
#[derive(Parser, Debug)]
#[command(name = "pptx-textmap")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract every text run, table cell and chart text into a text map
    Extract {
        /// Input presentation (.pptx)
        pptx: PathBuf,

        /// Output text map (default: input with a .text-map.json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the texts of a text map with translated values, by position
    Merge {
        /// Text map produced by `extract`
        #[arg(long)]
        base_map: PathBuf,

        /// JSON array of translated strings, one per entry
        #[arg(long)]
        translated_values: PathBuf,

        /// Output text map
        #[arg(long)]
        output: PathBuf,
    },

    /// Write the texts of a text map as a flat JSON array
    Flatten {
        /// Text map to flatten
        #[arg(long)]
        source: PathBuf,

        /// Output array (default: <stem>.text-values.json next to the source)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the texts of a text map back into a copy of the presentation
    Apply {
        /// Source presentation (.pptx); never modified
        #[arg(long)]
        pptx: PathBuf,

        /// Translated text map
        #[arg(long)]
        translated_map: PathBuf,

        /// Output presentation
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
    log::debug!("{:?}", args.command);

    match args.command {
        Command::Extract { pptx, output } => {
            require_file(&pptx)?;
            let output = output.unwrap_or_else(|| text_map_path(&pptx));
            let map = build_text_map(&pptx)
                .with_context(|| format!("Failed to extract {}", pptx.display()))?;
            write_json_file(&output, &map)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} entries from {} slides to {}",
                map.entry_count,
                map.slide_count,
                output.display()
            );
        }
        Command::Merge {
            base_map,
            translated_values,
            output,
        } => {
            require_file(&base_map)?;
            require_file(&translated_values)?;
            let base = read_text_map(&base_map)?;
            let values = parse_translated_values(&read(&translated_values)?).with_context(|| {
                format!("Invalid translated values in {}", translated_values.display())
            })?;
            let merged = merge_translations(&base, &values)?;
            write_json_file(&output, &merged)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} entries to {}", merged.entry_count, output.display());
        }
        Command::Flatten { source, output } => {
            require_file(&source)?;
            let output = output.unwrap_or_else(|| text_values_path(&source));
            let texts = flatten(&read_text_map(&source)?);
            write_json_file(&output, &texts)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} texts to {}", texts.len(), output.display());
        }
        Command::Apply {
            pptx,
            translated_map,
            output,
        } => {
            require_file(&pptx)?;
            require_file(&translated_map)?;
            let applied = apply_text_map(&pptx, &translated_map, &output).with_context(|| {
                format!(
                    "Failed to apply {} to {}",
                    translated_map.display(),
                    pptx.display()
                )
            })?;
            println!("Applied {} entries to {}", applied, output.display());
        }
    }

    Ok(())
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("Input file not found: {}", path.display());
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_text_map(path: &Path) -> Result<TextMap> {
    TextMap::from_json(&read(path)?)
        .with_context(|| format!("Invalid text map in {}", path.display()))
}

/// `deck.pptx` -> `deck.text-map.json`
fn text_map_path(pptx: &Path) -> PathBuf {
    pptx.with_extension("text-map.json")
}

/// `deck.text-map.json` -> `deck.text-map.text-values.json`
fn text_values_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    source.with_file_name(format!("{}.text-values.json", stem))
}
