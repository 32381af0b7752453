//! comptime - CLI

use anyhow::{Context, Result};
use clap::Parser;
use comptime::util::logger;
use comptime::{apply_replacements, compute_replacements, ComptimeOptions, OutputMode, NAME, VERSION};
use std::path::PathBuf;
use tracing::info;

/// Evaluate comptime expressions in a TypeScript project and write the result
#[derive(Parser, Debug)]
#[command(name = NAME)]
#[command(version = VERSION)]
#[command(about, long_about = None)]
struct Args {
    /// Path to tsconfig.json, or a directory to search upwards from
    #[arg(short, long, value_name = "PATH")]
    project: Option<PathBuf>,

    /// Output directory (defaults to COMPTIME_OUTDIR, comptime.toml, then `<root>/out`)
    #[arg(short, long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    /// Only process files matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// Skip files matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Write only files that contain replacements
    #[arg(long)]
    changed_only: bool,

    /// Print the replacements as JSON instead of writing files
    #[arg(long)]
    emit_replacements: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn options(&self) -> ComptimeOptions {
        let mut options = ComptimeOptions::new();
        if let Some(project) = &self.project {
            options = if project.is_dir() {
                ComptimeOptions {
                    config: comptime::ConfigSource::Discover(project.clone()),
                    ..options
                }
            } else {
                options.with_tsconfig(project)
            };
        }
        if let Some(outdir) = &self.outdir {
            options = options.with_outdir(outdir);
        }
        if self.changed_only {
            options = options.with_output_mode(OutputMode::ChangedOnly);
        }
        options.include = self.include.clone();
        options.exclude = self.exclude.clone();
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli(args.verbose);

    let options = args.options();
    let replacements = compute_replacements(&options).await?;

    if args.emit_replacements {
        let json = serde_json::to_string_pretty(&replacements).context("Failed to encode replacements")?;
        println!("{}", json);
        return Ok(());
    }

    let written = apply_replacements(&options, &replacements)?;
    let changed = replacements.values().filter(|r| !r.is_empty()).count();
    info!("{} files written, {} with replacements", written.len(), changed);
    Ok(())
}
