//! Scene Updater command-line entry point
//!
//! ```bash
//! # Update scene.ron in place using ./config.json
//! scene-updater --document scene.ron
//!
//! # Custom config, write the result elsewhere
//! scene-updater -d scene.ron -c parts/config.json -o updated.ron
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use updater_core::{Document, MergeOptions, Updater};

#[derive(Parser, Debug)]
#[command(name = "scene-updater")]
#[command(about = "Update mesh models in a scene document while preserving properties")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "./config.json")]
    config: PathBuf,

    /// Scene document to update
    #[arg(short, long)]
    document: PathBuf,

    /// Where to write the updated document (defaults to the input document)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run without saving anything
    #[arg(long)]
    dry_run: bool,

    /// Keep a renamed import next to targets that cannot be merged
    #[arg(long)]
    legacy_rename_fallback: bool,
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "updater_core=info,scene_updater=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut document = Document::load(&args.document)
        .with_context(|| format!("loading document {:?}", args.document))?;

    let mut updater = Updater::from_config_file(&args.config)
        .with_context(|| format!("loading configuration {:?}", args.config))?;
    if args.legacy_rename_fallback {
        updater.set_options(MergeOptions {
            legacy_rename_fallback: true,
        });
    }

    // per-entry failures are already logged by the updater
    updater.update_all(&mut document);

    if args.dry_run {
        tracing::info!("Dry run, document not saved");
        return Ok(());
    }

    let output = output_path(&args, &updater);
    document
        .save(&output)
        .with_context(|| format!("saving document {:?}", output))?;

    Ok(())
}

/// Save destination: `--output`, then the configured document file when the
/// configuration sets `save_document`, then the input document itself
fn output_path(args: &Args, updater: &Updater) -> PathBuf {
    if let Some(output) = &args.output {
        return output.clone();
    }
    if updater.config().save_document
        && let Some(path) = updater.save_path()
    {
        return path;
    }
    args.document.clone()
}
