mod cli;

use image_classes::commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ic_core::config::Config;
use ic_core::RecordId;
use ic_imaging::{ImageCodec, ShrinkOutcome};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "image_classes=debug,ic_lifecycle=debug,ic_imaging=debug,ic_db=debug,ic_core=debug"
                .to_string()
        } else {
            "image_classes=info,ic_lifecycle=info,ic_imaging=info,ic_db=warn,ic_core=warn"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = || Config::load_or_default(cli.config.as_deref());

    match cli.command {
        Commands::Crop {
            ref file,
            width,
            height,
        } => crop(&config(), file, width, height),
        Commands::Shrink {
            ref file,
            max_width,
            max_height,
        } => shrink(&config(), file, max_width, max_height),
        Commands::Purge { id } => purge(&config(), id),
        Commands::Show { id } => show(&config(), id),
        Commands::Validate {
            config: ref config_path,
        } => {
            let path = config_path.as_deref().or(cli.config.as_deref());
            validate_config(path)
        }
        Commands::Version => {
            println!("image-classes {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn crop(config: &Config, file: &Path, width: u32, height: u32) -> Result<()> {
    let codec = ImageCodec::from_config(&config.imaging);
    let (w, h) = commands::crop_file(&codec, file, width, height)
        .with_context(|| format!("failed to crop {}", file.display()))?;
    println!("Cropped {} to {}x{}", file.display(), w, h);
    Ok(())
}

fn shrink(
    config: &Config,
    file: &Path,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<()> {
    let codec = ImageCodec::from_config(&config.imaging);
    let outcome = commands::shrink_file(&codec, file, max_width, max_height)
        .with_context(|| format!("failed to shrink {}", file.display()))?;
    match outcome {
        ShrinkOutcome::WithinBounds => {
            println!("{} is already within bounds; unchanged", file.display());
        }
        ShrinkOutcome::Resized { width, height } => {
            println!("Shrunk {} to {}x{}", file.display(), width, height);
        }
    }
    Ok(())
}

fn purge(config: &Config, id: RecordId) -> Result<()> {
    let (outcome, failures) = commands::purge_record(config, id)?;
    println!(
        "Purged record {}: {} file(s) removed, {} cleanup failure(s)",
        id,
        outcome.reaped.len(),
        failures
    );
    for path in &outcome.reaped {
        println!("  - {}", path.display());
    }
    Ok(())
}

fn show(config: &Config, id: RecordId) -> Result<()> {
    let value = commands::show_record(config, id)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            Config::load(p).with_context(|| format!("invalid config {}", p.display()))?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration has {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    println!("  Storage root: {}", config.storage.root.display());
    println!("  Database: {}", config.database.path.display());
    println!("  Pool size: {}", config.database.pool_size);
    println!("  Quality: {}", config.imaging.quality);
    println!("  Filter: {:?}", config.imaging.filter);

    Ok(())
}
