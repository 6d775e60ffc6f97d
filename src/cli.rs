use clap::{Parser, Subcommand};
use ic_core::RecordId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-classes")]
#[command(author, version, about = "Cover-crop, thumbnail and clean up file-backed record fields")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cover-crop an image in place to an exact size
    Crop {
        /// Image file to crop
        #[arg(required = true)]
        file: PathBuf,

        /// Target width in pixels
        #[arg(long)]
        width: u32,

        /// Target height in pixels
        #[arg(long)]
        height: u32,
    },

    /// Shrink an image in place to fit within the given bounds
    Shrink {
        /// Image file to shrink
        #[arg(required = true)]
        file: PathBuf,

        /// Maximum width in pixels
        #[arg(long)]
        max_width: Option<u32>,

        /// Maximum height in pixels
        #[arg(long)]
        max_height: Option<u32>,
    },

    /// Delete a stored record and every file it references
    Purge {
        /// Record ID
        id: RecordId,
    },

    /// Print a stored record as JSON
    Show {
        /// Record ID
        id: RecordId,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
