//! image-classes - file-backed record fields with cover-crop, bounded
//! thumbnails and stale-file cleanup.
//!
//! This library crate exposes the command implementations behind the CLI for
//! integration testing.

pub mod commands;

pub use ic_core;
pub use ic_db;
pub use ic_imaging;
pub use ic_lifecycle;
