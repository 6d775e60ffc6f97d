//! ic-core: shared types, IDs, errors, configuration, and field descriptors.
//!
//! This crate is the foundational dependency for all other ic-* crates,
//! providing the record model, statically declared field descriptors with
//! their crop/thumbnail policies, a unified error type, and application
//! configuration.

pub mod config;
pub mod error;
pub mod fields;
pub mod ids;
pub mod record;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use fields::{CropPolicy, FieldDescriptor, FieldKind, RecordSchema, ThumbnailBounds};
pub use ids::RecordId;
pub use record::{FieldFile, Record};
