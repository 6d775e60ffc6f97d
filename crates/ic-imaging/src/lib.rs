//! # ic-imaging
//!
//! Everything that touches pixels or blobs on disk:
//!
//! - **[`geometry`]** -- pure size arithmetic for cover-crop and
//!   bounded-shrink, with no pixel access.
//! - **[`ImageCodec`]** -- decode a stored image to RGBA, apply a transform,
//!   and write it back in its original format at the configured quality.
//! - **[`FileStorage`]** -- resolve storage-relative field values to paths,
//!   probe dimensions, and remove blobs.

pub mod codec;
pub mod geometry;
pub mod storage;

pub use codec::{probe_dimensions, ImageCodec, ShrinkOutcome};
pub use geometry::{bounded_fit, cover_crop, exceeds_bounds, shrink_target, CoverCrop};
pub use storage::FileStorage;
