//! # ic-lifecycle
//!
//! Save/delete orchestration for records with file-backed fields.
//!
//! This crate provides:
//!
//! - **[`LifecycleStage`]** trait -- one named policy with hooks for the
//!   snapshot, transform and cleanup phases of a save, plus record deletion.
//! - **[`SaveContext`]** / **[`DeleteContext`]** -- per-call state shared by
//!   the stages (committed copy, stale-path snapshot, field transitions).
//! - **[`CleanupHook`]** -- receives best-effort cleanup failures that are
//!   never propagated to the caller.
//! - **Built-in stages** ([`stages`]) -- stale-file reaper, centered
//!   cropper, bounded thumbnailer.
//! - **[`LifecyclePipeline`]** -- runs the stages around the persistence
//!   layer's transaction: snapshot, persist, transform, cleanup.

pub mod context;
pub mod pipeline;
pub mod stage;
pub mod stages;

// Re-export key types at the crate root.
pub use context::{
    CleanupHook, DeleteContext, DeleteOutcome, FieldState, FieldTransition, SaveContext,
    SaveOutcome,
};
pub use pipeline::LifecyclePipeline;
pub use stage::LifecycleStage;
pub use stages::{BoundedThumbnailer, CenteredCropper, StaleFileReaper};
