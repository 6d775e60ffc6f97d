//! The [`LifecycleStage`] trait defines one policy in the save/delete pipeline.
//!
//! A save runs the hooks in this order:
//!
//! 1. `before_save` on every stage, after the committed copy is loaded;
//! 2. the record is persisted;
//! 3. `after_save` on atomic stages, still inside the transaction;
//! 4. commit;
//! 5. `after_save` on the remaining stages;
//! 6. `after_commit` on every stage, even if step 5 failed.
//!
//! A delete runs `before_delete` on every stage, then removes the row.

use ic_core::Result;

use crate::context::{DeleteContext, SaveContext};

/// A single policy registered into a [`LifecyclePipeline`](crate::LifecyclePipeline).
pub trait LifecycleStage: Send + Sync {
    /// A short, human-readable name for this stage (e.g. "reaper").
    fn name(&self) -> &'static str;

    /// Whether this stage's `after_save` must run inside the persist
    /// transaction, so that its failure rolls the row change back.
    ///
    /// Returns `false` by default.
    fn atomic(&self) -> bool {
        false
    }

    /// Inspect the committed copy before the record is persisted.
    fn before_save(&self, _ctx: &mut SaveContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Transform stored files once the record has been persisted.
    fn after_save(&self, _ctx: &mut SaveContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Best-effort cleanup once the new state is committed. Cannot fail.
    fn after_commit(&self, _ctx: &mut SaveContext<'_>) {}

    /// Best-effort cleanup before the record row is removed. Cannot fail.
    fn before_delete(&self, _ctx: &mut DeleteContext<'_>) {}
}
