//! Bounded thumbnailer: shrinks image fields that exceed their bounds.

use std::path::Path;

use ic_core::Result;
use ic_imaging::ShrinkOutcome;

use crate::context::{FieldState, SaveContext};
use crate::stage::LifecycleStage;

/// Shrinks each bounded image field so it fits inside its maximum width
/// and/or height, keeping the aspect ratio and never enlarging.
///
/// Runs after commit. When the field's value changed, the previously
/// committed blob is removed before resizing, whether or not the resize
/// succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundedThumbnailer;

impl BoundedThumbnailer {
    pub const NAME: &'static str = "thumbnailer";
}

impl LifecycleStage for BoundedThumbnailer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn before_save(&self, ctx: &mut SaveContext<'_>) -> Result<()> {
        let schema = ctx.schema;
        for (field, _) in schema.bounded_fields() {
            ctx.set_state(Self::NAME, field.name(), FieldState::Unchanged);
        }
        Ok(())
    }

    fn after_save(&self, ctx: &mut SaveContext<'_>) -> Result<()> {
        let schema = ctx.schema;
        for (field, bounds) in schema.bounded_fields() {
            let name = field.name();

            let replaced = ctx.prior().and_then(|prior| prior.file(name)).cloned();
            if let Some(old) = replaced {
                match ctx.storage.path(&old) {
                    Ok(old_path) => {
                        let new_path = ctx
                            .record()
                            .file(name)
                            .and_then(|f| ctx.storage.path(f).ok());
                        // Names that differ only in spelling share one blob.
                        if new_path.as_deref() != Some(old_path.as_path()) {
                            ctx.reap(&old_path);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(field = name, "Cannot resolve {old}: {e}");
                        ctx.cleanup.report(Path::new(old.name()), &e);
                    }
                }
            }

            let Some(file) = ctx.record().file(name).cloned() else {
                continue;
            };
            if !ctx.storage.exists(&file) {
                tracing::debug!(field = name, "No stored file behind {file}; skipping");
                continue;
            }

            ctx.set_state(Self::NAME, name, FieldState::TransformPending);
            let path = ctx.storage.path(&file)?;
            let (width, height) = ctx.storage.dimensions(&file)?;

            let state = match ctx.codec.shrink_to_fit(&path, width, height, bounds)? {
                ShrinkOutcome::Resized { .. } => FieldState::Persisted,
                ShrinkOutcome::WithinBounds => FieldState::Unchanged,
            };
            ctx.set_state(Self::NAME, name, state);
        }
        Ok(())
    }
}
