//! Centered cropper: cover-crops changed image fields to an exact size.

use ic_core::{Error, Result};

use crate::context::{FieldState, SaveContext};
use crate::stage::LifecycleStage;

/// Scales each changed image field up or down to cover its crop policy's box
/// and center-crops it to exactly that size, overwriting the stored file.
///
/// Runs inside the persist transaction: a decode or encode failure rolls the
/// row change back and leaves the previously committed file in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct CenteredCropper;

impl CenteredCropper {
    pub const NAME: &'static str = "cropper";
}

impl LifecycleStage for CenteredCropper {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn atomic(&self) -> bool {
        true
    }

    fn before_save(&self, ctx: &mut SaveContext<'_>) -> Result<()> {
        let schema = ctx.schema;
        for (field, _) in schema.crop_fields() {
            let changed = ctx.field_changed(field.name());
            let present = ctx.record().file(field.name()).is_some();

            let state = if changed && present {
                FieldState::TransformPending
            } else {
                FieldState::Unchanged
            };
            tracing::debug!(field = field.name(), ?state, "Crop decision");
            ctx.set_state(Self::NAME, field.name(), state);
        }
        Ok(())
    }

    fn after_save(&self, ctx: &mut SaveContext<'_>) -> Result<()> {
        let schema = ctx.schema;
        for (field, policy) in schema.crop_fields() {
            if ctx.state(Self::NAME, field.name()) != Some(FieldState::TransformPending) {
                continue;
            }
            let file = ctx.record().file(field.name()).ok_or_else(|| {
                Error::pipeline(Self::NAME, format!("field '{}' lost its value", field.name()))
            })?;
            let path = ctx.storage.path(file)?;

            ctx.codec.crop_to_cover(&path, policy)?;
            ctx.set_state(Self::NAME, field.name(), FieldState::Persisted);
        }
        Ok(())
    }
}
