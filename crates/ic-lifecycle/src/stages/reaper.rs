//! Stale-file reaper: removes blobs no longer referenced by a record.

use std::path::{Path, PathBuf};

use ic_core::Result;

use crate::context::{DeleteContext, SaveContext};
use crate::stage::LifecycleStage;

/// Deletes the previously referenced blob of every file-backed field whose
/// value changed, strictly after the new state is committed, and every blob
/// of a record that is being deleted.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaleFileReaper;

impl StaleFileReaper {
    pub const NAME: &'static str = "reaper";
}

impl LifecycleStage for StaleFileReaper {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn before_save(&self, ctx: &mut SaveContext<'_>) -> Result<()> {
        let Some(prior) = ctx.prior() else {
            return Ok(());
        };

        let mut snapshot: Vec<(String, PathBuf)> = Vec::new();
        for field in ctx.schema.fields() {
            let Some(old) = prior.file(field.name()) else {
                continue;
            };
            // Unresolvable prior names are reported and left alone.
            match ctx.storage.path(old) {
                Ok(path) => snapshot.push((field.name().to_string(), path)),
                Err(e) => {
                    tracing::warn!(field = field.name(), "Cannot resolve prior {old}: {e}");
                    ctx.cleanup.report(Path::new(old.name()), &e);
                }
            }
        }

        for (field, path) in snapshot {
            ctx.snapshot_stale(&field, path);
        }
        Ok(())
    }

    fn after_commit(&self, ctx: &mut SaveContext<'_>) {
        for (field, old_path) in ctx.take_stale() {
            let new_path = ctx
                .record()
                .file(&field)
                .and_then(|f| ctx.storage.path(f).ok());

            if new_path.as_deref() == Some(old_path.as_path()) {
                continue;
            }
            tracing::debug!(field = %field, "Field no longer references {}", old_path.display());
            ctx.reap(&old_path);
        }
    }

    fn before_delete(&self, ctx: &mut DeleteContext<'_>) {
        let mut owned = Vec::new();
        for field in ctx.schema.fields() {
            let Some(file) = ctx.record().file(field.name()) else {
                continue;
            };
            match ctx.storage.path(file) {
                Ok(path) => owned.push(path),
                Err(e) => {
                    tracing::warn!(field = field.name(), "Cannot resolve {file}: {e}");
                    ctx.cleanup.report(Path::new(file.name()), &e);
                }
            }
        }

        for path in owned {
            ctx.reap(&path);
        }
    }
}
