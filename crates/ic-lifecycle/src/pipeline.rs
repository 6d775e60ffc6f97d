//! Pipeline executor: runs the registered [`LifecycleStage`]s around the
//! persistence layer's transaction.

use ic_core::config::Config;
use ic_core::{Error, Record, RecordId, RecordSchema, Result};
use ic_db::pool::{self, DbPool};
use ic_db::queries::records;
use ic_imaging::{FileStorage, ImageCodec};
use rusqlite::Connection;

use crate::context::{CleanupHook, DeleteContext, DeleteOutcome, SaveContext, SaveOutcome};
use crate::stage::LifecycleStage;
use crate::stages::{BoundedThumbnailer, CenteredCropper, StaleFileReaper};

/// Saves and deletes records of one schema, running every stage's hooks in
/// the documented order (see [`crate::stage`]).
pub struct LifecyclePipeline {
    schema: RecordSchema,
    pool: DbPool,
    storage: FileStorage,
    codec: ImageCodec,
    cleanup: CleanupHook,
    stages: Vec<Box<dyn LifecycleStage>>,
}

impl LifecyclePipeline {
    /// Create a pipeline with no stages registered.
    pub fn new(schema: RecordSchema, pool: DbPool, storage: FileStorage, codec: ImageCodec) -> Self {
        Self {
            schema,
            pool,
            storage,
            codec,
            cleanup: CleanupHook::default(),
            stages: Vec::new(),
        }
    }

    /// Create a pipeline with the stages the schema's policies call for.
    ///
    /// The stale-file reaper is always registered. The cropper is added when
    /// any field declares a crop policy, the thumbnailer when any field
    /// declares thumbnail bounds.
    pub fn for_schema(
        schema: RecordSchema,
        pool: DbPool,
        storage: FileStorage,
        codec: ImageCodec,
    ) -> Self {
        let wants_crop = schema.crop_fields().next().is_some();
        let wants_thumbnails = schema.bounded_fields().next().is_some();

        let mut pipeline = Self::new(schema, pool, storage, codec).with_stage(StaleFileReaper);
        if wants_crop {
            pipeline = pipeline.with_stage(CenteredCropper);
        }
        if wants_thumbnails {
            pipeline = pipeline.with_stage(BoundedThumbnailer);
        }

        tracing::debug!(
            kind = pipeline.schema.kind(),
            stages = ?pipeline.stage_names(),
            "Lifecycle pipeline assembled"
        );
        pipeline
    }

    /// Open the configured database and storage and build the default
    /// pipeline for `schema`.
    pub fn from_config(schema: RecordSchema, config: &Config) -> Result<Self> {
        let pool = pool::init_pool_from_config(&config.database)?;
        Ok(Self::for_schema(
            schema,
            pool,
            FileStorage::from_config(&config.storage),
            ImageCodec::from_config(&config.imaging),
        ))
    }

    /// Append a stage. Stages run in registration order.
    pub fn with_stage(mut self, stage: impl LifecycleStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Replace the hook that receives cleanup failures.
    pub fn with_cleanup_hook(mut self, hook: CleanupHook) -> Self {
        self.cleanup = hook;
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn cleanup(&self) -> &CleanupHook {
        &self.cleanup
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Load the committed copy of a record.
    pub fn get(&self, id: RecordId) -> Result<Option<Record>> {
        let conn = pool::get_conn(&self.pool)?;
        records::get_record(&conn, id)
    }

    /// Save a record.
    ///
    /// # Errors
    ///
    /// Values that do not resolve inside the storage root are rejected with
    /// [`Error::Validation`] before anything is written.
    /// Errors from loading the committed copy, persisting, or an atomic stage
    /// roll the transaction back; a brand-new record gets its identity
    /// reverted. An error from a post-commit stage is returned after the
    /// cleanup hooks have run; the committed row stays in place.
    pub fn save(&self, record: &mut Record) -> Result<SaveOutcome> {
        self.schema.validate(record)?;
        for field in self.schema.fields() {
            if let Some(file) = record.file(field.name()) {
                self.storage.path(file)?;
            }
        }
        let original_id = record.id();
        let mut conn = pool::get_conn(&self.pool)?;

        let mut ctx = SaveContext::new(
            &self.schema,
            &self.storage,
            &self.codec,
            &self.cleanup,
            record,
        );

        if let Err(e) = self.persist(&mut conn, &mut ctx) {
            ctx.record_mut().set_id(original_id);
            return Err(e);
        }

        let mut deferred = None;
        for stage in self.stages.iter().filter(|s| !s.atomic()) {
            if let Err(e) = logged(stage.as_ref(), "after_save", stage.after_save(&mut ctx)) {
                deferred = Some(e);
                break;
            }
        }

        for stage in &self.stages {
            stage.after_commit(&mut ctx);
        }

        if let Some(e) = deferred {
            return Err(e);
        }

        let outcome = ctx
            .into_outcome()
            .ok_or_else(|| Error::Internal("saved record has no identity".into()))?;
        tracing::info!(
            record = %outcome.id,
            created = outcome.created,
            reaped = outcome.reaped.len(),
            "Saved {} record",
            self.schema.kind()
        );
        Ok(outcome)
    }

    /// Snapshot, persist and run atomic transforms inside one transaction.
    fn persist(&self, conn: &mut Connection, ctx: &mut SaveContext<'_>) -> Result<()> {
        let tx = conn
            .transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        let prior = match ctx.record().id() {
            Some(id) => records::get_record(&tx, id)?,
            None => None,
        };
        ctx.set_prior(prior);

        for stage in &self.stages {
            logged(stage.as_ref(), "before_save", stage.before_save(ctx))?;
        }

        records::save_record(&tx, ctx.record_mut())?;

        for stage in self.stages.iter().filter(|s| s.atomic()) {
            logged(stage.as_ref(), "after_save", stage.after_save(ctx))?;
        }

        tx.commit().map_err(|e| Error::database(e.to_string()))
    }

    /// Delete a record: every stage's `before_delete` runs first, then the
    /// row is removed and the record loses its identity.
    ///
    /// Blob removal is best effort; failures go to the cleanup hook and the
    /// row is removed regardless.
    pub fn delete(&self, record: &mut Record) -> Result<DeleteOutcome> {
        let id = record
            .id()
            .ok_or_else(|| Error::Validation("cannot delete a record that was never saved".into()))?;
        self.schema.validate(record)?;

        let mut ctx = DeleteContext::new(&self.schema, &self.storage, &self.cleanup, record);
        for stage in &self.stages {
            stage.before_delete(&mut ctx);
        }
        let reaped = ctx.into_reaped();

        let conn = pool::get_conn(&self.pool)?;
        let removed = records::delete_record(&conn, id)?;
        record.set_id(None);

        tracing::info!(
            record = %id,
            removed,
            reaped = reaped.len(),
            "Deleted {} record",
            self.schema.kind()
        );
        Ok(DeleteOutcome { removed, reaped })
    }
}

impl std::fmt::Debug for LifecyclePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecyclePipeline")
            .field("kind", &self.schema.kind())
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

fn logged(stage: &dyn LifecycleStage, hook: &str, result: Result<()>) -> Result<()> {
    result.inspect_err(|e| tracing::error!(stage = stage.name(), "{hook} failed: {e}"))
}
