//! Command implementations behind the `image-classes` binary.

use std::path::Path;

use ic_core::config::Config;
use ic_core::{
    CropPolicy, Error, FieldDescriptor, Record, RecordId, RecordSchema, Result, ThumbnailBounds,
};
use ic_db::pool::{self, DbPool};
use ic_db::queries::records;
use ic_imaging::{FileStorage, ImageCodec, ShrinkOutcome};
use ic_lifecycle::{CleanupHook, DeleteOutcome, LifecyclePipeline};

/// Cover-crop the image at `path` in place to exactly `width` x `height`.
pub fn crop_file(codec: &ImageCodec, path: &Path, width: u32, height: u32) -> Result<(u32, u32)> {
    let policy = CropPolicy::new(width, height).ok_or_else(|| {
        Error::Validation(format!("crop size {width}x{height} must be non-zero"))
    })?;
    tracing::debug!("Cropping {} to {}x{}", path.display(), width, height);
    let size = codec.crop_to_cover(path, policy)?;
    tracing::info!("Cropped {} to {}x{}", path.display(), size.0, size.1);
    Ok(size)
}

/// Shrink the image at `path` in place so it fits the given bounds.
pub fn shrink_file(
    codec: &ImageCodec,
    path: &Path,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<ShrinkOutcome> {
    let bounds = ThumbnailBounds::new(max_width, max_height);
    if !bounds.is_active() {
        return Err(Error::Validation(
            "at least one non-zero bound (--max-width or --max-height) is required".into(),
        ));
    }
    let (width, height) = ic_imaging::probe_dimensions(path)?;
    tracing::debug!(?bounds, "Shrinking {} ({}x{})", path.display(), width, height);
    let outcome = codec.shrink_to_fit(path, width, height, bounds)?;
    tracing::info!(?outcome, "Shrink finished for {}", path.display());
    Ok(outcome)
}

/// A schema treating every field a stored record carries as file-backed.
///
/// Stored rows do not carry their policies, and deletion only needs to know
/// which fields reference blobs.
pub fn schema_for(record: &Record) -> Result<RecordSchema> {
    RecordSchema::new(
        record.kind(),
        record.field_names().map(FieldDescriptor::file).collect(),
    )
}

/// Load a stored record, failing with `NotFound` if absent.
pub fn load_record(pool: &DbPool, id: RecordId) -> Result<Record> {
    let conn = pool::get_conn(pool)?;
    let record = records::require_record(&conn, id)?;
    tracing::debug!(record = %id, kind = record.kind(), "Loaded record");
    Ok(record)
}

/// Delete a stored record and every blob it references.
pub fn purge_record(config: &Config, id: RecordId) -> Result<(DeleteOutcome, u64)> {
    let pool = pool::init_pool_from_config(&config.database)?;
    let mut record = load_record(&pool, id)?;

    let pipeline = LifecyclePipeline::for_schema(
        schema_for(&record)?,
        pool,
        FileStorage::from_config(&config.storage),
        ImageCodec::from_config(&config.imaging),
    )
    .with_cleanup_hook(CleanupHook::new(|path, e| {
        tracing::warn!(error = %e, "Could not remove {}", path.display());
    }));

    let outcome = pipeline.delete(&mut record)?;
    let failures = pipeline.cleanup().failures();
    tracing::info!(
        record = %id,
        removed = outcome.reaped.len(),
        failures,
        "Purged record"
    );
    Ok((outcome, failures))
}

/// A stored record rendered as JSON.
pub fn show_record(config: &Config, id: RecordId) -> Result<serde_json::Value> {
    let pool = pool::init_pool_from_config(&config.database)?;
    let record = load_record(&pool, id)?;
    serde_json::to_value(&record).map_err(|e| Error::Internal(e.to_string()))
}
