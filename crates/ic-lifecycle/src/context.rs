//! Per-call state shared by the stages of one save or delete.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ic_core::{Error, Record, RecordId, RecordSchema};
use ic_imaging::{FileStorage, ImageCodec};

/// Receiver for best-effort cleanup failures.
///
/// Wraps a callback invoked with the path that could not be removed and the
/// error. Failures are also counted so callers can observe them without
/// installing a callback.
pub struct CleanupHook {
    callback: Box<dyn Fn(&Path, &Error) + Send + Sync>,
    failures: AtomicU64,
}

impl CleanupHook {
    /// Create a new hook from the given callback.
    pub fn new(callback: impl Fn(&Path, &Error) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            failures: AtomicU64::new(0),
        }
    }

    /// Create a hook that only counts failures.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    /// Report a cleanup failure.
    pub fn report(&self, path: &Path, error: &Error) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        (self.callback)(path, error);
    }

    /// Number of failures reported so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Default for CleanupHook {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for CleanupHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupHook")
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

/// Remove a blob, routing any failure other than "already gone" to the hook.
/// Returns whether a file was actually removed.
pub(crate) fn reap(storage: &FileStorage, cleanup: &CleanupHook, path: &Path) -> bool {
    match storage.remove_path(path) {
        Ok(true) => {
            tracing::info!("Removed stale file {}", path.display());
            true
        }
        Ok(false) => {
            tracing::debug!("Stale file {} was already gone", path.display());
            false
        }
        Err(e) => {
            let err = Error::from(e);
            tracing::warn!("Failed to remove {}: {err}", path.display());
            cleanup.report(path, &err);
            false
        }
    }
}

/// Transform state of one image field for one stage during one save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// No transform was written.
    Unchanged,
    /// The field changed and its file is due for a transform.
    TransformPending,
    /// The transformed file has been written.
    Persisted,
}

/// A field's final state as reported by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTransition {
    pub stage: &'static str,
    pub field: String,
    pub state: FieldState,
}

/// Summary of a successful save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub id: RecordId,
    /// Whether no committed copy existed before this save.
    pub created: bool,
    pub transitions: Vec<FieldTransition>,
    /// Stale files actually removed from storage.
    pub reaped: Vec<PathBuf>,
}

impl SaveOutcome {
    /// The state a stage left a field in, if the stage tracked it.
    pub fn state(&self, stage: &str, field: &str) -> Option<FieldState> {
        self.transitions
            .iter()
            .find(|t| t.stage == stage && t.field == field)
            .map(|t| t.state)
    }
}

/// Context passed to every stage during a save.
pub struct SaveContext<'a> {
    /// Field layout of the record being saved.
    pub schema: &'a RecordSchema,
    /// Blob storage resolving field values to paths.
    pub storage: &'a FileStorage,
    /// Codec used for in-place image rewrites.
    pub codec: &'a ImageCodec,
    /// Sink for swallowed cleanup failures.
    pub cleanup: &'a CleanupHook,
    record: &'a mut Record,
    prior: Option<Record>,
    stale: BTreeMap<String, PathBuf>,
    transitions: Vec<FieldTransition>,
    reaped: Vec<PathBuf>,
}

impl<'a> SaveContext<'a> {
    pub fn new(
        schema: &'a RecordSchema,
        storage: &'a FileStorage,
        codec: &'a ImageCodec,
        cleanup: &'a CleanupHook,
        record: &'a mut Record,
    ) -> Self {
        Self {
            schema,
            storage,
            codec,
            cleanup,
            record,
            prior: None,
            stale: BTreeMap::new(),
            transitions: Vec::new(),
            reaped: Vec::new(),
        }
    }

    /// The record being saved, in its new state.
    pub fn record(&self) -> &Record {
        self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut Record {
        self.record
    }

    /// The committed copy loaded before persisting, if one existed.
    pub fn prior(&self) -> Option<&Record> {
        self.prior.as_ref()
    }

    pub(crate) fn set_prior(&mut self, prior: Option<Record>) {
        self.prior = prior;
    }

    /// True when no committed copy existed, i.e. this save creates the row.
    pub fn is_creation(&self) -> bool {
        self.prior.is_none()
    }

    /// Whether `field` differs between the committed copy and the new state.
    /// Always true on creation.
    pub fn field_changed(&self, field: &str) -> bool {
        match &self.prior {
            Some(prior) => prior.file(field) != self.record.file(field),
            None => true,
        }
    }

    /// Remember the committed path of `field` as a deletion candidate.
    pub fn snapshot_stale(&mut self, field: &str, path: PathBuf) {
        self.stale.insert(field.to_string(), path);
    }

    /// Drain the deletion candidates recorded by [`snapshot_stale`](Self::snapshot_stale).
    pub fn take_stale(&mut self) -> BTreeMap<String, PathBuf> {
        std::mem::take(&mut self.stale)
    }

    /// Record a field's state for a stage, replacing any earlier state.
    pub fn set_state(&mut self, stage: &'static str, field: &str, state: FieldState) {
        match self
            .transitions
            .iter_mut()
            .find(|t| t.stage == stage && t.field == field)
        {
            Some(t) => t.state = state,
            None => self.transitions.push(FieldTransition {
                stage,
                field: field.to_string(),
                state,
            }),
        }
    }

    pub fn state(&self, stage: &str, field: &str) -> Option<FieldState> {
        self.transitions
            .iter()
            .find(|t| t.stage == stage && t.field == field)
            .map(|t| t.state)
    }

    /// Best-effort removal of a stale blob.
    pub fn reap(&mut self, path: &Path) {
        if reap(self.storage, self.cleanup, path) {
            self.reaped.push(path.to_path_buf());
        }
    }

    pub(crate) fn into_outcome(self) -> Option<SaveOutcome> {
        Some(SaveOutcome {
            id: self.record.id()?,
            created: self.prior.is_none(),
            transitions: self.transitions,
            reaped: self.reaped,
        })
    }
}

/// Summary of a successful delete.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    /// Whether a row was actually removed.
    pub removed: bool,
    /// Files actually removed from storage.
    pub reaped: Vec<PathBuf>,
}

/// Context passed to every stage before a record is deleted.
pub struct DeleteContext<'a> {
    pub schema: &'a RecordSchema,
    pub storage: &'a FileStorage,
    pub cleanup: &'a CleanupHook,
    record: &'a Record,
    reaped: Vec<PathBuf>,
}

impl<'a> DeleteContext<'a> {
    pub fn new(
        schema: &'a RecordSchema,
        storage: &'a FileStorage,
        cleanup: &'a CleanupHook,
        record: &'a Record,
    ) -> Self {
        Self {
            schema,
            storage,
            cleanup,
            record,
            reaped: Vec::new(),
        }
    }

    pub fn record(&self) -> &'a Record {
        self.record
    }

    /// Best-effort removal of a blob owned by the record.
    pub fn reap(&mut self, path: &Path) {
        if reap(self.storage, self.cleanup, path) {
            self.reaped.push(path.to_path_buf());
        }
    }

    pub(crate) fn into_reaped(self) -> Vec<PathBuf> {
        self.reaped
    }
}
