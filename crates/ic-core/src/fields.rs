//! Statically declared field descriptors and per-field image policies.
//!
//! A [`RecordSchema`] lists every file-backed field of one record kind, in
//! declaration order. Image fields may carry a [`CropPolicy`] (cover-crop to
//! an exact size) and/or [`ThumbnailBounds`] (shrink to fit within maximums).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Record;

/// Whether a field's blob is an arbitrary file or a decodable raster image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    File,
    Image,
}

/// Exact output size for a cover-cropped image field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CropPolicyRepr")]
pub struct CropPolicy {
    width: u32,
    height: u32,
}

impl CropPolicy {
    /// Build a crop policy. Returns `None` when either dimension is zero,
    /// since a zero dimension means the policy is unset.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Deserialize)]
struct CropPolicyRepr {
    width: u32,
    height: u32,
}

impl TryFrom<CropPolicyRepr> for CropPolicy {
    type Error = String;

    fn try_from(repr: CropPolicyRepr) -> std::result::Result<Self, Self::Error> {
        Self::new(repr.width, repr.height)
            .ok_or_else(|| format!("crop size {}x{} must be non-zero", repr.width, repr.height))
    }
}

/// Maximum dimensions for a bounded-shrink image field.
///
/// Either bound may be set on its own. A zero bound is treated as unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ThumbnailBoundsRepr")]
pub struct ThumbnailBounds {
    max_width: Option<u32>,
    max_height: Option<u32>,
}

impl ThumbnailBounds {
    pub fn new(max_width: Option<u32>, max_height: Option<u32>) -> Self {
        Self {
            max_width: max_width.filter(|w| *w > 0),
            max_height: max_height.filter(|h| *h > 0),
        }
    }

    pub fn max_width(&self) -> Option<u32> {
        self.max_width
    }

    pub fn max_height(&self) -> Option<u32> {
        self.max_height
    }

    /// True when at least one bound is set.
    pub fn is_active(&self) -> bool {
        self.max_width.is_some() || self.max_height.is_some()
    }
}

#[derive(Deserialize)]
struct ThumbnailBoundsRepr {
    #[serde(default)]
    max_width: Option<u32>,
    #[serde(default)]
    max_height: Option<u32>,
}

impl From<ThumbnailBoundsRepr> for ThumbnailBounds {
    fn from(repr: ThumbnailBoundsRepr) -> Self {
        Self::new(repr.max_width, repr.max_height)
    }
}

/// Describes one file-backed field of a record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crop: Option<CropPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<ThumbnailBounds>,
}

impl FieldDescriptor {
    /// A plain file field.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::File,
            crop: None,
            bounds: None,
        }
    }

    /// An image field with no policy attached.
    pub fn image(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Image,
            ..Self::file(name)
        }
    }

    /// Builder: attach a crop policy.
    pub fn with_crop(mut self, policy: CropPolicy) -> Self {
        self.crop = Some(policy);
        self
    }

    /// Builder: attach thumbnail bounds. Inactive bounds are dropped.
    pub fn with_bounds(mut self, bounds: ThumbnailBounds) -> Self {
        self.bounds = bounds.is_active().then_some(bounds);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_image(&self) -> bool {
        self.kind == FieldKind::Image
    }

    /// The crop policy, only ever present on image fields.
    pub fn crop(&self) -> Option<CropPolicy> {
        self.crop.filter(|_| self.is_image())
    }

    /// The thumbnail bounds, only ever present on image fields.
    pub fn bounds(&self) -> Option<ThumbnailBounds> {
        self.bounds.filter(|_| self.is_image())
    }
}

/// The field layout of one record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    kind: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    /// Build a schema, rejecting empty kinds, duplicate field names, and
    /// policies declared on non-image fields.
    pub fn new(kind: impl Into<String>, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(Error::Validation("schema kind must not be empty".into()));
        }

        for (i, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "{kind}: field #{i} has an empty name"
                )));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::Validation(format!(
                    "{kind}: duplicate field '{}'",
                    field.name
                )));
            }
            if !field.is_image() && (field.crop.is_some() || field.bounds.is_some()) {
                return Err(Error::Validation(format!(
                    "{kind}: field '{}' declares an image policy but is not an image field",
                    field.name
                )));
            }
        }

        Ok(Self { kind, fields })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// All file-backed fields (image fields included), in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Image fields with an active crop policy.
    pub fn crop_fields(&self) -> impl Iterator<Item = (&FieldDescriptor, CropPolicy)> {
        self.fields.iter().filter_map(|f| f.crop().map(|p| (f, p)))
    }

    /// Image fields with at least one thumbnail bound.
    pub fn bounded_fields(&self) -> impl Iterator<Item = (&FieldDescriptor, ThumbnailBounds)> {
        self.fields.iter().filter_map(|f| f.bounds().map(|b| (f, b)))
    }

    /// Create an empty, not-yet-persisted record of this kind.
    pub fn new_record(&self) -> Record {
        Record::new(&self.kind, self.fields.iter().map(|f| f.name.as_str()))
    }

    /// Check that a record belongs to this schema.
    pub fn validate(&self, record: &Record) -> Result<()> {
        if record.kind() != self.kind {
            return Err(Error::Validation(format!(
                "record kind '{}' does not match schema '{}'",
                record.kind(),
                self.kind
            )));
        }
        if let Some(unknown) = record.field_names().find(|n| self.field(n).is_none()) {
            return Err(Error::Validation(format!(
                "{}: unknown field '{unknown}'",
                self.kind
            )));
        }
        Ok(())
    }
}
