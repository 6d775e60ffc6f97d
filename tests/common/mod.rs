//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which owns a scratch storage root and an
//! in-memory database, and builds lifecycle pipelines over them.

#![allow(dead_code)]

use std::path::PathBuf;

use image::{DynamicImage, Rgba, RgbaImage};
use image_classes::ic_core::{FieldFile, RecordSchema};
use image_classes::ic_db::pool::{init_memory_pool, DbPool};
use image_classes::ic_imaging::{FileStorage, ImageCodec};
use image_classes::ic_lifecycle::LifecyclePipeline;
use tempfile::TempDir;

/// Scratch storage root plus in-memory database.
pub struct TestHarness {
    pub dir: TempDir,
    pub storage: FileStorage,
    pub db: DbPool,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let storage = FileStorage::new(dir.path());
        let db = init_memory_pool().expect("failed to create in-memory pool");
        Self { dir, storage, db }
    }

    /// The default pipeline for `schema` over this harness's storage and DB.
    pub fn pipeline(&self, schema: RecordSchema) -> LifecyclePipeline {
        LifecyclePipeline::for_schema(
            schema,
            self.db.clone(),
            self.storage.clone(),
            ImageCodec::default(),
        )
    }

    pub fn path(&self, file: &FieldFile) -> PathBuf {
        self.storage.path(file).expect("unresolvable storage name")
    }

    /// Write a solid-color PNG of the given size into storage.
    pub fn png(&self, name: &str, width: u32, height: u32) -> FieldFile {
        self.image(name, &RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255])))
    }

    /// Write `image` into storage; the format follows the name's extension.
    pub fn image(&self, name: &str, image: &RgbaImage) -> FieldFile {
        let path = self.storage.resolve(name).expect("invalid storage name");
        let dynamic = DynamicImage::ImageRgba8(image.clone());
        let written = match path.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => dynamic.to_rgb8().save(&path),
            _ => dynamic.save(&path),
        };
        written.expect("failed to write fixture image");
        FieldFile::new(name)
    }

    pub fn bytes(&self, file: &FieldFile) -> Vec<u8> {
        std::fs::read(self.path(file)).expect("failed to read blob")
    }

    pub fn dimensions(&self, file: &FieldFile) -> (u32, u32) {
        self.storage.dimensions(file).expect("failed to read dimensions")
    }
}
