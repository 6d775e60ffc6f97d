//! Lifecycle integration tests
//!
//! Save/delete scenarios across the reaper, cropper and thumbnailer stages,
//! backed by an in-memory database and a scratch storage root.

mod common;

use std::sync::{Arc, Mutex};

use common::TestHarness;
use image::{Rgba, RgbaImage};
use image_classes::ic_core::{CropPolicy, FieldDescriptor, FieldFile, RecordSchema, ThumbnailBounds};
use image_classes::ic_db::pool::get_conn;
use image_classes::ic_db::queries::records;
use image_classes::ic_lifecycle::{CleanupHook, FieldState};

fn avatar_schema() -> RecordSchema {
    RecordSchema::new(
        "profile",
        vec![
            FieldDescriptor::image("avatar").with_crop(CropPolicy::new(100, 100).unwrap()),
            FieldDescriptor::file("resume"),
        ],
    )
    .unwrap()
}

fn gallery_schema() -> RecordSchema {
    RecordSchema::new(
        "gallery",
        vec![FieldDescriptor::image("thumb").with_bounds(ThumbnailBounds::new(Some(100), None))],
    )
    .unwrap()
}

fn documents_schema() -> RecordSchema {
    RecordSchema::new(
        "document",
        vec![FieldDescriptor::file("pdf"), FieldDescriptor::file("scan")],
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Pipeline assembly
// ---------------------------------------------------------------------------

#[test]
fn test_schema_without_policies_only_reaps() {
    let h = TestHarness::new();
    assert_eq!(h.pipeline(documents_schema()).stage_names(), vec!["reaper"]);
    assert_eq!(
        h.pipeline(avatar_schema()).stage_names(),
        vec!["reaper", "cropper"]
    );
    assert_eq!(
        h.pipeline(gallery_schema()).stage_names(),
        vec!["reaper", "thumbnailer"]
    );
}

// ---------------------------------------------------------------------------
// Cover-crop
// ---------------------------------------------------------------------------

#[test]
fn test_create_crops_wide_image_around_center() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(avatar_schema());

    // Left half red, right half blue; the centered crop straddles the seam.
    let source = RgbaImage::from_fn(200, 50, |x, _| {
        if x < 100 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let avatar = h.image("avatar.png", &source);

    let mut record = pipeline.schema().new_record();
    record.set("avatar", avatar.clone());
    let outcome = pipeline.save(&mut record).unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.state("cropper", "avatar"), Some(FieldState::Persisted));
    assert_eq!(h.dimensions(&avatar), (100, 100));

    let out = image::open(h.path(&avatar)).unwrap().to_rgba8();
    let left = out.get_pixel(10, 50);
    let right = out.get_pixel(90, 50);
    assert!(left[0] > 200 && left[2] < 50, "left pixel {left:?}");
    assert!(right[2] > 200 && right[0] < 50, "right pixel {right:?}");
}

#[test]
fn test_crop_keeps_jpeg_format() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(avatar_schema());

    let avatar = h.image(
        "avatar.jpg",
        &RgbaImage::from_pixel(64, 256, Rgba([10, 200, 10, 255])),
    );
    let mut record = pipeline.schema().new_record();
    record.set("avatar", avatar.clone());
    pipeline.save(&mut record).unwrap();

    assert_eq!(h.dimensions(&avatar), (100, 100));
    assert_eq!(
        image::guess_format(&h.bytes(&avatar)).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[test]
fn test_resave_without_change_does_not_crop_again() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(avatar_schema());

    let avatar = h.png("avatar.png", 300, 120);
    let mut record = pipeline.schema().new_record();
    record.set("avatar", avatar.clone());
    pipeline.save(&mut record).unwrap();
    let cropped = h.bytes(&avatar);

    record.set("resume", FieldFile::new("cv.pdf"));
    let outcome = pipeline.save(&mut record).unwrap();

    assert!(!outcome.created);
    assert_eq!(outcome.state("cropper", "avatar"), Some(FieldState::Unchanged));
    assert_eq!(h.bytes(&avatar), cropped);
}

#[test]
fn test_crop_failure_rolls_back_update_and_keeps_old_file() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(avatar_schema());

    let good = h.png("good.png", 200, 50);
    let mut record = pipeline.schema().new_record();
    record.set("avatar", good.clone());
    let id = pipeline.save(&mut record).unwrap().id;

    let junk = h.storage.store("junk.png", b"definitely not a png").unwrap();
    record.set("avatar", junk.clone());
    assert!(pipeline.save(&mut record).is_err());

    assert_eq!(record.id(), Some(id));
    let stored = pipeline.get(id).unwrap().unwrap();
    assert_eq!(stored.file("avatar"), Some(&good));
    assert!(h.storage.exists(&good));
    assert!(h.storage.exists(&junk));
}

// ---------------------------------------------------------------------------
// Bounded thumbnails
// ---------------------------------------------------------------------------

#[test]
fn test_thumbnail_replacement_deletes_old_and_keeps_small_new() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(gallery_schema());

    let a = h.png("a.png", 300, 300);
    let mut record = pipeline.schema().new_record();
    record.set("thumb", a.clone());
    let first = pipeline.save(&mut record).unwrap();
    assert_eq!(first.state("thumbnailer", "thumb"), Some(FieldState::Persisted));
    assert_eq!(h.dimensions(&a), (100, 100));

    let b = h.png("b.png", 50, 50);
    let before = h.bytes(&b);
    record.set("thumb", b.clone());
    let second = pipeline.save(&mut record).unwrap();

    assert!(!h.storage.exists(&a));
    assert_eq!(h.bytes(&b), before);
    assert_eq!(second.state("thumbnailer", "thumb"), Some(FieldState::Unchanged));
    assert_eq!(pipeline.cleanup().failures(), 0);
}

#[test]
fn test_thumbnail_respelled_name_keeps_live_file() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(gallery_schema());

    let a = h.png("a.png", 50, 50);
    let before = h.bytes(&a);
    let mut record = pipeline.schema().new_record();
    record.set("thumb", a.clone());
    pipeline.save(&mut record).unwrap();

    let respelled = FieldFile::new("./a.png");
    record.set("thumb", respelled.clone());
    let outcome = pipeline.save(&mut record).unwrap();

    assert!(outcome.reaped.is_empty());
    assert!(h.storage.exists(&a));
    assert_eq!(h.bytes(&respelled), before);
    assert_eq!(pipeline.cleanup().failures(), 0);
}

#[test]
fn test_thumbnail_height_bound_keeps_aspect() {
    let h = TestHarness::new();
    let schema = RecordSchema::new(
        "gallery",
        vec![FieldDescriptor::image("thumb").with_bounds(ThumbnailBounds::new(None, Some(80)))],
    )
    .unwrap();
    let pipeline = h.pipeline(schema);

    let tall = h.png("tall.png", 120, 400);
    let mut record = pipeline.schema().new_record();
    record.set("thumb", tall.clone());
    pipeline.save(&mut record).unwrap();

    assert_eq!(h.dimensions(&tall), (24, 80));
}

#[test]
fn test_thumbnail_within_bounds_is_byte_identical() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(gallery_schema());

    let small = h.png("small.png", 100, 20);
    let before = h.bytes(&small);
    let mut record = pipeline.schema().new_record();
    record.set("thumb", small.clone());
    pipeline.save(&mut record).unwrap();

    assert_eq!(h.bytes(&small), before);
}

// ---------------------------------------------------------------------------
// Stale-file reaping
// ---------------------------------------------------------------------------

#[test]
fn test_unchanged_file_field_is_not_deleted() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(documents_schema());

    let pdf = h.storage.store("doc.pdf", b"%PDF").unwrap();
    let mut record = pipeline.schema().new_record();
    record.set("pdf", pdf.clone());
    pipeline.save(&mut record).unwrap();

    record.set("scan", h.storage.store("scan.png", b"scan").unwrap());
    let outcome = pipeline.save(&mut record).unwrap();

    assert!(outcome.reaped.is_empty());
    assert!(h.storage.exists(&pdf));
}

#[test]
fn test_replaced_file_is_deleted_after_commit() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(documents_schema());

    let a = h.storage.store("a.pdf", b"a").unwrap();
    let b = h.storage.store("b.pdf", b"b").unwrap();
    let mut record = pipeline.schema().new_record();
    record.set("pdf", a.clone());
    pipeline.save(&mut record).unwrap();

    record.set("pdf", b.clone());
    let outcome = pipeline.save(&mut record).unwrap();

    assert_eq!(outcome.reaped, vec![h.path(&a)]);
    assert!(!h.storage.exists(&a));
    assert_eq!(h.bytes(&b), b"b");
}

#[test]
fn test_cleared_field_deletes_file() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(documents_schema());

    let a = h.storage.store("a.pdf", b"a").unwrap();
    let mut record = pipeline.schema().new_record();
    record.set("pdf", a.clone());
    pipeline.save(&mut record).unwrap();

    record.clear("pdf");
    pipeline.save(&mut record).unwrap();
    assert!(!h.storage.exists(&a));
}

#[test]
fn test_cleanup_failure_goes_to_hook_and_save_succeeds() {
    let h = TestHarness::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let pipeline = h
        .pipeline(documents_schema())
        .with_cleanup_hook(CleanupHook::new(move |path, _| {
            seen_clone.lock().unwrap().push(path.to_path_buf());
        }));

    // A directory where a blob should be cannot be removed as a file.
    std::fs::create_dir(h.dir.path().join("stuck")).unwrap();
    let mut record = pipeline.schema().new_record();
    record.set("pdf", FieldFile::new("stuck"));
    pipeline.save(&mut record).unwrap();

    record.set("pdf", h.storage.store("fresh.pdf", b"x").unwrap());
    pipeline.save(&mut record).unwrap();

    assert_eq!(pipeline.cleanup().failures(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![h.dir.path().join("stuck")]);
}

#[test]
fn test_legacy_name_outside_root_does_not_block_update() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(documents_schema());

    // A row written before names were checked against the storage root.
    let id = {
        let conn = get_conn(&h.db).unwrap();
        let mut legacy = pipeline.schema().new_record();
        legacy.set("pdf", FieldFile::new("../outside.pdf"));
        records::save_record(&conn, &mut legacy).unwrap()
    };

    let mut record = pipeline.get(id).unwrap().unwrap();
    let b = h.storage.store("b.pdf", b"b").unwrap();
    record.set("pdf", b.clone());
    let outcome = pipeline.save(&mut record).unwrap();

    assert!(outcome.reaped.is_empty());
    assert_eq!(pipeline.cleanup().failures(), 1);
    assert_eq!(pipeline.get(id).unwrap().unwrap().file("pdf"), Some(&b));
    assert!(h.storage.exists(&b));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn test_delete_removes_all_blobs_and_tolerates_missing_ones() {
    let h = TestHarness::new();
    let pipeline = h.pipeline(documents_schema());

    let pdf = h.storage.store("a.pdf", b"a").unwrap();
    let scan = h.storage.store("a.png", b"png").unwrap();
    let mut record = pipeline.schema().new_record();
    record.set("pdf", pdf.clone());
    record.set("scan", scan.clone());
    let id = pipeline.save(&mut record).unwrap().id;

    // Someone else already removed one of the blobs.
    std::fs::remove_file(h.path(&scan)).unwrap();

    let outcome = pipeline.delete(&mut record).unwrap();
    assert!(outcome.removed);
    assert_eq!(outcome.reaped, vec![h.path(&pdf)]);
    assert!(!h.storage.exists(&pdf));
    assert_eq!(record.id(), None);
    assert!(pipeline.get(id).unwrap().is_none());
    assert_eq!(pipeline.cleanup().failures(), 0);
}
