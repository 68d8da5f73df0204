use image::{ImageFormat, Rgb, RgbImage};
use rust_image_viewer::cache::{CacheOptions, ImageCache};
use rust_image_viewer::error::Error;
use rust_image_viewer::gpu::HeadlessTextures;
use rust_image_viewer::scan::scan;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_png(path: &Path) {
    RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])).save_with_format(path, ImageFormat::Png)
        .unwrap();
}

#[test]
fn keeps_only_allowed_extensions_and_locates_target() {
    let dir = tempdir().unwrap();
    for name in ["b.png", "a.PNG", "c.png"] {
        write_png(&dir.path().join(name));
    }
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    fs::create_dir(dir.path().join("nested.png")).unwrap();

    let result = scan(&dir.path().join("c.png")).unwrap();
    let names: Vec<_> = result
        .paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.PNG", "b.png", "c.png"]);
    assert_eq!(result.selection, Some(2));
}

#[test]
fn filtered_target_falls_back_to_first_entry() {
    let dir = tempdir().unwrap();
    write_png(&dir.path().join("a.png"));
    write_png(&dir.path().join("b.png"));
    let target = dir.path().join("readme.txt");
    fs::write(&target, b"not an image").unwrap();

    let result = scan(&target).unwrap();
    assert_eq!(result.paths.len(), 2);
    assert_eq!(result.selection, Some(0));
}

#[test]
fn directory_without_images_has_no_selection() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("readme.txt");
    fs::write(&target, b"x").unwrap();

    let result = scan(&target).unwrap();
    assert!(result.paths.is_empty());
    assert_eq!(result.selection, None);
}

#[test]
fn missing_or_directory_targets_are_path_errors() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        scan(&dir.path().join("gone.png")),
        Err(Error::Path(_))
    ));
    assert!(matches!(scan(dir.path()), Err(Error::Path(_))));
}

#[test]
fn failed_rescan_keeps_collection_and_selection() {
    let dir = tempdir().unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        write_png(&dir.path().join(name));
    }
    let cache = ImageCache::new(HeadlessTextures::default(), CacheOptions::default());
    cache.set_path(dir.path().join("b.png"));
    assert!(cache.rescan().unwrap());
    assert_eq!(cache.selected_index(), Some(1));
    let before = cache.entries();

    cache.set_path(dir.path().join("missing.png"));
    assert!(matches!(cache.rescan(), Err(Error::Path(_))));

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.selected_index(), Some(1));
    let after: Vec<_> = cache.entries().iter().map(|e| e.path().to_path_buf()).collect();
    let before: Vec<_> = before.iter().map(|e| e.path().to_path_buf()).collect();
    assert_eq!(after, before);
}
