use image::{ImageFormat, Rgb, RgbImage};
use rust_image_viewer::cache::{CacheOptions, ImageCache};
use rust_image_viewer::gpu::HeadlessTextures;
use rust_image_viewer::tasks::refresh::{self, RefreshWorker, refresh_once};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fixture(count: usize) -> (tempfile::TempDir, Vec<std::path::PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = (0..count)
        .map(|i| {
            let path = dir.path().join(format!("{i}.png"));
            RgbImage::from_pixel(2, 2, Rgb([i as u8, 0, 0]))
                .save_with_format(&path, ImageFormat::Png)
                .unwrap();
            path
        })
        .collect();
    (dir, paths)
}

fn new_cache(radius: usize) -> Arc<ImageCache<HeadlessTextures>> {
    Arc::new(ImageCache::new(
        HeadlessTextures::default(),
        CacheOptions {
            radius,
            preview_max_dimension: None,
        },
    ))
}

async fn wait_for(what: &str, mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timeout waiting for {what}"));
}

#[test]
fn refresh_once_services_both_flags() {
    let (_dir, paths) = fixture(4);
    let cache = new_cache(1);

    assert_eq!(refresh_once(&*cache), Default::default());

    cache.set_path(&paths[0]);
    let report = refresh_once(&*cache);
    assert!(report.rescanned);
    assert_eq!(cache.resident_indices(), vec![0, 1]);

    cache.next();
    let report = refresh_once(&*cache);
    assert!(!report.rescanned);
    let window = report.window.unwrap();
    assert_eq!((window.loaded, window.evicted), (1, 0));
    assert_eq!(cache.resident_indices(), vec![0, 1, 2]);
}

#[test]
fn refresh_once_contains_scan_failures() {
    let (dir, paths) = fixture(2);
    let cache = new_cache(0);
    cache.set_path(&paths[1]);
    refresh_once(&*cache);

    cache.set_path(dir.path().join("missing.png"));
    let report = refresh_once(&*cache);
    assert!(!report.rescanned);
    // previous selection is restored and its window reloaded
    assert_eq!(cache.selected_index(), Some(1));
    assert_eq!(cache.resident_indices(), vec![1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_follows_path_and_selection_changes() {
    let (_dir, paths) = fixture(6);
    let cache = new_cache(1);
    let worker = RefreshWorker::spawn(Arc::clone(&cache), Duration::from_millis(10));

    cache.set_path(&paths[3]);
    wait_for("initial window", || cache.resident_indices() == vec![2, 3, 4]).await;

    cache.next();
    cache.next();
    wait_for("shifted window", || cache.resident_indices() == vec![4, 5]).await;

    cache.change_selected_index(-5);
    wait_for("leading window", || cache.resident_indices() == vec![0, 1]).await;

    worker.shutdown().await.unwrap();
    cache.clear();
    assert_eq!(cache.gpu().with(|b| b.live_count()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_exits_on_cancel() {
    let cache = new_cache(1);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(refresh::run(
        Arc::clone(&cache),
        Duration::from_millis(5),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();
    let res = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker did not stop")
        .expect("worker panicked");
    assert!(res.is_ok());
}
