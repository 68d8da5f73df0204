use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{ImageCache, WindowReport};
use crate::error::Error;
use crate::gpu::TextureBackend;

/// What one refresh tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub rescanned: bool,
    pub window: Option<WindowReport>,
}

/// Service both request flags once. Failures are logged and contained.
pub fn refresh_once<B: TextureBackend>(cache: &ImageCache<B>) -> RefreshReport {
    let mut report = RefreshReport::default();
    if cache.rescan_pending() {
        // rescan converges the window itself, so a queued reload is redundant
        cache.take_reload_request();
        match cache.rescan() {
            Ok(rescanned) => report.rescanned = rescanned,
            Err(Error::Path(path)) => {
                warn!(path = %path.display(), "rescan target is not a file");
            }
            Err(err) => error!(error = %err, "rescan failed"),
        }
    }
    if cache.take_reload_request() {
        match cache.reload_window() {
            Ok(window) => report.window = Some(window),
            Err(err) => error!(error = %err, "window reload failed"),
        }
    }
    report
}

/// Poll the cache's request flags every `poll_interval` until cancelled.
#[instrument(skip(cache, cancel))]
pub async fn run<B>(
    cache: Arc<ImageCache<B>>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<()>
where
    B: TextureBackend + 'static,
{
    info!("refresh worker started");
    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting refresh worker");
                break;
            }
            _ = sleep(poll_interval) => {
                let cache = Arc::clone(&cache);
                let report = tokio::task::spawn_blocking(move || refresh_once(&cache))
                    .await
                    .context("refresh tick panicked")?;
                if report != RefreshReport::default() {
                    debug!(?report, "refresh tick");
                }
            }
        }
    }
    Ok(())
}

/// Handle to a spawned [`run`] task.
pub struct RefreshWorker {
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl RefreshWorker {
    pub fn spawn<B>(cache: Arc<ImageCache<B>>, poll_interval: Duration) -> Self
    where
        B: TextureBackend + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(cache, poll_interval, cancel.clone()));
        Self { cancel, handle }
    }

    /// Cancel the worker and wait for its in-flight tick to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.handle.await.context("refresh worker panicked")?
    }
}
