//! Windowed image cache.
//!
//! Keeps the entries within `radius` of the selection resident as textures
//! and everything else unloaded. Three independently guarded regions make up
//! the shared state:
//!
//! 1. the collection and its selection,
//! 2. the rescan request (flag plus pending target path),
//! 3. the window-reload flag.
//!
//! Render-side reads use `try_lock` and report "no image" instead of
//! waiting; worker-side mutations block, each held for at most one scan or
//! one convergence pass.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use image::imageops::{self, FilterType};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::error::{Error, Result};
use crate::gpu::{GpuContext, TextureBackend, TextureHandle};
use crate::processing::layout::fit_within;
use crate::processing::orientation::{Corner, Orientation};
use crate::scan;

/// Residency of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unloaded,
    Loaded {
        texture: TextureHandle,
        /// Decoded source width, before any preview downscale.
        width: u32,
        /// Decoded source height, before any preview downscale.
        height: u32,
    },
}

/// Colour modifiers shared by the live preview and export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    contrast: f32,
    saturation: f32,
    hue: f32,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            saturation: 1.0,
            hue: 0.0,
        }
    }
}

impl Modifiers {
    pub const CONTRAST_RANGE: (f32, f32) = (0.0, 2.0);
    pub const SATURATION_RANGE: (f32, f32) = (0.0, 4.0);

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    /// Hue rotation in degrees, always in `0..360`.
    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn set_contrast(&mut self, value: f32) {
        let (lo, hi) = Self::CONTRAST_RANGE;
        self.contrast = sanitize(value, 1.0).clamp(lo, hi);
    }

    pub fn set_saturation(&mut self, value: f32) {
        let (lo, hi) = Self::SATURATION_RANGE;
        self.saturation = sanitize(value, 1.0).clamp(lo, hi);
    }

    pub fn set_hue(&mut self, degrees: f32) {
        self.hue = sanitize(degrees, 0.0).rem_euclid(360.0);
        // rem_euclid can round up to the modulus for tiny negatives
        if self.hue >= 360.0 {
            self.hue = 0.0;
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// One image of the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    path: PathBuf,
    state: EntryState,
    pub orientation: Orientation,
    pub modifiers: Modifiers,
}

impl ImageEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: EntryState::Unloaded,
            orientation: Orientation::default(),
            modifiers: Modifiers::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, EntryState::Loaded { .. })
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        match self.state {
            EntryState::Loaded { texture, .. } => Some(texture),
            EntryState::Unloaded => None,
        }
    }

    /// Decoded size, if resident.
    pub fn source_size(&self) -> Option<(u32, u32)> {
        match self.state {
            EntryState::Loaded { width, height, .. } => Some((width, height)),
            EntryState::Unloaded => None,
        }
    }

    /// On-screen size after rotation, if resident.
    pub fn display_size(&self) -> Option<(u32, u32)> {
        self.source_size()
            .map(|(w, h)| self.orientation.oriented_size(w, h))
    }

    /// Texture coordinates for the visual TL, TR, BR, BL corners.
    pub fn corners(&self) -> [Corner; 4] {
        self.orientation.corners()
    }
}

/// Tuning for [`ImageCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Entries kept resident on each side of the selection.
    pub radius: usize,
    /// Longest side of uploaded previews; `None` uploads full resolution.
    pub preview_max_dimension: Option<u32>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            radius: 3,
            preview_max_dimension: None,
        }
    }
}

/// Summary of one convergence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowReport {
    pub loaded: usize,
    pub evicted: usize,
    pub failed: usize,
}

/// Non-blocking view of the collection for overview strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overview {
    pub len: usize,
    pub selection: Option<usize>,
}

#[derive(Debug, Default)]
struct Collection {
    entries: Vec<ImageEntry>,
    selection: Option<usize>,
}

#[derive(Debug, Default)]
struct RescanRequest {
    requested: bool,
    target: Option<PathBuf>,
    previous_selection: Option<usize>,
}

pub struct ImageCache<B: TextureBackend> {
    collection: Mutex<Collection>,
    rescan: Mutex<RescanRequest>,
    reload_requested: AtomicBool,
    gpu: GpuContext<B>,
    options: CacheOptions,
}

impl<B: TextureBackend> ImageCache<B> {
    pub fn new(backend: B, options: CacheOptions) -> Self {
        Self {
            collection: Mutex::new(Collection::default()),
            rescan: Mutex::new(RescanRequest::default()),
            reload_requested: AtomicBool::new(false),
            gpu: GpuContext::new(backend),
            options,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// The context lock shared with the render loop.
    pub fn gpu(&self) -> &GpuContext<B> {
        &self.gpu
    }

    fn lock_collection(&self) -> MutexGuard<'_, Collection> {
        self.collection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock_collection(&self) -> Option<MutexGuard<'_, Collection>> {
        match self.collection.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn lock_rescan(&self) -> MutexGuard<'_, RescanRequest> {
        self.rescan.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch to the directory of `path`. Evicts every resident texture and
    /// leaves the selection unresolved until the next rescan.
    pub fn set_path(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return;
        }
        let previous_selection = {
            let mut collection = self.lock_collection();
            let evicted = self.evict_all(&mut collection.entries);
            debug!(evicted, "set_path evicted resident entries");
            collection.selection.take()
        };
        let mut request = self.lock_rescan();
        request.requested = true;
        request.target = Some(path.to_path_buf());
        // a burst of set_path calls keeps the last resolved selection
        if previous_selection.is_some() {
            request.previous_selection = previous_selection;
        }
        info!(path = %path.display(), "rescan requested");
    }

    /// Move the selection by `delta`, clamped to the collection bounds.
    /// Returns the new selection; no-op while the selection is unresolved.
    pub fn change_selected_index(&self, delta: isize) -> Option<usize> {
        let selection = {
            let mut collection = self.lock_collection();
            let len = collection.entries.len();
            let current = collection.selection?;
            if len == 0 {
                return None;
            }
            let next = current.saturating_add_signed(delta).min(len - 1);
            collection.selection = Some(next);
            next
        };
        self.reload_requested.store(true, Ordering::Release);
        Some(selection)
    }

    pub fn next(&self) -> Option<usize> {
        self.change_selected_index(1)
    }

    pub fn prev(&self) -> Option<usize> {
        self.change_selected_index(-1)
    }

    pub fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::Release);
    }

    /// Consume the reload flag. Several requests since the last call
    /// collapse into one.
    pub fn take_reload_request(&self) -> bool {
        self.reload_requested.swap(false, Ordering::AcqRel)
    }

    pub fn rescan_pending(&self) -> bool {
        self.lock_rescan().requested
    }

    /// Run a pending rescan, if any. Returns `Ok(false)` when nothing was
    /// requested.
    ///
    /// # Errors
    /// [`Error::Path`] when the target vanished; the previous collection is
    /// kept and its selection restored. Allocation failures from the
    /// follow-up window pass are returned as well.
    pub fn rescan(&self) -> Result<bool> {
        let (target, previous_selection) = {
            let mut request = self.lock_rescan();
            if !request.requested {
                return Ok(false);
            }
            request.requested = false;
            let previous = request.previous_selection.take();
            match request.target.clone() {
                Some(target) => (target, previous),
                None => return Ok(false),
            }
        };

        let found = match scan::scan(&target) {
            Ok(found) => found,
            Err(err) => {
                let mut collection = self.lock_collection();
                let len = collection.entries.len();
                if collection.selection.is_none() {
                    collection.selection = previous_selection.filter(|&i| i < len);
                }
                drop(collection);
                self.request_reload();
                warn!(path = %target.display(), error = %err, "rescan failed; keeping collection");
                return Err(err);
            }
        };

        {
            let mut collection = self.lock_collection();
            self.evict_all(&mut collection.entries);
            collection.entries = found.paths.into_iter().map(ImageEntry::new).collect();
            collection.selection = found.selection;
            info!(
                path = %target.display(),
                count = collection.entries.len(),
                selection = ?collection.selection,
                "collection rebuilt"
            );
        }
        self.reload_window()?;
        Ok(true)
    }

    /// Converge residency onto the window around the selection.
    ///
    /// Entries outside the window are released first, so an exhausted
    /// backend gets their room back before any load. Loads then sweep
    /// outward from the selection. Only entries whose state actually
    /// changes touch the GPU.
    ///
    /// # Errors
    /// [`Error::ResourceExhausted`] if an allocation failed even after
    /// eviction. The remaining loads of the pass are skipped.
    pub fn reload_window(&self) -> Result<WindowReport> {
        let mut collection = self.lock_collection();
        let Some(selection) = collection.selection else {
            return Ok(WindowReport::default());
        };
        let len = collection.entries.len();
        let radius = self.options.radius;
        let window = selection.saturating_sub(radius)..=selection.saturating_add(radius);
        let mut report = WindowReport::default();

        for (index, entry) in collection.entries.iter_mut().enumerate() {
            if !window.contains(&index) && self.unload(entry) {
                report.evicted += 1;
            }
        }

        let mut exhausted = None;
        'sweep: for distance in 0..=radius.min(len) {
            let below = selection.checked_sub(distance);
            let above = Some(selection + distance).filter(|&i| distance > 0 && i < len);
            for index in [below, above].into_iter().flatten() {
                match self.load(&mut collection.entries[index]) {
                    Ok(true) => report.loaded += 1,
                    Ok(false) => {
                        if !collection.entries[index].is_loaded() {
                            report.failed += 1;
                        }
                    }
                    Err(err) => {
                        error!(index, error = %err, "texture allocation failed");
                        exhausted = Some(err);
                        break 'sweep;
                    }
                }
            }
        }

        debug!(
            selection,
            loaded = report.loaded,
            evicted = report.evicted,
            failed = report.failed,
            "window converged"
        );
        match exhausted {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Make `entry` resident. Returns `Ok(true)` if it was loaded by this
    /// call and `Ok(false)` if it already was, or if decoding failed (the
    /// entry stays unloaded and is retried the next time the window covers
    /// it).
    ///
    /// # Errors
    /// [`Error::ResourceExhausted`] from the texture backend.
    pub fn load(&self, entry: &mut ImageEntry) -> Result<bool> {
        if entry.is_loaded() {
            return Ok(false);
        }
        let pixels = match codec::decode_rgb(&entry.path) {
            Ok(pixels) => pixels,
            Err(err) => {
                warn!(path = %entry.path.display(), error = %err, "decode failed; leaving unloaded");
                return Ok(false);
            }
        };
        let (width, height) = pixels.dimensions();
        let preview = match self.options.preview_max_dimension {
            Some(max_dim) if width.max(height) > max_dim => {
                let (pw, ph) = fit_within(width, height, max_dim);
                imageops::resize(&pixels, pw, ph, FilterType::Triangle)
            }
            _ => pixels,
        };
        let texture = self.gpu.with(|backend| backend.allocate(&preview))?;
        entry.state = EntryState::Loaded {
            texture,
            width,
            height,
        };
        debug!(path = %entry.path.display(), width, height, "entry loaded");
        Ok(true)
    }

    /// Release `entry`'s texture. Returns `false` if it was not resident.
    /// Orientation and modifiers are kept.
    pub fn unload(&self, entry: &mut ImageEntry) -> bool {
        let EntryState::Loaded { texture, .. } = entry.state else {
            return false;
        };
        self.gpu.with(|backend| backend.release(texture));
        entry.state = EntryState::Unloaded;
        debug!(path = %entry.path.display(), "entry unloaded");
        true
    }

    fn evict_all(&self, entries: &mut [ImageEntry]) -> usize {
        entries
            .iter_mut()
            .map(|entry| self.unload(entry))
            .filter(|evicted| *evicted)
            .count()
    }

    /// Unload everything and forget the collection.
    pub fn clear(&self) {
        let mut collection = self.lock_collection();
        let evicted = self.evict_all(&mut collection.entries);
        collection.entries.clear();
        collection.selection = None;
        if evicted > 0 {
            debug!(evicted, "cache cleared");
        }
    }

    /// Snapshot of the selected entry, or `None` when nothing is selected or
    /// the collection is busy.
    pub fn current(&self) -> Option<ImageEntry> {
        let collection = self.try_lock_collection()?;
        let index = collection.selection?;
        collection.entries.get(index).cloned()
    }

    /// Snapshot of entry `index`, or `None` when out of range or busy.
    pub fn entry_at(&self, index: usize) -> Option<ImageEntry> {
        self.try_lock_collection()?.entries.get(index).cloned()
    }

    /// Collection length and selection, or `None` when busy.
    pub fn overview(&self) -> Option<Overview> {
        let collection = self.try_lock_collection()?;
        Some(Overview {
            len: collection.entries.len(),
            selection: collection.selection,
        })
    }

    pub fn len(&self) -> usize {
        self.lock_collection().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.lock_collection().selection
    }

    /// Snapshot of the selected entry, waiting for the collection lock.
    pub fn selected(&self) -> Option<ImageEntry> {
        let collection = self.lock_collection();
        collection
            .selection
            .and_then(|index| collection.entries.get(index).cloned())
    }

    /// Snapshot of every entry, in collection order.
    pub fn entries(&self) -> Vec<ImageEntry> {
        self.lock_collection().entries.clone()
    }

    /// Indices of the resident entries.
    pub fn resident_indices(&self) -> Vec<usize> {
        self.lock_collection()
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_loaded())
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply `edit` to the selected entry. Returns `false` if there is none.
    pub fn update_current(&self, edit: impl FnOnce(&mut ImageEntry)) -> bool {
        let mut collection = self.lock_collection();
        let Some(index) = collection.selection else {
            return false;
        };
        match collection.entries.get_mut(index) {
            Some(entry) => {
                edit(entry);
                true
            }
            None => false,
        }
    }

    pub fn rotate_current(&self, step: i32) -> bool {
        self.update_current(|e| e.orientation.rotate(step))
    }

    pub fn flip_current_x(&self) -> bool {
        self.update_current(|e| e.orientation.toggle_flip_x())
    }

    pub fn flip_current_y(&self) -> bool {
        self.update_current(|e| e.orientation.toggle_flip_y())
    }

    pub fn set_contrast(&self, value: f32) -> bool {
        self.update_current(|e| e.modifiers.set_contrast(value))
    }

    pub fn set_saturation(&self, value: f32) -> bool {
        self.update_current(|e| e.modifiers.set_saturation(value))
    }

    pub fn set_hue(&self, degrees: f32) -> bool {
        self.update_current(|e| e.modifiers.set_hue(degrees))
    }
}

impl<B: TextureBackend> Drop for ImageCache<B> {
    fn drop(&mut self) {
        self.clear();
    }
}
