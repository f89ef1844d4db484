//! The preview state machine: `idle → loading → ready → rendering → ready`.
//!
//! ## Ordering guarantee
//!
//! A page-or-zoom change that arrives while a render is in flight cancels
//! the in-flight render before the new one starts, so the visible surface
//! always reflects the most recent request. The discipline is the
//! generation-counter token from [`crate::preview::token`]: every request
//! invalidates all older tokens, and a render re-checks its token after
//! painting, before applying anything. A stale render neither applies its
//! paint nor reports dimensions.
//!
//! ## Failure semantics
//!
//! Load failure moves the machine to `Error` with a user-invokable
//! [`PreviewController::retry`]. A failed paint (non-cancellation) records
//! an inline error for that page only and returns to `Ready`; navigating
//! away and back re-attempts the render.

use crate::config::{GenerateConfig, ZoomMode};
use crate::error::PreviewError;
use crate::preview::paging::{DocumentLoader, PageSource, PaintedSurface};
use crate::preview::token::RenderGate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Observer for render outcomes.
///
/// All methods default to no-ops, in the style of
/// [`crate::progress::GenerationObserver`]. Callbacks are invoked with no
/// controller lock held, so implementations may call back into the
/// controller.
pub trait PreviewObserver: Send + Sync {
    /// Dimensions of a successfully rendered surface. Debounced: rapid
    /// successive renders within the configured window coalesce into the
    /// latest value.
    fn on_dimensions(&self, width_px: u32, height_px: u32) {
        let _ = (width_px, height_px);
    }

    /// The zoom computed by fit-to-width mode. Only fired when the value
    /// moved more than the configured epsilon since the last report.
    fn on_fit_zoom(&self, percent: f32) {
        let _ = percent;
    }

    /// A page paint failed (non-cancellation).
    fn on_page_error(&self, page: usize, detail: &str) {
        let _ = (page, detail);
    }
}

/// No-op observer for callers that only poll accessors.
pub struct NullObserver;

impl PreviewObserver for NullObserver {}

/// Lifecycle of the preview document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    /// No document requested yet.
    Idle,
    /// Fetching and parsing the document.
    Loading,
    /// Document open; page count known; no paint in flight.
    Ready,
    /// A paint for the current (page, zoom) is in flight.
    Rendering,
    /// The document failed to load. Recoverable via retry.
    Error { detail: String },
}

/// The most recently applied paint.
#[derive(Debug, Clone)]
pub struct RenderedSurface {
    pub page: usize,
    /// Effective zoom of this surface, percent.
    pub zoom_percent: f32,
    pub width_px: u32,
    pub height_px: u32,
    pub image: image::DynamicImage,
}

struct Inner {
    state: PreviewState,
    source: Option<Arc<dyn PageSource>>,
    page: usize,
    page_count: usize,
    zoom: ZoomMode,
    /// Persisted fixed zoom percent; survives navigation and fit-width mode.
    zoom_percent: u32,
    /// Last fit-width zoom reported to the observer.
    reported_fit_zoom: Option<f32>,
    /// Inline per-page paint errors; cleared by a later successful paint.
    page_errors: HashMap<usize, String>,
    surface: Option<RenderedSurface>,
    // Dimension debounce state.
    last_dims_emit: Option<Instant>,
    pending_dims: Option<(u32, u32)>,
    dims_seq: u64,
}

/// Drives one document's preview: load/retry, clamped navigation, zoom, and
/// cancellable rendering.
///
/// All state transitions happen on one logical thread of control; the only
/// suspension points are the document load and the per-page paint.
pub struct PreviewController {
    inner: Arc<Mutex<Inner>>,
    gate: Arc<RenderGate>,
    loader: Arc<dyn DocumentLoader>,
    observer: Arc<dyn PreviewObserver>,
    config: GenerateConfig,
}

impl PreviewController {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        observer: Arc<dyn PreviewObserver>,
        config: GenerateConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: PreviewState::Idle,
                source: None,
                page: 0,
                page_count: 0,
                zoom: ZoomMode::default(),
                zoom_percent: 100,
                reported_fit_zoom: None,
                page_errors: HashMap::new(),
                surface: None,
                last_dims_emit: None,
                pending_dims: None,
                dims_seq: 0,
            })),
            gate: Arc::new(RenderGate::new()),
            loader,
            observer,
            config,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> PreviewState {
        self.inner.lock().unwrap().state.clone()
    }

    /// Current 0-based page index.
    pub fn page(&self) -> usize {
        self.inner.lock().unwrap().page
    }

    pub fn page_count(&self) -> usize {
        self.inner.lock().unwrap().page_count
    }

    /// Persisted fixed zoom, percent.
    pub fn zoom_percent(&self) -> u32 {
        self.inner.lock().unwrap().zoom_percent
    }

    pub fn zoom_mode(&self) -> ZoomMode {
        self.inner.lock().unwrap().zoom
    }

    /// The most recently applied surface, if any.
    pub fn surface(&self) -> Option<RenderedSurface> {
        self.inner.lock().unwrap().surface.clone()
    }

    /// Inline error recorded for `page`, if its last paint failed.
    pub fn page_error(&self, page: usize) -> Option<String> {
        self.inner.lock().unwrap().page_errors.get(&page).cloned()
    }

    pub fn can_go_next(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.page_count > 0 && inner.page + 1 < inner.page_count
    }

    pub fn can_go_prev(&self) -> bool {
        self.inner.lock().unwrap().page > 0
    }

    pub fn can_zoom_in(&self) -> bool {
        self.inner.lock().unwrap().zoom_percent < self.config.zoom_max
    }

    pub fn can_zoom_out(&self) -> bool {
        self.inner.lock().unwrap().zoom_percent > self.config.zoom_min
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Fetch and parse the document, then paint the current page.
    ///
    /// On success the machine is `Ready` with the page count known. On
    /// failure it is `Error` and the load can be re-run via [`retry`].
    ///
    /// [`retry`]: PreviewController::retry
    pub async fn load(&self) -> Result<usize, PreviewError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = PreviewState::Loading;
            inner.source = None;
            inner.surface = None;
            inner.page_errors.clear();
        }
        // A new document invalidates any paint from the old one.
        self.gate.cancel_all();

        match self.loader.load().await {
            Ok(source) => {
                let page_count = source.page_count();
                {
                    let mut inner = self.inner.lock().unwrap();
                    inner.page_count = page_count;
                    inner.page = inner.page.min(page_count.saturating_sub(1));
                    inner.source = Some(source);
                    inner.state = PreviewState::Ready;
                }
                debug!(page_count, "document loaded");
                // Initial paint; a failure here is inline, not fatal.
                let _ = self.render().await;
                Ok(page_count)
            }
            Err(e) => {
                warn!("document load failed: {e}");
                let mut inner = self.inner.lock().unwrap();
                inner.state = PreviewState::Error {
                    detail: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Re-run a failed load. No-op unless the machine is in `Error`.
    pub async fn retry(&self) -> Result<usize, PreviewError> {
        let failed = matches!(self.state(), PreviewState::Error { .. });
        if !failed {
            return Ok(self.page_count());
        }
        self.load().await
    }

    // ── Navigation and zoom requests ─────────────────────────────────────
    //
    // Requests are synchronous state changes: they clamp, cancel any
    // in-flight render, and leave the paint to `render()`. The async
    // convenience wrappers below pair a request with a render.

    /// Request `page`; out-of-bounds requests are no-ops. Returns whether
    /// the request changed state.
    pub fn request_page(&self, page: usize) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.source.is_none() || page >= inner.page_count || page == inner.page {
            return false;
        }
        inner.page = page;
        drop(inner);
        self.gate.cancel_all();
        true
    }

    /// Request a fixed zoom, clamped to the configured bounds. Switches out
    /// of fit-to-width mode. Returns whether the request changed state.
    pub fn request_zoom(&self, percent: u32) -> bool {
        let clamped = percent.clamp(self.config.zoom_min, self.config.zoom_max);
        let mut inner = self.inner.lock().unwrap();
        let changed =
            inner.zoom_percent != clamped || !matches!(inner.zoom, ZoomMode::Fixed(_));
        inner.zoom_percent = clamped;
        inner.zoom = ZoomMode::Fixed(clamped);
        drop(inner);
        if changed {
            self.gate.cancel_all();
        }
        changed
    }

    /// Request fit-to-width mode for the given container width.
    pub fn request_fit_width(&self, container_width: f32) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let mode = ZoomMode::FitWidth { container_width };
        if inner.zoom == mode {
            return false;
        }
        inner.zoom = mode;
        drop(inner);
        self.gate.cancel_all();
        true
    }

    /// Request page + paint.
    pub async fn goto_page(&self, page: usize) -> Result<(), PreviewError> {
        if self.request_page(page) {
            self.render().await
        } else {
            Ok(())
        }
    }

    pub async fn next_page(&self) -> Result<(), PreviewError> {
        let target = self.page().saturating_add(1);
        self.goto_page(target).await
    }

    pub async fn prev_page(&self) -> Result<(), PreviewError> {
        let current = self.page();
        if current == 0 {
            return Ok(());
        }
        self.goto_page(current - 1).await
    }

    pub async fn zoom_in(&self) -> Result<(), PreviewError> {
        let target = self.zoom_percent().saturating_add(self.config.zoom_step);
        if self.request_zoom(target) {
            self.render().await
        } else {
            Ok(())
        }
    }

    pub async fn zoom_out(&self) -> Result<(), PreviewError> {
        let target = self
            .zoom_percent()
            .saturating_sub(self.config.zoom_step)
            .max(1);
        if self.request_zoom(target) {
            self.render().await
        } else {
            Ok(())
        }
    }

    pub async fn set_zoom(&self, percent: u32) -> Result<(), PreviewError> {
        if self.request_zoom(percent) {
            self.render().await
        } else {
            Ok(())
        }
    }

    pub async fn fit_width(&self, container_width: f32) -> Result<(), PreviewError> {
        if self.request_fit_width(container_width) {
            self.render().await
        } else {
            Ok(())
        }
    }

    // ── Rendering ────────────────────────────────────────────────────────

    /// Paint the current (page, zoom) into a fresh surface.
    ///
    /// Issues a new render token (cancelling any in-flight paint), runs the
    /// paint on the blocking pool, and applies the result only if the token
    /// is still the newest. Returns [`PreviewError::Cancelled`] for a
    /// superseded render — callers normally ignore that case.
    pub async fn render(&self) -> Result<(), PreviewError> {
        let token = self.gate.issue();

        // Snapshot the request under the lock.
        let (source, page, native, effective_zoom) = {
            let mut inner = self.inner.lock().unwrap();
            let source = match &inner.source {
                Some(s) => Arc::clone(s),
                // Nothing to paint yet; not an error.
                None => return Ok(()),
            };
            let page = inner.page;
            let native = match source.page_size(page) {
                Ok(size) => size,
                Err(e) => {
                    inner.page_errors.insert(page, e.to_string());
                    inner.state = PreviewState::Ready;
                    drop(inner);
                    self.observer.on_page_error(page, &e.to_string());
                    return Err(e);
                }
            };
            let effective_zoom = match inner.zoom {
                ZoomMode::Fixed(p) => p as f32,
                ZoomMode::FitWidth { container_width } => {
                    container_width / native.width_pts * 100.0
                }
            };
            inner.state = PreviewState::Rendering;
            (source, page, native, effective_zoom)
        };

        // Cap the longest edge regardless of requested zoom.
        let mut scale = effective_zoom / 100.0;
        let max_px = self.config.max_rendered_pixels as f32;
        let longest = native.width_pts.max(native.height_pts) * scale;
        if longest > max_px {
            scale *= max_px / longest;
        }

        let paint_token = token.clone();
        let painted = tokio::task::spawn_blocking(move || {
            source.paint(page, scale, &paint_token)
        })
        .await
        .map_err(|e| PreviewError::RenderFailed {
            page,
            detail: format!("paint task panicked: {e}"),
        })?;

        // A newer request owns the machine now; apply nothing.
        if token.is_cancelled() {
            debug!(page, "render superseded, dropping paint");
            return Err(PreviewError::Cancelled { page });
        }

        match painted {
            Ok(surface) => {
                self.apply_surface(surface, effective_zoom);
                Ok(())
            }
            Err(e) if e.is_cancellation() => Err(e),
            Err(e) => {
                {
                    let mut inner = self.inner.lock().unwrap();
                    inner.page_errors.insert(page, e.to_string());
                    inner.state = PreviewState::Ready;
                }
                warn!(page, "paint failed: {e}");
                self.observer.on_page_error(page, &e.to_string());
                Err(e)
            }
        }
    }

    fn apply_surface(&self, surface: PaintedSurface, effective_zoom: f32) {
        let (dims_emit, fit_emit) = {
            let mut inner = self.inner.lock().unwrap();
            inner.page_errors.remove(&surface.page);
            inner.surface = Some(RenderedSurface {
                page: surface.page,
                zoom_percent: effective_zoom,
                width_px: surface.width_px,
                height_px: surface.height_px,
                image: surface.image,
            });
            inner.state = PreviewState::Ready;

            // Fit-to-width reports only on movement beyond the epsilon, to
            // avoid a report → relayout → render feedback loop.
            let fit_emit = match inner.zoom {
                ZoomMode::FitWidth { .. } => {
                    let moved = inner
                        .reported_fit_zoom
                        .map(|prev| (prev - effective_zoom).abs() > self.config.fit_epsilon)
                        .unwrap_or(true);
                    if moved {
                        inner.reported_fit_zoom = Some(effective_zoom);
                        Some(effective_zoom)
                    } else {
                        None
                    }
                }
                ZoomMode::Fixed(_) => None,
            };

            let dims = (surface.width_px, surface.height_px);
            let window = Duration::from_millis(self.config.debounce_ms);
            let dims_emit = if window.is_zero() {
                Some(dims)
            } else {
                match inner.last_dims_emit {
                    Some(last) if last.elapsed() < window => {
                        // Coalesce: remember the latest value and let the
                        // flush task emit it once the window passes.
                        inner.pending_dims = Some(dims);
                        inner.dims_seq += 1;
                        self.spawn_dims_flush(inner.dims_seq, window - last.elapsed());
                        None
                    }
                    _ => Some(dims),
                }
            };
            if dims_emit.is_some() {
                inner.last_dims_emit = Some(Instant::now());
                inner.pending_dims = None;
            }
            (dims_emit, fit_emit)
        };

        if let Some((w, h)) = dims_emit {
            self.observer.on_dimensions(w, h);
        }
        if let Some(z) = fit_emit {
            self.observer.on_fit_zoom(z);
        }
    }

    /// Emit the pending dimensions after the remainder of the debounce
    /// window, unless a newer render queued fresher ones in the meantime.
    fn spawn_dims_flush(&self, seq: u64, delay: Duration) {
        let inner = Arc::clone(&self.inner);
        let observer = Arc::clone(&self.observer);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let dims = {
                let mut inner = inner.lock().unwrap();
                if inner.dims_seq != seq {
                    return;
                }
                let dims = inner.pending_dims.take();
                if dims.is_some() {
                    inner.last_dims_emit = Some(Instant::now());
                }
                dims
            };
            if let Some((w, h)) = dims {
                observer.on_dimensions(w, h);
            }
        });
    }
}
