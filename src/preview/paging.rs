//! The document paging seam: page-addressable handles and painting.
//!
//! The preview controller never touches pdfium directly; it works against
//! [`PageSource`] so tests can drive the state machine with in-memory fakes
//! and the rendering backend can change without touching navigation, zoom,
//! or cancellation logic. The pdfium implementation is
//! [`crate::pipeline::render::PdfiumSource`].

use crate::error::PreviewError;
use crate::preview::token::RenderToken;
use futures::future::BoxFuture;
use image::DynamicImage;
use std::sync::Arc;

/// Native page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pts: f32,
    pub height_pts: f32,
}

/// One painted page surface.
#[derive(Debug, Clone)]
pub struct PaintedSurface {
    /// 0-based page index this surface shows.
    pub page: usize,
    pub width_px: u32,
    pub height_px: u32,
    pub image: DynamicImage,
}

/// A page-addressable document handle.
///
/// `paint` is synchronous and CPU-bound; the controller runs it inside
/// `tokio::task::spawn_blocking`. Long paints should poll
/// [`RenderToken::is_cancelled`] between bands and bail early — the
/// controller re-checks the token before applying results either way, so a
/// paint that ignores the token is correct, just wasteful.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Native size of `page`, for zoom and fit-to-width computations.
    fn page_size(&self, page: usize) -> Result<PageSize, PreviewError>;

    /// Paint `page` at `scale` (1.0 = one pixel per point).
    fn paint(
        &self,
        page: usize,
        scale: f32,
        token: &RenderToken,
    ) -> Result<PaintedSurface, PreviewError>;
}

/// Produces a [`PageSource`] from wherever the document lives.
///
/// Kept as a trait (rather than a one-shot future) so the controller can
/// re-run it for the user-invoked retry after a load failure.
pub trait DocumentLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn PageSource>, PreviewError>>;
}
