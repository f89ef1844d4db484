//! PDF rasterisation: pdfium-backed paging and painting.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a dedicated
//! thread pool thread designed for blocking operations, preventing the
//! Tokio worker threads from stalling during CPU-heavy painting.
//!
//! ## Why open the document per paint?
//!
//! A `PdfDocument` handle borrows its `Pdfium` binding and is not `Send`,
//! so it cannot live inside an `Arc<dyn PageSource>` shared across tasks.
//! Each paint opens the file fresh inside its blocking call; page sizes and
//! the page count are captured once at open time so the cheap queries never
//! touch pdfium again.

use crate::error::{ConteurError, PreviewError};
use crate::pipeline::input::{resolve_input, ResolvedInput};
use crate::preview::paging::{DocumentLoader, PageSize, PageSource, PaintedSurface};
use crate::preview::token::RenderToken;
use futures::future::BoxFuture;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Page-level facts about an opened document.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Native page sizes in points, indexed by page.
    pub page_sizes: Vec<PageSize>,
}

/// Bind to a pdfium build.
///
/// Search order: an explicit `PDFIUM_LIB_PATH`, the platform library next
/// to the working directory, the system library. A failed bind is a typed
/// error, not a panic, so it reaches callers with the override hint intact.
fn bind_pdfium() -> Result<Pdfium, ConteurError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    };
    bindings
        .map(Pdfium::new)
        .map_err(|e| ConteurError::PdfiumBindingFailed(e.to_string()))
}

/// Open `path` and read page count + native page sizes.
pub async fn inspect_document(pdf_path: &Path) -> Result<DocumentInfo, ConteurError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || inspect_blocking(&path))
        .await
        .map_err(|e| ConteurError::Internal(format!("inspect task panicked: {}", e)))?
}

fn inspect_blocking(pdf_path: &Path) -> Result<DocumentInfo, ConteurError> {
    let pdfium = bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| ConteurError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let mut page_sizes = Vec::with_capacity(pages.len() as usize);
    for page in pages.iter() {
        page_sizes.push(PageSize {
            width_pts: page.width().value,
            height_pts: page.height().value,
        });
    }

    info!("document opened: {} pages", page_sizes.len());
    Ok(DocumentInfo {
        page_count: page_sizes.len(),
        page_sizes,
    })
}

/// A pdfium-backed [`PageSource`].
///
/// Holds the resolved input alive (a downloaded template lives in a
/// `TempDir` that must not be cleaned up while paints can still happen).
pub struct PdfiumSource {
    path: PathBuf,
    info: DocumentInfo,
    _resolved: Option<ResolvedInput>,
}

impl PdfiumSource {
    /// Open a local file directly.
    pub async fn open(pdf_path: impl AsRef<Path>) -> Result<Self, ConteurError> {
        let path = pdf_path.as_ref().to_path_buf();
        let info = inspect_document(&path).await?;
        Ok(Self {
            path,
            info,
            _resolved: None,
        })
    }

    /// Resolve a path-or-URL input, then open it.
    pub async fn resolve(input: &str, timeout_secs: u64) -> Result<Self, ConteurError> {
        let resolved = resolve_input(input, timeout_secs).await?;
        let path = resolved.path().to_path_buf();
        let info = inspect_document(&path).await?;
        Ok(Self {
            path,
            info,
            _resolved: Some(resolved),
        })
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }
}

impl PageSource for PdfiumSource {
    fn page_count(&self) -> usize {
        self.info.page_count
    }

    fn page_size(&self, page: usize) -> Result<PageSize, PreviewError> {
        self.info
            .page_sizes
            .get(page)
            .copied()
            .ok_or_else(|| PreviewError::RenderFailed {
                page,
                detail: format!("page out of range (total {})", self.info.page_count),
            })
    }

    fn paint(
        &self,
        page: usize,
        scale: f32,
        token: &RenderToken,
    ) -> Result<PaintedSurface, PreviewError> {
        if token.is_cancelled() {
            return Err(PreviewError::Cancelled { page });
        }
        let native = self.page_size(page)?;
        let target_w = (native.width_pts * scale).round().max(1.0) as i32;
        let target_h = (native.height_pts * scale).round().max(1.0) as i32;

        let pdfium = bind_pdfium().map_err(|e| PreviewError::RenderFailed {
            page,
            detail: e.to_string(),
        })?;
        let document = pdfium
            .load_pdf_from_file(&self.path, None)
            .map_err(|e| PreviewError::RenderFailed {
                page,
                detail: format!("{:?}", e),
            })?;

        let pdf_page =
            document
                .pages()
                .get(page as u16)
                .map_err(|e| PreviewError::RenderFailed {
                    page,
                    detail: format!("{:?}", e),
                })?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_w)
            .set_maximum_height(target_h);

        let bitmap =
            pdf_page
                .render_with_config(&render_config)
                .map_err(|e| PreviewError::RenderFailed {
                    page,
                    detail: format!("{:?}", e),
                })?;

        // The paint itself is done; a stale result must still not apply.
        if token.is_cancelled() {
            return Err(PreviewError::Cancelled { page });
        }

        let image = bitmap.as_image();
        debug!(
            "painted page {} at scale {:.2} → {}x{} px",
            page,
            scale,
            image.width(),
            image.height()
        );

        Ok(PaintedSurface {
            page,
            width_px: image.width(),
            height_px: image.height(),
            image,
        })
    }
}

/// [`DocumentLoader`] for the preview controller: resolves a path or URL
/// and opens it with pdfium. Re-runnable, which is what makes the
/// controller's retry work.
pub struct PdfLoader {
    input: String,
    timeout_secs: u64,
}

impl PdfLoader {
    pub fn new(input: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            input: input.into(),
            timeout_secs,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn PageSource>, PreviewError>> {
        Box::pin(async move {
            let source = PdfiumSource::resolve(&self.input, self.timeout_secs)
                .await
                .map_err(|e| PreviewError::LoadFailed {
                    detail: e.to_string(),
                })?;
            Ok(Arc::new(source) as Arc<dyn PageSource>)
        })
    }
}
