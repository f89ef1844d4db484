//! Streaming preview API: emit page previews as they complete.
//!
//! The eager [`crate::generate::generate`] waits for every page before
//! returning. A stream lets callers show the first spread while the rest of
//! the book is still painting, which is what the customization form does
//! while a parent types. Pages are emitted in completion order (not
//! necessarily page order); sort by `page` if order matters.

use crate::config::GenerateConfig;
use crate::error::{ConteurError, PreviewError};
use crate::generate::{paint_one_page, PagePreview};
use crate::pipeline::render::PdfiumSource;
use crate::preview::paging::PageSource;
use crate::preview::token::RenderGate;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page previews.
pub type PreviewStream = Pin<Box<dyn Stream<Item = Result<PagePreview, PreviewError>> + Send>>;

/// Paint a template's pages, streaming each preview as it is ready.
///
/// # Returns
/// - `Ok(PreviewStream)` — a stream of `Result<PagePreview, PreviewError>`
/// - `Err(ConteurError)` — fatal error (file not found, not a PDF, etc.)
pub async fn preview_stream(
    input: impl AsRef<str>,
    config: &GenerateConfig,
) -> Result<PreviewStream, ConteurError> {
    let input = input.as_ref();
    info!("starting streaming preview: {}", input);

    let source =
        Arc::new(PdfiumSource::resolve(input, config.download_timeout_secs).await?);
    Ok(stream_from_source(source as Arc<dyn PageSource>, config))
}

/// Stream previews from an already-open page source.
///
/// This is the injection point for tests and for callers that hold a
/// [`PageSource`] of their own.
pub fn stream_from_source(
    source: Arc<dyn PageSource>,
    config: &GenerateConfig,
) -> PreviewStream {
    let total_pages = source.page_count();
    let gate = Arc::new(RenderGate::new());
    let token = gate.issue();
    let max_px = config.max_rendered_pixels as f32;
    let concurrency = config.concurrency;

    let s = stream::iter((0..total_pages).map(move |page| {
        let source = Arc::clone(&source);
        let token = token.clone();
        async move {
            let uri = paint_one_page(source, page, max_px, token).await?;
            Ok(PagePreview {
                page,
                preview_uri: Some(uri),
                error: None,
            })
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::paging::{PageSize, PaintedSurface};
    use crate::preview::token::RenderToken;

    struct TinySource {
        pages: usize,
    }

    impl PageSource for TinySource {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn page_size(&self, _page: usize) -> Result<PageSize, PreviewError> {
            Ok(PageSize {
                width_pts: 10.0,
                height_pts: 10.0,
            })
        }

        fn paint(
            &self,
            page: usize,
            _scale: f32,
            _token: &RenderToken,
        ) -> Result<PaintedSurface, PreviewError> {
            if page == 1 {
                return Err(PreviewError::RenderFailed {
                    page,
                    detail: "bad page".into(),
                });
            }
            Ok(PaintedSurface {
                page,
                width_px: 4,
                height_px: 4,
                image: image::DynamicImage::new_rgba8(4, 4),
            })
        }
    }

    #[tokio::test]
    async fn stream_emits_every_page_once() {
        let config = GenerateConfig::builder().concurrency(2).build().unwrap();
        let source = Arc::new(TinySource { pages: 3 }) as Arc<dyn PageSource>;
        let results: Vec<_> = stream_from_source(source, &config).collect().await;

        assert_eq!(results.len(), 3);
        let ok: Vec<usize> = results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|p| p.page))
            .collect();
        let err: Vec<&PreviewError> =
            results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(ok.len(), 2);
        assert_eq!(err.len(), 1);
        assert!(matches!(err[0], PreviewError::RenderFailed { page: 1, .. }));
    }

    #[tokio::test]
    async fn empty_document_yields_empty_stream() {
        let config = GenerateConfig::default();
        let source = Arc::new(TinySource { pages: 0 }) as Arc<dyn PageSource>;
        let results: Vec<_> = stream_from_source(source, &config).collect().await;
        assert!(results.is_empty());
    }
}
