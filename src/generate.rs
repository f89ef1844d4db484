//! Eager (full-story) generation entry point.
//!
//! Generation is the one-shot counterpart of the interactive preview: it
//! resolves every text element against the user's variables, paints every
//! page once, and snapshots the result into an immutable
//! [`crate::model::Histoire`]. Use [`crate::stream::preview_stream`] when
//! pages should arrive progressively instead.

use crate::config::GenerateConfig;
use crate::error::{ConteurError, PreviewError};
use crate::model::{GenerateRequest, Histoire, Template};
use crate::pipeline::{encode, render::PdfiumSource};
use crate::preview::paging::PageSource;
use crate::preview::token::RenderGate;
use crate::schema::FieldViolation;
use crate::vars::{resolve_elements, ResolvedElement, UserVariables};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One page's preview outcome.
#[derive(Debug, Clone)]
pub struct PagePreview {
    /// 0-based page index.
    pub page: usize,
    /// PNG data URI; `None` when this page failed.
    pub preview_uri: Option<String>,
    pub error: Option<PreviewError>,
}

/// Timing and success counters for one generation run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GenerationStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
}

/// Everything produced by one generation run.
#[derive(Debug, Clone)]
pub struct HistoireOutput {
    pub histoire: Histoire,
    /// Per-element substituted text, in element order.
    pub resolved_elements: Vec<ResolvedElement>,
    /// Per-page previews, sorted by page index.
    pub pages: Vec<PagePreview>,
    pub stats: GenerationStats,
}

/// Look up a template by id.
pub fn find_template<'a>(
    templates: &'a [Template],
    id: &str,
) -> Result<&'a Template, ConteurError> {
    templates
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| ConteurError::NotFound {
            kind: "template",
            id: id.to_string(),
        })
}

/// Generate a story from a template.
///
/// # Arguments
/// * `template` — the template record (its `pdf_path` may be a path or URL)
/// * `elements` — the template's editor elements
/// * `request`  — user id + user-supplied variable values
/// * `config`   — generation configuration
///
/// # Returns
/// `Ok(HistoireOutput)` on success, even if some page previews failed
/// (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(ConteurError)` only for fatal errors: an unpublished or
/// malformed template, a missing/corrupt PDF, or every page failing.
pub async fn generate(
    template: &Template,
    elements: &[crate::model::EditorElement],
    user_id: &str,
    request: &GenerateRequest,
    config: &GenerateConfig,
) -> Result<HistoireOutput, ConteurError> {
    let total_start = Instant::now();
    info!("starting generation: template '{}'", template.id);

    // ── Step 1: Validate ─────────────────────────────────────────────────
    validate_for_generation(template, elements)?;

    // ── Step 2: Resolve variables ────────────────────────────────────────
    let user_vars = UserVariables::new(request.variables.clone());
    let resolved_elements = resolve_elements(elements, &user_vars);
    debug!("resolved {} text elements", resolved_elements.len());

    // ── Step 3: Open the template document ───────────────────────────────
    let source = Arc::new(
        PdfiumSource::resolve(&template.pdf_path, config.download_timeout_secs).await?,
    );
    let total_pages = source.page_count();
    if total_pages != template.page_count {
        warn!(
            "template '{}' records {} pages but the PDF has {}",
            template.id, template.page_count, total_pages
        );
    }

    if let Some(ref obs) = config.observer {
        obs.on_generation_start(total_pages);
    }

    // ── Step 4: Paint and encode previews ────────────────────────────────
    let render_start = Instant::now();
    let mut pages = paint_all_pages(Arc::clone(&source) as Arc<dyn PageSource>, config).await;
    pages.sort_by_key(|p| p.page);
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 5: Check for total failure ──────────────────────────────────
    let processed = pages.iter().filter(|p| p.error.is_none()).count();
    let failed = pages.len() - processed;
    if processed == 0 && total_pages > 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ConteurError::AllPagesFailed {
            total: total_pages,
            first_error,
        });
    }

    if let Some(ref obs) = config.observer {
        obs.on_generation_complete(total_pages, processed);
    }

    // ── Step 6: Snapshot the histoire ────────────────────────────────────
    let histoire = Histoire {
        id: format!("hist-{}", uuid::Uuid::new_v4()),
        template_id: template.id.clone(),
        user_id: user_id.to_string(),
        variables: user_vars.into_inner(),
        // Content stamping happens downstream at fulfilment; the histoire
        // points at the template's document plus its own previews.
        pdf_url: template.pdf_path.clone(),
        page_previews: pages
            .iter()
            .filter_map(|p| p.preview_uri.clone())
            .collect(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let stats = GenerationStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
    };

    info!(
        "generation complete: {}/{} pages, {}ms total",
        processed, total_pages, stats.total_duration_ms
    );

    Ok(HistoireOutput {
        histoire,
        resolved_elements,
        pages,
        stats,
    })
}

/// Fatal pre-generation checks.
///
/// Field problems are collected into one [`ConteurError::Validation`] so
/// callers see everything at once.
fn validate_for_generation(
    template: &Template,
    elements: &[crate::model::EditorElement],
) -> Result<(), ConteurError> {
    let mut violations = Vec::new();
    if !template.is_published {
        violations.push(FieldViolation {
            field: "is_published".into(),
            message: "template is not published".into(),
        });
    }
    if template.pdf_path.trim().is_empty() {
        violations.push(FieldViolation {
            field: "pdf_path".into(),
            message: "must not be empty".into(),
        });
    }
    if !violations.is_empty() {
        return Err(ConteurError::Validation { violations });
    }

    // Elements missing defaults still resolve (to the empty string); worth
    // a log line, not a rejection.
    for el in elements {
        let missing = el.check_defaults();
        if !missing.is_empty() {
            warn!(
                "element '{}' lists variables without defaults: {:?}",
                el.id, missing
            );
        }
    }
    Ok(())
}

/// Paint every page concurrently, encoding each into a data URI.
///
/// Page failures are captured per page; the stream itself never errors.
pub(crate) async fn paint_all_pages(
    source: Arc<dyn PageSource>,
    config: &GenerateConfig,
) -> Vec<PagePreview> {
    let total_pages = source.page_count();
    // One gate for the whole run; generation never supersedes itself.
    let gate = Arc::new(RenderGate::new());
    let token = gate.issue();
    let max_px = config.max_rendered_pixels as f32;

    stream::iter((0..total_pages).map(|page| {
        let source = Arc::clone(&source);
        let token = token.clone();
        let observer = config.observer.clone();
        async move {
            if let Some(ref obs) = observer {
                obs.on_page_start(page, total_pages);
            }
            let result = paint_one_page(source, page, max_px, token).await;
            let preview = match result {
                Ok(uri) => {
                    if let Some(ref obs) = observer {
                        obs.on_page_complete(page, total_pages, uri.len());
                    }
                    PagePreview {
                        page,
                        preview_uri: Some(uri),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("page {page} preview failed: {e}");
                    if let Some(ref obs) = observer {
                        obs.on_page_error(page, total_pages, &e.to_string());
                    }
                    PagePreview {
                        page,
                        preview_uri: None,
                        error: Some(e),
                    }
                }
            };
            preview
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

pub(crate) async fn paint_one_page(
    source: Arc<dyn PageSource>,
    page: usize,
    max_px: f32,
    token: crate::preview::token::RenderToken,
) -> Result<String, PreviewError> {
    let native = source.page_size(page)?;
    let longest = native.width_pts.max(native.height_pts).max(1.0);
    let scale = max_px / longest;

    let surface = tokio::task::spawn_blocking(move || source.paint(page, scale, &token))
        .await
        .map_err(|e| PreviewError::RenderFailed {
            page,
            detail: format!("paint task panicked: {e}"),
        })??;

    encode::encode_preview(&surface.image).map_err(|e| PreviewError::RenderFailed {
        page,
        detail: format!("preview encoding failed: {e}"),
    })
}
