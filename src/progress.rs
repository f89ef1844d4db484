//! Progress-callback trait for per-page generation events.
//!
//! Inject an [`Arc<dyn GenerationObserver>`] via
//! [`crate::config::GenerateConfigBuilder::observer`] to receive real-time
//! events as the pipeline paints each preview page.
//!
//! Callbacks are the least-invasive integration point: callers can forward
//! events to a progress bar, a WebSocket, or a log without the library
//! knowing how the host application communicates. The trait is
//! `Send + Sync` because pages are painted concurrently.

/// Called by the generation pipeline as it paints each preview page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. When pages are painted concurrently, `on_page_*`
/// may be called from different threads; implementations must protect shared
/// mutable state themselves.
pub trait GenerationObserver: Send + Sync {
    /// Called once before any page is painted.
    fn on_generation_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page paint begins.
    ///
    /// `page` is 0-based throughout, matching
    /// [`crate::model::EditorElement::page`].
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page preview was painted and encoded.
    fn on_page_complete(&self, page: usize, total_pages: usize, preview_bytes: usize) {
        let _ = (page, total_pages, preview_bytes);
    }

    /// Called when a page paint failed (non-fatal; generation continues).
    fn on_page_error(&self, page: usize, total_pages: usize, error: &str) {
        let _ = (page, total_pages, error);
    }

    /// Called once after the last page settles.
    fn on_generation_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        completed: AtomicUsize,
    }

    impl GenerationObserver for Counting {
        fn on_page_complete(&self, _page: usize, _total: usize, _bytes: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        let obs = Counting {
            completed: AtomicUsize::new(0),
        };
        obs.on_generation_start(3);
        obs.on_page_start(0, 3);
        obs.on_page_error(1, 3, "boom");
        obs.on_generation_complete(3, 2);
        assert_eq!(obs.completed.load(Ordering::SeqCst), 0);

        obs.on_page_complete(2, 3, 128);
        assert_eq!(obs.completed.load(Ordering::SeqCst), 1);
    }
}
