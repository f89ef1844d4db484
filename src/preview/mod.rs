//! Preview rendering: paging, zoom, and the render state machine.
//!
//! ## Data Flow
//!
//! ```text
//! document URL ──▶ load ──▶ ready ──▶ render ──▶ painted surface
//!                 (fetch+parse)  (page/zoom requests, cancellation)
//! ```
//!
//! 1. [`paging`] — the [`PageSource`] seam: page count, native page sizes,
//!    and per-page painting at a scale. The pdfium-backed implementation
//!    lives in [`crate::pipeline::render`]; tests use in-memory fakes.
//! 2. [`token`]  — generation-counter cancellation tokens; one bump
//!    invalidates every render issued before it.
//! 3. [`controller`] — the `idle → loading → ready → rendering → ready`
//!    state machine with clamped navigation, zoom persistence, fit-to-width,
//!    and debounced dimension reporting.

pub mod controller;
pub mod paging;
pub mod token;

pub use controller::{PreviewController, PreviewObserver, PreviewState, RenderedSurface};
pub use paging::{DocumentLoader, PageSize, PageSource, PaintedSurface};
pub use token::{RenderGate, RenderToken};
