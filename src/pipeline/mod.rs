//! Pipeline stages for story generation.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. switch rendering backend) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (URL/path)  (pdfium)  (base64 data URI)
//! ```
//!
//! 1. [`input`]   — canonicalise the template's path or URL to a local file
//! 2. [`render`]  — open and rasterise pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]  — PNG-encode each painted surface into a preview data URI
//! 4. [`datauri`] — parse SVG data URIs for the raster-conversion
//!    collaborator; rejects non-SVG payloads with typed errors

pub mod datauri;
pub mod encode;
pub mod input;
pub mod render;
