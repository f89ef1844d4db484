//! # conteur
//!
//! Personalized children's-book engine: variable templating plus PDF
//! preview rendering, as a library and CLI.
//!
//! ## Why this crate?
//!
//! A personalized book is a fixed PDF template plus a handful of text
//! overlays whose content depends on the child — `"Bonjour (nom), tu as
//! (age) ans"` becomes `"Bonjour Alice, tu as 7 ans"`. The hard parts are
//! not the substitution itself but everything around it: extracting the
//! variable set from free-form text, resolving values with a stable
//! precedence, and painting page previews off the UI thread while the
//! parent is still typing — with stale renders cancelled, zoom clamped,
//! and dimension callbacks debounced.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Template PDF + elements + user variables
//!  │
//!  ├─ 1. Validate  template published, fields well-formed
//!  ├─ 2. Resolve   (variable) tokens → user value | element default | ""
//!  ├─ 3. Input     resolve local file or download from URL
//!  ├─ 4. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 5. Encode    PNG → base64 data URI
//!  └─ 6. Output    immutable Histoire snapshot + per-page previews
//! ```
//!
//! Interactive viewing goes through [`preview::PreviewController`] instead:
//! a small state machine (`Idle → Loading → Ready ⇄ Rendering`) whose page,
//! zoom, and fit-to-width requests supersede any in-flight render.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conteur::{generate, GenerateConfig, GenerateRequest};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     # let template = todo!();
//!     # let elements: Vec<conteur::EditorElement> = vec![];
//!     let request = GenerateRequest {
//!         template_id: "tmpl-1".into(),
//!         variables: HashMap::from([("nom".into(), "Alice".into())]),
//!     };
//!     let config = GenerateConfig::default();
//!     let output = generate(&template, &elements, "user-1", &request, &config).await?;
//!     println!("{} pages rendered", output.stats.processed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `conteur` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! conteur = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod schema;
pub mod store;
pub mod stream;
pub mod vars;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerateConfig, GenerateConfigBuilder, ZoomMode};
pub use error::{ConteurError, PreviewError};
pub use generate::{find_template, generate, GenerationStats, HistoireOutput, PagePreview};
pub use model::{
    AgeRange, Category, EditorElement, ElementKind, Gender, GenerateRequest, GenerateResponse,
    Histoire, Language, Template, TextAlign, TextStyle,
};
pub use preview::{PreviewController, PreviewObserver, PreviewState};
pub use progress::GenerationObserver;
pub use store::{HistoireStore, JsonFileAdapter, MemoryAdapter, SessionStore, StorageAdapter};
pub use stream::{preview_stream, PreviewStream};
pub use vars::{
    collect_template_variables, extract_variables, resolve_element_text, resolve_elements,
    UserVariables,
};
