//! Variable templating: extraction and resolution.
//!
//! ## Data Flow
//!
//! ```text
//! element text ──▶ extract ──▶ resolve ──▶ substituted text
//!  "(nom)…"        ["nom"]     user/default precedence
//! ```
//!
//! 1. [`extract`] — scan free text for `(name)` tokens
//! 2. [`resolve`] — substitute each token from the user map or the
//!    element's own defaults

pub mod extract;
pub mod resolve;

pub use extract::{collect_template_variables, extract_variables};
pub use resolve::{resolve_element_text, resolve_elements, ResolvedElement, UserVariables};
