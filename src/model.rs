//! Core records: templates, editor elements, generated stories.
//!
//! A [`Template`] is an admin-authored book layout; it owns its
//! [`EditorElement`]s (keyed by `template_id`). Generating a story snapshots
//! the resolved variable map into a [`Histoire`], which stays valid even if
//! the template is edited afterwards — a histoire never reads back through
//! its template once created.
//!
//! Templates are never hard-deleted; unpublishing (`is_published = false`)
//! is the soft-delete state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Enums ────────────────────────────────────────────────────────────────

/// Story category shown in the catalogue filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Adventure,
    Bedtime,
    Educational,
    Fantasy,
}

impl Category {
    /// Wire names, in declaration order. Used by the validation schemas.
    pub const ALL: &'static [&'static str] =
        &["adventure", "bedtime", "educational", "fantasy"];
}

/// Intended reader gender for the template's artwork and wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
    Neutral,
}

impl Gender {
    pub const ALL: &'static [&'static str] = &["boy", "girl", "neutral"];
}

/// Reader age bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "0-2")]
    Infant,
    #[serde(rename = "3-5")]
    Preschool,
    #[serde(rename = "6-8")]
    EarlyReader,
    #[serde(rename = "9-12")]
    MiddleGrade,
}

impl AgeRange {
    pub const ALL: &'static [&'static str] = &["0-2", "3-5", "6-8", "9-12"];
}

/// Template text language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    En,
    Es,
}

impl Language {
    pub const ALL: &'static [&'static str] = &["fr", "en", "es"];
}

// ── Template ─────────────────────────────────────────────────────────────

/// An admin-authored book layout with placeholder variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub gender: Gender,
    pub age_range: AgeRange,
    pub language: Language,
    /// Path or URL of the template's base PDF.
    pub pdf_path: String,
    /// Path or URL of the catalogue cover image.
    #[serde(default)]
    pub cover_path: String,
    pub page_count: usize,
    /// Native page size in PDF points (1/72 inch).
    pub page_width_pts: f32,
    pub page_height_pts: f32,
    /// Soft-delete state: unpublished templates stay in storage.
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    /// Union of variable names referenced by this template's elements.
    #[serde(default)]
    pub variables: Vec<String>,
}

// ── Editor elements ──────────────────────────────────────────────────────

/// Kind of a positioned block inside a template page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
}

/// Text presentation attributes for a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default = "TextStyle::default_font")]
    pub font_family: String,
    #[serde(default = "TextStyle::default_size")]
    pub font_size: f32,
    #[serde(default = "TextStyle::default_color")]
    pub color: String,
    #[serde(default)]
    pub align: TextAlign,
}

impl TextStyle {
    fn default_font() -> String {
        "serif".to_string()
    }
    fn default_size() -> f32 {
        14.0
    }
    fn default_color() -> String {
        "#000000".to_string()
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: Self::default_font(),
            font_size: Self::default_size(),
            color: Self::default_color(),
            align: TextAlign::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// One positioned text or image block within a template page.
///
/// Text content may embed `(variable)` tokens; `default_values` carries this
/// element's per-variable fallback strings. `variable_name` is the legacy
/// single-variable binding kept for templates authored before multi-variable
/// elements existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorElement {
    pub id: String,
    pub template_id: String,
    pub kind: ElementKind,
    /// 0-based page index within the template.
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Text content; empty for image elements.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub style: TextStyle,
    /// Legacy single-variable binding.
    #[serde(default)]
    pub variable_name: Option<String>,
    /// Multi-variable list referenced by `content`.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Per-variable fallback strings (value may be empty).
    #[serde(default)]
    pub default_values: HashMap<String, String>,
}

impl EditorElement {
    /// Report variables listed on this element with no `default_values`
    /// entry.
    ///
    /// Every name in `variables` should have a corresponding key (the value
    /// may be the empty string). Returns the offending names; empty means
    /// the invariant holds.
    pub fn check_defaults(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| !self.default_values.contains_key(v.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// All variable names this element binds: the legacy single binding
    /// (if any) followed by the multi-variable list.
    pub fn bound_variables(&self) -> Vec<&str> {
        self.variable_name
            .iter()
            .map(String::as_str)
            .chain(self.variables.iter().map(String::as_str))
            .collect()
    }
}

// ── Histoire ─────────────────────────────────────────────────────────────

/// A generated, user-specific story instance.
///
/// Holds a snapshot of the variable map actually used, independent of later
/// template edits. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histoire {
    pub id: String,
    pub template_id: String,
    pub user_id: String,
    /// The fully resolved variable map used for this generation.
    pub variables: HashMap<String, String>,
    /// URL of the generated PDF.
    pub pdf_url: String,
    /// Per-page preview image URLs (data URIs or stored files).
    #[serde(default)]
    pub page_previews: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

// ── Wire DTOs ────────────────────────────────────────────────────────────

/// Body of `POST /histoire/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub template_id: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Response of `POST /histoire/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub pdf_url: String,
    pub page_previews: Vec<String>,
}
