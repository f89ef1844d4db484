//! Explicit record-validation schemas.
//!
//! ## Why schema objects instead of derive macros?
//!
//! The records validated here arrive from forms and API payloads as loose
//! string maps, before they are ever deserialized into typed structs.
//! Building a [`Schema`] out of plain [`Field`] rules keeps validation
//! independent of any reflection mechanism: the rules are data, they can be
//! listed, diffed, and unit-tested one at a time, and a caller can render
//! them into form hints without running them.
//!
//! Validation is total: [`Schema::validate`] collects *every* violation
//! rather than stopping at the first, so an admin form can show all problems
//! in one round trip.

use std::collections::HashMap;
use std::fmt;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldViolation {
    /// The field the rule applies to.
    pub field: String,
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl FieldViolation {
    /// A required field was absent.
    pub fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: "is required".to_string(),
        }
    }

    /// A value was not a member of the allowed enum set.
    pub fn bad_enum(field: &str, got: &str, allowed: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            message: format!("'{got}' is not one of [{}]", allowed.join(", ")),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// The constraint a single field must satisfy.
#[derive(Debug, Clone)]
enum Rule {
    /// Field must be present (possibly empty).
    Required,
    /// Field, when present, must be non-empty after trimming.
    NonEmpty,
    /// Field, when present, must be one of the listed values.
    OneOf(Vec<&'static str>),
    /// Field, when present, must parse as an unsigned integer in range.
    UintRange { min: u64, max: u64 },
}

/// A named field plus the rules attached to it.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    rules: Vec<Rule>,
}

impl Field {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rules: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.rules.push(Rule::Required);
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.rules.push(Rule::NonEmpty);
        self
    }

    pub fn one_of(mut self, allowed: &[&'static str]) -> Self {
        self.rules.push(Rule::OneOf(allowed.to_vec()));
        self
    }

    pub fn uint_range(mut self, min: u64, max: u64) -> Self {
        self.rules.push(Rule::UintRange { min, max });
        self
    }

    fn check(&self, value: Option<&str>, out: &mut Vec<FieldViolation>) {
        for rule in &self.rules {
            match (rule, value) {
                (Rule::Required, None) => out.push(FieldViolation::missing(self.name)),
                (Rule::NonEmpty, Some(v)) if v.trim().is_empty() => {
                    out.push(FieldViolation {
                        field: self.name.to_string(),
                        message: "must not be empty".to_string(),
                    });
                }
                (Rule::OneOf(allowed), Some(v)) if !allowed.contains(&v) => {
                    out.push(FieldViolation::bad_enum(self.name, v, allowed));
                }
                (Rule::UintRange { min, max }, Some(v)) => match v.parse::<u64>() {
                    Ok(n) if n >= *min && n <= *max => {}
                    Ok(n) => out.push(FieldViolation {
                        field: self.name.to_string(),
                        message: format!("{n} is outside {min}..={max}"),
                    }),
                    Err(_) => out.push(FieldViolation {
                        field: self.name.to_string(),
                        message: format!("'{v}' is not an integer"),
                    }),
                },
                _ => {}
            }
        }
    }
}

/// An ordered collection of field rules validated against a string map.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Check `record` against every rule; empty result means valid.
    pub fn validate(&self, record: &HashMap<String, String>) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        for field in &self.fields {
            field.check(record.get(field.name).map(String::as_str), &mut out);
        }
        out
    }
}

// ── Built-in schemas ─────────────────────────────────────────────────────

/// Schema for admin-submitted template records.
pub fn template_schema() -> Schema {
    Schema::new(vec![
        Field::new("title").required().non_empty(),
        Field::new("description").required(),
        Field::new("category")
            .required()
            .one_of(crate::model::Category::ALL),
        Field::new("gender")
            .required()
            .one_of(crate::model::Gender::ALL),
        Field::new("age_range")
            .required()
            .one_of(crate::model::AgeRange::ALL),
        Field::new("language")
            .required()
            .one_of(crate::model::Language::ALL),
        Field::new("pdf_path").required().non_empty(),
        Field::new("page_count").required().uint_range(1, 500),
    ])
}

/// Schema for editor element records.
///
/// The `variables`/`default_values` pairing invariant (every listed variable
/// has a default entry) is structural and checked in
/// [`crate::model::EditorElement::check_defaults`], not here — it involves
/// two collections, not one string field.
pub fn element_schema() -> Schema {
    Schema::new(vec![
        Field::new("template_id").required().non_empty(),
        Field::new("kind")
            .required()
            .one_of(&["text", "image"]),
        Field::new("page").required().uint_range(0, 499),
    ])
}
