//! Value resolution: substitute `(name)` tokens into final element text.
//!
//! ## Precedence, per occurrence
//!
//! 1. a **non-empty** user-supplied value for the name,
//! 2. else the element's own `default_values` entry — even when that entry
//!    is the empty string,
//! 3. else the empty string.
//!
//! An empty-string user value deliberately falls through to the default
//! (rule 2). A parent clearing a pre-filled form field gets the author's
//! fallback text rather than a hole in the story. Callers who want "blank
//! means blank" must remove the key instead — see [`UserVariables`], which
//! makes the distinction explicit at the type level.
//!
//! Substitution is literal and single-pass: a default value containing
//! `(other)` is inserted verbatim, never re-expanded, so authored defaults
//! cannot loop or cascade.

use crate::model::{EditorElement, ElementKind};
use std::collections::HashMap;

/// User-submitted variable values.
///
/// Wraps the raw map so the "provided but empty" case has one documented
/// home: [`UserVariables::effective`] returns `None` for both an absent key
/// and an empty value, which is exactly the lookup the resolver needs.
#[derive(Debug, Clone, Default)]
pub struct UserVariables {
    values: HashMap<String, String>,
}

impl UserVariables {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// The value to substitute for `name`, or `None` when the user supplied
    /// nothing usable (absent key or empty string).
    pub fn effective(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(v) if !v.is_empty() => Some(v.as_str()),
            _ => None,
        }
    }

    /// The raw map, for snapshotting into a [`crate::model::Histoire`].
    pub fn into_inner(self) -> HashMap<String, String> {
        self.values
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }
}

impl From<HashMap<String, String>> for UserVariables {
    fn from(values: HashMap<String, String>) -> Self {
        Self::new(values)
    }
}

/// One element's fully substituted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub element_id: String,
    pub page: usize,
    pub text: String,
}

/// Substitute every `(name)` token in `element.content`.
///
/// Pure function of its inputs: resolving twice with identical inputs yields
/// identical output. Tokens are replaced in text order; each occurrence is
/// resolved independently, so the same name can produce different output on
/// elements with different defaults.
pub fn resolve_element_text(element: &EditorElement, user_vars: &UserVariables) -> String {
    // One scan over the original text; inserted values are never re-scanned,
    // which is what rules out recursive expansion.
    crate::vars::extract::variable_pattern()
        .replace_all(&element.content, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            user_vars
                .effective(name)
                .or_else(|| element.default_values.get(name).map(String::as_str))
                .unwrap_or("")
                .to_string()
        })
        .into_owned()
}

/// Resolve every text element of a template, in element order.
///
/// Image elements carry no substitutable content and are skipped.
pub fn resolve_elements(
    elements: &[EditorElement],
    user_vars: &UserVariables,
) -> Vec<ResolvedElement> {
    elements
        .iter()
        .filter(|el| el.kind == ElementKind::Text)
        .map(|el| ResolvedElement {
            element_id: el.id.clone(),
            page: el.page,
            text: resolve_element_text(el, user_vars),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextStyle;

    fn element(content: &str, defaults: &[(&str, &str)]) -> EditorElement {
        EditorElement {
            id: "el-1".into(),
            template_id: "tmpl-1".into(),
            kind: ElementKind::Text,
            page: 0,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 20.0,
            content: content.into(),
            style: TextStyle::default(),
            variable_name: None,
            variables: defaults.iter().map(|(k, _)| k.to_string()).collect(),
            default_values: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn user(pairs: &[(&str, &str)]) -> UserVariables {
        UserVariables::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn user_value_wins_over_default() {
        let el = element("Tu as (age) ans", &[("age", "7")]);
        assert_eq!(
            resolve_element_text(&el, &user(&[("age", "9")])),
            "Tu as 9 ans"
        );
    }

    #[test]
    fn empty_user_value_falls_back_to_default() {
        // The documented surprise: an explicit empty string from the user is
        // treated as not provided.
        let el = element("Tu as (age) ans", &[("age", "7")]);
        assert_eq!(
            resolve_element_text(&el, &user(&[("age", "")])),
            "Tu as 7 ans"
        );
    }

    #[test]
    fn absent_everywhere_substitutes_empty() {
        let el = element("Tu as (age) ans", &[]);
        assert_eq!(resolve_element_text(&el, &user(&[])), "Tu as  ans");
    }

    #[test]
    fn empty_default_is_used_when_present() {
        let el = element("x(a)y", &[("a", "")]);
        assert_eq!(resolve_element_text(&el, &user(&[])), "xy");
    }

    #[test]
    fn each_occurrence_resolved() {
        let el = element("(a) et (a) et (b)", &[("a", "un"), ("b", "deux")]);
        assert_eq!(resolve_element_text(&el, &user(&[])), "un et un et deux");
    }

    #[test]
    fn no_recursive_expansion() {
        let el = element("salut (a)", &[("a", "(b)"), ("b", "nope")]);
        assert_eq!(resolve_element_text(&el, &user(&[])), "salut (b)");
    }

    #[test]
    fn inserted_value_never_rescanned() {
        // A default that happens to contain a later variable's token must
        // not capture that variable's substitution.
        let el = element("(a)(b)", &[("a", "(b)x"), ("b", "deux")]);
        assert_eq!(resolve_element_text(&el, &user(&[])), "(b)xdeux");
    }

    #[test]
    fn per_element_defaults_are_independent() {
        let first = element("(nom)", &[("nom", "Alice")]);
        let second = element("(nom)", &[("nom", "Léo")]);
        let empty = user(&[]);
        assert_eq!(resolve_element_text(&first, &empty), "Alice");
        assert_eq!(resolve_element_text(&second, &empty), "Léo");
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let el = element("Bonjour (nom), tu as (age) ans", &[("nom", "Alice"), ("age", "7")]);
        let vars = user(&[("nom", "Bob")]);
        let once = resolve_element_text(&el, &vars);
        let twice = resolve_element_text(&el, &vars);
        assert_eq!(once, "Bonjour Bob, tu as 7 ans");
        assert_eq!(once, twice);
    }

    #[test]
    fn image_elements_skipped_by_resolve_elements() {
        let mut img = element("", &[]);
        img.kind = ElementKind::Image;
        img.id = "img-1".into();
        let text = element("Bonjour (nom)", &[("nom", "Alice")]);
        let resolved = resolve_elements(&[img, text], &user(&[]));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].element_id, "el-1");
        assert_eq!(resolved[0].text, "Bonjour Alice");
    }
}
