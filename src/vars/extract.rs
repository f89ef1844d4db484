//! Variable extraction: find `(name)` tokens in element text.
//!
//! A variable reference is any non-empty parenthesised span; there is no
//! escaping mechanism for literal parentheses, so `"un (petit) mot"` binds a
//! variable named `petit`. Editors accept this trade-off because template
//! prose almost never needs literal parentheses, and a visible substitution
//! is easier to diagnose than a silent escape rule.

use once_cell::sync::Lazy;
use regex::Regex;

/// Non-empty parenthesised group. `()` does not match, so empty parentheses
/// are never reported as a variable.
static RE_VARIABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

/// The compiled token pattern, shared with the resolver so extraction and
/// substitution can never disagree on what counts as a variable.
pub(crate) fn variable_pattern() -> &'static Regex {
    &RE_VARIABLE
}

/// Extract the ordered sequence of variable names referenced in `text`.
///
/// Duplicates are preserved: `"(a)(a)(b)"` yields `["a", "a", "b"]`. Callers
/// that need the unique set deduplicate themselves (see
/// [`collect_template_variables`]).
pub fn extract_variables(text: &str) -> Vec<String> {
    RE_VARIABLE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Collect the unique variable names across a set of elements, in first-use
/// order. This is the list stored on [`crate::model::Template::variables`]
/// and shown in the customization form.
pub fn collect_template_variables(elements: &[crate::model::EditorElement]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for element in elements {
        for name in extract_variables(&element.content) {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
        // Legacy single-variable bindings may not appear in the text.
        if let Some(legacy) = &element.variable_name {
            if seen.insert(legacy.clone()) {
                names.push(legacy.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EditorElement, ElementKind, TextStyle};
    use std::collections::HashMap;

    #[test]
    fn extracts_names_in_order() {
        assert_eq!(
            extract_variables("Bonjour (nom), tu as (age) ans"),
            vec!["nom", "age"]
        );
    }

    #[test]
    fn duplicates_preserved() {
        assert_eq!(extract_variables("(a)(a)(b)"), vec!["a", "a", "b"]);
    }

    #[test]
    fn no_parentheses_yields_empty() {
        assert_eq!(extract_variables("plain text"), Vec::<String>::new());
        assert_eq!(extract_variables(""), Vec::<String>::new());
    }

    #[test]
    fn empty_parentheses_ignored() {
        assert_eq!(extract_variables("a () b (x)"), vec!["x"]);
    }

    #[test]
    fn names_may_contain_spaces_and_accents() {
        assert_eq!(
            extract_variables("(prénom de l'enfant)"),
            vec!["prénom de l'enfant"]
        );
    }

    #[test]
    fn unclosed_parenthesis_matches_nothing() {
        assert_eq!(extract_variables("hello (nom"), Vec::<String>::new());
    }

    fn text_element(id: &str, content: &str) -> EditorElement {
        EditorElement {
            id: id.into(),
            template_id: "t".into(),
            kind: ElementKind::Text,
            page: 0,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 20.0,
            content: content.into(),
            style: TextStyle::default(),
            variable_name: None,
            variables: vec![],
            default_values: HashMap::new(),
        }
    }

    #[test]
    fn template_variables_deduplicated_across_elements() {
        let elements = vec![
            text_element("a", "Bonjour (nom)"),
            text_element("b", "(nom) a (age) ans"),
        ];
        assert_eq!(collect_template_variables(&elements), vec!["nom", "age"]);
    }

    #[test]
    fn legacy_binding_included_even_without_token() {
        let mut el = text_element("a", "static text");
        el.variable_name = Some("ville".into());
        assert_eq!(collect_template_variables(&[el]), vec!["ville"]);
    }
}
