//! Variable substitution for request templates.
//!
//! Replaces `{{name}}` placeholders with values from a [`VariableMap`]. Substitution
//! is single-pass: values inserted by the resolver are never scanned again, and
//! placeholders without a matching variable are left exactly as written.

use super::VariableMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Cached pattern for `{{name}}`; the shortest span up to the next `}}`.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("Failed to compile variable regex"));

/// Looks a placeholder name up, trying the exact name before the trimmed one,
/// so `{{ baseUrl }}` resolves like `{{baseUrl}}`.
fn lookup<'a>(name: &str, variables: &'a VariableMap) -> Option<&'a String> {
    variables
        .get(name)
        .or_else(|| variables.get(name.trim()))
}

/// Substitutes every `{{name}}` placeholder in `text`.
///
/// # Arguments
///
/// * `text` - Template text, possibly empty
/// * `variables` - Name to value mapping
///
/// # Returns
///
/// The substituted text. Unknown placeholders pass through verbatim and an
/// empty input is returned unchanged.
///
/// # Examples
///
/// ```
/// use api_tester::variables::{resolve_variables, VariableMap};
///
/// let mut vars = VariableMap::new();
/// vars.insert("a".to_string(), "1".to_string());
///
/// assert_eq!(resolve_variables("{{a}}-{{b}}", &vars), "1-{{b}}");
/// ```
pub fn resolve_variables(text: &str, variables: &VariableMap) -> String {
    // Fast path: nothing that could be a placeholder
    if !text.contains("{{") {
        return text.to_string();
    }

    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            match lookup(&caps[1], variables) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Optional-input form of [`resolve_variables`]: `None` stays `None`.
pub fn resolve_optional(text: Option<&str>, variables: &VariableMap) -> Option<String> {
    text.map(|t| resolve_variables(t, variables))
}

/// Resolves every header value independently. Header names are kept as written.
pub fn resolve_header_values(
    headers: &HashMap<String, String>,
    variables: &VariableMap,
) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.clone(), resolve_variables(value, variables)))
        .collect()
}

/// Lists placeholder names in `text` that have no value in `variables`.
pub fn unresolved_placeholders(text: &str, variables: &VariableMap) -> Vec<String> {
    VARIABLE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            if lookup(name, variables).is_none() {
                Some(name.to_string())
            } else {
                None
            }
        })
        .collect()
}
