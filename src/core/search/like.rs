//! SQL-style `like` patterns.
//!
//! `%` matches any run of characters and `_` exactly one character. A
//! backslash makes the following character literal. Patterns match the
//! whole value.

use crate::core::error::{Result, TaxaError};
use crate::core::index::schema::tokenize;
use crate::core::model::{NodeRef, QName};
use crate::core::store::NodeService;
use regex::{Regex, RegexBuilder};

/// Translate a `like` pattern into an anchored regex source
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            out.push_str(&regex::escape(&c.to_string()));
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    if escaped {
        // trailing backslash stands for itself
        out.push_str(r"\\");
    }
    out.push('$');
    out
}

/// Compile a `like` pattern
pub fn compile_like(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| TaxaError::InvalidArgument(format!("Invalid like pattern '{pattern}': {e}")))
}

/// Does `value` match `pattern`
pub fn like_matches(value: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    Ok(compile_like(pattern, case_sensitive)?.is_match(value))
}

/// Match a stored property against `pattern`, ignoring case.
///
/// A node without the property never matches. Multi-valued properties
/// match when any value does.
pub fn property_like(
    nodes: &dyn NodeService,
    node: &NodeRef,
    property: &QName,
    pattern: &str,
) -> Result<bool> {
    let Some(value) = nodes.property(node, property)? else {
        return Ok(false);
    };
    let regex = compile_like(pattern, false)?;
    Ok(value
        .flatten()
        .into_iter()
        .any(|v| regex.is_match(&v.to_text().to_lowercase())))
}

/// Does the stored property contain every word of `text`
pub fn property_contains(
    nodes: &dyn NodeService,
    node: &NodeRef,
    property: &QName,
    text: &str,
) -> Result<bool> {
    let wanted = tokenize(text);
    if wanted.is_empty() {
        return Ok(false);
    }
    let Some(value) = nodes.property(node, property)? else {
        return Ok(false);
    };
    let present: Vec<String> = value
        .flatten()
        .into_iter()
        .flat_map(|v| tokenize(&v.to_text()))
        .collect();
    Ok(wanted.iter().all(|w| present.contains(w)))
}
