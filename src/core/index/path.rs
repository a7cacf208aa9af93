//! PATH patterns.
//!
//! Nodes are indexed under their prefix-form paths
//! (`/cm:categoryRoot/cm:generalclassifiable/cm:Software`). A PATH pattern
//! becomes a regular expression over those terms: `*` matches one segment,
//! `//` any number of intermediate segments. Query prefixes are rewritten
//! to the preferred prefix of their namespace so aliases match too.

use crate::core::error::{Result, TaxaError};
use crate::core::model::{NamespacePrefixResolver, Path};
use tracing::warn;

/// One path segment of any name
const ANY_SEGMENT: &str = "[^/]+";

/// Zero or more whole segments
const ANY_DEPTH: &str = "(/[^/]+)*";

/// Translate a PATH pattern into an anchored-by-construction regex
pub fn path_to_regex(pattern: &str, resolver: &dyn NamespacePrefixResolver) -> Result<String> {
    let pattern = pattern.trim();
    if !pattern.starts_with('/') {
        return Err(TaxaError::InvalidQuery(format!(
            "PATH must be absolute: {pattern}"
        )));
    }
    if pattern == "/" {
        return Ok("/".to_string());
    }

    let mut regex = String::new();
    let mut descendant = false;
    for segment in pattern.split('/').skip(1) {
        if segment.is_empty() {
            descendant = true;
            continue;
        }
        if descendant {
            regex.push_str(ANY_DEPTH);
            descendant = false;
        }
        regex.push('/');
        regex.push_str(&segment_regex(segment, resolver)?);
    }
    if descendant {
        regex.push_str(ANY_DEPTH);
    }
    Ok(regex)
}

fn segment_regex(segment: &str, resolver: &dyn NamespacePrefixResolver) -> Result<String> {
    if segment == "*" {
        return Ok(ANY_SEGMENT.to_string());
    }
    if segment == "." || segment == ".." {
        return Err(TaxaError::InvalidQuery(format!(
            "Relative step '{segment}' is not allowed in PATH"
        )));
    }
    let (prefix, local) = match segment.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, segment),
    };
    let mut out = String::new();
    if let Some(prefix) = prefix {
        out.push_str(&regex::escape(&canonical_prefix(prefix, resolver)?));
        out.push(':');
    }
    if local == "*" {
        out.push_str(ANY_SEGMENT);
    } else {
        out.push_str(&local_regex(local));
    }
    Ok(out)
}

/// Preferred prefix for the namespace `prefix` is bound to
pub fn canonical_prefix(prefix: &str, resolver: &dyn NamespacePrefixResolver) -> Result<String> {
    let uri = resolver
        .namespace_uri(prefix)
        .ok_or_else(|| TaxaError::NamespaceNotFound(prefix.to_string()))?;
    Ok(resolver
        .prefixes(&uri)
        .into_iter()
        .next()
        .unwrap_or_else(|| prefix.to_string()))
}

/// Escape a local name, keeping `*` as a within-segment wildcard
fn local_regex(local: &str) -> String {
    local
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]*")
}

/// Prefix-form path strings of the given paths; unrenderable paths are skipped
pub fn render_paths(paths: &[Path], resolver: &dyn NamespacePrefixResolver) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| match path.to_prefix_string(resolver) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                warn!(error = %e, "Skipping path that cannot be rendered");
                None
            }
        })
        .collect()
}
