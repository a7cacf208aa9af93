//! Qualified names and namespace prefix resolution.

use crate::core::error::{Result, TaxaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

/// Maximum length (in characters) of a local name
pub const MAX_LOCAL_NAME_LENGTH: usize = 100;

/// A namespace-qualified name, rendered as `{uri}local`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QName {
    namespace: String,
    local_name: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Parse the `{uri}local` form. A bare `local` has the empty namespace.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('{') {
            let (uri, local) = rest
                .split_once('}')
                .ok_or_else(|| TaxaError::InvalidName(format!("Unterminated namespace in '{s}'")))?;
            if local.is_empty() {
                return Err(TaxaError::InvalidName(format!("Empty local name in '{s}'")));
            }
            return Ok(Self::new(uri, local));
        }
        if s.is_empty() {
            return Err(TaxaError::InvalidName("Empty qualified name".to_string()));
        }
        Ok(Self::new("", s))
    }

    /// Resolve `prefix:local`, `{uri}local` or `local` against a resolver.
    pub fn resolve(s: &str, resolver: &dyn NamespacePrefixResolver) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('{') {
            return Self::parse(s);
        }
        match s.split_once(':') {
            Some((prefix, local)) => {
                if local.is_empty() {
                    return Err(TaxaError::InvalidName(format!("Empty local name in '{s}'")));
                }
                let uri = resolver
                    .namespace_uri(prefix)
                    .ok_or_else(|| TaxaError::NamespaceNotFound(prefix.to_string()))?;
                Ok(Self::new(uri, local))
            }
            None => {
                let uri = resolver.namespace_uri("").unwrap_or_default();
                Self::parse(s).map(|q| Self::new(uri, q.local_name))
            }
        }
    }

    /// Render as `prefix:local` using the first prefix registered for the namespace
    pub fn to_prefix_string(&self, resolver: &dyn NamespacePrefixResolver) -> Result<String> {
        if self.namespace.is_empty() {
            return Ok(self.local_name.clone());
        }
        let prefix = resolver
            .prefixes(&self.namespace)
            .into_iter()
            .next()
            .ok_or_else(|| TaxaError::NamespaceNotFound(self.namespace.clone()))?;
        if prefix.is_empty() {
            Ok(self.local_name.clone())
        } else {
            Ok(format!("{prefix}:{}", self.local_name))
        }
    }

    /// Normalize a display name into a local name usable as an association qualifier.
    ///
    /// Trims surrounding whitespace, replaces control characters with `_` and
    /// truncates to [`MAX_LOCAL_NAME_LENGTH`] characters.
    pub fn create_valid_local_name(name: &str) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TaxaError::InvalidName(
                "Local name cannot be empty".to_string(),
            ));
        }
        Ok(trimmed
            .chars()
            .take(MAX_LOCAL_NAME_LENGTH)
            .map(|c| if c.is_control() { '_' } else { c })
            .collect())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

impl TryFrom<String> for QName {
    type Error = TaxaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<QName> for String {
    fn from(value: QName) -> Self {
        value.to_string()
    }
}

/// Maps namespace prefixes to URIs and back
pub trait NamespacePrefixResolver: Send + Sync {
    /// URI registered for a prefix
    fn namespace_uri(&self, prefix: &str) -> Option<String>;

    /// Prefixes registered for a URI, preferred prefix first
    fn prefixes(&self, uri: &str) -> Vec<String>;
}

/// Mutable prefix registry, seeded with the built-in content model namespaces
#[derive(Debug)]
pub struct NamespaceRegistry {
    by_prefix: RwLock<BTreeMap<String, String>>,
}

impl NamespaceRegistry {
    /// Empty registry (only the empty prefix maps to the empty namespace)
    pub fn empty() -> Self {
        let mut map = BTreeMap::new();
        map.insert(String::new(), String::new());
        Self {
            by_prefix: RwLock::new(map),
        }
    }

    /// Registry with the `sys`, `cm` and `d` prefixes registered
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        registry.register(super::content::SYS_PREFIX, super::content::SYS_URI);
        registry.register(super::content::CM_PREFIX, super::content::CM_URI);
        registry.register(
            super::content::DICTIONARY_PREFIX,
            super::content::DICTIONARY_URI,
        );
        registry
    }

    pub fn register(&self, prefix: &str, uri: &str) {
        if let Ok(mut map) = self.by_prefix.write() {
            map.insert(prefix.to_string(), uri.to_string());
        }
    }

    pub fn unregister(&self, prefix: &str) {
        if let Ok(mut map) = self.by_prefix.write() {
            map.remove(prefix);
        }
    }

    /// All registered (prefix, uri) pairs
    pub fn entries(&self) -> Vec<(String, String)> {
        self.by_prefix
            .read()
            .map(|map| map.iter().map(|(p, u)| (p.clone(), u.clone())).collect())
            .unwrap_or_default()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl NamespacePrefixResolver for NamespaceRegistry {
    fn namespace_uri(&self, prefix: &str) -> Option<String> {
        self.by_prefix.read().ok()?.get(prefix).cloned()
    }

    fn prefixes(&self, uri: &str) -> Vec<String> {
        self.by_prefix
            .read()
            .map(|map| {
                map.iter()
                    .filter(|(_, u)| u.as_str() == uri)
                    .map(|(p, _)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
