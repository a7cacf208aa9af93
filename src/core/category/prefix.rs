//! Namespace prefix cache.
//!
//! Category queries render every path segment with a namespace prefix.
//! Lookups go through this cache; a miss asks the resolver and stores the
//! answer. Two threads missing at once both compute and both store the same
//! value, which is harmless.

use crate::core::error::{Result, TaxaError};
use crate::core::model::{iso9075, NamespacePrefixResolver, Path, QName};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe namespace URI to prefix cache
pub struct PrefixCache {
    resolver: Arc<dyn NamespacePrefixResolver>,
    prefixes: RwLock<HashMap<String, String>>,
}

impl PrefixCache {
    pub fn new(resolver: Arc<dyn NamespacePrefixResolver>) -> Self {
        Self {
            resolver,
            prefixes: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn NamespacePrefixResolver> {
        &self.resolver
    }

    /// Prefix for `uri`, computed on first use
    pub fn prefix(&self, uri: &str) -> Result<String> {
        if let Some(prefix) = self
            .prefixes
            .read()
            .ok()
            .and_then(|cache| cache.get(uri).cloned())
        {
            return Ok(prefix);
        }
        let prefix = self
            .resolver
            .prefixes(uri)
            .into_iter()
            .next()
            .ok_or_else(|| TaxaError::NamespaceNotFound(uri.to_string()))?;
        if let Ok(mut cache) = self.prefixes.write() {
            cache.insert(uri.to_string(), prefix.clone());
        }
        Ok(prefix)
    }

    /// `prefix:local` with the local name ISO 9075 encoded
    pub fn encode(&self, qname: &QName) -> Result<String> {
        let local = iso9075::encode(qname.local_name());
        if qname.namespace().is_empty() {
            return Ok(local);
        }
        let prefix = self.prefix(qname.namespace())?;
        Ok(if prefix.is_empty() {
            local
        } else {
            format!("{prefix}:{local}")
        })
    }

    /// `prefix:local` without encoding, for field names
    pub fn prefixed(&self, qname: &QName) -> Result<String> {
        let prefix = self.prefix(qname.namespace())?;
        Ok(if prefix.is_empty() {
            qname.local_name().to_string()
        } else {
            format!("{prefix}:{}", qname.local_name())
        })
    }

    /// Prefix-form path string; the store root contributes nothing
    pub fn path_string(&self, path: &Path) -> Result<String> {
        let mut out = String::new();
        for element in path.elements() {
            if element.parent.is_none() {
                continue;
            }
            let Some(qname) = &element.qname else {
                continue;
            };
            out.push('/');
            out.push_str(&self.encode(qname)?);
        }
        Ok(out)
    }

    /// Forget everything, e.g. after prefixes were re-registered
    pub fn clear(&self) {
        if let Ok(mut cache) = self.prefixes.write() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.prefixes.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
