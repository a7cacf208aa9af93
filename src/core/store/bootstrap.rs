//! Store bootstrap: category root and classification nodes.
//!
//! Every store that carries categories has a `cm:categoryRoot` node beneath
//! its root, and beneath that one classification node per classification
//! aspect, linked through `cm:categories` and named after the aspect.

use super::NodeService;
use crate::core::error::Result;
use crate::core::model::content::{
    ASPECT_CLASSIFIABLE, ASSOC_CATEGORIES, ASSOC_CHILDREN, CATEGORY_ROOT_QNAME, PROP_NAME,
    TYPE_CATEGORY, TYPE_CATEGORY_ROOT,
};
use crate::core::model::{NodeRef, PropertyValue, QName, StoreRef};
use std::collections::BTreeMap;
use tracing::info;

/// Create the store if needed, then its category root and classification nodes.
///
/// Idempotent. Returns the category root node.
pub fn bootstrap_store(nodes: &dyn NodeService, store: &StoreRef) -> Result<NodeRef> {
    let root = match nodes.root_node(store) {
        Ok(root) => root,
        Err(_) => nodes.create_store(store)?,
    };

    let category_root = match nodes
        .child_assocs(&root, Some(&ASSOC_CHILDREN), Some(&CATEGORY_ROOT_QNAME))?
        .into_iter()
        .next()
    {
        Some(assoc) => assoc.child,
        None => {
            let assoc = nodes.create_node(
                &root,
                &ASSOC_CHILDREN,
                &CATEGORY_ROOT_QNAME,
                &TYPE_CATEGORY_ROOT,
                BTreeMap::new(),
            )?;
            info!(store = %store, node = %assoc.child, "Created category root");
            assoc.child
        }
    };

    for aspect in nodes.dictionary().sub_aspects(&ASPECT_CLASSIFIABLE, true) {
        ensure_classification(nodes, &category_root, &aspect)?;
    }
    Ok(category_root)
}

/// Classification node for `aspect` under the category root, created when absent
pub fn ensure_classification(
    nodes: &dyn NodeService,
    category_root: &NodeRef,
    aspect: &QName,
) -> Result<NodeRef> {
    if let Some(existing) = nodes
        .child_assocs(category_root, Some(&ASSOC_CATEGORIES), Some(aspect))?
        .into_iter()
        .next()
    {
        return Ok(existing.child);
    }
    let properties = BTreeMap::from([(
        PROP_NAME.clone(),
        PropertyValue::text(aspect.local_name()),
    )]);
    let assoc = nodes.create_node(
        category_root,
        &ASSOC_CATEGORIES,
        aspect,
        &TYPE_CATEGORY,
        properties,
    )?;
    info!(aspect = %aspect, node = %assoc.child, "Created classification");
    Ok(assoc.child)
}
