//! Index-backed category service.
//!
//! Children and member lookups become PATH queries against the index;
//! root-category lookups and maintenance go straight to the node store.

use super::prefix::PrefixCache;
use super::{CategoryService, ChildrenFilter, Depth, Mode};
use crate::core::error::{Result, TaxaError};
use crate::core::index::{
    FieldFacet, IndexSearcher, PagingRequest, PagingResults, RowResolution, SearchParameters,
};
use crate::core::model::content::{
    ASPECT_CLASSIFIABLE, ASSOC_CATEGORIES, ASSOC_CHILDREN, ASSOC_SUBCATEGORIES,
    CATEGORY_ROOT_QNAME, CM_URI, MEMBER_SEGMENT, PROP_NAME, TYPE_CATEGORY,
};
use crate::core::model::{ChildAssocRef, NodeRef, PropertyValue, QName, StoreRef};
use crate::core::store::NodeService;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of index rows fetched per category query
pub const DEFAULT_FETCH_SIZE: usize = 5000;

/// [`CategoryService`] over a node store and its index
pub struct IndexCategoryService {
    nodes: Arc<dyn NodeService>,
    searcher: Arc<IndexSearcher>,
    prefixes: Arc<PrefixCache>,
    fetch_size: usize,
}

/// Resolved associations plus the number of stale rows dropped on the way
type Resolved = (Vec<ChildAssocRef>, usize);

impl IndexCategoryService {
    pub fn new(
        nodes: Arc<dyn NodeService>,
        searcher: Arc<IndexSearcher>,
        prefixes: Arc<PrefixCache>,
    ) -> Self {
        Self {
            nodes,
            searcher,
            prefixes,
            fetch_size: DEFAULT_FETCH_SIZE,
        }
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    /// Lucene query for the children of `category`
    pub fn children_query(
        &self,
        category: &NodeRef,
        mode: Mode,
        depth: Depth,
        exact_names: &[String],
        like_names: &[String],
    ) -> Result<String> {
        let path = self.prefixes.path_string(&self.nodes.path(category)?)?;
        let base = path.trim_end_matches('/');
        let marker = match depth {
            Depth::Immediate => "/",
            Depth::Any => "//",
        };

        let mut query = match mode {
            Mode::All => format!("PATH:\"{base}{marker}*\""),
            Mode::Members => format!("PATH:\"{base}{marker}{MEMBER_SEGMENT}\""),
            Mode::SubCategories => format!(
                "+PATH:\"{base}{marker}*\" +TYPE:\"{}\"",
                self.prefixes.prefixed(&TYPE_CATEGORY)?
            ),
        };

        let mut names: Vec<String> = exact_names.iter().map(|n| escape_exact(n)).collect();
        names.extend(like_names.iter().map(|n| escape_like(n)));
        if !names.is_empty() {
            let field = self.prefixes.prefixed(&PROP_NAME)?.replace(':', "\\:");
            let clauses: Vec<String> = names
                .iter()
                .map(|name| format!("@{field}:\"{name}\""))
                .collect();
            query.push_str(" AND (");
            query.push_str(&clauses.join(" OR "));
            query.push(')');
        }
        Ok(query)
    }

    /// Run a query and map every row to its node's primary parent association
    fn resolve_query(&self, store: &StoreRef, query: &str) -> Result<Resolved> {
        let params = SearchParameters::lucene(store, query)
            .max_items(self.fetch_size)
            .build();
        debug!(query = query, "Executing category query");
        let mut results = self.searcher.query(&params)?;

        let mut assocs = Vec::with_capacity(results.len());
        let mut stale = 0;
        for row in results.rows() {
            match self.resolve_row(&row.node)? {
                RowResolution::Resolved(assoc) => assocs.push(assoc),
                RowResolution::Stale(_) => stale += 1,
            }
        }
        results.close();
        Ok((assocs, stale))
    }

    fn resolve_row(&self, node: &NodeRef) -> Result<RowResolution<ChildAssocRef>> {
        match self.nodes.primary_parent(node) {
            Ok(assoc) => Ok(RowResolution::Resolved(assoc)),
            Err(e) if e.is_stale_reference() => {
                debug!(node = %node, "Skipping index row for missing node");
                Ok(RowResolution::Stale(node.clone()))
            }
            Err(e) => Err(e),
        }
    }

    fn query_children(
        &self,
        category: &NodeRef,
        mode: Mode,
        depth: Depth,
        exact_names: &[String],
        like_names: &[String],
    ) -> Result<Resolved> {
        let query = self.children_query(category, mode, depth, exact_names, like_names)?;
        self.resolve_query(category.store_ref(), &query)
    }

    /// Sub-categories named in `names`, read from the store
    fn exact_from_store(
        &self,
        category: &NodeRef,
        mode: Mode,
        depth: Depth,
        names: &[String],
    ) -> Result<Vec<ChildAssocRef>> {
        if mode == Mode::Members {
            return Ok(Vec::new());
        }
        let wanted: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let dictionary = self.nodes.dictionary();

        let mut found = Vec::new();
        let mut pending = vec![category.clone()];
        while let Some(current) = pending.pop() {
            for assoc in self
                .nodes
                .child_assocs(&current, Some(&ASSOC_SUBCATEGORIES), None)?
            {
                if depth == Depth::Any {
                    pending.push(assoc.child.clone());
                }
                if mode == Mode::SubCategories
                    && !dictionary.is_sub_class(&self.nodes.node_type(&assoc.child)?, &TYPE_CATEGORY)
                {
                    continue;
                }
                let name = self.display_name(&assoc);
                if wanted.contains(&name.to_lowercase()) {
                    found.push(assoc);
                }
            }
        }
        Ok(found)
    }

    /// Classification nodes for `aspect`; empty when the store has no category root
    fn classification_nodes(&self, store: &StoreRef, aspect: &QName) -> Result<Vec<NodeRef>> {
        let Some(category_root) = self.get_root_category_node(store)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .nodes
            .child_assocs(&category_root, Some(&ASSOC_CATEGORIES), Some(aspect))?
            .into_iter()
            .map(|assoc| assoc.child)
            .collect())
    }

    /// Association qname of a sub-category `name` under `parent`: the namespace
    /// of the parent's primary association, `cm` for a parent without one
    fn child_qname(&self, parent: &NodeRef, name: &str) -> Result<QName> {
        let namespace = self
            .nodes
            .primary_parent(parent)?
            .qname
            .map(|q| q.namespace().to_string())
            .unwrap_or_else(|| CM_URI.to_string());
        Ok(QName::new(namespace, QName::create_valid_local_name(name)?))
    }

    /// `cm:name` of the child, else the association's local name
    fn display_name(&self, assoc: &ChildAssocRef) -> String {
        match self.nodes.property(&assoc.child, &PROP_NAME) {
            Ok(Some(PropertyValue::Text(name))) => name,
            _ => assoc
                .qname
                .as_ref()
                .map(|q| q.local_name().to_string())
                .unwrap_or_default(),
        }
    }

    /// De-duplicate, optionally sort by name, then cut the requested page
    fn finish(
        &self,
        assocs: Vec<ChildAssocRef>,
        stale: usize,
        sort_by_name: bool,
        paging: PagingRequest,
    ) -> PagingResults<ChildAssocRef> {
        let mut seen = HashSet::new();
        let mut unique: Vec<ChildAssocRef> = assocs
            .into_iter()
            .filter(|assoc| seen.insert(assoc.child.clone()))
            .collect();
        if sort_by_name {
            let mut keyed: Vec<(String, ChildAssocRef)> = unique
                .into_iter()
                .map(|assoc| (self.display_name(&assoc).to_lowercase(), assoc))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            unique = keyed.into_iter().map(|(_, assoc)| assoc).collect();
        }
        let mut page = paging.page(unique);
        page.skipped_stale = stale;
        page
    }
}

impl CategoryService for IndexCategoryService {
    fn get_children(
        &self,
        category: Option<&NodeRef>,
        mode: Mode,
        depth: Depth,
    ) -> Result<Vec<ChildAssocRef>> {
        let Some(category) = category else {
            return Ok(Vec::new());
        };
        let (assocs, _) = self.query_children(category, mode, depth, &[], &[])?;
        Ok(assocs)
    }

    fn get_children_filtered(
        &self,
        category: Option<&NodeRef>,
        mode: Mode,
        depth: Depth,
        filter: &ChildrenFilter,
    ) -> Result<PagingResults<ChildAssocRef>> {
        let Some(category) = category else {
            return Ok(PagingResults::empty());
        };

        let (assocs, stale) = if filter.exact_names.is_empty() || filter.like_names.is_empty() {
            self.query_children(category, mode, depth, &filter.exact_names, &filter.like_names)?
        } else {
            let mut assocs = self.exact_from_store(category, mode, depth, &filter.exact_names)?;
            let mut stale = 0;
            if mode != Mode::SubCategories {
                // members only exist in the index
                let (members, skipped) =
                    self.query_children(category, Mode::Members, depth, &filter.exact_names, &[])?;
                assocs.extend(members);
                stale += skipped;
            }
            let (liked, skipped) =
                self.query_children(category, mode, depth, &[], &filter.like_names)?;
            assocs.extend(liked);
            (assocs, stale + skipped)
        };

        Ok(self.finish(assocs, stale, filter.sort_by_name, filter.paging))
    }

    fn get_categories(
        &self,
        store: &StoreRef,
        aspect: &QName,
        depth: Depth,
    ) -> Result<Vec<ChildAssocRef>> {
        let mut out = Vec::new();
        for classification in self.classification_nodes(store, aspect)? {
            out.extend(self.get_children(Some(&classification), Mode::SubCategories, depth)?);
        }
        Ok(out)
    }

    fn get_classifications(&self, store: &StoreRef) -> Result<Vec<ChildAssocRef>> {
        let query = format!(
            "PATH:\"//{}/*\"",
            self.prefixes.encode(&CATEGORY_ROOT_QNAME)?
        );
        let (assocs, _) = self.resolve_query(store, &query)?;
        Ok(assocs)
    }

    fn get_classification_aspects(&self) -> Vec<QName> {
        self.nodes
            .dictionary()
            .sub_aspects(&ASPECT_CLASSIFIABLE, true)
    }

    fn get_root_categories(&self, store: &StoreRef, aspect: &QName) -> Result<Vec<ChildAssocRef>> {
        let mut out = Vec::new();
        for classification in self.classification_nodes(store, aspect)? {
            out.extend(self.nodes.child_assocs(
                &classification,
                Some(&ASSOC_SUBCATEGORIES),
                None,
            )?);
        }
        Ok(out)
    }

    fn get_root_categories_named(
        &self,
        store: &StoreRef,
        aspect: &QName,
        name: &str,
        create: bool,
    ) -> Result<Vec<ChildAssocRef>> {
        let classifications = self.classification_nodes(store, aspect)?;

        let mut out = Vec::new();
        for classification in &classifications {
            let qname = self.child_qname(classification, name)?;
            out.extend(self.nodes.child_assocs(
                classification,
                Some(&ASSOC_SUBCATEGORIES),
                Some(&qname),
            )?);
        }

        if out.is_empty() && create {
            if let Some(classification) = classifications.first() {
                let category = self.create_category(classification, name)?;
                info!(aspect = %aspect, name = name, node = %category, "Created root category");
                out.push(self.nodes.primary_parent(&category)?);
            }
        }
        Ok(out)
    }

    fn get_root_categories_paged(
        &self,
        store: &StoreRef,
        aspect: &QName,
        filter: &ChildrenFilter,
    ) -> Result<PagingResults<ChildAssocRef>> {
        if filter.exact_names.is_empty() && filter.like_names.is_empty() {
            let roots = self.get_root_categories(store, aspect)?;
            return Ok(self.finish(roots, 0, filter.sort_by_name, filter.paging));
        }

        let unpaged = ChildrenFilter {
            paging: PagingRequest::all(),
            sort_by_name: false,
            ..filter.clone()
        };
        let mut assocs = Vec::new();
        let mut stale = 0;
        for classification in self.classification_nodes(store, aspect)? {
            let found = self.get_children_filtered(
                Some(&classification),
                Mode::SubCategories,
                Depth::Immediate,
                &unpaged,
            )?;
            stale += found.skipped_stale;
            assocs.extend(found.page);
        }
        Ok(self.finish(assocs, stale, filter.sort_by_name, filter.paging))
    }

    fn get_category(&self, parent: &NodeRef, _aspect: &QName, name: &str) -> Result<Option<NodeRef>> {
        let qname = self.child_qname(parent, name)?;
        Ok(self
            .nodes
            .child_assocs(parent, Some(&ASSOC_SUBCATEGORIES), Some(&qname))?
            .into_iter()
            .next()
            .map(|assoc| assoc.child))
    }

    fn get_top_categories(
        &self,
        store: &StoreRef,
        aspect: &QName,
        count: usize,
    ) -> Result<Vec<(NodeRef, usize)>> {
        let property = self
            .nodes
            .dictionary()
            .category_property(aspect)
            .ok_or_else(|| {
                TaxaError::InvalidArgument(format!("Aspect has no category property: {aspect}"))
            })?;

        if count == 0 {
            return Ok(Vec::new());
        }

        // unlimited facet so deleted categories do not eat into `count`
        let query = format!("ASPECT:\"{}\"", self.prefixes.prefixed(aspect)?);
        let params = SearchParameters::lucene(store, query.as_str())
            .max_items(0)
            .facet(FieldFacet::new(property.clone()))
            .build();
        debug!(query = %query, "Executing top categories query");
        let mut results = self.searcher.query(&params)?;

        let mut out = Vec::new();
        for bucket in results.facet(&property) {
            let category: NodeRef = match bucket.value.parse() {
                Ok(node) => node,
                Err(_) => continue,
            };
            if !self.nodes.exists(&category) {
                debug!(node = %category, "Skipping facet for missing category");
                continue;
            }
            out.push((category, bucket.count));
            if out.len() == count {
                break;
            }
        }
        results.close();
        Ok(out)
    }

    fn get_root_category_node(&self, store: &StoreRef) -> Result<Option<NodeRef>> {
        let root = self.nodes.root_node(store)?;
        Ok(self
            .nodes
            .child_assocs(&root, Some(&ASSOC_CHILDREN), Some(&CATEGORY_ROOT_QNAME))?
            .into_iter()
            .next()
            .map(|assoc| assoc.child))
    }

    fn create_root_category(
        &self,
        store: &StoreRef,
        aspect: &QName,
        name: &str,
    ) -> Result<NodeRef> {
        if self.get_root_category_node(store)?.is_none() {
            return Err(TaxaError::MissingCategoryRoot(store.to_string()));
        }
        let classification = self
            .classification_nodes(store, aspect)?
            .into_iter()
            .next()
            .ok_or_else(|| TaxaError::MissingClassification(aspect.to_string()))?;
        self.create_category(&classification, name)
    }

    fn create_category(&self, parent: &NodeRef, name: &str) -> Result<NodeRef> {
        if !self.nodes.exists(parent) {
            return Err(TaxaError::MissingCategory(parent.to_string()));
        }
        let qname = self.child_qname(parent, name)?;
        let properties = BTreeMap::from([(PROP_NAME.clone(), PropertyValue::text(name))]);
        let assoc = self.nodes.create_node(
            parent,
            &ASSOC_SUBCATEGORIES,
            &qname,
            &TYPE_CATEGORY,
            properties,
        )?;
        info!(parent = %parent, name = name, node = %assoc.child, "Created category");
        Ok(assoc.child)
    }

    fn delete_category(&self, category: &NodeRef) -> Result<()> {
        self.nodes.delete_node(category)?;
        info!(node = %category, "Deleted category");
        Ok(())
    }

    fn create_classification(
        &self,
        _store: &StoreRef,
        aspect: &QName,
        _attribute_name: &str,
    ) -> Result<NodeRef> {
        Err(TaxaError::Unsupported(format!(
            "Creating classification {aspect}"
        )))
    }

    fn delete_classification(&self, _store: &StoreRef, aspect: &QName) -> Result<()> {
        Err(TaxaError::Unsupported(format!(
            "Deleting classification {aspect}"
        )))
    }
}

/// Quote an exact name for a phrase value: wildcards lose their meaning
fn escape_exact(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | '"' | '*' | '?') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Quote a wildcard pattern for a phrase value, keeping `*` and `?`
fn escape_like(pattern: &str) -> String {
    pattern.replace('"', "\\\"")
}
