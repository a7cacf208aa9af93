//! Category service.
//!
//! Categories form trees beneath classification nodes:
//!
//! ```text
//! store root
//!   └─ cm:categoryRoot                 (sys:children)
//!        └─ cm:generalclassifiable     (cm:categories, one per aspect)
//!             └─ cm:Software           (cm:subcategories)
//!                  └─ cm:Databases     (cm:subcategories)
//! ```
//!
//! Lookups of children and members go through the index; lookups of named
//! root categories and exact-name filters read the store directly.

pub mod prefix;
pub mod service;

pub use prefix::PrefixCache;
pub use service::IndexCategoryService;

use crate::core::error::Result;
use crate::core::index::{PagingRequest, PagingResults};
use crate::core::model::{ChildAssocRef, NodeRef, QName, StoreRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which children of a category to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Sub-categories and members
    All,
    /// Nodes classified under the category
    Members,
    SubCategories,
}

/// How far below the category to look
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Immediate,
    Any,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::All => "all",
            Mode::Members => "members",
            Mode::SubCategories => "sub_categories",
        })
    }
}

impl FromStr for Mode {
    type Err = crate::core::error::TaxaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "all" => Ok(Mode::All),
            "members" => Ok(Mode::Members),
            "sub_categories" | "subcategories" => Ok(Mode::SubCategories),
            other => Err(crate::core::error::TaxaError::InvalidArgument(format!(
                "Unknown mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Depth::Immediate => "immediate",
            Depth::Any => "any",
        })
    }
}

impl FromStr for Depth {
    type Err = crate::core::error::TaxaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(Depth::Immediate),
            "any" => Ok(Depth::Any),
            other => Err(crate::core::error::TaxaError::InvalidArgument(format!(
                "Unknown depth: {other}"
            ))),
        }
    }
}

/// Name filtering, sorting and paging for children lookups
#[derive(Debug, Clone, Default)]
pub struct ChildrenFilter {
    pub paging: PagingRequest,
    pub sort_by_name: bool,
    /// Names matched exactly, ignoring case
    pub exact_names: Vec<String>,
    /// Patterns with `*` and `?` wildcards
    pub like_names: Vec<String>,
}

impl ChildrenFilter {
    pub fn exact<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            exact_names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn like<S: Into<String>>(patterns: impl IntoIterator<Item = S>) -> Self {
        Self {
            like_names: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_paging(mut self, paging: PagingRequest) -> Self {
        self.paging = paging;
        self
    }

    pub fn sorted_by_name(mut self) -> Self {
        self.sort_by_name = true;
        self
    }
}

/// Category lookups and maintenance
pub trait CategoryService: Send + Sync {
    /// Children of a category. `None` yields an empty list without querying.
    fn get_children(
        &self,
        category: Option<&NodeRef>,
        mode: Mode,
        depth: Depth,
    ) -> Result<Vec<ChildAssocRef>>;

    /// Children with name filters, sorting and paging
    fn get_children_filtered(
        &self,
        category: Option<&NodeRef>,
        mode: Mode,
        depth: Depth,
        filter: &ChildrenFilter,
    ) -> Result<PagingResults<ChildAssocRef>>;

    /// Sub-categories of every classification node for `aspect`
    fn get_categories(
        &self,
        store: &StoreRef,
        aspect: &QName,
        depth: Depth,
    ) -> Result<Vec<ChildAssocRef>>;

    /// Classification nodes of a store
    fn get_classifications(&self, store: &StoreRef) -> Result<Vec<ChildAssocRef>>;

    /// Aspects that define classifications
    fn get_classification_aspects(&self) -> Vec<QName>;

    /// Top-level categories of a classification
    fn get_root_categories(&self, store: &StoreRef, aspect: &QName) -> Result<Vec<ChildAssocRef>>;

    /// Top-level categories named `name`, created when missing and `create` is set
    fn get_root_categories_named(
        &self,
        store: &StoreRef,
        aspect: &QName,
        name: &str,
        create: bool,
    ) -> Result<Vec<ChildAssocRef>>;

    /// Top-level categories with name filters, sorting and paging
    fn get_root_categories_paged(
        &self,
        store: &StoreRef,
        aspect: &QName,
        filter: &ChildrenFilter,
    ) -> Result<PagingResults<ChildAssocRef>>;

    /// Sub-category of `parent` called `name`
    fn get_category(&self, parent: &NodeRef, aspect: &QName, name: &str) -> Result<Option<NodeRef>>;

    /// Most used categories of a classification with their member counts
    fn get_top_categories(
        &self,
        store: &StoreRef,
        aspect: &QName,
        count: usize,
    ) -> Result<Vec<(NodeRef, usize)>>;

    fn get_root_category_node(&self, store: &StoreRef) -> Result<Option<NodeRef>>;

    /// New top-level category under the first classification node for `aspect`
    fn create_root_category(&self, store: &StoreRef, aspect: &QName, name: &str)
        -> Result<NodeRef>;

    fn create_category(&self, parent: &NodeRef, name: &str) -> Result<NodeRef>;

    fn delete_category(&self, category: &NodeRef) -> Result<()>;

    fn create_classification(
        &self,
        store: &StoreRef,
        aspect: &QName,
        attribute_name: &str,
    ) -> Result<NodeRef>;

    fn delete_classification(&self, store: &StoreRef, aspect: &QName) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_and_depth_parse() {
        assert_eq!("sub-categories".parse::<Mode>().unwrap(), Mode::SubCategories);
        assert_eq!("MEMBERS".parse::<Mode>().unwrap(), Mode::Members);
        assert_eq!("any".parse::<Depth>().unwrap(), Depth::Any);
        assert!("deep".parse::<Depth>().is_err());
    }

    #[test]
    fn test_filter_builders() {
        let filter = ChildrenFilter::exact(["A", "B"])
            .sorted_by_name()
            .with_paging(PagingRequest::new(0, 10));
        assert_eq!(filter.exact_names, vec!["A", "B"]);
        assert!(filter.like_names.is_empty());
        assert!(filter.sort_by_name);
        assert_eq!(filter.paging.max_items, 10);
    }
}
