//! Built-in content model names.

use super::qname::QName;
use once_cell::sync::Lazy;

pub const SYS_PREFIX: &str = "sys";
pub const SYS_URI: &str = "http://www.taxa.dev/model/system/1.0";

pub const CM_PREFIX: &str = "cm";
pub const CM_URI: &str = "http://www.taxa.dev/model/content/1.0";

pub const DICTIONARY_PREFIX: &str = "d";
pub const DICTIONARY_URI: &str = "http://www.taxa.dev/model/dictionary/1.0";

/// Path segment under which category members are indexed
pub const MEMBER_SEGMENT: &str = "member";

fn sys(local: &str) -> QName {
    QName::new(SYS_URI, local)
}

fn cm(local: &str) -> QName {
    QName::new(CM_URI, local)
}

// Types
pub static TYPE_BASE: Lazy<QName> = Lazy::new(|| sys("base"));
pub static TYPE_STORE_ROOT: Lazy<QName> = Lazy::new(|| sys("store_root"));
pub static TYPE_CONTAINER: Lazy<QName> = Lazy::new(|| sys("container"));
pub static TYPE_CMOBJECT: Lazy<QName> = Lazy::new(|| cm("cmobject"));
pub static TYPE_FOLDER: Lazy<QName> = Lazy::new(|| cm("folder"));
pub static TYPE_CONTENT: Lazy<QName> = Lazy::new(|| cm("content"));
pub static TYPE_CATEGORY_ROOT: Lazy<QName> = Lazy::new(|| cm("category_root"));
pub static TYPE_CATEGORY: Lazy<QName> = Lazy::new(|| cm("category"));

// Associations
pub static ASSOC_CHILDREN: Lazy<QName> = Lazy::new(|| sys("children"));
pub static ASSOC_CONTAINS: Lazy<QName> = Lazy::new(|| cm("contains"));
pub static ASSOC_CATEGORIES: Lazy<QName> = Lazy::new(|| cm("categories"));
pub static ASSOC_SUBCATEGORIES: Lazy<QName> = Lazy::new(|| cm("subcategories"));

// Aspects
pub static ASPECT_CLASSIFIABLE: Lazy<QName> = Lazy::new(|| cm("classifiable"));
pub static ASPECT_GEN_CLASSIFIABLE: Lazy<QName> = Lazy::new(|| cm("generalclassifiable"));
pub static ASPECT_TITLED: Lazy<QName> = Lazy::new(|| cm("titled"));

// Properties
pub static PROP_NAME: Lazy<QName> = Lazy::new(|| cm("name"));
pub static PROP_TITLE: Lazy<QName> = Lazy::new(|| cm("title"));
pub static PROP_DESCRIPTION: Lazy<QName> = Lazy::new(|| cm("description"));
pub static PROP_CATEGORIES: Lazy<QName> = Lazy::new(|| cm("categories"));
pub static PROP_CREATED: Lazy<QName> = Lazy::new(|| cm("created"));
pub static PROP_MODIFIED: Lazy<QName> = Lazy::new(|| cm("modified"));

/// Association qname of the category root beneath the store root
pub static CATEGORY_ROOT_QNAME: Lazy<QName> = Lazy::new(|| cm("categoryRoot"));

// Data types
pub static DATATYPE_TEXT: Lazy<QName> = Lazy::new(|| QName::new(DICTIONARY_URI, "text"));
pub static DATATYPE_CATEGORY: Lazy<QName> = Lazy::new(|| QName::new(DICTIONARY_URI, "category"));
pub static DATATYPE_NODEREF: Lazy<QName> = Lazy::new(|| QName::new(DICTIONARY_URI, "noderef"));
pub static DATATYPE_DATETIME: Lazy<QName> = Lazy::new(|| QName::new(DICTIONARY_URI, "datetime"));
