//! Repository data model: names, references, values and the dictionary.

pub mod content;
pub mod dictionary;
pub mod iso9075;
pub mod node;
pub mod qname;
pub mod value;

pub use dictionary::{ClassDefinition, Dictionary, PropertyDefinition};
pub use node::{encode_qname, ChildAssocRef, NodeRef, Path, StoreRef};
pub use qname::{NamespacePrefixResolver, NamespaceRegistry, QName};
pub use value::PropertyValue;
