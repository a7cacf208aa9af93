//! Index schema and node documents.

use crate::core::error::{Result, TaxaError};
use crate::core::model::{NodeRef, PropertyValue, QName, StoreRef};
use std::collections::{BTreeMap, BTreeSet};
use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};
use tantivy::TantivyDocument;

/// Current schema version
/// Version 1: Initial schema (paths, types, aspects, property terms, stored properties)
pub const SCHEMA_VERSION: u32 = 1;

pub const FIELD_ID: &str = "id";
pub const FIELD_STORE: &str = "store";
pub const FIELD_PATH: &str = "path";
pub const FIELD_PARENT: &str = "parent";
pub const FIELD_PRIMARY_PARENT: &str = "primary_parent";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_EXACT_TYPE: &str = "exact_type";
pub const FIELD_ASPECT: &str = "aspect";
pub const FIELD_QNAME: &str = "qname";
pub const FIELD_PROP: &str = "prop";
pub const FIELD_PROP_TOKEN: &str = "prop_token";
pub const FIELD_PROP_PRESENT: &str = "prop_present";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_PROPS: &str = "props";

/// Create the Tantivy schema for node indexing
///
/// Fields:
/// - id: Node reference (STRING | STORED)
/// - store: Store reference (STRING)
/// - path: Every prefix-form path of the node, plus `<category>/member` paths (STRING)
/// - parent / primary_parent: Parent node references (STRING)
/// - type: Node type and its supertypes, `{uri}local` (STRING)
/// - exact_type: Node type only (STRING)
/// - aspect: Applied aspects and their ancestors (STRING)
/// - qname: Parent association qnames (STRING)
/// - prop: `{uri}local=value`, value lowercased (STRING)
/// - prop_token: `{uri}local#token` for each word of text values (STRING)
/// - prop_present: `{uri}local` for every set property (STRING)
/// - text: All text property values (TEXT)
/// - props: JSON of all property values (STORED)
pub fn create_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(FIELD_ID, STRING | STORED);
    builder.add_text_field(FIELD_STORE, STRING);

    // Structure
    builder.add_text_field(FIELD_PATH, STRING);
    builder.add_text_field(FIELD_PARENT, STRING);
    builder.add_text_field(FIELD_PRIMARY_PARENT, STRING);
    builder.add_text_field(FIELD_QNAME, STRING);

    // Classes
    builder.add_text_field(FIELD_TYPE, STRING);
    builder.add_text_field(FIELD_EXACT_TYPE, STRING);
    builder.add_text_field(FIELD_ASPECT, STRING);

    // Properties
    builder.add_text_field(FIELD_PROP, STRING);
    builder.add_text_field(FIELD_PROP_TOKEN, STRING);
    builder.add_text_field(FIELD_PROP_PRESENT, STRING);
    builder.add_text_field(FIELD_TEXT, TEXT);
    builder.add_text_field(FIELD_PROPS, STORED);

    builder.build()
}

/// Resolved schema fields
#[derive(Debug, Clone, Copy)]
pub struct IndexFields {
    pub id: Field,
    pub store: Field,
    pub path: Field,
    pub parent: Field,
    pub primary_parent: Field,
    pub node_type: Field,
    pub exact_type: Field,
    pub aspect: Field,
    pub qname: Field,
    pub prop: Field,
    pub prop_token: Field,
    pub prop_present: Field,
    pub text: Field,
    pub props: Field,
}

impl IndexFields {
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| TaxaError::IndexError(format!("Missing {name} field: {e}")))
        };
        Ok(Self {
            id: field(FIELD_ID)?,
            store: field(FIELD_STORE)?,
            path: field(FIELD_PATH)?,
            parent: field(FIELD_PARENT)?,
            primary_parent: field(FIELD_PRIMARY_PARENT)?,
            node_type: field(FIELD_TYPE)?,
            exact_type: field(FIELD_EXACT_TYPE)?,
            aspect: field(FIELD_ASPECT)?,
            qname: field(FIELD_QNAME)?,
            prop: field(FIELD_PROP)?,
            prop_token: field(FIELD_PROP_TOKEN)?,
            prop_present: field(FIELD_PROP_PRESENT)?,
            text: field(FIELD_TEXT)?,
            props: field(FIELD_PROPS)?,
        })
    }
}

/// Term stored in the `prop` field
pub fn property_term(name: &QName, value: &str) -> String {
    format!("{name}={}", value.to_lowercase())
}

/// Term stored in the `prop_token` field
pub fn property_token_term(name: &QName, token: &str) -> String {
    format!("{name}#{token}")
}

/// Split text the way the default tokenizer does: alphanumeric runs, lowercased
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Everything the index knows about one node
#[derive(Debug, Clone)]
pub struct NodeDocument {
    pub node: NodeRef,
    pub store: StoreRef,
    pub paths: BTreeSet<String>,
    pub parents: BTreeSet<NodeRef>,
    pub primary_parent: Option<NodeRef>,
    pub qnames: BTreeSet<QName>,
    pub types: Vec<QName>,
    pub exact_type: QName,
    pub aspects: BTreeSet<QName>,
    pub properties: BTreeMap<QName, PropertyValue>,
}

impl NodeDocument {
    pub fn to_tantivy(&self, fields: &IndexFields) -> Result<TantivyDocument> {
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.id, self.node.to_string());
        doc.add_text(fields.store, self.store.to_string());

        for path in &self.paths {
            doc.add_text(fields.path, path);
        }
        for parent in &self.parents {
            doc.add_text(fields.parent, parent.to_string());
        }
        if let Some(primary) = &self.primary_parent {
            doc.add_text(fields.primary_parent, primary.to_string());
        }
        for qname in &self.qnames {
            doc.add_text(fields.qname, qname.to_string());
        }

        for class in &self.types {
            doc.add_text(fields.node_type, class.to_string());
        }
        doc.add_text(fields.exact_type, self.exact_type.to_string());
        for aspect in &self.aspects {
            doc.add_text(fields.aspect, aspect.to_string());
        }

        let mut full_text = Vec::new();
        for (name, value) in &self.properties {
            doc.add_text(fields.prop_present, name.to_string());
            for single in value.flatten() {
                let text = single.to_text();
                doc.add_text(fields.prop, property_term(name, &text));
                if let PropertyValue::Text(s) = single {
                    for token in tokenize(s) {
                        doc.add_text(fields.prop_token, property_token_term(name, &token));
                    }
                    full_text.push(s.clone());
                }
            }
        }
        if !full_text.is_empty() {
            doc.add_text(fields.text, full_text.join(" "));
        }
        doc.add_text(fields.props, serde_json::to_string(&self.properties)?);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_all_fields() {
        let schema = create_schema();
        assert!(IndexFields::from_schema(&schema).is_ok());
        assert!(schema.get_field(FIELD_PATH).is_ok());
        assert!(schema.get_field(FIELD_PROPS).is_ok());
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Fixed-Income  funds, 2024"), vec!["fixed", "income", "funds", "2024"]);
        assert!(tokenize(" -- ").is_empty());
    }

    #[test]
    fn test_property_term_lowercases_value() {
        let name = QName::new("http://x", "name");
        assert_eq!(property_term(&name, "Software"), "{http://x}name=software");
    }
}
