//! Translation of [`QueryNode`] trees into tantivy queries.

use super::path::path_to_regex;
use super::query::{Occur, QueryField, QueryNode};
use super::schema::{property_term, property_token_term, tokenize, IndexFields};
use crate::core::error::{Result, TaxaError};
use crate::core::model::{NamespacePrefixResolver, QName};
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur as TantivyOccur, Query, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;

/// Builds tantivy queries against the node index schema
pub struct QueryTranslator<'a> {
    fields: &'a IndexFields,
    resolver: &'a dyn NamespacePrefixResolver,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(fields: &'a IndexFields, resolver: &'a dyn NamespacePrefixResolver) -> Self {
        Self { fields, resolver }
    }

    pub fn translate(&self, node: &QueryNode) -> Result<Box<dyn Query>> {
        match node {
            QueryNode::All => Ok(Box::new(AllQuery)),
            QueryNode::Boolean(clauses) => self.boolean(clauses),
            QueryNode::Field { field, value } => self.field(field, value),
        }
    }

    fn boolean(&self, clauses: &[(Occur, QueryNode)]) -> Result<Box<dyn Query>> {
        let mut translated = Vec::with_capacity(clauses.len() + 1);
        for (occur, node) in clauses {
            let occur = match occur {
                Occur::Must => TantivyOccur::Must,
                Occur::Should => TantivyOccur::Should,
                Occur::MustNot => TantivyOccur::MustNot,
            };
            translated.push((occur, self.translate(node)?));
        }
        // a purely negative query matches nothing in tantivy
        if !translated.is_empty() && translated.iter().all(|(o, _)| *o == TantivyOccur::MustNot) {
            translated.push((TantivyOccur::Must, Box::new(AllQuery) as Box<dyn Query>));
        }
        Ok(Box::new(BooleanQuery::new(translated)))
    }

    fn field(&self, field: &QueryField, value: &str) -> Result<Box<dyn Query>> {
        let fields = self.fields;
        match field {
            QueryField::Path => {
                let pattern = path_to_regex(value, self.resolver)?;
                regex(&pattern, fields.path)
            }
            QueryField::Type => Ok(term(fields.node_type, &self.qname(value)?.to_string())),
            QueryField::ExactType => Ok(term(fields.exact_type, &self.qname(value)?.to_string())),
            QueryField::Aspect => Ok(term(fields.aspect, &self.qname(value)?.to_string())),
            QueryField::QName => {
                let qname = self.qname(value)?;
                let decoded = QName::new(
                    qname.namespace(),
                    crate::core::model::iso9075::decode(qname.local_name()),
                );
                Ok(term(fields.qname, &decoded.to_string()))
            }
            QueryField::Id => Ok(term(fields.id, value.trim())),
            QueryField::Parent => Ok(term(fields.parent, value.trim())),
            QueryField::PrimaryParent => Ok(term(fields.primary_parent, value.trim())),
            QueryField::IsNotNull => Ok(term(fields.prop_present, &self.qname(value)?.to_string())),
            QueryField::IsNull => {
                let present = term(fields.prop_present, &self.qname(value)?.to_string());
                Ok(Box::new(BooleanQuery::new(vec![
                    (TantivyOccur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (TantivyOccur::MustNot, present),
                ])))
            }
            QueryField::Text => self.text(fields.text, value, ""),
            QueryField::Property(name) => self.property(name, value),
        }
    }

    /// `@prop:value`: whole-value match, case-insensitive, wildcards allowed
    fn property(&self, name: &str, value: &str) -> Result<Box<dyn Query>> {
        let qname = self.qname(name)?;
        if has_wildcard(value) {
            let pattern = format!(
                "{}{}",
                regex::escape(&property_term(&qname, "")),
                wildcard_regex(&value.to_lowercase())
            );
            return regex(&pattern, self.fields.prop);
        }
        Ok(term(self.fields.prop, &property_term(&qname, &unescape(value))))
    }

    /// Every word of `value` must occur. Terms are `prefix` + token.
    fn text(&self, field: Field, value: &str, prefix: &str) -> Result<Box<dyn Query>> {
        let mut clauses: Vec<(TantivyOccur, Box<dyn Query>)> = Vec::new();
        for word in value.split_whitespace() {
            if has_wildcard(word) {
                let pattern = format!(
                    "{}{}",
                    regex::escape(prefix),
                    wildcard_regex(&word.to_lowercase())
                );
                clauses.push((TantivyOccur::Must, regex(&pattern, field)?));
                continue;
            }
            for token in tokenize(&unescape(word)) {
                clauses.push((TantivyOccur::Must, term(field, &format!("{prefix}{token}"))));
            }
        }
        if clauses.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Word match on one property, used for `contains`
    pub fn property_words(&self, name: &QName, text: &str) -> Result<Box<dyn Query>> {
        self.text(self.fields.prop_token, text, &property_token_term(name, ""))
    }

    fn qname(&self, value: &str) -> Result<QName> {
        QName::resolve(value.trim(), self.resolver)
    }
}

fn term(field: Field, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, text),
        IndexRecordOption::Basic,
    ))
}

fn regex(pattern: &str, field: Field) -> Result<Box<dyn Query>> {
    let query = RegexQuery::from_pattern(pattern, field)
        .map_err(|e| TaxaError::InvalidQuery(format!("Invalid pattern '{pattern}': {e}")))?;
    Ok(Box::new(query))
}

/// Whether the value holds an unescaped `*` or `?`
pub fn has_wildcard(value: &str) -> bool {
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '*' || c == '?' {
            return true;
        }
    }
    false
}

/// `*` and `?` wildcards to regex; escaped wildcards stay literal
pub fn wildcard_regex(value: &str) -> String {
    let mut out = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}

/// Drop the backslashes kept in front of escaped wildcards
fn unescape(value: &str) -> String {
    let mut out = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
