//! Property values stored on nodes.

use super::node::NodeRef;
use super::qname::QName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    NodeRef(NodeRef),
    QName(QName),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn text(s: impl Into<String>) -> Self {
        PropertyValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Single values, with lists flattened
    pub fn flatten(&self) -> Vec<&PropertyValue> {
        match self {
            PropertyValue::List(items) => items.iter().flat_map(|v| v.flatten()).collect(),
            other => vec![other],
        }
    }

    /// Node references held by this value (directly or in a list)
    pub fn node_refs(&self) -> Vec<&NodeRef> {
        self.flatten()
            .into_iter()
            .filter_map(|v| match v {
                PropertyValue::NodeRef(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// Text form used for matching and for comparing mixed kinds
    pub fn to_text(&self) -> String {
        match self {
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Date(d) => d.to_rfc3339(),
            PropertyValue::NodeRef(n) => n.to_string(),
            PropertyValue::QName(q) => q.to_string(),
            PropertyValue::List(items) => items
                .iter()
                .map(|v| v.to_text())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Numeric view, when the value is a number or numeric text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Total order: same kinds compare naturally, mixed kinds by text form
    pub fn compare(&self, other: &PropertyValue) -> Ordering {
        use PropertyValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(_) | Float(_), Integer(_) | Float(_)) => self
                .as_f64()
                .zip(other.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b))
                .unwrap_or(Ordering::Equal),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)),
            _ => self.to_text().cmp(&other.to_text()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<NodeRef> for PropertyValue {
    fn from(value: NodeRef) -> Self {
        PropertyValue::NodeRef(value)
    }
}

impl From<Vec<NodeRef>> for PropertyValue {
    fn from(value: Vec<NodeRef>) -> Self {
        PropertyValue::List(value.into_iter().map(PropertyValue::NodeRef).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::node::StoreRef;

    #[test]
    fn test_flatten_and_node_refs() {
        let store = StoreRef::spaces_store();
        let a = NodeRef::generate(&store);
        let b = NodeRef::generate(&store);
        let value = PropertyValue::from(vec![a.clone(), b.clone()]);
        assert_eq!(value.flatten().len(), 2);
        assert_eq!(value.node_refs(), vec![&a, &b]);
    }

    #[test]
    fn test_compare_numbers_across_kinds() {
        assert_eq!(
            PropertyValue::Integer(2).compare(&PropertyValue::Float(2.5)),
            Ordering::Less
        );
        assert_eq!(
            PropertyValue::Integer(10).compare(&PropertyValue::Integer(9)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_text_case_insensitive_first() {
        assert_eq!(
            PropertyValue::text("apple").compare(&PropertyValue::text("Banana")),
            Ordering::Less
        );
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_string(&PropertyValue::Integer(3)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":3}"#);
    }
}
