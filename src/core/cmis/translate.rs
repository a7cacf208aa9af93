//! Mapping of CMIS statements onto index query trees.

use super::parser::{CmisQuery, ColumnRef, Comparison, Condition, Literal, OrderBy};
use crate::core::error::{Result, TaxaError};
use crate::core::index::{QueryField, QueryNode, SortDefinition};
use crate::core::model::content::{PROP_CREATED, PROP_MODIFIED, PROP_NAME, TYPE_CONTENT, TYPE_FOLDER};
use crate::core::model::{NamespacePrefixResolver, NodeRef, QName};
use crate::core::store::NodeService;

pub const CMIS_DOCUMENT: &str = "cmis:document";
pub const CMIS_FOLDER: &str = "cmis:folder";

/// A column as the index sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmisColumn {
    ObjectId,
    ObjectTypeId,
    ParentId,
    Property(QName),
}

impl CmisColumn {
    /// Resolve a CMIS property id or a repository property name
    pub fn resolve(name: &str, resolver: &dyn NamespacePrefixResolver) -> Result<Self> {
        match name {
            "cmis:objectId" => Ok(CmisColumn::ObjectId),
            "cmis:objectTypeId" | "cmis:baseTypeId" => Ok(CmisColumn::ObjectTypeId),
            "cmis:parentId" => Ok(CmisColumn::ParentId),
            "cmis:name" => Ok(CmisColumn::Property(PROP_NAME.clone())),
            "cmis:creationDate" => Ok(CmisColumn::Property(PROP_CREATED.clone())),
            "cmis:lastModificationDate" => Ok(CmisColumn::Property(PROP_MODIFIED.clone())),
            other if other.starts_with("cmis:") => Err(TaxaError::InvalidQuery(format!(
                "Unknown CMIS property: {other}"
            ))),
            other => Ok(CmisColumn::Property(QName::resolve(other, resolver)?)),
        }
    }
}

/// Repository type a CMIS type id stands for
pub fn resolve_type(name: &str, resolver: &dyn NamespacePrefixResolver) -> Result<QName> {
    match name {
        CMIS_DOCUMENT => Ok(TYPE_CONTENT.clone()),
        CMIS_FOLDER => Ok(TYPE_FOLDER.clone()),
        other if other.starts_with("cmis:") => Err(TaxaError::InvalidQuery(format!(
            "Unknown CMIS type: {other}"
        ))),
        other => QName::resolve(other, resolver),
    }
}

/// Translates parsed CMIS statements into index queries
pub struct CmisTranslator<'a> {
    nodes: &'a dyn NodeService,
    resolver: &'a dyn NamespacePrefixResolver,
}

impl<'a> CmisTranslator<'a> {
    pub fn new(nodes: &'a dyn NodeService, resolver: &'a dyn NamespacePrefixResolver) -> Self {
        Self { nodes, resolver }
    }

    /// Query tree restricted to the FROM type
    pub fn query(&self, query: &CmisQuery) -> Result<QueryNode> {
        let from = resolve_type(&query.from, self.resolver)?;
        let type_clause = QueryNode::field(QueryField::Type, from.to_string());
        match &query.condition {
            None => Ok(type_clause),
            Some(condition) => Ok(QueryNode::all_of(vec![
                type_clause,
                self.condition(query, condition)?,
            ])),
        }
    }

    /// ORDER BY as sort definitions
    pub fn sort(&self, query: &CmisQuery) -> Result<Vec<SortDefinition>> {
        query
            .order_by
            .iter()
            .map(|order| self.sort_definition(query, order))
            .collect()
    }

    /// Check an alias qualifier and resolve the column
    pub fn column(&self, query: &CmisQuery, column: &ColumnRef) -> Result<CmisColumn> {
        if let Some(qualifier) = &column.qualifier {
            let known = query.alias.as_deref() == Some(qualifier.as_str()) || *qualifier == query.from;
            if !known {
                return Err(TaxaError::InvalidQuery(format!(
                    "Unknown qualifier '{qualifier}' on {}",
                    column.property
                )));
            }
        }
        CmisColumn::resolve(&column.property, self.resolver)
    }

    fn sort_definition(&self, query: &CmisQuery, order: &OrderBy) -> Result<SortDefinition> {
        match self.column(query, &order.column)? {
            CmisColumn::Property(name) => Ok(SortDefinition::property(name, order.ascending)),
            _ => Err(TaxaError::Unsupported(format!(
                "Cannot order by {}",
                order.column.property
            ))),
        }
    }

    fn condition(&self, query: &CmisQuery, condition: &Condition) -> Result<QueryNode> {
        match condition {
            Condition::And(parts) => Ok(QueryNode::all_of(
                parts
                    .iter()
                    .map(|p| self.condition(query, p))
                    .collect::<Result<_>>()?,
            )),
            Condition::Or(parts) => Ok(QueryNode::any_of(
                parts
                    .iter()
                    .map(|p| self.condition(query, p))
                    .collect::<Result<_>>()?,
            )),
            Condition::Not(inner) => Ok(QueryNode::negate(self.condition(query, inner)?)),
            Condition::Compare { column, op, value } => {
                let column = self.column(query, column)?;
                let matches = self.equals(&column, value)?;
                Ok(match op {
                    Comparison::Equal => matches,
                    Comparison::NotEqual => self.present_and_not(&column, matches),
                })
            }
            Condition::Like {
                column,
                pattern,
                negated,
            } => {
                let column = self.column(query, column)?;
                let CmisColumn::Property(name) = &column else {
                    return Err(TaxaError::Unsupported(format!(
                        "LIKE is not supported on {}",
                        describe(&column)
                    )));
                };
                let matches = QueryNode::field(
                    QueryField::Property(name.to_string()),
                    like_to_wildcard(pattern),
                );
                Ok(if *negated {
                    self.present_and_not(&column, matches)
                } else {
                    matches
                })
            }
            Condition::In {
                column,
                values,
                negated,
            } => {
                let column = self.column(query, column)?;
                let alternatives = values
                    .iter()
                    .map(|v| self.equals(&column, v))
                    .collect::<Result<Vec<_>>>()?;
                let matches = QueryNode::any_of(alternatives);
                Ok(if *negated {
                    self.present_and_not(&column, matches)
                } else {
                    matches
                })
            }
            Condition::Null { column, negated } => match self.column(query, column)? {
                CmisColumn::Property(name) => {
                    let field = if *negated {
                        QueryField::IsNotNull
                    } else {
                        QueryField::IsNull
                    };
                    Ok(QueryNode::field(field, name.to_string()))
                }
                // every node has an id, a type and (except the root) a parent
                _ if *negated => Ok(QueryNode::All),
                _ => Ok(QueryNode::negate(QueryNode::All)),
            },
            Condition::InFolder(folder) => {
                let folder = self.node_ref(folder)?;
                Ok(QueryNode::field(QueryField::Parent, folder.to_string()))
            }
            Condition::InTree(folder) => {
                let folder = self.node_ref(folder)?;
                let path = self.nodes.path(&folder)?.to_prefix_string(self.resolver)?;
                let pattern = if path == "/" {
                    "//*".to_string()
                } else {
                    format!("{path}//*")
                };
                Ok(QueryNode::field(QueryField::Path, pattern))
            }
            Condition::Contains(text) => Ok(QueryNode::field(QueryField::Text, text.clone())),
        }
    }

    fn equals(&self, column: &CmisColumn, value: &Literal) -> Result<QueryNode> {
        let text = value.to_text();
        Ok(match column {
            CmisColumn::ObjectId => QueryNode::field(QueryField::Id, self.node_ref(&text)?.to_string()),
            CmisColumn::ParentId => {
                QueryNode::field(QueryField::Parent, self.node_ref(&text)?.to_string())
            }
            CmisColumn::ObjectTypeId => QueryNode::field(
                QueryField::ExactType,
                resolve_type(&text, self.resolver)?.to_string(),
            ),
            CmisColumn::Property(name) => {
                QueryNode::field(QueryField::Property(name.to_string()), escape_wildcards(&text))
            }
        })
    }

    /// `<>` semantics: the property must be set and differ
    fn present_and_not(&self, column: &CmisColumn, matches: QueryNode) -> QueryNode {
        match column {
            CmisColumn::Property(name) => QueryNode::all_of(vec![
                QueryNode::field(QueryField::IsNotNull, name.to_string()),
                QueryNode::negate(matches),
            ]),
            _ => QueryNode::negate(matches),
        }
    }

    fn node_ref(&self, text: &str) -> Result<NodeRef> {
        let node: NodeRef = text.trim().parse()?;
        if !self.nodes.exists(&node) {
            return Err(TaxaError::InvalidNodeRef(node.to_string()));
        }
        Ok(node)
    }
}

fn describe(column: &CmisColumn) -> String {
    match column {
        CmisColumn::ObjectId => "cmis:objectId".to_string(),
        CmisColumn::ObjectTypeId => "cmis:objectTypeId".to_string(),
        CmisColumn::ParentId => "cmis:parentId".to_string(),
        CmisColumn::Property(name) => name.to_string(),
    }
}

/// Literal text for a property match: index wildcards are escaped
pub fn escape_wildcards(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '?') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// SQL `%`/`_` pattern to index `*`/`?` wildcards.
/// `\%` and `\_` are literal; literal `*` and `?` are escaped.
pub fn like_to_wildcard(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push('*'),
            '_' => out.push('?'),
            '*' | '?' => {
                out.push('\\');
                out.push(c);
            }
            '\\' => match chars.next() {
                Some(next) if matches!(next, '*' | '?' | '\\') => {
                    out.push('\\');
                    out.push(next);
                }
                Some(next) => out.push(next),
                None => out.push_str("\\\\"),
            },
            other => out.push(other),
        }
    }
    out
}
