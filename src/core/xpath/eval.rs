//! Path expression evaluation.

use super::navigator::NodeNavigator;
use super::parser::{Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::core::error::{Result, TaxaError};
use crate::core::index::schema::tokenize;
use crate::core::model::content::PROP_NAME;
use crate::core::model::{iso9075, ChildAssocRef, NamespacePrefixResolver, NodeRef, PropertyValue, QName};
use crate::core::search::like::compile_like;
use std::collections::{BTreeMap, HashSet};

/// One selected item
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A node, reached through this association
    Assoc(ChildAssocRef),
    /// A property value and the node carrying it
    Property {
        node: NodeRef,
        name: QName,
        value: PropertyValue,
    },
}

impl Item {
    /// Node the item is, or belongs to
    pub fn node(&self) -> &NodeRef {
        match self {
            Item::Assoc(assoc) => &assoc.child,
            Item::Property { node, .. } => node,
        }
    }
}

/// Intermediate value of an expression
#[derive(Debug, Clone)]
enum Value {
    Items(Vec<Item>),
    Text(String),
    Number(f64),
    Boolean(bool),
}

struct Context<'c> {
    item: &'c Item,
    position: usize,
    size: usize,
}

/// Evaluates parsed expressions against a [`NodeNavigator`]
pub struct Evaluator<'a> {
    navigator: &'a NodeNavigator<'a>,
    resolver: &'a dyn NamespacePrefixResolver,
    variables: &'a BTreeMap<String, PropertyValue>,
    expression: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        navigator: &'a NodeNavigator<'a>,
        resolver: &'a dyn NamespacePrefixResolver,
        variables: &'a BTreeMap<String, PropertyValue>,
        expression: &'a str,
    ) -> Self {
        Self {
            navigator,
            resolver,
            variables,
            expression,
        }
    }

    /// Items selected by `expr` with `context` as the context node
    pub fn select(&self, expr: &Expr, context: &NodeRef) -> Result<Vec<Item>> {
        let start = Item::Assoc(self.navigator.primary_assoc(context)?);
        let ctx = Context {
            item: &start,
            position: 1,
            size: 1,
        };
        match self.eval(expr, &ctx)? {
            Value::Items(items) => Ok(items),
            _ => Err(TaxaError::InvalidPathResult(format!(
                "Expression does not select nodes or properties: {}",
                self.expression
            ))),
        }
    }

    fn error(&self, reason: impl Into<String>) -> TaxaError {
        TaxaError::PathEvaluation {
            expression: self.expression.to_string(),
            reason: reason.into(),
        }
    }

    fn eval(&self, expr: &Expr, ctx: &Context<'_>) -> Result<Value> {
        match expr {
            Expr::Path(path) => Ok(Value::Items(self.path(path, ctx.item)?)),
            Expr::Union(members) => {
                let mut items = Vec::new();
                for member in members {
                    match self.eval(member, ctx)? {
                        Value::Items(found) => items.extend(found),
                        _ => return Err(self.error("Union operands must select items")),
                    }
                }
                Ok(Value::Items(dedupe(items)))
            }
            Expr::Or(left, right) => Ok(Value::Boolean(
                truthy(&self.eval(left, ctx)?) || truthy(&self.eval(right, ctx)?),
            )),
            Expr::And(left, right) => Ok(Value::Boolean(
                truthy(&self.eval(left, ctx)?) && truthy(&self.eval(right, ctx)?),
            )),
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                Ok(Value::Boolean(compare(*op, &left, &right)))
            }
            Expr::Literal(text) => Ok(Value::Text(text.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Variable(name) => match self.variables.get(name) {
                Some(value) => Ok(atom(value)),
                None => Err(self.error(format!("Unbound variable ${name}"))),
            },
            Expr::Function(name, args) => self.function(name, args, ctx),
        }
    }

    fn path(&self, path: &LocationPath, start: &Item) -> Result<Vec<Item>> {
        let mut current = if path.absolute {
            vec![Item::Assoc(self.navigator.root(start.node().store_ref())?)]
        } else {
            vec![start.clone()]
        };
        for step in &path.steps {
            let mut next = Vec::new();
            for item in &current {
                let candidates = self.axis(step, item)?;
                next.extend(self.filter(candidates, &step.predicates)?);
            }
            current = dedupe(next);
        }
        Ok(current)
    }

    fn axis(&self, step: &Step, item: &Item) -> Result<Vec<Item>> {
        let assocs = match (step.axis, item) {
            (Axis::Attribute, Item::Assoc(assoc)) => {
                let mut out = Vec::new();
                for (name, value) in self.navigator.properties(&assoc.child)? {
                    if self.matches(&step.test, Some(&name))? {
                        out.push(Item::Property {
                            node: assoc.child.clone(),
                            name,
                            value,
                        });
                    }
                }
                return Ok(out);
            }
            (Axis::SelfNode, Item::Property { name, .. }) => {
                let keep = self.matches(&step.test, Some(name))?;
                return Ok(if keep { vec![item.clone()] } else { Vec::new() });
            }
            (Axis::Parent, Item::Property { node, .. }) => {
                vec![self.navigator.primary_assoc(node)?]
            }
            (_, Item::Property { .. }) => return Ok(Vec::new()),
            (Axis::Child, Item::Assoc(assoc)) => self.navigator.children(&assoc.child)?,
            (Axis::Parent, Item::Assoc(assoc)) => self.navigator.parents(&assoc.child)?,
            (Axis::SelfNode, Item::Assoc(assoc)) => vec![assoc.clone()],
            (Axis::Descendant, Item::Assoc(assoc)) => self.navigator.descendants(&assoc.child)?,
            (Axis::DescendantOrSelf, Item::Assoc(assoc)) => {
                let mut out = vec![assoc.clone()];
                out.extend(self.navigator.descendants(&assoc.child)?);
                out
            }
        };
        let mut out = Vec::with_capacity(assocs.len());
        for assoc in assocs {
            if self.matches(&step.test, assoc.qname.as_ref())? {
                out.push(Item::Assoc(assoc));
            }
        }
        Ok(out)
    }

    /// Does a name pass the node test. Store roots have no name.
    fn matches(&self, test: &NodeTest, name: Option<&QName>) -> Result<bool> {
        Ok(match (test, name) {
            (NodeTest::Node, _) => true,
            (_, None) => false,
            (NodeTest::Any, Some(_)) => true,
            (NodeTest::Namespace(prefix), Some(name)) => self.namespace(Some(prefix))? == name.namespace(),
            (NodeTest::Name { prefix, local }, Some(name)) => {
                name.local_name() == iso9075::decode(local)
                    && self.namespace(prefix.as_ref())? == name.namespace()
            }
        })
    }

    fn namespace(&self, prefix: Option<&String>) -> Result<String> {
        match prefix {
            None => Ok(self.resolver.namespace_uri("").unwrap_or_default()),
            Some(prefix) => self
                .resolver
                .namespace_uri(prefix)
                .ok_or_else(|| TaxaError::NamespaceNotFound(prefix.clone())),
        }
    }

    fn filter(&self, candidates: Vec<Item>, predicates: &[Expr]) -> Result<Vec<Item>> {
        let mut items = candidates;
        for predicate in predicates {
            let size = items.len();
            let mut kept = Vec::with_capacity(size);
            for (index, item) in items.into_iter().enumerate() {
                let keep = {
                    let ctx = Context {
                        item: &item,
                        position: index + 1,
                        size,
                    };
                    match self.eval(predicate, &ctx)? {
                        Value::Number(n) => n == (index + 1) as f64,
                        other => truthy(&other),
                    }
                };
                if keep {
                    kept.push(item);
                }
            }
            items = kept;
        }
        Ok(items)
    }

    fn function(&self, name: &str, args: &[Expr], ctx: &Context<'_>) -> Result<Value> {
        let arity = |range: std::ops::RangeInclusive<usize>| {
            if range.contains(&args.len()) {
                Ok(())
            } else {
                Err(self.error(format!("Wrong number of arguments for {name}()")))
            }
        };
        match name {
            "true" => {
                arity(0..=0)?;
                Ok(Value::Boolean(true))
            }
            "false" => {
                arity(0..=0)?;
                Ok(Value::Boolean(false))
            }
            "not" => {
                arity(1..=1)?;
                Ok(Value::Boolean(!truthy(&self.eval(&args[0], ctx)?)))
            }
            "position" => {
                arity(0..=0)?;
                Ok(Value::Number(ctx.position as f64))
            }
            "last" => {
                arity(0..=0)?;
                Ok(Value::Number(ctx.size as f64))
            }
            "count" => {
                arity(1..=1)?;
                match self.eval(&args[0], ctx)? {
                    Value::Items(items) => Ok(Value::Number(items.len() as f64)),
                    _ => Err(self.error("count() needs a path argument")),
                }
            }
            "string" => {
                arity(0..=1)?;
                let value = match args.first() {
                    Some(arg) => self.eval(arg, ctx)?,
                    None => Value::Items(vec![ctx.item.clone()]),
                };
                Ok(Value::Text(self.string_value(&value)?))
            }
            "lower-case" | "upper-case" => {
                arity(1..=1)?;
                let text = self.string_value(&self.eval(&args[0], ctx)?)?;
                Ok(Value::Text(if name == "lower-case" {
                    text.to_lowercase()
                } else {
                    text.to_uppercase()
                }))
            }
            "like" => {
                arity(2..=3)?;
                let target = self.eval(&args[0], ctx)?;
                let pattern = self.string_value(&self.eval(&args[1], ctx)?)?;
                let case_sensitive = match args.get(2) {
                    Some(flag) => truthy(&self.eval(flag, ctx)?),
                    None => true,
                };
                let regex = compile_like(&pattern, case_sensitive)?;
                let matched = self
                    .strings(&target)?
                    .iter()
                    .any(|value| regex.is_match(value));
                Ok(Value::Boolean(matched))
            }
            "contains" => {
                arity(1..=2)?;
                let (haystack, text) = if args.len() == 2 {
                    let target = self.eval(&args[0], ctx)?;
                    (self.strings(&target)?, self.eval(&args[1], ctx)?)
                } else {
                    (self.text_properties(ctx.item)?, self.eval(&args[0], ctx)?)
                };
                let words = tokenize(&self.string_value(&text)?);
                let available: HashSet<String> =
                    haystack.iter().flat_map(|value| tokenize(value)).collect();
                Ok(Value::Boolean(
                    !words.is_empty() && words.iter().all(|w| available.contains(w)),
                ))
            }
            "subtypeOf" => {
                arity(1..=1)?;
                let Item::Assoc(assoc) = ctx.item else {
                    return Ok(Value::Boolean(false));
                };
                let name = self.string_value(&self.eval(&args[0], ctx)?)?;
                let class = QName::resolve(&name, self.resolver)?;
                let node_type = self.navigator.node_type(&assoc.child)?;
                Ok(Value::Boolean(
                    self.navigator.dictionary().is_sub_class(&node_type, &class),
                ))
            }
            other => Err(self.error(format!("Unknown function {other}()"))),
        }
    }

    /// Text values of every text property of the context node
    fn text_properties(&self, item: &Item) -> Result<Vec<String>> {
        let Item::Assoc(assoc) = item else {
            return Ok(Vec::new());
        };
        Ok(self
            .navigator
            .properties(&assoc.child)?
            .values()
            .flat_map(|value| {
                value
                    .flatten()
                    .into_iter()
                    .filter_map(|v| v.as_text().map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    /// String values of an item: `cm:name` for nodes, the values for properties
    fn item_strings(&self, item: &Item) -> Result<Vec<String>> {
        match item {
            Item::Assoc(assoc) => {
                let name = self
                    .navigator
                    .properties(&assoc.child)?
                    .get(&PROP_NAME)
                    .map(PropertyValue::to_text);
                Ok(name.into_iter().collect())
            }
            Item::Property { value, .. } => {
                Ok(value.flatten().into_iter().map(PropertyValue::to_text).collect())
            }
        }
    }

    fn strings(&self, value: &Value) -> Result<Vec<String>> {
        match value {
            Value::Items(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(self.item_strings(item)?);
                }
                Ok(out)
            }
            other => Ok(vec![self.string_value(other)?]),
        }
    }

    fn string_value(&self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Items(items) => match items.first() {
                Some(item) => self.item_strings(item)?.into_iter().next().unwrap_or_default(),
                None => String::new(),
            },
            Value::Text(text) => text.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
        })
    }
}

/// Keep the first occurrence of every item
fn dedupe(items: Vec<Item>) -> Vec<Item> {
    #[derive(PartialEq, Eq, Hash)]
    enum Key {
        Assoc(ChildAssocRef),
        Property(NodeRef, QName),
    }
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            seen.insert(match item {
                Item::Assoc(assoc) => Key::Assoc(assoc.clone()),
                Item::Property { node, name, .. } => Key::Property(node.clone(), name.clone()),
            })
        })
        .collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Items(items) => !items.is_empty(),
        Value::Text(text) => !text.is_empty(),
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Boolean(b) => *b,
    }
}

fn atom(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Integer(i) => Value::Number(*i as f64),
        PropertyValue::Float(f) => Value::Number(*f),
        PropertyValue::Boolean(b) => Value::Boolean(*b),
        other => Value::Text(other.to_text()),
    }
}

/// Atoms an operand contributes to a comparison
fn atoms(value: &Value) -> Vec<Value> {
    match value {
        Value::Items(items) => items
            .iter()
            .flat_map(|item| match item {
                Item::Property { value, .. } => value.flatten().into_iter().map(atom).collect(),
                Item::Assoc(_) => Vec::new(),
            })
            .collect(),
        other => vec![other.clone()],
    }
}

/// Existential comparison: true when any pair of atoms compares true
fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    let left = atoms(left);
    let right = atoms(right);
    left.iter()
        .any(|l| right.iter().any(|r| compare_atoms(op, l, r)))
}

fn compare_atoms(op: CompareOp, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    if matches!(op, CompareOp::Eq | CompareOp::Ne) {
        let equal = match (left, right) {
            (Value::Boolean(_), _) | (_, Value::Boolean(_)) => truthy(left) == truthy(right),
            (Value::Number(_), _) | (_, Value::Number(_)) => number(left) == number(right),
            _ => text(left) == text(right),
        };
        return if op == CompareOp::Eq { equal } else { !equal };
    }

    let (l, r) = (number(left), number(right));
    let ordering = if !l.is_nan() && !r.is_nan() {
        l.partial_cmp(&r)
    } else {
        Some(text(left).cmp(&text(right)))
    };
    match ordering {
        Some(Ordering::Less) => matches!(op, CompareOp::Lt | CompareOp::Le),
        Some(Ordering::Equal) => matches!(op, CompareOp::Le | CompareOp::Ge),
        Some(Ordering::Greater) => matches!(op, CompareOp::Gt | CompareOp::Ge),
        None => false,
    }
}

fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Items(_) => f64::NAN,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Number(n) => format_number(*n),
        Value::Boolean(b) => b.to_string(),
        Value::Items(_) => String::new(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
