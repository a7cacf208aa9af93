//! Lucene-like query language.
//!
//! Parses strings such as
//! `+PATH:"/cm:categoryRoot/cm:generalclassifiable/*" +TYPE:"cm:category" AND (@cm\:name:"Soft*")`
//! into a [`QueryNode`] tree. Clause combination follows Lucene: `+` and
//! `-`/`NOT`/`!` mark required and prohibited clauses, `AND` makes both
//! neighbours required, `OR` makes them optional and unmarked clauses take
//! the default operator.

use super::params::DefaultOperator;
use crate::core::error::{Result, TaxaError};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{cut, not, opt, value},
    error::{Error, ErrorKind},
    sequence::{delimited, preceded, terminated},
    IResult,
};

/// Queryable field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryField {
    Path,
    Type,
    ExactType,
    Aspect,
    Id,
    Parent,
    PrimaryParent,
    QName,
    IsNull,
    IsNotNull,
    Text,
    /// `prefix:local` or `{uri}local`, unresolved
    Property(String),
}

impl QueryField {
    fn from_name(name: &str) -> Option<Self> {
        let field = match name.to_uppercase().as_str() {
            "PATH" => QueryField::Path,
            "TYPE" => QueryField::Type,
            "EXACTTYPE" => QueryField::ExactType,
            "ASPECT" => QueryField::Aspect,
            "ID" => QueryField::Id,
            "PARENT" => QueryField::Parent,
            "PRIMARYPARENT" => QueryField::PrimaryParent,
            "QNAME" => QueryField::QName,
            "ISNULL" => QueryField::IsNull,
            "ISNOTNULL" => QueryField::IsNotNull,
            "TEXT" => QueryField::Text,
            _ => return None,
        };
        Some(field)
    }
}

/// Clause occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// Parsed query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Matches every document
    All,
    Field { field: QueryField, value: String },
    Boolean(Vec<(Occur, QueryNode)>),
}

impl QueryNode {
    pub fn field(field: QueryField, value: impl Into<String>) -> Self {
        QueryNode::Field {
            field,
            value: value.into(),
        }
    }

    /// Every clause required
    pub fn all_of(nodes: Vec<QueryNode>) -> Self {
        QueryNode::Boolean(nodes.into_iter().map(|n| (Occur::Must, n)).collect())
    }

    /// At least one clause required
    pub fn any_of(nodes: Vec<QueryNode>) -> Self {
        QueryNode::Boolean(nodes.into_iter().map(|n| (Occur::Should, n)).collect())
    }

    /// Matches what `node` does not
    pub fn negate(node: QueryNode) -> Self {
        QueryNode::Boolean(vec![(Occur::Must, QueryNode::All), (Occur::MustNot, node)])
    }
}

/// Characters whose escape is kept so wildcard handling can see it
const KEPT_ESCAPES: [char; 3] = ['*', '?', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

struct RawClause {
    conjunction: Conjunction,
    modifier: Modifier,
    node: QueryNode,
}

/// Parse a query string
pub fn parse_query(input: &str, operator: DefaultOperator) -> Result<QueryNode> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TaxaError::InvalidQuery("Query cannot be empty".to_string()));
    }
    match clauses(trimmed, operator) {
        Ok((rest, node)) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                Ok(node)
            } else {
                Err(TaxaError::InvalidQuery(format!(
                    "Unexpected input at '{}'",
                    preview(rest)
                )))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(TaxaError::InvalidQuery(
            format!("Failed to parse query near '{}'", preview(e.input)),
        )),
        Err(nom::Err::Incomplete(_)) => {
            Err(TaxaError::InvalidQuery("Incomplete query".to_string()))
        }
    }
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

// =============================================================================
// CLAUSES
// =============================================================================

fn clauses(input: &str, operator: DefaultOperator) -> IResult<&str, QueryNode> {
    let (mut rest, first) = clause(input, operator)?;
    if first.conjunction != Conjunction::None {
        // AND/OR needs a clause on its left
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }
    let mut raw = vec![first];
    loop {
        let (after_ws, _) = multispace0(rest)?;
        match clause(after_ws, operator) {
            Ok((next, parsed)) => {
                raw.push(parsed);
                rest = next;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, combine(raw, operator)))
}

fn clause(input: &str, operator: DefaultOperator) -> IResult<&str, RawClause> {
    let (input, conjunction) = opt(terminated(conjunction, multispace0))(input)?;
    let (input, modifier) = opt(terminated(modifier, multispace0))(input)?;
    let (input, node) = atom(input, operator)?;
    Ok((
        input,
        RawClause {
            conjunction: conjunction.unwrap_or(Conjunction::None),
            modifier: modifier.unwrap_or(Modifier::None),
            node,
        },
    ))
}

/// Apply Lucene's clause combination rules
fn combine(raw: Vec<RawClause>, operator: DefaultOperator) -> QueryNode {
    // (occur, explicitly marked)
    let mut clauses: Vec<(Occur, bool, QueryNode)> = Vec::with_capacity(raw.len());
    for clause in raw {
        if let Some(previous) = clauses.last_mut() {
            match clause.conjunction {
                Conjunction::And if previous.0 == Occur::Should => previous.0 = Occur::Must,
                Conjunction::Or
                    if operator == DefaultOperator::And
                        && previous.0 == Occur::Must
                        && !previous.1 =>
                {
                    previous.0 = Occur::Should
                }
                _ => {}
            }
        }
        let (occur, explicit) = match clause.modifier {
            Modifier::Prohibited => (Occur::MustNot, true),
            Modifier::Required => (Occur::Must, true),
            Modifier::None => match (clause.conjunction, operator) {
                (Conjunction::And, _) => (Occur::Must, false),
                (Conjunction::Or, _) => (Occur::Should, false),
                (Conjunction::None, DefaultOperator::And) => (Occur::Must, false),
                (Conjunction::None, DefaultOperator::Or) => (Occur::Should, false),
            },
        };
        clauses.push((occur, explicit, clause.node));
    }

    if clauses.len() == 1 && clauses[0].0 != Occur::MustNot {
        if let Some((_, _, node)) = clauses.pop() {
            return node;
        }
    }
    QueryNode::Boolean(clauses.into_iter().map(|(o, _, n)| (o, n)).collect())
}

// =============================================================================
// OPERATORS
// =============================================================================

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':'
}

/// A keyword not followed by further word characters
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_word_char)))
}

fn conjunction(input: &str) -> IResult<&str, Conjunction> {
    alt((
        value(Conjunction::And, alt((keyword("AND"), tag("&&")))),
        value(Conjunction::Or, alt((keyword("OR"), tag("||")))),
    ))(input)
}

fn modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        value(Modifier::Required, char('+')),
        value(Modifier::Prohibited, char('-')),
        value(Modifier::Prohibited, char('!')),
        value(Modifier::Prohibited, keyword("NOT")),
    ))(input)
}

// =============================================================================
// ATOMS
// =============================================================================

fn atom(input: &str, operator: DefaultOperator) -> IResult<&str, QueryNode> {
    if let Ok((rest, _)) = terminated(char::<&str, Error<&str>>('('), multispace0)(input) {
        let (rest, node) = clauses(rest, operator)?;
        let (rest, _) = preceded(multispace0, char(')'))(rest)?;
        return Ok((rest, node));
    }
    alt((match_all, field_term, default_term))(input)
}

fn match_all(input: &str) -> IResult<&str, QueryNode> {
    value(QueryNode::All, tag("*:*"))(input)
}

fn field_term(input: &str) -> IResult<&str, QueryNode> {
    let (input, field) = field(input)?;
    let (input, _) = char(':')(input)?;
    let (input, value) = cut(term_value)(input)?;
    Ok((input, QueryNode::Field { field, value }))
}

/// Bare or quoted text searched in the full-text field
fn default_term(input: &str) -> IResult<&str, QueryNode> {
    let (rest, value) = term_value(input)?;
    if !input.starts_with('"') && RESERVED_WORDS.contains(&value.as_str()) {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }
    Ok((
        rest,
        QueryNode::Field {
            field: QueryField::Text,
            value,
        },
    ))
}

/// Operators that cannot stand as a bare search term
const RESERVED_WORDS: [&str; 5] = ["AND", "OR", "NOT", "&&", "||"];

fn field(input: &str) -> IResult<&str, QueryField> {
    alt((property_field, named_field))(input)
}

fn named_field(input: &str) -> IResult<&str, QueryField> {
    let (rest, name) = take_while1(|c: char| c.is_ascii_alphabetic())(input)?;
    if !rest.starts_with(':') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    match QueryField::from_name(name) {
        Some(field) => Ok((rest, field)),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
    }
}

/// `@prefix\:local` or `@{uri}local`
fn property_field(input: &str) -> IResult<&str, QueryField> {
    let (input, _) = char('@')(input)?;
    if let Ok((rest, uri)) = delimited(
        char::<&str, Error<&str>>('{'),
        take_until("}"),
        char('}'),
    )(input)
    {
        let (rest, local) = escaped_text(rest, |c| c == ':' || c.is_whitespace());
        if local.is_empty() {
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
        }
        return Ok((rest, QueryField::Property(format!("{{{uri}}}{local}"))));
    }
    let (rest, name) = escaped_text(input, |c| c == ':' || c.is_whitespace());
    if name.is_empty() {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }
    Ok((rest, QueryField::Property(name)))
}

fn term_value(input: &str) -> IResult<&str, String> {
    if let Some(rest) = input.strip_prefix('"') {
        let (rest, text) = escaped_text(rest, |c| c == '"');
        let (rest, _) = cut(char('"'))(rest)?;
        return Ok((rest, text));
    }
    if input.starts_with('[') {
        // range queries are not supported
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }
    let (rest, text) = escaped_text(input, |c| c.is_whitespace() || c == '(' || c == ')');
    if text.is_empty() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Alpha)));
    }
    Ok((rest, text))
}

/// Read until an unescaped `stop` character, resolving backslash escapes.
/// Escaped wildcards keep their backslash.
fn escaped_text(input: &str, stop: impl Fn(char) -> bool) -> (&str, String) {
    let mut out = String::new();
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            if KEPT_ESCAPES.contains(&c) {
                out.push('\\');
            }
            out.push(c);
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if stop(c) {
            return (&input[i..], out);
        }
        out.push(c);
    }
    (&input[input.len()..], out)
}
