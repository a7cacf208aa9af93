//! CMIS-QL parser.
//!
//! Supports the statement shape
//!
//! ```text
//! SELECT cols | * FROM type [[AS] alias] [WHERE cond] [ORDER BY col [ASC|DESC], ...]
//! ```
//!
//! with `=`, `<>`, `[NOT] LIKE`, `[NOT] IN (...)`, `IS [NOT] NULL`,
//! `IN_FOLDER('ref')`, `IN_TREE('ref')`, `CONTAINS('text')`, `AND`, `OR`,
//! `NOT` and parentheses. Keywords are case-insensitive.

use crate::core::error::{Result, TaxaError};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde::Serialize;

/// A property reference, optionally qualified by the type alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub property: String,
}

impl ColumnRef {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            property: property.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectColumn {
    pub column: ColumnRef,
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Name the column is reported under
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column.property)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl Literal {
    /// Text form matched against stored values
    pub fn to_text(&self) -> String {
        match self {
            Literal::Text(text) => unescape(text),
            Literal::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Literal::Number(n) => n.to_string(),
            Literal::Boolean(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    Equal,
    NotEqual,
}

/// WHERE clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        column: ColumnRef,
        op: Comparison,
        value: Literal,
    },
    /// Pattern keeps its backslash escapes
    Like {
        column: ColumnRef,
        pattern: String,
        negated: bool,
    },
    In {
        column: ColumnRef,
        values: Vec<Literal>,
        negated: bool,
    },
    Null {
        column: ColumnRef,
        negated: bool,
    },
    InFolder(String),
    InTree(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub ascending: bool,
}

/// A parsed CMIS statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CmisQuery {
    /// Empty for `SELECT *`
    pub columns: Vec<SelectColumn>,
    pub from: String,
    pub alias: Option<String>,
    pub condition: Option<Condition>,
    pub order_by: Vec<OrderBy>,
}

impl CmisQuery {
    /// `SELECT * FROM type`
    pub fn select_all(from: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            from: from.into(),
            alias: None,
            condition: None,
            order_by: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Parse a CMIS-QL statement
pub fn parse_cmis(statement: &str) -> Result<CmisQuery> {
    let trimmed = statement.trim().trim_end_matches(';');
    if trimmed.trim().is_empty() {
        return Err(TaxaError::InvalidQuery("CMIS statement cannot be empty".to_string()));
    }
    match query(trimmed) {
        Ok((rest, parsed)) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                Ok(parsed)
            } else {
                Err(TaxaError::InvalidQuery(format!(
                    "Unexpected input at '{}'",
                    preview(rest)
                )))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(TaxaError::InvalidQuery(
            format!("Failed to parse CMIS statement near '{}'", preview(e.input)),
        )),
        Err(nom::Err::Incomplete(_)) => {
            Err(TaxaError::InvalidQuery("Incomplete CMIS statement".to_string()))
        }
    }
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

/// Resolve `\\` and other backslash escapes in a literal
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

// =============================================================================
// STATEMENT
// =============================================================================

fn query(input: &str) -> IResult<&str, CmisQuery> {
    let (input, _) = terminated(keyword("SELECT"), multispace1)(input)?;
    let (input, columns) = select_list(input)?;
    let (input, _) = delimited(multispace1, keyword("FROM"), multispace1)(input)?;
    let (input, from) = identifier(input)?;
    let (input, alias) = opt(preceded(
        pair(multispace1, opt(terminated(keyword("AS"), multispace1))),
        alias,
    ))(input)?;
    let (input, condition) = opt(preceded(
        delimited(multispace1, keyword("WHERE"), multispace1),
        or_condition,
    ))(input)?;
    let (input, order_by) = opt(preceded(
        tuple((
            multispace1,
            keyword("ORDER"),
            multispace1,
            keyword("BY"),
            multispace1,
        )),
        separated_list1(ws(char(',')), order_item),
    ))(input)?;

    Ok((
        input,
        CmisQuery {
            columns,
            from: from.to_string(),
            alias,
            condition,
            order_by: order_by.unwrap_or_default(),
        },
    ))
}

fn select_list(input: &str) -> IResult<&str, Vec<SelectColumn>> {
    alt((
        value(Vec::new(), char('*')),
        separated_list1(ws(char(',')), select_column),
    ))(input)
}

fn select_column(input: &str) -> IResult<&str, SelectColumn> {
    let (input, column) = column_ref(input)?;
    let (input, alias) = opt(preceded(
        pair(multispace1, opt(terminated(keyword("AS"), multispace1))),
        alias,
    ))(input)?;
    Ok((input, SelectColumn { column, alias }))
}

fn order_item(input: &str) -> IResult<&str, OrderBy> {
    let (input, column) = column_ref(input)?;
    let (input, direction) = opt(preceded(
        multispace1,
        alt((
            value(true, keyword("ASC")),
            value(false, keyword("DESC")),
        )),
    ))(input)?;
    Ok((
        input,
        OrderBy {
            column,
            ascending: direction.unwrap_or(true),
        },
    ))
}

// =============================================================================
// CONDITIONS
// =============================================================================

fn or_condition(input: &str) -> IResult<&str, Condition> {
    let (input, mut parts) =
        separated_list1(delimited(multispace1, keyword("OR"), multispace1), and_condition)(input)?;
    Ok((
        input,
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::Or(parts)
        },
    ))
}

fn and_condition(input: &str) -> IResult<&str, Condition> {
    let (input, mut parts) =
        separated_list1(delimited(multispace1, keyword("AND"), multispace1), not_condition)(input)?;
    Ok((
        input,
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::And(parts)
        },
    ))
}

fn not_condition(input: &str) -> IResult<&str, Condition> {
    if let Ok((rest, _)) = terminated(keyword("NOT"), multispace0)(input) {
        let (rest, inner) = not_condition(rest)?;
        return Ok((rest, Condition::Not(Box::new(inner))));
    }
    alt((
        delimited(ws(char('(')), or_condition, preceded(multispace0, char(')'))),
        predicate,
    ))(input)
}

fn predicate(input: &str) -> IResult<&str, Condition> {
    alt((
        map(scope_function("IN_FOLDER"), Condition::InFolder),
        map(scope_function("IN_TREE"), Condition::InTree),
        map(scope_function("CONTAINS"), Condition::Contains),
        column_predicate,
    ))(input)
}

/// `NAME([qualifier,] 'text')`
fn scope_function<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    move |input: &'a str| {
        let (input, _) = terminated(keyword(name), ws(char('(')))(input)?;
        let (input, _) = opt(terminated(identifier, ws(char(','))))(input)?;
        let (input, text) = string_literal(input)?;
        let (input, _) = preceded(multispace0, char(')'))(input)?;
        Ok((input, unescape(&text)))
    }
}

fn column_predicate(input: &str) -> IResult<&str, Condition> {
    let (input, column) = column_ref(input)?;
    let (input, _) = multispace0(input)?;

    if let Ok((rest, negated)) = terminated(
        preceded(
            terminated(keyword("IS"), multispace1),
            map(opt(terminated(keyword("NOT"), multispace1)), |n| n.is_some()),
        ),
        keyword("NULL"),
    )(input)
    {
        return Ok((rest, Condition::Null { column, negated }));
    }

    let (after_not, negated) =
        map(opt(terminated(keyword("NOT"), multispace1)), |n| n.is_some())(input)?;
    if let Ok((rest, _)) = terminated(keyword("LIKE"), multispace0)(after_not) {
        let (rest, pattern) = string_literal(rest)?;
        return Ok((
            rest,
            Condition::Like {
                column,
                pattern,
                negated,
            },
        ));
    }
    if let Ok((rest, _)) = terminated(keyword("IN"), ws(char('(')))(after_not) {
        let (rest, values) = separated_list1(ws(char(',')), literal)(rest)?;
        let (rest, _) = preceded(multispace0, char(')'))(rest)?;
        return Ok((
            rest,
            Condition::In {
                column,
                values,
                negated,
            },
        ));
    }
    if negated {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag)));
    }

    let (input, op) = terminated(
        alt((
            value(Comparison::NotEqual, tag("<>")),
            value(Comparison::Equal, char('=')),
        )),
        multispace0,
    )(input)?;
    let (input, value) = literal(input)?;
    Ok((input, Condition::Compare { column, op, value }))
}

// =============================================================================
// TOKENS
// =============================================================================

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '-')
}

/// A case-insensitive keyword not followed by identifier characters
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_identifier_char)))
}

const RESERVED: [&str; 13] = [
    "SELECT", "FROM", "AS", "WHERE", "ORDER", "BY", "AND", "OR", "NOT", "IN", "LIKE", "IS", "NULL",
];

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(is_identifier_char),
    ))(input)
}

fn alias(input: &str) -> IResult<&str, String> {
    let (rest, name) = identifier(input)?;
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    Ok((rest, name.to_string()))
}

fn column_ref(input: &str) -> IResult<&str, ColumnRef> {
    let (input, first) = identifier(input)?;
    if let Ok((rest, property)) = preceded(char::<&str, Error<&str>>('.'), identifier)(input) {
        return Ok((
            rest,
            ColumnRef {
                qualifier: Some(first.to_string()),
                property: property.to_string(),
            },
        ));
    }
    Ok((input, ColumnRef::new(first)))
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(string_literal, Literal::Text),
        number,
        value(Literal::Boolean(true), keyword("TRUE")),
        value(Literal::Boolean(false), keyword("FALSE")),
    ))(input)
}

fn number(input: &str) -> IResult<&str, Literal> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    match text.parse::<f64>() {
        Ok(n) => Ok((rest, Literal::Number(n))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

/// `'text'`; `\'` is a quote, other escapes are kept for the caller
fn string_literal(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('\'')(input)?;
    let mut out = String::new();
    loop {
        let (after, chunk) = take_while(|c| c != '\'' && c != '\\')(rest)?;
        out.push_str(chunk);
        if let Some(after_escape) = after.strip_prefix("\\'") {
            out.push('\'');
            rest = after_escape;
        } else if let Some(after_escape) = after.strip_prefix('\\') {
            let mut chars = after_escape.chars();
            let escaped = chars
                .next()
                .ok_or_else(|| nom::Err::Error(Error::new(after, ErrorKind::Escaped)))?;
            out.push('\\');
            out.push(escaped);
            rest = chars.as_str();
        } else {
            let (after, _) = char('\'')(after)?;
            return Ok((after, out));
        }
    }
}
