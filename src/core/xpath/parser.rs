//! Path expression parser.
//!
//! An XPath 1.0 subset over the node graph:
//!
//! ```text
//! /cm:categoryRoot/cm:generalclassifiable//*[subtypeOf('cm:category')]
//! //*[@cm:name = 'Software' or like(@cm:name, 'Data%', false)]
//! ./cm:docs/* | ../cm:other
//! ```
//!
//! Steps select child associations; `@` selects properties. Predicates may
//! compare values, call functions or give a 1-based position.

use crate::core::error::{Result, TaxaError};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Navigation direction of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Parent,
    SelfNode,
    Descendant,
    DescendantOrSelf,
    Attribute,
}

/// What a step keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`: everything on the axis
    Node,
    /// `*`
    Any,
    /// `prefix:*`
    Namespace(String),
    /// `prefix:local` or `local`
    Name {
        prefix: Option<String>,
        local: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// Starts at the store root rather than the context node
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed path expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(LocationPath),
    Union(Vec<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    /// `$prefix:name`
    Variable(String),
    Function(String, Vec<Expr>),
}

/// Parse a path expression
pub fn parse_path(expression: &str) -> Result<Expr> {
    let failure = |reason: String| TaxaError::PathEvaluation {
        expression: expression.to_string(),
        reason,
    };
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(failure("Expression is empty".to_string()));
    }
    match expr(trimmed) {
        Ok((rest, parsed)) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                Ok(parsed)
            } else {
                Err(failure(format!("Unexpected input at '{}'", preview(rest))))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(failure(format!("Syntax error near '{}'", preview(e.input))))
        }
        Err(nom::Err::Incomplete(_)) => Err(failure("Incomplete expression".to_string())),
    }
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

fn expr(input: &str) -> IResult<&str, Expr> {
    or_expr(input)
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut left) = and_expr(input)?;
    while let Ok((rest, right)) = preceded(ws(keyword("or")), and_expr)(input) {
        left = Expr::Or(Box::new(left), Box::new(right));
        input = rest;
    }
    Ok((input, left))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut left) = equality_expr(input)?;
    while let Ok((rest, right)) = preceded(ws(keyword("and")), equality_expr)(input) {
        left = Expr::And(Box::new(left), Box::new(right));
        input = rest;
    }
    Ok((input, left))
}

fn equality_expr(input: &str) -> IResult<&str, Expr> {
    let operator = alt((value(CompareOp::Ne, tag("!=")), value(CompareOp::Eq, char('='))));
    comparison(input, operator, relational_expr)
}

fn relational_expr(input: &str) -> IResult<&str, Expr> {
    let operator = alt((
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Lt, char('<')),
        value(CompareOp::Gt, char('>')),
    ));
    comparison(input, operator, union_expr)
}

fn comparison<'a>(
    input: &'a str,
    mut operator: impl FnMut(&'a str) -> IResult<&'a str, CompareOp>,
    mut operand: impl FnMut(&'a str) -> IResult<&'a str, Expr>,
) -> IResult<&'a str, Expr> {
    let (mut input, mut left) = operand(input)?;
    loop {
        let Ok((rest, op)) = ws(&mut operator)(input) else {
            break;
        };
        let (rest, right) = operand(rest)?;
        left = Expr::Compare(op, Box::new(left), Box::new(right));
        input = rest;
    }
    Ok((input, left))
}

fn union_expr(input: &str) -> IResult<&str, Expr> {
    let (mut input, first) = path_expr(input)?;
    let mut members = vec![first];
    while let Ok((rest, next)) = preceded(ws(char('|')), path_expr)(input) {
        members.push(next);
        input = rest;
    }
    if members.len() == 1 {
        if let Some(only) = members.pop() {
            return Ok((input, only));
        }
    }
    Ok((input, Expr::Union(members)))
}

fn path_expr(input: &str) -> IResult<&str, Expr> {
    alt((primary_expr, map(location_path, Expr::Path)))(input)
}

fn primary_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        variable,
        delimited(ws(char('(')), expr, ws(char(')'))),
        literal,
        number,
        function_call,
        boolean_literal,
    ))(input)
}

/// Bare `true` / `false`, as accepted for the `like` case flag
fn boolean_literal(input: &str) -> IResult<&str, Expr> {
    let (rest, word) = alt((keyword("true"), keyword("false")))(input)?;
    if rest.trim_start().starts_with(|c: char| c == '/' || c == '[') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    Ok((rest, Expr::Function(word.to_string(), Vec::new())))
}

fn variable(input: &str) -> IResult<&str, Expr> {
    map(preceded(char('$'), qualified_name), |name| {
        Expr::Variable(name.to_string())
    })(input)
}

fn literal(input: &str) -> IResult<&str, Expr> {
    map(
        alt((
            delimited(char('\''), take_until("'"), char('\'')),
            delimited(char('"'), take_until("\""), char('"')),
        )),
        |text: &str| Expr::Literal(text.to_string()),
    )(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    let (rest, digits) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    match digits.parse::<f64>() {
        Ok(n) => Ok((rest, Expr::Number(n))),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = qualified_name(input)?;
    // `node()` is a node test, not a function
    if name == "node" {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    let (rest, _) = ws(char('('))(rest)?;
    let (rest, args) = separated_list0(ws(char(',')), expr)(rest)?;
    let (rest, _) = preceded(multispace0, char(')'))(rest)?;
    let local = name.rsplit(':').next().unwrap_or(name);
    Ok((rest, Expr::Function(local.to_string(), args)))
}

// =============================================================================
// LOCATION PATHS
// =============================================================================

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    if let Some(rest) = input.strip_prefix("//") {
        let (rest, mut steps) = relative_steps(rest)?;
        steps.insert(0, Step::new(Axis::DescendantOrSelf, NodeTest::Node));
        return Ok((
            rest,
            LocationPath {
                absolute: true,
                steps,
            },
        ));
    }
    if let Some(rest) = input.strip_prefix('/') {
        let (rest, steps) = match relative_steps(rest) {
            Ok((rest, steps)) => (rest, steps),
            Err(nom::Err::Error(_)) => (rest, Vec::new()),
            Err(e) => return Err(e),
        };
        return Ok((
            rest,
            LocationPath {
                absolute: true,
                steps,
            },
        ));
    }
    map(relative_steps, |steps| LocationPath {
        absolute: false,
        steps,
    })(input)
}

fn relative_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (mut input, first) = step(input)?;
    let mut steps = vec![first];
    loop {
        let (rest, _) = multispace0(input)?;
        if let Some(rest) = rest.strip_prefix("//") {
            let (rest, next) = step(rest)?;
            steps.push(Step::new(Axis::DescendantOrSelf, NodeTest::Node));
            steps.push(next);
            input = rest;
        } else if let Some(rest) = rest.strip_prefix('/') {
            let (rest, next) = step(rest)?;
            steps.push(next);
            input = rest;
        } else {
            break;
        }
    }
    Ok((input, steps))
}

fn step(input: &str) -> IResult<&str, Step> {
    let (input, _) = multispace0(input)?;
    if let Some(rest) = input.strip_prefix("..") {
        return Ok((rest, Step::new(Axis::Parent, NodeTest::Node)));
    }
    if let Some(rest) = input.strip_prefix('.') {
        return Ok((rest, Step::new(Axis::SelfNode, NodeTest::Node)));
    }
    let (input, axis) = opt(axis)(input)?;
    let (input, test) = node_test(input)?;
    let mut predicates = Vec::new();
    let mut input = input;
    while let Ok((rest, predicate)) = delimited(ws(char('[')), expr, ws(char(']')))(input) {
        predicates.push(predicate);
        input = rest;
    }
    Ok((
        input,
        Step {
            axis: axis.unwrap_or(Axis::Child),
            test,
            predicates,
        },
    ))
}

fn axis(input: &str) -> IResult<&str, Axis> {
    alt((
        value(Axis::Attribute, char('@')),
        terminated(
            alt((
                value(Axis::DescendantOrSelf, tag("descendant-or-self")),
                value(Axis::Descendant, tag("descendant")),
                value(Axis::Attribute, tag("attribute")),
                value(Axis::Child, tag("child")),
                value(Axis::Parent, tag("parent")),
                value(Axis::SelfNode, tag("self")),
            )),
            tag("::"),
        ),
    ))(input)
}

fn node_test(input: &str) -> IResult<&str, NodeTest> {
    if let Ok((rest, _)) = tuple((
        tag::<&str, &str, Error<&str>>("node"),
        multispace0,
        char('('),
        multispace0,
        char(')'),
    ))(input)
    {
        return Ok((rest, NodeTest::Node));
    }
    if let Some(rest) = input.strip_prefix('*') {
        return Ok((rest, NodeTest::Any));
    }
    let (rest, first) = ncname(input)?;
    if let Some(after) = rest.strip_prefix(':') {
        if let Some(after) = after.strip_prefix('*') {
            return Ok((after, NodeTest::Namespace(first.to_string())));
        }
        if let Ok((after, local)) = ncname(after) {
            return Ok((
                after,
                NodeTest::Name {
                    prefix: Some(first.to_string()),
                    local: local.to_string(),
                },
            ));
        }
    }
    Ok((
        rest,
        NodeTest::Name {
            prefix: None,
            local: first.to_string(),
        },
    ))
}

fn ncname(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')),
    ))(input)
}

fn qualified_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(ncname, opt(pair(char(':'), ncname))))(input)
}

/// A keyword not followed by further name characters
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(
        tag(word),
        not(take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(expression: &str) -> LocationPath {
        match parse_path(expression).unwrap() {
            Expr::Path(path) => path,
            other => panic!("expected a path, got {other:?}"),
        }
    }

    fn name(prefix: &str, local: &str) -> NodeTest {
        NodeTest::Name {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
        }
    }

    #[test]
    fn test_absolute_path() {
        let parsed = path("/cm:categoryRoot/cm:generalclassifiable/*");
        assert!(parsed.absolute);
        assert_eq!(parsed.steps.len(), 3);
        assert_eq!(parsed.steps[0].test, name("cm", "categoryRoot"));
        assert_eq!(parsed.steps[2].test, NodeTest::Any);
        assert!(parsed.steps.iter().all(|s| s.axis == Axis::Child));
    }

    #[test]
    fn test_root_only() {
        let parsed = path("/");
        assert!(parsed.absolute);
        assert!(parsed.steps.is_empty());
    }

    #[test]
    fn test_descendant_abbreviation() {
        let parsed = path("//cm:Software//*");
        assert_eq!(parsed.steps.len(), 4);
        assert_eq!(parsed.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(parsed.steps[2].axis, Axis::DescendantOrSelf);
        assert_eq!(parsed.steps[3].test, NodeTest::Any);
    }

    #[test]
    fn test_relative_and_parent_steps() {
        let parsed = path("../cm:*/.");
        assert!(!parsed.absolute);
        assert_eq!(parsed.steps[0].axis, Axis::Parent);
        assert_eq!(parsed.steps[1].test, NodeTest::Namespace("cm".to_string()));
        assert_eq!(parsed.steps[2].axis, Axis::SelfNode);
    }

    #[test]
    fn test_attribute_and_axes() {
        let parsed = path("descendant::cm:docs/attribute::cm:name");
        assert_eq!(parsed.steps[0].axis, Axis::Descendant);
        assert_eq!(parsed.steps[1].axis, Axis::Attribute);
        let parsed = path("./@*");
        assert_eq!(parsed.steps[1].axis, Axis::Attribute);
        assert_eq!(parsed.steps[1].test, NodeTest::Any);
    }

    #[test]
    fn test_predicates() {
        let parsed = path("//*[@cm:name = 'A' and not(subtypeOf('cm:folder'))][2]");
        let step = &parsed.steps[1];
        assert_eq!(step.predicates.len(), 2);
        assert!(matches!(step.predicates[0], Expr::And(_, _)));
        assert_eq!(step.predicates[1], Expr::Number(2.0));
    }

    #[test]
    fn test_functions_and_variables() {
        let parsed = path("*[like(@cm:name, $cm:pattern, false) or lower-case(@cm:title) != 'x']");
        let Expr::Or(left, right) = &parsed.steps[0].predicates[0] else {
            panic!("expected or");
        };
        let Expr::Function(name, args) = left.as_ref() else {
            panic!("expected function");
        };
        assert_eq!(name, "like");
        assert_eq!(args[1], Expr::Variable("cm:pattern".to_string()));
        assert_eq!(args[2], Expr::Function("false".to_string(), Vec::new()));
        assert!(matches!(right.as_ref(), Expr::Compare(CompareOp::Ne, _, _)));
    }

    #[test]
    fn test_union() {
        let Expr::Union(members) = parse_path("/cm:a | /cm:b | ./*").unwrap() else {
            panic!("expected union");
        };
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn test_errors() {
        for bad in ["", "/cm:a[", "//", "/cm:a/@", "*[@cm:name = ]"] {
            let err = parse_path(bad).unwrap_err();
            assert!(matches!(err, TaxaError::PathEvaluation { .. }), "{bad}");
        }
    }
}
