//! Constant table and `define` statements.
//!
//! A definition has the shape `(define NAME expression)` with an optional trailing
//! `;`. The expression is evaluated immediately against the constants defined so
//! far, so every constant holds a plain integer and forward references are
//! impossible.

use std::collections::HashMap;

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{not, recognize},
    sequence::{pair, preceded, terminated},
};

use crate::ast::Integer;
use crate::expression::evaluate_integer;
use crate::{Error, OnConflict, ParseConfig};

pub const DEFINE_KEYWORD: &str = "define";

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Check if a string is a valid constant name: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_identifier_start(first) && chars.all(is_identifier_char),
        None => false,
    }
}

/// Parse a constant name
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(is_identifier_start),
        take_while(is_identifier_char),
    ))
    .parse(input)
}

/// Parse `(define` at the start of a line, whitespace allowed after the parenthesis
fn definition_keyword(input: &str) -> IResult<&str, &str> {
    preceded(
        (multispace0, char('('), multispace0),
        terminated(tag(DEFINE_KEYWORD), not(satisfy(is_identifier_char))),
    )
    .parse(input)
}

/// Whether a normalized line is a definition statement (well-formed or not)
pub fn is_definition(line: &str) -> bool {
    definition_keyword(line).is_ok()
}

/// Run-scoped mapping from constant names to their values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstantTable {
    bindings: HashMap<String, Integer>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name, returning the value it replaced
    pub(crate) fn define(&mut self, name: String, value: Integer) -> Option<Integer> {
        self.bindings.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<Integer> {
        self.bindings.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All bindings sorted by name
    pub fn bindings(&self) -> Vec<(&str, Integer)> {
        let mut result: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        result.sort_by(|a, b| a.0.cmp(b.0));
        result
    }
}

/// Build a table snapshot directly, e.g. to evaluate expressions outside a translation
impl<K: Into<String>> FromIterator<(K, Integer)> for ConstantTable {
    fn from_iter<T: IntoIterator<Item = (K, Integer)>>(iter: T) -> Self {
        ConstantTable {
            bindings: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Parentheses must balance and never close before they open
fn parens_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Split a definition statement into its name and unevaluated expression text
pub fn split_definition(line: &str) -> Result<(&str, &str), Error> {
    let statement = line.trim();
    let body = statement.strip_suffix(';').unwrap_or(statement).trim_end();

    if !parens_balanced(body) {
        return Err(Error::syntax("unbalanced parentheses in definition", line));
    }
    let Some(inner) = body.strip_suffix(')') else {
        return Err(Error::syntax("definition must end with ')'", line));
    };
    let (rest, _) = definition_keyword(inner)
        .map_err(|_| Error::syntax(format!("expected '({DEFINE_KEYWORD}'"), line))?;
    let (rest, name) = preceded(multispace1, identifier)
        .parse(rest)
        .map_err(|_| Error::syntax("missing constant name", line))?;

    let expression = rest.trim();
    if expression.is_empty() {
        return Err(Error::syntax(
            format!("missing value for constant '{name}'"),
            line,
        ));
    }
    // The expression may start right after the name only with a parenthesis
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
        return Err(Error::syntax(
            format!("invalid constant name '{name}{}'", rest.split_whitespace().next().unwrap_or("")),
            line,
        ));
    }
    Ok((name, expression))
}

/// Parse a definition statement, evaluate its expression and bind the result.
///
/// Returns the name and value that were bound.
pub fn parse_definition(
    line: &str,
    constants: &mut ConstantTable,
    config: &ParseConfig,
) -> Result<(String, Integer), Error> {
    let (name, expression) = split_definition(line)?;
    let value = evaluate_integer(expression, constants, config)?;

    if constants.contains(name) {
        match config.redefinition {
            OnConflict::Overwrite => {
                log::warn!("constant '{name}' redefined, keeping the later value");
            }
            OnConflict::Reject => {
                return Err(Error::syntax(
                    format!("constant '{name}' is already defined"),
                    line,
                ));
            }
        }
    }
    constants.define(name.to_owned(), value);
    log::debug!("defined constant {name} = {value}");
    Ok((name.to_owned(), value))
}
