//! Expression evaluation.
//!
//! An expression is either a nested `{ ... }` block, handed to the dictionary
//! parser as written, or an integer arithmetic expression. In the latter case
//! every interpolation marker `^(NAME)` is first replaced, left to right, by the
//! decimal value of the constant.
//!
//! Arithmetic grammar (whitespace allowed between tokens):
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | atom
//! atom    := digits | '(' sum ')'
//! ```
//!
//! Arithmetic runs on 128-bit intermediates with overflow checks and the result
//! must fit in an [`Integer`]. Division truncates toward zero.

use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::opt,
    error::ErrorKind,
    sequence::{delimited, preceded, terminated},
};

use crate::ast::{Integer, Value};
use crate::constants::{ConstantTable, identifier};
use crate::dictionary::{is_block, parse_dictionary_with_depth};
use crate::{Error, MAX_PARSE_DEPTH, ParseConfig};

/// Opening of an interpolation marker; the marker closes with `)`
pub const INTERPOLATION_OPEN: &str = "^(";

type Wide = i128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_char(c: char) -> Self {
        match c {
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            _ => BinaryOp::Div,
        }
    }

    fn apply(self, lhs: Wide, rhs: Wide) -> Result<Wide, String> {
        match self {
            BinaryOp::Add => lhs
                .checked_add(rhs)
                .ok_or_else(|| "integer overflow in addition".into()),
            BinaryOp::Sub => lhs
                .checked_sub(rhs)
                .ok_or_else(|| "integer overflow in subtraction".into()),
            BinaryOp::Mul => lhs
                .checked_mul(rhs)
                .ok_or_else(|| "integer overflow in multiplication".into()),
            BinaryOp::Div => {
                if rhs == 0 {
                    Err("division by zero".into())
                } else {
                    lhs.checked_div(rhs)
                        .ok_or_else(|| "integer overflow in division".into())
                }
            }
        }
    }
}

/// Parsed arithmetic expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum Arith {
    Literal(Wide),
    Negate(Box<Arith>),
    Binary {
        op: BinaryOp,
        lhs: Box<Arith>,
        rhs: Box<Arith>,
    },
}

impl Arith {
    fn eval(&self) -> Result<Wide, String> {
        match self {
            Arith::Literal(n) => Ok(*n),
            Arith::Negate(inner) => inner
                .eval()?
                .checked_neg()
                .ok_or_else(|| "integer overflow in negation".into()),
            Arith::Binary { op, lhs, rhs } => op.apply(lhs.eval()?, rhs.eval()?),
        }
    }
}

fn too_deep(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, ErrorKind::TooLarge))
}

/// Parse an unsigned decimal literal
fn parse_literal(input: &str) -> IResult<&str, Arith> {
    let (rest, digits) = digit1.parse(input)?;
    match digits.parse::<Wide>() {
        Ok(n) => Ok((rest, Arith::Literal(n))),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::MapRes,
        ))),
    }
}

fn parse_atom(input: &str, depth: usize) -> IResult<&str, Arith> {
    let (input, _) = multispace0.parse(input)?;
    if input.starts_with('(') {
        if depth >= MAX_PARSE_DEPTH {
            return Err(too_deep(input));
        }
        return delimited(
            char('('),
            |i| parse_sum(i, depth + 1),
            preceded(multispace0, char(')')),
        )
        .parse(input);
    }
    parse_literal(input)
}

/// Signs and parentheses share one depth budget; `depth` levels are already open
fn parse_unary(input: &str, depth: usize) -> IResult<&str, Arith> {
    let (rest, sign) = preceded(multispace0, opt(one_of("+-"))).parse(input)?;
    if sign.is_some() && depth >= MAX_PARSE_DEPTH {
        return Err(too_deep(input));
    }
    match sign {
        Some('-') => {
            let (rest, operand) = parse_unary(rest, depth + 1)?;
            Ok((rest, Arith::Negate(Box::new(operand))))
        }
        Some(_) => parse_unary(rest, depth + 1),
        None => parse_atom(rest, depth),
    }
}

/// Parse a left-associative chain `operand (op operand)*`
fn parse_chain<'a>(
    input: &'a str,
    depth: usize,
    operators: &'static str,
    operand: fn(&'a str, usize) -> IResult<&'a str, Arith>,
) -> IResult<&'a str, Arith> {
    let (mut input, mut lhs) = operand(input, depth)?;
    loop {
        match preceded(multispace0, one_of(operators)).parse(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = operand(rest, depth)?;
                lhs = Arith::Binary {
                    op: BinaryOp::from_char(op),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, lhs)),
            Err(e) => return Err(e),
        }
    }
}

fn parse_product(input: &str, depth: usize) -> IResult<&str, Arith> {
    parse_chain(input, depth, "*/", parse_unary)
}

fn parse_sum(input: &str, depth: usize) -> IResult<&str, Arith> {
    parse_chain(input, depth, "+-", parse_product)
}

/// Convert nom parsing errors to user-friendly messages
fn parse_error_to_message(input: &str, error: nom::Err<nom::error::Error<&str>>) -> String {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => {
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})")
                }
                ErrorKind::MapRes => {
                    format!("integer literal out of range at position {position}")
                }
                ErrorKind::Char => format!("expected ')' at position {position}"),
                _ => {
                    if position < input.len() {
                        let remaining: String = input[position..].chars().take(10).collect();
                        format!("invalid syntax near '{remaining}'")
                    } else {
                        "unexpected end of expression".into()
                    }
                }
            }
        }
        nom::Err::Incomplete(_) => "incomplete expression".into(),
    }
}

/// Evaluate a fully-resolved arithmetic expression (no interpolation markers left).
pub fn evaluate_arithmetic(text: &str) -> Result<Integer, Error> {
    if text.trim().is_empty() {
        return Err(Error::invalid_expression("empty expression", text));
    }
    let ast = match terminated(|i| parse_sum(i, 0), multispace0).parse(text) {
        Ok(("", ast)) => ast,
        Ok((remaining, _)) => {
            return Err(Error::invalid_expression(
                format!("unexpected '{}'", remaining.trim()),
                text,
            ));
        }
        Err(e) => {
            return Err(Error::invalid_expression(
                parse_error_to_message(text, e),
                text,
            ));
        }
    };
    let wide = ast
        .eval()
        .map_err(|message| Error::invalid_expression(message, text))?;
    Integer::try_from(wide)
        .map_err(|_| Error::invalid_expression(format!("result {wide} is out of range"), text))
}

/// Parse one `^(NAME)` marker at the start of the input
fn interpolation_marker(input: &str) -> IResult<&str, &str> {
    delimited(tag(INTERPOLATION_OPEN), identifier, char(')')).parse(input)
}

/// Replace every interpolation marker with the value of its constant.
///
/// Markers are resolved left to right and the first unknown name aborts.
pub fn substitute_constants(text: &str, constants: &ConstantTable) -> Result<String, Error> {
    let mut resolved = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(INTERPOLATION_OPEN) {
        resolved.push_str(&rest[..start]);
        let (after, name) = interpolation_marker(&rest[start..]).map_err(|_| {
            let marker: String = rest[start..].chars().take(20).collect();
            Error::invalid_expression(format!("malformed interpolation marker '{marker}'"), text)
        })?;
        let value = constants
            .get(name)
            .ok_or_else(|| Error::undefined_constant(name, text))?;
        resolved.push_str(&value.to_string());
        rest = after;
    }
    resolved.push_str(rest);
    Ok(resolved)
}

/// Evaluate expression source text to a value.
pub fn evaluate(text: &str, constants: &ConstantTable, config: &ParseConfig) -> Result<Value, Error> {
    evaluate_with_depth(text, constants, config, 0)
}

/// Evaluate with the current block nesting depth, for the dictionary parser
pub(crate) fn evaluate_with_depth(
    text: &str,
    constants: &ConstantTable,
    config: &ParseConfig,
    depth: usize,
) -> Result<Value, Error> {
    // Keys stay literal at every depth; each value is substituted when evaluated
    let source = text.trim();
    if is_block(source) {
        return parse_dictionary_with_depth(source, constants, config, depth + 1)
            .map(Value::Document);
    }
    let resolved = substitute_constants(text, constants)?;
    evaluate_arithmetic(resolved.trim())
        .map(Value::Integer)
        .map_err(|err| match err {
            // Report the source text rather than the substituted one
            Error::InvalidExpression { message, .. } => Error::invalid_expression(message, text),
            other => other,
        })
}

/// Evaluate expression source text that must produce an integer.
pub fn evaluate_integer(
    text: &str,
    constants: &ConstantTable,
    config: &ParseConfig,
) -> Result<Integer, Error> {
    match evaluate(text, constants, config)? {
        Value::Integer(n) => Ok(n),
        Value::Document(_) => Err(Error::invalid_expression(
            "expected an integer, found a block",
            text,
        )),
    }
}
