//! Dictionary blocks.
//!
//! A block is `{ key : value; key : value; ... }`. Items are separated by `;`,
//! a trailing separator is optional and blank items are ignored. Values are
//! expressions, and an expression that is itself a block yields a nested
//! document, so blocks nest to any depth.
//!
//! Splitting is structural: a `;` only separates items when it is outside every
//! nested `{ }` and `( )`, so inner item lists never leak into the outer one.

use crate::ast::Document;
use crate::constants::ConstantTable;
use crate::expression::evaluate_with_depth;
use crate::{Error, MAX_NESTING_DEPTH, ParseConfig};

pub const ITEM_SEPARATOR: char = ';';
pub const KEY_SEPARATOR: char = ':';

/// Whether trimmed text has the outline of a block.
/// The braces are only checked for balance when the block is parsed.
pub fn is_block(text: &str) -> bool {
    text.starts_with('{') && text.ends_with('}')
}

/// Byte index of the `}` closing the `{` that starts `text`
pub fn matching_brace(text: &str) -> Option<usize> {
    if !text.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The text between the outermost braces, trimmed
fn block_body(text: &str) -> Result<&str, Error> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return Err(Error::syntax("block must start with '{'", text));
    }
    match matching_brace(trimmed) {
        Some(end) if end + 1 == trimmed.len() => Ok(trimmed[1..end].trim()),
        Some(end) => Err(Error::syntax(
            format!("unexpected '{}' after closing '}}'", trimmed[end + 1..].trim()),
            text,
        )),
        None => Err(Error::syntax("unclosed '{'", text)),
    }
}

/// Split a block body on separators that sit outside any nested braces or parentheses
fn split_items<'a>(body: &'a str, context: &str) -> Result<Vec<&'a str>, Error> {
    let mut items = Vec::new();
    let mut braces = 0usize;
    let mut parens = 0usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '{' => braces += 1,
            '}' => {
                braces = braces
                    .checked_sub(1)
                    .ok_or_else(|| Error::syntax("unbalanced '}'", context))?;
            }
            '(' => parens += 1,
            ')' => {
                parens = parens
                    .checked_sub(1)
                    .ok_or_else(|| Error::syntax("unbalanced ')'", context))?;
            }
            ITEM_SEPARATOR if braces == 0 && parens == 0 => {
                items.push(&body[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if braces > 0 {
        return Err(Error::syntax("unclosed '{'", context));
    }
    if parens > 0 {
        return Err(Error::syntax("unclosed '('", context));
    }
    items.push(&body[start..]);
    Ok(items)
}

/// Parse a complete block into a document, evaluating every value.
pub fn parse_dictionary(
    text: &str,
    constants: &ConstantTable,
    config: &ParseConfig,
) -> Result<Document, Error> {
    parse_dictionary_with_depth(text, constants, config, 0)
}

pub(crate) fn parse_dictionary_with_depth(
    text: &str,
    constants: &ConstantTable,
    config: &ParseConfig,
    depth: usize,
) -> Result<Document, Error> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(Error::syntax(
            format!("blocks nested too deeply (max depth: {MAX_NESTING_DEPTH})"),
            text,
        ));
    }
    let body = block_body(text)?;
    let mut document = Document::new();

    for item in split_items(body, text)? {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let Some((key, value_text)) = item.split_once(KEY_SEPARATOR) else {
            return Err(Error::syntax(
                "malformed dictionary entry, expected 'key : value'",
                item,
            ));
        };
        let key = key.trim();
        if key.is_empty() || key.contains(['{', '}']) {
            return Err(Error::syntax(
                format!("malformed dictionary entry, invalid key '{key}'"),
                item,
            ));
        }
        let value = evaluate_with_depth(value_text.trim(), constants, config, depth)?;
        document.bind(key.to_owned(), value, config.duplicate_keys, item)?;
    }
    Ok(document)
}
