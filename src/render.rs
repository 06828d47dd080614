//! Output rendering.
//!
//! TOML requires every plain key of a table to come before its sub-tables, so
//! each document level is written with its integers first and its nested
//! documents after them, both in source order. Nested documents become
//! `[parent.child]` sections.

use crate::Error;
use crate::ast::{Document, Value};

/// Output syntax for a translated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Toml,
    #[cfg(feature = "json")]
    Json,
}

fn to_toml_value(value: &Value) -> toml::Value {
    match value {
        Value::Integer(n) => toml::Value::Integer(*n),
        Value::Document(doc) => toml::Value::Table(to_toml_table(doc)),
    }
}

fn to_toml_table(document: &Document) -> toml::Table {
    let (scalars, tables): (Vec<_>, Vec<_>) = document
        .iter()
        .partition(|(_, value)| matches!(value, Value::Integer(_)));

    scalars
        .into_iter()
        .chain(tables)
        .map(|(key, value)| (key.to_owned(), to_toml_value(value)))
        .collect()
}

/// Render a document as TOML text.
pub fn to_toml(document: &Document) -> Result<String, Error> {
    toml::to_string(&to_toml_table(document)).map_err(|e| Error::Render(format!("TOML: {e}")))
}

/// Render a document as pretty-printed JSON text.
#[cfg(feature = "json")]
pub fn to_json(document: &Document) -> Result<String, Error> {
    serde_json::to_string_pretty(document).map_err(|e| Error::Render(format!("JSON: {e}")))
}

pub fn render(document: &Document, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Toml => to_toml(document),
        #[cfg(feature = "json")]
        OutputFormat::Json => to_json(document).map(|mut text| {
            text.push('\n');
            text
        }),
    }
}
