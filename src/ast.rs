//! This module defines the value tree a translation produces. [`Value`] is either
//! an integer or a nested [`Document`], and a [`Document`] is an insertion-ordered
//! mapping from keys to values. Both serialize through serde (untagged and
//! transparent respectively) so the renderers see plain integers and maps.
//! Conversions from Rust integers and key/value iterators are provided to keep
//! construction terse in code and tests.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;

use crate::{Error, OnConflict};

/// Type alias for integer values
pub type Integer = i64;

/// A leaf or branch of the output tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(Integer),
    Document(Document),
}

impl Value {
    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            Value::Integer(_) => None,
        }
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(Integer::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(Integer);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Document(doc) => write!(f, "{doc}"),
        }
    }
}

/// Ordered mapping from keys to values; one level of the output hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    entries: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a binding, returning the value it replaced.
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Insert a binding according to a conflict policy.
    /// `context` is the text reported when the policy rejects the duplicate.
    pub fn bind(
        &mut self,
        key: String,
        value: Value,
        policy: OnConflict,
        context: &str,
    ) -> Result<(), Error> {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match policy {
                OnConflict::Overwrite => {
                    log::warn!("key '{}' defined twice, keeping the later value", slot.key());
                    slot.insert(value);
                }
                OnConflict::Reject => {
                    return Err(Error::syntax(
                        format!("duplicate key '{}'", slot.key()),
                        context,
                    ));
                }
            },
        }
        Ok(())
    }

    /// Merge another document into this one, key by key, left to right.
    /// Merging is shallow: a nested document under a repeated key is replaced whole.
    pub fn merge(&mut self, other: Document, policy: OnConflict, context: &str) -> Result<(), Error> {
        for (key, value) in other.entries {
            self.bind(key, value, policy, context)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Document {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Document {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Displays in source syntax, so a document can be fed back to the parser
impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (key, value) in &self.entries {
            write!(f, " {key} : {value};")?;
        }
        write!(f, " }}")
    }
}

/// Helper for building values in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper for building documents in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn doc<K: Into<String>, const N: usize>(entries: [(K, Value); N]) -> Document {
    entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        let test_cases = vec![
            (val(42), Value::Integer(42)),
            (val(-17), Value::Integer(-17)),
            (val(255u8), Value::Integer(255)),
            (val(-32768i16), Value::Integer(-32768)),
            (val(4294967295u32), Value::Integer(4294967295)),
            (val(Integer::MIN), Value::Integer(Integer::MIN)),
            (val(Document::new()), Value::Document(Document::new())),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "Test case {} failed", i + 1);
        }
    }

    #[test]
    fn test_insert_keeps_first_position() {
        let mut d = doc([("a", val(1)), ("b", val(2))]);
        assert_eq!(d.insert("a", 3), Some(Value::Integer(1)));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(d.get("a"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_merge_overwrites_later_keys() {
        let mut left = doc([("k", val(1)), ("x", val(doc([("y", val(2))])))]);
        let right = doc([("k", val(2)), ("x", val(5))]);
        assert!(left.merge(right, OnConflict::Overwrite, "").is_ok());
        assert_eq!(left, doc([("k", val(2)), ("x", val(5))]));
    }

    #[test]
    fn test_bind_rejects_duplicates_when_asked() {
        let mut d = doc([("k", val(1))]);
        let err = d.bind("k".into(), val(2), OnConflict::Reject, "{ k : 2; }");
        assert!(matches!(
            err,
            Err(Error::Syntax { ref message, ref context })
                if message.contains("duplicate key 'k'") && context == "{ k : 2; }"
        ));
        assert_eq!(d.get("k"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_display_is_source_syntax() {
        let d = doc([("a", val(1)), ("b", val(doc([("c", val(-2))])))]);
        assert_eq!(d.to_string(), "{ a : 1; b : { c : -2; }; }");
        assert_eq!(Document::new().to_string(), "{ }");
    }

    #[test]
    fn test_accessors() {
        let nested = doc([("c", val(5))]);
        let v = val(nested.clone());
        assert_eq!(v.as_document(), Some(&nested));
        assert_eq!(v.as_integer(), None);
        assert_eq!(val(5).as_integer(), Some(5));
        assert!(nested.contains_key("c"));
        assert_eq!(nested.len(), 1);
        assert!(!nested.is_empty());
    }
}
