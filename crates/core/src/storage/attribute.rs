//! The store's native attribute representation.
//!
//! Mirrors the DynamoDB data model closely enough that a backend can convert
//! one-to-one, while keeping the core free of any SDK types.

use std::cmp::Ordering;
use std::collections::HashMap;

/// A single stored attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, kept in its textual form as the store does.
    N(String),
    Bool(bool),
    Null,
    /// Heterogeneous list.
    L(Vec<AttributeValue>),
    /// Nested map.
    M(HashMap<String, AttributeValue>),
}

/// A stored item: physical attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::Null => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Orders two values the way the store compares them in conditions.
    ///
    /// Strings compare bytewise, numbers numerically. Values of different
    /// types (or non-scalar values) are not comparable.
    pub fn compare(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (Self::S(a), Self::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::N(a), Self::N(b)) => match (a.parse::<i64>(), b.parse::<i64>()) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => {
                    let a: f64 = a.parse().ok()?;
                    let b: f64 = b.parse().ok()?;
                    a.partial_cmp(&b)
                }
            },
            (Self::Bool(a), Self::Bool(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Store semantics of `contains`: substring for strings, membership for lists.
    pub fn contains(&self, needle: &AttributeValue) -> bool {
        match (self, needle) {
            (Self::S(haystack), Self::S(needle)) => haystack.contains(needle.as_str()),
            (Self::L(items), needle) => items.iter().any(|item| item == needle),
            _ => false,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value.to_string())
    }
}
