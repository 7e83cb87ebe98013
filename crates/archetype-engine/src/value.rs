// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The typed value carried by context scopes, expression literals, and
//! node attributes.
//!
//! [`Value`] is a small tagged union, immutable once constructed. Coercions
//! that are not well defined (list → int, for example) fail with a
//! [`ValueError`] rather than panicking.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A lazily-produced string payload for the `DYNAMIC` variant.
///
/// Boxed behind an `Arc` so that a `Value` stays cheaply cloneable even
/// when it wraps a closure.
pub type DynamicSupplier = Arc<dyn Fn() -> String + Send + Sync>;

/// The tagged value union used throughout the engine.
///
/// Values are immutable after construction: there is no `set`-style method,
/// only constructors and coercions that return a new `Value`.
#[derive(Clone)]
pub enum Value {
    /// A UTF-8 string.
    String(String),
    /// A 64-bit signed integer.
    Int(i64),
    /// A boolean.
    Boolean(bool),
    /// An ordered list of strings.
    List(Vec<String>),
    /// The deliberate absence of a value (distinct from `NULL`: an `EMPTY`
    /// value is present but carries nothing, used for e.g. an `input-text`
    /// with an empty-string answer that should not coerce to `"0"`-like
    /// surprises).
    Empty,
    /// Explicit null/unset, as distinct from `Empty`. Used for the
    /// preset-with-null-value edge case (`spec.md` §9: treated as absent).
    Null,
    /// A value computed on demand; coerced to a concrete variant when read.
    Dynamic(DynamicSupplier),
}

impl Value {
    /// Returns the type name, for error messages and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "STRING",
            Value::Int(_) => "INT",
            Value::Boolean(_) => "BOOLEAN",
            Value::List(_) => "LIST",
            Value::Empty => "EMPTY",
            Value::Null => "NULL",
            Value::Dynamic(_) => "DYNAMIC",
        }
    }

    /// `true` for [`Value::Null`], the one variant that participates in
    /// identity comparisons instead of typed equality.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Forces a `Dynamic` value down to its concrete form; all other
    /// variants are returned unchanged (cheaply cloned).
    pub fn resolved(&self) -> Value {
        match self {
            Value::Dynamic(supplier) => Value::String(supplier()),
            other => other.clone(),
        }
    }

    /// Coerces to `bool`. Only `Boolean` and the strings `"true"`/`"false"`
    /// coerce; anything else is a [`ValueError::TypeMismatch`].
    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self.resolved() {
            Value::Boolean(b) => Ok(b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(ValueError::TypeMismatch {
                expected: "BOOLEAN",
                found: other.type_name(),
            }),
        }
    }

    /// Coerces to `i64`. Only `Int` and strings parseable as an integer
    /// coerce; lists never coerce to int.
    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self.resolved() {
            Value::Int(i) => Ok(i),
            Value::String(s) => s.parse::<i64>().map_err(|_| ValueError::ParseError {
                text: s,
                target: "INT",
            }),
            other => Err(ValueError::TypeMismatch {
                expected: "INT",
                found: other.type_name(),
            }),
        }
    }

    /// Coerces to a displayable string. Every variant except `Null` and
    /// `Empty` can be stringified; lists join with `,`.
    pub fn as_string(&self) -> Result<String, ValueError> {
        match self.resolved() {
            Value::String(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::List(items) => Ok(items.join(",")),
            Value::Empty => Ok(String::new()),
            other @ Value::Null => Err(ValueError::TypeMismatch {
                expected: "STRING",
                found: other.type_name(),
            }),
            Value::Dynamic(_) => unreachable!("resolved() removes Dynamic"),
        }
    }

    /// Coerces to `Vec<String>`. Only `List` coerces; a bare `String` is
    /// never silently treated as a single-element list.
    pub fn as_list(&self) -> Result<Vec<String>, ValueError> {
        match self.resolved() {
            Value::List(items) => Ok(items),
            other => Err(ValueError::TypeMismatch {
                expected: "LIST",
                found: other.type_name(),
            }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::List(items) => write!(f, "List({items:?})"),
            Value::Empty => write!(f, "Empty"),
            Value::Null => write!(f, "Null"),
            Value::Dynamic(_) => write!(f, "Dynamic(<fn>)"),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality. `Null` compares equal only to `Null` (a direct
    /// identity check, per `spec.md` §4.A); mismatched kinds are simply
    /// unequal rather than an error (callers needing the type-checked
    /// comparison should go through the expression evaluator instead).
    fn eq(&self, other: &Self) -> bool {
        match (self.resolved(), other.resolved()) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Empty, Value::Empty) => true,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Errors raised by [`Value`] coercions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A coercion was attempted between incompatible kinds.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind the caller required.
        expected: &'static str,
        /// The kind actually found.
        found: &'static str,
    },
    /// A dynamic string could not be parsed into the target kind.
    #[error("could not parse {text:?} as {target}")]
    ParseError {
        /// The source text.
        text: String,
        /// The kind it failed to parse into.
        target: &'static str,
    },
}
