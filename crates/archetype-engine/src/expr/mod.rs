// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The expression language used in `if` conditions and value interpolation.
//!
//! # Syntax
//!
//! - Variable references: `${name}` or bare `name`.
//! - Backtick (`` `EXPR` ``) and hash (`#{EXPR}`) forms delimit an
//!   expression within a string; a string with neither delimiter is a
//!   literal (see [`Expression::compile_value`]).
//! - Literals: `'text'`, integers, `true`/`false`, `['a','b']` lists.
//! - Precedence, high to low: `!`, `contains`, comparisons, `&&`, `||`,
//!   ternary `?:`.
//!
//! # Interning
//!
//! [`Expression`] wraps its data in an `Arc` so the [`crate::loader`] can
//! intern by structural equality: two textually identical `if` conditions
//! compile to `==`-equal (and, once interned, pointer-equal) expressions
//! (`spec.md` §3, §8).

mod eval;
mod lexer;
mod parser;
mod token;

pub use eval::{evaluate, evaluate_condition, EvalError, VariableResolver};
pub use lexer::ExprFormatError;
pub use parser::Ast;
pub use token::{Operand, Operator, Token};

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct ExpressionData {
    text: String,
    tokens: Vec<Token>,
    ast: Ast,
}

/// A compiled expression: a declaration-order token list plus a tree used
/// for lazy evaluation, shared behind an `Arc` so that interning (see
/// [`crate::loader::ScriptLoader`]) is a cheap clone.
#[derive(Debug, Clone)]
pub struct Expression {
    data: Arc<ExpressionData>,
}

impl Expression {
    /// Compiles `text` as a full expression (used for `if` conditions,
    /// where no delimiter is required — the whole attribute value is the
    /// expression).
    pub fn compile_condition(text: &str) -> Result<Expression, ExprFormatError> {
        Self::compile_inner(text, text)
    }

    /// Compiles `text` as a value-interpolation expression.
    ///
    /// `` `EXPR` `` and `#{EXPR}` delimit an expression; text without
    /// either delimiter is treated as a literal string (`spec.md` §4.A).
    pub fn compile_value(text: &str) -> Result<Expression, ExprFormatError> {
        if let Some(inner) = strip_backticks(text) {
            Self::compile_inner(text, inner)
        } else if let Some(inner) = strip_hash_braces(text) {
            Self::compile_inner(text, inner)
        } else {
            Ok(Expression {
                data: Arc::new(ExpressionData {
                    text: text.to_string(),
                    tokens: vec![Token::Operand(Operand::Str(text.to_string()))],
                    ast: Ast::Operand(Operand::Str(text.to_string())),
                }),
            })
        }
    }

    fn compile_inner(original: &str, expr_text: &str) -> Result<Expression, ExprFormatError> {
        let tokens = lexer::tokenize(expr_text)?;
        let ast = parser::parse(&tokens)?;
        Ok(Expression {
            data: Arc::new(ExpressionData {
                text: original.to_string(),
                tokens,
                ast,
            }),
        })
    }

    /// The original source text this expression was compiled from.
    pub fn source_text(&self) -> &str {
        &self.data.text
    }

    /// The declaration-order token list, as `spec.md` §3 specifies for
    /// serialization purposes.
    pub fn tokens(&self) -> &[Token] {
        &self.data.tokens
    }

    /// The reverse-Polish instruction list, derived from the evaluation
    /// tree for inspection/serialization.
    pub fn rpn(&self) -> Vec<parser::RpnToken> {
        self.data.ast.to_rpn()
    }

    /// Evaluates this expression for its natural (possibly non-boolean)
    /// result, e.g. for value interpolation.
    pub fn evaluate(&self, resolver: &impl VariableResolver) -> Result<Value, EvalError> {
        eval::evaluate(&self.data.ast, resolver)
    }

    /// Evaluates this expression as a condition: the result must be
    /// boolean or this is an [`EvalError::NonBooleanCondition`].
    pub fn evaluate_condition(&self, resolver: &impl VariableResolver) -> Result<bool, EvalError> {
        eval::evaluate_condition(&self.data.ast, resolver)
    }

    /// `true` if this `Arc` and `other`'s point at the same interned data.
    pub fn is_same_object_as(&self, other: &Expression) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Expression {
    /// Structural equality: two expressions compiled from the same text
    /// compare equal even before either has gone through the loader's
    /// intern map.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data) || *self.data == *other.data
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.text)
    }
}

fn strip_backticks(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'`' && bytes[bytes.len() - 1] == b'`' {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn strip_hash_braces(text: &str) -> Option<&str> {
    if text.starts_with("#{") && text.ends_with('}') && text.len() >= 3 {
        Some(&text[2..text.len() - 1])
    } else {
        None
    }
}
