// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Evaluator for the expression language.
//!
//! Walks the [`Ast`] produced by [`super::parser`] directly rather than a
//! flat RPN program, so that `&&`, `||`, and the ternary can genuinely
//! short-circuit: an operand that would resolve an undeclared variable is
//! simply never evaluated when the short-circuit path doesn't demand it
//! (`spec.md` §4.A, §8).

use super::parser::Ast;
use super::token::Operator;
use crate::value::{Value, ValueError};
use thiserror::Error;

/// Resolves a variable reference to a [`Value`] during evaluation.
///
/// Implemented for any `Fn(&str) -> Option<Value>` closure, matching
/// `spec.md` §4.A's `resolver(name) -> Value?` contract.
pub trait VariableResolver {
    /// Looks up `name`. `None` means unresolved — not necessarily an error,
    /// since a short-circuited branch may never demand it.
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl<F> VariableResolver for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Errors raised while evaluating an expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// An operator was applied to operands of the wrong kind.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// A variable was demanded (not short-circuited away) but the resolver
    /// had no binding for it.
    #[error("unresolved variable: {0}")]
    UnresolvedVariable(String),
    /// A coercion failed while preparing an operand.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// A condition's top-level result was not a boolean.
    #[error("condition did not evaluate to a boolean")]
    NonBooleanCondition,
}

/// Evaluates `ast` for use as a value (the natural result, any kind).
pub fn evaluate(ast: &Ast, resolver: &impl VariableResolver) -> Result<Value, EvalError> {
    match ast {
        Ast::Variable(name) => resolver
            .resolve(name)
            .ok_or_else(|| EvalError::UnresolvedVariable(name.clone())),
        Ast::Operand(op) => Ok(op.clone().into_value()),
        Ast::Not(inner) => {
            let v = evaluate(inner, resolver)?;
            Ok(Value::Boolean(!v.as_bool()?))
        }
        Ast::Binary(Operator::And, lhs, rhs) => {
            let l = evaluate(lhs, resolver)?;
            if !l.as_bool()? {
                return Ok(Value::Boolean(false));
            }
            let r = evaluate(rhs, resolver)?;
            Ok(Value::Boolean(r.as_bool()?))
        }
        Ast::Binary(Operator::Or, lhs, rhs) => {
            let l = evaluate(lhs, resolver)?;
            if l.as_bool()? {
                return Ok(Value::Boolean(true));
            }
            let r = evaluate(rhs, resolver)?;
            Ok(Value::Boolean(r.as_bool()?))
        }
        Ast::Binary(Operator::Contains, lhs, rhs) => {
            let l = evaluate(lhs, resolver)?.resolved();
            let r = evaluate(rhs, resolver)?.resolved();
            match (l, r) {
                (Value::List(items), Value::String(needle)) => {
                    Ok(Value::Boolean(items.contains(&needle)))
                }
                (l, r) => Err(EvalError::TypeMismatch(format!(
                    "contains requires a LIST left-hand side and a STRING right-hand side, found {} and {}",
                    l.type_name(),
                    r.type_name()
                ))),
            }
        }
        Ast::Binary(op, lhs, rhs) if op.is_comparison() => {
            let l = evaluate(lhs, resolver)?.resolved();
            let r = evaluate(rhs, resolver)?.resolved();
            eval_comparison(*op, l, r)
        }
        Ast::Binary(op, _, _) => unreachable!("parser never emits {op:?} as a binary node"),
        Ast::Ternary(cond, then_branch, else_branch) => {
            let c = evaluate(cond, resolver)?;
            if c.as_bool()? {
                evaluate(then_branch, resolver)
            } else {
                evaluate(else_branch, resolver)
            }
        }
    }
}

fn eval_comparison(op: Operator, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    if matches!(op, Operator::Eq | Operator::Ne) && (lhs.is_null() || rhs.is_null()) {
        let identity_equal = lhs.is_null() == rhs.is_null();
        let result = if op == Operator::Eq {
            identity_equal
        } else {
            !identity_equal
        };
        return Ok(Value::Boolean(result));
    }

    match op {
        Operator::Eq | Operator::Ne => {
            if lhs.type_name() != rhs.type_name() {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot compare {} to {}",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            }
            let equal = lhs == rhs;
            Ok(Value::Boolean(if op == Operator::Eq { equal } else { !equal }))
        }
        Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
            let ordering = match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => {
                    return Err(EvalError::TypeMismatch(format!(
                        "ordering comparison requires matching INT or STRING operands, found {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )))
                }
            };
            use std::cmp::Ordering::*;
            let result = match (op, ordering) {
                (Operator::Gt, Greater) => true,
                (Operator::Ge, Greater | Equal) => true,
                (Operator::Lt, Less) => true,
                (Operator::Le, Less | Equal) => true,
                _ => false,
            };
            Ok(Value::Boolean(result))
        }
        _ => unreachable!("only comparison operators reach eval_comparison"),
    }
}

/// Evaluates `ast` as a condition: the top-level result must be boolean.
pub fn evaluate_condition(ast: &Ast, resolver: &impl VariableResolver) -> Result<bool, EvalError> {
    match evaluate(ast, resolver)?.resolved() {
        Value::Boolean(b) => Ok(b),
        _ => Err(EvalError::NonBooleanCondition),
    }
}
