// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The collaborator contract used to obtain values for undeclared inputs.
//!
//! The walker suspends at a single point — an unresolved `input-*` node —
//! and asks an [`InputResolver`] for a value. The call is synchronous: the
//! engine is a single cooperative thread with no executor of its own
//! (`spec.md` §5), so "suspension" just means the embedder's `resolve` call
//! may block on a human (a terminal prompt, a GUI dialog) before returning.

use crate::value::Value;
use thiserror::Error;

/// The four input shapes a script may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A free-text input.
    Text,
    /// A boolean input.
    Boolean,
    /// A single choice among [`InputDescriptor::options`].
    Enum,
    /// Zero or more choices among [`InputDescriptor::options`].
    List,
}

/// One choice offered by an `enum`/`list` input.
#[derive(Debug, Clone, PartialEq)]
pub struct InputOption {
    /// The value recorded in the context if this option is chosen.
    pub value: String,
    /// A human-facing label, falling back to `value` if not declared.
    pub label: String,
    /// Optional longer-form help text.
    pub help: Option<String>,
}

/// Everything an embedder needs to prompt for one undeclared input
/// (`spec.md` §6, "Input resolver interface").
#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    /// Which of the four input shapes this is.
    pub kind: InputKind,
    /// The input's declared name (its path's final segment).
    pub name: String,
    /// The full context path this input will be bound at.
    pub path: String,
    /// A human-facing label, falling back to `name` if not declared.
    pub label: String,
    /// Optional longer-form help text.
    pub help: Option<String>,
    /// The input's declared default, if any.
    pub default: Option<Value>,
    /// Valid choices, populated for `enum`/`list` inputs only.
    pub options: Vec<InputOption>,
    /// Whether the run may proceed with no value bound at all.
    pub optional: bool,
}

/// Errors an [`InputResolver`] may return.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// The embedder (or the person at the keyboard) aborted the run.
    ///
    /// The walker treats this the same as any other propagated error: it
    /// unwinds immediately with no partial output plan (`spec.md` §5).
    #[error("input resolution was cancelled")]
    Cancelled,
    /// Resolution failed for a reason specific to the embedder (I/O error
    /// reading from a terminal, a GUI widget failing to render, ...).
    #[error("input resolution failed: {0}")]
    Failed(String),
}

/// Supplies a value for one undeclared input.
///
/// Implementations are free to be interactive (a terminal prompt) or
/// pre-seeded (replaying a recorded answer set in tests).
pub trait InputResolver {
    /// Returns a value for the input described by `descriptor`.
    ///
    /// Returning `Ok(Value::Null)` (or, for an `optional` descriptor,
    /// propagating no binding at all) is valid — the controller honors an
    /// optional input's absence rather than treating it as an error.
    fn resolve(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError>;
}

/// An [`InputResolver`] that answers from a fixed, pre-recorded map —
/// useful for tests and for non-interactive embedders that pre-seed every
/// input ahead of the run.
pub struct FixedInputResolver {
    answers: std::collections::HashMap<String, Value>,
}

impl FixedInputResolver {
    /// Builds a resolver from a `path -> value` answer map.
    pub fn new(answers: std::collections::HashMap<String, Value>) -> Self {
        FixedInputResolver { answers }
    }
}

impl InputResolver for FixedInputResolver {
    fn resolve(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
        if let Some(value) = self.answers.get(&descriptor.path) {
            return Ok(value.clone());
        }
        if let Some(default) = &descriptor.default {
            return Ok(default.clone());
        }
        if descriptor.optional {
            return Ok(Value::Null);
        }
        Err(ResolverError::Failed(format!(
            "no recorded answer for {:?}",
            descriptor.path
        )))
    }
}
