// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The aggregate error type for the archetype engine.
//!
//! Every domain module (`context`, `loader`, `expr`, `plan`, `resolver`,
//! `controller`) owns its own error enum; [`Error`] wraps each behind
//! `#[from]` so an embedder driving [`crate::controller::Controller`] or
//! [`crate::validator::validate`] can match on one type end to end.
//!
//! # Source Context
//!
//! A malformed script document or `if`/value expression can attach an
//! optional [`SourceContext`] (surrounding lines + a caret) whenever the
//! underlying text and a line/column are both available, so an embedder's
//! error message can show the offending line rather than just its text.

use crate::context::ContextError;
use crate::expr::{EvalError, ExprFormatError};
use crate::loader::LoaderError;
use crate::plan::PlanError;
use crate::resolver::{InputKind, ResolverError};
use crate::script::ScriptError;
use std::fmt;
use thiserror::Error;

/// Source context for enhanced error messages.
///
/// Captures a snippet of source code around an error location, enabling
/// rich error messages with line numbers and a caret pointing at the
/// offending column.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// All lines from the source file.
    pub lines: Vec<String>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// The column number where the error occurred (1-indexed).
    pub error_column: usize,
    /// First line number of the snippet (1-indexed).
    pub snippet_start: usize,
    /// Last line number of the snippet (1-indexed).
    pub snippet_end: usize,
}

impl SourceContext {
    /// Creates a source context from source text and an error location,
    /// keeping 3 lines of context on either side.
    pub fn from_source(source: &str, line: usize, column: usize) -> Self {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
        let snippet_start = line.saturating_sub(3).max(1);
        let snippet_end = (line + 3).min(lines.len());

        Self {
            lines,
            error_line: line,
            error_column: column,
            snippet_start,
            snippet_end,
        }
    }

    /// Formats the source snippet with line numbers and an error caret.
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();

        for line_num in self.snippet_start..=self.snippet_end {
            if line_num > self.lines.len() {
                break;
            }

            let line = &self.lines[line_num - 1];
            let is_error_line = line_num == self.error_line;

            result.push_str(&format!("{line_num:4} | {line}\n"));

            if is_error_line {
                result.push_str(&format!(
                    "     | {}^\n",
                    " ".repeat(self.error_column.saturating_sub(1))
                ));
            }
        }

        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// Wraps an `Option<SourceContext>` for use inside a `#[error("...")]`
/// format string, printing nothing when absent.
pub struct OptSourceContextDisplay<'a>(&'a Option<SourceContext>);

impl fmt::Display for OptSourceContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ctx) => write!(f, "{ctx}"),
            None => Ok(()),
        }
    }
}

/// Helper trait for formatting optional source context inline in an error
/// message.
pub trait AsDisplay<'a> {
    /// Wraps self for `Display` formatting.
    fn as_display(&'a self) -> OptSourceContextDisplay<'a>;
}

impl<'a> AsDisplay<'a> for Option<SourceContext> {
    fn as_display(&'a self) -> OptSourceContextDisplay<'a> {
        OptSourceContextDisplay(self)
    }
}

/// A malformed script document, with an optional rich [`SourceContext`].
#[derive(Debug, Error)]
#[error("parse error in {path:?}: {message}\n{}", source_context.as_display())]
pub struct ParseError {
    /// The script path that failed to parse.
    pub path: String,
    /// Description of the parse error.
    pub message: String,
    /// Source context for rich error display, when line/column
    /// information was available.
    pub source_context: Option<SourceContext>,
}

/// The aggregate error type for the archetype engine.
///
/// Every fallible engine operation returns `Result<T, Error>` (or a
/// domain-specific error that converts into this one) so an embedder can
/// match on a single closed set.
#[derive(Debug, Error)]
pub enum Error {
    /// A script document failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Loading a script (I/O, JSON, attribute validation, cycle
    /// detection) failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),
    /// The node arena itself was structurally invalid.
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// A context tree read or write failed.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// An expression failed to compile.
    #[error(transparent)]
    ExprFormat(#[from] ExprFormatError),
    /// An expression failed to evaluate.
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// The input resolver refused or failed to supply a value.
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    /// Output-plan assembly failed.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// A `call` named a method the script never declared.
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
    /// The resolver returned a value whose runtime kind doesn't match the
    /// input's declared kind.
    #[error("input {path:?} expected a {expected:?} value, found {found}")]
    InputTypeMismatch {
        /// The input's context path.
        path: String,
        /// The input's declared kind.
        expected: InputKind,
        /// The value kind the resolver actually returned.
        found: &'static str,
    },
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::controller::ControllerError> for Error {
    fn from(err: crate::controller::ControllerError) -> Self {
        use crate::controller::ControllerError as C;
        match err {
            C::Loader(e) => Error::Loader(e),
            C::Context(e) => Error::Context(e),
            C::Resolver(e) => Error::Resolver(e),
            C::Eval(e) => Error::Eval(e),
            C::Expr(e) => Error::ExprFormat(e),
            C::Plan(e) => Error::Plan(e),
            C::UnknownMethod(name) => Error::UnknownMethod(name),
            C::InputTypeMismatch { path, expected, found } => {
                Error::InputTypeMismatch { path, expected, found }
            }
        }
    }
}
