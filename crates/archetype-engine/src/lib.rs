// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # archetype-engine
//!
//! Interpreter for declarative archetype scripts: a script describes a
//! choice-gathering flow (presets, variables, inputs, conditions) that
//! drives the assembly of an [`plan::OutputPlan`] for an external template
//! renderer to materialize.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use archetype_engine::controller::{Controller, ControllerConfig};
//! use archetype_engine::loader::ScriptLoader;
//! use archetype_engine::resolver::FixedInputResolver;
//! use std::collections::HashMap;
//!
//! let loader = ScriptLoader::new(my_fs, 64);
//! let resolver = FixedInputResolver::new(HashMap::new());
//! let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
//! let outcome = controller.run("archetype.json")?;
//! ```

/// The typed value carried by context scopes and expression literals.
pub mod value;
/// Arena-backed script AST types (`Node`/`NodeKind`/`NodeId`).
pub mod node;
/// A loaded script: node arena, root, and method table.
pub mod script;
/// The `${...}` expression language: lexer, parser, evaluator.
pub mod expr;
/// The hierarchical, scoped key/value context tree.
pub mod context;
/// Loads script documents from a [`loader::VirtualFs`], with caching.
pub mod loader;
/// The generic depth-first `enter`/`exit` traversal primitive.
pub mod walker;
/// The collaborator contract for resolving undeclared inputs.
pub mod resolver;
/// The output plan assembled by a controller run.
pub mod plan;
/// Static diagnostics over a script, independent of any run.
pub mod validator;
/// Drives one run of a script to an [`plan::OutputPlan`].
pub mod controller;
/// The aggregate error type and source-context diagnostics.
pub mod error;

pub use context::{ContextError, ContextTree, ValueKind, Visibility};
pub use controller::{Controller, ControllerConfig, ControllerError, RunOutcome};
pub use error::{Error, Result};
pub use expr::{EvalError, Expression, ExprFormatError};
pub use loader::{LoaderError, ScriptLoader, VirtualFs};
pub use node::{Node, NodeId, NodeKind};
pub use plan::{OutputPlan, PlanError};
pub use resolver::{FixedInputResolver, InputDescriptor, InputResolver, ResolverError};
pub use script::{Script, ScriptError};
pub use validator::{validate, Diagnostic, DiagnosticCode};
pub use value::{Value, ValueError};
