// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree types for archetype scripts.
//!
//! This module defines the data structures that represent a loaded
//! archetype script. The AST is produced by the loader (`crate::loader`)
//! from whatever collaborator hands it declaration-ordered children and
//! string attributes, and is consumed by the walker and validator.
//!
//! # Structure
//!
//! Nodes live in an arena owned by their [`crate::script::Script`]; a
//! [`NodeId`] is a stable index rather than an owning pointer, which
//! sidesteps the parent-back-reference problem a tree of owned children
//! would otherwise have (`spec.md` §9, "Parent back-references").

use crate::expr::Expression;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An index into a [`crate::script::Script`]'s node arena.
///
/// Stable for the lifetime of the script: nodes are never removed or
/// reordered after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// The closed set of node kinds a script may contain.
///
/// Mirrors `spec.md` §3 exactly; adding a kind here means updating
/// [`allowed_attributes`] and the walker's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// The script root.
    Script,
    /// A labeled step grouping inputs.
    Step,
    /// Container for input declarations.
    Inputs,
    /// A boolean input.
    InputBoolean,
    /// A free-text input.
    InputText,
    /// A single-choice input.
    InputEnum,
    /// A multi-choice input.
    InputList,
    /// One choice within an `input-enum`/`input-list`.
    Option,
    /// Container for preset declarations.
    Presets,
    /// A string preset.
    PresetText,
    /// A boolean preset.
    PresetBoolean,
    /// An enum preset.
    PresetEnum,
    /// A list preset.
    PresetList,
    /// Container for variable declarations.
    Variables,
    /// A string variable.
    VariableText,
    /// A boolean variable.
    VariableBoolean,
    /// A list variable.
    VariableList,
    /// An output directive container.
    Output,
    /// A single file-copy directive.
    File,
    /// A single template-render directive.
    Template,
    /// A directory-scoped set of file-copy directives.
    Files,
    /// A directory-scoped set of template-render directives.
    Templates,
    /// The merged model container.
    Model,
    /// A scalar model entry.
    ModelValue,
    /// A list model entry.
    ModelList,
    /// A map model entry.
    ModelMap,
    /// Glob include patterns for a `files`/`templates` set.
    Includes,
    /// Glob exclude patterns for a `files`/`templates` set.
    Excludes,
    /// A named path transformation.
    Transformation,
    /// A literal substring replacement transformation step.
    Replace,
    /// A regex replacement transformation step.
    Regex,
    /// Container for validation declarations (script-authored, distinct
    /// from the engine's own [`crate::validator`]).
    Validations,
    /// One validation rule.
    Validation,
    /// A named callable subtree.
    Method,
    /// An invocation of a named method.
    Call,
    /// Invocation of another script, directory swapped to the callee.
    Exec,
    /// Invocation of another script, caller's directory preserved.
    Source,
    /// A guard around a subtree, active only when its expression is true.
    Condition,
    /// Invocation of a nested script in the current directory context.
    Invoke,
    /// Invocation of a nested script, explicitly scoped to a directory.
    InvokeDir,
}

impl NodeKind {
    /// `true` for the four input node kinds.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            NodeKind::InputBoolean
                | NodeKind::InputText
                | NodeKind::InputEnum
                | NodeKind::InputList
        )
    }

    /// `true` for the four preset node kinds.
    pub fn is_preset(self) -> bool {
        matches!(
            self,
            NodeKind::PresetText
                | NodeKind::PresetBoolean
                | NodeKind::PresetEnum
                | NodeKind::PresetList
        )
    }

    /// `true` for the three variable node kinds.
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            NodeKind::VariableText | NodeKind::VariableBoolean | NodeKind::VariableList
        )
    }
}

/// A typed attribute value, as exposed by [`Node::attribute`].
///
/// Raw attributes are always strings (the collaborator AST is string-typed
/// per `spec.md` §6); this is the result of interpreting a raw string
/// according to the declared type for its key.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A plain string attribute.
    Str(String),
    /// A boolean attribute, parsed from `"true"`/`"false"`.
    Bool(bool),
    /// An integer attribute.
    Int(i64),
    /// A comma-separated list attribute.
    List(Vec<String>),
}

impl AttributeValue {
    /// Converts to a [`Value`] for use in expression resolution contexts.
    pub fn into_value(self) -> Value {
        match self {
            AttributeValue::Str(s) => Value::String(s),
            AttributeValue::Bool(b) => Value::Boolean(b),
            AttributeValue::Int(i) => Value::Int(i),
            AttributeValue::List(items) => Value::List(items),
        }
    }
}

/// A single AST node.
///
/// Children are referenced by [`NodeId`]; the `parent` back-reference is
/// likewise an index, set for every non-root node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// This node's kind.
    pub kind: NodeKind,
    /// Raw string-valued attributes, keyed by attribute name.
    pub attrs: BTreeMap<String, String>,
    /// Declaration-ordered child node ids.
    pub children: Vec<NodeId>,
    /// This node's own id (redundant with its arena position, kept for
    /// convenience when a `Node` is handled outside the arena, e.g. during
    /// JSON deserialization by `archetype-cli`).
    pub id: NodeId,
    /// The parent node id; `None` only for the script root.
    pub parent: Option<NodeId>,
    /// An optional literal value, for preset/variable/model-value nodes.
    #[serde(skip)]
    pub value: Option<Value>,
    /// An optional expression payload, for `condition`/`option` `if`
    /// guards and for interpolated string attributes.
    #[serde(skip)]
    pub expression: Option<Expression>,
}

impl Node {
    /// Looks up a raw attribute and returns it typed according to `kind`'s
    /// declared attribute types (see [`allowed_attributes`]).
    ///
    /// An `input-boolean`'s `default` attribute, for example, is stored as
    /// a plain string in `attrs` but is exposed here as
    /// [`AttributeValue::Bool`].
    pub fn attribute(&self, key: &str) -> Option<AttributeValue> {
        let raw = self.attrs.get(key)?;
        let ty = allowed_attributes(self.kind)
            .iter()
            .find(|a| a.name == key)
            .map(|a| a.ty)
            .unwrap_or(AttributeType::String);
        Some(match ty {
            AttributeType::String => AttributeValue::Str(raw.clone()),
            AttributeType::Boolean => AttributeValue::Bool(raw == "true"),
            AttributeType::Int => AttributeValue::Int(raw.parse().unwrap_or(0)),
            AttributeType::List => AttributeValue::List(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        })
    }

    /// Convenience: attribute as a plain string, ignoring declared type.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    /// Convenience: attribute as a bool, defaulting to `false` if absent
    /// or not `"true"`.
    pub fn attr_bool(&self, key: &str) -> bool {
        self.attrs.get(key).map(|s| s == "true").unwrap_or(false)
    }
}

/// The declared type of one attribute key, used for typed access and for
/// load-time attribute validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// A plain string.
    String,
    /// `"true"`/`"false"`.
    Boolean,
    /// An integer literal.
    Int,
    /// A comma-separated list.
    List,
}

/// One entry in a kind's allowed-attribute table.
#[derive(Debug, Clone, Copy)]
pub struct AttributeSpec {
    /// The attribute's key.
    pub name: &'static str,
    /// The attribute's declared type.
    pub ty: AttributeType,
    /// Whether the attribute must be present.
    pub required: bool,
}

const fn spec(name: &'static str, ty: AttributeType, required: bool) -> AttributeSpec {
    AttributeSpec { name, ty, required }
}

/// Returns the table of attributes a given [`NodeKind`] may carry.
///
/// The loader validates every attribute key it sees against this table
/// (`spec.md` §3: "attribute keys are validated against each kind's
/// allowed set by the loader"). This replaces any notion of a dynamic
/// config object with one static table per kind (`spec.md` §9).
pub fn allowed_attributes(kind: NodeKind) -> &'static [AttributeSpec] {
    use AttributeType::*;
    match kind {
        NodeKind::Script => &[],
        NodeKind::Step => &[
            spec("label", String, false),
            spec("optional", Boolean, false),
            spec("if", String, false),
        ],
        NodeKind::Inputs => &[],
        NodeKind::InputBoolean | NodeKind::InputText => &[
            spec("path", String, true),
            spec("label", String, false),
            spec("help", String, false),
            spec("default", String, false),
            spec("optional", Boolean, false),
            spec("if", String, false),
        ],
        NodeKind::InputEnum | NodeKind::InputList => &[
            spec("path", String, true),
            spec("label", String, false),
            spec("help", String, false),
            spec("default", String, false),
            spec("optional", Boolean, false),
            spec("if", String, false),
        ],
        NodeKind::Option => &[
            spec("value", String, true),
            spec("label", String, false),
            spec("help", String, false),
            spec("if", String, false),
        ],
        NodeKind::Presets | NodeKind::Variables => &[spec("if", String, false)],
        NodeKind::PresetText | NodeKind::PresetBoolean | NodeKind::PresetEnum | NodeKind::PresetList => {
            &[
                spec("path", String, true),
                spec("value", String, false),
                spec("if", String, false),
            ]
        }
        NodeKind::VariableText | NodeKind::VariableBoolean | NodeKind::VariableList => &[
            spec("path", String, true),
            spec("value", String, false),
            spec("if", String, false),
        ],
        NodeKind::Output => &[],
        NodeKind::File | NodeKind::Template => &[
            spec("source", String, true),
            spec("target", String, true),
            spec("transformations", String, false),
            spec("if", String, false),
        ],
        NodeKind::Files | NodeKind::Templates => &[
            spec("directory", String, true),
            spec("transformations", String, false),
            spec("if", String, false),
        ],
        NodeKind::Model => &[],
        NodeKind::ModelValue | NodeKind::ModelList | NodeKind::ModelMap => &[
            spec("key", String, true),
            spec("value", String, false),
            spec("order", Int, false),
            spec("if", String, false),
        ],
        NodeKind::Includes | NodeKind::Excludes => &[spec("pattern", String, true)],
        NodeKind::Transformation => &[spec("id", String, true)],
        NodeKind::Replace => &[spec("text", String, true), spec("replacement", String, true)],
        NodeKind::Regex => &[spec("regex", String, true), spec("replacement", String, true)],
        NodeKind::Validations => &[],
        NodeKind::Validation => &[spec("description", String, false), spec("regex", String, false)],
        NodeKind::Method => &[spec("name", String, true)],
        NodeKind::Call => &[spec("method", String, true), spec("if", String, false)],
        NodeKind::Exec | NodeKind::Source => &[spec("src", String, true), spec("if", String, false)],
        NodeKind::Invoke | NodeKind::InvokeDir => &[
            spec("src", String, true),
            spec("directory", String, false),
            spec("if", String, false),
        ],
        NodeKind::Condition => &[spec("if", String, true)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_boolean_default_is_typed_bool() {
        let mut attrs = BTreeMap::new();
        attrs.insert("default".to_string(), "true".to_string());
        attrs.insert("path".to_string(), "useDocker".to_string());
        let node = Node {
            kind: NodeKind::InputBoolean,
            attrs,
            children: vec![],
            id: NodeId(0),
            parent: None,
            value: None,
            expression: None,
        };
        assert_eq!(
            node.attribute("default"),
            Some(AttributeValue::Bool(true))
        );
    }

    #[test]
    fn unknown_attribute_defaults_to_string_type() {
        let mut attrs = BTreeMap::new();
        attrs.insert("whatever".to_string(), "123".to_string());
        let node = Node {
            kind: NodeKind::Script,
            attrs,
            children: vec![],
            id: NodeId(0),
            parent: None,
            value: None,
            expression: None,
        };
        assert_eq!(
            node.attribute("whatever"),
            Some(AttributeValue::Str("123".to_string()))
        );
    }

    #[test]
    fn list_attribute_splits_and_trims() {
        let mut attrs = BTreeMap::new();
        attrs.insert("pattern".to_string(), "a, b ,c".to_string());
        let node = Node {
            kind: NodeKind::Transformation,
            attrs,
            children: vec![],
            id: NodeId(0),
            parent: None,
            value: None,
            expression: None,
        };
        // "pattern" isn't declared List for Transformation, so this stays a
        // plain string; exercised here to document that behavior.
        assert_eq!(
            node.attribute("pattern"),
            Some(AttributeValue::Str("a, b ,c".to_string()))
        );
    }
}
