// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Static diagnostics over a loaded script, independent of any particular
//! run's input values (`spec.md` §4.G).
//!
//! The validator only sees a single script's own tree — it does not follow
//! `source`/`exec`/`call`/`invoke` into other scripts, so a diagnostic here
//! is always attributable to the script actually being checked.

use crate::expr::{Expression, VariableResolver};
use crate::node::{Node, NodeId, NodeKind};
use crate::script::Script;
use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// The closed set of diagnostic codes a validator run may emit
/// (`spec.md` §4.G, "VALIDATION_CODES").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// A `preset` declares a `path` with no resolvable value and no way to
    /// obtain one (presets are never prompted for).
    PresetUnresolved,
    /// A `preset`'s `value` doesn't parse as its declared kind.
    PresetTypeMismatch,
    /// An `if` expression references a variable never declared anywhere
    /// earlier in the script.
    ExprUnresolvedVariable,
    /// An expression built entirely from literals still fails to evaluate.
    ExprEvalError,
    /// The same input `path` is declared more than once.
    InputAlreadyDeclared,
    /// An input's `default` doesn't parse as its declared kind.
    InputTypeMismatch,
    /// An input node appears outside any `step`.
    InputNotInStep,
    /// Two sibling `option` nodes under the same input declare the same
    /// `value`.
    OptionValueAlreadyDeclared,
    /// An `optional` input has no `default` to fall back on.
    InputOptionalNoDefault,
    /// A `step` is declared `optional` but contains no `input-*` children.
    StepDeclaredOptional,
    /// A `step` is not declared `optional` but really should be, because
    /// none of its inputs are mandatory (every one carries a `default`).
    StepNotDeclaredOptional,
    /// A `step` contains no inputs at all.
    StepNoInput,
}

/// One static diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The diagnostic's code.
    pub code: DiagnosticCode,
    /// A human-readable description.
    pub message: String,
    /// The node the diagnostic is attributed to.
    pub node: NodeId,
}

struct NullResolver;
impl VariableResolver for NullResolver {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Runs every static check over `script`, returning every diagnostic found.
pub fn validate(script: &Script) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut declared_paths: HashSet<String> = HashSet::new();
    let mut declared_vars: HashSet<String> = HashSet::new();
    let mut input_count_in_step: HashMap<NodeId, (usize, usize, bool)> = HashMap::new(); // (total, with_default, any_mandatory)

    for id in script.traverse() {
        let node = script.node(id);
        check_expression(script, node, &declared_vars, &mut diagnostics);

        if node.kind.is_input() {
            check_input(script, id, node, &mut declared_paths, &mut diagnostics);
            if let Some(path) = node.attr_str("path") {
                declared_vars.insert(path.to_string());
            }
            if let Some(NodeId(_)) = node.parent {
                if let Some(step) = nearest_step(script, id) {
                    let entry = input_count_in_step.entry(step).or_insert((0, 0, false));
                    entry.0 += 1;
                    let has_default = node.attrs.contains_key("default");
                    if has_default {
                        entry.1 += 1;
                    } else if !node.attr_bool("optional") {
                        entry.2 = true;
                    }
                } else {
                    diagnostics.push(Diagnostic {
                        code: DiagnosticCode::InputNotInStep,
                        message: "input declared outside any step".to_string(),
                        node: id,
                    });
                }
            }
            check_options(script, id, &mut diagnostics);
        }

        if node.kind.is_preset() {
            check_preset(node, &mut diagnostics, id);
            if let Some(path) = node.attr_str("path") {
                declared_vars.insert(path.to_string());
            }
        }

        if node.kind.is_variable() {
            if let Some(path) = node.attr_str("path") {
                declared_vars.insert(path.to_string());
            }
        }

        if node.kind == NodeKind::Step {
            check_step(script, id, node, &mut diagnostics);
        }
    }

    for (step, (total, with_default, any_mandatory)) in input_count_in_step {
        let step_node = script.node(step);
        let declared_optional = step_node.attr_bool("optional");
        if declared_optional && total == 0 {
            diagnostics.push(Diagnostic {
                code: DiagnosticCode::StepDeclaredOptional,
                message: "step declared optional has no inputs to make optional".to_string(),
                node: step,
            });
        }
        if !declared_optional && total > 0 && with_default == total && !any_mandatory {
            diagnostics.push(Diagnostic {
                code: DiagnosticCode::StepNotDeclaredOptional,
                message: "every input in this step has a default; step could be declared optional".to_string(),
                node: step,
            });
        }
    }

    diagnostics
}

fn nearest_step(script: &Script, mut id: NodeId) -> Option<NodeId> {
    while let Some(parent) = script.node(id).parent {
        if script.node(parent).kind == NodeKind::Step {
            return Some(parent);
        }
        id = parent;
    }
    None
}

fn check_step(script: &Script, id: NodeId, node: &Node, diagnostics: &mut Vec<Diagnostic>) {
    let has_input = script
        .traverse()
        .filter(|&d| is_descendant(script, id, d))
        .any(|d| script.node(d).kind.is_input());
    if !has_input {
        diagnostics.push(Diagnostic {
            code: DiagnosticCode::StepNoInput,
            message: "step declares no inputs".to_string(),
            node: id,
        });
    }
    let _ = node;
}

fn is_descendant(script: &Script, ancestor: NodeId, candidate: NodeId) -> bool {
    let mut current = candidate;
    loop {
        if current == ancestor {
            return candidate != ancestor;
        }
        match script.node(current).parent {
            Some(p) => current = p,
            None => return false,
        }
    }
}

fn check_input(
    script: &Script,
    id: NodeId,
    node: &Node,
    declared_paths: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let _ = script;
    if let Some(path) = node.attr_str("path") {
        if !declared_paths.insert(path.to_string()) {
            diagnostics.push(Diagnostic {
                code: DiagnosticCode::InputAlreadyDeclared,
                message: format!("input path {path:?} declared more than once"),
                node: id,
            });
        }
    }
    let optional = node.attr_bool("optional");
    let has_default = node.attrs.contains_key("default");
    if optional && !has_default {
        diagnostics.push(Diagnostic {
            code: DiagnosticCode::InputOptionalNoDefault,
            message: "optional input has no default".to_string(),
            node: id,
        });
    }
    if node.kind == NodeKind::InputBoolean {
        if let Some(default) = node.attr_str("default") {
            if default != "true" && default != "false" {
                diagnostics.push(Diagnostic {
                    code: DiagnosticCode::InputTypeMismatch,
                    message: format!("default {default:?} is not a boolean"),
                    node: id,
                });
            }
        }
    }
}

fn check_options(script: &Script, id: NodeId, diagnostics: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for &child in script.children(id) {
        let child_node = script.node(child);
        if child_node.kind != NodeKind::Option {
            continue;
        }
        if let Some(value) = child_node.attr_str("value") {
            if !seen.insert(value.to_string()) {
                diagnostics.push(Diagnostic {
                    code: DiagnosticCode::OptionValueAlreadyDeclared,
                    message: format!("option value {value:?} declared more than once"),
                    node: child,
                });
            }
        }
    }
}

fn check_preset(node: &Node, diagnostics: &mut Vec<Diagnostic>, id: NodeId) {
    match node.attr_str("value") {
        None => diagnostics.push(Diagnostic {
            code: DiagnosticCode::PresetUnresolved,
            message: "preset declares no value".to_string(),
            node: id,
        }),
        Some(value) => {
            if node.kind == NodeKind::PresetBoolean && value != "true" && value != "false" {
                diagnostics.push(Diagnostic {
                    code: DiagnosticCode::PresetTypeMismatch,
                    message: format!("preset value {value:?} is not a boolean"),
                    node: id,
                });
            }
        }
    }
}

fn check_expression(
    script: &Script,
    node: &Node,
    declared_vars: &HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(expression) = &node.expression else {
        return;
    };
    let unresolved = referenced_variables(expression)
        .into_iter()
        .find(|name| !declared_vars.contains(name.trim_start_matches('~')));
    if let Some(name) = unresolved {
        diagnostics.push(Diagnostic {
            code: DiagnosticCode::ExprUnresolvedVariable,
            message: format!("condition references undeclared variable {name:?}"),
            node: node.id,
        });
        return;
    }
    if referenced_variables(expression).is_empty() {
        if let Err(e) = expression.evaluate(&NullResolver) {
            diagnostics.push(Diagnostic {
                code: DiagnosticCode::ExprEvalError,
                message: e.to_string(),
                node: node.id,
            });
        }
    }
    let _ = script;
}

fn referenced_variables(expression: &Expression) -> Vec<String> {
    use crate::expr::Token;
    expression
        .tokens()
        .iter()
        .filter_map(|t| match t {
            Token::Variable(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn node(kind: NodeKind, id: u32, parent: Option<u32>, attrs: &[(&str, &str)]) -> Node {
        let mut map = BTreeMap::new();
        for (k, v) in attrs {
            map.insert(k.to_string(), v.to_string());
        }
        Node {
            kind,
            attrs: map,
            children: vec![],
            id: NodeId(id),
            parent: parent.map(NodeId),
            value: None,
            expression: None,
        }
    }

    #[test]
    fn optional_input_without_default_flags() {
        let mut root = node(NodeKind::Script, 0, None, &[]);
        root.children = vec![NodeId(1), NodeId(2)];
        let mut step = node(NodeKind::Step, 1, Some(0), &[]);
        step.children = vec![NodeId(2)];
        let input = node(
            NodeKind::InputText,
            2,
            Some(1),
            &[("path", "name"), ("optional", "true")],
        );
        let script = Script::from_nodes("s.json".to_string(), vec![root, step, input]).unwrap();
        let diagnostics = validate(&script);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::InputOptionalNoDefault));
    }

    #[test]
    fn duplicate_input_path_flags() {
        let mut root = node(NodeKind::Script, 0, None, &[]);
        root.children = vec![NodeId(1)];
        let mut step = node(NodeKind::Step, 1, Some(0), &[]);
        step.children = vec![NodeId(2), NodeId(3)];
        let input_a = node(NodeKind::InputText, 2, Some(1), &[("path", "name")]);
        let input_b = node(NodeKind::InputText, 3, Some(1), &[("path", "name")]);
        let script = Script::from_nodes("s.json".to_string(), vec![root, step, input_a, input_b]).unwrap();
        let diagnostics = validate(&script);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::InputAlreadyDeclared));
    }

    #[test]
    fn step_with_no_inputs_flags() {
        let mut root = node(NodeKind::Script, 0, None, &[]);
        root.children = vec![NodeId(1)];
        let step = node(NodeKind::Step, 1, Some(0), &[]);
        let script = Script::from_nodes("s.json".to_string(), vec![root, step]).unwrap();
        let diagnostics = validate(&script);
        assert!(diagnostics.iter().any(|d| d.code == DiagnosticCode::StepNoInput));
    }

    #[test]
    fn clean_script_has_no_diagnostics() {
        let mut root = node(NodeKind::Script, 0, None, &[]);
        root.children = vec![NodeId(1)];
        let mut step = node(NodeKind::Step, 1, Some(0), &[]);
        step.children = vec![NodeId(2)];
        let input = node(NodeKind::InputText, 2, Some(1), &[("path", "name")]);
        let script = Script::from_nodes("s.json".to_string(), vec![root, step, input]).unwrap();
        assert!(validate(&script).is_empty());
    }
}
