// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The orchestrator that drives one run of a script to an [`OutputPlan`]
//! (`spec.md` §4.F).
//!
//! `Controller::run` loads the entry script, optionally validates it, then
//! walks it with a [`Run`] visitor that gives every node kind its runtime
//! meaning: presets and variables write into the [`ContextTree`], inputs
//! suspend on the [`InputResolver`], `call`/`source`/`exec`/`invoke*`
//! recurse — possibly into a different script's own arena entirely — and
//! `file`/`template`/`files`/`templates`/`model-*` accumulate into the
//! plan handed back to the caller.

use crate::context::{ContextError, ContextTree, ValueKind};
use crate::expr::{EvalError, Expression, ExprFormatError, VariableResolver};
use crate::loader::{directory_of, LoaderError, ScriptLoader, VirtualFs};
use crate::node::{AttributeValue, Node, NodeKind};
use crate::plan::{
    apply_transformation_chain, FileDirective, FileSetDirective, ModelEntry, OutputPlan, PlanError,
    TemplateDirective, TemplateSetDirective, TransformStep, Transformation,
};
use crate::resolver::{InputDescriptor, InputKind, InputOption, InputResolver, ResolverError};
use crate::script::Script;
use crate::validator::{validate, Diagnostic};
use crate::value::Value;
use crate::walker::{self, ControlFlow, Visitor};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors a controller run may fail with.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Failure loading the entry script or a `source`/`exec`/`invoke*`
    /// target.
    #[error(transparent)]
    Loader(#[from] LoaderError),
    /// Failure reading or writing the context tree.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// The input resolver refused or failed to supply a value.
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    /// An expression failed to evaluate.
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// A value-interpolation expression failed to compile.
    #[error(transparent)]
    Expr(#[from] ExprFormatError),
    /// Output-plan assembly failed (bad glob, bad regex, unknown
    /// transformation id).
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// A `call` named a method this script never declared.
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
    /// The resolver returned a value whose runtime kind doesn't match the
    /// input's declared kind (`spec.md` §4.F item 2, §7).
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

/// Tunables for a controller run.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Run the static [`crate::validator`] over the entry script before
    /// walking it, surfacing diagnostics alongside the plan rather than
    /// failing the run outright.
    pub validate_before_run: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            validate_before_run: true,
        }
    }
}

/// The result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The accumulated output plan.
    pub plan: OutputPlan,
    /// Static diagnostics for the entry script, if
    /// [`ControllerConfig::validate_before_run`] was set.
    pub diagnostics: Vec<Diagnostic>,
}

/// Drives one script to completion.
pub struct Controller<'a, F: VirtualFs, R: InputResolver> {
    loader: &'a ScriptLoader<F>,
    resolver: &'a R,
    config: ControllerConfig,
}

impl<'a, F: VirtualFs, R: InputResolver> Controller<'a, F, R> {
    /// Builds a controller over `loader`, asking `resolver` for any input
    /// value the script doesn't already have.
    pub fn new(loader: &'a ScriptLoader<F>, resolver: &'a R, config: ControllerConfig) -> Self {
        Controller {
            loader,
            resolver,
            config,
        }
    }

    /// Runs `entry_path` to completion.
    pub fn run(&self, entry_path: &str) -> Result<RunOutcome, ControllerError> {
        let mut load_stack = Vec::new();
        let entry_script = self.loader.load(entry_path, &mut load_stack)?;
        load_stack.push(entry_path.to_string());

        let diagnostics = if self.config.validate_before_run {
            validate(&entry_script)
        } else {
            Vec::new()
        };

        let transformations = collect_transformations(&entry_script)?;
        let context = ContextTree::new();
        let mut run = Run {
            loader: self.loader,
            resolver: self.resolver,
            context: &context,
            plan: OutputPlan::default(),
            transformations,
            load_stack,
            directory_stack: vec![directory_of(entry_path).to_string()],
            model_order: HashMap::new(),
            next_model_index: 0,
        };

        walker::walk(&entry_script, entry_script.root(), &mut run)?;
        Ok(RunOutcome {
            plan: run.plan,
            diagnostics,
        })
    }
}

/// Wraps a [`ContextTree`] as an expression [`VariableResolver`], always
/// resolving from the tree's root (global-implicit unless `~`-prefixed).
struct ContextResolver<'a> {
    context: &'a ContextTree,
}

impl VariableResolver for ContextResolver<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.context.get_value(name).ok().flatten()
    }
}

struct Run<'a, F: VirtualFs, R: InputResolver> {
    loader: &'a ScriptLoader<F>,
    resolver: &'a R,
    context: &'a ContextTree,
    plan: OutputPlan,
    transformations: BTreeMap<String, Transformation>,
    load_stack: Vec<String>,
    directory_stack: Vec<String>,
    model_order: HashMap<String, (i64, usize)>,
    next_model_index: usize,
}

impl<'a, F: VirtualFs, R: InputResolver> Run<'a, F, R> {
    fn guard_passes(&self, node: &Node) -> Result<bool, ControllerError> {
        match &node.expression {
            Some(expr) => Ok(expr.evaluate_condition(&ContextResolver { context: self.context })?),
            None => Ok(true),
        }
    }

    fn interpolate(&self, raw: &str) -> Result<Value, ControllerError> {
        let expr = Expression::compile_value(raw)?;
        Ok(expr.evaluate(&ContextResolver { context: self.context })?)
    }

    fn current_directory(&self) -> String {
        self.directory_stack.last().cloned().unwrap_or_default()
    }

    fn enter_input(&mut self, script: &Script, node: &Node) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        let path = node.attr_str("path").unwrap_or_default().to_string();
        if self.context.get_value(&path)?.is_none() {
            let descriptor = self.build_input_descriptor(script, node)?;
            let value = self.resolver.resolve(&descriptor)?;
            if descriptor.optional && value.is_null() {
                return Ok(ControlFlow::SkipSubtree);
            }
            let resolved = value.resolved();
            if !value_matches_input_kind(descriptor.kind, &resolved) {
                return Err(ControllerError::InputTypeMismatch {
                    path,
                    expected: descriptor.kind,
                    found: resolved.type_name(),
                });
            }
            self.context.put_value(&path, resolved.clone(), ValueKind::User)?;
            if matches!(descriptor.kind, InputKind::Enum | InputKind::List) {
                if self.enter_selected_options(script, node, &resolved)? == ControlFlow::Stop {
                    return Ok(ControlFlow::Stop);
                }
            }
        }
        Ok(ControlFlow::SkipSubtree)
    }

    /// Walks into the children of whichever `option` node(s) the resolver's
    /// answer selected, so presets/variables/output directives nested under
    /// a chosen option actually run (`spec.md` §4.F item 3).
    fn enter_selected_options(
        &mut self,
        script: &Script,
        node: &Node,
        value: &Value,
    ) -> Result<ControlFlow, ControllerError> {
        let chosen: Vec<String> = match value.resolved() {
            Value::List(items) => items,
            other => vec![other.as_string().map_err(EvalError::from)?],
        };
        for &child in script.children(node.id) {
            let option_node = script.node(child);
            if option_node.kind != NodeKind::Option {
                continue;
            }
            let option_value = option_node.attr_str("value").unwrap_or_default();
            if !chosen.iter().any(|v| v == option_value) {
                continue;
            }
            if !self.guard_passes(option_node)? {
                continue;
            }
            let option_id = option_node.id;
            for &grandchild in script.children(option_id) {
                if walker::walk(script, grandchild, self)? == ControlFlow::Stop {
                    return Ok(ControlFlow::Stop);
                }
            }
        }
        Ok(ControlFlow::Continue)
    }

    fn build_input_descriptor(
        &self,
        script: &Script,
        node: &Node,
    ) -> Result<InputDescriptor, ControllerError> {
        let kind = match node.kind {
            NodeKind::InputBoolean => InputKind::Boolean,
            NodeKind::InputText => InputKind::Text,
            NodeKind::InputEnum => InputKind::Enum,
            NodeKind::InputList => InputKind::List,
            _ => unreachable!("only input kinds reach build_input_descriptor"),
        };
        let path = node.attr_str("path").unwrap_or_default().to_string();
        let name = path.rsplit('.').next().unwrap_or(&path).to_string();
        let label = node.attr_str("label").unwrap_or(&name).to_string();
        let help = node.attr_str("help").map(str::to_string);
        let optional = node.attr_bool("optional");
        let default = node.attr_str("default").map(|d| default_value(kind, d));

        let mut options = Vec::new();
        if matches!(kind, InputKind::Enum | InputKind::List) {
            for &child in script.children(node.id) {
                let option_node = script.node(child);
                if option_node.kind != NodeKind::Option {
                    continue;
                }
                if !self.guard_passes(option_node)? {
                    continue;
                }
                let value = option_node.attr_str("value").unwrap_or_default().to_string();
                let label = option_node
                    .attr_str("label")
                    .unwrap_or(&value)
                    .to_string();
                let help = option_node.attr_str("help").map(str::to_string);
                options.push(InputOption { value, label, help });
            }
        }

        Ok(InputDescriptor {
            kind,
            name,
            path,
            label,
            help,
            default,
            options,
            optional,
        })
    }

    fn enter_preset_or_variable(&mut self, node: &Node, kind: ValueKind) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        if let Some(path) = node.attr_str("path") {
            if let Some(raw) = node.attr_str("value") {
                let value = self.interpolate(raw)?;
                self.context.put_value(path, value, kind)?;
            }
        }
        Ok(ControlFlow::SkipSubtree)
    }

    fn enter_file_like(&mut self, node: &Node, is_template: bool) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        let source = node.attr_str("source").unwrap_or_default().to_string();
        let target_raw = node.attr_str("target").unwrap_or_default();
        let target = self
            .interpolate(target_raw)
            .and_then(|v| Ok(v.as_string().unwrap_or_else(|_| target_raw.to_string())))
            .unwrap_or_else(|_| target_raw.to_string());
        let ids = transformation_ids(node);
        let target = apply_transformation_chain(&target, &ids, &self.transformations)?;
        if is_template {
            self.plan.templates.push(TemplateDirective { source, target });
        } else {
            self.plan.files.push(FileDirective { source, target });
        }
        Ok(ControlFlow::SkipSubtree)
    }

    fn enter_file_set_like(
        &mut self,
        script: &Script,
        node: &Node,
        is_template: bool,
    ) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        let directory = node.attr_str("directory").unwrap_or_default().to_string();
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for &child in script.children(node.id) {
            let c = script.node(child);
            match c.kind {
                NodeKind::Includes => {
                    if let Some(p) = c.attr_str("pattern") {
                        includes.push(p.to_string());
                    }
                }
                NodeKind::Excludes => {
                    if let Some(p) = c.attr_str("pattern") {
                        excludes.push(p.to_string());
                    }
                }
                _ => {}
            }
        }
        let transformations = transformation_ids(node);
        if is_template {
            self.plan.template_sets.push(TemplateSetDirective {
                directory,
                includes,
                excludes,
                transformations,
            });
        } else {
            self.plan.file_sets.push(FileSetDirective {
                directory,
                includes,
                excludes,
                transformations,
            });
        }
        Ok(ControlFlow::SkipSubtree)
    }

    fn enter_model(&mut self, node: &Node) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        let key = node.attr_str("key").unwrap_or_default().to_string();
        let order = match node.attribute("order") {
            Some(AttributeValue::Int(i)) => i,
            _ => 0,
        };
        let raw_value = node.attr_str("value").unwrap_or_default().to_string();
        let entry = match node.kind {
            NodeKind::ModelValue => ModelEntry::Value(raw_value),
            NodeKind::ModelList => ModelEntry::List(vec![raw_value]),
            NodeKind::ModelMap => ModelEntry::Map(vec![(key.clone(), raw_value)]),
            _ => unreachable!("only model-* kinds reach enter_model"),
        };
        self.merge_model(key, order, entry);
        Ok(ControlFlow::SkipSubtree)
    }

    fn merge_model(&mut self, key: String, order: i64, entry: ModelEntry) {
        let index = self.next_model_index;
        self.next_model_index += 1;
        let should_replace = match self.model_order.get(&key) {
            None => true,
            Some(&(existing_order, existing_index)) => (order, index) >= (existing_order, existing_index),
        };

        match (&entry, self.plan.model.get(&key)) {
            (ModelEntry::List(items), Some(ModelEntry::List(existing))) => {
                let mut merged = existing.clone();
                merged.extend(items.clone());
                self.plan.model.insert(key.clone(), ModelEntry::List(merged));
            }
            (ModelEntry::Map(pairs), Some(ModelEntry::Map(existing))) => {
                let mut merged = existing.clone();
                merged.extend(pairs.clone());
                self.plan.model.insert(key.clone(), ModelEntry::Map(merged));
            }
            _ if should_replace => {
                self.plan.model.insert(key.clone(), entry);
            }
            _ => {}
        }
        if should_replace {
            self.model_order.insert(key, (order, index));
        }
    }

    fn enter_call(&mut self, script: &Script, node: &Node) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        let method_name = node.attr_str("method").unwrap_or_default();
        let method_id = script
            .method(method_name)
            .ok_or_else(|| ControllerError::UnknownMethod(method_name.to_string()))?;
        for &child in script.children(method_id) {
            if walker::walk(script, child, self)? == ControlFlow::Stop {
                return Ok(ControlFlow::Stop);
            }
        }
        Ok(ControlFlow::SkipSubtree)
    }

    fn enter_invocation(&mut self, node: &Node, swap_directory: bool) -> Result<ControlFlow, ControllerError> {
        if !self.guard_passes(node)? {
            return Ok(ControlFlow::SkipSubtree);
        }
        let src = node.attr_str("src").unwrap_or_default();
        let caller_dir = self.current_directory();
        let target_path = ScriptLoader::<F>::resolve_relative(&caller_dir, src);

        // `loader.load`'s own stack bookkeeping only guards the duration of
        // one `load` call (scripts never reference other scripts mid-parse);
        // the cycle that actually matters here is a runtime `source`/`exec`
        // chain navigating back into a script still on the walker's call
        // stack, so this frame stays pushed for the whole nested walk below,
        // not just the load.
        if self.load_stack.iter().any(|p| p == &target_path) {
            let mut trail = self.load_stack.clone();
            trail.push(target_path);
            return Err(crate::loader::LoaderError::Cycle(trail).into());
        }
        let target_script = self.loader.load(&target_path, &mut self.load_stack)?;
        let new_dir = if swap_directory {
            node.attr_str("directory")
                .map(str::to_string)
                .unwrap_or_else(|| directory_of(&target_path).to_string())
        } else {
            caller_dir
        };
        self.load_stack.push(target_path);
        self.directory_stack.push(new_dir);
        let outcome = walker::walk(&target_script, target_script.root(), self);
        self.directory_stack.pop();
        self.load_stack.pop();
        outcome?;
        Ok(ControlFlow::SkipSubtree)
    }
}

impl<'a, F: VirtualFs, R: InputResolver> Visitor for Run<'a, F, R> {
    type Error = ControllerError;

    fn enter(&mut self, script: &Script, node_id: crate::node::NodeId) -> Result<ControlFlow, ControllerError> {
        let node = script.node(node_id).clone();
        match node.kind {
            NodeKind::Step | NodeKind::Condition => {
                if self.guard_passes(&node)? {
                    Ok(ControlFlow::Continue)
                } else {
                    Ok(ControlFlow::SkipSubtree)
                }
            }
            NodeKind::Method => Ok(ControlFlow::SkipSubtree),
            NodeKind::InputBoolean | NodeKind::InputText | NodeKind::InputEnum | NodeKind::InputList => {
                self.enter_input(script, &node)
            }
            NodeKind::PresetText | NodeKind::PresetBoolean | NodeKind::PresetEnum | NodeKind::PresetList => {
                self.enter_preset_or_variable(&node, ValueKind::Preset)
            }
            NodeKind::VariableText | NodeKind::VariableBoolean | NodeKind::VariableList => {
                self.enter_preset_or_variable(&node, ValueKind::Variable)
            }
            NodeKind::File => self.enter_file_like(&node, false),
            NodeKind::Template => self.enter_file_like(&node, true),
            NodeKind::Files => self.enter_file_set_like(script, &node, false),
            NodeKind::Templates => self.enter_file_set_like(script, &node, true),
            NodeKind::ModelValue | NodeKind::ModelList | NodeKind::ModelMap => self.enter_model(&node),
            NodeKind::Call => self.enter_call(script, &node),
            NodeKind::Source => self.enter_invocation(&node, false),
            NodeKind::Exec => self.enter_invocation(&node, true),
            NodeKind::Invoke => self.enter_invocation(&node, false),
            NodeKind::InvokeDir => self.enter_invocation(&node, true),
            _ => Ok(ControlFlow::Continue),
        }
    }

    fn exit(&mut self, _script: &Script, _node: crate::node::NodeId) -> Result<(), ControllerError> {
        Ok(())
    }
}

fn default_value(kind: InputKind, raw: &str) -> Value {
    match kind {
        InputKind::Boolean => Value::Boolean(raw == "true"),
        InputKind::List => Value::List(raw.split(',').map(|s| s.trim().to_string()).collect()),
        InputKind::Text | InputKind::Enum => Value::from(raw),
    }
}

/// Whether a resolver's returned (already-resolved, non-null) value is the
/// runtime shape its input kind expects (`spec.md` §4.F item 2).
fn value_matches_input_kind(kind: InputKind, value: &Value) -> bool {
    match (kind, value) {
        (InputKind::Boolean, Value::Boolean(_)) => true,
        (InputKind::Text, Value::String(_) | Value::Empty) => true,
        (InputKind::Enum, Value::String(_)) => true,
        (InputKind::List, Value::List(_)) => true,
        _ => false,
    }
}

fn transformation_ids(node: &Node) -> Vec<String> {
    node.attr_str("transformations")
        .map(|s| {
            s.split(',')
                .map(|x| x.trim().to_string())
                .filter(|x| !x.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn collect_transformations(script: &Script) -> Result<BTreeMap<String, Transformation>, ControllerError> {
    let mut map = BTreeMap::new();
    for id in script.traverse() {
        let node = script.node(id);
        if node.kind != NodeKind::Transformation {
            continue;
        }
        let tid = node.attr_str("id").unwrap_or_default().to_string();
        let mut steps = Vec::new();
        for &child in script.children(id) {
            let c = script.node(child);
            match c.kind {
                NodeKind::Replace => steps.push(TransformStep::Replace {
                    text: c.attr_str("text").unwrap_or_default().to_string(),
                    replacement: c.attr_str("replacement").unwrap_or_default().to_string(),
                }),
                NodeKind::Regex => {
                    let pattern_text = c.attr_str("regex").unwrap_or_default();
                    let pattern = Regex::new(pattern_text).map_err(|source| PlanError::InvalidRegex {
                        pattern: pattern_text.to_string(),
                        source,
                    })?;
                    steps.push(TransformStep::Regex {
                        pattern,
                        replacement: c.attr_str("replacement").unwrap_or_default().to_string(),
                    });
                }
                _ => {}
            }
        }
        map.insert(tid.clone(), Transformation::new(tid, steps));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FixedInputResolver;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;

    struct MemoryFs(Mutex<StdHashMap<String, String>>);

    impl VirtualFs for MemoryFs {
        fn read_to_string(&self, path: &str) -> std::io::Result<String> {
            self.0
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        }
    }

    fn fs_with(files: &[(&str, &str)]) -> MemoryFs {
        let mut map = StdHashMap::new();
        for (path, contents) in files {
            map.insert(path.to_string(), contents.to_string());
        }
        MemoryFs(Mutex::new(map))
    }

    #[test]
    fn simple_global_lift_scenario() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"presets","attrs":{},"children":[2],"id":1,"parent":0},
                {"kind":"preset-text","attrs":{"path":"greeting","value":"hello"},"children":[],"id":2,"parent":1}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = FixedInputResolver::new(StdHashMap::new());
        let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
        let outcome = controller.run("entry.json").unwrap();
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.plan.files.is_empty());
    }

    #[test]
    fn read_only_preset_blocks_later_variable_write() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1,3],"id":0,"parent":null},
                {"kind":"presets","attrs":{},"children":[2],"id":1,"parent":0},
                {"kind":"preset-text","attrs":{"path":"x","value":"1"},"children":[],"id":2,"parent":1},
                {"kind":"variables","attrs":{},"children":[4],"id":3,"parent":0},
                {"kind":"variable-text","attrs":{"path":"x","value":"2"},"children":[],"id":4,"parent":3}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = FixedInputResolver::new(StdHashMap::new());
        let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
        let err = controller.run("entry.json").unwrap_err();
        assert!(matches!(err, ControllerError::Context(ContextError::ReadOnly(_))));
    }

    #[test]
    fn file_directive_collects_into_plan() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"output","attrs":{},"children":[2],"id":1,"parent":0},
                {"kind":"file","attrs":{"source":"README.md.tpl","target":"README.md"},"children":[],"id":2,"parent":1}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = FixedInputResolver::new(StdHashMap::new());
        let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
        let outcome = controller.run("entry.json").unwrap();
        assert_eq!(outcome.plan.files.len(), 1);
        assert_eq!(outcome.plan.files[0].target, "README.md");
    }

    #[test]
    fn preset_under_false_condition_is_unset() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"presets","attrs":{},"children":[2],"id":1,"parent":0},
                {"kind":"condition","attrs":{"if":"false"},"children":[3],"id":2,"parent":1},
                {"kind":"preset-boolean","attrs":{"path":"p1","value":"true"},"children":[],"id":3,"parent":2}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = FixedInputResolver::new(StdHashMap::new());
        let mut load_stack = Vec::new();
        let script = loader.load("entry.json", &mut load_stack).unwrap();
        let context = ContextTree::new();
        let mut run = Run {
            loader: &loader,
            resolver: &resolver,
            context: &context,
            plan: OutputPlan::default(),
            transformations: BTreeMap::new(),
            load_stack,
            directory_stack: vec![String::new()],
            model_order: StdHashMap::new(),
            next_model_index: 0,
        };
        walker::walk(&script, script.root(), &mut run).unwrap();
        assert_eq!(context.get_value("p1").unwrap(), None);
    }

    #[test]
    fn method_called_twice_is_idempotent_for_variables() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1,2,3],"id":0,"parent":null},
                {"kind":"method","attrs":{"name":"m"},"children":[4],"id":1,"parent":0},
                {"kind":"call","attrs":{"method":"m"},"children":[],"id":2,"parent":0},
                {"kind":"call","attrs":{"method":"m"},"children":[],"id":3,"parent":0},
                {"kind":"variable-text","attrs":{"path":"x","value":"1"},"children":[],"id":4,"parent":1}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = FixedInputResolver::new(StdHashMap::new());
        let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
        controller.run("entry.json").unwrap();
    }

    #[test]
    fn conditional_step_skips_its_input_when_false() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"step","attrs":{"if":"false"},"children":[2],"id":1,"parent":0},
                {"kind":"input-text","attrs":{"path":"name","default":"demo"},"children":[],"id":2,"parent":1}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = FixedInputResolver::new(StdHashMap::new());
        let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
        let outcome = controller.run("entry.json").unwrap();
        let _ = outcome;
    }

    #[test]
    fn selecting_an_enum_option_walks_its_children() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"input-enum","attrs":{"path":"runtime"},"children":[2,3],"id":1,"parent":0},
                {"kind":"option","attrs":{"value":"warm"},"children":[4],"id":2,"parent":1},
                {"kind":"option","attrs":{"value":"cold"},"children":[5],"id":3,"parent":1},
                {"kind":"preset-text","attrs":{"path":"pool_size","value":"10"},"children":[],"id":4,"parent":2},
                {"kind":"preset-text","attrs":{"path":"pool_size","value":"0"},"children":[],"id":5,"parent":3}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let mut answers = StdHashMap::new();
        answers.insert("runtime".to_string(), Value::from("warm"));
        let resolver = FixedInputResolver::new(answers);
        let mut load_stack = Vec::new();
        let script = loader.load("entry.json", &mut load_stack).unwrap();
        let context = ContextTree::new();
        let mut run = Run {
            loader: &loader,
            resolver: &resolver,
            context: &context,
            plan: OutputPlan::default(),
            transformations: BTreeMap::new(),
            load_stack,
            directory_stack: vec![String::new()],
            model_order: StdHashMap::new(),
            next_model_index: 0,
        };
        walker::walk(&script, script.root(), &mut run).unwrap();
        assert_eq!(
            context.get_value("pool_size").unwrap(),
            Some(Value::from("10"))
        );
    }

    #[test]
    fn resolver_value_of_wrong_kind_is_rejected() {
        struct WrongKindResolver;
        impl InputResolver for WrongKindResolver {
            fn resolve(&self, _descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
                Ok(Value::from("not-a-boolean"))
            }
        }

        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"input-boolean","attrs":{"path":"confirm"},"children":[],"id":1,"parent":0}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let resolver = WrongKindResolver;
        let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
        let err = controller.run("entry.json").unwrap_err();
        assert!(matches!(
            err,
            ControllerError::InputTypeMismatch {
                expected: InputKind::Boolean,
                ..
            }
        ));
    }
}
