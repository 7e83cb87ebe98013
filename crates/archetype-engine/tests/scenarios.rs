// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The worked scenarios from `spec.md` §8, exercised against the public
//! crate API end to end.

use archetype_engine::context::{ContextTree, ValueKind};
use archetype_engine::controller::{Controller, ControllerConfig, ControllerError};
use archetype_engine::loader::{ScriptLoader, VirtualFs};
use archetype_engine::resolver::{InputDescriptor, InputResolver, ResolverError};
use archetype_engine::validator::{validate, DiagnosticCode};
use archetype_engine::{ContextError, Expression, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

struct MemoryFs(Mutex<HashMap<String, String>>);

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
    let mut map = HashMap::new();
    for (path, contents) in files {
        map.insert(path.to_string(), contents.to_string());
    }
    MemoryFs(Mutex::new(map))
}

/// Scenario 2: `put_value("foo", "x", EXTERNAL)` succeeds; a second write
/// at the same path with the same read-only provenance fails.
#[test]
fn read_only_preset_rejects_second_write() {
    let tree = ContextTree::new();
    tree.put_value("foo", Value::from("x"), ValueKind::External).unwrap();
    let err = tree
        .put_value("foo", Value::from("y"), ValueKind::External)
        .unwrap_err();
    assert_eq!(err, ContextError::ReadOnly("foo".to_string()));
}

/// Scenario 3: a list input's option guarded by a false `if` is never
/// surfaced to the resolver, so it can never be prompted for.
#[test]
fn conditional_option_gating_filters_resolver_choices() {
    struct RecordingResolver {
        seen: RefCell<Vec<InputDescriptor>>,
    }
    impl InputResolver for RecordingResolver {
        fn resolve(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
            self.seen.borrow_mut().push(descriptor.clone());
            Ok(Value::from("warm"))
        }
    }

    // A single script whose `presets` precede its `inputs`, so the guard
    // on the "cold" option can reference the already-bound `temp` preset.
    let fs2 = fs_with(&[(
        "entry.json",
        r#"[
            {"kind":"script","attrs":{},"children":[1,3],"id":0,"parent":null},
            {"kind":"presets","attrs":{},"children":[2],"id":1,"parent":0},
            {"kind":"preset-list","attrs":{"path":"temp","value":"`['mild']`"},"children":[],"id":2,"parent":1},
            {"kind":"inputs","attrs":{},"children":[4],"id":3,"parent":0},
            {"kind":"input-list","attrs":{"path":"flavor"},"children":[5,6],"id":4,"parent":3},
            {"kind":"option","attrs":{"value":"warm"},"children":[],"id":5,"parent":4},
            {"kind":"option","attrs":{"value":"cold","if":"${temp} contains 'cold'"},"children":[],"id":6,"parent":4}
        ]"#,
    )]);
    let loader = ScriptLoader::new(fs2, 8);
    let resolver = RecordingResolver {
        seen: RefCell::new(Vec::new()),
    };
    let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
    controller.run("entry.json").unwrap();

    let seen = resolver.seen.borrow();
    assert_eq!(seen.len(), 1);
    let options: Vec<&str> = seen[0].options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(options, vec!["warm"]);
}

/// Scenario 3 (cont'd): walking descends into the subtree of whichever
/// option a list input's resolver answer actually selected, so a `file`
/// directive nested under that option lands in the plan and a directive
/// nested under an unselected option does not.
#[test]
fn selected_list_option_subtree_is_walked_into_plan() {
    let fs = fs_with(&[(
        "entry.json",
        r#"[
            {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
            {"kind":"inputs","attrs":{},"children":[2],"id":1,"parent":0},
            {"kind":"input-list","attrs":{"path":"flavor"},"children":[3,4],"id":2,"parent":1},
            {"kind":"option","attrs":{"value":"warm"},"children":[5],"id":3,"parent":2},
            {"kind":"option","attrs":{"value":"cold"},"children":[6],"id":4,"parent":2},
            {"kind":"file","attrs":{"source":"warm.md.tpl","target":"warm.txt"},"children":[],"id":5,"parent":3},
            {"kind":"file","attrs":{"source":"cold.md.tpl","target":"cold.txt"},"children":[],"id":6,"parent":4}
        ]"#,
    )]);
    let loader = ScriptLoader::new(fs, 8);
    let mut answers: HashMap<String, Value> = HashMap::new();
    answers.insert("flavor".to_string(), Value::List(vec!["warm".into()]));
    let resolver = archetype_engine::resolver::FixedInputResolver::new(answers);
    let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
    let outcome = controller.run("entry.json").unwrap();

    let targets: Vec<&str> = outcome.plan.files.iter().map(|f| f.target.as_str()).collect();
    assert_eq!(targets, vec!["warm.txt"]);
}

/// Scenario 3 (cont'd): a resolver answer whose runtime kind doesn't match
/// the input's declared kind fails the run with `InputTypeMismatch` rather
/// than writing the mismatched value through to the context.
#[test]
fn resolver_returning_wrong_kind_fails_fast() {
    struct StringForBoolean;
    impl InputResolver for StringForBoolean {
        fn resolve(&self, _descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
            Ok(Value::from("yes"))
        }
    }

    let fs = fs_with(&[(
        "entry.json",
        r#"[
            {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
            {"kind":"inputs","attrs":{},"children":[2],"id":1,"parent":0},
            {"kind":"input-boolean","attrs":{"path":"confirm"},"children":[],"id":2,"parent":1}
        ]"#,
    )]);
    let loader = ScriptLoader::new(fs, 8);
    let resolver = StringForBoolean;
    let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
    let err = controller.run("entry.json").unwrap_err();
    assert!(matches!(err, ControllerError::InputTypeMismatch { .. }));
}

/// Scenario 6: `contains` over a LIST/STRING pair, then a type mismatch
/// once the left-hand side is no longer a LIST.
#[test]
fn contains_then_type_mismatch() {
    let mut vars: HashMap<String, Value> = HashMap::new();
    vars.insert(
        "var1".to_string(),
        Value::List(vec!["a".into(), "b".into(), "c".into()]),
    );
    vars.insert("var2".to_string(), Value::from("b"));
    let resolve = |name: &str| vars.get(name).cloned();

    let expr = Expression::compile_value("`${var1} contains ${var2}`").unwrap();
    assert_eq!(expr.evaluate(&resolve).unwrap(), Value::Boolean(true));

    vars.insert("var2".to_string(), Value::from("d"));
    let resolve = |name: &str| vars.get(name).cloned();
    assert_eq!(expr.evaluate(&resolve).unwrap(), Value::Boolean(false));

    vars.insert("var1".to_string(), Value::from("a"));
    let resolve = |name: &str| vars.get(name).cloned();
    assert!(expr.evaluate(&resolve).is_err());
}

/// Scenario 7: an optional input with no `default` produces exactly one
/// `INPUT_OPTIONAL_NO_DEFAULT` diagnostic.
#[test]
fn optional_input_without_default_flags_one_diagnostic() {
    let fs = fs_with(&[(
        "entry.json",
        r#"[
            {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
            {"kind":"inputs","attrs":{},"children":[2],"id":1,"parent":0},
            {"kind":"input-text","attrs":{"path":"name","optional":"true"},"children":[],"id":2,"parent":1}
        ]"#,
    )]);
    let loader = ScriptLoader::new(fs, 8);
    let mut stack = Vec::new();
    let script = loader.load("entry.json", &mut stack).unwrap();
    let diagnostics = validate(&script);
    let matching: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::InputOptionalNoDefault)
        .collect();
    assert_eq!(matching.len(), 1);
}

/// A cycle through `source` is rejected even when every script in the
/// chain is individually already cached.
#[test]
fn cyclical_source_chain_is_rejected() {
    let fs = fs_with(&[
        (
            "a.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"source","attrs":{"src":"b.json"},"children":[],"id":1,"parent":0}
            ]"#,
        ),
        (
            "b.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1],"id":0,"parent":null},
                {"kind":"source","attrs":{"src":"a.json"},"children":[],"id":1,"parent":0}
            ]"#,
        ),
    ]);
    let loader = ScriptLoader::new(fs, 8);
    let resolver = archetype_engine::resolver::FixedInputResolver::new(HashMap::new());
    let controller = Controller::new(&loader, &resolver, ControllerConfig::default());
    let err = controller.run("a.json").unwrap_err();
    assert!(matches!(err, ControllerError::Loader(_)));
}
