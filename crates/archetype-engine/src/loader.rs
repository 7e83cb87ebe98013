// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Loads script documents into [`Script`]s.
//!
//! A script is a JSON document deserializing into a flat, declaration
//! ordered [`Node`] list (`spec.md` §6 drops XML parsing as out of scope;
//! SPEC_FULL.md §5 supplements a JSON document format in its place).
//! Loading is driven by a [`VirtualFs`] so the same loader runs against a
//! real filesystem (`archetype-cli`) or an in-memory fixture (tests).
//!
//! Two caches live here rather than per-run: a path-keyed LRU of parsed
//! [`Script`]s, and a text-keyed map of compiled `if` condition
//! [`Expression`]s (`spec.md` §9, "Global expression intern map... lives
//! inside the loader, not process-wide").

use crate::expr::{Expression, ExprFormatError};
use crate::node::{allowed_attributes, Node};
use crate::script::{Script, ScriptError};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Reads script source text by canonical path.
///
/// Implemented against the real filesystem by `archetype-cli`; tests use an
/// in-memory map.
pub trait VirtualFs: Send + Sync {
    /// Reads the full contents of `path`.
    fn read_to_string(&self, path: &str) -> std::io::Result<String>;
}

/// Errors raised while loading a script.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The underlying [`VirtualFs`] failed to read `path`.
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The script's JSON document failed to parse.
    #[error("malformed script document in {path:?}: {source}")]
    Json {
        /// The path whose document failed to parse.
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// The node arena itself was structurally invalid.
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// An attribute key was not in the node kind's allowed set.
    #[error("{path:?}: node {kind:?} does not allow attribute {attribute:?}")]
    UnknownAttribute {
        /// The script the offending node came from.
        path: String,
        /// The node kind carrying the bad attribute.
        kind: String,
        /// The attribute key that isn't allowed.
        attribute: String,
    },
    /// A required attribute was absent.
    #[error("{path:?}: node {kind:?} is missing required attribute {attribute:?}")]
    MissingAttribute {
        /// The script the offending node came from.
        path: String,
        /// The node kind missing the attribute.
        kind: String,
        /// The attribute key that's required but absent.
        attribute: String,
    },
    /// An `if` attribute failed to compile as an expression.
    #[error(transparent)]
    Expr(#[from] ExprFormatError),
    /// The path being loaded is already on the active load stack.
    #[error("cycle loading script: {0:?}")]
    Cycle(Vec<String>),
}

/// Loads and caches [`Script`]s from a [`VirtualFs`].
pub struct ScriptLoader<F: VirtualFs> {
    fs: F,
    cache: Mutex<LruCache<String, Arc<Script>>>,
    expr_intern: Mutex<std::collections::HashMap<String, Expression>>,
}

impl<F: VirtualFs> ScriptLoader<F> {
    /// Builds a loader over `fs`, caching up to `capacity` parsed scripts.
    pub fn new(fs: F, capacity: usize) -> Self {
        ScriptLoader {
            fs,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1"),
            )),
            expr_intern: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Loads the script at `path`, using and populating both caches.
    ///
    /// `stack` is the caller's currently-active chain of script paths (the
    /// entry script plus every `source`/`exec`/`call`/`invoke` still on the
    /// call stack); the caller is responsible for pushing `path` onto it
    /// before recursing into a nested load and popping it on return, so a
    /// cycle is caught even when every script along the chain is already
    /// cached (`spec.md` §4.C, "Detect cycles").
    pub fn load(&self, path: &str, stack: &mut Vec<String>) -> Result<Arc<Script>, LoaderError> {
        if stack.iter().any(|p| p == path) {
            let mut trail = stack.clone();
            trail.push(path.to_string());
            return Err(LoaderError::Cycle(trail));
        }
        if let Some(script) = self.cache.lock().expect("loader cache poisoned").get(path) {
            return Ok(script.clone());
        }

        stack.push(path.to_string());
        let result = self.load_uncached(path);
        stack.pop();
        let script = Arc::new(result?);

        self.cache
            .lock()
            .expect("loader cache poisoned")
            .put(path.to_string(), script.clone());
        Ok(script)
    }

    fn load_uncached(&self, path: &str) -> Result<Script, LoaderError> {
        let text = self.fs.read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut nodes: Vec<Node> = serde_json::from_str(&text).map_err(|source| LoaderError::Json {
            path: path.to_string(),
            source,
        })?;

        for node in &mut nodes {
            self.validate_attributes(path, node)?;
            if let Some(raw) = node.attrs.get("if") {
                node.expression = Some(self.intern_condition(raw)?);
            }
        }

        Script::from_nodes(path.to_string(), nodes).map_err(LoaderError::Script)
    }

    fn validate_attributes(&self, path: &str, node: &Node) -> Result<(), LoaderError> {
        let spec = allowed_attributes(node.kind);
        for key in node.attrs.keys() {
            if !spec.iter().any(|a| a.name == key) {
                return Err(LoaderError::UnknownAttribute {
                    path: path.to_string(),
                    kind: format!("{:?}", node.kind),
                    attribute: key.clone(),
                });
            }
        }
        for attr in spec {
            if attr.required && !node.attrs.contains_key(attr.name) {
                return Err(LoaderError::MissingAttribute {
                    path: path.to_string(),
                    kind: format!("{:?}", node.kind),
                    attribute: attr.name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Compiles `text` as an `if` condition, reusing an already-interned
    /// expression with the same source text if one exists.
    fn intern_condition(&self, text: &str) -> Result<Expression, ExprFormatError> {
        let mut intern = self.expr_intern.lock().expect("expr intern map poisoned");
        if let Some(existing) = intern.get(text) {
            return Ok(existing.clone());
        }
        let expr = Expression::compile_condition(text)?;
        intern.insert(text.to_string(), expr.clone());
        Ok(expr)
    }

    /// Resolves a `source`/`exec`/`invoke` target path relative to
    /// `caller_directory`, normalizing `.`/`..` components.
    pub fn resolve_relative(caller_directory: &str, src: &str) -> String {
        join_virtual_path(caller_directory, src)
    }
}

/// The directory portion of a virtual path (everything before the final
/// `/`, or `""` for a bare filename).
pub fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

fn join_virtual_path(dir: &str, rel: &str) -> String {
    let mut parts: Vec<&str> = if rel.starts_with('/') {
        Vec::new()
    } else {
        dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    struct MemoryFs(StdMutex<StdHashMap<String, String>>);

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
        MemoryFs(StdMutex::new(map))
    }

    #[test]
    fn loads_and_caches_a_script() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[{"kind":"script","attrs":{},"children":[],"id":0,"parent":null}]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let mut stack = Vec::new();
        let first = loader.load("entry.json", &mut stack).unwrap();
        let second = loader.load("entry.json", &mut stack).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn detects_cycle_on_self_reference() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[{"kind":"script","attrs":{},"children":[],"id":0,"parent":null}]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let mut stack = vec!["entry.json".to_string()];
        let err = loader.load("entry.json", &mut stack).unwrap_err();
        assert!(matches!(err, LoaderError::Cycle(_)));
    }

    #[test]
    fn rejects_unknown_attribute() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[{"kind":"script","attrs":{"bogus":"x"},"children":[],"id":0,"parent":null}]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let mut stack = Vec::new();
        let err = loader.load("entry.json", &mut stack).unwrap_err();
        assert!(matches!(err, LoaderError::UnknownAttribute { .. }));
    }

    #[test]
    fn interns_identical_condition_text() {
        let fs = fs_with(&[(
            "entry.json",
            r#"[
                {"kind":"script","attrs":{},"children":[1,2],"id":0,"parent":null},
                {"kind":"step","attrs":{"if":"${x} == 'y'"},"children":[],"id":1,"parent":0},
                {"kind":"step","attrs":{"if":"${x} == 'y'"},"children":[],"id":2,"parent":0}
            ]"#,
        )]);
        let loader = ScriptLoader::new(fs, 8);
        let mut stack = Vec::new();
        let script = loader.load("entry.json", &mut stack).unwrap();
        let a = script.node(crate::node::NodeId(1)).expression.clone().unwrap();
        let b = script.node(crate::node::NodeId(2)).expression.clone().unwrap();
        assert!(a.is_same_object_as(&b));
    }

    #[test]
    fn join_virtual_path_normalizes_dotdot() {
        assert_eq!(join_virtual_path("a/b", "../c"), "a/c");
        assert_eq!(join_virtual_path("a/b", "/abs/path"), "abs/path");
        assert_eq!(join_virtual_path("a/b", "./c"), "a/b/c");
    }
}
