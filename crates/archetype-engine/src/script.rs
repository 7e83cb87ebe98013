// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! A loaded script: a node arena plus its method table and path identity.

use crate::node::{Node, NodeId, NodeKind};
use thiserror::Error;

/// Errors raised while assembling a [`Script`] from a freshly deserialized
/// node list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The node list was empty, or its first entry wasn't `NodeId(0)` with
    /// kind `script`.
    #[error("script {0:?} has no valid root node")]
    MissingRoot(String),
    /// A `method` node's `name` attribute was declared more than once.
    #[error("script {0:?} declares method {1:?} more than once")]
    DuplicateMethod(String, String),
    /// A child or parent id referenced a position outside the arena.
    #[error("script {0:?} has a dangling node reference")]
    DanglingReference(String),
}

/// A loaded script: the node arena produced by the loader, indexed by
/// [`NodeId`], plus the `path -> NodeId` method table collected while
/// walking it (`spec.md` §3, "Script").
pub struct Script {
    path: String,
    nodes: Vec<Node>,
    root: NodeId,
    methods: std::collections::HashMap<String, NodeId>,
}

impl Script {
    /// Assembles a `Script` from a declaration-ordered node list as
    /// produced by JSON deserialization (`crate::loader`).
    ///
    /// `nodes[0]` must be the script root (`NodeId(0)`, kind `script`).
    /// Every `method` node found anywhere in the tree is registered in the
    /// method table, keyed by its `name` attribute.
    pub fn from_nodes(path: String, nodes: Vec<Node>) -> Result<Script, ScriptError> {
        if nodes.is_empty() || nodes[0].id != NodeId(0) || nodes[0].kind != NodeKind::Script {
            return Err(ScriptError::MissingRoot(path));
        }
        for node in &nodes {
            if node.id.0 as usize >= nodes.len() {
                return Err(ScriptError::DanglingReference(path));
            }
            for &child in &node.children {
                if child.0 as usize >= nodes.len() {
                    return Err(ScriptError::DanglingReference(path));
                }
            }
        }

        let mut script = Script {
            path,
            nodes,
            root: NodeId(0),
            methods: std::collections::HashMap::new(),
        };
        script.collect_methods()?;
        Ok(script)
    }

    fn collect_methods(&mut self) -> Result<(), ScriptError> {
        for id in self.traverse() {
            let node = self.node(id);
            if node.kind == NodeKind::Method {
                let name = node
                    .attr_str("name")
                    .unwrap_or_default()
                    .to_string();
                if self.methods.contains_key(&name) {
                    return Err(ScriptError::DuplicateMethod(self.path.clone(), name));
                }
                self.methods.insert(name, id);
            }
        }
        Ok(())
    }

    /// This script's canonical path, as resolved by the loader.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The script's root node id (always `NodeId(0)`).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Looks up a node by id. Panics on an out-of-range id, which would
    /// indicate a bug in the loader's arena construction — `NodeId`s handed
    /// out by this script are always in range.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// This node's declaration-ordered children.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Looks up a declared `method` node by name.
    pub fn method(&self, name: &str) -> Option<NodeId> {
        self.methods.get(name).copied()
    }

    /// Iterates every node's id in depth-first pre-order, root included.
    pub fn traverse(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self.root];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let children = &self.node(id).children;
            for &child in children.iter().rev() {
                stack.push(child);
            }
            Some(id)
        })
    }
}
