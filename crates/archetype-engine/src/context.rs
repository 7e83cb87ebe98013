// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The hierarchical, scoped key/value context tree accumulated during a run.
//!
//! A [`ContextTree`] is an arena of [`Scope`]s (mirroring [`crate::node`]'s
//! `NodeId` arena) behind a single `RwLock`, the same "one lock guards the
//! whole store" shape as the teacher's `kv::memory::MemoryKVStore`. Unlike
//! the KV store, a scope's binding additionally carries [`Visibility`] and
//! [`ValueKind`] (provenance), since context resolution depends on both.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// An index into a [`ContextTree`]'s scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// Whether a scope is reachable from outside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Reachable from any ancestor by its own id, without the ancestor
    /// prefix (`spec.md` §3, §4.D).
    Global,
    /// Reachable only as a descendant of its declaring scope.
    Local,
    /// An intermediate scope created implicitly by `get_or_create`; carries
    /// no reachability guarantee of its own.
    Unset,
}

/// How a bound value entered the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A script-declared `preset`; read-only for the rest of the run.
    Preset,
    /// Supplied by the user via the `InputResolver`.
    User,
    /// Supplied by the embedder before the run started; read-only.
    External,
    /// An input's `default` attribute, used when nothing else supplied a
    /// value.
    Default,
    /// A script-declared `variable`; overwritable (last-writer-wins) unless
    /// a `Preset` already occupies the path.
    Variable,
}

impl ValueKind {
    fn is_read_only(self) -> bool {
        matches!(self, ValueKind::Preset | ValueKind::External)
    }
}

/// Errors raised by context tree operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A path failed the `segment (. segment)*` grammar.
    #[error("invalid path {0:?}")]
    InvalidPath(String),
    /// A write targeted a scope already bound to a read-only value.
    #[error("path {0:?} is read-only")]
    ReadOnly(String),
    /// A scope already exists with an incompatible declared visibility.
    #[error("visibility conflict at {0:?}")]
    VisibilityConflict(String),
}

struct Binding {
    value: Value,
    kind: ValueKind,
}

struct ScopeData {
    segment: String,
    visibility: Visibility,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    binding: Option<Binding>,
}

/// A read-only snapshot of one scope, handed to [`ContextTree::visit_edges`]
/// callbacks.
pub struct ScopeView<'a> {
    /// This scope's own path segment.
    pub segment: &'a str,
    /// This scope's declared visibility.
    pub visibility: Visibility,
    /// The bound value and its provenance, if any.
    pub value: Option<(&'a Value, ValueKind)>,
}

struct Inner {
    scopes: Vec<ScopeData>,
    /// `segment -> ScopeId` for every scope currently holding `Global`
    /// visibility, used only to enforce the "name collisions across GLOBAL
    /// siblings are an error" invariant at creation time — resolution
    /// itself walks the tree directly (see [`ContextTree::get_value_from`]).
    global_ids: HashMap<String, ScopeId>,
}

/// The hierarchical context tree described in `spec.md` §3, §4.D.
pub struct ContextTree {
    inner: RwLock<Inner>,
}

impl Default for ContextTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTree {
    /// Creates a tree containing only its root scope (`visibility = Unset`).
    pub fn new() -> Self {
        let root = ScopeData {
            segment: String::new(),
            visibility: Visibility::Unset,
            parent: None,
            children: Vec::new(),
            binding: None,
        };
        ContextTree {
            inner: RwLock::new(Inner {
                scopes: vec![root],
                global_ids: HashMap::new(),
            }),
        }
    }

    /// The tree's root scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Parses `path (. path)*` into its segments, rejecting empty segments,
    /// leading/trailing dots, and illegal characters.
    fn parse_segments(path: &str) -> Result<Vec<String>, ContextError> {
        if path.is_empty() {
            return Err(ContextError::InvalidPath(path.to_string()));
        }
        let segments: Vec<&str> = path.split('.').collect();
        for s in &segments {
            if s.is_empty() || !s.chars().all(is_path_char) {
                return Err(ContextError::InvalidPath(path.to_string()));
            }
        }
        Ok(segments.into_iter().map(str::to_string).collect())
    }

    /// Splits a lookup path into (`local_only`, segments), stripping a
    /// leading `~` (current-scope-relative marker).
    fn parse_lookup_path(path: &str) -> Result<(bool, Vec<String>), ContextError> {
        if let Some(rest) = path.strip_prefix('~') {
            Ok((true, Self::parse_segments(rest)?))
        } else {
            Ok((false, Self::parse_segments(path)?))
        }
    }

    /// Walks or creates the scopes named by `path`, anchored at the root.
    ///
    /// Intermediate scopes are created with `Unset` visibility. If the
    /// final scope already exists, its declared visibility must equal
    /// `visibility` or be `Unset` (which is then upgraded); any other
    /// mismatch is a [`ContextError::VisibilityConflict`].
    pub fn get_or_create(&self, path: &str, visibility: Visibility) -> Result<ScopeId, ContextError> {
        let segments = Self::parse_segments(path)?;
        let mut inner = self.inner.write().expect("context lock poisoned");
        let mut current = ScopeId(0);
        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            let requested = if i == last { visibility } else { Visibility::Unset };
            current = Self::child_get_or_create(&mut inner, current, segment, requested)?;
        }
        Ok(current)
    }

    fn child_get_or_create(
        inner: &mut Inner,
        parent: ScopeId,
        segment: &str,
        requested: Visibility,
    ) -> Result<ScopeId, ContextError> {
        let existing = inner.scopes[parent.0 as usize]
            .children
            .iter()
            .copied()
            .find(|&c| inner.scopes[c.0 as usize].segment == segment);

        if let Some(id) = existing {
            let current_vis = inner.scopes[id.0 as usize].visibility;
            match (current_vis, requested) {
                (a, b) if a == b => {}
                (Visibility::Unset, upgraded) => {
                    Self::set_visibility(inner, id, upgraded)?;
                }
                (_, Visibility::Unset) => {}
                _ => return Err(ContextError::VisibilityConflict(segment.to_string())),
            }
            return Ok(id);
        }

        let id = ScopeId(inner.scopes.len() as u32);
        inner.scopes.push(ScopeData {
            segment: segment.to_string(),
            visibility: requested,
            parent: Some(parent),
            children: Vec::new(),
            binding: None,
        });
        inner.scopes[parent.0 as usize].children.push(id);
        if requested == Visibility::Global {
            Self::register_global(inner, segment, id)?;
        }
        Ok(id)
    }

    fn set_visibility(inner: &mut Inner, id: ScopeId, visibility: Visibility) -> Result<(), ContextError> {
        inner.scopes[id.0 as usize].visibility = visibility;
        if visibility == Visibility::Global {
            let segment = inner.scopes[id.0 as usize].segment.clone();
            Self::register_global(inner, &segment, id)?;
        }
        Ok(())
    }

    fn register_global(inner: &mut Inner, segment: &str, id: ScopeId) -> Result<(), ContextError> {
        match inner.global_ids.get(segment) {
            Some(&existing) if existing != id => Err(ContextError::VisibilityConflict(segment.to_string())),
            _ => {
                inner.global_ids.insert(segment.to_string(), id);
                Ok(())
            }
        }
    }

    /// Binds `value` at `path`, creating intermediate scopes as needed.
    ///
    /// Fails with [`ContextError::ReadOnly`] if the existing binding's kind
    /// is `Preset` or `External`.
    pub fn put_value(&self, path: &str, value: Value, kind: ValueKind) -> Result<Value, ContextError> {
        let id = self.get_or_create(path, Visibility::Unset)?;
        let mut inner = self.inner.write().expect("context lock poisoned");
        if let Some(existing) = &inner.scopes[id.0 as usize].binding {
            if existing.kind.is_read_only() {
                return Err(ContextError::ReadOnly(path.to_string()));
            }
        }
        inner.scopes[id.0 as usize].binding = Some(Binding {
            value: value.clone(),
            kind,
        });
        Ok(value)
    }

    /// Looks up `path` from the root, using global-implicit resolution
    /// unless `path` begins with `~` (local-only).
    pub fn get_value(&self, path: &str) -> Result<Option<Value>, ContextError> {
        self.get_value_from(self.root(), path)
    }

    /// Looks up `path` relative to `from`. A leading `~` forces local-only
    /// resolution (descendants of `from` only); otherwise global-implicit
    /// resolution also promotes any `Global` descendant found while walking
    /// from `from` up to the root.
    pub fn get_value_from(&self, from: ScopeId, path: &str) -> Result<Option<Value>, ContextError> {
        let (local_only, segments) = Self::parse_lookup_path(path)?;
        let inner = self.inner.read().expect("context lock poisoned");

        if let Some(id) = Self::resolve_local(&inner, from, &segments) {
            return Ok(Self::bound_value(&inner, id));
        }
        if local_only {
            return Ok(None);
        }

        let mut ancestor = Some(from);
        while let Some(a) = ancestor {
            if let Some(id) = Self::find_via_global_descendant(&inner, a, &segments) {
                return Ok(Self::bound_value(&inner, id));
            }
            ancestor = inner.scopes[a.0 as usize].parent;
        }
        Ok(None)
    }

    fn bound_value(inner: &Inner, id: ScopeId) -> Option<Value> {
        inner.scopes[id.0 as usize].binding.as_ref().map(|b| b.value.clone())
    }

    /// Resolves `segments` purely as descendants of `start`.
    fn resolve_local(inner: &Inner, start: ScopeId, segments: &[String]) -> Option<ScopeId> {
        let mut current = start;
        for segment in segments {
            current = inner.scopes[current.0 as usize]
                .children
                .iter()
                .copied()
                .find(|&c| inner.scopes[c.0 as usize].segment == *segment)?;
        }
        Some(current)
    }

    /// Searches `ancestor`'s entire subtree for a `Global` scope and tries
    /// resolving `segments` locally from it — this is what lets a `Global`
    /// scope's whole subtree be reached without the ancestor prefix
    /// (`spec.md` §4.D's worked "global lift" example).
    fn find_via_global_descendant(inner: &Inner, ancestor: ScopeId, segments: &[String]) -> Option<ScopeId> {
        for &child in &inner.scopes[ancestor.0 as usize].children {
            if inner.scopes[child.0 as usize].visibility == Visibility::Global {
                if let Some(id) = Self::resolve_local(inner, child, segments) {
                    return Some(id);
                }
            }
            if let Some(id) = Self::find_via_global_descendant(inner, child, segments) {
                return Some(id);
            }
        }
        None
    }

    /// Depth-first visit of every scope, in insertion order, yielding
    /// `(path segment, value?)` pairs via [`ScopeView`].
    pub fn visit_edges(&self, mut cb: impl FnMut(ScopeView<'_>)) {
        let inner = self.inner.read().expect("context lock poisoned");
        Self::visit_from(&inner, ScopeId(0), &mut cb);
    }

    fn visit_from(inner: &Inner, id: ScopeId, cb: &mut impl FnMut(ScopeView<'_>)) {
        let scope = &inner.scopes[id.0 as usize];
        cb(ScopeView {
            segment: &scope.segment,
            visibility: scope.visibility,
            value: scope.binding.as_ref().map(|b| (&b.value, b.kind)),
        });
        for &child in &scope.children {
            Self::visit_from(inner, child, cb);
        }
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_global_lift() {
        let tree = ContextTree::new();
        let foo = tree.get_or_create("foo", Visibility::Global).unwrap();
        tree.get_or_create("foo.bar", Visibility::Local).unwrap();
        tree.put_value("foo.bar", Value::from("bar1"), ValueKind::User).unwrap();

        assert_eq!(tree.get_value("bar").unwrap(), Some(Value::from("bar1")));
        assert_eq!(tree.get_value("~bar").unwrap(), None);
        assert_eq!(tree.get_value("foo.bar").unwrap(), Some(Value::from("bar1")));
        assert_eq!(
            tree.get_value_from(foo, "~bar").unwrap(),
            Some(Value::from("bar1"))
        );
    }

    #[test]
    fn read_only_preset_rejects_second_write() {
        let tree = ContextTree::new();
        tree.put_value("foo", Value::from("x"), ValueKind::External).unwrap();
        let err = tree
            .put_value("foo", Value::from("y"), ValueKind::External)
            .unwrap_err();
        assert_eq!(err, ContextError::ReadOnly("foo".to_string()));
    }

    #[test]
    fn variable_last_writer_wins() {
        let tree = ContextTree::new();
        tree.put_value("x", Value::Int(1), ValueKind::Variable).unwrap();
        tree.put_value("x", Value::Int(2), ValueKind::Variable).unwrap();
        assert_eq!(tree.get_value("x").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn preset_then_variable_is_read_only() {
        let tree = ContextTree::new();
        tree.put_value("x", Value::Int(1), ValueKind::Preset).unwrap();
        let err = tree.put_value("x", Value::Int(2), ValueKind::Variable).unwrap_err();
        assert_eq!(err, ContextError::ReadOnly("x".to_string()));
    }

    #[test]
    fn visibility_conflict_on_redeclaration() {
        let tree = ContextTree::new();
        tree.get_or_create("a", Visibility::Local).unwrap();
        let err = tree.get_or_create("a", Visibility::Global).unwrap_err();
        assert_eq!(err, ContextError::VisibilityConflict("a".to_string()));
    }

    #[test]
    fn invalid_path_rejected() {
        let tree = ContextTree::new();
        assert!(tree.get_or_create("", Visibility::Local).is_err());
        assert!(tree.get_or_create("a..b", Visibility::Local).is_err());
        assert!(tree.get_or_create("a.b!", Visibility::Local).is_err());
    }

    #[test]
    fn put_after_get_round_trips_absolute() {
        let tree = ContextTree::new();
        let value = tree.put_value("a.b.c", Value::from("v"), ValueKind::User).unwrap();
        assert_eq!(tree.get_value("a.b.c").unwrap(), Some(value));
    }
}
