// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The depth-first traversal primitive the controller drives a run with.
//!
//! This module owns only the generic "walk a script's arena, calling
//! `enter`/`exit`" shape; it has no idea what a `preset` or `output`
//! directive means. [`crate::controller`] supplies the [`Visitor`] that
//! gives each node kind meaning, including switching to a different
//! script's arena entirely for `call`/`source`/`exec`/`invoke` (by
//! recursively invoking [`walk`] again against the callee).

use crate::node::NodeId;
use crate::script::Script;

/// What a visitor wants the walker to do after visiting one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    /// Descend into this node's children as usual.
    Continue,
    /// Skip this node's children (its own `exit` still runs).
    SkipSubtree,
    /// Abort the walk entirely, unwinding without visiting anything else.
    Stop,
}

/// Receives `enter`/`exit` callbacks as [`walk`] descends a script.
pub trait Visitor {
    /// The error type a visitor's callbacks may fail with.
    type Error;

    /// Called on first reaching `node`, before its children (if any).
    fn enter(&mut self, script: &Script, node: NodeId) -> Result<ControlFlow, Self::Error>;

    /// Called after `node`'s children (or immediately, if `enter` returned
    /// [`ControlFlow::SkipSubtree`]).
    fn exit(&mut self, script: &Script, node: NodeId) -> Result<(), Self::Error>;
}

/// Depth-first pre/post traversal of `script` starting at `start`.
///
/// Returns the terminal [`ControlFlow`] reached — callers walking a parent
/// subtree check for [`ControlFlow::Stop`] to propagate an abort upward
/// without visiting siblings.
pub fn walk<V: Visitor>(
    script: &Script,
    start: NodeId,
    visitor: &mut V,
) -> Result<ControlFlow, V::Error> {
    match visitor.enter(script, start)? {
        ControlFlow::Stop => return Ok(ControlFlow::Stop),
        ControlFlow::SkipSubtree => {
            visitor.exit(script, start)?;
            return Ok(ControlFlow::Continue);
        }
        ControlFlow::Continue => {}
    }

    for &child in script.children(start).to_vec().iter() {
        if walk(script, child, visitor)? == ControlFlow::Stop {
            visitor.exit(script, start)?;
            return Ok(ControlFlow::Stop);
        }
    }

    visitor.exit(script, start)?;
    Ok(ControlFlow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use std::collections::BTreeMap;

    struct RecordingVisitor {
        entered: Vec<NodeId>,
        exited: Vec<NodeId>,
        stop_at: Option<NodeId>,
    }

    impl Visitor for RecordingVisitor {
        type Error = ();

        fn enter(&mut self, _script: &Script, node: NodeId) -> Result<ControlFlow, ()> {
            self.entered.push(node);
            if Some(node) == self.stop_at {
                return Ok(ControlFlow::Stop);
            }
            Ok(ControlFlow::Continue)
        }

        fn exit(&mut self, _script: &Script, node: NodeId) -> Result<(), ()> {
            self.exited.push(node);
            Ok(())
        }
    }

    fn sample_script() -> Script {
        let root = Node {
            kind: NodeKind::Script,
            attrs: BTreeMap::new(),
            children: vec![NodeId(1), NodeId(2)],
            id: NodeId(0),
            parent: None,
            value: None,
            expression: None,
        };
        let child_a = Node {
            kind: NodeKind::Step,
            attrs: BTreeMap::new(),
            children: vec![],
            id: NodeId(1),
            parent: Some(NodeId(0)),
            value: None,
            expression: None,
        };
        let child_b = Node {
            kind: NodeKind::Step,
            attrs: BTreeMap::new(),
            children: vec![],
            id: NodeId(2),
            parent: Some(NodeId(0)),
            value: None,
            expression: None,
        };
        Script::from_nodes("s.json".to_string(), vec![root, child_a, child_b]).unwrap()
    }

    #[test]
    fn visits_every_node_pre_and_post() {
        let script = sample_script();
        let mut visitor = RecordingVisitor {
            entered: vec![],
            exited: vec![],
            stop_at: None,
        };
        walk(&script, script.root(), &mut visitor).unwrap();
        assert_eq!(visitor.entered, vec![NodeId(0), NodeId(1), NodeId(2)]);
        assert_eq!(visitor.exited, vec![NodeId(1), NodeId(2), NodeId(0)]);
    }

    #[test]
    fn stop_aborts_remaining_siblings() {
        let script = sample_script();
        let mut visitor = RecordingVisitor {
            entered: vec![],
            exited: vec![],
            stop_at: Some(NodeId(1)),
        };
        let outcome = walk(&script, script.root(), &mut visitor).unwrap();
        assert_eq!(outcome, ControlFlow::Stop);
        assert_eq!(visitor.entered, vec![NodeId(0), NodeId(1)]);
        assert!(!visitor.exited.contains(&NodeId(2)));
    }
}
