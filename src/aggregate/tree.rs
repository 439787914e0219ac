// ============================================================================
// spark-aggregate - Tree Builder
//
// Walk an Input once, classifying every node, and produce an immutable
// SpecTree plus the table of reactive leaves it refers to.
// ============================================================================
//
// Reactive leaves are replaced by their index in the leaf table, so the
// emission path never re-inspects node types. Two guards keep the walk
// bounded:
//
// - ancestors: shared nodes currently on the path; meeting one again is a
//   cycle. The same shared node in two sibling positions is fine.
// - depth: container nesting beyond `max_depth` is rejected.
// ============================================================================

use std::cell::RefCell;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::aggregate::classify::{classify, classify_value, NodeKind};
use crate::aggregate::input::{Input, SharedInput};
use crate::aggregate::leaf::LeafSource;
use crate::core::error::MalformedSpecError;
use crate::core::value::Value;

// =============================================================================
// SPEC TREE
// =============================================================================

/// Canonical, immutable shape of an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecTree {
    Scalar(Value),
    /// Index into the leaf table
    Leaf(usize),
    Map(IndexMap<String, SpecTree>),
    Seq(Vec<SpecTree>),
}

impl SpecTree {
    pub fn kind(&self) -> NodeKind {
        match self {
            SpecTree::Scalar(_) => NodeKind::Scalar,
            SpecTree::Leaf(_) => NodeKind::ReactiveLeaf,
            SpecTree::Map(_) => NodeKind::MapNode,
            SpecTree::Seq(_) => NodeKind::SequenceNode,
        }
    }

    /// Leaf indices in depth-first order.
    pub fn leaf_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<usize>) {
        match self {
            SpecTree::Scalar(_) => {}
            SpecTree::Leaf(index) => out.push(*index),
            SpecTree::Map(map) => map.values().for_each(|child| child.collect_leaves(out)),
            SpecTree::Seq(items) => items.iter().for_each(|child| child.collect_leaves(out)),
        }
    }
}

/// A built spec: shape plus the sources its leaves point at.
#[derive(Clone)]
pub struct BuiltSpec {
    pub root: SpecTree,
    pub leaves: Vec<LeafSource>,
}

impl std::fmt::Debug for BuiltSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltSpec")
            .field("root", &self.root)
            .field("leaves", &self.leaves.len())
            .finish()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

enum Segment {
    Key(String),
    Index(usize),
}

struct Builder {
    max_depth: usize,
    leaves: Vec<LeafSource>,
    ancestors: Vec<*const RefCell<Input>>,
    path: Vec<Segment>,
}

impl Builder {
    fn path(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            let _ = match segment {
                Segment::Key(key) => write!(out, ".{key}"),
                Segment::Index(index) => write!(out, "[{index}]"),
            };
        }
        out
    }

    fn check_depth(&self, depth: usize) -> Result<(), MalformedSpecError> {
        if depth > self.max_depth {
            return Err(MalformedSpecError::TooDeep {
                path: self.path(),
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn visit(&mut self, input: &Input, depth: usize) -> Result<SpecTree, MalformedSpecError> {
        self.check_depth(depth)?;

        let tree = match input {
            Input::Shared(shared) => return self.visit_shared(shared, depth),
            Input::Stream(stream) => self.push_leaf(LeafSource::Stream(stream.clone())),
            Input::Query(query) => self.push_leaf(LeafSource::Query(query.clone())),
            Input::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.path.push(Segment::Index(index));
                    let child = self.visit(item, depth + 1);
                    self.path.pop();
                    out.push(child?);
                }
                SpecTree::Seq(out)
            }
            Input::Map(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    self.path.push(Segment::Key(key.clone()));
                    let child = self.visit(item, depth + 1);
                    self.path.pop();
                    out.insert(key.clone(), child?);
                }
                SpecTree::Map(out)
            }
            Input::Value(value) => self.visit_value(value, depth)?,
        };

        debug_assert_eq!(tree.kind(), classify(input));
        Ok(tree)
    }

    fn visit_shared(&mut self, shared: &SharedInput, depth: usize) -> Result<SpecTree, MalformedSpecError> {
        let ptr = shared.as_ptr();
        if self.ancestors.contains(&ptr) {
            return Err(MalformedSpecError::Cycle { path: self.path() });
        }
        self.ancestors.push(ptr);
        let result = self.visit(&shared.borrow(), depth);
        self.ancestors.pop();
        result
    }

    fn visit_value(&mut self, value: &Value, depth: usize) -> Result<SpecTree, MalformedSpecError> {
        self.check_depth(depth)?;

        match (classify_value(value), value) {
            (NodeKind::SequenceNode, Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.path.push(Segment::Index(index));
                    let child = self.visit_value(item, depth + 1);
                    self.path.pop();
                    out.push(child?);
                }
                Ok(SpecTree::Seq(out))
            }
            (NodeKind::MapNode, Value::Object(map)) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    self.path.push(Segment::Key(key.clone()));
                    let child = self.visit_value(item, depth + 1);
                    self.path.pop();
                    out.insert(key.clone(), child?);
                }
                Ok(SpecTree::Map(out))
            }
            _ => Ok(SpecTree::Scalar(value.clone())),
        }
    }

    fn push_leaf(&mut self, source: LeafSource) -> SpecTree {
        self.leaves.push(source);
        SpecTree::Leaf(self.leaves.len() - 1)
    }
}

/// Build the spec tree for `input`.
///
/// Fails with [`MalformedSpecError`] on self-containing shared nodes or
/// nesting deeper than `max_depth` container levels.
pub fn build(input: &Input, max_depth: usize) -> Result<BuiltSpec, MalformedSpecError> {
    let mut builder = Builder {
        max_depth,
        leaves: Vec::new(),
        ancestors: Vec::new(),
        path: Vec::new(),
    };
    let root = builder.visit(input, 0)?;
    Ok(BuiltSpec {
        root,
        leaves: builder.leaves,
    })
}

// =============================================================================
// TESTS
// =============================================================================
