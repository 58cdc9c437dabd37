//! Dialect registry: name → operation-builder dispatch.
//!
//! The engine never constructs concrete operations itself. A pass run is
//! handed a [`DialectRegistry`] populated by the embedding compiler; lookup
//! is a single hash probe, and an unregistered kind is a reported error at
//! the call site instead of a silent null.

use std::collections::HashMap;

use crate::attribute::AttrMap;
use crate::graph::{Graph, InsertPoint, OpId, RegionId, ValueId};

/// Insertion cursor handed to dialect builders.
///
/// Every operation built through the cursor lands at the same point: before
/// `before` when set, else at the end of `region`. Builders only ever insert
/// there; they never mutate the graph elsewhere.
pub struct OpBuilder<'g> {
    graph: &'g mut Graph,
    region: RegionId,
    before: Option<OpId>,
}

impl<'g> OpBuilder<'g> {
    pub fn new(graph: &'g mut Graph, region: RegionId, before: Option<OpId>) -> Self {
        Self { graph, region, before }
    }

    /// Build one operation at the cursor.
    pub fn build(
        &mut self,
        kind: impl Into<String>,
        operands: &[ValueId],
        result_count: usize,
        attrs: AttrMap,
    ) -> OpId {
        let at = match self.before {
            Some(anchor) => InsertPoint::Before(anchor),
            None => InsertPoint::End(self.region),
        };
        self.graph.build_op(at, kind, operands, result_count, attrs)
    }

    /// Read-only view of the graph, for builders that inspect their operands.
    pub fn graph(&self) -> &Graph {
        self.graph
    }
}

/// Builder callback for one operation kind.
///
/// Receives the insertion cursor, the already-resolved operand values and the
/// already-resolved attributes; returns the created operation.
pub type BuildFn = Box<dyn Fn(&mut OpBuilder<'_>, &[ValueId], &AttrMap) -> OpId + Send + Sync>;

/// Name → builder mapping, populated once by the embedding compiler.
#[derive(Default)]
pub struct DialectRegistry {
    builders: HashMap<String, BuildFn>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for `kind`, replacing any previous registration.
    pub fn register<F>(&mut self, kind: impl Into<String>, builder: F)
    where
        F: Fn(&mut OpBuilder<'_>, &[ValueId], &AttrMap) -> OpId + Send + Sync + 'static,
    {
        self.builders.insert(kind.into(), Box::new(builder));
    }

    /// Register a kind with no bespoke construction logic: the operation is
    /// built verbatim from the resolved operands and attributes, with
    /// `result_count` results.
    pub fn register_simple(&mut self, kind: impl Into<String>, result_count: usize) {
        let kind = kind.into();
        let op_kind = kind.clone();
        self.register(kind, move |builder, operands, attrs| {
            builder.build(op_kind.clone(), operands, result_count, attrs.clone())
        });
    }

    pub fn lookup(&self, kind: &str) -> Option<&BuildFn> {
        self.builders.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl std::fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("DialectRegistry").field("kinds", &kinds).finish()
    }
}
