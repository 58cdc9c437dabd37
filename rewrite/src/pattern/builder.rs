//! Fluent surface for declaring source and result patterns.
//!
//! The grammar mirrors the engine's declarative-rewrite heritage: an op-call
//! is opened with [`SourcePattern::op`] / [`ResultPattern::op`], decorated
//! with attribute declarations, and finalized by naming its input and output
//! placeholders. Placeholders are created on first mention; reusing a name
//! aliases the same value slot.
//!
//! ```ignore
//! let mut src = SourcePattern::new();
//! src.op("reshape").call(&["x", "shape"], &["reshaped", "xshape"]);
//! src.op("transpose").capture("perm", "perm").call(&["reshaped"], &["out"]);
//! src.constraint(|ctx| ctx.ints("perm").is_some_and(|p| p.len() == 4));
//!
//! let mut res = ResultPattern::new();
//! res.op("reshape_transpose")
//!     .capture("perm", "perm")
//!     .call(&["x", "shape"], &["out"]);
//!
//! let pattern = RewritePattern::new("fuse-reshape-transpose", src, res, 1)?;
//! ```

use std::sync::Arc;

use tessera_ir::Attribute;

use crate::context::MatchContext;
use crate::pattern::{AttrSpec, Constraint, OpCall, PatternGraph};

/// Builder for the matching side of a rewrite.
#[derive(Default)]
pub struct SourcePattern {
    graph: PatternGraph,
    constraints: Vec<Constraint>,
    duplicate_producers: Vec<String>,
}

impl SourcePattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a placeholder up front. Optional; placeholders are otherwise
    /// created on first mention in an op-call.
    pub fn tensor(&mut self, name: &str) -> &mut Self {
        self.graph.placeholder(name);
        self
    }

    /// Open an op-call of the given kind. The last call declared is the
    /// pattern's root.
    pub fn op(&mut self, kind: &str) -> SourceOpCall<'_> {
        SourceOpCall { pattern: self, kind: kind.to_string(), attrs: Vec::new() }
    }

    /// Attach a native constraint, evaluated post-match in declaration order.
    pub fn constraint<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&MatchContext) -> bool + Send + Sync + 'static,
    {
        self.constraints.push(Arc::new(predicate));
        self
    }

    pub(crate) fn into_parts(self) -> (PatternGraph, Vec<Constraint>, Vec<String>) {
        (self.graph, self.constraints, self.duplicate_producers)
    }
}

/// An op-call under construction in a source pattern.
pub struct SourceOpCall<'p> {
    pattern: &'p mut SourcePattern,
    kind: String,
    attrs: Vec<(String, AttrSpec)>,
}

impl SourceOpCall<'_> {
    /// Require the attribute to equal a literal.
    pub fn literal(mut self, attr: &str, value: impl Into<Attribute>) -> Self {
        self.attrs.push((attr.to_string(), AttrSpec::Literal(value.into())));
        self
    }

    /// Capture the attribute under a binding name; re-captures of the same
    /// binding must agree.
    pub fn capture(mut self, attr: &str, binding: &str) -> Self {
        self.attrs.push((attr.to_string(), AttrSpec::Capture(binding.to_string())));
        self
    }

    /// Finalize the call with its input and output placeholder names.
    pub fn call(self, inputs: &[&str], outputs: &[&str]) {
        finalize(
            &mut self.pattern.graph,
            &mut self.pattern.duplicate_producers,
            self.kind,
            self.attrs,
            inputs,
            outputs,
        );
    }
}

/// Builder for the replacement side of a rewrite.
///
/// Producers must be declared before their outputs are consumed; compilation
/// rejects a result op-call whose operand is neither source-bound nor
/// produced earlier.
#[derive(Default)]
pub struct ResultPattern {
    graph: PatternGraph,
    duplicate_producers: Vec<String>,
}

impl ResultPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an op-call of the given kind.
    pub fn op(&mut self, kind: &str) -> ResultOpCall<'_> {
        ResultOpCall { pattern: self, kind: kind.to_string(), attrs: Vec::new() }
    }

    pub(crate) fn into_parts(self) -> (PatternGraph, Vec<String>) {
        (self.graph, self.duplicate_producers)
    }
}

/// An op-call under construction in a result pattern.
pub struct ResultOpCall<'p> {
    pattern: &'p mut ResultPattern,
    kind: String,
    attrs: Vec<(String, AttrSpec)>,
}

impl ResultOpCall<'_> {
    /// Set the attribute to a literal.
    pub fn literal(mut self, attr: &str, value: impl Into<Attribute>) -> Self {
        self.attrs.push((attr.to_string(), AttrSpec::Literal(value.into())));
        self
    }

    /// Copy the attribute from a source capture binding.
    pub fn capture(mut self, attr: &str, binding: &str) -> Self {
        self.attrs.push((attr.to_string(), AttrSpec::Capture(binding.to_string())));
        self
    }

    /// Derive the attribute from the bindings with a pure function.
    pub fn computed<F>(mut self, attr: &str, derive: F) -> Self
    where
        F: Fn(&MatchContext) -> Attribute + Send + Sync + 'static,
    {
        self.attrs.push((attr.to_string(), AttrSpec::Computed(Arc::new(derive))));
        self
    }

    /// Finalize the call with its input and output placeholder names.
    ///
    /// Output names that are also bound by the source pattern become
    /// replacement-map entries: their consumers are redirected on commit.
    pub fn call(self, inputs: &[&str], outputs: &[&str]) {
        finalize(
            &mut self.pattern.graph,
            &mut self.pattern.duplicate_producers,
            self.kind,
            self.attrs,
            inputs,
            outputs,
        );
    }
}

fn finalize(
    graph: &mut PatternGraph,
    duplicate_producers: &mut Vec<String>,
    kind: String,
    attrs: Vec<(String, AttrSpec)>,
    inputs: &[&str],
    outputs: &[&str],
) {
    let call_id = graph.calls.len();
    let inputs: Vec<_> = inputs.iter().map(|name| graph.placeholder(name)).collect();
    let mut output_ids = Vec::with_capacity(outputs.len());
    for (slot, name) in outputs.iter().enumerate() {
        let id = graph.placeholder(name);
        match graph.placeholders[id].producer {
            Some(_) => duplicate_producers.push((*name).to_string()),
            None => graph.placeholders[id].producer = Some((call_id, slot)),
        }
        output_ids.push(id);
    }
    graph.calls.push(OpCall { kind, inputs, outputs: output_ids, attrs });
}
