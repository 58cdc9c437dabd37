//! Pattern graphs: the compiled, immutable form of a declared rewrite.
//!
//! A [`RewritePattern`] pairs a source graph (what to match) with a result
//! graph (what to build), plus native constraints and an integer benefit.
//! Patterns are compiled once by [`RewritePattern::new`], validated, and then
//! shared immutably across any number of match attempts.

pub mod builder;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tessera_ir::Attribute;

use crate::context::MatchContext;
use crate::error::{Error, Result};

pub use builder::{ResultOpCall, ResultPattern, SourceOpCall, SourcePattern};

/// Index of a placeholder within one pattern graph.
pub(crate) type PlaceholderId = usize;

/// Index of an op-call within one pattern graph.
pub(crate) type OpCallId = usize;

/// Pure predicate evaluated against a structurally-successful binding.
pub type Constraint = Arc<dyn Fn(&MatchContext) -> bool + Send + Sync>;

/// Pure derivation of an attribute from the source bindings.
pub type ComputeFn = Arc<dyn Fn(&MatchContext) -> Attribute + Send + Sync>;

/// Named value slot in a pattern graph.
#[derive(Debug)]
pub(crate) struct Placeholder {
    pub name: String,
    /// Producing op-call and output slot, when produced inside this graph.
    pub producer: Option<(OpCallId, usize)>,
}

/// How one attribute of an op-call is declared.
#[derive(Clone)]
pub(crate) enum AttrSpec {
    /// Must equal this literal (source) / is set to this literal (result).
    Literal(Attribute),
    /// Captured under a binding name (source) / copied from a binding (result).
    Capture(String),
    /// Derived from the bindings; result patterns only.
    Computed(ComputeFn),
}

impl std::fmt::Debug for AttrSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrSpec::Literal(a) => f.debug_tuple("Literal").field(a).finish(),
            AttrSpec::Capture(name) => f.debug_tuple("Capture").field(name).finish(),
            AttrSpec::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// One pattern node: kind name, ordered input/output placeholders, keyed
/// attribute declarations.
#[derive(Debug)]
pub(crate) struct OpCall {
    pub kind: String,
    pub inputs: Vec<PlaceholderId>,
    pub outputs: Vec<PlaceholderId>,
    pub attrs: Vec<(String, AttrSpec)>,
}

/// Placeholders plus op-calls of one side of a pattern.
#[derive(Debug, Default)]
pub(crate) struct PatternGraph {
    pub placeholders: Vec<Placeholder>,
    pub by_name: HashMap<String, PlaceholderId>,
    pub calls: Vec<OpCall>,
}

impl PatternGraph {
    /// Get or create the placeholder for `name`.
    pub fn placeholder(&mut self, name: &str) -> PlaceholderId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.placeholders.len();
        self.placeholders.push(Placeholder { name: name.to_string(), producer: None });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn name(&self, id: PlaceholderId) -> &str {
        &self.placeholders[id].name
    }

    /// The root op-call: the last-declared call, producing the pattern's
    /// terminal output by convention.
    pub fn root(&self) -> Option<OpCallId> {
        self.calls.len().checked_sub(1)
    }

    /// Names bound by matching this graph: every placeholder that appears as
    /// an input or output of some op-call.
    fn bound_names(&self) -> HashSet<&str> {
        self.calls
            .iter()
            .flat_map(|call| call.inputs.iter().chain(&call.outputs))
            .map(|&id| self.name(id))
            .collect()
    }
}

/// A compiled source → result rewrite with constraints and benefit.
pub struct RewritePattern {
    label: String,
    source: PatternGraph,
    result: PatternGraph,
    constraints: Vec<Constraint>,
    benefit: i32,
}

impl std::fmt::Debug for RewritePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewritePattern")
            .field("label", &self.label)
            .field("benefit", &self.benefit)
            .field("source_calls", &self.source.calls.len())
            .field("result_calls", &self.result.calls.len())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl RewritePattern {
    /// Compile a source/result pair into an immutable pattern.
    ///
    /// Validates what is statically decidable: the source is non-empty, no
    /// placeholder has two producers, every source op-call is reachable from
    /// the root along producer edges, and every result operand is either
    /// source-bound or produced by an earlier result op-call (which also
    /// makes the result graph acyclic).
    pub fn new(
        label: impl Into<String>,
        source: SourcePattern,
        result: ResultPattern,
        benefit: i32,
    ) -> Result<Self> {
        let (source, constraints, source_duplicates) = source.into_parts();
        let (result, result_duplicates) = result.into_parts();

        if let Some(name) = source_duplicates.into_iter().chain(result_duplicates).next() {
            return Err(Error::DuplicateProducer { name });
        }
        let Some(root) = source.root() else {
            return Err(Error::EmptySource);
        };

        Self::check_reachability(&source, root)?;
        Self::check_result_operands(&source, &result)?;

        Ok(Self { label: label.into(), source, result, constraints, benefit })
    }

    /// Every source op-call must be reachable from the root by following
    /// input placeholders to their producing calls.
    fn check_reachability(source: &PatternGraph, root: OpCallId) -> Result<()> {
        let mut visited = vec![false; source.calls.len()];
        let mut stack = vec![root];
        while let Some(call_id) = stack.pop() {
            if std::mem::replace(&mut visited[call_id], true) {
                continue;
            }
            for &input in &source.calls[call_id].inputs {
                if let Some((producer, _)) = source.placeholders[input].producer
                    && !visited[producer]
                {
                    stack.push(producer);
                }
            }
        }
        match visited.iter().position(|&v| !v) {
            Some(index) => {
                Err(Error::UnreachableOpCall { kind: source.calls[index].kind.clone(), index })
            }
            None => Ok(()),
        }
    }

    /// Result operands must resolve: produced by an earlier result call, or
    /// bound by the source match.
    fn check_result_operands(source: &PatternGraph, result: &PatternGraph) -> Result<()> {
        let source_bound = source.bound_names();
        let mut produced: HashSet<PlaceholderId> = HashSet::new();
        for call in &result.calls {
            for &input in &call.inputs {
                let name = result.name(input);
                if !produced.contains(&input) && !source_bound.contains(name) {
                    return Err(Error::UnresolvableOperand { name: name.to_string() });
                }
            }
            produced.extend(call.outputs.iter().copied());
        }
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn benefit(&self) -> i32 {
        self.benefit
    }

    /// Kind of the root op-call; anchors of any other kind cannot match.
    pub fn root_kind(&self) -> &str {
        // The source is validated non-empty at construction.
        &self.source.calls[self.source.calls.len() - 1].kind
    }

    pub(crate) fn source(&self) -> &PatternGraph {
        &self.source
    }

    pub(crate) fn result(&self) -> &PatternGraph {
        &self.result
    }

    pub(crate) fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}
