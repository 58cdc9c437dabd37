//! Structural + attribute matching of a pattern against a concrete subgraph.

use tessera_ir::{Graph, OpId};

use crate::context::MatchContext;
use crate::pattern::{AttrSpec, RewritePattern};

/// Why a match attempt failed.
///
/// These are expected, backtracking-driving outcomes — cheap to construct and
/// never surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// Kind, arity, aliasing or shape of the subgraph did not line up.
    Structural,
    /// An attribute was absent or disagreed with its literal/binding.
    Attribute,
    /// A native constraint rejected the structurally-successful binding.
    Constraint,
}

/// Match `pattern`'s source graph against the subgraph rooted at `anchor`.
///
/// Matching is read-only and pure: given the same (pattern, graph, anchor) it
/// produces the same binding table, and independent anchors can be matched
/// concurrently over immutable graph state.
///
/// The walk starts at the root op-call (the last-declared one), fails fast if
/// the anchor's kind differs, and follows producer edges outward with an
/// explicit worklist — pattern depth is never bounded by call-stack size.
/// Visited op-calls are memoized so diamond-shaped patterns stay linear.
pub fn match_pattern(
    graph: &Graph,
    pattern: &RewritePattern,
    anchor: OpId,
) -> Result<MatchContext, Mismatch> {
    let source = pattern.source();
    let Some(root) = source.root() else {
        return Err(Mismatch::Structural);
    };

    let mut ctx = MatchContext::new();
    let mut visited: Vec<Option<OpId>> = vec![None; source.calls.len()];
    let mut worklist = vec![(root, anchor)];

    while let Some((call_id, op)) = worklist.pop() {
        if let Some(bound) = visited[call_id] {
            if bound != op {
                return Err(Mismatch::Structural);
            }
            continue;
        }
        let call = &source.calls[call_id];

        if graph.kind(op) != call.kind
            || graph.operand_count(op) != call.inputs.len()
            || graph.result_count(op) != call.outputs.len()
        {
            return Err(Mismatch::Structural);
        }
        visited[call_id] = Some(op);

        for (slot, &output) in call.outputs.iter().enumerate() {
            if !ctx.bind_value(source.name(output), graph.result(op, slot)) {
                return Err(Mismatch::Structural);
            }
        }

        for (attr_name, spec) in &call.attrs {
            let Some(actual) = graph.attribute(op, attr_name) else {
                return Err(Mismatch::Attribute);
            };
            let ok = match spec {
                AttrSpec::Literal(expected) => actual == expected,
                AttrSpec::Capture(binding) => ctx.bind_attr(binding, actual),
                // Computed attributes exist only in result patterns.
                AttrSpec::Computed(_) => false,
            };
            if !ok {
                return Err(Mismatch::Attribute);
            }
        }

        for (slot, &input) in call.inputs.iter().enumerate() {
            let value = graph.operand(op, slot);
            if !ctx.bind_value(source.name(input), value) {
                return Err(Mismatch::Structural);
            }
            let Some((producer, producer_slot)) = source.placeholders[input].producer else {
                // Leaf placeholder: bound above, nothing to descend into.
                continue;
            };
            let Some((def_op, def_slot)) = graph.defining_op(value) else {
                // Pattern expects an op-produced value, graph has a block arg.
                return Err(Mismatch::Structural);
            };
            if def_slot != producer_slot {
                return Err(Mismatch::Structural);
            }
            match visited[producer] {
                Some(bound) if bound != def_op => return Err(Mismatch::Structural),
                Some(_) => {}
                None => worklist.push((producer, def_op)),
            }
        }
    }

    debug_assert!(visited.iter().all(Option::is_some), "reachability validated at compile time");
    for op in visited.into_iter().flatten() {
        ctx.push_matched(op);
    }

    for constraint in pattern.constraints() {
        if !constraint(&ctx) {
            tracing::trace!(pattern = pattern.label(), ?anchor, "constraint rejected match");
            return Err(Mismatch::Constraint);
        }
    }

    tracing::debug!(
        pattern = pattern.label(),
        ?anchor,
        ops = ctx.matched_ops().len(),
        "pattern matched"
    );
    Ok(ctx)
}
