//! Result-graph materialization: turning a result pattern into concrete ops.

use std::collections::HashMap;

use smallvec::SmallVec;
use tessera_ir::{AttrMap, DialectRegistry, Graph, OpBuilder, OpId, ValueId};

use crate::context::MatchContext;
use crate::error::{
    BuilderArityMismatchSnafu, MissingCaptureSnafu, Result, SurgerySnafu, UnknownOperationSnafu,
};
use crate::pattern::{AttrSpec, RewritePattern};

use snafu::ResultExt;

/// Outcome of a successful materialization.
#[derive(Debug)]
pub struct Materialized {
    /// Source placeholder name → freshly created value, in result-declaration
    /// order. Only names also bound by the source match appear here; these
    /// are the redirections the rewriter commits.
    pub replacements: Vec<(String, ValueId)>,
    /// Created operations in creation order.
    pub created: Vec<OpId>,
}

/// Materialize `pattern`'s result graph before `anchor`.
///
/// Walks result op-calls in declaration order (producers precede consumers by
/// construction), resolves operands from values created earlier in this walk
/// or from the source bindings, resolves attributes (literal, captured,
/// computed), and dispatches each kind to the dialect registry.
///
/// The walk is one scoped transaction: on an unknown kind, a builder arity
/// disagreement or a missing capture, every operation inserted so far is
/// erased in reverse creation order and the error is reported — no partial
/// insertion is ever left behind.
pub fn materialize(
    graph: &mut Graph,
    registry: &DialectRegistry,
    pattern: &RewritePattern,
    ctx: &MatchContext,
    anchor: OpId,
) -> Result<Materialized> {
    let result = pattern.result();
    let region = graph.op_region(anchor);

    let mut produced: HashMap<usize, ValueId> = HashMap::new();
    let mut created: Vec<OpId> = Vec::new();

    for call in &result.calls {
        let mut operands: SmallVec<[ValueId; 4]> = SmallVec::with_capacity(call.inputs.len());
        for &input in &call.inputs {
            let value = produced
                .get(&input)
                .copied()
                .or_else(|| ctx.value(result.name(input)))
                .unwrap_or_else(|| {
                    panic!("operand `{}` unresolved despite compile-time validation", result.name(input))
                });
            operands.push(value);
        }

        let mut attrs = AttrMap::new();
        for (attr_name, spec) in &call.attrs {
            let value = match spec {
                AttrSpec::Literal(value) => value.clone(),
                AttrSpec::Capture(binding) => match ctx.attr(binding) {
                    Some(value) => value.clone(),
                    None => {
                        roll_back(graph, &created)?;
                        return MissingCaptureSnafu { binding: binding.clone() }.fail();
                    }
                },
                AttrSpec::Computed(derive) => derive(ctx),
            };
            attrs.insert(attr_name.clone(), value);
        }

        let Some(build) = registry.lookup(&call.kind) else {
            roll_back(graph, &created)?;
            return UnknownOperationSnafu { kind: call.kind.clone() }.fail();
        };
        let mut cursor = OpBuilder::new(graph, region, Some(anchor));
        let op = build(&mut cursor, &operands, &attrs);
        created.push(op);

        let actual = graph.result_count(op);
        if actual != call.outputs.len() {
            roll_back(graph, &created)?;
            return BuilderArityMismatchSnafu {
                kind: call.kind.clone(),
                expected: call.outputs.len(),
                actual,
            }
            .fail();
        }
        for (slot, &output) in call.outputs.iter().enumerate() {
            produced.insert(output, graph.result(op, slot));
        }
    }

    // Replacement map: result-bound names that the source also bound, in
    // first-mention order.
    let mut replacements = Vec::new();
    for (id, placeholder) in result.placeholders.iter().enumerate() {
        if let Some(&new_value) = produced.get(&id)
            && ctx.value(&placeholder.name).is_some()
        {
            replacements.push((placeholder.name.clone(), new_value));
        }
    }

    Ok(Materialized { replacements, created })
}

/// Undo a partial walk. Created ops are consumed only by later created ops,
/// so reverse creation order erases cleanly; a failure here means the graph
/// was corrupted and is escalated as fatal.
fn roll_back(graph: &mut Graph, created: &[OpId]) -> Result<()> {
    tracing::debug!(ops = created.len(), "rolling back partial materialization");
    for &op in created.iter().rev() {
        graph.erase_op(op).context(SurgerySnafu)?;
    }
    Ok(())
}
