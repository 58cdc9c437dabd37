//! Commit phase: redirect uses to replacement values, erase the matched ops.

use std::collections::HashSet;

use snafu::ResultExt;
use tessera_ir::{Graph, OpId};

use crate::context::MatchContext;
use crate::error::{Result, SurgerySnafu};
use crate::materialize::Materialized;

/// What one committed rewrite touched, for driver requeueing.
#[derive(Debug, Default)]
pub struct RewriteEffect {
    /// Surviving consumers whose operand set changed during redirection.
    pub redirected: Vec<OpId>,
    /// Matched source operations erased, in erasure order.
    pub erased: Vec<OpId>,
    /// Operations created by the materialization, in creation order.
    pub created: Vec<OpId>,
}

/// Apply a materialized replacement to the live graph.
///
/// First redirects every consumer of each replaced source value to its new
/// value, preserving operand positions (ops created by this materialization
/// are exempt — they were built against the resolved source bindings). Only
/// after all redirections, erases the matched source operations consumers
/// -before-producers, by repeatedly erasing ops whose results are fully dead.
/// A matched op kept alive by an external consumer is a fatal dangling use:
/// the run aborts rather than leaving the graph inconsistent.
pub fn apply(graph: &mut Graph, ctx: &MatchContext, materialized: Materialized) -> Result<RewriteEffect> {
    let Materialized { replacements, created } = materialized;

    let mut redirected = Vec::new();
    for (name, new_value) in &replacements {
        let old_value = ctx
            .value(name)
            .unwrap_or_else(|| panic!("replacement `{name}` has no source binding"));
        for user in graph.users(old_value) {
            if !created.contains(&user.op) {
                redirected.push(user.op);
            }
        }
        graph.replace_uses_except(old_value, *new_value, &created);
    }

    // Matched ops, deduplicated, in op-call declaration order.
    let mut seen = HashSet::new();
    let mut pending: Vec<OpId> =
        ctx.matched_ops().iter().copied().filter(|&op| seen.insert(op)).collect();

    let mut erased = Vec::new();
    while !pending.is_empty() {
        let mut blocked = Vec::with_capacity(pending.len());
        let mut progress = false;
        // Reverse declaration order puts consumers before their producers.
        for &op in pending.iter().rev() {
            if graph.results(op).iter().all(|&result| !graph.has_uses(result)) {
                graph.erase_op(op).context(SurgerySnafu)?;
                erased.push(op);
                progress = true;
            } else {
                blocked.push(op);
            }
        }
        blocked.reverse();
        if !progress {
            // Every remaining op is held alive by a consumer outside the
            // matched set; erasing the first reports the dangling use.
            let op = blocked[0];
            graph.erase_op(op).context(SurgerySnafu)?;
            erased.push(op);
            blocked.remove(0);
        }
        pending = blocked;
    }

    // Erased consumers are gone; keep only survivors.
    redirected.retain(|op| graph.contains_op(*op));
    tracing::debug!(
        created = created.len(),
        erased = erased.len(),
        redirected = redirected.len(),
        "rewrite committed"
    );
    Ok(RewriteEffect { redirected, erased, created })
}
