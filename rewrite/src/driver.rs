//! Greedy worklist driver: applies a pattern set to a region until fixpoint.

use std::collections::HashSet;

use tessera_ir::{DialectRegistry, Graph, OpId, RegionId};

use crate::error::Result;
use crate::matcher::match_pattern;
use crate::materialize::materialize;
use crate::pattern::RewritePattern;
use crate::rewriter::{RewriteEffect, apply};

/// Safety valve against self-reproducing patterns that would otherwise never
/// let a sweep terminate. Hitting it ends the sweep, not the run.
const MAX_SWEEP_REWRITES: usize = 1000;

/// Order in which a sweep visits the region's operations.
///
/// Affects only scheduling, not correctness: every rewrite is local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Definition before use (program order).
    #[default]
    Forward,
    /// Use before definition.
    Reverse,
}

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreedyConfig {
    pub traversal: Traversal,
    /// Upper bound on full sweeps; must be positive. Exhausting it is a
    /// reported diagnostic, not an error.
    pub max_iterations: usize,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self { traversal: Traversal::Forward, max_iterations: 10 }
    }
}

/// A frozen collection of patterns with per-pattern benefit.
#[derive(Debug, Default)]
pub struct PatternSet {
    patterns: Vec<RewritePattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: RewritePattern) -> &mut Self {
        self.patterns.push(pattern);
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns in application order: benefit descending, ties by
    /// registration order (the sort is stable).
    fn ordered(&self) -> Vec<&RewritePattern> {
        let mut ordered: Vec<&RewritePattern> = self.patterns.iter().collect();
        ordered.sort_by_key(|p| std::cmp::Reverse(p.benefit()));
        ordered
    }
}

/// Outcome of one driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    /// True when the final sweep performed zero rewrites.
    pub converged: bool,
    /// Full sweeps performed, including the confirming one.
    pub sweeps: usize,
    /// Total rewrites committed.
    pub rewrites: usize,
}

/// Greedily apply `patterns` to `region` until fixpoint or the iteration
/// bound.
///
/// Each sweep visits the region's still-present operations in the configured
/// traversal order and tries the patterns in priority order at each anchor
/// until one applies or all fail. Committing a rewrite re-enqueues the
/// operations it created and un-settles every surviving consumer whose
/// operand set changed, then resumes the sweep from the insertion point.
/// Operations that no pattern applied to are settled and skipped until a
/// later rewrite touches them.
///
/// Candidate-level materialization failures (unknown kind, builder arity,
/// missing capture) are rolled back, logged and skipped; a dangling use
/// aborts the run.
pub fn apply_patterns_greedily(
    graph: &mut Graph,
    region: RegionId,
    patterns: &PatternSet,
    registry: &DialectRegistry,
    config: GreedyConfig,
) -> Result<RewriteReport> {
    let ordered = patterns.ordered();
    let mut settled: HashSet<OpId> = HashSet::new();
    let mut sweeps = 0;
    let mut rewrites = 0;
    let mut converged = false;

    while sweeps < config.max_iterations {
        sweeps += 1;
        let sweep_rewrites = match config.traversal {
            Traversal::Forward => sweep_forward(graph, region, &ordered, registry, &mut settled)?,
            Traversal::Reverse => sweep_reverse(graph, region, &ordered, registry, &mut settled)?,
        };
        rewrites += sweep_rewrites;
        tracing::debug!(sweep = sweeps, rewrites = sweep_rewrites, "sweep complete");
        if sweep_rewrites == 0 {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            max_iterations = config.max_iterations,
            rewrites,
            "pattern set did not reach a fixpoint within the iteration bound"
        );
    }
    Ok(RewriteReport { converged, sweeps, rewrites })
}

fn sweep_forward(
    graph: &mut Graph,
    region: RegionId,
    ordered: &[&RewritePattern],
    registry: &DialectRegistry,
    settled: &mut HashSet<OpId>,
) -> Result<usize> {
    let mut sweep_rewrites = 0;
    let mut index = 0;
    while index < graph.region_ops(region).len() {
        let anchor = graph.region_ops(region)[index];
        if settled.contains(&anchor) {
            index += 1;
            continue;
        }
        match try_patterns(graph, ordered, registry, anchor)? {
            Some(effect) => {
                sweep_rewrites += 1;
                note_effect(&effect, settled);
                // Resume from the insertion point so created ops are visited
                // in this sweep; with nothing created, the slot now holds the
                // anchor's successor.
                if let Some(&first) = effect.created.first() {
                    index = graph.position(first);
                }
                if sweep_rewrites >= MAX_SWEEP_REWRITES {
                    tracing::warn!(limit = MAX_SWEEP_REWRITES, "sweep rewrite limit hit, ending sweep");
                    break;
                }
            }
            None => {
                settled.insert(anchor);
                index += 1;
            }
        }
    }
    Ok(sweep_rewrites)
}

fn sweep_reverse(
    graph: &mut Graph,
    region: RegionId,
    ordered: &[&RewritePattern],
    registry: &DialectRegistry,
    settled: &mut HashSet<OpId>,
) -> Result<usize> {
    let mut sweep_rewrites = 0;
    let mut index = graph.region_ops(region).len();
    while index > 0 {
        index -= 1;
        let anchor = graph.region_ops(region)[index];
        if settled.contains(&anchor) {
            continue;
        }
        match try_patterns(graph, ordered, registry, anchor)? {
            Some(effect) => {
                sweep_rewrites += 1;
                note_effect(&effect, settled);
                // Created ops occupy the anchor's slot; continue downward
                // from just past the last one so each gets visited.
                if let Some(&last) = effect.created.last() {
                    index = graph.position(last) + 1;
                }
                index = index.min(graph.region_ops(region).len());
                if sweep_rewrites >= MAX_SWEEP_REWRITES {
                    tracing::warn!(limit = MAX_SWEEP_REWRITES, "sweep rewrite limit hit, ending sweep");
                    break;
                }
            }
            None => {
                settled.insert(anchor);
            }
        }
    }
    Ok(sweep_rewrites)
}

/// Try the patterns at one anchor in priority order.
///
/// Returns the committed effect of the first applicable pattern, `None` when
/// every pattern failed to match or was rejected during materialization.
fn try_patterns(
    graph: &mut Graph,
    ordered: &[&RewritePattern],
    registry: &DialectRegistry,
    anchor: OpId,
) -> Result<Option<RewriteEffect>> {
    for pattern in ordered {
        if graph.kind(anchor) != pattern.root_kind() {
            continue;
        }
        let Ok(ctx) = match_pattern(graph, pattern, anchor) else {
            continue;
        };
        match materialize(graph, registry, pattern, &ctx, anchor) {
            Ok(materialized) => {
                let effect = apply(graph, &ctx, materialized)?;
                tracing::debug!(pattern = pattern.label(), ?anchor, "pattern applied");
                return Ok(Some(effect));
            }
            Err(error) if error.is_candidate_rejection() => {
                tracing::warn!(
                    pattern = pattern.label(),
                    ?anchor,
                    %error,
                    "materialization rejected, candidate skipped"
                );
            }
            Err(error) => return Err(error),
        }
    }
    Ok(None)
}

/// Bookkeeping after a committed rewrite: erased ops drop out of the settled
/// set, touched consumers become pending again.
fn note_effect(effect: &RewriteEffect, settled: &mut HashSet<OpId>) {
    for op in &effect.erased {
        settled.remove(op);
    }
    for op in &effect.redirected {
        settled.remove(op);
    }
}
