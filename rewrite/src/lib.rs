//! Declarative pattern rewriting for the Tessera IR.
//!
//! A rewrite is declared as a source pattern (the subgraph to match, with
//! attribute captures and native constraints) and a result pattern (the
//! replacement subgraph, with literal, captured and computed attributes).
//! Compiled patterns are applied by a greedy driver that sweeps a region to
//! fixpoint under an iteration bound.
//!
//! # Module Organization
//!
//! - [`pattern`] - Pattern graphs and the fluent builder surface
//! - [`matcher`] - Binding a pattern to a concrete subgraph
//! - [`context`] - The per-attempt binding table
//! - [`materialize`] - Building replacement ops through the dialect registry
//! - [`rewriter`] - Committing a replacement: redirect uses, erase dead ops
//! - [`driver`] - Greedy fixpoint application of a pattern set
//! - [`error`] - Error types and result handling
//!
//! # Example
//!
//! ```ignore
//! let mut src = SourcePattern::new();
//! src.op("reshape").call(&["x", "shape"], &["reshaped", "xshape"]);
//! src.op("transpose").capture("perm", "perm").call(&["reshaped"], &["out"]);
//!
//! let mut res = ResultPattern::new();
//! res.op("reshape_transpose")
//!     .capture("perm", "perm")
//!     .call(&["x", "shape"], &["out"]);
//!
//! let mut patterns = PatternSet::new();
//! patterns.add(RewritePattern::new("fuse-reshape-transpose", src, res, 1)?);
//!
//! let report = apply_patterns_greedily(
//!     &mut graph, region, &patterns, &registry, GreedyConfig::default(),
//! )?;
//! assert!(report.converged);
//! ```

pub mod context;
pub mod driver;
pub mod error;
pub mod matcher;
pub mod materialize;
pub mod pattern;
pub mod rewriter;

#[cfg(test)]
pub mod test;

pub use context::MatchContext;
pub use driver::{GreedyConfig, PatternSet, RewriteReport, Traversal, apply_patterns_greedily};
pub use error::{Error, Result};
pub use matcher::{Mismatch, match_pattern};
pub use materialize::{Materialized, materialize};
pub use pattern::{ResultPattern, RewritePattern, SourcePattern};
pub use rewriter::{RewriteEffect, apply};
