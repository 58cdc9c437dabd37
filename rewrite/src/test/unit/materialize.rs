use tessera_ir::{AttrMap, Attribute, DialectRegistry, Graph, OpId, RegionId, attrs};

use crate::error::Error;
use crate::matcher::match_pattern;
use crate::materialize::materialize;
use crate::pattern::{ResultPattern, RewritePattern, SourcePattern};
use crate::test::helpers::{op_n, snapshot, tensor_registry};

fn relu_graph() -> (Graph, RegionId, OpId) {
    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    let relu = op_n(&mut graph, region, "relu", &[x], 1, AttrMap::new());
    let out = graph.result(relu, 0);
    op_n(&mut graph, region, "fetch", &[out], 0, attrs([("name", "out")]));
    (graph, region, relu)
}

fn relu_to(kind: &str) -> RewritePattern {
    let mut src = SourcePattern::new();
    src.op("relu").call(&["x"], &["out"]);
    let mut res = ResultPattern::new();
    res.op(kind).call(&["x"], &["out"]);
    RewritePattern::new("relu-to", src, res, 1).unwrap()
}

#[test]
fn test_materialize_inserts_before_anchor() {
    let (mut graph, _region, anchor) = relu_graph();
    let registry = tensor_registry();
    let pattern = relu_to("abs");
    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();

    let materialized = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap();

    assert_eq!(materialized.created.len(), 1);
    let created = materialized.created[0];
    assert_eq!(graph.kind(created), "abs");
    // Inserted at the anchor's slot.
    assert_eq!(graph.position(created), graph.position(anchor) - 1);
    // "out" is source-bound, so it appears in the replacement map.
    assert_eq!(materialized.replacements, vec![("out".to_string(), graph.result(created, 0))]);
}

#[test]
fn test_unknown_kind_rolls_back() {
    let (mut graph, region, anchor) = relu_graph();
    let registry = tensor_registry();
    let pattern = relu_to("fused_unknown");
    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();

    let before = snapshot(&graph, region);
    let err = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap_err();

    assert!(matches!(err, Error::UnknownOperation { kind } if kind == "fused_unknown"));
    assert_eq!(snapshot(&graph, region), before);
}

#[test]
fn test_unknown_kind_mid_walk_erases_earlier_insertions() {
    let (mut graph, region, anchor) = relu_graph();
    let registry = tensor_registry();

    let mut src = SourcePattern::new();
    src.op("relu").call(&["x"], &["out"]);
    let mut res = ResultPattern::new();
    res.op("abs").call(&["x"], &["mid"]);
    res.op("fused_unknown").call(&["mid"], &["out"]);
    let pattern = RewritePattern::new("partial", src, res, 1).unwrap();

    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();
    let before = snapshot(&graph, region);
    let err = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap_err();

    // The abs was inserted, then removed again: no partial insertion remains.
    assert!(matches!(err, Error::UnknownOperation { .. }));
    assert_eq!(snapshot(&graph, region), before);
}

#[test]
fn test_builder_arity_mismatch_rolls_back() {
    let (mut graph, region, anchor) = relu_graph();
    let mut registry = DialectRegistry::new();
    // Claims one output in the pattern, builds two.
    registry.register("abs", |builder, operands, a| builder.build("abs", operands, 2, a.clone()));

    let pattern = relu_to("abs");
    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();
    let before = snapshot(&graph, region);
    let err = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap_err();

    assert!(matches!(
        err,
        Error::BuilderArityMismatch { kind, expected: 1, actual: 2 } if kind == "abs"
    ));
    assert_eq!(snapshot(&graph, region), before);
}

#[test]
fn test_missing_capture_rolls_back() {
    let (mut graph, region, anchor) = relu_graph();
    let registry = tensor_registry();

    let mut src = SourcePattern::new();
    src.op("relu").call(&["x"], &["out"]);
    let mut res = ResultPattern::new();
    // No source capture ever binds "nope".
    res.op("abs").capture("alpha", "nope").call(&["x"], &["out"]);
    let pattern = RewritePattern::new("missing-capture", src, res, 1).unwrap();

    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();
    let before = snapshot(&graph, region);
    let err = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap_err();

    assert!(matches!(err, Error::MissingCapture { binding } if binding == "nope"));
    assert_eq!(snapshot(&graph, region), before);
}

#[test]
fn test_computed_attribute_derives_from_bindings() {
    let (mut graph, _region, anchor) = relu_graph();
    let registry = tensor_registry();

    let mut src = SourcePattern::new();
    src.op("relu").call(&["x"], &["out"]);
    let mut res = ResultPattern::new();
    res.op("scale")
        .computed("factor", |ctx| Attribute::Float(if ctx.value("x").is_some() { 2.0 } else { 0.0 }))
        .call(&["x", "x"], &["out"]);
    let pattern = RewritePattern::new("computed", src, res, 1).unwrap();

    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();
    let materialized = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap();

    let created = materialized.created[0];
    assert_eq!(graph.attribute(created, "factor"), Some(&Attribute::Float(2.0)));
}

#[test]
fn test_result_chain_resolves_locally_created_values() {
    let (mut graph, _region, anchor) = relu_graph();
    let registry = tensor_registry();

    let mut src = SourcePattern::new();
    src.op("relu").call(&["x"], &["out"]);
    let mut res = ResultPattern::new();
    res.op("abs").call(&["x"], &["mid"]);
    res.op("neg").call(&["mid"], &["out"]);
    let pattern = RewritePattern::new("abs-neg", src, res, 1).unwrap();

    let ctx = match_pattern(&graph, &pattern, anchor).unwrap();
    let materialized = materialize(&mut graph, &registry, &pattern, &ctx, anchor).unwrap();

    assert_eq!(materialized.created.len(), 2);
    let abs = materialized.created[0];
    let neg = materialized.created[1];
    // The neg consumes the freshly created abs result, not a source value.
    assert_eq!(graph.operand(neg, 0), graph.result(abs, 0));
    // Only the terminal rebind lands in the replacement map.
    assert_eq!(materialized.replacements, vec![("out".to_string(), graph.result(neg, 0))]);
}
