use tessera_ir::{AttrMap, Attribute, Graph, OpId, RegionId, attrs};

use crate::matcher::{Mismatch, match_pattern};
use crate::pattern::{ResultPattern, RewritePattern, SourcePattern};
use crate::test::helpers::{op1, op_n};

/// `x -> reshape(x, shape) -> transpose -> out`, returning the transpose op.
fn reshape_transpose_graph() -> (Graph, RegionId, OpId) {
    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    let shape = op1(&mut graph, region, "full_int_array", &[], attrs([("value", vec![1i64, 300, 8, 32])]));
    let reshape = op_n(&mut graph, region, "reshape", &[x, shape], 2, AttrMap::new());
    let reshaped = graph.result(reshape, 0);
    let transpose =
        op_n(&mut graph, region, "transpose", &[reshaped], 1, attrs([("perm", vec![0i64, 2, 1, 3])]));
    (graph, region, transpose)
}

fn fuse_pattern() -> RewritePattern {
    let mut src = SourcePattern::new();
    src.op("full_int_array").capture("value", "shape_value").call(&[], &["shape"]);
    src.op("reshape").call(&["x", "shape"], &["reshaped", "xshape"]);
    src.op("transpose").capture("perm", "perm").call(&["reshaped"], &["out"]);

    let mut res = ResultPattern::new();
    res.op("reshape_transpose").capture("perm", "perm").call(&["x"], &["out"]);

    RewritePattern::new("fuse-reshape-transpose", src, res, 1).unwrap()
}

#[test]
fn test_match_binds_whole_chain() {
    let (graph, _region, anchor) = reshape_transpose_graph();
    let ctx = match_pattern(&graph, &fuse_pattern(), anchor).unwrap();

    assert_eq!(ctx.matched_ops().len(), 3);
    assert_eq!(ctx.ints("shape_value"), Some(&[1i64, 300, 8, 32][..]));
    assert_eq!(ctx.ints("perm"), Some(&[0i64, 2, 1, 3][..]));
    let reshaped = ctx.value("reshaped").unwrap();
    let (def, index) = graph.defining_op(reshaped).unwrap();
    assert_eq!(graph.kind(def), "reshape");
    assert_eq!(index, 0);
    // The anchor's result is the terminal binding.
    assert_eq!(ctx.value("out"), Some(graph.result(anchor, 0)));
}

#[test]
fn test_match_is_deterministic() {
    let (graph, _region, anchor) = reshape_transpose_graph();
    let pattern = fuse_pattern();

    let first = match_pattern(&graph, &pattern, anchor).unwrap();
    let second = match_pattern(&graph, &pattern, anchor).unwrap();

    assert_eq!(first.value_bindings(), second.value_bindings());
    assert_eq!(first.attr_bindings(), second.attr_bindings());
    assert_eq!(first.matched_ops(), second.matched_ops());
}

#[test]
fn test_anchor_kind_mismatch() {
    let (graph, region, _anchor) = reshape_transpose_graph();
    let reshape = graph.region_ops(region)[1];
    assert_eq!(match_pattern(&graph, &fuse_pattern(), reshape), Err(Mismatch::Structural));
}

#[test]
fn test_arity_mismatch_is_structural() {
    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    // Single-input reshape: pattern expects (data, shape).
    let reshape = op_n(&mut graph, region, "reshape", &[x], 2, AttrMap::new());
    let reshaped = graph.result(reshape, 0);
    let transpose = op_n(
        &mut graph,
        region,
        "transpose",
        &[reshaped],
        1,
        attrs([("perm", vec![0i64])]),
    );

    assert_eq!(match_pattern(&graph, &fuse_pattern(), transpose), Err(Mismatch::Structural));
}

#[test]
fn test_missing_attribute_is_attribute_mismatch() {
    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    let shape = op1(&mut graph, region, "full_int_array", &[], attrs([("value", vec![1i64])]));
    let reshape = op_n(&mut graph, region, "reshape", &[x, shape], 2, AttrMap::new());
    let reshaped = graph.result(reshape, 0);
    // No `perm` attribute on the transpose.
    let transpose = op_n(&mut graph, region, "transpose", &[reshaped], 1, AttrMap::new());

    assert_eq!(match_pattern(&graph, &fuse_pattern(), transpose), Err(Mismatch::Attribute));
}

#[test]
fn test_literal_attribute_gate() {
    let mut src = SourcePattern::new();
    src.op("softmax").literal("axis", -1i64).call(&["x"], &["out"]);
    let pattern = RewritePattern::new("softmax-last-axis", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    let last_axis = op_n(&mut graph, region, "softmax", &[x], 1, attrs([("axis", -1i64)]));
    let other_axis = op_n(&mut graph, region, "softmax", &[x], 1, attrs([("axis", 1i64)]));

    assert!(match_pattern(&graph, &pattern, last_axis).is_ok());
    assert_eq!(match_pattern(&graph, &pattern, other_axis), Err(Mismatch::Attribute));
}

#[test]
fn test_aliased_input_placeholder() {
    let mut src = SourcePattern::new();
    src.op("add").call(&["x", "x"], &["out"]);
    let pattern = RewritePattern::new("self-add", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let a = graph.add_block_arg(region);
    let b = graph.add_block_arg(region);
    let same = op_n(&mut graph, region, "add", &[a, a], 1, AttrMap::new());
    let distinct = op_n(&mut graph, region, "add", &[a, b], 1, AttrMap::new());

    let ctx = match_pattern(&graph, &pattern, same).unwrap();
    assert_eq!(ctx.value("x"), Some(a));
    assert_eq!(match_pattern(&graph, &pattern, distinct), Err(Mismatch::Structural));
}

#[test]
fn test_attribute_capture_must_agree() {
    // Both transposes must carry the same `perm` under one binding.
    let mut src = SourcePattern::new();
    src.op("transpose").capture("perm", "perm").call(&["a"], &["ta"]);
    src.op("transpose").capture("perm", "perm").call(&["b"], &["tb"]);
    src.op("matmul").call(&["ta", "tb"], &["out"]);
    let pattern = RewritePattern::new("same-perm", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let a = graph.add_block_arg(region);
    let b = graph.add_block_arg(region);

    let ta = op1(&mut graph, region, "transpose", &[a], attrs([("perm", vec![1i64, 0])]));
    let tb_same = op1(&mut graph, region, "transpose", &[b], attrs([("perm", vec![1i64, 0])]));
    let tb_other = op1(&mut graph, region, "transpose", &[b], attrs([("perm", vec![0i64, 1])]));
    let agree = op_n(&mut graph, region, "matmul", &[ta, tb_same], 1, AttrMap::new());
    let disagree = op_n(&mut graph, region, "matmul", &[ta, tb_other], 1, AttrMap::new());

    assert!(match_pattern(&graph, &pattern, agree).is_ok());
    assert_eq!(match_pattern(&graph, &pattern, disagree), Err(Mismatch::Attribute));
}

#[test]
fn test_diamond_pattern_memoizes_shared_producer() {
    // t = add(x, y); out = mul(t, t) - both operands resolve to one op-call.
    let mut src = SourcePattern::new();
    src.op("add").call(&["x", "y"], &["t"]);
    src.op("mul").call(&["t", "t"], &["out"]);
    let pattern = RewritePattern::new("square-of-sum", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    let y = graph.add_block_arg(region);
    let sum = op1(&mut graph, region, "add", &[x, y], AttrMap::new());
    let shared = op_n(&mut graph, region, "mul", &[sum, sum], 1, AttrMap::new());

    let ctx = match_pattern(&graph, &pattern, shared).unwrap();
    assert_eq!(ctx.matched_ops().len(), 2);

    // Two different adds cannot both bind `t`.
    let other = op1(&mut graph, region, "add", &[x, y], AttrMap::new());
    let split = op_n(&mut graph, region, "mul", &[sum, other], 1, AttrMap::new());
    assert_eq!(match_pattern(&graph, &pattern, split), Err(Mismatch::Structural));
}

#[test]
fn test_block_arg_cannot_match_produced_placeholder() {
    let mut src = SourcePattern::new();
    src.op("relu").call(&["x"], &["mid"]);
    src.op("neg").call(&["mid"], &["out"]);
    let pattern = RewritePattern::new("neg-of-relu", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let arg = graph.add_block_arg(region);
    let neg = op_n(&mut graph, region, "neg", &[arg], 1, AttrMap::new());

    assert_eq!(match_pattern(&graph, &pattern, neg), Err(Mismatch::Structural));
}

#[test]
fn test_constraints_run_in_declaration_order() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let order = Arc::new(AtomicUsize::new(0));

    let mut src = SourcePattern::new();
    src.op("softmax").capture("axis", "axis").call(&["x"], &["out"]);
    let first = order.clone();
    src.constraint(move |ctx| {
        first.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).ok();
        ctx.int("axis").is_some()
    });
    let second = order.clone();
    src.constraint(move |ctx| {
        // Only reached after the first constraint passed.
        second.compare_exchange(1, 2, Ordering::SeqCst, Ordering::SeqCst).ok();
        ctx.int("axis") == Some(-1)
    });
    let pattern = RewritePattern::new("softmax-constrained", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    let rejected = op_n(&mut graph, region, "softmax", &[x], 1, attrs([("axis", 3i64)]));
    let accepted = op_n(&mut graph, region, "softmax", &[x], 1, attrs([("axis", -1i64)]));

    assert_eq!(match_pattern(&graph, &pattern, rejected), Err(Mismatch::Constraint));
    assert!(match_pattern(&graph, &pattern, accepted).is_ok());
    assert_eq!(order.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failed_match_reports_no_bindings() {
    let (graph, region, _anchor) = reshape_transpose_graph();
    let reshape = graph.region_ops(region)[1];
    // A mismatch returns only the mismatch kind; no partially-filled context
    // escapes.
    let result = match_pattern(&graph, &fuse_pattern(), reshape);
    assert_eq!(result, Err(Mismatch::Structural));
}

#[test]
fn test_attribute_kind_must_agree() {
    let mut src = SourcePattern::new();
    src.op("softmax").literal("axis", Attribute::Int(1)).call(&["x"], &["out"]);
    let pattern = RewritePattern::new("int-axis", src, ResultPattern::new(), 1).unwrap();

    let mut graph = Graph::new();
    let region = graph.create_region();
    let x = graph.add_block_arg(region);
    // Same numeric value, different attribute kind.
    let float_axis = op_n(&mut graph, region, "softmax", &[x], 1, attrs([("axis", 1.0f64)]));

    assert_eq!(match_pattern(&graph, &pattern, float_axis), Err(Mismatch::Attribute));
}
