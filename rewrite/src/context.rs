//! Match-time binding table.

use std::collections::HashMap;

use tessera_ir::{Attribute, OpId, ValueId};

/// Bindings produced by one successful match attempt.
///
/// Built incrementally by the matcher, handed to constraints, computed
/// attributes and the result builder, then discarded. A failed attempt never
/// leaks a partially-filled context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchContext {
    values: HashMap<String, ValueId>,
    attrs: HashMap<String, Attribute>,
    matched_ops: Vec<OpId>,
}

impl MatchContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, or verify an existing binding.
    ///
    /// Returns false when the name is already bound to a different value;
    /// this is the aliasing check.
    pub(crate) fn bind_value(&mut self, name: &str, value: ValueId) -> bool {
        match self.values.get(name) {
            Some(&bound) => bound == value,
            None => {
                self.values.insert(name.to_string(), value);
                true
            }
        }
    }

    /// Bind `name` to `attr`, or verify kind + encoded value on re-sight.
    pub(crate) fn bind_attr(&mut self, name: &str, attr: &Attribute) -> bool {
        match self.attrs.get(name) {
            Some(bound) => bound == attr,
            None => {
                self.attrs.insert(name.to_string(), attr.clone());
                true
            }
        }
    }

    pub(crate) fn push_matched(&mut self, op: OpId) {
        self.matched_ops.push(op);
    }

    /// Value bound to a tensor placeholder name.
    pub fn value(&self, name: &str) -> Option<ValueId> {
        self.values.get(name).copied()
    }

    /// Attribute bound to a capture name.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.attr(name)?.as_int()
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.attr(name)?.as_float()
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.attr(name)?.as_bool()
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.attr(name)?.as_str()
    }

    pub fn ints(&self, name: &str) -> Option<&[i64]> {
        self.attr(name)?.as_ints()
    }

    pub fn floats(&self, name: &str) -> Option<&[f64]> {
        self.attr(name)?.as_floats()
    }

    /// Matched operations in op-call declaration order.
    pub fn matched_ops(&self) -> &[OpId] {
        &self.matched_ops
    }

    /// The full name → value table (for determinism checks and debugging).
    pub fn value_bindings(&self) -> &HashMap<String, ValueId> {
        &self.values
    }

    /// The full name → attribute table.
    pub fn attr_bindings(&self) -> &HashMap<String, Attribute> {
        &self.attrs
    }
}
