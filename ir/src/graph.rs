//! SSA graph storage: values, operations, regions.
//!
//! The graph is a mutable use/def structure. Operations own their operand and
//! result lists; every value records its definition site and an ordered list
//! of (consumer, operand-index) uses. Identity is a stable `u64` id, never a
//! pointer, so handles stay meaningful across mutation and erased ids are
//! never reused.
//!
//! # Handles
//!
//! [`OpId`], [`ValueId`] and [`RegionId`] are opaque handles into one
//! [`Graph`]. Passing a handle from another graph, or one that has already
//! been erased, is a programmer error and panics on access.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::attribute::{AttrMap, Attribute};
use crate::error::{DanglingUseSnafu, Result};

/// Stable handle of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(u64);

/// Stable handle of an SSA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u64);

/// Handle of a region. Regions are never erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(usize);

/// One use of a value: the consuming operation and its operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    pub op: OpId,
    pub index: usize,
}

/// Definition site of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    /// The `index`-th result of an operation.
    Result { op: OpId, index: usize },
    /// The `index`-th block argument of a region.
    BlockArg { region: RegionId, index: usize },
}

/// Where a new operation is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPoint {
    /// Immediately before an existing operation, in that operation's region.
    Before(OpId),
    /// Immediately after an existing operation, in that operation's region.
    After(OpId),
    /// At the end of a region.
    End(RegionId),
}

#[derive(Debug)]
struct OpData {
    kind: String,
    operands: SmallVec<[ValueId; 4]>,
    results: SmallVec<[ValueId; 2]>,
    attrs: AttrMap,
    region: RegionId,
}

#[derive(Debug)]
struct ValueData {
    def: ValueDef,
    uses: Vec<Use>,
}

#[derive(Debug, Default)]
struct RegionData {
    ops: Vec<OpId>,
    args: Vec<ValueId>,
}

/// Mutable SSA graph: the single owner of all operations, values and regions.
#[derive(Debug, Default)]
pub struct Graph {
    ops: HashMap<OpId, OpData>,
    values: HashMap<ValueId, ValueData>,
    regions: Vec<RegionData>,
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn op(&self, op: OpId) -> &OpData {
        &self.ops[&op]
    }

    fn value(&self, value: ValueId) -> &ValueData {
        &self.values[&value]
    }

    // ===== Regions =====

    pub fn create_region(&mut self) -> RegionId {
        self.regions.push(RegionData::default());
        RegionId(self.regions.len() - 1)
    }

    /// Append a block argument to the region and return its value.
    pub fn add_block_arg(&mut self, region: RegionId) -> ValueId {
        let value = ValueId(self.fresh_id());
        let index = self.regions[region.0].args.len();
        self.values.insert(value, ValueData { def: ValueDef::BlockArg { region, index }, uses: Vec::new() });
        self.regions[region.0].args.push(value);
        value
    }

    pub fn region_args(&self, region: RegionId) -> &[ValueId] {
        &self.regions[region.0].args
    }

    /// Operations of the region in program order.
    pub fn region_ops(&self, region: RegionId) -> &[OpId] {
        &self.regions[region.0].ops
    }

    /// Position of `op` in its region's program order.
    pub fn position(&self, op: OpId) -> usize {
        let region = self.op(op).region;
        self.regions[region.0]
            .ops
            .iter()
            .position(|&o| o == op)
            .unwrap_or_else(|| panic!("operation {op:?} not linked into region {region:?}"))
    }

    // ===== Operation construction =====

    /// Create an operation and link it into the graph at `at`.
    ///
    /// Allocates `result_count` fresh result values and records one use per
    /// operand slot, in operand order.
    pub fn build_op(
        &mut self,
        at: InsertPoint,
        kind: impl Into<String>,
        operands: &[ValueId],
        result_count: usize,
        attrs: AttrMap,
    ) -> OpId {
        let kind = kind.into();
        let (region, position) = match at {
            InsertPoint::Before(anchor) => (self.op(anchor).region, self.position(anchor)),
            InsertPoint::After(anchor) => (self.op(anchor).region, self.position(anchor) + 1),
            InsertPoint::End(region) => (region, self.regions[region.0].ops.len()),
        };

        let op = OpId(self.fresh_id());
        let mut results = SmallVec::with_capacity(result_count);
        for index in 0..result_count {
            let value = ValueId(self.fresh_id());
            self.values.insert(value, ValueData { def: ValueDef::Result { op, index }, uses: Vec::new() });
            results.push(value);
        }
        for (index, &operand) in operands.iter().enumerate() {
            self.values
                .get_mut(&operand)
                .unwrap_or_else(|| panic!("operand {operand:?} not in graph"))
                .uses
                .push(Use { op, index });
        }

        tracing::trace!(?op, kind = %kind, operands = operands.len(), results = result_count, "build op");
        self.ops.insert(op, OpData { kind, operands: SmallVec::from_slice(operands), results, attrs, region });
        self.regions[region.0].ops.insert(position, op);
        op
    }

    // ===== Operation accessors =====

    pub fn contains_op(&self, op: OpId) -> bool {
        self.ops.contains_key(&op)
    }

    pub fn kind(&self, op: OpId) -> &str {
        &self.op(op).kind
    }

    pub fn op_region(&self, op: OpId) -> RegionId {
        self.op(op).region
    }

    pub fn operands(&self, op: OpId) -> &[ValueId] {
        &self.op(op).operands
    }

    pub fn operand(&self, op: OpId, index: usize) -> ValueId {
        self.op(op).operands[index]
    }

    pub fn operand_count(&self, op: OpId) -> usize {
        self.op(op).operands.len()
    }

    pub fn results(&self, op: OpId) -> &[ValueId] {
        &self.op(op).results
    }

    pub fn result(&self, op: OpId, index: usize) -> ValueId {
        self.op(op).results[index]
    }

    pub fn result_count(&self, op: OpId) -> usize {
        self.op(op).results.len()
    }

    pub fn attribute(&self, op: OpId, name: &str) -> Option<&Attribute> {
        self.op(op).attrs.get(name)
    }

    pub fn attributes(&self, op: OpId) -> &AttrMap {
        &self.op(op).attrs
    }

    // ===== Value accessors =====

    pub fn value_def(&self, value: ValueId) -> ValueDef {
        self.value(value).def
    }

    /// Defining operation and result index, or `None` for block arguments.
    pub fn defining_op(&self, value: ValueId) -> Option<(OpId, usize)> {
        match self.value(value).def {
            ValueDef::Result { op, index } => Some((op, index)),
            ValueDef::BlockArg { .. } => None,
        }
    }

    /// Uses of the value, ordered by recording time.
    pub fn users(&self, value: ValueId) -> &[Use] {
        &self.value(value).uses
    }

    pub fn has_uses(&self, value: ValueId) -> bool {
        !self.value(value).uses.is_empty()
    }

    // ===== Graph surgery =====

    /// Redirect every use of `old` to `new`, preserving operand positions.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) {
        self.replace_uses_except(old, new, &[]);
    }

    /// Redirect uses of `old` to `new`, skipping consumers listed in `exempt`.
    ///
    /// Redirected uses are appended to `new`'s use list in their original
    /// order; exempt uses stay on `old`.
    pub fn replace_uses_except(&mut self, old: ValueId, new: ValueId, exempt: &[OpId]) {
        if old == new {
            return;
        }
        let uses = std::mem::take(
            &mut self.values.get_mut(&old).unwrap_or_else(|| panic!("value {old:?} not in graph")).uses,
        );
        let (moved, kept): (Vec<Use>, Vec<Use>) = uses.into_iter().partition(|u| !exempt.contains(&u.op));
        for &u in &moved {
            let data = self.ops.get_mut(&u.op).unwrap_or_else(|| panic!("consumer {:?} not in graph", u.op));
            data.operands[u.index] = new;
        }
        tracing::trace!(?old, ?new, redirected = moved.len(), "replace uses");
        self.values.get_mut(&old).expect("checked above").uses = kept;
        self.values.get_mut(&new).unwrap_or_else(|| panic!("value {new:?} not in graph")).uses.extend(moved);
    }

    /// Remove an operation and its result values from the graph.
    ///
    /// Fails with [`Error::DanglingUse`](crate::Error::DanglingUse) if any
    /// result still has a remaining use; the graph is untouched in that case.
    pub fn erase_op(&mut self, op: OpId) -> Result<()> {
        let data = self.op(op);
        for &result in &data.results {
            let remaining = self.value(result).uses.len();
            snafu::ensure!(
                remaining == 0,
                DanglingUseSnafu { op, kind: data.kind.clone(), value: result, remaining }
            );
        }

        let data = self.ops.remove(&op).expect("checked above");
        tracing::trace!(?op, kind = %data.kind, "erase op");
        for &operand in &data.operands {
            // The operand may itself be a result of `op` only in malformed
            // graphs; uses are scrubbed by consumer id either way.
            if let Some(value) = self.values.get_mut(&operand) {
                value.uses.retain(|u| u.op != op);
            }
        }
        for &result in &data.results {
            self.values.remove(&result);
        }
        self.regions[data.region.0].ops.retain(|&o| o != op);
        Ok(())
    }
}
