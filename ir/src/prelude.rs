//! Common imports for working with the host graph.
//!
//! ```rust,ignore
//! use tessera_ir::prelude::*;
//! ```

pub use crate::attribute::{AttrMap, Attribute, attrs};
pub use crate::graph::{Graph, InsertPoint, OpId, RegionId, Use, ValueDef, ValueId};
pub use crate::registry::{DialectRegistry, OpBuilder};
