use snafu::Snafu;

use crate::graph::{OpId, ValueId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Erasing the operation would leave consumers pointing at a dead value.
    #[snafu(display(
        "cannot erase `{kind}` ({op:?}): result {value:?} still has {remaining} remaining use(s)"
    ))]
    DanglingUse { op: OpId, kind: String, value: ValueId, remaining: usize },
}
