use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Hard errors of the rewrite engine.
///
/// Structural/attribute/constraint mismatches during matching are not errors;
/// they drive backtracking and are reported through
/// [`Mismatch`](crate::matcher::Mismatch).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Materialization requested a kind the dialect registry does not know.
    /// Rolled back atomically; the candidate match is rejected and the pass
    /// continues.
    #[snafu(display("no registered builder for operation kind `{kind}`"))]
    UnknownOperation { kind: String },

    /// A registered builder produced an operation whose result count
    /// contradicts the op-call that requested it. Same rollback and
    /// continuation as [`Error::UnknownOperation`].
    #[snafu(display("builder for `{kind}` produced {actual} result(s), op-call declares {expected}"))]
    BuilderArityMismatch { kind: String, expected: usize, actual: usize },

    /// A result attribute references a capture binding the source match never
    /// bound. Same rollback and continuation as [`Error::UnknownOperation`].
    #[snafu(display("result pattern references attribute binding `{binding}` absent from the match"))]
    MissingCapture { binding: String },

    /// Graph surgery failed; the replacement pattern left a live consumer
    /// behind. Aborts the whole pass run.
    #[snafu(display("graph surgery failed: {source}"))]
    Surgery { source: tessera_ir::Error },

    // ===== Pattern-compile diagnostics =====
    /// The source pattern declares no op-calls.
    #[snafu(display("source pattern has no op-calls"))]
    EmptySource,

    /// A placeholder is produced by more than one op-call in the same graph.
    #[snafu(display("placeholder `{name}` is produced by more than one op-call"))]
    DuplicateProducer { name: String },

    /// A source op-call cannot be reached from the root along producer edges
    /// and could therefore never constrain a match.
    #[snafu(display("source op-call `{kind}` (#{index}) is unreachable from the pattern root"))]
    UnreachableOpCall { kind: String, index: usize },

    /// A result op-call consumes a placeholder that is neither bound by the
    /// source pattern nor produced by an earlier result op-call.
    #[snafu(display("result op-call consumes `{name}`, which is neither source-bound nor produced earlier"))]
    UnresolvableOperand { name: String },
}

impl Error {
    /// True for errors that reject one candidate match (after rollback) and
    /// let the pass continue; false for errors that abort the run.
    pub fn is_candidate_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnknownOperation { .. } | Error::BuilderArityMismatch { .. } | Error::MissingCapture { .. }
        )
    }
}
