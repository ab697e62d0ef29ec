use crate::Pair;

/// Errors reported by [`AvlTree`](crate::AvlTree) operations.
///
/// None of these leave the tree modified.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The pair is already stored in the tree.
    #[error("{0} is already present")]
    DuplicateKey(Pair),

    /// The pair is not stored in the tree.
    #[error("{0} is not present")]
    NotFound(Pair),

    /// A rotation was requested at a node lacking the child it would promote.
    #[error("no {direction} rotation possible at {pair}")]
    InvalidRotation {
        pair: Pair,
        direction: &'static str,
    },
}
