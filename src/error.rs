use std::{collections::TryReserveError, fmt};

use thiserror::Error;

/// Failure to allocate memory for a new tree node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("failed to allocate {size} bytes for a tree node")]
pub struct AllocError {
    pub size: usize,
}

/// Error returned by fallible insertion into a [`SearchTree`](crate::SearchTree).
///
/// In both cases the tree is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum InsertError<E> {
    /// An element with an equal key is already in the tree.
    #[error("an element with an equal key is already in the tree")]
    Occupied,

    /// The node constructor failed.
    #[error("failed to construct the tree node")]
    Alloc(#[source] E),
}

/// The auxiliary stack of a traversal could not grow.
///
/// Traversals never modify the tree, so the tree is intact when this is returned.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("traversal stack exhausted at depth {depth}")]
    StackExhausted {
        depth: usize,
        #[source]
        source: TryReserveError,
    },
}

#[derive(Debug, Error)]
pub enum PrintError {
    #[error(transparent)]
    Fmt(#[from] fmt::Error),

    #[error(transparent)]
    Walk(#[from] WalkError),
}
