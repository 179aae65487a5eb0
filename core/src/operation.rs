//! Editable targets and reversible operations.
//!
//! This module defines the contract every undoable mutation satisfies:
//!
//! - [`Editable`]: marker trait for types that operations mutate
//! - [`Operation`]: a reversible operation with `do_it` / `undo_it`
//! - [`OperationError`] / [`OperationResult`]: error handling for operations
//! - [`FnOperation`]: an operation assembled from two closures
//!
//! Operations are self-contained: each implementation stores whatever data it
//! needs (target identifiers, old/new values, queued requests) and receives the
//! live target only for the duration of a call.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Marker trait for types that serve as operation targets.
///
/// Implement this on any type operations can mutate: a scene graph, a
/// document, a test counter.
pub trait Editable: 'static {}

/// Error type for operation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OperationError {
    /// The operation is not legal in the current state of its owner.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// A container was modified after it already ran.
    #[error("sealed: {0}")]
    Sealed(String),
    /// Some children of a batch failed while others succeeded.
    #[error("{} of {} operations failed", .failed.len(), .total)]
    Partial {
        total: usize,
        succeeded: Vec<usize>,
        failed: Vec<(usize, OperationError)>,
    },
    /// The target rejected the request.
    #[error(transparent)]
    Target(Arc<dyn Error + Send + Sync>),
    /// A custom error with a description.
    #[error("{0}")]
    Custom(String),
}

impl OperationError {
    /// Wraps an error raised by the target.
    pub fn target(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Target(Arc::new(err))
    }

    /// Returns the target error if it is of type `E`.
    pub fn downcast_target<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Target(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Result type for operation calls.
pub type OperationResult<T = ()> = Result<T, OperationError>;

/// A reversible operation (Command pattern).
///
/// `do_it` applies the operation in the forward (redo) direction and
/// `undo_it` reverses it. Both may be called repeatedly in alternation:
/// `do_it`, `undo_it`, `do_it`, ...
///
/// # Object Safety
///
/// The trait is dyn-compatible so heterogeneous operations can live in one
/// [`UndoLedger`](crate::UndoLedger) or
/// [`CompoundOperation`](crate::CompoundOperation) as
/// `Box<dyn Operation<T>>`.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug)]
/// struct Rename { node: NodeId, old: String, new: String }
///
/// impl Operation<Scene> for Rename {
///     fn do_it(&mut self, scene: &mut Scene) -> OperationResult {
///         scene.rename(self.node, &self.new).map_err(OperationError::target)
///     }
///
///     fn undo_it(&mut self, scene: &mut Scene) -> OperationResult {
///         scene.rename(self.node, &self.old).map_err(OperationError::target)
///     }
/// }
/// ```
pub trait Operation<T: Editable>: fmt::Debug + Send {
    /// Applies the operation to the target (forward / redo direction).
    fn do_it(&mut self, target: &mut T) -> OperationResult;

    /// Reverses the operation.
    ///
    /// Must restore every property [`do_it`](Self::do_it) touched.
    fn undo_it(&mut self, target: &mut T) -> OperationResult;

    /// A short, human-readable description for history displays.
    fn description(&self) -> &str {
        "operation"
    }
}

impl<T: Editable> Operation<T> for Box<dyn Operation<T>> {
    fn do_it(&mut self, target: &mut T) -> OperationResult {
        (**self).do_it(target)
    }

    fn undo_it(&mut self, target: &mut T) -> OperationResult {
        (**self).undo_it(target)
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}

/// Boxed closure used by [`FnOperation`].
pub type BoxedStep<T> = Box<dyn FnMut(&mut T) -> OperationResult + Send>;

/// An operation made of a redo closure and an undo closure.
///
/// This is the shape external callers use to push arbitrary
/// (undo, redo) pairs onto the ledger without writing a dedicated type.
pub struct FnOperation<T: Editable> {
    description: String,
    redo: BoxedStep<T>,
    undo: BoxedStep<T>,
}

impl<T: Editable> FnOperation<T> {
    pub fn new(
        description: impl Into<String>,
        redo: impl FnMut(&mut T) -> OperationResult + Send + 'static,
        undo: impl FnMut(&mut T) -> OperationResult + Send + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            redo: Box::new(redo),
            undo: Box::new(undo),
        }
    }
}

impl<T: Editable> fmt::Debug for FnOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: Editable> Operation<T> for FnOperation<T> {
    fn do_it(&mut self, target: &mut T) -> OperationResult {
        (self.redo)(target)
    }

    fn undo_it(&mut self, target: &mut T) -> OperationResult {
        (self.undo)(target)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
