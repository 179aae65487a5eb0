//! # Plugwork Core
//!
//! Target-agnostic building blocks for reversible editing.
//!
//! - [`Editable`]: marker trait for types operations mutate
//! - [`Operation`]: a reversible operation (Command pattern)
//! - [`UndoLedger`]: linear undo/redo history of committed operations
//! - [`ProxyOperation`]: a (do, undo) function pair with captured arguments
//! - [`CompoundOperation`]: ordered children run and undone together
//! - [`FnOperation`]: an operation made of two closures
//!
//! Nothing in this crate knows about scenes; the `plugwork` crate plugs a
//! scene graph in as the [`Editable`] target.

mod compound;
mod ledger;
mod operation;
mod proxy;

pub use compound::{CompoundOperation, FailurePolicy, UndoOrder};
pub use ledger::{DEFAULT_MAX_UNDO, UndoLedger};
pub use operation::{
    BoxedStep, Editable, FnOperation, Operation, OperationError, OperationResult,
};
pub use proxy::{ProxyFn, ProxyOperation};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
