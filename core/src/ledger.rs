//! Linear undo/redo history.
//!
//! [`UndoLedger`] keeps committed operations in the order their redo
//! direction completed. An operation is recorded only after it has run
//! forward once; recording a new entry clears the redo stack.
//!
//! The ledger locks internally, so one ledger can be shared behind an
//! [`Arc`](std::sync::Arc) by several logical callers. Pushes serialize in
//! the order they complete.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::operation::{
    Editable, FnOperation, Operation, OperationError, OperationResult,
};

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

struct LedgerEntry<T: Editable> {
    description: String,
    operation: Box<dyn Operation<T>>,
}

struct LedgerState<T: Editable> {
    undo_stack: VecDeque<LedgerEntry<T>>,
    redo_stack: Vec<LedgerEntry<T>>,
    max_depth: usize,
}

impl<T: Editable> LedgerState<T> {
    fn push_undo(&mut self, entry: LedgerEntry<T>) {
        self.undo_stack.push_back(entry);
        if self.undo_stack.len() > self.max_depth
            && let Some(dropped) = self.undo_stack.pop_front()
        {
            log::debug!("Undo depth exceeded, dropping '{}'", dropped.description);
        }
    }
}

/// Ordered stack of committed operations.
///
/// # Example
///
/// ```ignore
/// let ledger = UndoLedger::new(50);
/// let mut scene = MemoryScene::new();
///
/// // Run a modifier and record it as one entry
/// ledger.execute(Box::new(modifier), &mut scene)?;
///
/// ledger.undo(&mut scene)?;
/// ledger.redo(&mut scene)?;
/// ```
pub struct UndoLedger<T: Editable> {
    state: Mutex<LedgerState<T>>,
}

impl<T: Editable> UndoLedger<T> {
    /// Creates an empty ledger holding at most `max_depth` undo entries.
    ///
    /// When the undo stack grows past `max_depth`, the oldest entry is dropped.
    pub fn new(max_depth: usize) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                undo_stack: VecDeque::new(),
                redo_stack: Vec::new(),
                max_depth: max_depth.max(1),
            }),
        }
    }

    /// Records an operation whose redo direction has already run.
    ///
    /// Clears the redo stack.
    pub fn record(&self, operation: Box<dyn Operation<T>>) {
        let description = operation.description().to_owned();
        log::info!("Recorded '{description}'");
        let mut state = self.state.lock();
        state.redo_stack.clear();
        state.push_undo(LedgerEntry {
            description,
            operation,
        });
    }

    /// Records a raw (undo, redo) closure pair.
    ///
    /// The caller must already have performed the redo side effect.
    pub fn record_fns(
        &self,
        description: impl Into<String>,
        undo: impl FnMut(&mut T) -> OperationResult + Send + 'static,
        redo: impl FnMut(&mut T) -> OperationResult + Send + 'static,
    ) {
        self.record(Box::new(FnOperation::new(description, redo, undo)));
    }

    /// Runs an operation forward and records it if it changed the target.
    ///
    /// A failed operation is not recorded. A batch that fails with
    /// [`OperationError::Partial`] after at least one child succeeded is
    /// recorded before the error is returned, so the applied children stay
    /// undoable.
    pub fn execute(&self, mut operation: Box<dyn Operation<T>>, target: &mut T) -> OperationResult {
        match operation.do_it(target) {
            Ok(()) => {
                self.record(operation);
                Ok(())
            }
            Err(err) => {
                if let OperationError::Partial { succeeded, .. } = &err
                    && !succeeded.is_empty()
                {
                    log::warn!(
                        "Recording partially applied '{}': {err}",
                        operation.description()
                    );
                    self.record(operation);
                }
                Err(err)
            }
        }
    }

    /// Undoes the most recent entry and moves it onto the redo stack.
    ///
    /// Returns an error if there is nothing to undo or the undo failed; in the
    /// latter case the entry stays on the undo stack.
    pub fn undo(&self, target: &mut T) -> OperationResult {
        let mut entry = self
            .state
            .lock()
            .undo_stack
            .pop_back()
            .ok_or_else(|| OperationError::InvalidOperation("nothing to undo".into()))?;
        if let Err(err) = entry.operation.undo_it(target) {
            log::warn!("Undo of '{}' failed: {err}", entry.description);
            self.state.lock().undo_stack.push_back(entry);
            return Err(err);
        }
        log::debug!("Undid '{}'", entry.description);
        self.state.lock().redo_stack.push(entry);
        Ok(())
    }

    /// Redoes the most recently undone entry.
    ///
    /// Returns an error if there is nothing to redo or the redo failed; in the
    /// latter case the entry stays on the redo stack.
    pub fn redo(&self, target: &mut T) -> OperationResult {
        let mut entry = self
            .state
            .lock()
            .redo_stack
            .pop()
            .ok_or_else(|| OperationError::InvalidOperation("nothing to redo".into()))?;
        if let Err(err) = entry.operation.do_it(target) {
            log::warn!("Redo of '{}' failed: {err}", entry.description);
            self.state.lock().redo_stack.push(entry);
            return Err(err);
        }
        log::debug!("Redid '{}'", entry.description);
        self.state.lock().push_undo(entry);
        Ok(())
    }

    /// Returns `true` if there are entries that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.state.lock().undo_stack.is_empty()
    }

    /// Returns `true` if there are entries that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.state.lock().redo_stack.is_empty()
    }

    /// Undo entry descriptions, most recent first.
    pub fn undo_descriptions(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .undo_stack
            .iter()
            .rev()
            .map(|e| e.description.clone())
            .collect()
    }

    /// Redo entry descriptions, most recent first.
    pub fn redo_descriptions(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .redo_stack
            .iter()
            .rev()
            .map(|e| e.description.clone())
            .collect()
    }

    pub fn undo_count(&self) -> usize {
        self.state.lock().undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.state.lock().redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.state.lock().max_depth
    }

    /// Drops every entry. Used when the scene itself is reset.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.undo_stack.clear();
        state.redo_stack.clear();
    }
}

impl<T: Editable> Default for UndoLedger<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl<T: Editable> fmt::Debug for UndoLedger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("UndoLedger")
            .field("undo_count", &state.undo_stack.len())
            .field("redo_count", &state.redo_stack.len())
            .field("max_depth", &state.max_depth)
            .finish()
    }
}
