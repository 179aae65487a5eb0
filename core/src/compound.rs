//! Ordered aggregates of operations sharing one do/undo lifecycle.

use std::fmt;

use serde::Deserialize;

use crate::operation::{Editable, Operation, OperationError, OperationResult};

/// Order in which [`CompoundOperation::undo_it`] visits its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoOrder {
    /// Last child first. Correct whenever later children depend on earlier ones.
    #[default]
    Reverse,
    /// Insertion order. Only valid for children that do not depend on each other.
    Forward,
}

/// What a compound does when one of its children fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep running the remaining children and report every failure.
    #[default]
    Continue,
    /// Stop at the first failing child.
    Stop,
}

/// An ordered list of heterogeneous operations run together.
///
/// Children run in insertion order on `do_it`. Children can only be added
/// before the first `do_it`; afterwards the compound is sealed.
///
/// `undo_it` only visits children that are currently applied, and a later
/// `do_it` only replays the children the preceding `undo_it` reverted.
pub struct CompoundOperation<T: Editable> {
    description: String,
    children: Vec<Box<dyn Operation<T>>>,
    undo_order: UndoOrder,
    failure_policy: FailurePolicy,
    sealed: bool,
    applied: Vec<usize>,
    undone: Vec<usize>,
}

impl<T: Editable> CompoundOperation<T> {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            children: Vec::new(),
            undo_order: UndoOrder::default(),
            failure_policy: FailurePolicy::default(),
            sealed: false,
            applied: Vec::new(),
            undone: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_undo_order(mut self, order: UndoOrder) -> Self {
        self.undo_order = order;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Adds one child. Fails once the compound has run.
    pub fn append(&mut self, operation: Box<dyn Operation<T>>) -> OperationResult {
        if self.sealed {
            return Err(OperationError::Sealed(format!(
                "cannot append to '{}' after it ran",
                self.description
            )));
        }
        self.children.push(operation);
        Ok(())
    }

    /// Adds several children in order. Fails once the compound has run.
    pub fn extend(
        &mut self,
        operations: impl IntoIterator<Item = Box<dyn Operation<T>>>,
    ) -> OperationResult {
        if self.sealed {
            return Err(OperationError::Sealed(format!(
                "cannot extend '{}' after it ran",
                self.description
            )));
        }
        self.children.extend(operations);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn undo_order(&self) -> UndoOrder {
        self.undo_order
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Indices of the children currently applied to the target, in run order.
    pub fn applied(&self) -> &[usize] {
        &self.applied
    }

    fn run(
        &mut self,
        target: &mut T,
        indices: Vec<usize>,
        forward: bool,
    ) -> (Vec<usize>, Vec<(usize, OperationError)>) {
        let mut succeeded = Vec::with_capacity(indices.len());
        let mut failed = Vec::new();
        for index in indices {
            let child = &mut self.children[index];
            let result = if forward {
                child.do_it(target)
            } else {
                child.undo_it(target)
            };
            match result {
                Ok(()) => succeeded.push(index),
                Err(err) => {
                    log::warn!(
                        "'{}' child {index} ('{}') failed: {err}",
                        self.description,
                        child.description()
                    );
                    failed.push((index, err));
                    if self.failure_policy == FailurePolicy::Stop {
                        break;
                    }
                }
            }
        }
        (succeeded, failed)
    }

    fn outcome(
        &self,
        succeeded: Vec<usize>,
        failed: Vec<(usize, OperationError)>,
    ) -> OperationResult {
        if failed.is_empty() {
            Ok(())
        } else {
            Err(OperationError::Partial {
                total: self.children.len(),
                succeeded,
                failed,
            })
        }
    }
}

impl<T: Editable> fmt::Debug for CompoundOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundOperation")
            .field("description", &self.description)
            .field("children", &self.children)
            .field("undo_order", &self.undo_order)
            .field("failure_policy", &self.failure_policy)
            .field("sealed", &self.sealed)
            .field("applied", &self.applied)
            .finish()
    }
}

impl<T: Editable> Operation<T> for CompoundOperation<T> {
    fn do_it(&mut self, target: &mut T) -> OperationResult {
        let replay = self.sealed;
        let indices = if replay {
            let mut undone = std::mem::take(&mut self.undone);
            undone.sort_unstable();
            undone
        } else {
            self.sealed = true;
            (0..self.children.len()).collect()
        };
        let (succeeded, failed) = self.run(target, indices.clone(), true);
        if replay {
            self.undone = indices
                .into_iter()
                .filter(|index| !succeeded.contains(index))
                .collect();
        }
        self.applied.extend(succeeded.iter().copied());
        self.applied.sort_unstable();
        self.outcome(succeeded, failed)
    }

    fn undo_it(&mut self, target: &mut T) -> OperationResult {
        let indices: Vec<usize> = match self.undo_order {
            UndoOrder::Reverse => self.applied.iter().rev().copied().collect(),
            UndoOrder::Forward => self.applied.clone(),
        };
        let (succeeded, failed) = self.run(target, indices, false);
        self.applied.retain(|index| !succeeded.contains(index));
        self.undone.extend(succeeded.iter().copied());
        self.outcome(succeeded, failed)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rstest::rstest;

    use super::*;
    use crate::operation::FnOperation;

    #[derive(Default)]
    struct Journal {
        entries: Vec<String>,
        value: i32,
    }

    impl Editable for Journal {}

    fn logged(name: &'static str) -> Box<dyn Operation<Journal>> {
        Box::new(FnOperation::new(
            name,
            move |j: &mut Journal| {
                j.entries.push(format!("do {name}"));
                Ok(())
            },
            move |j: &mut Journal| {
                j.entries.push(format!("undo {name}"));
                Ok(())
            },
        ))
    }

    fn failing(name: &'static str) -> Box<dyn Operation<Journal>> {
        Box::new(FnOperation::new(
            name,
            move |_: &mut Journal| Err(OperationError::Custom(format!("{name} failed"))),
            move |_: &mut Journal| Err(OperationError::Custom(format!("{name} failed"))),
        ))
    }

    #[test]
    fn runs_in_insertion_order() {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch");
        compound.append(logged("a")).unwrap();
        compound.extend([logged("b"), logged("c")]).unwrap();
        compound.do_it(&mut journal).unwrap();
        assert_eq!(journal.entries, vec!["do a", "do b", "do c"]);
    }

    #[rstest]
    #[case(UndoOrder::Reverse, vec!["undo c", "undo b", "undo a"])]
    #[case(UndoOrder::Forward, vec!["undo a", "undo b", "undo c"])]
    fn undo_order(#[case] order: UndoOrder, #[case] expected: Vec<&str>) {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch").with_undo_order(order);
        compound
            .extend([logged("a"), logged("b"), logged("c")])
            .unwrap();
        compound.do_it(&mut journal).unwrap();
        journal.entries.clear();
        compound.undo_it(&mut journal).unwrap();
        assert_eq!(journal.entries, expected);
    }

    #[test]
    fn sealed_after_do() {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch");
        compound.append(logged("a")).unwrap();
        compound.do_it(&mut journal).unwrap();
        assert!(compound.is_sealed());
        assert!(matches!(
            compound.append(logged("b")),
            Err(OperationError::Sealed(_))
        ));
        assert!(matches!(
            compound.extend([logged("c")]),
            Err(OperationError::Sealed(_))
        ));
        assert_eq!(compound.len(), 1);
    }

    #[test]
    fn continue_policy_runs_remaining_children() {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch");
        compound
            .extend([logged("a"), failing("b"), logged("c")])
            .unwrap();
        let err = compound.do_it(&mut journal).unwrap_err();
        assert_eq!(journal.entries, vec!["do a", "do c"]);
        match err {
            OperationError::Partial {
                total,
                succeeded,
                failed,
            } => {
                assert_eq!(total, 3);
                assert_eq!(succeeded, vec![0, 2]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stop_policy_halts_at_first_failure() {
        let mut journal = Journal::default();
        let mut compound =
            CompoundOperation::new("batch").with_failure_policy(FailurePolicy::Stop);
        compound
            .extend([logged("a"), failing("b"), logged("c")])
            .unwrap();
        assert!(compound.do_it(&mut journal).is_err());
        assert_eq!(journal.entries, vec!["do a"]);
    }

    fn add(amount: i32) -> Box<dyn Operation<Journal>> {
        Box::new(FnOperation::new(
            format!("add {amount}"),
            move |j: &mut Journal| {
                j.value += amount;
                Ok(())
            },
            move |j: &mut Journal| {
                j.value -= amount;
                Ok(())
            },
        ))
    }

    #[rstest]
    #[case(UndoOrder::Reverse)]
    #[case(UndoOrder::Forward)]
    fn undo_after_stop_reverts_only_applied_children(#[case] order: UndoOrder) {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch")
            .with_failure_policy(FailurePolicy::Stop)
            .with_undo_order(order);
        compound.extend([add(1), failing("b"), add(10)]).unwrap();
        assert!(compound.do_it(&mut journal).is_err());
        assert_eq!(journal.value, 1);
        assert_eq!(compound.applied(), &[0]);

        compound.undo_it(&mut journal).unwrap();
        assert_eq!(journal.value, 0);
        assert!(compound.applied().is_empty());
    }

    #[test]
    fn undo_after_continue_skips_failed_child() {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch");
        compound
            .extend([logged("a"), failing("b"), logged("c")])
            .unwrap();
        assert!(compound.do_it(&mut journal).is_err());
        journal.entries.clear();
        compound.undo_it(&mut journal).unwrap();
        assert_eq!(journal.entries, vec!["undo c", "undo a"]);
    }

    #[test]
    fn redo_replays_only_children_that_ran() {
        let mut journal = Journal::default();
        let mut compound =
            CompoundOperation::new("batch").with_failure_policy(FailurePolicy::Stop);
        compound.extend([add(1), failing("b"), add(10)]).unwrap();
        assert!(compound.do_it(&mut journal).is_err());
        compound.undo_it(&mut journal).unwrap();
        compound.do_it(&mut journal).unwrap();
        assert_eq!(journal.value, 1);
        assert_eq!(compound.applied(), &[0]);
    }

    #[test]
    fn redo_does_not_reapply_children_still_applied() {
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("batch");
        compound.extend([add(1), add(10)]).unwrap();
        compound.do_it(&mut journal).unwrap();
        compound.undo_it(&mut journal).unwrap();
        compound.do_it(&mut journal).unwrap();
        assert_eq!(journal.value, 11);
        assert_eq!(compound.applied(), &[0, 1]);
    }

    #[test]
    fn nested_compounds() {
        let mut journal = Journal::default();
        let mut inner = CompoundOperation::new("inner");
        inner.extend([logged("b"), logged("c")]).unwrap();
        let mut outer = CompoundOperation::new("outer");
        outer
            .extend([logged("a"), Box::new(inner) as Box<dyn Operation<Journal>>])
            .unwrap();
        outer.do_it(&mut journal).unwrap();
        outer.undo_it(&mut journal).unwrap();
        assert_eq!(
            journal.entries,
            vec!["do a", "do b", "do c", "undo c", "undo b", "undo a"]
        );
    }

    #[test]
    fn reverse_undo_respects_dependencies() {
        // The second child reads state written by the first.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_undo = Arc::clone(&seen);
        let mut journal = Journal::default();
        let mut compound = CompoundOperation::new("create then connect");
        compound
            .append(Box::new(FnOperation::new(
                "create",
                |j: &mut Journal| {
                    j.value = 1;
                    Ok(())
                },
                |j: &mut Journal| {
                    j.value = 0;
                    Ok(())
                },
            )))
            .unwrap();
        compound
            .append(Box::new(FnOperation::new(
                "connect",
                |j: &mut Journal| {
                    if j.value == 0 {
                        return Err(OperationError::Custom("nothing to connect".into()));
                    }
                    Ok(())
                },
                move |j: &mut Journal| {
                    seen_undo.lock().push(j.value);
                    Ok(())
                },
            )))
            .unwrap();
        compound.do_it(&mut journal).unwrap();
        compound.undo_it(&mut journal).unwrap();
        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(journal.value, 0);
    }
}
