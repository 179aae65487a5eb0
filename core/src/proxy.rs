//! Operations built from a function and pre-resolved arguments.

use std::fmt;

use crate::operation::{Editable, Operation, OperationResult};

/// Function invoked by a [`ProxyOperation`].
pub type ProxyFn<T, A, R> = Box<dyn Fn(&mut T, &A) -> OperationResult<R> + Send>;

/// Wraps a (do, undo) function pair with their argument bundles.
///
/// Both bundles are owned values captured at construction time. The undo
/// function defaults to the do function, so the common pattern is a single
/// setter called with the new value on `do_it` and the old value on
/// `undo_it`.
///
/// `do_it` keeps the function's result in [`last_result`](Self::last_result);
/// the result of `undo_it` is discarded.
pub struct ProxyOperation<T: Editable, A, R = ()> {
    description: String,
    do_fn: ProxyFn<T, A, R>,
    undo_fn: Option<ProxyFn<T, A, R>>,
    do_args: A,
    undo_args: A,
    last_result: Option<R>,
}

impl<T, A, R> ProxyOperation<T, A, R>
where
    T: Editable,
    A: fmt::Debug + Send + 'static,
    R: Send + 'static,
{
    pub fn new(
        description: impl Into<String>,
        do_fn: impl Fn(&mut T, &A) -> OperationResult<R> + Send + 'static,
        do_args: A,
        undo_args: A,
    ) -> Self {
        Self {
            description: description.into(),
            do_fn: Box::new(do_fn),
            undo_fn: None,
            do_args,
            undo_args,
            last_result: None,
        }
    }

    /// Uses a dedicated function for the undo direction.
    #[must_use]
    pub fn with_undo(
        mut self,
        undo_fn: impl Fn(&mut T, &A) -> OperationResult<R> + Send + 'static,
    ) -> Self {
        self.undo_fn = Some(Box::new(undo_fn));
        self
    }

    /// Reads the current value, then applies `new_value` through `write`.
    ///
    /// The read and the write happen under the same exclusive borrow of the
    /// target, so nothing can change the property in between. The returned
    /// operation has already run forward once; its undo writes the captured
    /// old value back.
    pub fn capture(
        target: &mut T,
        description: impl Into<String>,
        read: impl FnOnce(&T) -> OperationResult<A>,
        write: impl Fn(&mut T, &A) -> OperationResult<R> + Send + 'static,
        new_value: A,
    ) -> OperationResult<Self> {
        let old_value = read(target)?;
        let mut op = Self::new(description, write, new_value, old_value);
        op.apply(target)?;
        Ok(op)
    }

    /// Runs the do function and returns its result.
    pub fn apply(&mut self, target: &mut T) -> OperationResult<&R> {
        let result = (self.do_fn)(target, &self.do_args)?;
        Ok(self.last_result.insert(result))
    }

    /// Result of the most recent successful `do_it`.
    pub fn last_result(&self) -> Option<&R> {
        self.last_result.as_ref()
    }

    pub fn do_args(&self) -> &A {
        &self.do_args
    }

    pub fn undo_args(&self) -> &A {
        &self.undo_args
    }
}

impl<T: Editable, A: fmt::Debug, R> fmt::Debug for ProxyOperation<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyOperation")
            .field("description", &self.description)
            .field("do_args", &self.do_args)
            .field("undo_args", &self.undo_args)
            .field("custom_undo", &self.undo_fn.is_some())
            .finish()
    }
}

impl<T, A, R> Operation<T> for ProxyOperation<T, A, R>
where
    T: Editable,
    A: fmt::Debug + Send + 'static,
    R: Send + 'static,
{
    fn do_it(&mut self, target: &mut T) -> OperationResult {
        self.apply(target).map(|_| ())
    }

    fn undo_it(&mut self, target: &mut T) -> OperationResult {
        let undo_fn = self.undo_fn.as_ref().unwrap_or(&self.do_fn);
        undo_fn(target, &self.undo_args)?;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
