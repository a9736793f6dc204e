//! Relaying calls from the worker onto the owner thread.

use super::{Outcome, TaskId};

pub(super) type Callback<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Messages from the worker, drained by the owner's pump.
pub(super) enum OwnerMessage<S> {
    Started(TaskId),
    Invoke(TaskId, Callback<S>),
    /// Always the last message of a task.
    Finished(TaskId, Outcome),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalError {
    #[error("owner thread is no longer accepting callbacks")]
    OwnerGone,
}

/// Handed to a running task to run code on the owner thread, with access to the owner's state.
///
/// Every call blocks the task until the owner has run the callback, so callbacks
/// of one task are always observed in the order they were issued.
pub struct Marshal<S> {
    pub(super) task: TaskId,
    pub(super) owner: crossbeam::channel::Sender<OwnerMessage<S>>,
}
impl<S: 'static> Marshal<S> {
    /// Run `callback` on the owner thread, waiting for it to complete.
    /// # Errors
    /// If the owner side of the orchestrator has been dropped.
    pub fn invoke<F>(&self, callback: F) -> Result<(), MarshalError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.invoke_with(callback)
    }
    /// Run `callback` on the owner thread, waiting for and returning its result.
    /// # Errors
    /// If the owner side of the orchestrator has been dropped.
    pub fn invoke_with<F, R>(&self, callback: F) -> Result<R, MarshalError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = crossbeam::channel::bounded(1);
        let callback: Callback<S> = Box::new(move |owner| {
            // Task may have given up waiting, that's fine.
            let _ = reply.send(callback(owner));
        });
        self.owner
            .send(OwnerMessage::Invoke(self.task, callback))
            .map_err(|_| MarshalError::OwnerGone)?;
        // Disconnects if the owner drops the callback without running it.
        response.recv().map_err(|_| MarshalError::OwnerGone)
    }
}
