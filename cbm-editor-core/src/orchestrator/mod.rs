//! # Task orchestration
//!
//! Long-running editor operations (file IO, decoding, palette edits over a whole document) run on a
//! background worker so the owner thread stays responsive. The owner thread exclusively owns all
//! observable state: tasks never touch it directly, they ask the owner to run a callback
//! through their [`Marshal`], and the owner runs those callbacks as it [pumps](Orchestrator::pump).
//!
//! Per submission the owner sees: the busy flag set (synchronously, in [`Orchestrator::submit`]),
//! [`Owner::busy_changed`]`(true)`, the task's callbacks in issue order, at most one
//! [`Owner::report_error`], and finally the busy flag cleared with [`Owner::busy_changed`]`(false)`.
//!
//! One worker thread serves an orchestrator, running tasks one after another.

mod marshal;
mod worker;

pub use marshal::{Marshal, MarshalError};

use marshal::OwnerMessage;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// The owner thread's state, as seen by the orchestrator.
pub trait Owner: 'static {
    /// A task failed. `context` names what failed, for display alongside `message`.
    fn report_error(&mut self, message: &str, context: &str);
    fn busy_changed(&mut self, _busy: bool) {}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);
impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task#{}", self.0)
    }
}
impl std::fmt::Debug for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed { message: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    /// Submitted and not yet finished. With [`SubmitPolicy::Queue`], the oldest such task.
    Running(TaskId),
}

/// What to do with a submission while another task is still in flight.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SubmitPolicy {
    /// Refuse it with [`SubmitError::Busy`].
    #[default]
    Reject,
    /// Run it after every earlier submission has finished.
    ///
    /// Busy notifications cover the whole queue: `busy_changed(true)` when the first task starts,
    /// `busy_changed(false)` once the queue has drained, not once per task.
    Queue,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a task is already running")]
    Busy,
    #[error("orchestrator worker is not running")]
    WorkerGone,
}

/// Process-visible "a task is in flight" indicator. Cheap to clone and read from any thread,
/// only ever written by the owner thread.
#[derive(Clone, Default, Debug)]
pub struct BusyFlag(Arc<AtomicBool>);
impl BusyFlag {
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
    fn set(&self, busy: bool) {
        self.0.store(busy, Ordering::Release);
    }
}

pub struct Orchestrator<S> {
    /// Context attached to every error report.
    title: String,
    policy: SubmitPolicy,
    jobs: crossbeam::channel::Sender<worker::Job<S>>,
    messages: crossbeam::channel::Receiver<OwnerMessage<S>>,
    busy: BusyFlag,
    /// Last value handed to `Owner::busy_changed`.
    owner_busy: bool,
    next_id: u64,
    /// Submitted but unfinished, oldest first.
    pending: std::collections::VecDeque<TaskId>,
    last_outcome: Option<(TaskId, Outcome)>,
}
impl<S: Owner> Orchestrator<S> {
    /// Create an orchestrator and its worker thread.
    /// # Errors
    /// If the worker thread could not be spawned.
    pub fn new(title: impl Into<String>, policy: SubmitPolicy) -> std::io::Result<Self> {
        let (jobs, job_receiver) = crossbeam::channel::unbounded();
        let (message_sender, messages) = crossbeam::channel::unbounded();
        std::thread::Builder::new()
            .name("Orchestrator worker".to_owned())
            .spawn(move || worker::run(job_receiver, message_sender))?;

        Ok(Self {
            title: title.into(),
            policy,
            jobs,
            messages,
            busy: BusyFlag::default(),
            owner_busy: false,
            next_id: 1,
            pending: std::collections::VecDeque::new(),
            last_outcome: None,
        })
    }
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }
    /// A handle to the busy flag, readable from other threads.
    #[must_use]
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }
    /// Whether [`Self::submit`] would currently accept a task.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.policy == SubmitPolicy::Queue || self.pending.is_empty()
    }
    /// Number of submitted tasks which have not finished yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.pending
            .front()
            .map_or(TaskState::Idle, |&id| TaskState::Running(id))
    }
    /// Outcome of the most recently finished task.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&(TaskId, Outcome)> {
        self.last_outcome.as_ref()
    }
    /// Run `work` on the worker. Returns immediately, the busy flag is set before returning.
    ///
    /// An `Err` returned from `work`, or a panic within it, is reported through
    /// [`Owner::report_error`] and otherwise swallowed.
    /// # Errors
    /// [`SubmitError::Busy`] if a task is in flight under [`SubmitPolicy::Reject`].
    pub fn submit<F>(&mut self, work: F) -> Result<TaskId, SubmitError>
    where
        F: FnOnce(&Marshal<S>) -> anyhow::Result<()> + Send + 'static,
    {
        if !self.can_submit() {
            log::debug!("Rejected submission, {:?} in flight", self.state());
            return Err(SubmitError::Busy);
        }
        let id = TaskId(self.next_id);
        self.next_id += 1;

        self.busy.set(true);
        let job = worker::Job {
            id,
            work: Box::new(work),
        };
        if self.jobs.send(job).is_err() {
            self.busy.set(!self.pending.is_empty());
            log::error!("Orchestrator worker is gone, {id} dropped");
            return Err(SubmitError::WorkerGone);
        }
        self.pending.push_back(id);
        log::debug!("Submitted {id}");
        Ok(id)
    }
    /// Run every callback and notification currently waiting, without blocking.
    /// Returns how many messages were handled.
    pub fn pump(&mut self, owner: &mut S) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.messages.try_recv() {
            self.handle(owner, message);
            handled += 1;
        }
        handled
    }
    /// Pump, blocking, until every submitted task has finished.
    pub fn run_until_idle(&mut self, owner: &mut S) {
        while !self.pending.is_empty() {
            match self.messages.recv() {
                Ok(message) => self.handle(owner, message),
                Err(_) => self.abandon(owner),
            }
        }
    }
    /// Like [`Self::run_until_idle`], giving up after `timeout`. Returns true if idle.
    pub fn run_until_idle_timeout(&mut self, owner: &mut S, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.messages.recv_timeout(remaining) {
                Ok(message) => self.handle(owner, message),
                Err(crossbeam::channel::RecvTimeoutError::Timeout) => return false,
                Err(crossbeam::channel::RecvTimeoutError::Disconnected) => self.abandon(owner),
            }
        }
        true
    }
    fn handle(&mut self, owner: &mut S, message: OwnerMessage<S>) {
        match message {
            OwnerMessage::Started(id) => {
                log::trace!("{id} started");
                if !self.owner_busy {
                    self.owner_busy = true;
                    owner.busy_changed(true);
                }
            }
            OwnerMessage::Invoke(id, callback) => {
                log::trace!("Running callback from {id}");
                callback(owner);
            }
            OwnerMessage::Finished(id, outcome) => {
                if self.pending.front() == Some(&id) {
                    self.pending.pop_front();
                } else {
                    self.pending.retain(|&pending| pending != id);
                }
                if let Outcome::Failed { message } = &outcome {
                    log::warn!("{id} failed: {message}");
                    owner.report_error(message, &self.title);
                }
                self.last_outcome = Some((id, outcome));
                if self.pending.is_empty() {
                    self.set_idle(owner);
                }
            }
        }
    }
    /// The worker hung up - nothing pending can finish anymore.
    fn abandon(&mut self, owner: &mut S) {
        log::error!(
            "Orchestrator worker disconnected with {} task(s) pending",
            self.pending.len()
        );
        self.pending.clear();
        self.set_idle(owner);
    }
    fn set_idle(&mut self, owner: &mut S) {
        self.busy.set(false);
        if self.owner_busy {
            self.owner_busy = false;
            owner.busy_changed(false);
        }
    }
}
