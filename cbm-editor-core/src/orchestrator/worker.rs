use super::{
    marshal::{Marshal, OwnerMessage},
    Outcome, TaskId,
};

pub(super) type Work<S> = Box<dyn FnOnce(&Marshal<S>) -> anyhow::Result<()> + Send>;

pub(super) struct Job<S> {
    pub id: TaskId,
    pub work: Work<S>,
}

/// Worker loop. Runs jobs one at a time until the orchestrator hangs up.
pub(super) fn run<S: 'static>(
    jobs: crossbeam::channel::Receiver<Job<S>>,
    owner: crossbeam::channel::Sender<OwnerMessage<S>>,
) {
    for Job { id, work } in jobs {
        if owner.send(OwnerMessage::Started(id)).is_err() {
            break;
        }
        let marshal = Marshal {
            task: id,
            owner: owner.clone(),
        };
        // Task code is arbitrary, a panic must still end in a `Finished`.
        let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| work(&marshal)))
        {
            Ok(Ok(())) => Outcome::Succeeded,
            Ok(Err(error)) => Outcome::Failed {
                message: format!("{error:#}"),
            },
            Err(payload) => Outcome::Failed {
                message: format!("task panicked: {}", panic_message(payload.as_ref())),
            },
        };
        log::debug!("{id} finished: {outcome:?}");
        if owner.send(OwnerMessage::Finished(id, outcome)).is_err() {
            break;
        }
    }
    log::debug!("orchestrator worker exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}
