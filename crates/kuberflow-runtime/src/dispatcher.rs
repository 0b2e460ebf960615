//! Routes decoded pipeline events to the right per-namespace consumer,
//! creating consumers on demand.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use kuberflow_types::{DecodeFailure, OperatorAction};

use crate::consumer::ActionConsumer;
use crate::controller::Controller;
use crate::error::ExitCode;
use crate::queue::{self, NsQueue};
use crate::resource::Resource;
use crate::status::{self, StatusWriter};

/// A message handed from the `Dispatcher` into one namespace's `NsQueue`.
///
/// Non-fatal decode failures ride the same per-namespace queue as real
/// actions: the ordering guarantee that every status update produced for
/// action k is handed to the feedback writer before action k+1 is
/// dispatched only holds if a failure observed between two actions for
/// the same namespace is logged at the point it would have been dispatched,
/// not out of band.
#[derive(Debug)]
pub enum ConsumerMessage<T, U> {
    Action(OperatorAction<T, U>),
    Failure(DecodeFailure),
}

/// What the `Watcher`/`Reconciler` hand to the `Dispatcher` over the shared,
/// bounded(1) rendezvous channel.
#[derive(Debug)]
pub enum PipelineEvent<T, U> {
    /// A namespace-routable action, or a non-fatal per-item decode failure
    /// that still carries enough information (the source object's own
    /// namespace) to know which consumer it belongs to.
    Routed { namespace: String, message: ConsumerMessage<T, U> },
    /// The watch stream closed. Fatal; broadcast to every consumer.
    Closed(DecodeFailure),
}

impl<T, U> PipelineEvent<T, U> {
    pub fn action(namespace: impl Into<String>, action: impl Into<OperatorAction<T, U>>) -> Self {
        PipelineEvent::Routed {
            namespace: namespace.into(),
            message: ConsumerMessage::Action(action.into()),
        }
    }

    pub fn decode_failure(namespace: impl Into<String>, failure: DecodeFailure) -> Self {
        PipelineEvent::Routed {
            namespace: namespace.into(),
            message: ConsumerMessage::Failure(failure),
        }
    }

    pub fn closed(failure: DecodeFailure) -> Self {
        debug_assert!(failure.is_fatal(), "PipelineEvent::closed requires a ClosedStream failure");
        PipelineEvent::Closed(failure)
    }
}

struct ConsumerEntry<T, U> {
    queue: NsQueue<ConsumerMessage<T, U>>,
    join: JoinHandle<ExitCode>,
}

/// Owns the `namespace -> ActionConsumer` map exclusively.
///
/// Consumer creation is lazy and race-free: the map is guarded by a single
/// lock held across the lookup-or-insert, so at most one consumer per
/// namespace is ever spawned during a pipeline run.
pub struct Dispatcher<R, C, W>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    W: StatusWriter<R::Status>,
{
    controller: Arc<C>,
    status_writer: Arc<W>,
    queue_capacity: usize,
    consumers: Mutex<HashMap<String, ConsumerEntry<R::Spec, R::Status>>>,
    exit_tx: mpsc::Sender<ExitCode>,
}

impl<R, C, W> Dispatcher<R, C, W>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    W: StatusWriter<R::Status>,
{
    /// Build an (initially empty) dispatcher, and the receiver half the
    /// `Supervisor` awaits for the first consumer exit, so it can race that
    /// signal against the reconciler's own exit.
    pub fn new(controller: Arc<C>, status_writer: Arc<W>, queue_capacity: usize) -> (Self, mpsc::Receiver<ExitCode>) {
        let (exit_tx, exit_rx) = mpsc::channel(queue_capacity.max(1));
        (
            Self {
                controller,
                status_writer,
                queue_capacity,
                consumers: Mutex::new(HashMap::new()),
                exit_tx,
            },
            exit_rx,
        )
    }

    /// Route one pipeline event to its namespace's consumer, creating the
    /// consumer if this is the first event seen for that namespace.
    ///
    /// Suspends if the target namespace's queue is already at capacity.
    pub async fn dispatch(&self, event: PipelineEvent<R::Spec, R::Status>) {
        match event {
            PipelineEvent::Closed(failure) => self.broadcast_closed(failure).await,
            PipelineEvent::Routed { namespace, message } => {
                let queue = self.queue_for(namespace);
                queue.enqueue(message).await;
            }
        }
    }

    /// Number of namespaces a consumer currently exists for. Exposed for
    /// tests and diagnostics, not part of the dispatch contract.
    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().len()
    }

    fn queue_for(&self, namespace: String) -> NsQueue<ConsumerMessage<R::Spec, R::Status>> {
        let mut consumers = self.consumers.lock();
        if let Some(entry) = consumers.get(&namespace) {
            return entry.queue.clone();
        }
        tracing::info!(namespace = %namespace, "spawning action consumer for new namespace");
        let (queue, queue_consumer) = queue::channel(namespace.clone(), self.queue_capacity);
        let (feedback, feedback_join) = status::spawn(namespace.clone(), self.queue_capacity, self.status_writer.clone());
        let consumer = ActionConsumer::new(namespace.clone(), self.controller.clone(), queue_consumer, feedback, feedback_join);
        let exit_tx = self.exit_tx.clone();
        let join = tokio::spawn(async move {
            let exit = consumer.consume().await;
            let _ = exit_tx.send(exit).await;
            exit
        });
        consumers.insert(namespace, ConsumerEntry { queue: queue.clone(), join });
        queue
    }

    async fn broadcast_closed(&self, failure: DecodeFailure) {
        let queues: Vec<_> = {
            let consumers = self.consumers.lock();
            consumers.values().map(|entry| entry.queue.clone()).collect()
        };
        if queues.is_empty() {
            tracing::warn!("watch stream closed before any namespace was observed");
        }
        for queue in queues {
            queue.enqueue(ConsumerMessage::Failure(clone_closed(&failure))).await;
        }
    }

    /// Await every spawned consumer's exit, for orderly shutdown once the
    /// pipeline run is winding down.
    pub async fn join_all(self) {
        let joins: Vec<_> = self.consumers.into_inner().into_values().map(|entry| entry.join).collect();
        for join in joins {
            let _ = join.await;
        }
    }
}

fn clone_closed(failure: &DecodeFailure) -> DecodeFailure {
    match failure {
        DecodeFailure::ClosedStream { cause } => DecodeFailure::ClosedStream { cause: cause.clone() },
        other => DecodeFailure::ClosedStream { cause: Some(other.to_string()) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuberflow_types::{ServerAction, WatchVerb};
    use std::time::Duration;

    use crate::testing::{widget, RecordingController, RecordingWriter};

    fn new_dispatcher() -> (Dispatcher<crate::testing::Widget, RecordingController, RecordingWriter<crate::testing::WidgetStatus>>, Arc<RecordingController>, RecordingWriter<crate::testing::WidgetStatus>) {
        let controller = Arc::new(RecordingController::default());
        let writer = RecordingWriter::default();
        let (dispatcher, _exit_rx) = Dispatcher::new(controller.clone(), Arc::new(writer.clone()), 8);
        (dispatcher, controller, writer)
    }

    #[tokio::test]
    async fn creates_one_consumer_per_namespace() {
        let (dispatcher, controller, writer) = new_dispatcher();
        let r1 = widget("a", "n1", "u1", "1", 1);
        let r2 = widget("b", "n2", "u2", "1", 1);

        dispatcher
            .dispatch(PipelineEvent::action("n1", ServerAction::new(WatchVerb::Added, r1)))
            .await;
        dispatcher
            .dispatch(PipelineEvent::action("n2", ServerAction::new(WatchVerb::Added, r2)))
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dispatcher.consumer_count(), 2);

        let calls = controller.calls.lock();
        assert_eq!(calls.len(), 2);
        drop(calls);
        drop(writer);
    }

    #[tokio::test]
    async fn closed_stream_is_broadcast_to_every_namespace() {
        let (dispatcher, _controller, _writer) = new_dispatcher();
        let r1 = widget("a", "n1", "u1", "1", 1);
        dispatcher
            .dispatch(PipelineEvent::action("n1", ServerAction::new(WatchVerb::Added, r1)))
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        dispatcher.dispatch(PipelineEvent::closed(DecodeFailure::ClosedStream { cause: None })).await;
        dispatcher.join_all().await;
    }
}
