//! Drives one namespace's controller callbacks, in FIFO arrival order, and
//! hands any returned status to that namespace's `StatusFeedback` writer.

use std::sync::Arc;

use tokio::task::JoinHandle;

use kuberflow_types::{CustomResource, Metadata, OperatorAction, ReconcileAction, ServerAction, StatusUpdate, WatchVerb};

use crate::controller::Controller;
use crate::dispatcher::ConsumerMessage;
use crate::error::ExitCode;
use crate::queue::NsQueueConsumer;
use crate::status::StatusFeedback;

/// Owns its `NsQueue` consumer half and its `StatusFeedback` writer
/// exclusively — nothing else ever dequeues from this namespace's queue
/// or submits to this namespace's writer.
pub struct ActionConsumer<T, U, C: Controller<T, U>> {
    namespace: String,
    controller: Arc<C>,
    queue: NsQueueConsumer<ConsumerMessage<T, U>>,
    feedback: StatusFeedback<U>,
    feedback_join: JoinHandle<()>,
}

impl<T, U, C> ActionConsumer<T, U, C>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    C: Controller<T, U>,
{
    pub fn new(
        namespace: String,
        controller: Arc<C>,
        queue: NsQueueConsumer<ConsumerMessage<T, U>>,
        feedback: StatusFeedback<U>,
        feedback_join: JoinHandle<()>,
    ) -> Self {
        Self {
            namespace,
            controller,
            queue,
            feedback,
            feedback_join,
        }
    }

    /// The consumer's run loop. Terminates only on a fatal `ClosedStream`
    /// failure, or once the dispatcher has dropped every `NsQueue` sender
    /// (pipeline teardown) — both report `ExitCode::ConsumerExit`, since a
    /// graceful watch close is not itself an error.
    pub async fn consume(mut self) -> ExitCode {
        loop {
            let message = match self.queue.dequeue().await {
                Some(message) => message,
                None => {
                    tracing::debug!(namespace = %self.namespace, "action queue closed, exiting");
                    break;
                }
            };
            match message {
                ConsumerMessage::Action(action) => self.dispatch_action(action).await,
                ConsumerMessage::Failure(failure) if failure.is_fatal() => {
                    tracing::info!(namespace = %self.namespace, %failure, "watch stream closed, draining and exiting");
                    self.feedback.stop().await;
                    break;
                }
                ConsumerMessage::Failure(failure) => {
                    tracing::error!(namespace = %self.namespace, %failure, "dropping undecodable event");
                }
            }
        }
        let _ = self.feedback_join.await;
        ExitCode::ConsumerExit
    }

    async fn dispatch_action(&self, action: OperatorAction<T, U>) {
        match action {
            OperatorAction::Server(ServerAction { verb, resource }) => self.dispatch_server(verb, resource).await,
            OperatorAction::Reconcile(ReconcileAction { resource }) => {
                let metadata = resource.metadata.clone();
                let result = self.controller.reconcile(&resource).await;
                self.report("reconcile", &metadata, result).await;
            }
        }
    }

    async fn dispatch_server(&self, verb: WatchVerb, resource: Option<CustomResource<T, U>>) {
        match verb {
            WatchVerb::Added => {
                if let Some(resource) = resource {
                    let metadata = resource.metadata.clone();
                    let result = self.controller.on_add(&resource).await;
                    self.report("add", &metadata, result).await;
                }
            }
            WatchVerb::Modified => {
                if let Some(resource) = resource {
                    let metadata = resource.metadata.clone();
                    let result = self.controller.on_modify(&resource).await;
                    self.report("modify", &metadata, result).await;
                }
            }
            WatchVerb::Deleted => {
                if let Some(resource) = resource {
                    // Status is discarded: the resource is gone.
                    if let Err(error) = self.controller.on_delete(&resource).await {
                        tracing::error!(namespace = %self.namespace, uid = %resource.metadata.uid, %error, "on_delete callback failed");
                    }
                }
            }
            WatchVerb::Error => {
                tracing::warn!(namespace = %self.namespace, "watch reported an Error event; no controller callback invoked");
            }
        }
    }

    /// Shared handling for the three callbacks that can return a status:
    /// log a failing callback and move on, never let it take down the
    /// consumer; hand any returned status to the feedback writer before
    /// returning, preserving the per-action ordering guarantee.
    async fn report(&self, callback: &str, metadata: &Metadata, result: Result<Option<U>, C::Error>) {
        match result {
            Ok(Some(status)) => self.feedback.submit(StatusUpdate::new(metadata.clone(), status)).await,
            Ok(None) => {}
            Err(error) => {
                tracing::error!(namespace = %self.namespace, uid = %metadata.uid, callback, %error, "controller callback failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::queue;
    use crate::status;
    use crate::testing::{widget, RecordingController, RecordingWriter};

    fn consumer(
        controller: Arc<RecordingController>,
        writer: RecordingWriter<crate::testing::WidgetStatus>,
    ) -> (
        ActionConsumer<crate::testing::WidgetSpec, crate::testing::WidgetStatus, RecordingController>,
        crate::queue::NsQueue<ConsumerMessage<crate::testing::WidgetSpec, crate::testing::WidgetStatus>>,
    ) {
        let (queue, queue_consumer) = queue::channel::<ConsumerMessage<_, _>>("default", 8);
        let (feedback, feedback_join) = status::spawn("default".to_string(), 8, writer);
        let consumer = ActionConsumer::new("default".to_string(), controller, queue_consumer, feedback, feedback_join);
        (consumer, queue)
    }

    #[tokio::test]
    async fn s1_create_then_modify_emits_statuses_in_order() {
        let controller = Arc::new(RecordingController::default());
        let writer = RecordingWriter::default();
        let (consumer, queue) = consumer(controller, writer.clone());

        let r1 = widget("w", "default", "u1", "1", 1);
        let r2 = widget("w", "default", "u1", "2", 1);
        queue
            .enqueue(ConsumerMessage::Action(
                ServerAction::new(WatchVerb::Added, r1).into(),
            ))
            .await;
        queue
            .enqueue(ConsumerMessage::Action(
                ServerAction::new(WatchVerb::Modified, r2).into(),
            ))
            .await;
        queue
            .enqueue(ConsumerMessage::Failure(kuberflow_types::DecodeFailure::ClosedStream { cause: None }))
            .await;

        let exit = consumer.consume().await;
        assert_eq!(exit, ExitCode::ConsumerExit);

        let updates = writer.updates.lock();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].new_status.phase, "ready");
        assert_eq!(updates[1].new_status.phase, "updated");
    }

    #[tokio::test]
    async fn watch_error_event_invokes_no_callback_and_does_not_stop_the_consumer() {
        let controller = Arc::new(RecordingController::default());
        let writer = RecordingWriter::default();
        let (consumer, queue) = consumer(controller.clone(), writer.clone());

        queue
            .enqueue(ConsumerMessage::Action(ServerAction::error().into()))
            .await;
        let r1 = widget("w", "default", "u1", "1", 1);
        queue
            .enqueue(ConsumerMessage::Action(ServerAction::new(WatchVerb::Added, r1).into()))
            .await;
        queue
            .enqueue(ConsumerMessage::Failure(kuberflow_types::DecodeFailure::ClosedStream { cause: None }))
            .await;

        let exit = consumer.consume().await;
        assert_eq!(exit, ExitCode::ConsumerExit);

        // The Error event produced no status and no controller call; the
        // following Added event still dispatched normally.
        assert_eq!(controller.calls.lock().len(), 1);
        assert_eq!(writer.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn s2_delete_emits_no_status() {
        let controller = Arc::new(RecordingController::default());
        let writer = RecordingWriter::default();
        let (consumer, queue) = consumer(controller.clone(), writer.clone());

        let r1 = widget("w", "default", "u1", "1", 1);
        queue
            .enqueue(ConsumerMessage::Action(
                ServerAction::new(WatchVerb::Deleted, r1).into(),
            ))
            .await;
        queue
            .enqueue(ConsumerMessage::Failure(kuberflow_types::DecodeFailure::ClosedStream { cause: None }))
            .await;
        consumer.consume().await;

        assert!(writer.updates.lock().is_empty());
        assert_eq!(controller.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn s4_controller_throw_does_not_stop_the_next_dispatch() {
        let controller = Arc::new(RecordingController::default());
        controller.fail_add_once.store(true, Ordering::SeqCst);
        let writer = RecordingWriter::default();
        let (consumer, queue) = consumer(controller.clone(), writer.clone());

        let r1 = widget("w", "default", "u1", "1", 1);
        let r2 = widget("w", "default", "u1", "2", 1);
        queue
            .enqueue(ConsumerMessage::Action(ServerAction::new(WatchVerb::Added, r1).into()))
            .await;
        queue
            .enqueue(ConsumerMessage::Action(ServerAction::new(WatchVerb::Modified, r2).into()))
            .await;
        queue
            .enqueue(ConsumerMessage::Failure(kuberflow_types::DecodeFailure::ClosedStream { cause: None }))
            .await;
        consumer.consume().await;

        // The failing add produced no status; the following modify still ran.
        let updates = writer.updates.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].new_status.phase, "updated");
        assert_eq!(controller.calls.lock().len(), 2);
    }
}
