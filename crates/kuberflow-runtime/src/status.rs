//! Serialized writer of controller-produced status updates back to the
//! cluster, owned exclusively by one `ActionConsumer`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use kuberflow_types::StatusUpdate;

use crate::error::TransportError;

/// Writes a single [`StatusUpdate`] to the cluster. Implemented by
/// `transport::KubeStatusWriter` for real use, and by a fake in tests.
#[async_trait]
pub trait StatusWriter<U>: Send + Sync + 'static {
    async fn write(&self, update: &StatusUpdate<U>) -> Result<(), TransportError>;
}

#[async_trait]
impl<U, S> StatusWriter<U> for Arc<S>
where
    U: Send + Sync + 'static,
    S: StatusWriter<U> + ?Sized,
{
    async fn write(&self, update: &StatusUpdate<U>) -> Result<(), TransportError> {
        (**self).write(update).await
    }
}

enum Message<U> {
    Update(StatusUpdate<U>),
    Terminate,
}

/// Handle to a namespace's status feedback writer task.
///
/// Submissions are fire-and-forward: `submit` hands the update to the
/// writer task and returns without waiting for the cluster to acknowledge
/// it.
#[derive(Clone)]
pub struct StatusFeedback<U> {
    sender: mpsc::Sender<Message<U>>,
}

impl<U: Send + 'static> StatusFeedback<U> {
    /// Hand a status update to the writer task. Never blocks on the network.
    pub async fn submit(&self, update: StatusUpdate<U>) {
        if self.sender.send(Message::Update(update)).await.is_err() {
            tracing::debug!("status feedback writer has already stopped");
        }
    }

    /// Signal the writer task to stop after any updates already queued. Called
    /// when the owning consumer observes a `ClosedStream` failure.
    pub async fn stop(&self) {
        let _ = self.sender.send(Message::Terminate).await;
    }
}

/// Spawn the writer task for one namespace and return the handle to submit
/// updates on, plus a join handle the caller can await during shutdown.
pub fn spawn<U, W>(namespace: String, capacity: usize, writer: W) -> (StatusFeedback<U>, JoinHandle<()>)
where
    U: Send + 'static,
    W: StatusWriter<U>,
{
    let (sender, mut receiver) = mpsc::channel(capacity);
    let handle = tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            match message {
                Message::Update(update) => {
                    let uid = update.metadata.uid.clone();
                    if let Err(error) = writer.write(&update).await {
                        tracing::warn!(namespace = %namespace, uid = %uid, %error, "status write failed, dropping update");
                    }
                }
                Message::Terminate => break,
            }
        }
    });
    (StatusFeedback { sender }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingWriter;
    use kuberflow_types::Metadata;

    #[tokio::test]
    async fn updates_are_written_in_submission_order() {
        let writer = RecordingWriter::<String>::default();
        let (feedback, handle) = spawn("default".into(), 8, writer.clone());

        feedback
            .submit(StatusUpdate::new(Metadata { uid: "u1".into(), ..Default::default() }, "ready".into()))
            .await;
        feedback
            .submit(StatusUpdate::new(Metadata { uid: "u1".into(), ..Default::default() }, "updated".into()))
            .await;
        feedback.stop().await;
        handle.await.unwrap();

        let updates = writer.updates.lock();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].new_status, "ready");
        assert_eq!(updates[1].new_status, "updated");
    }
}
