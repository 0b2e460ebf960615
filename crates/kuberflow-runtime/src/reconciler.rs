//! Periodic re-scan of the observed resource set, reinjecting reconcile
//! actions to heal drift between what the watch stream has reported and
//! what the cluster actually holds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::decoder::Decoder;
use crate::dispatcher::PipelineEvent;
use crate::resource::Resource;
use crate::transport::ListProvider;

/// A closable handle to a running reconciler ticker. Cancellation is only
/// observed at the next suspension point (the next tick or the next list
/// call), not pre-emptively.
#[derive(Clone)]
pub struct ReconcilerHandle {
    cancel: CancellationToken,
}

impl ReconcilerHandle {
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the reconciler task. Every `period`, lists the live resource set
/// via `list_provider` and reinjects a `ReconcileAction` for each resource
/// onto `events` — the same channel the `Watcher` feeds, so reconciles
/// interleave with live events in per-namespace FIFO order rather than
/// racing them.
pub fn spawn<R, L>(
    list_provider: Arc<L>,
    period: Duration,
    events: mpsc::Sender<PipelineEvent<R::Spec, R::Status>>,
) -> (ReconcilerHandle, JoinHandle<()>)
where
    R: Resource,
    L: ListProvider<R>,
{
    let cancel = CancellationToken::new();
    let handle = ReconcilerHandle { cancel: cancel.clone() };
    let join = tokio::spawn(run(list_provider, period, events, cancel));
    (handle, join)
}

async fn run<R, L>(list_provider: Arc<L>, period: Duration, events: mpsc::Sender<PipelineEvent<R::Spec, R::Status>>, cancel: CancellationToken)
where
    R: Resource,
    L: ListProvider<R>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("reconciler cancelled");
                return;
            }
            _ = ticker.tick() => {
                if !tick(&*list_provider, &events).await {
                    tracing::debug!("dispatcher side of the channel is gone, stopping reconciler");
                    return;
                }
            }
        }
    }
}

/// Run one reconcile tick. Returns `false` if the event channel's receiver
/// has gone away and the reconciler should stop.
async fn tick<R, L>(list_provider: &L, events: &mpsc::Sender<PipelineEvent<R::Spec, R::Status>>) -> bool
where
    R: Resource,
    L: ListProvider<R>,
{
    let items = match list_provider.list().await {
        Ok(items) => items,
        Err(error) => {
            // Logged and skipped; the next tick still fires on schedule.
            tracing::warn!(%error, "reconcile tick failed to list resources, skipping");
            return true;
        }
    };
    for item in items {
        match Decoder::decode_reconcile(&item) {
            Ok(resource) => {
                let namespace = resource.metadata.namespace_key().to_string();
                let action = kuberflow_types::ReconcileAction { resource };
                if events.send(PipelineEvent::action(namespace, action)).await.is_err() {
                    return false;
                }
            }
            Err(failure) => {
                tracing::error!(%failure, "dropping undecodable reconcile listing entry");
            }
        }
    }
    true
}
