//! Subscribes to the cluster's watch endpoint for the configured kind and
//! feeds decoded events to the `Dispatcher`.
//!
//! The event-processing core operates over any `Stream<Item =
//! Result<watcher::Event<R>, watcher::Error>>`, not directly over
//! `kube::Api` — [`spawn`] builds the real stream from `kube::runtime`'s
//! own retrying `watcher()`, but unit tests drive [`spawn_with_stream`]
//! with a `futures::stream::iter` fixture instead, the same way
//! `kube-runtime`'s own watcher tests avoid a live apiserver.

use std::collections::HashSet;

use futures::{Stream, StreamExt};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Resource as KubeResource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use kuberflow_types::{namespace_key, DecodeFailure, WatchVerb};

use crate::decoder::Decoder;
use crate::dispatcher::PipelineEvent;
use crate::resource::Resource;

/// A closable handle to a running watch subscription. Dropping the
/// pipeline also stops the watcher, but `close` lets the `Supervisor`
/// terminate it promptly without waiting for that.
#[derive(Clone)]
pub struct WatchHandle {
    cancel: CancellationToken,
}

impl WatchHandle {
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// Subscribe to `api` and feed decoded events to `events` until closed.
///
/// Relies on `kube::runtime::watcher`'s own transparent retry for
/// transient, retryable failures (410 Gone desyncs, connection resets) —
/// that recovery is `kube`'s responsibility, not this framework's. Only a
/// genuinely terminal closure of the (already-retrying) stream becomes
/// this framework's `ClosedStream`.
pub fn spawn<R: Resource>(
    api: Api<R>,
    config: watcher::Config,
    events: mpsc::Sender<PipelineEvent<R::Spec, R::Status>>,
) -> (WatchHandle, JoinHandle<()>) {
    let stream = watcher::watcher(api, config).default_backoff();
    spawn_with_stream(stream, events)
}

/// Drive the watch loop over an already-built event stream. The real entry
/// point used in production is [`spawn`]; tests call this directly with a
/// `futures::stream::iter` fixture.
pub fn spawn_with_stream<R, S>(stream: S, events: mpsc::Sender<PipelineEvent<R::Spec, R::Status>>) -> (WatchHandle, JoinHandle<()>)
where
    R: Resource,
    S: Stream<Item = watcher::Result<Event<R>>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let handle = WatchHandle { cancel: cancel.clone() };
    let join = tokio::spawn(run(stream, events, cancel));
    (handle, join)
}

async fn run<R, S>(stream: S, events: mpsc::Sender<PipelineEvent<R::Spec, R::Status>>, cancel: CancellationToken)
where
    R: Resource,
    S: Stream<Item = watcher::Result<Event<R>>> + Send + 'static,
{
    let mut known_uids: HashSet<String> = HashSet::new();
    tokio::pin!(stream);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = stream.next() => item,
        };
        match next {
            None if cancel.is_cancelled() => {
                tracing::info!("watch handle closed, stopping");
                let _ = events.send(PipelineEvent::closed(DecodeFailure::ClosedStream { cause: None })).await;
                return;
            }
            None => {
                tracing::warn!("watch stream ended unexpectedly");
                let _ = events
                    .send(PipelineEvent::closed(DecodeFailure::ClosedStream {
                        cause: Some("watch stream ended".to_string()),
                    }))
                    .await;
                return;
            }
            Some(Err(error)) => {
                // kube's watcher() already retries transient failures internally;
                // this is informational, not a pipeline-level failure.
                tracing::warn!(%error, "transient watch error, letting kube retry");
            }
            Some(Ok(event)) => {
                if !forward_event(event, &mut known_uids, &events).await {
                    tracing::debug!("dispatcher side of the channel is gone, stopping watcher");
                    return;
                }
            }
        }
    }
}

/// Returns `false` if the channel's receiver has gone away and the watcher
/// should stop.
async fn forward_event<R: Resource>(
    event: Event<R>,
    known_uids: &mut HashSet<String>,
    events: &mpsc::Sender<PipelineEvent<R::Spec, R::Status>>,
) -> bool {
    match event {
        // A relist snapshot after desync recovery. Each item is treated as
        // Added or Modified depending on whether we've already seen its
        // uid; per kube's own documented caveat, objects that vanished
        // between snapshots do not get a synthetic Deleted (watch-based
        // delete tracking is inherently best-effort).
        Event::Restarted(items) => {
            for item in items {
                if !forward_applied(item, known_uids, events).await {
                    return false;
                }
            }
            true
        }
        Event::Applied(item) => forward_applied(item, known_uids, events).await,
        Event::Deleted(item) => {
            let namespace = namespace_of(&item);
            match Decoder::decode_server(WatchVerb::Deleted, &item) {
                Ok(action) => {
                    if let Some(resource) = &action.resource {
                        known_uids.remove(&resource.metadata.uid);
                    }
                    events.send(PipelineEvent::action(namespace, action)).await.is_ok()
                }
                Err(failure) => events.send(PipelineEvent::decode_failure(namespace, failure)).await.is_ok(),
            }
        }
    }
}

async fn forward_applied<R: Resource>(
    item: R,
    known_uids: &mut HashSet<String>,
    events: &mpsc::Sender<PipelineEvent<R::Spec, R::Status>>,
) -> bool {
    let namespace = namespace_of(&item);
    let uid = item.meta().uid.clone();
    let verb = match &uid {
        Some(uid) if known_uids.contains(uid) => WatchVerb::Modified,
        _ => WatchVerb::Added,
    };
    match Decoder::decode_server(verb, &item) {
        Ok(action) => {
            if let Some(uid) = uid {
                known_uids.insert(uid);
            }
            events.send(PipelineEvent::action(namespace, action)).await.is_ok()
        }
        Err(failure) => events.send(PipelineEvent::decode_failure(namespace, failure)).await.is_ok(),
    }
}

fn namespace_of<R: KubeResource>(item: &R) -> String {
    namespace_key(item.meta().namespace.as_deref()).to_string()
}
