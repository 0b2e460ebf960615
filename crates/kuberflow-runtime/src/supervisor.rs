//! Top-level pipeline lifecycle: builds one run of watcher + dispatcher +
//! reconciler, races their exit signals, and tears the run down; `with_restart`
//! wraps that in the restart/backoff loop driven by a [`RetryPolicy`].

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use kube::runtime::watcher;
use kube::runtime::WatchStreamExt;
use kube::Client;
use tokio::sync::mpsc;

use kuberflow_types::RetryPolicy;

use crate::config::OperatorConfig;
use crate::controller::Controller;
use crate::dispatcher::Dispatcher;
use crate::error::ExitCode;
use crate::reconciler;
use crate::resource::Resource;
use crate::status::StatusWriter;
use crate::transport::{self, KubeListProvider, KubeStatusWriter, ListProvider};
use crate::watcher as pipeline_watcher;

/// A boxed watch event stream, built fresh for every pipeline attempt.
///
/// Boxing is the only type erasure `Pipeline` needs: unlike the list/status
/// collaborators (plain generic parameters, as elsewhere in this crate), the
/// concrete stream type produced by `kube::runtime::watcher()` +
/// `.default_backoff()` and the one produced by a test's `stream::iter`
/// fixture are unrelated types, so this is the one seam that has to be a
/// trait object.
pub type WatchStream<R> = Pin<Box<dyn Stream<Item = watcher::Result<watcher::Event<R>>> + Send>>;
type WatchStreamFactory<R> = Box<dyn Fn() -> WatchStream<R> + Send + Sync>;

/// Everything one pipeline run needs beyond the validated [`OperatorConfig`]:
/// the watch stream, list/status collaborators, and the user's controller.
///
/// Generic over `L`/`W` the same way `Dispatcher`/`reconciler::spawn` are —
/// [`Pipeline::for_cluster`] instantiates them with the real `kube`-backed
/// `KubeListProvider`/`KubeStatusWriter`, built from `config.namespace_scope()`
/// so the configured scope actually selects `Api::all`/`Api::namespaced`/
/// `Api::default_namespaced`; [`Pipeline::new`] accepts any collaborators
/// directly, the same seam `watcher::spawn_with_stream` gives the `Watcher`
/// itself, so `Supervisor::run`/`with_restart` can be driven end to end in
/// tests without a live cluster.
pub struct Pipeline<R, C, L, W>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    L: ListProvider<R>,
    W: StatusWriter<R::Status>,
{
    pub config: OperatorConfig,
    pub controller: Arc<C>,
    watch_stream: WatchStreamFactory<R>,
    list_provider: Arc<L>,
    status_writer: Arc<W>,
}

impl<R, C, L, W> Pipeline<R, C, L, W>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    L: ListProvider<R>,
    W: StatusWriter<R::Status>,
{
    /// Wire a pipeline from already-built collaborators: a watch stream
    /// factory, a list provider, and a status writer.
    pub fn new(
        config: OperatorConfig,
        controller: Arc<C>,
        watch_stream: impl Fn() -> WatchStream<R> + Send + Sync + 'static,
        list_provider: Arc<L>,
        status_writer: Arc<W>,
    ) -> Self {
        Self {
            config,
            controller,
            watch_stream: Box::new(watch_stream),
            list_provider,
            status_writer,
        }
    }
}

impl<R, C> Pipeline<R, C, KubeListProvider<R>, KubeStatusWriter<R>>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
{
    /// Wire a pipeline against a live cluster: the watch/list `Api<R>` is
    /// built from `config.namespace_scope()` via `transport::scoped_api`,
    /// and status writes go through `client` scoped per-namespace at write
    /// time (see `KubeStatusWriter`).
    pub fn for_cluster(config: OperatorConfig, client: Client, controller: Arc<C>) -> Self {
        let watch_api: kube::Api<R> = transport::scoped_api(client.clone(), config.namespace_scope());
        let list_provider = Arc::new(KubeListProvider::new(watch_api.clone()));
        let status_writer = Arc::new(KubeStatusWriter::new(client));
        let watch_stream = move || -> WatchStream<R> { Box::pin(watcher::watcher(watch_api.clone(), watcher::Config::default()).default_backoff()) };
        Self {
            config,
            controller,
            watch_stream: Box::new(watch_stream),
            list_provider,
            status_writer,
        }
    }
}

/// Runs a single pipeline attempt to completion and, if configured, restarts
/// it on fatal closure per a [`RetryPolicy`].
///
/// Owns the active watch handle exclusively: a restart always releases the
/// previous handle (by letting the previous run's task finish) before the
/// next run's `Watcher` is constructed, per the data-model ownership rule in
/// §3 of the control-loop design this mirrors.
pub struct Supervisor<R, C, L, W>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    L: ListProvider<R>,
    W: StatusWriter<R::Status>,
{
    pipeline: Pipeline<R, C, L, W>,
}

impl<R, C, L, W> Supervisor<R, C, L, W>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    L: ListProvider<R>,
    W: StatusWriter<R::Status>,
{
    pub fn new(pipeline: Pipeline<R, C, L, W>) -> Self {
        Self { pipeline }
    }

    /// Single attempt: initialize the controller, start the watcher and
    /// reconciler, race their exit signals, and tear everything down.
    ///
    /// Returns `Err` only for a condition fatal to the whole supervisor (the
    /// `checkKubernetesOnStartup` probe, or `on_init` failing) — anything the
    /// pipeline itself can recover from is handled inside the run and
    /// reported via `ExitCode`, never as an `Err` here.
    #[tracing::instrument(skip_all, fields(kind = %self.pipeline.config.kind()))]
    pub async fn run(&self) -> Result<ExitCode, SupervisorError<C::Error>> {
        if self.pipeline.config.check_kubernetes_on_startup() {
            // Reuses the same `ListProvider` the reconciler ticks against as
            // the reachability probe — a list that succeeds here is exactly
            // the guarantee `checkKubernetesOnStartup` needs, and it keeps
            // the probe testable over the same fake as everything else.
            self.pipeline.list_provider.list().await.map_err(SupervisorError::Unreachable)?;
        }

        self.pipeline
            .controller
            .on_init()
            .await
            .map_err(SupervisorError::Init)?;

        let (dispatcher, mut consumer_exit_rx) = Dispatcher::new(
            self.pipeline.controller.clone(),
            self.pipeline.status_writer.clone(),
            self.pipeline.config.queue_capacity(),
        );
        let dispatcher = Arc::new(dispatcher);

        let (events_tx, mut events_rx) = mpsc::channel(1);

        let stream = (self.pipeline.watch_stream)();
        let (watch_handle, watch_join) = pipeline_watcher::spawn_with_stream(stream, events_tx.clone());
        let (reconciler_handle, reconciler_join) =
            reconciler::spawn::<R, _>(self.pipeline.list_provider.clone(), self.pipeline.config.reconcile_period(), events_tx);

        let pump_dispatcher = dispatcher.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                pump_dispatcher.dispatch(event).await;
            }
        });

        // Race the first consumer exit (triggered by a fatal ClosedStream
        // broadcast) against the reconciler's own task exit. Whichever
        // completes first determines the run's result; either way we then
        // close the watch handle and let everything else drain.
        let exit_code = tokio::select! {
            exit = consumer_exit_rx.recv() => exit.unwrap_or(ExitCode::ConsumerExit),
            _ = reconciler_join => ExitCode::Error,
        };

        watch_handle.close();
        reconciler_handle.close();
        let _ = watch_join.await;
        pump.abort();
        let _ = pump.await;

        let dispatcher = Arc::try_unwrap(dispatcher).unwrap_or_else(|_| unreachable!("no other Arc clone outlives this run"));
        dispatcher.join_all().await;

        Ok(exit_code)
    }
}

/// Failures fatal to the supervisor itself, surfaced as the `Err` result of
/// [`Supervisor::run`]. Everything else is folded into an [`ExitCode`].
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError<E: std::error::Error + 'static> {
    #[error("kubernetes reachability check failed: {0}")]
    Unreachable(#[source] crate::error::TransportError),
    #[error("controller on_init failed: {0}")]
    Init(#[source] E),
}

/// Runs `run` repeatedly, consulting `policy` after every exit to decide
/// whether to restart, and how long to sleep first.
///
/// Mirrors §4.8's state machine: `Times(n, d, m)` restarts `n` times with
/// delay `d, d·m, d·m², …`; `Infinite(lo, hi)` restarts forever with a
/// uniformly random delay in `[lo, hi]` each time. Returns the exit code (or
/// error) of the final attempt once the policy is exhausted.
pub async fn with_restart<R, C, L, W>(pipeline_factory: impl Fn() -> Pipeline<R, C, L, W>, mut policy: RetryPolicy) -> Result<ExitCode, SupervisorError<C::Error>>
where
    R: Resource,
    C: Controller<R::Spec, R::Status>,
    L: ListProvider<R>,
    W: StatusWriter<R::Status>,
{
    loop {
        let supervisor = Supervisor::new(pipeline_factory());
        let result = supervisor.run().await;

        let fatal = matches!(result, Err(SupervisorError::Unreachable(_) | SupervisorError::Init(_)));
        if fatal || !policy.can_restart() {
            return result;
        }

        let (delay, next_policy) = policy.next();
        tracing::warn!(?delay, ?result, "pipeline run exited, restarting after backoff");
        sleep_for(delay).await;
        policy = next_policy;
    }
}

async fn sleep_for(delay: Duration) {
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A minimal retry-policy exerciser that doesn't need a live pipeline:
    /// drives the same restart/backoff bookkeeping `with_restart` uses,
    /// against a closure standing in for `Supervisor::run`.
    async fn restart_loop(attempts: Arc<AtomicU32>, failures_before_success: u32, mut policy: RetryPolicy) -> (u32, Vec<Duration>) {
        let mut delays = Vec::new();
        loop {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let exit_is_fatal = attempt < failures_before_success;
            if !exit_is_fatal {
                return (attempts.load(Ordering::SeqCst), delays);
            }
            if !policy.can_restart() {
                return (attempts.load(Ordering::SeqCst), delays);
            }
            let (delay, next) = policy.next();
            delays.push(delay);
            policy = next;
        }
    }

    #[tokio::test]
    async fn times_policy_restarts_exactly_n_times_then_stops() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::times(2, Duration::from_secs(1), 2.0);
        // Never succeeds: exhausts the policy after the initial attempt + 2 restarts.
        let (total_attempts, delays) = restart_loop(attempts, u32::MAX, policy).await;
        assert_eq!(total_attempts, 3);
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn restart_stops_once_the_run_stops_failing() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::times(5, Duration::from_millis(1), 1.0);
        let (total_attempts, delays) = restart_loop(attempts, 2, policy).await;
        assert_eq!(total_attempts, 3);
        assert_eq!(delays.len(), 2);
    }
}
