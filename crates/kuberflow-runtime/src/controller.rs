use async_trait::async_trait;
use std::error::Error as StdError;

use kuberflow_types::CustomResource;

/// User-implemented callback surface the `ActionConsumer` drives.
///
/// Implementations should treat cross-namespace state as shared: the
/// runtime runs at most one invocation per namespace at a time, but
/// invocations for different namespaces may run concurrently.
#[async_trait]
pub trait Controller<T, U>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    /// Error type callbacks can fail with. Logged by the `ActionConsumer`
    /// and moved past — it never aborts the pipeline.
    type Error: StdError + Send + Sync + 'static;

    /// Called exactly once, before any action is dispatched.
    async fn on_init(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// A resource was added. A returned status is written back to the
    /// cluster.
    async fn on_add(&self, resource: &CustomResource<T, U>) -> Result<Option<U>, Self::Error>;

    /// A resource was modified. A returned status is written back to the
    /// cluster.
    async fn on_modify(&self, resource: &CustomResource<T, U>) -> Result<Option<U>, Self::Error>;

    /// A resource was deleted. Any returned status would be meaningless (the
    /// resource is gone) so this callback has no status to return.
    async fn on_delete(&self, resource: &CustomResource<T, U>) -> Result<(), Self::Error>;

    /// Periodic re-examination of a still-live resource, injected by the
    /// `Reconciler`. A returned status is written back to the cluster.
    async fn reconcile(&self, resource: &CustomResource<T, U>) -> Result<Option<U>, Self::Error>;
}
