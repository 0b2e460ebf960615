//! Adapters onto the cluster transport.
//!
//! The Kubernetes HTTP client and its watch streaming transport are
//! explicitly out of scope for this crate — this module consumes
//! `kube::Api` for the two operations the pipeline needs beyond watching
//! (`list`, `updateStatus`) rather than reimplementing either.

use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde::Serialize;

use kuberflow_types::{NamespaceScope, StatusUpdate};

use crate::error::TransportError;
use crate::resource::Resource;
use crate::status::StatusWriter;

/// Build the `Api<R>` a configured [`NamespaceScope`] describes.
///
/// Mirrors the teacher's own three `Api` constructors one-to-one:
/// `AllNamespaces` has no namespace segment in its URL path at all (so a
/// per-namespace `Api` must still be built separately for status writes —
/// see [`KubeStatusWriter`]), `CurrentNamespace` resolves the client's own
/// configured namespace, and `Named` pins one explicit namespace.
pub fn scoped_api<R: Resource>(client: Client, scope: &NamespaceScope) -> Api<R> {
    match scope {
        NamespaceScope::AllNamespaces => Api::all(client),
        NamespaceScope::CurrentNamespace => Api::default_namespaced(client),
        NamespaceScope::Named(namespace) => Api::namespaced(client, namespace),
    }
}

/// Lists the live resource set for the `Reconciler`'s periodic tick, via
/// an injected provider so the tick logic stays testable without a live
/// cluster.
#[async_trait]
pub trait ListProvider<R>: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<R>, TransportError>;
}

/// Lists resources straight from the cluster via `kube::Api::list`.
pub struct KubeListProvider<R: Resource> {
    api: Api<R>,
}

impl<R: Resource> KubeListProvider<R> {
    pub fn new(api: Api<R>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<R: Resource> ListProvider<R> for KubeListProvider<R> {
    async fn list(&self) -> Result<Vec<R>, TransportError> {
        let list = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(TransportError::ListFailed)?;
        Ok(list.items)
    }
}

/// Writes a controller-produced status back to the cluster via a merge
/// patch against the `/status` subresource, mirroring how
/// `kube-runtime::finalizer` patches subresources with `Patch::Merge`
/// rather than a full `PUT` replace.
///
/// Holds a bare `Client` rather than one fixed `Api<R>`: the watch/list side
/// of the pipeline may reasonably be scoped to `AllNamespaces` (an `Api`
/// whose URL path carries no `/namespaces/{ns}/` segment at all), but a
/// status patch always targets one specific object in one specific
/// namespace, so each write builds its own namespace-scoped `Api<R>` from
/// the update's own metadata instead of reusing whatever scope the watch
/// happened to use.
pub struct KubeStatusWriter<R: Resource> {
    client: Client,
    _marker: std::marker::PhantomData<fn() -> R>,
}

impl<R: Resource> KubeStatusWriter<R> {
    pub fn new(client: Client) -> Self {
        Self { client, _marker: std::marker::PhantomData }
    }
}

#[async_trait]
impl<R> StatusWriter<R::Status> for KubeStatusWriter<R>
where
    R: Resource,
    R::Status: Serialize,
{
    async fn write(&self, update: &StatusUpdate<R::Status>) -> Result<(), TransportError> {
        let Some(namespace) = update.metadata.namespace.as_deref() else {
            return Err(TransportError::StatusWriteMissingNamespace {
                name: update.metadata.name.clone(),
            });
        };
        let api: Api<R> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": update.new_status });
        api.patch_status(&update.metadata.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(TransportError::StatusWriteFailed)
    }
}
