//! A declarative Kubernetes operator framework.
//!
//! An application implements [`Controller`] for its resource kind and hands
//! it to a [`Supervisor`], which drives a reliable, ordered, fault-tolerant
//! watch/dispatch/reconcile pipeline on top of it — mirroring the canonical
//! Kubernetes controller pattern without the application having to hand-roll
//! the watch stream, per-namespace ordering, or restart/backoff logic
//! itself.
//!
//! This crate is a thin facade: [`kuberflow_types`] holds the data model
//! (actions, metadata, retry policy) with no opinion about the cluster, and
//! [`kuberflow_runtime`] holds the pipeline itself (decoder, dispatcher,
//! consumer, watcher, reconciler, supervisor) built on the published `kube`
//! crate's transport. Use the [`prelude`] to pull in the types most
//! applications need without naming either crate directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use kube::{Client, CustomResource};
//! use kuberflow::prelude::*;
//! use schemars::JsonSchema;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
//! #[kube(group = "example.com", version = "v1", kind = "Widget", namespaced, status = "WidgetStatus")]
//! struct WidgetSpec {
//!     size: u32,
//! }
//!
//! #[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
//! struct WidgetStatus {
//!     phase: String,
//! }
//!
//! kuberflow::runtime::impl_resource!(Widget, spec = WidgetSpec, status = WidgetStatus);
//!
//! struct WidgetController;
//!
//! #[async_trait]
//! impl Controller<WidgetSpec, WidgetStatus> for WidgetController {
//!     type Error = std::convert::Infallible;
//!
//!     async fn on_add(&self, resource: &CustomResource<WidgetSpec, WidgetStatus>) -> Result<Option<WidgetStatus>, Self::Error> {
//!         Ok(Some(WidgetStatus { phase: format!("sized-{}", resource.spec.size) }))
//!     }
//!
//!     async fn on_modify(&self, resource: &CustomResource<WidgetSpec, WidgetStatus>) -> Result<Option<WidgetStatus>, Self::Error> {
//!         self.on_add(resource).await
//!     }
//!
//!     async fn on_delete(&self, _resource: &CustomResource<WidgetSpec, WidgetStatus>) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     async fn reconcile(&self, resource: &CustomResource<WidgetSpec, WidgetStatus>) -> Result<Option<WidgetStatus>, Self::Error> {
//!         self.on_add(resource).await
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = OperatorConfigBuilder::new()
//!     .kind("Widget")
//!     .prefix("example.com")
//!     .namespace_scope(NamespaceScope::Named("widgets-ns".to_string()))
//!     .build()?;
//! let client = Client::try_default().await?;
//! let retry = config.retry();
//! // `namespace_scope` above drives which `Api<Widget>` `Pipeline::for_cluster`
//! // builds internally (`Api::namespaced` here) — the caller only hands
//! // over the bare client.
//! let pipeline = move || Pipeline::for_cluster(config.clone(), client.clone(), std::sync::Arc::new(WidgetController));
//! kuberflow::runtime::with_restart(pipeline, retry).await?;
//! # Ok(())
//! # }
//! ```

pub use kuberflow_runtime as runtime;
pub use kuberflow_types as types;

pub use kuberflow_runtime::{
    with_restart, Controller, ExitCode, OperatorConfig, OperatorConfigBuilder, Pipeline, Resource, Supervisor,
    SupervisorError,
};
pub use kuberflow_types::{
    namespace_key, CustomResource, DecodeFailure, Metadata, NamespaceScope, OperatorAction, ReconcileAction,
    RetryPolicy, ServerAction, StatusUpdate, WatchVerb, CLUSTER_SCOPED_NAMESPACE,
};

/// Re-exports the handful of types nearly every application using this
/// framework needs in scope, the way `kube::Client`/`kube::Api` anchor the
/// teacher crate's own top-level re-export surface.
pub mod prelude {
    pub use crate::{
        Controller, CustomResource, ExitCode, Metadata, NamespaceScope, OperatorConfig, OperatorConfigBuilder,
        Pipeline, ReconcileAction, Resource, RetryPolicy, ServerAction, Supervisor, SupervisorError, WatchVerb,
    };
}
