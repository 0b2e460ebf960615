//! Data model shared by every stage of the kuberflow watch/reconcile pipeline.
//!
//! This crate has no opinion about how resources arrive from a cluster — it
//! only defines the shapes that flow between the `Decoder`, `Dispatcher`,
//! `ActionConsumer`, and `StatusFeedback` stages implemented in
//! `kuberflow-runtime`.

mod action;
mod metadata;
mod resource;
mod retry;
mod scope;

pub use action::{DecodeFailure, OperatorAction, ReconcileAction, ServerAction, StatusUpdate, WatchVerb};
pub use metadata::Metadata;
pub use resource::CustomResource;
pub use retry::RetryPolicy;
pub use scope::NamespaceScope;

/// The synthetic namespace key used for cluster-scoped resources.
///
/// Cluster-scoped resources carry no `namespace` in their metadata; the
/// dispatcher routes them to a single consumer keyed on this constant so
/// that they still get FIFO ordering and a dedicated status feedback writer.
pub const CLUSTER_SCOPED_NAMESPACE: &str = "";

/// Returns the namespace key a resource's actions should be routed under.
///
/// Namespaced resources use their own namespace; cluster-scoped resources
/// (no namespace set) collapse onto [`CLUSTER_SCOPED_NAMESPACE`].
pub fn namespace_key(namespace: Option<&str>) -> &str {
    namespace.unwrap_or(CLUSTER_SCOPED_NAMESPACE)
}
