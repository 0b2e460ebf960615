use k8s_openapi::NamespaceResourceScope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// An accessor trait bridging a user's typed Kubernetes resource into the
/// `spec`/`status` shape this pipeline operates on.
///
/// Types generated by `kube`'s `#[derive(CustomResource)]`, or any other
/// `kube::Resource` implementation with public `spec`/`status` fields,
/// satisfy this trivially — see the `impl_resource!` macro below for the
/// common case.
///
/// Pinned to `NamespaceResourceScope`: the per-namespace dispatch model
/// (`Dispatcher`, `NsQueue`, `ActionConsumer`) assumes the watched kind is
/// namespaced, the same way `#[kube(namespaced)]` is the common case for
/// CRDs across the example operators this crate is modeled on. Cluster-scoped
/// kinds are out of scope for the `kube` transport adapter in `transport.rs`.
pub trait Resource:
    kube::Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug + Send + Sync + 'static
{
    /// The user-defined desired-state type.
    type Spec: Clone + Debug + Send + Sync + 'static;
    /// The user-defined observed-state type. `Serialize` is required so a
    /// `StatusFeedback` writer can patch it back to the cluster.
    type Status: Clone + Debug + Serialize + Send + Sync + 'static;

    fn spec(&self) -> &Self::Spec;
    fn status(&self) -> Option<&Self::Status>;
}

/// Implements [`Resource`] for a type with public `spec: Spec` and
/// `status: Option<Status>` fields — the shape `kube-derive`'s
/// `#[derive(CustomResource)]` produces, and the shape most hand-written
/// CRD structs use too.
#[macro_export]
macro_rules! impl_resource {
    ($ty:ty, spec = $spec:ty, status = $status:ty) => {
        impl $crate::Resource for $ty {
            type Spec = $spec;
            type Status = $status;

            fn spec(&self) -> &Self::Spec {
                &self.spec
            }

            fn status(&self) -> Option<&Self::Status> {
                self.status.as_ref()
            }
        }
    };
}
