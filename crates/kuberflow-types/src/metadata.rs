use std::collections::BTreeMap;

/// Identity and bookkeeping fields carried on every resource the pipeline
/// touches.
///
/// `resource_version` is treated as an opaque token throughout this crate
/// (and the runtime crate built on top of it) — it is only ever handed back
/// to the cluster transport, never parsed or compared here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    /// Name of the resource, unique within `namespace` for a given kind.
    pub name: String,
    /// Namespace the resource lives in. `None` for cluster-scoped kinds.
    pub namespace: Option<String>,
    /// Cluster-assigned unique identifier, stable across renames.
    pub uid: String,
    /// Opaque version token used by the cluster to detect concurrent writes.
    pub resource_version: String,
    /// Labels attached to the resource at the time it was observed.
    pub labels: BTreeMap<String, String>,
}

impl Metadata {
    /// The namespace key this resource's actions should be routed under, per
    /// the dispatcher's tie-break rule for cluster-scoped resources.
    pub fn namespace_key(&self) -> &str {
        crate::namespace_key(self.namespace.as_deref())
    }
}
