//! Converts a typed, cluster-sourced resource into this pipeline's own
//! domain shapes.
//!
//! By the time anything here runs, the transport has already turned raw
//! JSON/YAML bytes into a typed `R` — decoding payload bytes is explicitly
//! out of scope for this crate. What's left to "decode" is pulling the
//! identity fields the rest of the pipeline actually needs (name, uid,
//! resourceVersion) out of `ObjectMeta`, and failing loudly — as a
//! `DecodeFailure`, never silently — if the cluster sent something without
//! them.

use kube::Resource as KubeResource;

use kuberflow_types::{CustomResource, DecodeFailure, Metadata, ServerAction, WatchVerb};

use crate::resource::Resource;

/// Stateless; every method here takes `&self`-free, pure inputs.
pub struct Decoder;

impl Decoder {
    /// Decode one watch-stream item carrying `verb` into a `ServerAction`.
    ///
    /// Returns a `ParseResource` failure carrying the offending `verb` and
    /// a best-effort debug rendering of the object if required metadata is
    /// missing.
    pub fn decode_server<R: Resource>(verb: WatchVerb, item: &R) -> Result<ServerAction<R::Spec, R::Status>, DecodeFailure> {
        let resource = Self::resource(item).map_err(|cause| DecodeFailure::ParseResource {
            verb,
            cause,
            raw: Some(format!("{item:?}")),
        })?;
        Ok(ServerAction::new(verb, resource))
    }

    /// Decode one reconcile-tick listing entry.
    ///
    /// Returns a `ParseReconcile` failure on the same terms as
    /// [`decode_server`](Self::decode_server).
    pub fn decode_reconcile<R: Resource>(item: &R) -> Result<CustomResource<R::Spec, R::Status>, DecodeFailure> {
        Self::resource(item).map_err(|cause| DecodeFailure::ParseReconcile {
            cause,
            raw: Some(format!("{item:?}")),
        })
    }

    fn resource<R: Resource>(item: &R) -> Result<CustomResource<R::Spec, R::Status>, String> {
        let metadata = Self::metadata(item)?;
        Ok(CustomResource::new(metadata, item.spec().clone(), item.status().cloned()))
    }

    fn metadata<R: KubeResource>(item: &R) -> Result<Metadata, String> {
        let meta = item.meta();
        let name = meta.name.clone().ok_or_else(|| "missing metadata.name".to_string())?;
        let uid = meta.uid.clone().ok_or_else(|| "missing metadata.uid".to_string())?;
        let resource_version = meta
            .resource_version
            .clone()
            .ok_or_else(|| "missing metadata.resourceVersion".to_string())?;
        Ok(Metadata {
            name,
            namespace: meta.namespace.clone(),
            uid,
            resource_version,
            labels: meta.labels.clone().unwrap_or_default().into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::widget;

    #[test]
    fn decodes_a_well_formed_resource() {
        let item = widget("w1", "default", "u1", "1", 3);
        let action = Decoder::decode_server(WatchVerb::Added, &item).unwrap();
        assert_eq!(action.verb, WatchVerb::Added);
        let resource = action.resource.unwrap();
        assert_eq!(resource.metadata.uid, "u1");
        assert_eq!(resource.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(resource.spec.size, 3);
        assert!(resource.status.is_none());
    }

    #[test]
    fn missing_uid_is_a_parse_failure() {
        let mut item = widget("w1", "default", "u1", "1", 3);
        item.meta_mut().uid = None;
        let failure = Decoder::decode_server(WatchVerb::Modified, &item).unwrap_err();
        match failure {
            DecodeFailure::ParseResource { verb, cause, .. } => {
                assert_eq!(verb, WatchVerb::Modified);
                assert!(cause.contains("uid"));
            }
            other => panic!("expected ParseResource, got {other:?}"),
        }
    }

    #[test]
    fn reconcile_decode_failure_is_parse_reconcile() {
        let mut item = widget("w1", "default", "u1", "1", 3);
        item.meta_mut().resource_version = None;
        let failure = Decoder::decode_reconcile(&item).unwrap_err();
        assert!(matches!(failure, DecodeFailure::ParseReconcile { .. }));
    }
}
