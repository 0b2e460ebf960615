use thiserror::Error;

use crate::{CustomResource, Metadata};

/// The verb a raw watch event was tagged with.
///
/// `Error` carries no resource: the cluster is reporting a problem with the
/// watch itself, not a change to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchVerb {
    Added,
    Modified,
    Deleted,
    Error,
}

/// A decoded event sourced from the live watch stream.
///
/// `resource` is `None` if and only if `verb == WatchVerb::Error` — enforced
/// by [`ServerAction::new`] and [`ServerAction::error`], the only two ways to
/// construct one.
#[derive(Debug, Clone)]
pub struct ServerAction<T, U> {
    pub verb: WatchVerb,
    pub resource: Option<CustomResource<T, U>>,
}

impl<T, U> ServerAction<T, U> {
    /// Build a `ServerAction` for a verb that carries a resource
    /// (`Added`/`Modified`/`Deleted`).
    pub fn new(verb: WatchVerb, resource: CustomResource<T, U>) -> Self {
        debug_assert!(verb != WatchVerb::Error, "use ServerAction::error for WatchVerb::Error");
        Self {
            verb,
            resource: Some(resource),
        }
    }

    /// Build the resource-less `Error` variant.
    pub fn error() -> Self {
        Self {
            verb: WatchVerb::Error,
            resource: None,
        }
    }
}

/// A synthetic event injected by the `Reconciler` on its periodic tick,
/// carrying a freshly-listed live resource.
#[derive(Debug, Clone)]
pub struct ReconcileAction<T, U> {
    pub resource: CustomResource<T, U>,
}

/// A single unit of work handed from the `Dispatcher` to a namespace's
/// action consumer. Single-use: dropped once dispatched.
#[derive(Debug, Clone)]
pub enum OperatorAction<T, U> {
    Server(ServerAction<T, U>),
    Reconcile(ReconcileAction<T, U>),
}

impl<T, U> From<ServerAction<T, U>> for OperatorAction<T, U> {
    fn from(action: ServerAction<T, U>) -> Self {
        OperatorAction::Server(action)
    }
}

impl<T, U> From<ReconcileAction<T, U>> for OperatorAction<T, U> {
    fn from(action: ReconcileAction<T, U>) -> Self {
        OperatorAction::Reconcile(action)
    }
}

/// Everything that can go wrong turning a raw transport event into an
/// [`OperatorAction`].
///
/// Decoding JSON/YAML payload bytes into a typed resource is out of scope
/// for this crate (it already happened by the time a resource reaches the
/// `Decoder` — see `kuberflow-runtime`'s `Watcher`), so `raw` here is a
/// best-effort diagnostic rendering of whatever the transport could still
/// tell us about the offending item, not the original bytes.
#[derive(Debug, Error)]
pub enum DecodeFailure {
    /// The transport's watch stream terminated. `cause` is `None` for a
    /// clean close with no reported reason.
    #[error("watch stream closed: {}", cause.as_deref().unwrap_or("no reason given"))]
    ClosedStream { cause: Option<String> },

    /// A single watch event could not be turned into a resource.
    #[error("failed to decode {verb:?} event: {cause}")]
    ParseResource {
        verb: WatchVerb,
        cause: String,
        raw: Option<String>,
    },

    /// A single reconcile-tick listing entry could not be turned into a
    /// resource.
    #[error("failed to decode reconcile listing entry: {cause}")]
    ParseReconcile { cause: String, raw: Option<String> },
}

impl DecodeFailure {
    /// Whether this failure is fatal to the whole pipeline run (only
    /// `ClosedStream` is).
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeFailure::ClosedStream { .. })
    }
}

/// A status produced by a controller callback, destined for the cluster via
/// a `StatusFeedback` writer.
#[derive(Debug, Clone)]
pub struct StatusUpdate<U> {
    pub metadata: Metadata,
    pub new_status: U,
}

impl<U> StatusUpdate<U> {
    pub fn new(metadata: Metadata, new_status: U) -> Self {
        Self { metadata, new_status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_no_resource() {
        let action: ServerAction<(), ()> = ServerAction::error();
        assert_eq!(action.verb, WatchVerb::Error);
        assert!(action.resource.is_none());
    }

    #[test]
    fn new_carries_the_given_resource() {
        let metadata = Metadata {
            name: "w".to_string(),
            namespace: Some("default".to_string()),
            uid: "u1".to_string(),
            resource_version: "1".to_string(),
            labels: Default::default(),
        };
        let resource = CustomResource::new(metadata, (), None);
        let action = ServerAction::new(WatchVerb::Added, resource);
        assert_eq!(action.verb, WatchVerb::Added);
        assert!(action.resource.is_some());
    }
}
