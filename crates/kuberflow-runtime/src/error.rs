use thiserror::Error;

/// Configuration validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`kind` must be set")]
    MissingKind,
    #[error("`prefix` must be set and non-empty")]
    EmptyPrefix,
    #[error("`reconcile_period` must be greater than zero")]
    NonPositiveReconcilePeriod,
    #[error("`queue_capacity` must be greater than zero")]
    NonPositiveQueueCapacity,
}

/// Failures surfaced by the cluster transport.
///
/// This is deliberately thin: the transport itself (the real Kubernetes HTTP
/// client and its watch streaming behavior) is out of scope for this crate
/// and is consumed through `kube::Error`, not reimplemented — this enum only
/// adds the framework-level classification the rest of the pipeline needs
/// (is this transient, or does it mean the stream is gone).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("initial list failed: {0}")]
    ListFailed(#[source] kube::Error),
    #[error("failed to start watch: {0}")]
    WatchStartFailed(#[source] kube::Error),
    #[error("watch stream reported an error: {0}")]
    WatchReported(#[source] kube::Error),
    #[error("status write failed: {0}")]
    StatusWriteFailed(#[source] kube::Error),
    #[error("cannot write status for {name}: resource has no namespace")]
    StatusWriteMissingNamespace { name: String },
    #[error("watch stream closed by the cluster")]
    Closed,
}

/// The outcome of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// The watch stream closed and the consumer drained and exited.
    ConsumerExit,
    /// An unrecoverable error ended the run (a transport failure the
    /// watcher could not recover from).
    Error,
}
