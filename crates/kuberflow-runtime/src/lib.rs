//! The watch/dispatch/reconcile pipeline that drives a kuberflow controller.
//!
//! Wires together, leaves first: [`Decoder`](decoder) turns raw watch events
//! into typed actions; [`NsQueue`](queue::NsQueue) buffers them per
//! namespace; [`ActionConsumer`](consumer::ActionConsumer) drives user
//! [`Controller`](controller::Controller) callbacks and hands status writes
//! to [`StatusFeedback`](status::StatusFeedback); [`Dispatcher`](dispatcher)
//! routes decoded events to the right consumer; [`Watcher`](watcher)
//! subscribes to the cluster and feeds the dispatcher;
//! [`Reconciler`](reconciler) periodically re-lists and re-injects; and
//! [`Supervisor`](supervisor) restarts the whole thing on fatal closure.

pub mod config;
pub mod consumer;
pub mod controller;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod queue;
pub mod reconciler;
pub mod resource;
pub mod status;
pub mod supervisor;
pub mod transport;
pub mod watcher;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{OperatorConfig, OperatorConfigBuilder};
pub use controller::Controller;
pub use dispatcher::{ConsumerMessage, Dispatcher, PipelineEvent};
pub use error::{ConfigError, ExitCode, TransportError};
pub use resource::Resource;
pub use supervisor::{with_restart, Pipeline, Supervisor, SupervisorError, WatchStream};
pub use transport::{KubeListProvider, KubeStatusWriter, ListProvider};

pub use kuberflow_types::{
    namespace_key, CustomResource, DecodeFailure, Metadata, NamespaceScope, OperatorAction, ReconcileAction,
    RetryPolicy, ServerAction, StatusUpdate, WatchVerb, CLUSTER_SCOPED_NAMESPACE,
};
