//! In-memory fixtures shared by this crate's unit tests and, via the
//! `test-util` feature, by downstream integration tests.
//!
//! Grounded in how `kube-runtime`'s own tests build watch streams from
//! `futures::stream::iter` fixtures instead of a live cluster: nothing
//! here talks to a real apiserver. `Widget` is an ordinary
//! `#[derive(CustomResource)]` type, the same shape any application using
//! this framework would define for itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use kuberflow_types::{CustomResource as Cr, StatusUpdate};

use crate::controller::Controller;
use crate::error::TransportError;
use crate::status::StatusWriter;
use crate::transport::ListProvider;

/// A small CRD-shaped fixture, defined the way any application of this
/// framework would define its own resource — nothing framework-specific
/// about it.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kuberflow.example.com",
    version = "v1",
    kind = "Widget",
    namespaced,
    status = "WidgetStatus"
)]
pub struct WidgetSpec {
    pub size: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct WidgetStatus {
    pub phase: String,
}

crate::impl_resource!(Widget, spec = WidgetSpec, status = WidgetStatus);

/// Build a `Widget` with the identity fields the `Decoder` requires.
pub fn widget(name: &str, namespace: &str, uid: &str, resource_version: &str, size: u32) -> Widget {
    Widget {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(uid.to_string()),
            resource_version: Some(resource_version.to_string()),
            ..Default::default()
        },
        spec: WidgetSpec { size },
        status: None,
    }
}

/// An in-memory stand-in for the `list()` collaborator the `Reconciler`
/// drives.
#[derive(Clone, Default)]
pub struct FakeListProvider<R> {
    items: Arc<Mutex<Vec<R>>>,
    fail_next: Arc<AtomicBool>,
}

impl<R: Clone + Send + Sync + 'static> FakeListProvider<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            fail_next: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set(&self, items: Vec<R>) {
        *self.items.lock() = items;
    }

    /// The next `list()` call fails once, then resumes succeeding — for
    /// exercising a reconcile tick that fails to list and recovers on the
    /// next one.
    pub fn fail_next_list(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> ListProvider<R> for FakeListProvider<R> {
    async fn list(&self) -> Result<Vec<R>, TransportError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        Ok(self.items.lock().clone())
    }
}

/// Records every status update handed to it, in submission order. Never
/// fails — use [`FailingStatusWriter`] to exercise `StatusWriteFailure`.
#[derive(Clone, Default)]
pub struct RecordingWriter<U> {
    pub updates: Arc<Mutex<Vec<StatusUpdate<U>>>>,
}

#[async_trait]
impl<U: Clone + Send + Sync + 'static> StatusWriter<U> for RecordingWriter<U> {
    async fn write(&self, update: &StatusUpdate<U>) -> Result<(), TransportError> {
        self.updates.lock().push(update.clone());
        Ok(())
    }
}

/// What the [`RecordingController`] was asked to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Add(String),
    Modify(String),
    Delete(String),
    Reconcile(String),
}

#[derive(Debug, thiserror::Error)]
#[error("recording controller callback failed: {0}")]
pub struct RecordingError(pub String);

/// A `Controller` that records every callback invocation and returns
/// canned, deterministic statuses — `"ready"` on add, `"updated"` on
/// modify, `"reconciled"` on reconcile, matching scenarios S1 and S6.
#[derive(Default)]
pub struct RecordingController {
    pub calls: Mutex<Vec<RecordedCall>>,
    /// When set, the *next* `on_add` call fails once instead of succeeding
    /// (S4: "controller throws").
    pub fail_add_once: AtomicBool,
}

#[async_trait]
impl Controller<WidgetSpec, WidgetStatus> for RecordingController {
    type Error = RecordingError;

    async fn on_add(&self, resource: &Cr<WidgetSpec, WidgetStatus>) -> Result<Option<WidgetStatus>, Self::Error> {
        self.calls.lock().push(RecordedCall::Add(resource.metadata.uid.clone()));
        if self.fail_add_once.swap(false, Ordering::SeqCst) {
            return Err(RecordingError("injected on_add failure".into()));
        }
        Ok(Some(WidgetStatus { phase: "ready".into() }))
    }

    async fn on_modify(&self, resource: &Cr<WidgetSpec, WidgetStatus>) -> Result<Option<WidgetStatus>, Self::Error> {
        self.calls.lock().push(RecordedCall::Modify(resource.metadata.uid.clone()));
        Ok(Some(WidgetStatus { phase: "updated".into() }))
    }

    async fn on_delete(&self, resource: &Cr<WidgetSpec, WidgetStatus>) -> Result<(), Self::Error> {
        self.calls.lock().push(RecordedCall::Delete(resource.metadata.uid.clone()));
        Ok(())
    }

    async fn reconcile(&self, resource: &Cr<WidgetSpec, WidgetStatus>) -> Result<Option<WidgetStatus>, Self::Error> {
        self.calls.lock().push(RecordedCall::Reconcile(resource.metadata.uid.clone()));
        Ok(Some(WidgetStatus { phase: "reconciled".into() }))
    }
}
