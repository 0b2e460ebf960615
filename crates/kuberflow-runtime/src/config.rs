use std::time::Duration;

use kuberflow_types::{NamespaceScope, RetryPolicy};

use crate::error::ConfigError;

const DEFAULT_RECONCILE_PERIOD: Duration = Duration::from_secs(60);
const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Validated configuration for a single operator pipeline run.
///
/// The only way to obtain one is [`OperatorConfigBuilder::build`], which
/// enforces the validation rules below — there is no `pub` constructor
/// that skips validation.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    pub(crate) kind: String,
    pub(crate) namespace_scope: NamespaceScope,
    pub(crate) prefix: String,
    pub(crate) reconcile_period: Duration,
    pub(crate) queue_capacity: usize,
    pub(crate) check_kubernetes_on_startup: bool,
    pub(crate) retry: RetryPolicy,
}

impl OperatorConfig {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace_scope(&self) -> &NamespaceScope {
        &self.namespace_scope
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn reconcile_period(&self) -> Duration {
        self.reconcile_period
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn check_kubernetes_on_startup(&self) -> bool {
        self.check_kubernetes_on_startup
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry.clone()
    }
}

/// Builds and validates an [`OperatorConfig`].
///
/// `kind` and `prefix` are required and have no default; everything else
/// falls back to a sensible default.
#[derive(Debug, Clone, Default)]
pub struct OperatorConfigBuilder {
    kind: Option<String>,
    namespace_scope: Option<NamespaceScope>,
    prefix: Option<String>,
    reconcile_period: Option<Duration>,
    queue_capacity: Option<usize>,
    check_kubernetes_on_startup: Option<bool>,
    retry: Option<RetryPolicy>,
}

impl OperatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn namespace_scope(mut self, scope: NamespaceScope) -> Self {
        self.namespace_scope = Some(scope);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn reconcile_period(mut self, period: Duration) -> Self {
        self.reconcile_period = Some(period);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn check_kubernetes_on_startup(mut self, check: bool) -> Self {
        self.check_kubernetes_on_startup = Some(check);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Validate and build the final [`OperatorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `kind` is unset, `prefix` is unset or
    /// empty, `reconcile_period` is zero, or `queue_capacity` is zero.
    pub fn build(self) -> Result<OperatorConfig, ConfigError> {
        let kind = self.kind.ok_or(ConfigError::MissingKind)?;
        let prefix = self.prefix.ok_or(ConfigError::EmptyPrefix)?;
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        let reconcile_period = self.reconcile_period.unwrap_or(DEFAULT_RECONCILE_PERIOD);
        if reconcile_period.is_zero() {
            return Err(ConfigError::NonPositiveReconcilePeriod);
        }
        let queue_capacity = self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 {
            return Err(ConfigError::NonPositiveQueueCapacity);
        }
        Ok(OperatorConfig {
            kind,
            namespace_scope: self.namespace_scope.unwrap_or(NamespaceScope::AllNamespaces),
            prefix,
            reconcile_period,
            queue_capacity,
            check_kubernetes_on_startup: self.check_kubernetes_on_startup.unwrap_or(true),
            retry: self.retry.unwrap_or_else(|| RetryPolicy::infinite(Duration::from_secs(1), Duration::from_secs(30))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_kind_is_invalid() {
        let result = OperatorConfigBuilder::new().prefix("acme.example.com").build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingKind);
    }

    #[test]
    fn empty_prefix_is_invalid() {
        let result = OperatorConfigBuilder::new().kind("Widget").prefix("").build();
        assert_eq!(result.unwrap_err(), ConfigError::EmptyPrefix);
    }

    #[test]
    fn missing_prefix_is_invalid() {
        let result = OperatorConfigBuilder::new().kind("Widget").build();
        assert_eq!(result.unwrap_err(), ConfigError::EmptyPrefix);
    }

    #[test]
    fn valid_config_is_accepted() {
        let config = OperatorConfigBuilder::new()
            .kind("Widget")
            .prefix("acme.example.com")
            .build()
            .unwrap();
        assert_eq!(config.kind(), "Widget");
        assert_eq!(config.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn zero_reconcile_period_is_invalid() {
        let result = OperatorConfigBuilder::new()
            .kind("Widget")
            .prefix("acme.example.com")
            .reconcile_period(Duration::ZERO)
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::NonPositiveReconcilePeriod);
    }
}
