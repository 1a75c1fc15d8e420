//!
//! # Operator configuration
//!
use std::time::Duration;

use adaptive_backoff::prelude::{BackoffBuilder, ExponentialBackoff, ExponentialBackoffBuilder};
use anyhow::{Result, anyhow};
use k8_client::meta_client::NameSpace;

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_RETRY_MIN: Duration = Duration::from_millis(500);
pub const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(300);
pub const DEFAULT_RETRY_FACTOR: f64 = 2.0;
pub const DEFAULT_WATCH_RETRY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// watched namespace, all namespaces if none
    pub namespace: Option<String>,
    pub workers: usize,
    /// requeue period after successful reconcile
    pub resync: Option<Duration>,
    pub retry: RetryConfig,
    /// delay before restarting a broken watch
    pub watch_retry: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            workers: DEFAULT_WORKERS,
            resync: None,
            retry: RetryConfig::default(),
            watch_retry: DEFAULT_WATCH_RETRY,
        }
    }
}

impl OperatorConfig {
    pub fn watch_namespace(&self) -> NameSpace {
        match &self.namespace {
            Some(namespace) => NameSpace::Named(namespace.clone()),
            None => NameSpace::All,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow!("workers must be at least 1"));
        }
        if self.watch_retry.is_zero() {
            return Err(anyhow!("watch retry must be greater than zero"));
        }
        self.retry.validate()
    }
}

/// exponential backoff applied per key after failed reconcile
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_RETRY_MIN,
            max: DEFAULT_RETRY_MAX,
            factor: DEFAULT_RETRY_FACTOR,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min.is_zero() {
            return Err(anyhow!("retry min must be greater than zero"));
        }
        if self.min > self.max {
            return Err(anyhow!(
                "retry min {:?} exceeds retry max {:?}",
                self.min,
                self.max
            ));
        }
        if self.factor.is_nan() || self.factor < 1.0 {
            return Err(anyhow!("retry factor must be at least 1.0"));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Result<ExponentialBackoff> {
        ExponentialBackoffBuilder::default()
            .factor(self.factor)
            .min(self.min)
            .max(self.max)
            .build()
    }
}
