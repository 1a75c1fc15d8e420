//!
//! # CLI for AppService operator
//!
//! Parameters are applied over default configuration.
//!
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::config::{DEFAULT_RETRY_FACTOR, DEFAULT_WORKERS, OperatorConfig, RetryConfig};

/// cli options
#[derive(Debug, Parser)]
#[command(name = "appservice-operator", about = "AppService Operator", version)]
pub struct OperatorOpt {
    /// namespace to watch, all namespaces if omitted
    #[arg(short = 'n', long = "namespace", value_name = "namespace", env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// number of concurrent reconcile workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// requeue every instance after this period, e.g. "5m"
    #[arg(long, value_parser = humantime::parse_duration)]
    resync: Option<Duration>,

    /// lower bound of the delay before retrying a failed reconcile
    #[arg(long, value_parser = humantime::parse_duration, default_value = "500ms")]
    retry_min: Duration,

    /// maximum delay before retrying a failed reconcile
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5m")]
    retry_max: Duration,

    /// growth factor of retry delay, bounded by retry min and max
    #[arg(long, default_value_t = DEFAULT_RETRY_FACTOR)]
    retry_factor: f64,

    /// delay before restarting a failed watch
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    watch_retry: Duration,
}

impl OperatorOpt {
    fn as_operator_config(self) -> Result<OperatorConfig> {
        let config = OperatorConfig {
            namespace: self.namespace.filter(|namespace| !namespace.is_empty()),
            workers: self.workers,
            resync: self.resync,
            retry: RetryConfig {
                min: self.retry_min,
                max: self.retry_max,
                factor: self.retry_factor,
            },
            watch_retry: self.watch_retry,
        };
        config.validate()?;
        debug!(?config, "operator config");
        Ok(config)
    }

    pub fn parse_cli_or_exit(self) -> OperatorConfig {
        match self.as_operator_config() {
            Err(err) => {
                eprintln!("\x1B[1;31merror:\x1B[0m {err}");
                process::exit(-1);
            }
            Ok(config) => config,
        }
    }
}
