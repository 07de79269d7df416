use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub fn compose_config<'de, CFG: Deserialize<'de>>(external_path: &str, env_prefix: &str) -> Result<CFG, ConfigError> {
    Config::builder()

        // Add in a local configuration file
        .add_source(File::with_name(external_path).required(false))

        // Add in settings from the environment (e.g. WEBAPP_OPERATOR_CONCURRENCY)
        .add_source(Environment::with_prefix(env_prefix))

        .build()?
        .try_deserialize()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Restricts the watch to a single namespace, all namespaces when unset.
    #[serde(default)]
    pub watch_namespace: Option<String>,
    /// Max number of identities reconciled in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: u16,
    /// Deadline applied to a whole reconciliation pass.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_backoff_base_millis")]
    pub backoff_base_millis: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    #[serde(default = "default_field_manager")]
    pub field_manager: String,
}

impl OperatorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_millis)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            backoff_base_millis: default_backoff_base_millis(),
            backoff_max_secs: default_backoff_max_secs(),
            field_manager: default_field_manager(),
        }
    }
}

fn default_concurrency() -> u16 { 4 }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_backoff_base_millis() -> u64 { 500 }
fn default_backoff_max_secs() -> u64 { 300 }
fn default_field_manager() -> String { String::from("webapp-operator") }
