/*
[INPUT]:  Environment choice, timeouts, retry and stream tuning
[OUTPUT]: Immutable ClientConfig consumed at client construction
[POS]:    Configuration layer - one value per client instance
[UPDATE]: When adding tunables to any layer
*/

use crate::auth::SessionConfig;
use crate::env::{EnvironmentEndpoints, EnvironmentRegistry};
use crate::http::{HttpConfig, RetryConfig};
use crate::types::Environment;
use crate::ws::StreamConfig;

/// Client configuration
///
/// Built once and handed to [`crate::client::GrvtClient::new`]; there is no
/// process-wide configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub env: Environment,
    /// Replaces the registry entry for `env`, e.g. to point at a mock server
    pub endpoints: Option<EnvironmentEndpoints>,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub session: SessionConfig,
    pub stream: StreamConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_env(Environment::Prod)
    }
}

impl ClientConfig {
    pub fn for_env(env: Environment) -> Self {
        Self {
            env,
            endpoints: None,
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
            stream: StreamConfig::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: EnvironmentEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Effective endpoints: the override if present, otherwise the registry entry
    pub fn endpoints(&self) -> EnvironmentEndpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| EnvironmentRegistry::resolve(self.env))
    }

    pub fn chain_id(&self) -> u64 {
        self.endpoints().chain_id
    }
}
