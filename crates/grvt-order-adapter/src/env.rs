/*
[INPUT]:  Environment name
[OUTPUT]: REST/stream base URLs and EIP-712 chain id for that environment
[POS]:    Configuration layer - static environment table
[UPDATE]: When exchange hosts or chain ids change
*/

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::Result;
use crate::types::Environment;

/// Endpoints and chain id for one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEndpoints {
    pub env: Environment,
    pub chain_id: u64,
    pub edge_url: String,
    pub trade_data_url: String,
    pub market_data_url: String,
    pub trade_ws_url: String,
    pub market_data_ws_url: String,
}

impl EnvironmentEndpoints {
    /// REST market-data base
    pub fn rest_base(&self) -> &str {
        &self.market_data_url
    }

    /// Public stream base
    pub fn ws_base(&self) -> &str {
        &self.market_data_ws_url
    }

    pub fn instruments_url(&self) -> String {
        format!("{}/full/v1/all_instruments", self.market_data_url)
    }

    pub fn create_order_url(&self) -> String {
        format!("{}/full/v1/create_order", self.trade_data_url)
    }

    pub fn cancel_order_url(&self) -> String {
        format!("{}/full/v1/cancel_order", self.trade_data_url)
    }

    pub fn api_key_login_url(&self) -> String {
        format!("{}/auth/api_key/login", self.edge_url)
    }

    /// Check every base URL parses, so overrides fail at construction
    pub fn validate(&self) -> Result<()> {
        for raw in [
            &self.edge_url,
            &self.trade_data_url,
            &self.market_data_url,
            &self.trade_ws_url,
            &self.market_data_ws_url,
        ] {
            Url::parse(raw)?;
        }
        Ok(())
    }
}

/// Static lookup from environment to endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentRegistry;

impl EnvironmentRegistry {
    pub fn resolve(env: Environment) -> EnvironmentEndpoints {
        let (chain_id, domain) = match env {
            Environment::Dev => (327, "dev.gravitymarkets.io"),
            Environment::Staging => (327, "staging.gravitymarkets.io"),
            Environment::Testnet => (326, "testnet.grvt.io"),
            Environment::Prod => (325, "grvt.io"),
        };

        EnvironmentEndpoints {
            env,
            chain_id,
            edge_url: format!("https://edge.{domain}"),
            trade_data_url: format!("https://trades.{domain}"),
            market_data_url: format!("https://market-data.{domain}"),
            trade_ws_url: format!("wss://trades.{domain}/ws/full"),
            market_data_ws_url: format!("wss://market-data.{domain}/ws/full"),
        }
    }

    /// Resolve an environment by name; unknown names fail with `Config`
    pub fn resolve_name(name: &str) -> Result<EnvironmentEndpoints> {
        Ok(Self::resolve(name.parse()?))
    }

    pub fn chain_id(env: Environment) -> u64 {
        Self::resolve(env).chain_id
    }
}
