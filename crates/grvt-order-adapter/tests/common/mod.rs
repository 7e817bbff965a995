/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for grvt-order-adapter tests

#![allow(dead_code)]

use std::time::Duration;

use grvt_order_adapter::{
    ClientConfig,
    Environment,
    EnvironmentEndpoints,
    EnvironmentRegistry,
    RetryConfig,
};
use serde_json::{Value, json};
use wiremock::MockServer;

/// Well-known development key; never holds funds
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const PROD_R: &str = "0x229d3428598b22372588682881f18bbeb21944bdc28c42571c38207ccb732f11";
pub const PROD_S: &str = "0x4f231cf6b371e4265b2c262b33dc40b4c0b323e233ea1b33db7c8a3041255a7f";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Prod endpoints with every REST base pointed at `base_url`
pub fn endpoints_for(base_url: &str) -> EnvironmentEndpoints {
    let ws_url = format!("{}/ws/full", base_url.replacen("http", "ws", 1));
    EnvironmentEndpoints {
        edge_url: base_url.to_string(),
        trade_data_url: base_url.to_string(),
        market_data_url: base_url.to_string(),
        trade_ws_url: ws_url.clone(),
        market_data_ws_url: ws_url,
        ..EnvironmentRegistry::resolve(Environment::Prod)
    }
}

/// Client config against a mock server with short, deterministic retry delays
pub fn client_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::for_env(Environment::Prod).with_endpoints(endpoints_for(base_url));
    config.retry = RetryConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        jitter: false,
        ..RetryConfig::default()
    };
    config
}

pub fn catalog_json() -> &'static str {
    r#"{"BTC_USDT_Perp": {"instrument_hash": "0x030501", "base_decimals": 9},
        "ETH_USDT_Perp": {"instrument_hash": "0x030401", "base_decimals": 9}}"#
}

/// The end-to-end example order, wrapped form
pub fn example_order() -> Value {
    json!({
        "order": {
            "sub_account_id": "42",
            "is_market": false,
            "time_in_force": "GOOD_TILL_TIME",
            "legs": [{
                "instrument": "BTC_USDT_Perp",
                "size": "1.5",
                "limit_price": "115038.01",
                "is_buying_asset": true
            }],
            "signature": {"expiration": "1697788800000000000", "nonce": 1234567890}
        }
    })
}

pub fn instruments_body() -> Value {
    json!({
        "result": [
            {
                "instrument": "BTC_USDT_Perp",
                "instrument_hash": "0x030501",
                "base": "BTC",
                "quote": "USDT",
                "kind": "PERPETUAL",
                "base_decimals": 9,
                "quote_decimals": 6,
                "tick_size": "0.1",
                "min_size": "0.001"
            },
            {
                "instrument": "ETH_USDT_Perp",
                "instrument_hash": "0x030401",
                "base_decimals": 9
            }
        ]
    })
}
