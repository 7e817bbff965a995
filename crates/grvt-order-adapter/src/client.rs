/*
[INPUT]:  ClientConfig and optional account API key
[OUTPUT]: GrvtClient wiring dispatcher, sessions, signing engine and streams
[POS]:    Crate facade - composes the layers for callers
[UPDATE]: When a layer gains a constructor argument or a new entry point
*/

use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::auth::{ApiKeyLogin, SessionManager, SessionRefresher};
use crate::catalog::InstrumentCatalog;
use crate::config::ClientConfig;
use crate::env::EnvironmentEndpoints;
use crate::http::{BlockingDispatcher, GrvtError, RequestDispatcher, ReqwestTransport, Result};
use crate::signing::OrderSigningEngine;
use crate::types::{CancelOrderRequest, SignedOrder};
use crate::ws::{PrivateAuth, StreamMultiplexer};

/// Entry point over one environment.
///
/// Cloning is cheap; clones share the HTTP pool and the session cache.
#[derive(Debug, Clone)]
pub struct GrvtClient {
    config: ClientConfig,
    http: Client,
    dispatcher: RequestDispatcher,
    sessions: Option<Arc<SessionManager>>,
}

impl GrvtClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.endpoints().validate()?;
        let http = config.http.build_client()?;
        let transport = Arc::new(ReqwestTransport::with_client(http.clone()));
        let dispatcher = RequestDispatcher::new(transport, config.endpoints(), config.retry.clone());

        info!(env = %config.env, chain_id = config.chain_id(), "grvt client ready");
        Ok(Self {
            config,
            http,
            dispatcher,
            sessions: None,
        })
    }

    /// Log `account` in with an API key whenever its session needs refreshing
    pub fn with_api_key(self, account: impl Into<String>, api_key: impl Into<String>) -> Self {
        let login = ApiKeyLogin::new(self.http.clone(), self.endpoints().api_key_login_url())
            .with_account(account, api_key);
        self.with_refresher(Arc::new(login))
    }

    /// Use a custom login backend for authenticated calls
    pub fn with_refresher(mut self, refresher: Arc<dyn SessionRefresher>) -> Self {
        let sessions = Arc::new(SessionManager::new(refresher, self.config.session.clone()));
        self.dispatcher = self.dispatcher.with_sessions(Arc::clone(&sessions));
        self.sessions = Some(sessions);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &EnvironmentEndpoints {
        self.dispatcher.endpoints()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn sessions(&self) -> Option<&Arc<SessionManager>> {
        self.sessions.as_ref()
    }

    /// Blocking strategy over the same dispatcher; create it outside any async runtime
    pub fn blocking(&self) -> Result<BlockingDispatcher> {
        BlockingDispatcher::new(self.dispatcher.clone())
    }

    /// Signing engine bound to this environment's chain id
    pub fn signing_engine(&self, catalog: Arc<InstrumentCatalog>) -> OrderSigningEngine {
        OrderSigningEngine::new(catalog, self.endpoints().chain_id)
    }

    pub async fn fetch_catalog(&self) -> Result<InstrumentCatalog> {
        self.dispatcher.fetch_catalog().await
    }

    /// Submit a signed order. Never retried.
    pub async fn submit_order(&self, account: &str, signed: &SignedOrder) -> Result<Value> {
        self.dispatcher.create_order(account, signed).await
    }

    pub async fn cancel_order(&self, account: &str, cancel: &CancelOrderRequest) -> Result<Value> {
        self.dispatcher.cancel_order(account, cancel).await
    }

    /// Multiplexer for public market-data channels only
    pub fn stream(&self) -> StreamMultiplexer {
        let endpoints = self.endpoints();
        StreamMultiplexer::new(
            endpoints.market_data_ws_url.clone(),
            endpoints.trade_ws_url.clone(),
            self.config.stream.clone(),
        )
    }

    /// Multiplexer that can also carry private channels for `account`
    pub fn private_stream(&self, account: impl Into<String>) -> Result<StreamMultiplexer> {
        let sessions = self.sessions.clone().ok_or_else(|| {
            GrvtError::Config("private streams require an API key or session refresher".to_string())
        })?;
        Ok(self.stream().with_private_auth(PrivateAuth {
            sessions,
            account: account.into(),
        }))
    }
}
