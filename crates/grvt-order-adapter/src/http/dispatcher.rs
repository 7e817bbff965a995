/*
[INPUT]:  API calls (prepared request, retry policy, optional account)
[OUTPUT]: Decoded responses or taxonomy errors
[POS]:    HTTP layer - credential attachment, status mapping, retries
[UPDATE]: When retry rules, auth headers or execution strategies change
*/

use std::future::Future;
use std::sync::Arc;

use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

use crate::auth::{ACCOUNT_ID_HEADER, SessionManager};
use crate::env::EnvironmentEndpoints;
use crate::http::client::{PreparedRequest, Transport, TransportResponse};
use crate::http::retry::{RetryConfig, RetryPolicy};
use crate::http::{GrvtError, Result};
use crate::types::ApiErrorBody;

/// One logical API call
#[derive(Debug, Clone)]
pub struct ApiCall {
    /// Short name used in logs
    pub operation: &'static str,
    pub request: PreparedRequest,
    pub retry: RetryPolicy,
    /// Account whose session is attached, if any
    pub account: Option<String>,
}

impl ApiCall {
    pub fn new(operation: &'static str, request: PreparedRequest) -> Self {
        Self {
            operation,
            request,
            retry: RetryPolicy::None,
            account: None,
        }
    }

    pub fn idempotent(mut self) -> Self {
        self.retry = RetryPolicy::Idempotent;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn authenticated(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

/// Non-blocking execution strategy.
///
/// Idempotent reads are retried on transient failures; calls with
/// `RetryPolicy::None` reach the transport exactly once.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    endpoints: EnvironmentEndpoints,
    sessions: Option<Arc<SessionManager>>,
    retry: RetryConfig,
}

impl RequestDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: EnvironmentEndpoints,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            endpoints,
            sessions: None,
            retry,
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn endpoints(&self) -> &EnvironmentEndpoints {
        &self.endpoints
    }

    pub fn sessions(&self) -> Option<&Arc<SessionManager>> {
        self.sessions.as_ref()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Dispatch and decode the JSON body
    pub async fn send<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T> {
        let body = self.send_raw(call).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Dispatch and return the raw success body
    pub async fn send_raw(&self, call: ApiCall) -> Result<String> {
        let config = match &call.retry {
            RetryPolicy::None => None,
            RetryPolicy::Idempotent => Some(self.retry.clone()),
            RetryPolicy::Custom(config) => Some(config.clone()),
        };

        let mut attempt = 0u32;
        loop {
            let err = match self.attempt(&call).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            let Some(config) = config
                .as_ref()
                .filter(|config| attempt < config.max_retries && should_retry(config, &err))
            else {
                if attempt > 0 {
                    warn!(
                        operation = call.operation,
                        attempts = attempt + 1,
                        error = %err,
                        "request failed after retries"
                    );
                }
                return Err(err);
            };

            let delay = config.delay_for_attempt(attempt);
            debug!(
                operation = call.operation,
                attempt = attempt + 1,
                max = config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, call: &ApiCall) -> Result<String> {
        let mut request = call.request.clone();

        if let Some(account) = &call.account {
            let sessions = self.sessions.as_ref().ok_or_else(|| {
                GrvtError::Config(format!(
                    "{} requires a session but no session manager is configured",
                    call.operation
                ))
            })?;
            let session = sessions.get_credential(account).await?;
            request = request.header(COOKIE.as_str(), session.cookie_header());
            if let Some(account_id) = &session.grvt_account_id {
                request = request.header(ACCOUNT_ID_HEADER, account_id.clone());
            }
        }

        let response = self.transport.execute(&request).await?;
        let result = check_status(response);

        if let (Err(err), Some(account), Some(sessions)) =
            (&result, &call.account, &self.sessions)
            && err.is_auth_error()
        {
            // Rejected cookie; the next call logs in again
            sessions.invalidate(account);
        }

        result
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("env", &self.endpoints.env)
            .field("retry", &self.retry)
            .field("authenticated", &self.sessions.is_some())
            .finish()
    }
}

fn should_retry(config: &RetryConfig, err: &GrvtError) -> bool {
    match err {
        GrvtError::Api { status, .. } => config.retries_status(*status),
        other => other.is_retryable(),
    }
}

fn check_status(response: TransportResponse) -> Result<String> {
    let status = response.status;
    if status.is_success() {
        return Ok(response.body);
    }

    let message = serde_json::from_str::<ApiErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(response.body);

    match status.as_u16() {
        401 | 403 => Err(GrvtError::auth(format!("status {status}: {message}"))),
        _ => Err(GrvtError::api_error(status, message)),
    }
}

/// Blocking execution strategy over the same dispatcher.
///
/// Owns a current-thread runtime. Must be created and dropped outside any
/// async context; calls made from inside a runtime fail with `Config`.
pub struct BlockingDispatcher {
    inner: RequestDispatcher,
    runtime: Runtime,
}

impl BlockingDispatcher {
    pub fn new(inner: RequestDispatcher) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &RequestDispatcher {
        &self.inner
    }

    /// Drive `future` to completion on the owned runtime
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        if Handle::try_current().is_ok() {
            return Err(GrvtError::Config(
                "blocking dispatcher called from inside an async runtime".to_string(),
            ));
        }
        Ok(self.runtime.block_on(future))
    }

    pub fn send<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T> {
        self.block_on(self.inner.send(call))?
    }
}

impl std::fmt::Debug for BlockingDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingDispatcher")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
