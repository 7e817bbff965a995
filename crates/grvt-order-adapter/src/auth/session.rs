/*
[INPUT]:  Account ids and a SessionRefresher (login backend)
[OUTPUT]: Fresh session credentials with single-flight refresh
[POS]:    Auth layer - per-account session lifecycle
[UPDATE]: When refresh policy or session storage changes
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::http::{GrvtError, Result};

/// Authenticated session for one trading account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account: String,
    /// Value of the `gravity` cookie
    pub token: String,
    /// Value for the `X-Grvt-Account-Id` header
    pub grvt_account_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Valid when more than `margin` remains before expiry
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }

    pub fn cookie_header(&self) -> String {
        format!("gravity={}", self.token)
    }
}

/// Backend that performs the network login for an account
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn login(&self, account: &str) -> Result<Session>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sessions closer than this to expiry are refreshed
    pub refresh_margin: Duration,
    /// Bound on a single refresh
    pub refresh_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_margin: Duration::from_secs(60),
            refresh_timeout: Duration::from_secs(10),
        }
    }
}

type RefreshOutcome = std::result::Result<Session, String>;
type RefreshFuture = Shared<BoxFuture<'static, RefreshOutcome>>;

enum SlotState {
    Idle(Option<Session>),
    Refreshing {
        generation: u64,
        future: RefreshFuture,
    },
}

/// Owns session credentials per account.
///
/// Concurrent callers that find a session missing or near expiry share one
/// in-flight refresh and all observe its outcome.
pub struct SessionManager {
    refresher: Arc<dyn SessionRefresher>,
    config: SessionConfig,
    slots: Mutex<HashMap<String, SlotState>>,
    generation: AtomicU64,
}

impl SessionManager {
    pub fn new(refresher: Arc<dyn SessionRefresher>, config: SessionConfig) -> Self {
        Self {
            refresher,
            config,
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Return a valid credential for `account`, refreshing at most once across concurrent callers
    pub async fn get_credential(&self, account: &str) -> Result<Session> {
        let (generation, future) = {
            let mut slots = self.slots.lock();
            let slot = slots
                .entry(account.to_string())
                .or_insert(SlotState::Idle(None));

            match &*slot {
                SlotState::Idle(Some(session))
                    if session.is_valid_at(Utc::now(), self.config.refresh_margin) =>
                {
                    return Ok(session.clone());
                }
                SlotState::Refreshing { generation, future } => {
                    debug!(account, "joining in-flight session refresh");
                    (*generation, future.clone())
                }
                SlotState::Idle(_) => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = self.refresh_future(account);
                    *slot = SlotState::Refreshing {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let outcome = future.await;
        self.settle(account, generation, &outcome);
        outcome.map_err(GrvtError::auth)
    }

    /// Seed a session obtained out of band
    pub fn set_session(&self, session: Session) {
        let mut slots = self.slots.lock();
        slots.insert(session.account.clone(), SlotState::Idle(Some(session)));
    }

    /// Drop the stored session so the next call refreshes
    pub fn invalidate(&self, account: &str) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(account)
            && matches!(slot, SlotState::Idle(_))
        {
            *slot = SlotState::Idle(None);
        }
    }

    /// Snapshot of the stored session, if any
    pub fn session(&self, account: &str) -> Option<Session> {
        let slots = self.slots.lock();
        match slots.get(account) {
            Some(SlotState::Idle(session)) => session.clone(),
            _ => None,
        }
    }

    fn refresh_future(&self, account: &str) -> RefreshFuture {
        let refresher = Arc::clone(&self.refresher);
        let account = account.to_string();
        let timeout = self.config.refresh_timeout;

        async move {
            info!(account = %account, "refreshing session");
            match tokio::time::timeout(timeout, refresher.login(&account)).await {
                Ok(Ok(session)) => {
                    info!(account = %account, expires_at = %session.expires_at, "session refreshed");
                    Ok(session)
                }
                Ok(Err(err)) => {
                    warn!(account = %account, error = %err, "session refresh rejected");
                    Err(err.to_string())
                }
                Err(_) => {
                    warn!(account = %account, timeout_ms = timeout.as_millis() as u64, "session refresh timed out");
                    Err(format!("session refresh timed out after {}ms", timeout.as_millis()))
                }
            }
        }
        .boxed()
        .shared()
    }

    fn settle(&self, account: &str, generation: u64, outcome: &RefreshOutcome) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(account)
            && matches!(slot, SlotState::Refreshing { generation: current, .. } if *current == generation)
        {
            *slot = SlotState::Idle(outcome.as_ref().ok().cloned());
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("accounts", &self.slots.lock().len())
            .finish()
    }
}
