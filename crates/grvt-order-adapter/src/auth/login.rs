/*
[INPUT]:  Per-account API keys and the edge login endpoint
[OUTPUT]: Sessions built from the login cookie and account header
[POS]:    Auth layer - API-key login backend for SessionManager
[UPDATE]: When the login endpoint or cookie format changes
*/

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

use crate::auth::session::{Session, SessionRefresher};
use crate::http::{GrvtError, Result};
use crate::types::ApiKeyLoginRequest;

pub const SESSION_COOKIE: &str = "gravity";
pub const ACCOUNT_ID_HEADER: &str = "x-grvt-account-id";

/// Lifetime assumed when the cookie carries no expiry attribute
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Logs in with an API key and turns the response cookie into a `Session`
pub struct ApiKeyLogin {
    http: reqwest::Client,
    login_url: String,
    api_keys: HashMap<String, String>,
}

impl ApiKeyLogin {
    pub fn new(http: reqwest::Client, login_url: impl Into<String>) -> Self {
        Self {
            http,
            login_url: login_url.into(),
            api_keys: HashMap::new(),
        }
    }

    /// Register the API key used for `account`
    pub fn with_account(mut self, account: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_keys.insert(account.into(), api_key.into());
        self
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl SessionRefresher for ApiKeyLogin {
    async fn login(&self, account: &str) -> Result<Session> {
        let api_key = self
            .api_keys
            .get(account)
            .ok_or_else(|| GrvtError::auth(format!("no api key configured for account {account}")))?;

        let response = self
            .http
            .post(&self.login_url)
            .json(&ApiKeyLoginRequest {
                api_key: api_key.clone(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GrvtError::auth(format!(
                "login rejected with status {status}: {body}"
            )));
        }

        let session = session_from_headers(account, response.headers(), Utc::now())?;
        debug!(account, expires_at = %session.expires_at, "login cookie parsed");
        Ok(session)
    }
}

/// Build a session from login response headers
pub fn session_from_headers(
    account: &str,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Session> {
    let cookie = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| parse_session_cookie(raw, now))
        .ok_or_else(|| GrvtError::auth("login response carried no session cookie"))?;

    let grvt_account_id = headers
        .get(ACCOUNT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    Ok(Session {
        account: account.to_string(),
        token: cookie.0,
        grvt_account_id,
        expires_at: cookie.1,
    })
}

fn parse_session_cookie(raw: &str, now: DateTime<Utc>) -> Option<(String, DateTime<Utc>)> {
    let mut parts = raw.split(';').map(str::trim);
    let (name, value) = parts.next()?.split_once('=')?;
    if name != SESSION_COOKIE || value.is_empty() {
        return None;
    }

    let mut expires_at = None;
    for attribute in parts {
        let Some((key, attr_value)) = attribute.split_once('=') else {
            continue;
        };
        if key.eq_ignore_ascii_case("max-age") {
            // Max-Age wins over Expires
            if let Ok(seconds) = attr_value.parse::<i64>() {
                expires_at = Some(now + chrono::Duration::seconds(seconds));
                break;
            }
        } else if key.eq_ignore_ascii_case("expires") {
            expires_at = DateTime::parse_from_rfc2822(attr_value)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc));
        }
    }

    let expires_at =
        expires_at.unwrap_or_else(|| now + chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS));
    Some((value.to_string(), expires_at))
}
