//! Authenticated request pipeline.
//!
//! Every request carries `Authorization: Bearer <access>` when an access
//! token is stored. A 401 on a request that has not been retried yet
//! triggers one session recovery:
//!
//! 1. No refresh token stored: the original error is returned.
//! 2. Refresh fails: both tokens are cleared, the logout hook fires, and
//!    the error is returned.
//! 3. Refresh succeeds: the request is re-issued once with the new token.
//!
//! Refreshes are serialized behind a gate. A request that reaches the gate
//! after another one already rotated the token retries without refreshing.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, SET_COOKIE};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::ApiResponse;
use crate::auth::TokenStore;
use crate::config::{self, Config};
use crate::error::{ApiError, ApiErrorKind, ApiResult};

/// Standard User-Agent header for wayfare API requests.
pub const USER_AGENT: &str = concat!("wayfare/", env!("CARGO_PKG_VERSION"));

/// Backend path that exchanges a refresh token for a new access token.
pub const REFRESH_PATH: &str = "/user/refresh-token-google";

const BEARER_PREFIX: &str = "Bearer ";

/// Callback registered on the client for session events.
pub type SessionHook = Arc<dyn Fn() + Send + Sync>;

/// A request to the backend.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns an error if `body` cannot be serialized.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::parse("Failed to encode request body").with_details(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Whether this request already went through a session recovery.
    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// HTTP client for the booking backend.
///
/// Cloning is cheap; clones share tokens, the refresh gate and the hook.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    refresh_gate: Arc<Mutex<()>>,
    logout_hook: Arc<RwLock<Option<SessionHook>>>,
    refresh_hook: Arc<RwLock<Option<SessionHook>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, tokens: TokenStore, timeout: Option<Duration>) -> Result<Self> {
        let base_url = config::resolve_base_url(None, Some(base_url))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            tokens,
            refresh_gate: Arc::new(Mutex::new(())),
            logout_hook: Arc::new(RwLock::new(None)),
            refresh_hook: Arc::new(RwLock::new(None)),
        })
    }

    /// Creates a client from resolved configuration.
    ///
    /// # Errors
    /// Returns an error if the configured URL is invalid.
    pub fn from_config(config: &Config, tokens: TokenStore) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        Self::new(&base_url, tokens, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Absolute URL for a backend path.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Registers the callback fired when a failed refresh logs the user out.
    pub fn set_logout_callback<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        install(&self.logout_hook, Arc::new(hook));
    }

    /// Registers the callback fired after a successful refresh, before the retry.
    pub fn set_refresh_callback<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        install(&self.refresh_hook, Arc::new(hook));
    }

    /// Sends a request through the interceptors.
    ///
    /// Returns the successful response; non-2xx statuses become `ApiError`.
    ///
    /// # Errors
    /// Returns an error for transport failures, non-2xx statuses, and 401s
    /// that could not be recovered.
    pub async fn send(&self, mut request: ApiRequest) -> ApiResult<Response> {
        loop {
            let sent_with = self.tokens.access_token();
            let response = self.dispatch(&request, sent_with.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return check_status(response).await;
            }

            let original = error_from_response(response).await;
            if request.retried {
                tracing::debug!(path = %request.path, "401 after retry, giving up");
                return Err(original);
            }
            request.retried = true;

            match self.recover_session(sent_with.as_deref()).await {
                Recovery::Retry => {
                    tracing::debug!(path = %request.path, "retrying with refreshed token");
                }
                Recovery::NoRefreshToken => return Err(original),
                Recovery::Failed(err) => return Err(err),
            }
        }
    }

    /// Sends a request and decodes the response envelope.
    ///
    /// # Errors
    /// Same as [`ApiClient::send`], plus body decode failures.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<ApiResponse<T>> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::parse(format!("Unexpected response from {path}")).with_details(e.to_string())
        })
    }

    /// Sends a request and returns the envelope's `data`.
    ///
    /// # Errors
    /// Same as [`ApiClient::call`].
    pub async fn data<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        Ok(self.call(request).await?.data)
    }

    async fn dispatch(&self, request: &ApiRequest, access: Option<&str>) -> ApiResult<Response> {
        let url = self.url_for(&request.path);
        tracing::debug!(method = %request.method, %url, retried = request.retried, "api request");

        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = access {
            builder = builder.header(AUTHORIZATION, format!("{BEARER_PREFIX}{token}"));
        }

        builder.send().await.map_err(|e| ApiError::from_reqwest(&e))
    }

    async fn recover_session(&self, sent_with: Option<&str>) -> Recovery {
        let _gate = self.refresh_gate.lock().await;

        let current = self.tokens.access_token();
        if current.is_some() && current.as_deref() != sent_with {
            tracing::debug!("access token already rotated by a concurrent refresh");
            return Recovery::Retry;
        }

        let Some(refresh_token) = self.tokens.refresh_token() else {
            tracing::debug!("401 without a refresh token");
            return Recovery::NoRefreshToken;
        };

        match self.refresh(&refresh_token).await {
            Ok(()) => {
                fire(&self.refresh_hook);
                Recovery::Retry
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, logging out");
                if let Err(clear_err) = self.tokens.clear() {
                    tracing::warn!(error = %clear_err, "failed to clear stored tokens");
                }
                fire(&self.logout_hook);
                Recovery::Failed(ApiError::session_expired(err.to_string()))
            }
        }
    }

    /// Exchanges the refresh token. Bypasses the interceptors.
    async fn refresh(&self, refresh_token: &str) -> ApiResult<()> {
        let url = self.url_for(REFRESH_PATH);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        let set_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::http_status(status.as_u16(), &body));
        }

        let envelope: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        if let Some(code) = envelope.get("statusCode").and_then(Value::as_u64)
            && !(200..300).contains(&code)
        {
            return Err(ApiError::new(
                ApiErrorKind::HttpStatus,
                format!("Refresh rejected with status {code}"),
            ));
        }

        let previous = self.tokens.access_token();
        self.tokens
            .absorb_set_cookies(set_cookies.iter().map(String::as_str))
            .map_err(|e| ApiError::new(ApiErrorKind::Parse, "Failed to store refreshed tokens").with_details(format!("{e:#}")))?;

        if let Some(data) = envelope.get("data") {
            let access = token_field(data, &["accessToken", "access_token"]);
            let refresh = token_field(data, &["refreshToken", "refresh_token"]);
            if let Some(access) = access {
                self.tokens
                    .set_tokens(access, refresh)
                    .map_err(|e| ApiError::new(ApiErrorKind::Parse, "Failed to store refreshed tokens").with_details(format!("{e:#}")))?;
            }
        }

        if self.tokens.access_token() == previous {
            // The retry goes out with the stored token; a second 401 ends it.
            tracing::debug!("refresh succeeded without rotating the access token");
        } else {
            tracing::debug!("access token refreshed");
        }
        Ok(())
    }
}

fn install(slot: &RwLock<Option<SessionHook>>, hook: SessionHook) {
    let mut slot = slot.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(hook);
}

fn fire(slot: &RwLock<Option<SessionHook>>) {
    let hook = slot.read().unwrap_or_else(PoisonError::into_inner).clone();
    if let Some(hook) = hook {
        hook();
    }
}

enum Recovery {
    Retry,
    NoRefreshToken,
    Failed(ApiError),
}

fn token_field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .filter(|v| !v.is_empty())
}

async fn check_status(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::http_status(status, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CookieNames;

    fn client(base: &str) -> ApiClient {
        let tokens = TokenStore::in_memory(CookieNames {
            access: "at".to_string(),
            refresh: "rt".to_string(),
        });
        ApiClient::new(base, tokens, None).unwrap()
    }

    #[test]
    fn test_url_for_joins_paths() {
        let c = client("http://localhost:3002/");
        assert_eq!(c.base_url(), "http://localhost:3002");
        assert_eq!(c.url_for("/hotels"), "http://localhost:3002/hotels");
        assert_eq!(c.url_for("hotels/1"), "http://localhost:3002/hotels/1");
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let tokens = TokenStore::in_memory(CookieNames {
            access: "a".to_string(),
            refresh: "r".to_string(),
        });
        assert!(ApiClient::new("not a url", tokens, None).is_err());
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("/hotels")
            .with_query(vec![("page".to_string(), "2".to_string())]);
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query.len(), 1);
        assert!(!req.is_retried());

        let req = ApiRequest::post("/hotel-bookings/")
            .with_json(&serde_json::json!({"guests": 2}))
            .unwrap();
        assert_eq!(req.body.unwrap()["guests"], 2);
    }

    #[test]
    fn test_token_field_prefers_first_key() {
        let data = serde_json::json!({"accessToken": "a", "access_token": "b", "refreshToken": ""});
        assert_eq!(token_field(&data, &["accessToken", "access_token"]), Some("a"));
        assert_eq!(token_field(&data, &["refreshToken"]), None);
    }
}
