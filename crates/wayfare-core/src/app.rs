//! Entry point tying the token store, HTTP client, session and cache together.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{AuthApi, FlightsApi, HotelsApi};
use crate::auth::{AuthSession, FileCookieJar, TokenStore, UserInfo, mask_token};
use crate::cache::{QueryCache, QueryKey};
use crate::client::ApiClient;
use crate::config::{Config, paths};
use crate::error::ApiResult;
use crate::permissions::{self, MenuPermission};

/// A signed-in (or signed-out) client of the booking backend.
#[derive(Debug, Clone)]
pub struct Wayfare {
    config: Config,
    client: ApiClient,
    session: AuthSession,
    cache: QueryCache,
}

impl Wayfare {
    /// Opens the persistent cookie jar under `WAYFARE_HOME`.
    ///
    /// # Errors
    /// Returns an error if the cookie jar or base URL is invalid.
    pub fn open(config: Config) -> Result<Self> {
        let jar = FileCookieJar::open(paths::cookie_jar_path()).context("Failed to open cookie jar")?;
        let tokens = TokenStore::new(Arc::new(jar), config.cookie_names());
        Self::with_tokens(config, tokens)
    }

    /// Builds on an existing token store.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_tokens(config: Config, tokens: TokenStore) -> Result<Self> {
        let client = ApiClient::from_config(&config, tokens)?;
        Ok(Self::from_parts(config, client))
    }

    /// Wires the session hooks of `client` to the session and cache.
    pub fn from_parts(config: Config, client: ApiClient) -> Self {
        let session = AuthSession::from_tokens(client.tokens());
        let cache = QueryCache::new();

        let hook_session = session.clone();
        let hook_cache = cache.clone();
        client.set_logout_callback(move || {
            hook_session.sign_out();
            hook_cache.clear();
        });

        let refresh_session = session.clone();
        let refresh_tokens = client.tokens().clone();
        client.set_refresh_callback(move || refresh_session.sync(&refresh_tokens));

        Self {
            config,
            client,
            session,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.client)
    }

    pub fn hotels(&self) -> HotelsApi<'_> {
        HotelsApi::new(&self.client, &self.cache)
    }

    pub fn flights(&self) -> FlightsApi<'_> {
        FlightsApi::new(&self.client, &self.cache)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.session.user()
    }

    /// Stores tokens obtained from the browser sign-in.
    ///
    /// # Errors
    /// Returns an error if the access token is blank or cannot be stored.
    pub fn sign_in(&self, access_token: &str, refresh_token: Option<&str>) -> Result<Option<UserInfo>> {
        let access = access_token.trim();
        if access.is_empty() {
            anyhow::bail!("Access token is empty");
        }
        let refresh = refresh_token.map(str::trim).filter(|r| !r.is_empty());
        self.client.tokens().set_tokens(access, refresh)?;
        self.cache.clear();
        self.session.sync(self.client.tokens());
        tracing::info!(token = %mask_token(access), "signed in");
        Ok(self.session.user())
    }

    /// Ends the session: server logout (best effort), then local cleanup.
    ///
    /// Local state is cleared even when the server call fails.
    ///
    /// # Errors
    /// Returns an error only if the stored tokens cannot be removed.
    pub async fn logout(&self) -> Result<bool> {
        let had_session = self.client.tokens().access_token().is_some();
        if had_session && let Err(err) = self.auth().logout().await {
            tracing::warn!(error = %err, "server logout failed");
        }
        let cleared = self.client.tokens().clear()?;
        self.session.sign_out();
        self.cache.clear();
        Ok(cleared || had_session)
    }

    /// Permission menus with at least one checked action. Cached.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn permissions(&self) -> ApiResult<Vec<MenuPermission>> {
        let stale = self.config.permissions_stale_time();
        let auth = self.auth();
        let menus: Vec<MenuPermission> = self
            .cache
            .get_or_fetch(QueryKey::user_permissions(), stale, || auth.permissions())
            .await?;
        Ok(permissions::filter_checked(&menus))
    }
}
