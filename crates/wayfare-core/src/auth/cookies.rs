//! Cookie jar holding the session tokens.
//!
//! The backend hands tokens out as cookies (`httpOnly`, `secure`, `lax`).
//! The jar keeps them in `<home>/cookies.json` with restricted permissions
//! (0600). Cookie values are never logged.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CookieNames;

/// `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

/// A cookie as received from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl StoredCookie {
    /// A session cookie with the attributes the backend uses for tokens.
    pub fn session(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires_at: None,
            http_only: true,
            secure: true,
            same_site: Some(SameSite::Lax),
        }
    }

    /// Parses a `Set-Cookie` header value.
    ///
    /// `Max-Age` wins over `Expires`. Unknown attributes are ignored.
    /// Returns `None` for headers without a `name=value` pair.
    pub fn parse_set_cookie(header: &str, now: DateTime<Utc>) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            expires_at: None,
            http_only: false,
            secure: false,
            same_site: None,
        };
        let mut max_age: Option<i64> = None;

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attr.trim(), None),
            };
            match key.to_ascii_lowercase().as_str() {
                "httponly" => cookie.http_only = true,
                "secure" => cookie.secure = true,
                "samesite" => {
                    cookie.same_site = match val.map(str::to_ascii_lowercase).as_deref() {
                        Some("lax") => Some(SameSite::Lax),
                        Some("strict") => Some(SameSite::Strict),
                        Some("none") => Some(SameSite::None),
                        _ => None,
                    };
                }
                "max-age" => max_age = val.and_then(|v| v.parse().ok()),
                "expires" => {
                    cookie.expires_at = val
                        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                        .map(|dt| dt.with_timezone(&Utc));
                }
                _ => {}
            }
        }

        if let Some(seconds) = max_age {
            // Max-Age <= 0 expires the cookie now; out-of-range ages never expire.
            cookie.expires_at = if seconds <= 0 {
                Some(now)
            } else {
                Duration::try_seconds(seconds).and_then(|age| now.checked_add_signed(age))
            };
        }

        Some(cookie)
    }

    /// True once the expiry has passed. Session cookies never expire here.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Storage for named cookies.
pub trait CookieStore: Send + Sync {
    /// Returns the value of a live cookie.
    fn get(&self, name: &str) -> Option<String>;

    /// Inserts or replaces a cookie.
    ///
    /// # Errors
    /// Returns an error if the store cannot be persisted.
    fn set(&self, cookie: StoredCookie) -> Result<()>;

    /// Removes a cookie. Returns whether it was present.
    ///
    /// # Errors
    /// Returns an error if the store cannot be persisted.
    fn remove(&self, name: &str) -> Result<bool>;
}

fn lock(cookies: &Mutex<BTreeMap<String, StoredCookie>>) -> MutexGuard<'_, BTreeMap<String, StoredCookie>> {
    cookies
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn live_value(cookies: &BTreeMap<String, StoredCookie>, name: &str) -> Option<String> {
    cookies
        .get(name)
        .filter(|c| !c.is_expired(Utc::now()))
        .map(|c| c.value.clone())
        .filter(|v| !v.is_empty())
}

/// In-process cookie jar. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        live_value(&lock(&self.cookies), name)
    }

    fn set(&self, cookie: StoredCookie) -> Result<()> {
        lock(&self.cookies).insert(cookie.name.clone(), cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        Ok(lock(&self.cookies).remove(name).is_some())
    }
}

/// On-disk layout of the jar.
#[derive(Debug, Default, Serialize, Deserialize)]
struct JarFile {
    #[serde(default)]
    cookies: BTreeMap<String, StoredCookie>,
}

/// Cookie jar persisted as JSON.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl FileCookieJar {
    /// Opens the jar at `path`. A missing file is an empty jar.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cookies = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read cookie jar from {}", path.display()))?;
            let jar: JarFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse cookie jar from {}", path.display()))?;
            jar.cookies
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            cookies: Mutex::new(cookies),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, cookies: &BTreeMap<String, StoredCookie>) -> Result<()> {
        let path = &self.path;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let jar = JarFile {
            cookies: cookies.clone(),
        };
        let contents = serde_json::to_string_pretty(&jar).context("Failed to serialize cookie jar")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }
}

impl CookieStore for FileCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        live_value(&lock(&self.cookies), name)
    }

    fn set(&self, cookie: StoredCookie) -> Result<()> {
        let mut cookies = lock(&self.cookies);
        cookies.insert(cookie.name.clone(), cookie);
        self.save(&cookies)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let mut cookies = lock(&self.cookies);
        let had = cookies.remove(name).is_some();
        if had {
            self.save(&cookies)?;
        }
        Ok(had)
    }
}

/// Access/refresh token pair on top of a cookie store.
#[derive(Clone)]
pub struct TokenStore {
    jar: Arc<dyn CookieStore>,
    names: CookieNames,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(jar: Arc<dyn CookieStore>, names: CookieNames) -> Self {
        Self { jar, names }
    }

    /// Token store backed by a fresh in-memory jar.
    pub fn in_memory(names: CookieNames) -> Self {
        Self::new(Arc::new(MemoryCookieJar::new()), names)
    }

    pub fn names(&self) -> &CookieNames {
        &self.names
    }

    pub fn access_token(&self) -> Option<String> {
        self.jar.get(&self.names.access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.jar.get(&self.names.refresh)
    }

    /// Stores a token pair. A `None` refresh token leaves the current one.
    ///
    /// # Errors
    /// Returns an error if the jar cannot be persisted.
    pub fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        self.jar
            .set(StoredCookie::session(self.names.access.as_str(), access))?;
        if let Some(refresh) = refresh {
            self.jar
                .set(StoredCookie::session(self.names.refresh.as_str(), refresh))?;
        }
        Ok(())
    }

    /// Removes both tokens. Returns whether any was present.
    ///
    /// # Errors
    /// Returns an error if the jar cannot be persisted.
    pub fn clear(&self) -> Result<bool> {
        let had_access = self.jar.remove(&self.names.access)?;
        let had_refresh = self.jar.remove(&self.names.refresh)?;
        Ok(had_access || had_refresh)
    }

    /// Applies `Set-Cookie` headers for the token cookies.
    ///
    /// Other cookies are ignored. Expired or empty cookies delete the token.
    /// Returns the number of token cookies touched.
    ///
    /// # Errors
    /// Returns an error if the jar cannot be persisted.
    pub fn absorb_set_cookies<'a, I>(&self, headers: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let now = Utc::now();
        let mut touched = 0;
        for header in headers {
            let Some(cookie) = StoredCookie::parse_set_cookie(header, now) else {
                continue;
            };
            if cookie.name != self.names.access && cookie.name != self.names.refresh {
                continue;
            }
            touched += 1;
            if cookie.value.is_empty() || cookie.is_expired(now) {
                self.jar.remove(&cookie.name)?;
            } else {
                self.jar.set(cookie)?;
            }
        }
        Ok(touched)
    }
}
