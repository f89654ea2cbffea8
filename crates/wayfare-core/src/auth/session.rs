//! Signed-in state shared with whatever renders the UI.

use std::sync::Arc;

use tokio::sync::watch;

use super::claims::UserInfo;
use super::cookies::TokenStore;

/// Snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    /// Decoded from the access token; `None` when the token is opaque
    pub user: Option<UserInfo>,
}

impl AuthState {
    fn from_access_token(token: Option<&str>) -> Self {
        match token {
            Some(token) => Self {
                authenticated: true,
                user: UserInfo::from_token(token),
            },
            None => Self::default(),
        }
    }
}

/// Observable authentication state.
///
/// Cloning shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct AuthSession {
    tx: Arc<watch::Sender<AuthState>>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession {
    /// Starts signed out.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Starts from whatever tokens are already stored.
    pub fn from_tokens(tokens: &TokenStore) -> Self {
        let session = Self::new();
        session.sync(tokens);
        session
    }

    /// Re-reads the access token and publishes the derived state.
    pub fn sync(&self, tokens: &TokenStore) {
        let state = AuthState::from_access_token(tokens.access_token().as_deref());
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    /// Drops the user record and marks the session signed out.
    pub fn sign_out(&self) {
        self.tx.send_replace(AuthState::default());
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().authenticated
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.tx.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::tests::fake_jwt;
    use crate::config::CookieNames;

    fn tokens() -> TokenStore {
        TokenStore::in_memory(CookieNames {
            access: "at".to_string(),
            refresh: "rt".to_string(),
        })
    }

    #[test]
    fn test_session_follows_tokens() {
        let store = tokens();
        let session = AuthSession::from_tokens(&store);
        assert!(!session.is_authenticated());

        let jwt = fake_jwt(&serde_json::json!({
            "sub": "u-7",
            "email": "li@example.com",
            "fullName": "Li Wei"
        }));
        store.set_tokens(&jwt, Some("refresh")).unwrap();
        session.sync(&store);

        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().name, "Li Wei");
    }

    #[test]
    fn test_opaque_token_is_authenticated_without_user() {
        let store = tokens();
        store.set_tokens("opaque", None).unwrap();
        let session = AuthSession::from_tokens(&store);
        assert!(session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_notifies_subscribers() {
        let store = tokens();
        store.set_tokens("opaque", None).unwrap();
        let session = AuthSession::from_tokens(&store);
        let mut rx = session.subscribe();

        session.sign_out();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AuthState::default());
        assert!(session.user().is_none());
    }
}
